//! Constraint types produced by canonicalization.

pub mod constraint;

pub use constraint::{ConstraintExt, EqualityConstraint};
