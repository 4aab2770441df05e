//! Atom functions for building expressions.
//!
//! - **Affine atoms**: operator overloading for `+`, `-` and scaling
//! - **Nonlinear atoms**: `quad_over_lin`

pub mod affine;
pub mod nonlinear;

pub use nonlinear::quad_over_lin;
