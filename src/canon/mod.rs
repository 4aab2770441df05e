//! Canonicalization rewrites atoms into forms a solver class can consume.
//!
//! Each canonicalizer handles one atom kind and returns:
//! - a replacement expression (for QP targets, a [`SymbolicQuadForm`])
//! - the equality constraints that tie any auxiliary variables it introduced
//!   back to the original sub-expressions

pub mod quad_form;
pub mod quad_over_lin;

pub use quad_form::SymbolicQuadForm;
pub use quad_over_lin::{quad_over_lin_canon, QuadOverLinCanon};

use crate::constraints::EqualityConstraint;
use crate::error::Result;
use crate::expr::Expr;

/// Result of canonicalizing a single atom.
#[derive(Debug, Clone)]
pub struct CanonOutput {
    /// The replacement for the atom.
    pub expr: SymbolicQuadForm,
    /// Constraints introduced by the rewrite. Empty when no substitution was needed.
    pub constraints: Vec<EqualityConstraint>,
}

/// A rewrite rule for one atom kind.
///
/// `args` are the atom's operands after they have themselves been
/// canonicalized, in the atom's operand order.
pub trait AtomCanonicalizer {
    /// Rewrite `atom` given its canonicalized operands.
    fn canonicalize(&self, atom: &Expr, args: &[Expr]) -> Result<CanonOutput>;
}
