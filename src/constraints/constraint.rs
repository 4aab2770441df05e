//! Equality constraints emitted by canonicalization.

use std::sync::Arc;

use crate::error::{CvxError, Result};
use crate::expr::{Expr, ExprId, Shape};

/// Equality constraint `lhs == rhs`.
///
/// Canonicalizers emit these with a freshly allocated auxiliary variable on
/// the left and the substituted sub-expression on the right. Both sides
/// always have the same shape.
#[derive(Debug, Clone)]
pub struct EqualityConstraint {
    id: ExprId,
    lhs: Arc<Expr>,
    rhs: Arc<Expr>,
}

impl EqualityConstraint {
    /// Create `lhs == rhs`, rejecting operands of different shapes.
    pub fn new(lhs: Expr, rhs: Expr) -> Result<Self> {
        let (expected, got) = (lhs.shape(), rhs.shape());
        if expected != got {
            return Err(CvxError::ShapeMismatch {
                expected: expected.to_string(),
                got: got.to_string(),
            });
        }
        Ok(EqualityConstraint {
            id: ExprId::new(),
            lhs: Arc::new(lhs),
            rhs: Arc::new(rhs),
        })
    }

    /// Identifier used to key dual values for this constraint.
    pub fn id(&self) -> ExprId {
        self.id
    }

    /// Left-hand side.
    pub fn lhs(&self) -> &Expr {
        &self.lhs
    }

    /// Right-hand side.
    pub fn rhs(&self) -> &Expr {
        &self.rhs
    }

    /// Shape shared by both sides.
    pub fn shape(&self) -> Shape {
        self.lhs.shape()
    }

    /// Number of scalar equality rows this constraint contributes.
    pub fn size(&self) -> usize {
        self.shape().size()
    }

    /// Get all variable IDs in this constraint.
    pub fn variables(&self) -> Vec<ExprId> {
        let mut vars = self.lhs.variables();
        vars.extend(self.rhs.variables());
        vars.sort();
        vars.dedup();
        vars
    }
}

/// Extension trait for creating constraints from expressions.
pub trait ConstraintExt {
    /// Create equality constraint: self == rhs.
    fn equals(&self, rhs: &Expr) -> Result<EqualityConstraint>;
}

impl ConstraintExt for Expr {
    fn equals(&self, rhs: &Expr) -> Result<EqualityConstraint> {
        EqualityConstraint::new(self.clone(), rhs.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::variable;

    #[test]
    fn test_equality_constraint() {
        let t = variable(3);
        let x = variable(3);
        let y = variable(3);
        let constr = t.equals(&(&x + &y)).expect("shapes agree");
        assert_eq!(constr.size(), 3);
        assert_eq!(constr.variables().len(), 3);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let t = variable(2);
        let x = variable(3);
        let err = EqualityConstraint::new(t, x).unwrap_err();
        assert!(matches!(err, CvxError::ShapeMismatch { .. }));
    }
}
