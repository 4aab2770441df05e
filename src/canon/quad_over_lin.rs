//! Canonicalization of `quad_over_lin(x, y) = ||x||_2^2 / y` for QP solvers.
//!
//! With `y` a positive constant the atom equals `x' (I / y) x`. QP assemblers
//! need the quadratic term to act on a bare variable, so a non-variable `x` is
//! replaced by a fresh auxiliary `t` together with the constraint `t == x`.

use std::sync::Arc;

use log::debug;

use super::quad_form::SymbolicQuadForm;
use super::{AtomCanonicalizer, CanonOutput};
use crate::constraints::EqualityConstraint;
use crate::error::{CvxError, Result};
use crate::expr::{Expr, VariableBuilder};
use crate::sparse::csc_scaled_identity;

/// Name given to auxiliary variables introduced by this rewrite.
pub const AUX_VAR_NAME: &str = "quad_over_lin_aux";

/// Canonicalizer for the `quad_over_lin` atom.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuadOverLinCanon;

impl AtomCanonicalizer for QuadOverLinCanon {
    fn canonicalize(&self, atom: &Expr, args: &[Expr]) -> Result<CanonOutput> {
        quad_over_lin_canon(atom, args)
    }
}

/// Rewrite a `quad_over_lin` atom into a symbolic quadratic form.
///
/// `args` holds the canonicalized operands `[affine_expr, y]`. `y` must be a
/// finite, strictly positive scalar constant.
///
/// # Errors
///
/// Returns [`CvxError::PreconditionViolation`] when `atom` is not a
/// `quad_over_lin` node, when the operand count is wrong, when the operand's
/// sub-expressions do not broadcast, or when `y` is symbolic, non-scalar,
/// non-finite or not positive.
pub fn quad_over_lin_canon(atom: &Expr, args: &[Expr]) -> Result<CanonOutput> {
    if !matches!(atom, Expr::QuadOverLin(_, _)) {
        return Err(CvxError::PreconditionViolation(
            "quad_over_lin_canon applied to a different atom".into(),
        ));
    }
    let [affine_expr, y] = args else {
        return Err(CvxError::PreconditionViolation(format!(
            "quad_over_lin takes 2 arguments, got {}",
            args.len()
        )));
    };
    let y = denominator_value(y)?;

    let shape = affine_expr.checked_shape().map_err(|e| {
        CvxError::PreconditionViolation(format!("quad_over_lin operand: {}", e))
    })?;
    let size = shape.size();
    let p = csc_scaled_identity(size, 1.0 / y);
    let original = Arc::new(atom.clone());

    // An empty operand needs no substitution: the form covers no entries.
    if affine_expr.is_variable() || size == 0 {
        return Ok(CanonOutput {
            expr: SymbolicQuadForm::new(affine_expr.clone(), p, original),
            constraints: Vec::new(),
        });
    }

    let t = VariableBuilder::new(shape).name(AUX_VAR_NAME).build();
    let constraints = vec![EqualityConstraint::new(t.clone(), affine_expr.clone())?];
    debug!(
        "quad_over_lin: substituted auxiliary variable of size {} (y = {})",
        size, y
    );

    Ok(CanonOutput {
        expr: SymbolicQuadForm::new(t, p, original),
        constraints,
    })
}

fn denominator_value(y: &Expr) -> Result<f64> {
    let value = y.constant_value().ok_or_else(|| {
        CvxError::PreconditionViolation("quad_over_lin denominator must be a constant".into())
    })?;
    let value = value.as_scalar().ok_or_else(|| {
        CvxError::PreconditionViolation(format!(
            "quad_over_lin denominator must be scalar, got shape {}",
            value.shape()
        ))
    })?;
    if !value.is_finite() || value <= 0.0 {
        return Err(CvxError::PreconditionViolation(format!(
            "quad_over_lin denominator must be positive, got {}",
            value
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::quad_over_lin;
    use crate::expr::{constant, constant_vec, variable};

    const TOL: f64 = 1e-12;

    #[test]
    fn test_terminal_variable_needs_no_constraint() {
        let x = variable(3);
        let atom = quad_over_lin(&x, &constant(4.0));
        let out = quad_over_lin_canon(&atom, &[x.clone(), constant(4.0)]).unwrap();

        assert!(out.constraints.is_empty());
        assert_eq!(out.expr.var_id(), x.variable_id());
        assert_eq!(out.expr.size(), 3);
        let dense = out.expr.coefficient_dense();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 0.25 } else { 0.0 };
                assert!((dense[(i, j)] - expected).abs() < TOL);
            }
        }
    }

    #[test]
    fn test_trait_dispatch() {
        let x = variable(());
        let atom = quad_over_lin(&x, &constant(1.0));
        let canon: &dyn AtomCanonicalizer = &QuadOverLinCanon;
        let out = canon.canonicalize(&atom, &[x, constant(1.0)]).unwrap();
        assert_eq!(out.expr.size(), 1);
    }

    #[test]
    fn test_rejects_bad_denominators() {
        let x = variable(2);
        for y in [constant(0.0), constant(-1.0), constant(f64::NAN)] {
            let atom = quad_over_lin(&x, &y);
            let err = quad_over_lin_canon(&atom, &[x.clone(), y]).unwrap_err();
            assert!(matches!(err, CvxError::PreconditionViolation(_)));
        }

        let symbolic = variable(());
        let atom = quad_over_lin(&x, &symbolic);
        assert!(quad_over_lin_canon(&atom, &[x.clone(), symbolic]).is_err());

        let vector = constant_vec(vec![1.0, 2.0]);
        let atom = quad_over_lin(&x, &vector);
        assert!(quad_over_lin_canon(&atom, &[x.clone(), vector]).is_err());
    }

    #[test]
    fn test_rejects_wrong_arity_and_atom() {
        let x = variable(2);
        let atom = quad_over_lin(&x, &constant(1.0));
        assert!(quad_over_lin_canon(&atom, &[x.clone()]).is_err());
        assert!(quad_over_lin_canon(&x, &[x.clone(), constant(1.0)]).is_err());
    }

    #[test]
    fn test_zero_size_operand() {
        let x = variable(0);
        let shifted = &x + &constant_vec(vec![]);
        let atom = quad_over_lin(&shifted, &constant(2.0));
        let out = quad_over_lin_canon(&atom, &[shifted, constant(2.0)]).unwrap();
        assert!(out.constraints.is_empty());
        assert!(out.expr.is_empty());
        assert_eq!(out.expr.p().nnz(), 0);
        // no auxiliary variable is allocated
        assert_eq!(out.expr.var_id(), None);
    }

    #[test]
    fn test_rejects_operands_that_do_not_broadcast() {
        let sum = &variable(3) + &variable(4);
        let atom = quad_over_lin(&sum, &constant(2.0));
        let err = quad_over_lin_canon(&atom, &[sum, constant(2.0)]).unwrap_err();
        assert!(matches!(err, CvxError::PreconditionViolation(_)));
    }
}
