//! Nonlinear atoms.

use std::sync::Arc;

use crate::expr::Expr;

/// Quadratic over linear: ||x||_2^2 / y.
///
/// Properties:
/// - Curvature: Convex (when x is affine and y is concave and positive)
/// - Sign: Non-negative
/// - Domain: y > 0
///
/// For QP targets `y` must resolve to a positive constant scalar; see
/// [`quad_over_lin_canon`](crate::canon::quad_over_lin_canon).
pub fn quad_over_lin(x: &Expr, y: &Expr) -> Expr {
    Expr::QuadOverLin(Arc::new(x.clone()), Arc::new(y.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{constant, variable, Shape};

    #[test]
    fn test_quad_over_lin_is_scalar() {
        let x = variable(4);
        let atom = quad_over_lin(&x, &constant(2.0));
        assert_eq!(atom.shape(), Shape::scalar());
        assert_eq!(atom.args().len(), 2);
    }
}
