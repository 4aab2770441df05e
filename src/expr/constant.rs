//! Constant expression creation.

use super::expression::{Array, ConstantData, Expr, ExprId};

/// Create a constant expression from a scalar.
pub fn constant(value: f64) -> Expr {
    Expr::Constant(ConstantData {
        id: ExprId::new(),
        value: Array::Scalar(value),
    })
}

/// Create a constant column from `values`. The result has shape `(n, 1)`.
pub fn constant_vec(values: Vec<f64>) -> Expr {
    Expr::Constant(ConstantData {
        id: ExprId::new(),
        value: Array::from_vec(values),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Shape;

    #[test]
    fn test_constant_scalar() {
        let c = constant(2.5);
        assert_eq!(c.constant_value().and_then(Array::as_scalar), Some(2.5));
        assert_eq!(c.shape(), Shape::scalar());
    }

    #[test]
    fn test_constant_vec_shape() {
        let c = constant_vec(vec![1.0, 2.0, 3.0]);
        assert_eq!(c.shape(), Shape::matrix(3, 1));
    }
}
