//! Affine combinations of expressions.
//!
//! Only the operators needed to build canonicalizer operands are provided:
//! addition, subtraction, negation and scaling by a constant.

use std::ops::{Add, Mul, Neg, Sub};
use std::sync::Arc;

use crate::expr::{constant, Expr};

fn add_node(lhs: Expr, rhs: Expr) -> Expr {
    Expr::Add(Arc::new(lhs), Arc::new(rhs))
}

fn neg_node(arg: Expr) -> Expr {
    Expr::Neg(Arc::new(arg))
}

fn sub_node(lhs: Expr, rhs: Expr) -> Expr {
    add_node(lhs, neg_node(rhs))
}

fn scale_node(scalar: f64, arg: Expr) -> Expr {
    Expr::Mul(Arc::new(constant(scalar)), Arc::new(arg))
}

// Owned and borrowed operand combinations for a binary operator.
macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $build:ident) => {
        impl $trait for Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                $build(self, rhs)
            }
        }

        impl $trait for &Expr {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                $build(self.clone(), rhs.clone())
            }
        }

        impl $trait<&Expr> for Expr {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                $build(self, rhs.clone())
            }
        }

        impl $trait<Expr> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                $build(self.clone(), rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, add_node);
impl_binary_op!(Sub, sub, sub_node);

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        neg_node(self)
    }
}

impl Neg for &Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        neg_node(self.clone())
    }
}

impl Mul<f64> for Expr {
    type Output = Expr;

    fn mul(self, rhs: f64) -> Expr {
        scale_node(rhs, self)
    }
}

impl Mul<f64> for &Expr {
    type Output = Expr;

    fn mul(self, rhs: f64) -> Expr {
        scale_node(rhs, self.clone())
    }
}

impl Mul<&Expr> for f64 {
    type Output = Expr;

    fn mul(self, rhs: &Expr) -> Expr {
        scale_node(self, rhs.clone())
    }
}

#[cfg(test)]
mod tests {
    use crate::expr::{variable, Expr, Shape};

    #[test]
    fn test_add_is_not_terminal() {
        let v0 = variable(1);
        let v1 = variable(1);
        let sum = &v0 + &v1;
        assert!(matches!(sum, Expr::Add(_, _)));
        assert_eq!(sum.shape(), Shape::vector(1));
        assert_eq!(sum.variables().len(), 2);
    }

    #[test]
    fn test_sub_and_scale() {
        let x = variable(3);
        let y = variable(3);
        let e = 2.0 * &(&x - &y);
        assert!(matches!(e, Expr::Mul(_, _)));
        assert_eq!(e.shape(), Shape::vector(3));
    }
}
