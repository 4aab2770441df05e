//! Core expression types for cvxreduce.
//!
//! The `Expr` enum is the slice of the expression graph the canonicalizer and
//! the backend adapters need: leaves, affine combinations and the
//! `quad_over_lin` atom. Expressions form an immutable DAG using `Arc` for sharing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use nalgebra::DMatrix;

use super::shape::Shape;
use crate::error::{CvxError, Result};

/// Unique identifier for expressions, variables and constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u64);

impl ExprId {
    /// Generate a new unique ID.
    pub fn new() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        ExprId(NEXT_ID.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for ExprId {
    fn default() -> Self {
        Self::new()
    }
}

/// Numeric value of a constant or of a solved variable block.
#[derive(Debug, Clone, PartialEq)]
pub enum Array {
    /// Dense matrix storage (column-major).
    Dense(DMatrix<f64>),
    /// Scalar value.
    Scalar(f64),
}

impl Array {
    /// Get the shape of the array.
    pub fn shape(&self) -> Shape {
        match self {
            Array::Dense(m) => Shape::matrix(m.nrows(), m.ncols()),
            Array::Scalar(_) => Shape::scalar(),
        }
    }

    /// Get the total number of elements.
    pub fn size(&self) -> usize {
        match self {
            Array::Dense(m) => m.nrows() * m.ncols(),
            Array::Scalar(_) => 1,
        }
    }

    /// Try to get as a scalar value.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Array::Scalar(v) => Some(*v),
            Array::Dense(m) if m.nrows() == 1 && m.ncols() == 1 => Some(m[(0, 0)]),
            _ => None,
        }
    }

    /// Build an array of the given shape from column-major values.
    ///
    /// Scalar shapes produce `Array::Scalar`.
    pub fn from_shape_vec(shape: &Shape, values: Vec<f64>) -> Self {
        if shape.is_scalar() && values.len() == 1 {
            Array::Scalar(values[0])
        } else {
            Array::Dense(DMatrix::from_vec(shape.rows(), shape.cols(), values))
        }
    }

    /// Create from a vector.
    pub fn from_vec(v: Vec<f64>) -> Self {
        let n = v.len();
        Array::Dense(DMatrix::from_vec(n, 1, v))
    }
}

/// Data for a variable expression.
#[derive(Debug, Clone)]
pub struct VariableData {
    /// Unique identifier.
    pub id: ExprId,
    /// Shape of the variable.
    pub shape: Shape,
    /// Optional name for display.
    pub name: Option<String>,
}

/// Data for a constant expression.
#[derive(Debug, Clone)]
pub struct ConstantData {
    /// Unique identifier.
    pub id: ExprId,
    /// The constant value.
    pub value: Array,
}

impl ConstantData {
    /// Get the shape of the constant.
    pub fn shape(&self) -> Shape {
        self.value.shape()
    }
}

/// The core expression type.
///
/// All expressions are immutable and use `Arc` for efficient sharing.
#[derive(Debug, Clone)]
pub enum Expr {
    // ========== Leaf nodes ==========
    /// A decision variable.
    Variable(VariableData),
    /// A constant value.
    Constant(ConstantData),

    // ========== Affine atoms ==========
    /// Addition: a + b
    Add(Arc<Expr>, Arc<Expr>),
    /// Negation: -a
    Neg(Arc<Expr>),
    /// Multiplication: a * b (one side constant)
    Mul(Arc<Expr>, Arc<Expr>),

    // ========== Nonlinear atoms ==========
    /// Quadratic over linear: ||x||_2^2 / y
    QuadOverLin(Arc<Expr>, Arc<Expr>),
}

impl Expr {
    /// Get the shape of the expression.
    pub fn shape(&self) -> Shape {
        match self {
            Expr::Variable(v) => v.shape.clone(),
            Expr::Constant(c) => c.shape(),
            Expr::Add(a, b) | Expr::Mul(a, b) => a
                .shape()
                .broadcast(&b.shape())
                .unwrap_or_else(Shape::scalar),
            Expr::Neg(a) => a.shape(),
            Expr::QuadOverLin(_, _) => Shape::scalar(),
        }
    }

    /// Shape of the expression, checking that every elementwise operand pair
    /// broadcasts.
    ///
    /// [`shape`](Self::shape) falls back to a scalar for operands that do not
    /// broadcast; use this wherever the shape sizes something.
    ///
    /// # Errors
    ///
    /// Returns [`CvxError::ShapeMismatch`] for the first pair that does not
    /// broadcast.
    pub fn checked_shape(&self) -> Result<Shape> {
        match self {
            Expr::Variable(_) | Expr::Constant(_) | Expr::QuadOverLin(_, _) => Ok(self.shape()),
            Expr::Neg(a) => a.checked_shape(),
            Expr::Add(a, b) | Expr::Mul(a, b) => {
                let (lhs, rhs) = (a.checked_shape()?, b.checked_shape()?);
                lhs.broadcast(&rhs).ok_or_else(|| CvxError::ShapeMismatch {
                    expected: lhs.to_string(),
                    got: rhs.to_string(),
                })
            }
        }
    }

    /// Number of elements of the expression.
    pub fn size(&self) -> usize {
        self.shape().size()
    }

    /// Get the unique ID if this is a variable.
    pub fn variable_id(&self) -> Option<ExprId> {
        match self {
            Expr::Variable(v) => Some(v.id),
            _ => None,
        }
    }

    /// Check if this expression is a constant.
    pub fn is_constant(&self) -> bool {
        matches!(self, Expr::Constant(_))
    }

    /// Check if this expression is a terminal variable reference.
    pub fn is_variable(&self) -> bool {
        matches!(self, Expr::Variable(_))
    }

    /// Get the constant value if this is a constant expression.
    pub fn constant_value(&self) -> Option<&Array> {
        match self {
            Expr::Constant(c) => Some(&c.value),
            _ => None,
        }
    }

    /// Direct operands of this node, in order.
    pub fn args(&self) -> Vec<&Expr> {
        match self {
            Expr::Variable(_) | Expr::Constant(_) => Vec::new(),
            Expr::Neg(a) => vec![a.as_ref()],
            Expr::Add(a, b) | Expr::Mul(a, b) | Expr::QuadOverLin(a, b) => {
                vec![a.as_ref(), b.as_ref()]
            }
        }
    }

    /// Collect all variables in this expression.
    pub fn variables(&self) -> Vec<ExprId> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars.sort();
        vars.dedup();
        vars
    }

    fn collect_variables(&self, vars: &mut Vec<ExprId>) {
        match self {
            Expr::Variable(v) => vars.push(v.id),
            other => {
                for a in other.args() {
                    a.collect_variables(vars);
                }
            }
        }
    }
}
