//! Variable creation with builder pattern.

use super::expression::{Expr, ExprId, VariableData};
use super::shape::Shape;

/// Builder for creating variables.
#[derive(Default)]
pub struct VariableBuilder {
    shape: Shape,
    name: Option<String>,
}

impl VariableBuilder {
    /// Create a new variable builder with the given shape.
    pub fn new(shape: impl Into<Shape>) -> Self {
        Self {
            shape: shape.into(),
            ..Default::default()
        }
    }

    /// Set the name of the variable.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Build the variable expression. Every call allocates a fresh id.
    pub fn build(self) -> Expr {
        Expr::Variable(VariableData {
            id: ExprId::new(),
            shape: self.shape,
            name: self.name,
        })
    }
}

/// Create a variable with the given shape.
///
/// # Examples
///
/// ```
/// use cvxreduce::expr::variable;
///
/// let x = variable(());
/// let y = variable(5);
/// let z = variable((3, 4));
/// # assert_eq!(z.size(), 12);
/// ```
pub fn variable(shape: impl Into<Shape>) -> Expr {
    VariableBuilder::new(shape).build()
}
