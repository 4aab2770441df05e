//! Expression types and creation utilities.
//!
//! This module provides the expression slice the canonicalizers consume:
//! - `Expr` - The expression enum
//! - `Shape` - Shape information for expressions
//! - Variable creation via `variable()` and `VariableBuilder`
//! - Constant creation via `constant()` and related functions

pub mod constant;
pub mod expression;
pub mod shape;
pub mod variable;

pub use constant::{constant, constant_vec};
pub use expression::{Array, ConstantData, Expr, ExprId, VariableData};
pub use shape::Shape;
pub use variable::{variable, VariableBuilder};
