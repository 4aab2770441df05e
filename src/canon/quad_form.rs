//! Symbolic quadratic forms over a single variable.

use std::sync::Arc;

use nalgebra::DMatrix;
use nalgebra_sparse::CscMatrix;

use crate::expr::{Expr, ExprId};
use crate::sparse::csc_to_dense;

/// The quadratic form `x' P x` with `x` a bare variable.
///
/// The matrix assembler folds `P` into the global quadratic cost at the
/// columns owned by `var`. The originating atom is kept for provenance.
///
/// An empty form (0x0 `P`) may act on an arbitrary zero-size expression; it
/// owns no columns.
#[derive(Debug, Clone)]
pub struct SymbolicQuadForm {
    var: Expr,
    p: CscMatrix<f64>,
    original: Arc<Expr>,
}

impl SymbolicQuadForm {
    /// Create a quadratic form. `var` must be a terminal variable whose size
    /// matches the dimension of the square matrix `p`, unless both are empty.
    pub(crate) fn new(var: Expr, p: CscMatrix<f64>, original: Arc<Expr>) -> Self {
        debug_assert!(var.is_variable() || p.nrows() == 0);
        debug_assert_eq!(p.nrows(), var.size());
        debug_assert_eq!(p.ncols(), var.size());
        SymbolicQuadForm { var, p, original }
    }

    /// The variable the form acts on.
    pub fn var(&self) -> &Expr {
        &self.var
    }

    /// Id of the variable the form acts on. `None` for an empty form over a
    /// non-variable expression.
    pub fn var_id(&self) -> Option<ExprId> {
        self.var.variable_id()
    }

    /// The coefficient matrix.
    pub fn p(&self) -> &CscMatrix<f64> {
        &self.p
    }

    /// The atom this form replaces.
    pub fn original(&self) -> &Expr {
        &self.original
    }

    /// Dimension of the form (number of scalar entries of the variable).
    pub fn size(&self) -> usize {
        self.p.nrows()
    }

    /// Check if the form acts on no entries at all.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Dense copy of the coefficient matrix.
    pub fn coefficient_dense(&self) -> DMatrix<f64> {
        csc_to_dense(&self.p)
    }
}
