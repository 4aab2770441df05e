//! Backend-independent solve results.

use std::collections::{BTreeMap, HashMap};

use super::status::SolveStatus;
use crate::error::{CvxError, Result};
use crate::expr::{Array, Expr, ExprId};

/// Solver statistics attached to a [`Solution`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverStats {
    /// Wall time of the backend invocation in seconds, if measured.
    pub solve_time: Option<f64>,
    /// Iteration count. Zero for integer problems.
    pub num_iters: u32,
    /// Backend-specific extras (for example `nodes`, `warm_started`).
    pub extra: BTreeMap<String, f64>,
}

/// Result of a solve, produced once by a backend adapter's `invert`.
///
/// `primal_vars` is present only when the status carries a solution;
/// `dual_vars` additionally requires a continuous problem.
#[derive(Debug, Clone)]
pub struct Solution {
    status: SolveStatus,
    opt_val: f64,
    primal_vars: Option<HashMap<ExprId, Array>>,
    dual_vars: Option<HashMap<ExprId, Array>>,
    attr: SolverStats,
}

impl Solution {
    /// Assemble a solution.
    pub fn new(
        status: SolveStatus,
        opt_val: f64,
        primal_vars: Option<HashMap<ExprId, Array>>,
        dual_vars: Option<HashMap<ExprId, Array>>,
        attr: SolverStats,
    ) -> Self {
        Solution {
            status,
            opt_val,
            primal_vars,
            dual_vars,
            attr,
        }
    }

    /// A solution without primal or dual data, valued per `status`.
    pub fn failure(status: SolveStatus, attr: SolverStats) -> Self {
        Self::new(status, status.missing_value(), None, None, attr)
    }

    /// Status of the solve.
    pub fn status(&self) -> SolveStatus {
        self.status
    }

    /// Objective value (extended real).
    pub fn opt_val(&self) -> f64 {
        self.opt_val
    }

    /// Primal values keyed by variable id.
    pub fn primal_vars(&self) -> Option<&HashMap<ExprId, Array>> {
        self.primal_vars.as_ref()
    }

    /// Dual values keyed by constraint id.
    pub fn dual_vars(&self) -> Option<&HashMap<ExprId, Array>> {
        self.dual_vars.as_ref()
    }

    /// Solver statistics.
    pub fn attr(&self) -> &SolverStats {
        &self.attr
    }

    /// Primal value of a variable by id.
    pub fn get_value(&self, var_id: ExprId) -> Option<&Array> {
        self.primal_vars.as_ref().and_then(|p| p.get(&var_id))
    }

    /// Dual value of a constraint by id.
    pub fn get_dual(&self, constr_id: ExprId) -> Option<&Array> {
        self.dual_vars.as_ref().and_then(|d| d.get(&constr_id))
    }

    /// Scalar value of a variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the expression is not a variable, has no value in
    /// this solution, or is not scalar.
    pub fn value(&self, var: &Expr) -> Result<f64> {
        let var_id = var
            .variable_id()
            .ok_or_else(|| CvxError::InvalidProblem("Expression is not a variable".into()))?;
        let arr = self
            .get_value(var_id)
            .ok_or_else(|| CvxError::InvalidProblem("Variable not in solution".into()))?;
        arr.as_scalar().ok_or_else(|| {
            CvxError::InvalidProblem(format!(
                "Variable has shape {}, expected a scalar",
                arr.shape()
            ))
        })
    }

    /// Check if dual values are available.
    pub fn has_duals(&self) -> bool {
        self.dual_vars.is_some()
    }
}
