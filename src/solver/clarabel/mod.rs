//! Clarabel backend adapter.
//!
//! Translates [`CanonicalProblemData`] into a [`ClarabelModel`], solves it
//! (with branch and bound when variables are boolean or integer) and maps the
//! outcome back into a [`Solution`].

pub mod branch;
pub mod cache;
pub mod model;

use std::collections::HashMap;
use std::time::Instant;

use clarabel::solver::{get_infinity, SolverStatus};
use log::{debug, info};
use once_cell::sync::OnceCell;

pub use branch::MipStatus;
pub use cache::SolverCache;
pub use model::{ClarabelModel, ModelSolution, ModelStatus, RowSense, SparseRow, VarType};

use super::backend::{enter_phase, guarded_invoke, QpSolver, SolvePhase};
use super::data::{clamp_to_infinity, CanonicalProblemData, ConstrBlock, InverseData};
use super::options::SolverOptions;
use super::solution::{Solution, SolverStats};
use super::status::SolveStatus;
use crate::error::{CvxError, Result};
use crate::expr::{Array, ExprId};
use crate::sparse::{csc_has_nonzero, csc_row_slices};

/// Backend name.
pub const CLARABEL: &str = "CLARABEL";

/// Factor applied to Clarabel's `z` to obtain dual values.
///
/// For `F x <= g` Clarabel's multiplier is already nonnegative, and for
/// `A x == b` it satisfies `P x + q + A' y = 0`.
pub const DUAL_SIGN: f64 = 1.0;

static AVAILABLE: OnceCell<std::result::Result<(), String>> = OnceCell::new();

/// Native results of a Clarabel solve.
#[derive(Debug, Clone)]
pub struct ClarabelResults {
    /// Last phase reached.
    pub phase: SolvePhase,
    /// Model solution, or the failure message if the backend broke down.
    pub outcome: std::result::Result<ModelSolution, String>,
    /// Wall time of the invocation in seconds.
    pub solve_time: Option<f64>,
}

impl ClarabelResults {
    /// Results of an invocation that failed with `reason`.
    pub fn backend_error(reason: impl Into<String>, solve_time: Option<f64>) -> Self {
        ClarabelResults {
            phase: SolvePhase::BackendError,
            outcome: Err(reason.into()),
            solve_time,
        }
    }
}

/// QP adapter for the Clarabel interior-point solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClarabelQp;

impl ClarabelQp {
    /// Create the adapter.
    pub fn new() -> Self {
        ClarabelQp
    }

    /// Build the native model for `data`.
    ///
    /// Bounds in `b` and `g` at or beyond Clarabel's infinity are clamped to it.
    pub fn translate(
        &self,
        data: &CanonicalProblemData,
        verbose: bool,
        opts: &SolverOptions,
    ) -> Result<ClarabelModel> {
        data.validate()?;
        let inf = get_infinity();
        let b = clamp_to_infinity(&data.b, inf);
        let g = clamp_to_infinity(&data.g, inf);
        let n = data.n_var;

        let mut model = ClarabelModel::new(inf);
        model.add_variables(&data.q, &vec![-inf; n], &vec![inf; n])?;

        for &i in &data.bool_idx {
            model.set_var_type(i, VarType::Binary)?;
        }
        for &i in &data.int_idx {
            model.set_var_type(i, VarType::Integer)?;
        }

        model.add_rows(csc_row_slices(&data.a), RowSense::Equal, &b)?;
        model.add_rows(csc_row_slices(&data.f), RowSense::LessEqual, &g)?;

        // Only if quadratic form is not null
        if csc_has_nonzero(&data.p) {
            model.set_quadratic(&data.p)?;
        }

        if verbose {
            model.show_output();
        } else {
            model.hide_output();
        }
        set_parameters(&mut model, opts)?;

        debug!(
            "{}: model with {} variables, {} equality and {} inequality rows",
            CLARABEL, n, data.n_eq, data.n_ineq
        );
        Ok(model)
    }
}

/// Apply every option to the model, failing on the first one it rejects.
pub fn set_parameters(model: &mut ClarabelModel, opts: &SolverOptions) -> Result<()> {
    for (name, value) in opts.iter() {
        model.set_control(name, value)?;
    }
    Ok(())
}

/// Map a model status onto the canonical enumeration.
pub fn map_status(status: ModelStatus) -> SolveStatus {
    match status {
        ModelStatus::Continuous(s) => map_native_status(s),
        ModelStatus::Mip(s) => match s {
            MipStatus::Optimal => SolveStatus::Optimal,
            MipStatus::Infeasible => SolveStatus::Infeasible,
            MipStatus::Unbounded => SolveStatus::Unbounded,
            MipStatus::NodeLimit | MipStatus::TimeLimit | MipStatus::Unresolved(_) => {
                SolveStatus::UserLimit
            }
            MipStatus::RelaxationFailed(s) => map_native_status(s),
        },
    }
}

/// Map a Clarabel status onto the canonical enumeration.
pub fn map_native_status(status: SolverStatus) -> SolveStatus {
    match status {
        SolverStatus::Solved => SolveStatus::Optimal,
        SolverStatus::AlmostSolved => SolveStatus::OptimalInaccurate,
        SolverStatus::PrimalInfeasible => SolveStatus::Infeasible,
        SolverStatus::AlmostPrimalInfeasible => SolveStatus::InfeasibleInaccurate,
        SolverStatus::DualInfeasible => SolveStatus::Unbounded,
        SolverStatus::AlmostDualInfeasible => SolveStatus::UnboundedInaccurate,
        SolverStatus::MaxIterations | SolverStatus::MaxTime => SolveStatus::UserLimit,
        _ => SolveStatus::SolverError,
    }
}

/// Solve a one-variable LP to see whether Clarabel works in this process.
fn probe() -> std::result::Result<(), String> {
    let inf = get_infinity();
    let mut model = ClarabelModel::new(inf);
    model.hide_output();
    // min x  s.t.  x >= 1
    model
        .add_variables(&[1.0], &[-inf], &[inf])
        .and_then(|_| model.add_rows(vec![(vec![0], vec![-1.0])], RowSense::LessEqual, &[-1.0]))
        .map_err(|e| e.to_string())?;
    let sol = guarded_invoke(CLARABEL, || model.solve(None, false))?;
    match sol.status {
        ModelStatus::Continuous(SolverStatus::Solved) => Ok(()),
        other => Err(format!("probe problem ended with {:?}", other)),
    }
}

/// Run a native solve with timing and panic capture.
///
/// A failed run empties `cache`.
fn invoke(
    cache: Option<&mut SolverCache>,
    run: impl FnOnce(Option<&mut SolverCache>) -> ModelSolution,
) -> ClarabelResults {
    enter_phase(CLARABEL, SolvePhase::Invoked);
    let mut cache = cache;
    let start = Instant::now();
    let outcome = guarded_invoke(CLARABEL, || run(cache.as_deref_mut()));
    let solve_time = Some(start.elapsed().as_secs_f64());

    let phase = match &outcome {
        Ok(sol) => {
            info!(
                "{}: {:?} in {:.3}s",
                CLARABEL,
                sol.status,
                solve_time.unwrap_or_default()
            );
            SolvePhase::Solved
        }
        Err(_) => {
            // the cached solver may have been left mid-update
            if let Some(cache) = cache {
                cache.clear();
            }
            SolvePhase::BackendError
        }
    };
    ClarabelResults {
        phase: enter_phase(CLARABEL, phase),
        outcome,
        solve_time,
    }
}

fn split_blocks(values: &[f64], blocks: &[ConstrBlock], out: &mut HashMap<ExprId, Array>) {
    for block in blocks {
        if let Some(slice) = values.get(block.offset..block.offset + block.size) {
            let dual: Vec<f64> = slice.iter().map(|v| v * DUAL_SIGN).collect();
            let arr = if block.size == 1 {
                Array::Scalar(dual[0])
            } else {
                Array::from_vec(dual)
            };
            out.insert(block.id, arr);
        }
    }
}

impl QpSolver for ClarabelQp {
    type Results = ClarabelResults;
    type Cache = SolverCache;

    fn name(&self) -> &'static str {
        CLARABEL
    }

    fn mip_capable(&self) -> bool {
        true
    }

    fn check_available(&self) -> Result<()> {
        AVAILABLE
            .get_or_init(probe)
            .clone()
            .map_err(|reason| CvxError::BackendUnavailable {
                backend: CLARABEL.to_string(),
                reason,
            })
    }

    fn solve_via_data(
        &self,
        data: &CanonicalProblemData,
        warm_start: bool,
        verbose: bool,
        opts: &SolverOptions,
        cache: Option<&mut SolverCache>,
    ) -> Result<ClarabelResults> {
        enter_phase(CLARABEL, SolvePhase::NotStarted);
        enter_phase(CLARABEL, SolvePhase::Translating);
        let model = self.translate(data, verbose, opts)?;

        Ok(invoke(cache, |cache| model.solve(cache, warm_start)))
    }

    fn invert(&self, results: ClarabelResults, inverse_data: &InverseData) -> Solution {
        let mut attr = SolverStats {
            solve_time: results.solve_time,
            ..SolverStats::default()
        };
        let sol = match results.outcome {
            Ok(sol) => sol,
            Err(_) => {
                enter_phase(CLARABEL, SolvePhase::Inverted);
                return Solution::failure(SolveStatus::SolverError, attr);
            }
        };

        let is_mip = inverse_data.is_mip || sol.nodes.is_some();
        attr.num_iters = if is_mip { 0 } else { sol.iterations };
        if let Some(nodes) = sol.nodes {
            attr.extra.insert("nodes".to_string(), nodes as f64);
        }
        if sol.warm_started {
            attr.extra.insert("warm_started".to_string(), 1.0);
        }

        let status = map_status(sol.status);
        enter_phase(CLARABEL, SolvePhase::Inverted);

        let x = match sol.x {
            Some(x) if status.has_solution() => x,
            _ => return Solution::failure(status, attr),
        };

        let primal_vars: HashMap<ExprId, Array> = inverse_data
            .var_blocks
            .iter()
            .filter_map(|block| {
                let size = block.shape.size();
                x.get(block.offset..block.offset + size)
                    .map(|vals| (block.id, Array::from_shape_vec(&block.shape, vals.to_vec())))
            })
            .collect();

        let dual_vars = match (is_mip, sol.eq_duals, sol.ineq_duals) {
            (false, Some(eq), Some(ineq)) => {
                let mut duals = HashMap::new();
                split_blocks(&eq, &inverse_data.eq_blocks, &mut duals);
                split_blocks(&ineq, &inverse_data.ineq_blocks, &mut duals);
                Some(duals)
            }
            _ => None,
        };

        Solution::new(status, sol.obj_val, Some(primal_vars), dual_vars, attr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_map() {
        let cases = [
            (SolverStatus::Solved, SolveStatus::Optimal),
            (SolverStatus::AlmostSolved, SolveStatus::OptimalInaccurate),
            (SolverStatus::PrimalInfeasible, SolveStatus::Infeasible),
            (
                SolverStatus::AlmostPrimalInfeasible,
                SolveStatus::InfeasibleInaccurate,
            ),
            (SolverStatus::DualInfeasible, SolveStatus::Unbounded),
            (
                SolverStatus::AlmostDualInfeasible,
                SolveStatus::UnboundedInaccurate,
            ),
            (SolverStatus::MaxIterations, SolveStatus::UserLimit),
            (SolverStatus::MaxTime, SolveStatus::UserLimit),
            (SolverStatus::NumericalError, SolveStatus::SolverError),
            (SolverStatus::InsufficientProgress, SolveStatus::SolverError),
            (SolverStatus::Unsolved, SolveStatus::SolverError),
        ];
        for (native, expected) in cases {
            assert_eq!(map_status(ModelStatus::Continuous(native)), expected);
        }
        assert_eq!(
            map_status(ModelStatus::Mip(MipStatus::NodeLimit)),
            SolveStatus::UserLimit
        );
        assert_eq!(
            map_status(ModelStatus::Mip(MipStatus::Unresolved(
                SolverStatus::NumericalError
            ))),
            SolveStatus::UserLimit
        );
        assert_eq!(
            map_status(ModelStatus::Mip(MipStatus::RelaxationFailed(
                SolverStatus::NumericalError
            ))),
            SolveStatus::SolverError
        );
    }

    #[test]
    fn test_probe_succeeds() {
        assert!(ClarabelQp::new().check_available().is_ok());
        assert!(ClarabelQp::new().is_installed());
    }

    #[test]
    fn test_panicking_solve_clears_cache() {
        use crate::expr::variable;
        use crate::sparse::csc_from_triplets;
        use nalgebra_sparse::CscMatrix;

        // minimize (1/2)||x||^2  s.t.  x0 + x1 == 2
        let x = variable(2);
        let data = CanonicalProblemData::new(
            CscMatrix::identity(2),
            vec![0.0, 0.0],
            csc_from_triplets(1, 2, vec![0, 0], vec![0, 1], vec![1.0, 1.0]),
            vec![2.0],
            CscMatrix::zeros(0, 2),
            vec![],
        )
        .unwrap();
        let inverse = InverseData::from_vars([&x]).with_eq_block(ExprId::new(), 1);
        let qp = ClarabelQp::new();
        let opts = SolverOptions::new();
        let mut cache = SolverCache::new();

        let ok = qp
            .solve_via_data(&data, true, false, &opts, Some(&mut cache))
            .unwrap();
        assert_eq!(ok.phase, SolvePhase::Solved);
        assert!(cache.is_populated());

        // the native call breaks after touching the cached solver
        let model = qp.translate(&data, false, &opts).unwrap();
        let results = invoke(Some(&mut cache), |cache| {
            let _ = model.solve(cache, true);
            panic!("solver state corrupted")
        });

        assert_eq!(results.phase, SolvePhase::BackendError);
        assert_eq!(results.outcome.as_ref().unwrap_err(), "solver state corrupted");
        assert!(results.solve_time.is_some());
        assert!(!cache.is_populated());

        let sol = qp.invert(results, &inverse);
        assert_eq!(sol.status(), SolveStatus::SolverError);
        assert!(sol.primal_vars().is_none());
    }

    #[test]
    fn test_dual_sign_is_identity() {
        assert_eq!(DUAL_SIGN, 1.0);
    }
}
