//! Staged native model for the Clarabel backend.
//!
//! Clarabel takes a whole problem at once, in the conic form
//!
//! ```text
//! minimize    (1/2) x' P x + q' x
//! subject to  A x + s == b,  s in K
//! ```
//!
//! `ClarabelModel` lets the adapter describe a problem incrementally
//! (variables with bounds and types, constraint rows, quadratic cost,
//! controls) and assembles the conic data only when solved. Equality rows
//! go into a zero cone; inequality rows and finite variable bounds go into a
//! nonnegative cone.

use std::time::Duration;

use clarabel::algebra::CscMatrix as ClarabelCsc;
use clarabel::solver::{DefaultSettings, DefaultSolver, IPSolver, SolverStatus, SupportedConeT};
use log::debug;
use nalgebra_sparse::CscMatrix;

use super::branch::{branch_and_bound, MipStatus};
use super::cache::{Pattern, SolverCache};
use crate::error::{CvxError, Result};
use crate::solver::options::OptionValue;
use crate::sparse::{csc_from_triplets, csc_upper_triangle};

/// Type of a model variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    /// Real-valued.
    Continuous,
    /// Restricted to {0, 1}.
    Binary,
    /// Restricted to the integers.
    Integer,
}

/// Sense of a constraint row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSense {
    /// `a' x == rhs`
    Equal,
    /// `a' x <= rhs`
    LessEqual,
}

/// A sparse constraint row.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseRow {
    /// Column indices.
    pub cols: Vec<usize>,
    /// Coefficients, parallel to `cols`.
    pub vals: Vec<f64>,
    /// Row sense.
    pub sense: RowSense,
    /// Right-hand side.
    pub rhs: f64,
}

/// Branch-and-bound controls.
#[derive(Debug, Clone, PartialEq)]
pub struct MipControls {
    /// Maximum number of nodes to explore.
    pub max_nodes: usize,
    /// Distance from the nearest integer under which a value counts as integral.
    pub int_tol: f64,
    /// Nodes whose bound is within this of the incumbent are pruned.
    pub gap_abs: f64,
}

impl Default for MipControls {
    fn default() -> Self {
        MipControls {
            max_nodes: 10_000,
            int_tol: 1e-5,
            gap_abs: 1e-6,
        }
    }
}

/// Outcome reported by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelStatus {
    /// Status of a single continuous Clarabel solve.
    Continuous(SolverStatus),
    /// Status of a branch-and-bound search.
    Mip(MipStatus),
}

/// Native solution of a [`ClarabelModel`].
#[derive(Debug, Clone)]
pub struct ModelSolution {
    /// Final status.
    pub status: ModelStatus,
    /// Primal values, when the backend produced an iterate.
    pub x: Option<Vec<f64>>,
    /// Duals of the equality rows, in insertion order. `None` for MIPs.
    pub eq_duals: Option<Vec<f64>>,
    /// Duals of the inequality rows, in insertion order. `None` for MIPs.
    pub ineq_duals: Option<Vec<f64>>,
    /// Objective `(1/2) x' P x + q' x` at `x`.
    pub obj_val: f64,
    /// Interior-point iterations (continuous solves only).
    pub iterations: u32,
    /// Branch-and-bound nodes explored (MIPs only).
    pub nodes: Option<usize>,
    /// Whether a cached solver was reused.
    pub warm_started: bool,
}

/// Result of one continuous relaxation.
#[derive(Debug, Clone)]
pub(crate) struct Relaxation {
    pub status: SolverStatus,
    pub x: Vec<f64>,
    pub eq_duals: Vec<f64>,
    pub ineq_duals: Vec<f64>,
    pub obj_val: f64,
    pub iterations: u32,
}

/// Conic data ready to hand to Clarabel.
#[derive(Debug, Clone)]
pub(crate) struct Assembled {
    pub p: CscMatrix<f64>,
    pub q: Vec<f64>,
    pub a: CscMatrix<f64>,
    pub b: Vec<f64>,
    pub n_eq: usize,
    pub n_ineq: usize,
    pub n_bound: usize,
}

impl Assembled {
    pub fn cones(&self) -> Vec<SupportedConeT<f64>> {
        let mut cones = Vec::new();
        if self.n_eq > 0 {
            cones.push(SupportedConeT::ZeroConeT(self.n_eq));
        }
        let n_nonneg = self.n_ineq + self.n_bound;
        if n_nonneg > 0 {
            cones.push(SupportedConeT::NonnegativeConeT(n_nonneg));
        }
        cones
    }

    pub fn clarabel_p(&self) -> ClarabelCsc<f64> {
        to_clarabel_csc(&self.p)
    }

    pub fn clarabel_a(&self) -> ClarabelCsc<f64> {
        to_clarabel_csc(&self.a)
    }

    /// Build a fresh solver for this data.
    pub fn new_solver(&self, settings: &DefaultSettings<f64>) -> DefaultSolver<f64> {
        DefaultSolver::new(
            &self.clarabel_p(),
            &self.q,
            &self.clarabel_a(),
            &self.b,
            &self.cones(),
            settings.clone(),
        )
    }
}

/// Incrementally built problem for the Clarabel backend.
#[derive(Debug, Clone)]
pub struct ClarabelModel {
    obj: Vec<f64>,
    lb: Vec<f64>,
    ub: Vec<f64>,
    var_types: Vec<VarType>,
    rows: Vec<SparseRow>,
    p: Option<CscMatrix<f64>>,
    settings: DefaultSettings<f64>,
    controls: Vec<(String, OptionValue)>,
    presolve_explicit: bool,
    mip: MipControls,
    infinity: f64,
}

impl ClarabelModel {
    /// Empty minimization model. Bounds at or beyond `infinity` are inactive.
    pub fn new(infinity: f64) -> Self {
        ClarabelModel {
            obj: Vec::new(),
            lb: Vec::new(),
            ub: Vec::new(),
            var_types: Vec::new(),
            rows: Vec::new(),
            p: None,
            settings: DefaultSettings::default(),
            controls: Vec::new(),
            presolve_explicit: false,
            mip: MipControls::default(),
            infinity,
        }
    }

    /// Number of variables.
    pub fn n_var(&self) -> usize {
        self.obj.len()
    }

    /// Number of constraint rows (not counting variable bounds).
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// The infinity sentinel of this model.
    pub fn infinity(&self) -> f64 {
        self.infinity
    }

    /// Add continuous variables with linear costs and bounds.
    ///
    /// Returns the index of the first new variable.
    pub fn add_variables(&mut self, obj: &[f64], lb: &[f64], ub: &[f64]) -> Result<usize> {
        if lb.len() != obj.len() || ub.len() != obj.len() {
            return Err(CvxError::InvalidProblem(format!(
                "{} costs but {} lower and {} upper bounds",
                obj.len(),
                lb.len(),
                ub.len()
            )));
        }
        let first = self.n_var();
        self.obj.extend_from_slice(obj);
        self.lb.extend_from_slice(lb);
        self.ub.extend_from_slice(ub);
        self.var_types
            .extend(std::iter::repeat(VarType::Continuous).take(obj.len()));
        Ok(first)
    }

    /// Set the type of variable `idx`. A later call overrides an earlier one.
    pub fn set_var_type(&mut self, idx: usize, var_type: VarType) -> Result<()> {
        let n = self.n_var();
        let slot = self.var_types.get_mut(idx).ok_or_else(|| {
            CvxError::InvalidProblem(format!("variable {} out of range for {}", idx, n))
        })?;
        *slot = var_type;
        Ok(())
    }

    /// Type of variable `idx`.
    pub fn var_type(&self, idx: usize) -> Option<VarType> {
        self.var_types.get(idx).copied()
    }

    /// Append rows of the given sense. `rows[i]` is `(column indices, values)`.
    pub fn add_rows(
        &mut self,
        rows: Vec<(Vec<usize>, Vec<f64>)>,
        sense: RowSense,
        rhs: &[f64],
    ) -> Result<()> {
        if rows.len() != rhs.len() {
            return Err(CvxError::InvalidProblem(format!(
                "{} rows but {} right-hand sides",
                rows.len(),
                rhs.len()
            )));
        }
        let n = self.n_var();
        for ((cols, vals), &rhs) in rows.into_iter().zip(rhs) {
            if let Some(&c) = cols.iter().find(|&&c| c >= n) {
                return Err(CvxError::InvalidProblem(format!(
                    "row references column {} of {}",
                    c, n
                )));
            }
            self.rows.push(SparseRow {
                cols,
                vals,
                sense,
                rhs,
            });
        }
        Ok(())
    }

    /// Rows in insertion order.
    pub fn rows(&self) -> &[SparseRow] {
        &self.rows
    }

    /// Set the quadratic cost `P`. Only its upper triangle is kept.
    pub fn set_quadratic(&mut self, p: &CscMatrix<f64>) -> Result<()> {
        let n = self.n_var();
        if p.nrows() != n || p.ncols() != n {
            return Err(CvxError::InvalidProblem(format!(
                "quadratic cost is {}x{}, expected {}x{}",
                p.nrows(),
                p.ncols(),
                n,
                n
            )));
        }
        self.p = Some(csc_upper_triangle(p));
        Ok(())
    }

    /// Check if a quadratic cost has been set.
    pub fn has_quadratic(&self) -> bool {
        self.p.is_some()
    }

    /// Silence the solver.
    pub fn hide_output(&mut self) {
        self.settings.verbose = false;
    }

    /// Let the solver print its progress.
    pub fn show_output(&mut self) {
        self.settings.verbose = true;
    }

    /// Check if the solver will print its progress.
    pub fn is_verbose(&self) -> bool {
        self.settings.verbose
    }

    /// Set a named control.
    ///
    /// # Errors
    ///
    /// Returns [`CvxError::InvalidOption`] for unknown names and for values of
    /// the wrong type or out of range.
    pub fn set_control(&mut self, name: &str, value: &OptionValue) -> Result<()> {
        match name {
            "max_iter" => self.settings.max_iter = nonneg_int(name, value)?,
            "time_limit" => self.settings.time_limit = nonneg_float(name, value)?,
            "tol_gap_abs" => self.settings.tol_gap_abs = positive_float(name, value)?,
            "tol_gap_rel" => self.settings.tol_gap_rel = positive_float(name, value)?,
            "tol_feas" => self.settings.tol_feas = positive_float(name, value)?,
            "tol_infeas_abs" => self.settings.tol_infeas_abs = positive_float(name, value)?,
            "tol_infeas_rel" => self.settings.tol_infeas_rel = positive_float(name, value)?,
            "equilibrate_enable" => self.settings.equilibrate_enable = boolean(name, value)?,
            "presolve_enable" => {
                self.settings.presolve_enable = boolean(name, value)?;
                self.presolve_explicit = true;
            }
            "mip_max_nodes" => {
                let nodes: u32 = nonneg_int(name, value)?;
                self.mip.max_nodes = nodes as usize;
            }
            "mip_int_tol" => self.mip.int_tol = positive_float(name, value)?,
            "mip_gap_abs" => self.mip.gap_abs = nonneg_float(name, value)?,
            _ => {
                return Err(CvxError::InvalidOption {
                    name: name.to_string(),
                    reason: "not recognized by CLARABEL".into(),
                })
            }
        }
        self.controls.push((name.to_string(), value.clone()));
        Ok(())
    }

    /// Clarabel settings as currently configured.
    pub fn settings(&self) -> &DefaultSettings<f64> {
        &self.settings
    }

    /// Branch-and-bound controls.
    pub fn mip_controls(&self) -> &MipControls {
        &self.mip
    }

    /// Indices of binary and integer variables.
    pub fn integer_indices(&self) -> Vec<usize> {
        self.var_types
            .iter()
            .enumerate()
            .filter(|(_, t)| **t != VarType::Continuous)
            .map(|(i, _)| i)
            .collect()
    }

    /// Check for binary or integer variables.
    pub fn is_mip(&self) -> bool {
        self.var_types.iter().any(|t| *t != VarType::Continuous)
    }

    /// Variable bounds with binary variables restricted to [0, 1].
    pub fn effective_bounds(&self) -> (Vec<f64>, Vec<f64>) {
        let mut lb = self.lb.clone();
        let mut ub = self.ub.clone();
        for (i, t) in self.var_types.iter().enumerate() {
            if *t == VarType::Binary {
                lb[i] = lb[i].max(0.0);
                ub[i] = ub[i].min(1.0);
            }
        }
        (lb, ub)
    }

    /// Objective `(1/2) x' P x + q' x`.
    pub fn objective(&self, x: &[f64]) -> f64 {
        let linear: f64 = self.obj.iter().zip(x).map(|(qi, xi)| qi * xi).sum();

        let mut quadratic = 0.0;
        if let Some(p) = &self.p {
            for (row, col, val) in p.triplet_iter() {
                if row == col {
                    quadratic += 0.5 * *val * x[row] * x[col];
                } else {
                    // upper triangle only, so each off-diagonal pair appears once
                    quadratic += *val * x[row] * x[col];
                }
            }
        }

        linear + quadratic
    }

    /// Does any constraint row sit at the infinity sentinel?
    fn has_infinite_rhs(&self) -> bool {
        self.rows.iter().any(|r| r.rhs.abs() >= self.infinity)
    }

    /// Assemble conic data for the given variable bounds.
    pub(crate) fn assemble(&self, lb: &[f64], ub: &[f64]) -> Assembled {
        let n = self.n_var();
        let (mut ri, mut ci, mut vi) = (Vec::new(), Vec::new(), Vec::new());
        let mut b = Vec::with_capacity(self.rows.len());

        let eq_rows = self.rows.iter().filter(|r| r.sense == RowSense::Equal);
        let ineq_rows = self.rows.iter().filter(|r| r.sense == RowSense::LessEqual);
        let n_eq = eq_rows.clone().count();
        for row in eq_rows.chain(ineq_rows) {
            let r = b.len();
            for (&c, &v) in row.cols.iter().zip(&row.vals) {
                ri.push(r);
                ci.push(c);
                vi.push(v);
            }
            b.push(row.rhs);
        }
        let n_ineq = b.len() - n_eq;

        // x_j <= ub_j and -x_j <= -lb_j for every finite bound
        for j in 0..n {
            if ub[j] < self.infinity {
                ri.push(b.len());
                ci.push(j);
                vi.push(1.0);
                b.push(ub[j]);
            }
            if lb[j] > -self.infinity {
                ri.push(b.len());
                ci.push(j);
                vi.push(-1.0);
                b.push(-lb[j]);
            }
        }
        let n_bound = b.len() - n_eq - n_ineq;

        let a = csc_from_triplets(b.len(), n, ri, ci, vi);
        let p = self.p.clone().unwrap_or_else(|| CscMatrix::zeros(n, n));

        Assembled {
            p,
            q: self.obj.clone(),
            a,
            b,
            n_eq,
            n_ineq,
            n_bound,
        }
    }

    /// Solve the continuous relaxation under the given bounds.
    pub(crate) fn solve_relaxation(&self, lb: &[f64], ub: &[f64]) -> Relaxation {
        let asm = self.assemble(lb, ub);
        let mut solver = asm.new_solver(&self.settings);
        solver.solve();
        self.relaxation_from(&solver, &asm)
    }

    fn relaxation_from(&self, solver: &DefaultSolver<f64>, asm: &Assembled) -> Relaxation {
        let x = solver.solution.x.clone();
        let z = &solver.solution.z;
        let split = asm.n_eq + asm.n_ineq;
        Relaxation {
            status: solver.solution.status,
            obj_val: self.objective(&x),
            x,
            eq_duals: z.get(..asm.n_eq).map(<[f64]>::to_vec).unwrap_or_default(),
            ineq_duals: z
                .get(asm.n_eq..split)
                .map(<[f64]>::to_vec)
                .unwrap_or_default(),
            iterations: solver.info.iterations,
        }
    }

    /// Solve the model.
    ///
    /// Models with binary or integer variables go through branch and bound;
    /// continuous models are solved once, reusing `cache` when `warm_start`
    /// is set and the cached solver was built for the same structure.
    pub fn solve(&self, cache: Option<&mut SolverCache>, warm_start: bool) -> ModelSolution {
        debug!(
            "solving model with {} variables and {} rows",
            self.n_var(),
            self.n_rows()
        );
        if self.is_mip() {
            return branch_and_bound(self);
        }
        match cache {
            Some(cache) if self.cacheable() => self.solve_cached(cache, warm_start),
            _ => {
                let (lb, ub) = self.effective_bounds();
                let relax = self.solve_relaxation(&lb, &ub);
                continuous_solution(relax, false)
            }
        }
    }

    /// Reusing a solver needs presolve off, which is only safe when no row
    /// relies on presolve to drop it.
    fn cacheable(&self) -> bool {
        !self.has_infinite_rhs() && !(self.presolve_explicit && self.settings.presolve_enable)
    }

    fn solve_cached(&self, cache: &mut SolverCache, warm_start: bool) -> ModelSolution {
        let mut settings = self.settings.clone();
        settings.presolve_enable = false;
        let (lb, ub) = self.effective_bounds();
        let asm = self.assemble(&lb, &ub);
        let pattern = Pattern::new(&asm, &self.controls, settings.verbose);

        if warm_start {
            if let Some(solver) = cache.reuse(&pattern, &asm) {
                solver.solve();
                let relax = self.relaxation_from(solver, &asm);
                return continuous_solution(relax, true);
            }
        }

        let mut solver = asm.new_solver(&settings);
        solver.solve();
        let relax = self.relaxation_from(&solver, &asm);
        cache.store(pattern, solver);
        continuous_solution(relax, false)
    }

    /// Time limit for a whole branch-and-bound search, if one is set.
    pub(crate) fn time_limit(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.settings.time_limit).ok()
    }
}

fn continuous_solution(relax: Relaxation, warm_started: bool) -> ModelSolution {
    ModelSolution {
        status: ModelStatus::Continuous(relax.status),
        x: Some(relax.x),
        eq_duals: Some(relax.eq_duals),
        ineq_duals: Some(relax.ineq_duals),
        obj_val: relax.obj_val,
        iterations: relax.iterations,
        nodes: None,
        warm_started,
    }
}

/// Convert nalgebra CSC to Clarabel CSC.
fn to_clarabel_csc(m: &CscMatrix<f64>) -> ClarabelCsc<f64> {
    ClarabelCsc::new(
        m.nrows(),
        m.ncols(),
        m.col_offsets().to_vec(),
        m.row_indices().to_vec(),
        m.values().to_vec(),
    )
}

fn type_error(name: &str, expected: &str, value: &OptionValue) -> CvxError {
    CvxError::InvalidOption {
        name: name.to_string(),
        reason: format!("expected {}, got {} {}", expected, value.type_name(), value),
    }
}

fn boolean(name: &str, value: &OptionValue) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| type_error(name, "a bool", value))
}

fn nonneg_int(name: &str, value: &OptionValue) -> Result<u32> {
    value
        .as_int()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| type_error(name, "a non-negative int", value))
}

fn nonneg_float(name: &str, value: &OptionValue) -> Result<f64> {
    value
        .as_float()
        .filter(|v| *v >= 0.0)
        .ok_or_else(|| type_error(name, "a non-negative number", value))
}

fn positive_float(name: &str, value: &OptionValue) -> Result<f64> {
    value
        .as_float()
        .filter(|v| *v > 0.0 && v.is_finite())
        .ok_or_else(|| type_error(name, "a positive number", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INF: f64 = 1e20;
    const TOL: f64 = 1e-6;

    fn free(n: usize) -> (Vec<f64>, Vec<f64>) {
        (vec![-INF; n], vec![INF; n])
    }

    #[test]
    fn test_assemble_orders_rows() {
        let mut model = ClarabelModel::new(INF);
        let (lb, ub) = free(2);
        model.add_variables(&[1.0, 1.0], &lb, &ub).unwrap();
        model
            .add_rows(vec![(vec![0], vec![1.0])], RowSense::LessEqual, &[3.0])
            .unwrap();
        model
            .add_rows(vec![(vec![0, 1], vec![1.0, 1.0])], RowSense::Equal, &[2.0])
            .unwrap();
        model.set_var_type(1, VarType::Binary).unwrap();

        let (lb, ub) = model.effective_bounds();
        let asm = model.assemble(&lb, &ub);
        assert_eq!((asm.n_eq, asm.n_ineq, asm.n_bound), (1, 1, 2));
        // equality first, then inequality, then ub and lb of the binary
        assert_eq!(asm.b, vec![2.0, 3.0, 1.0, 0.0]);
        assert_eq!(asm.cones().len(), 2);
    }

    #[test]
    fn test_set_control() {
        let mut model = ClarabelModel::new(INF);
        model.set_control("max_iter", &OptionValue::Int(7)).unwrap();
        model.set_control("tol_feas", &OptionValue::Float(1e-7)).unwrap();
        model.set_control("mip_max_nodes", &OptionValue::Int(3)).unwrap();
        assert_eq!(model.settings().max_iter, 7);
        assert_eq!(model.mip_controls().max_nodes, 3);

        let unknown = model.set_control("nonsense", &OptionValue::Int(1));
        assert!(matches!(unknown, Err(CvxError::InvalidOption { .. })));
        let mistyped = model.set_control("max_iter", &OptionValue::Str("ten".into()));
        assert!(matches!(mistyped, Err(CvxError::InvalidOption { .. })));
        assert!(model.set_control("tol_gap_abs", &OptionValue::Float(-1.0)).is_err());
    }

    #[test]
    fn test_rows_checked() {
        let mut model = ClarabelModel::new(INF);
        let (lb, ub) = free(1);
        model.add_variables(&[0.0], &lb, &ub).unwrap();
        assert!(model
            .add_rows(vec![(vec![1], vec![1.0])], RowSense::Equal, &[0.0])
            .is_err());
        assert!(model.add_rows(vec![], RowSense::Equal, &[1.0]).is_err());
        assert!(model.add_rows(vec![], RowSense::LessEqual, &[]).is_ok());
        assert!(model.set_var_type(4, VarType::Integer).is_err());
    }

    #[test]
    fn test_objective_upper_triangle() {
        let mut model = ClarabelModel::new(INF);
        let (lb, ub) = free(2);
        model.add_variables(&[1.0, 0.0], &lb, &ub).unwrap();
        let p = csc_from_triplets(
            2,
            2,
            vec![0, 0, 1, 1],
            vec![0, 1, 0, 1],
            vec![2.0, 1.0, 1.0, 2.0],
        );
        model.set_quadratic(&p).unwrap();
        // 0.5 * [1 1] P [1 1]' + 1 = 0.5 * 6 + 1
        assert!((model.objective(&[1.0, 1.0]) - 4.0).abs() < TOL);
    }

    #[test]
    fn test_solve_box_qp() {
        // min 0.5 x^2 - 3x  s.t.  x <= 2
        let mut model = ClarabelModel::new(INF);
        let (lb, ub) = free(1);
        model.add_variables(&[-3.0], &lb, &ub).unwrap();
        model
            .add_rows(vec![(vec![0], vec![1.0])], RowSense::LessEqual, &[2.0])
            .unwrap();
        model.set_quadratic(&CscMatrix::identity(1)).unwrap();
        model.hide_output();
        assert!(!model.is_verbose());

        let sol = model.solve(None, false);
        assert_eq!(sol.status, ModelStatus::Continuous(SolverStatus::Solved));
        let x = sol.x.unwrap();
        assert!((x[0] - 2.0).abs() < TOL);
        assert!((sol.obj_val - (-4.0)).abs() < TOL);
        assert!((sol.ineq_duals.unwrap()[0] - 1.0).abs() < TOL);
    }
}
