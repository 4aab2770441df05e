//! Canonical problem data handed to backends, and the data needed to map
//! their results back onto the original variables and constraints.
//!
//! The canonical QP is
//!
//! ```text
//! minimize    (1/2) x' P x + q' x
//! subject to  A x == b
//!             F x <= g
//! ```
//!
//! with `x` of length `n_var`, some of whose entries may be marked boolean
//! or integer.

use log::debug;
use nalgebra_sparse::CscMatrix;

use crate::constraints::EqualityConstraint;
use crate::error::{CvxError, Result};
use crate::expr::{Expr, ExprId, Shape};
use crate::sparse::csc_is_symmetric;

const SYMMETRY_TOL: f64 = 1e-9;

/// Assembled canonical QP.
#[derive(Debug, Clone)]
pub struct CanonicalProblemData {
    /// Quadratic cost (n_var x n_var, symmetric).
    pub p: CscMatrix<f64>,
    /// Linear cost (n_var).
    pub q: Vec<f64>,
    /// Equality matrix (n_eq x n_var).
    pub a: CscMatrix<f64>,
    /// Equality right-hand side (n_eq).
    pub b: Vec<f64>,
    /// Inequality matrix (n_ineq x n_var).
    pub f: CscMatrix<f64>,
    /// Inequality right-hand side (n_ineq).
    pub g: Vec<f64>,
    /// Number of variables.
    pub n_var: usize,
    /// Number of equality rows.
    pub n_eq: usize,
    /// Number of inequality rows.
    pub n_ineq: usize,
    /// Indices of variables restricted to {0, 1}.
    pub bool_idx: Vec<usize>,
    /// Indices of variables restricted to the integers.
    pub int_idx: Vec<usize>,
}

impl CanonicalProblemData {
    /// Bundle the problem matrices, deriving the dimensions from them.
    ///
    /// # Errors
    ///
    /// Returns [`CvxError::InvalidProblem`] if the pieces do not fit together.
    pub fn new(
        p: CscMatrix<f64>,
        q: Vec<f64>,
        a: CscMatrix<f64>,
        b: Vec<f64>,
        f: CscMatrix<f64>,
        g: Vec<f64>,
    ) -> Result<Self> {
        let data = CanonicalProblemData {
            n_var: q.len(),
            n_eq: a.nrows(),
            n_ineq: f.nrows(),
            p,
            q,
            a,
            b,
            f,
            g,
            bool_idx: Vec::new(),
            int_idx: Vec::new(),
        };
        data.validate()?;
        Ok(data)
    }

    /// An unconstrained problem over `n_var` variables.
    pub fn unconstrained(p: CscMatrix<f64>, q: Vec<f64>) -> Result<Self> {
        let n = q.len();
        Self::new(
            p,
            q,
            CscMatrix::zeros(0, n),
            Vec::new(),
            CscMatrix::zeros(0, n),
            Vec::new(),
        )
    }

    /// Mark variables as boolean.
    pub fn with_bool_idx(mut self, idx: impl IntoIterator<Item = usize>) -> Self {
        self.bool_idx = idx.into_iter().collect();
        self
    }

    /// Mark variables as integer.
    pub fn with_int_idx(mut self, idx: impl IntoIterator<Item = usize>) -> Self {
        self.int_idx = idx.into_iter().collect();
        self
    }

    /// Does any variable carry an integrality restriction?
    pub fn is_mip(&self) -> bool {
        !self.bool_idx.is_empty() || !self.int_idx.is_empty()
    }

    /// Check dimensions, symmetry of `P` and index ranges.
    pub fn validate(&self) -> Result<()> {
        let n = self.n_var;
        if self.q.len() != n {
            return Err(invalid(format!("q has length {}, expected {}", self.q.len(), n)));
        }
        if self.p.nrows() != n || self.p.ncols() != n {
            return Err(invalid(format!(
                "P is {}x{}, expected {}x{}",
                self.p.nrows(),
                self.p.ncols(),
                n,
                n
            )));
        }
        if !csc_is_symmetric(&self.p, SYMMETRY_TOL) {
            return Err(invalid("P is not symmetric".into()));
        }
        check_block("A", &self.a, &self.b, self.n_eq, n)?;
        check_block("F", &self.f, &self.g, self.n_ineq, n)?;
        if let Some(&i) = self.bool_idx.iter().chain(&self.int_idx).find(|&&i| i >= n) {
            return Err(invalid(format!(
                "integrality index {} out of range for {} variables",
                i, n
            )));
        }
        Ok(())
    }
}

fn check_block(
    name: &str,
    m: &CscMatrix<f64>,
    rhs: &[f64],
    rows: usize,
    n_var: usize,
) -> Result<()> {
    if m.nrows() != rows || m.ncols() != n_var || rhs.len() != rows {
        return Err(invalid(format!(
            "{} is {}x{} with rhs of length {}, expected {}x{} with rhs of length {}",
            name,
            m.nrows(),
            m.ncols(),
            rhs.len(),
            rows,
            n_var,
            rows
        )));
    }
    Ok(())
}

fn invalid(msg: String) -> CvxError {
    CvxError::InvalidProblem(msg)
}

/// Clamp every entry whose magnitude is at least `infinity` to `+-infinity`.
///
/// Returns a new vector; the input is left untouched so the same problem data
/// can be handed to several backends.
pub fn clamp_to_infinity(values: &[f64], infinity: f64) -> Vec<f64> {
    let mut clamped = 0usize;
    let out = values
        .iter()
        .map(|&v| {
            if v >= infinity {
                clamped += 1;
                infinity
            } else if v <= -infinity {
                clamped += 1;
                -infinity
            } else {
                v
            }
        })
        .collect();
    if clamped > 0 {
        debug!("clamped {} bound(s) to +-{:e}", clamped, infinity);
    }
    out
}

/// Columns `offset..offset + shape.size()` of `x` belong to variable `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct VarBlock {
    /// Variable id.
    pub id: ExprId,
    /// First column.
    pub offset: usize,
    /// Shape of the variable.
    pub shape: Shape,
}

/// Rows `offset..offset + size` of `A` or `F` belong to constraint `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstrBlock {
    /// Constraint id.
    pub id: ExprId,
    /// First row.
    pub offset: usize,
    /// Number of rows.
    pub size: usize,
}

/// Ordered identity of the variable and constraint blocks of a
/// [`CanonicalProblemData`], used to split raw solver vectors back up.
#[derive(Debug, Clone, Default)]
pub struct InverseData {
    /// Variable blocks in column order.
    pub var_blocks: Vec<VarBlock>,
    /// Equality constraint blocks in row order of `A`.
    pub eq_blocks: Vec<ConstrBlock>,
    /// Inequality constraint blocks in row order of `F`.
    pub ineq_blocks: Vec<ConstrBlock>,
    /// Whether the problem has integrality restrictions.
    pub is_mip: bool,
}

impl InverseData {
    /// Empty inverse data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lay out the given variables consecutively, in order.
    ///
    /// Non-variable expressions are skipped.
    pub fn from_vars<'a>(vars: impl IntoIterator<Item = &'a Expr>) -> Self {
        vars.into_iter()
            .filter_map(|v| v.variable_id().map(|id| (id, v.shape())))
            .fold(Self::new(), |inv, (id, shape)| inv.with_var(id, shape))
    }

    /// Append a variable block after the existing ones.
    pub fn with_var(mut self, id: ExprId, shape: Shape) -> Self {
        let offset = self.n_var();
        self.var_blocks.push(VarBlock { id, offset, shape });
        self
    }

    /// Append an equality block after the existing ones.
    pub fn with_eq_block(mut self, id: ExprId, size: usize) -> Self {
        let offset = block_rows(&self.eq_blocks);
        self.eq_blocks.push(ConstrBlock { id, offset, size });
        self
    }

    /// Append an inequality block after the existing ones.
    pub fn with_ineq_block(mut self, id: ExprId, size: usize) -> Self {
        let offset = block_rows(&self.ineq_blocks);
        self.ineq_blocks.push(ConstrBlock { id, offset, size });
        self
    }

    /// Append one equality block per constraint.
    pub fn with_eq_constraints(self, constraints: &[EqualityConstraint]) -> Self {
        constraints
            .iter()
            .fold(self, |inv, c| inv.with_eq_block(c.id(), c.size()))
    }

    /// Set the integrality flag.
    pub fn mip(mut self, is_mip: bool) -> Self {
        self.is_mip = is_mip;
        self
    }

    /// Total number of variable columns covered.
    pub fn n_var(&self) -> usize {
        self.var_blocks.iter().map(|b| b.shape.size()).sum()
    }

    /// Total number of equality rows covered.
    pub fn n_eq(&self) -> usize {
        block_rows(&self.eq_blocks)
    }

    /// Total number of inequality rows covered.
    pub fn n_ineq(&self) -> usize {
        block_rows(&self.ineq_blocks)
    }

    /// Check that the blocks cover exactly the dimensions of `data`.
    pub fn validate(&self, data: &CanonicalProblemData) -> Result<()> {
        let dims = (self.n_var(), self.n_eq(), self.n_ineq());
        let expected = (data.n_var, data.n_eq, data.n_ineq);
        if dims != expected {
            return Err(invalid(format!(
                "inverse data covers (n_var, n_eq, n_ineq) = {:?}, problem has {:?}",
                dims, expected
            )));
        }
        Ok(())
    }
}

fn block_rows(blocks: &[ConstrBlock]) -> usize {
    blocks.last().map_or(0, |b| b.offset + b.size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::variable;
    use crate::sparse::csc_from_triplets;

    #[test]
    fn test_clamp_to_infinity() {
        let inf = 1e20;
        let v = vec![1.0, 1e30, -1e25, f64::INFINITY, -1e20, 5e19];
        let c = clamp_to_infinity(&v, inf);
        assert_eq!(c, vec![1.0, inf, -inf, inf, -inf, 5e19]);
        // input untouched
        assert_eq!(v[1], 1e30);
    }

    #[test]
    fn test_new_derives_dims() {
        let data = CanonicalProblemData::new(
            CscMatrix::identity(2),
            vec![0.0, 0.0],
            csc_from_triplets(1, 2, vec![0, 0], vec![0, 1], vec![1.0, 1.0]),
            vec![2.0],
            CscMatrix::zeros(0, 2),
            vec![],
        )
        .unwrap()
        .with_bool_idx([0]);
        assert_eq!((data.n_var, data.n_eq, data.n_ineq), (2, 1, 0));
        assert!(data.is_mip());
    }

    #[test]
    fn test_validate_rejects_mismatch() {
        let bad_rhs = CanonicalProblemData::new(
            CscMatrix::identity(2),
            vec![0.0, 0.0],
            CscMatrix::zeros(1, 2),
            vec![],
            CscMatrix::zeros(0, 2),
            vec![],
        );
        assert!(matches!(bad_rhs, Err(CvxError::InvalidProblem(_))));

        let asym = csc_from_triplets(2, 2, vec![0], vec![1], vec![1.0]);
        assert!(CanonicalProblemData::unconstrained(asym, vec![0.0, 0.0]).is_err());

        let data = CanonicalProblemData::unconstrained(CscMatrix::identity(1), vec![0.0])
            .unwrap()
            .with_int_idx([3]);
        assert!(data.validate().is_err());
    }

    #[test]
    fn test_inverse_data_offsets() {
        let x = variable(3);
        let y = variable(());
        let inv = InverseData::from_vars([&x, &y])
            .with_eq_block(ExprId::new(), 2)
            .with_eq_block(ExprId::new(), 1);
        assert_eq!(inv.var_blocks[1].offset, 3);
        assert_eq!(inv.n_var(), 4);
        assert_eq!(inv.eq_blocks[1].offset, 2);
        assert_eq!(inv.n_eq(), 3);
        assert_eq!(inv.n_ineq(), 0);
    }
}
