//! Sparse matrix utilities.
//!
//! Helper functions for working with nalgebra-sparse matrices.

use std::collections::HashMap;

use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CscMatrix, CsrMatrix};

/// Create a CSC matrix from triplets (row, col, value).
///
/// Duplicates are summed together.
pub fn csc_from_triplets(
    nrows: usize,
    ncols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    vals: Vec<f64>,
) -> CscMatrix<f64> {
    if rows.is_empty() {
        return CscMatrix::zeros(nrows, ncols);
    }

    let mut coo = CooMatrix::new(nrows, ncols);
    for ((row, col), val) in rows.into_iter().zip(cols).zip(vals) {
        if row < nrows && col < ncols {
            coo.push(row, col, val);
        }
    }

    CscMatrix::from(&coo)
}

/// Create a CSC matrix `scale * I_n`.
pub fn csc_scaled_identity(n: usize, scale: f64) -> CscMatrix<f64> {
    csc_scale(&CscMatrix::identity(n), scale)
}

/// Convert CSC to dense matrix.
pub fn csc_to_dense(sparse: &CscMatrix<f64>) -> DMatrix<f64> {
    let mut dense = DMatrix::zeros(sparse.nrows(), sparse.ncols());
    for (row, col, val) in sparse.triplet_iter() {
        dense[(row, col)] += *val;
    }
    dense
}

/// Scale a CSC matrix.
pub fn csc_scale(a: &CscMatrix<f64>, scalar: f64) -> CscMatrix<f64> {
    let values: Vec<f64> = a.values().iter().map(|v| v * scalar).collect();
    let col_offsets: Vec<usize> = a.col_offsets().to_vec();
    let row_indices: Vec<usize> = a.row_indices().to_vec();
    CscMatrix::try_from_csc_data(a.nrows(), a.ncols(), col_offsets, row_indices, values)
        .unwrap_or_else(|_| CscMatrix::zeros(a.nrows(), a.ncols()))
}

/// Does the matrix hold at least one stored entry that is not zero?
pub fn csc_has_nonzero(a: &CscMatrix<f64>) -> bool {
    a.values().iter().any(|v| *v != 0.0)
}

/// Keep the upper triangle (row <= col) of a matrix, dropping explicit zeros.
pub fn csc_upper_triangle(a: &CscMatrix<f64>) -> CscMatrix<f64> {
    let (mut rows, mut cols, mut vals) = (Vec::new(), Vec::new(), Vec::new());
    for (r, c, v) in a.triplet_iter() {
        if r <= c && *v != 0.0 {
            rows.push(r);
            cols.push(c);
            vals.push(*v);
        }
    }
    csc_from_triplets(a.nrows(), a.ncols(), rows, cols, vals)
}

/// Check that a square matrix equals its transpose within `tol`.
pub fn csc_is_symmetric(a: &CscMatrix<f64>, tol: f64) -> bool {
    if a.nrows() != a.ncols() {
        return false;
    }
    let mut entries: HashMap<(usize, usize), f64> = HashMap::new();
    for (r, c, v) in a.triplet_iter() {
        *entries.entry((r, c)).or_insert(0.0) += *v;
    }
    entries.iter().all(|(&(r, c), &v)| {
        let mirrored = entries.get(&(c, r)).copied().unwrap_or(0.0);
        (v - mirrored).abs() <= tol
    })
}

/// Split a matrix into its rows, each given as (column indices, values).
///
/// Always returns exactly `a.nrows()` entries; empty rows are kept.
pub fn csc_row_slices(a: &CscMatrix<f64>) -> Vec<(Vec<usize>, Vec<f64>)> {
    let csr = CsrMatrix::from(a);
    csr.row_iter()
        .map(|row| (row.col_indices().to_vec(), row.values().to_vec()))
        .collect()
}
