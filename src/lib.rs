//! # cvxreduce
//!
//! Atom canonicalization and QP solver-backend adaptation for disciplined
//! convex programs.
//!
//! cvxreduce covers two steps of a convex-programming reduction chain:
//!
//! - **Canonicalization** rewrites atoms a QP solver cannot consume directly.
//!   `quad_over_lin(x, y)` with a positive constant `y` becomes the quadratic
//!   form `t' (I / y) t` over a bare variable, plus `t == x` when `x` is not
//!   already a variable.
//! - **Backend adaptation** takes the assembled canonical QP, translates it
//!   into a backend's native calls, invokes the backend and inverts its result
//!   into a uniform [`Solution`].
//!
//! ## Quick Start
//!
//! ```
//! use cvxreduce::prelude::*;
//! use cvxreduce::sparse::csc_from_triplets;
//! use nalgebra_sparse::CscMatrix;
//!
//! // minimize (1/2)||x||^2  subject to  x0 + x1 == 2
//! let x = variable(2);
//! let data = CanonicalProblemData::new(
//!     CscMatrix::identity(2),
//!     vec![0.0, 0.0],
//!     csc_from_triplets(1, 2, vec![0, 0], vec![0, 1], vec![1.0, 1.0]),
//!     vec![2.0],
//!     CscMatrix::zeros(0, 2),
//!     vec![],
//! )?;
//! let inverse = InverseData::from_vars([&x]).with_eq_block(ExprId::new(), 1);
//!
//! let solution = ClarabelQp::new().solve(
//!     &data,
//!     &inverse,
//!     false,
//!     false,
//!     &SolverOptions::new(),
//!     None,
//! )?;
//! assert_eq!(solution.status(), SolveStatus::Optimal);
//! assert!((solution.opt_val() - 1.0).abs() < 1e-6);
//! # Ok::<(), cvxreduce::CvxError>(())
//! ```
//!
//! ## Architecture
//!
//! - **Expression trees** built using the `Expr` enum with `Arc` sharing
//! - **Canonicalizers** implement [`AtomCanonicalizer`](canon::AtomCanonicalizer)
//! - **Backends** implement [`QpSolver`](solver::QpSolver)
//! - **Clarabel** is the bundled backend, with branch and bound for boolean
//!   and integer variables

pub mod atoms;
pub mod canon;
pub mod constraints;
pub mod error;
pub mod expr;
pub mod solver;
pub mod sparse;

/// Prelude module for convenient imports.
///
/// ```
/// use cvxreduce::prelude::*;
/// ```
pub mod prelude {
    // Expression types
    pub use crate::expr::{
        constant, constant_vec, variable, Array, Expr, ExprId, Shape, VariableBuilder,
    };

    // Atoms
    pub use crate::atoms::quad_over_lin;

    // Constraints
    pub use crate::constraints::{ConstraintExt, EqualityConstraint};

    // Canonicalization
    pub use crate::canon::{
        quad_over_lin_canon, AtomCanonicalizer, CanonOutput, QuadOverLinCanon, SymbolicQuadForm,
    };

    // Solver
    pub use crate::solver::{
        CanonicalProblemData, ClarabelQp, InverseData, OptionValue, QpSolver, Solution,
        SolveStatus, SolverCache, SolverOptions, SolverStats,
    };

    // Errors
    pub use crate::error::{CvxError, Result};
}

// Re-export main types at crate root
pub use error::{CvxError, Result};
pub use solver::{Solution, SolveStatus};
