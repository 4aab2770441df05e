//! Solver backends for cvxreduce.
//!
//! This module provides:
//! - Canonical problem data and inverse data exchanged with the assembler
//! - The `QpSolver` adapter contract and the canonical `Solution`
//! - The Clarabel backend

pub mod backend;
pub mod clarabel;
pub mod data;
pub mod options;
pub mod solution;
pub mod status;

pub use backend::{guarded_invoke, QpSolver, SolvePhase};
pub use self::clarabel::{ClarabelQp, ClarabelResults, SolverCache, DUAL_SIGN};
pub use data::{clamp_to_infinity, CanonicalProblemData, ConstrBlock, InverseData, VarBlock};
pub use options::{OptionValue, SolverOptions};
pub use solution::{Solution, SolverStats};
pub use status::{SolveStatus, SOLUTION_PRESENT};
