//! Error types for cvxreduce.

use thiserror::Error;

/// Error type for cvxreduce operations.
///
/// Solver invocation failures are not represented here: the backend adapters
/// recover them into a [`Solution`](crate::solver::Solution) with status
/// [`SolveStatus::SolverError`](crate::solver::SolveStatus::SolverError).
#[derive(Debug, Error)]
pub enum CvxError {
    /// An atom's arguments violate the canonicalizer's preconditions.
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    /// Shape mismatch.
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    /// The backend runtime could not be initialized.
    #[error("Backend {backend} is unavailable: {reason}")]
    BackendUnavailable { backend: String, reason: String },

    /// Invalid problem specification.
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    /// A solver option was not recognized or had the wrong type.
    #[error("Invalid solver option '{name}': {reason}")]
    InvalidOption { name: String, reason: String },

    /// Solver error.
    #[error("Solver error: {0}")]
    SolverError(String),
}

/// Result type for cvxreduce operations.
pub type Result<T> = std::result::Result<T, CvxError>;
