//! The contract every QP backend adapter implements.
//!
//! An adapter answers a static capability probe, checks that its backend can
//! be initialized, translates [`CanonicalProblemData`] into the backend's
//! native calls and invokes it, and finally inverts the native result into a
//! [`Solution`].

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use log::{debug, warn};

use super::data::{CanonicalProblemData, InverseData};
use super::options::SolverOptions;
use super::solution::Solution;
use crate::error::{CvxError, Result};

/// Progress of a single solve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolvePhase {
    /// Nothing done yet.
    NotStarted,
    /// Building the native model.
    Translating,
    /// Backend invoked.
    Invoked,
    /// Backend returned normally.
    Solved,
    /// Backend failed during invocation.
    BackendError,
    /// Native result converted into a [`Solution`].
    Inverted,
}

impl fmt::Display for SolvePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SolvePhase::NotStarted => "not_started",
            SolvePhase::Translating => "translating",
            SolvePhase::Invoked => "invoked",
            SolvePhase::Solved => "solved",
            SolvePhase::BackendError => "backend_error",
            SolvePhase::Inverted => "inverted",
        };
        write!(f, "{}", s)
    }
}

/// Log a phase transition for `backend`.
pub(crate) fn enter_phase(backend: &str, phase: SolvePhase) -> SolvePhase {
    debug!("{}: {}", backend, phase);
    phase
}

/// A QP solver backend adapter.
///
/// Adapters are stateless; reusable state lives in the explicit `Cache`.
pub trait QpSolver {
    /// Native results produced by [`solve_via_data`](Self::solve_via_data).
    type Results;
    /// Reusable session state for warm starts.
    type Cache: Default;

    /// Backend name.
    fn name(&self) -> &'static str;

    /// Can this backend handle boolean and integer variables?
    fn mip_capable(&self) -> bool;

    /// Attempt to initialize the backend.
    ///
    /// # Errors
    ///
    /// Returns [`CvxError::BackendUnavailable`] if the backend cannot be used.
    fn check_available(&self) -> Result<()>;

    /// Check if the backend can be used.
    fn is_installed(&self) -> bool {
        self.check_available().is_ok()
    }

    /// Translate `data`, invoke the backend and return its native results.
    ///
    /// Failures of the backend itself are recorded in the results rather than
    /// returned as errors. Errors are reserved for problems found before the
    /// backend is invoked: malformed data and unusable options.
    fn solve_via_data(
        &self,
        data: &CanonicalProblemData,
        warm_start: bool,
        verbose: bool,
        opts: &SolverOptions,
        cache: Option<&mut Self::Cache>,
    ) -> Result<Self::Results>;

    /// Convert native results into a [`Solution`].
    fn invert(&self, results: Self::Results, inverse_data: &InverseData) -> Solution;

    /// Check availability, solve and invert.
    fn solve(
        &self,
        data: &CanonicalProblemData,
        inverse_data: &InverseData,
        warm_start: bool,
        verbose: bool,
        opts: &SolverOptions,
        cache: Option<&mut Self::Cache>,
    ) -> Result<Solution> {
        self.check_available()?;
        inverse_data.validate(data)?;
        if data.is_mip() && !self.mip_capable() {
            return Err(CvxError::InvalidProblem(format!(
                "{} does not support boolean or integer variables",
                self.name()
            )));
        }
        let results = self.solve_via_data(data, warm_start, verbose, opts, cache)?;
        Ok(self.invert(results, inverse_data))
    }
}

/// Run a backend invocation, converting a panic into an error message.
pub fn guarded_invoke<T>(backend: &str, invoke: impl FnOnce() -> T) -> std::result::Result<T, String> {
    catch_unwind(AssertUnwindSafe(invoke)).map_err(|payload| {
        let msg = panic_message(payload.as_ref());
        warn!("{} failed during invocation: {}", backend, msg);
        msg
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guarded_invoke_passes_value() {
        assert_eq!(guarded_invoke("test", || 42), Ok(42));
    }

    #[test]
    fn test_guarded_invoke_catches_panic() {
        let err = guarded_invoke("test", || -> i32 { panic!("backend exploded") }).unwrap_err();
        assert_eq!(err, "backend exploded");

        let owned = guarded_invoke("test", || -> i32 { panic!("code {}", 7) }).unwrap_err();
        assert_eq!(owned, "code 7");
    }
}
