//! Canonical solve status shared by every backend.

use std::fmt;

/// Outcome of a solve, independent of the backend that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolveStatus {
    /// Optimal solution found.
    Optimal,
    /// Solution found, but only to reduced accuracy.
    OptimalInaccurate,
    /// Problem is infeasible.
    Infeasible,
    /// Infeasibility detected to reduced accuracy.
    InfeasibleInaccurate,
    /// Problem is unbounded.
    Unbounded,
    /// Unboundedness detected to reduced accuracy.
    UnboundedInaccurate,
    /// An iteration, time or node limit stopped the solver.
    UserLimit,
    /// The backend failed or reported numerical trouble.
    SolverError,
}

/// Statuses under which the backend's iterate is reported as a solution.
pub const SOLUTION_PRESENT: [SolveStatus; 3] = [
    SolveStatus::Optimal,
    SolveStatus::OptimalInaccurate,
    SolveStatus::UserLimit,
];

impl SolveStatus {
    /// Does this status carry primal values and an objective?
    pub fn has_solution(&self) -> bool {
        SOLUTION_PRESENT.contains(self)
    }

    /// Check for `Optimal` or `OptimalInaccurate`.
    pub fn is_optimal(&self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::OptimalInaccurate)
    }

    /// Check for either unboundedness status.
    pub fn is_unbounded(&self) -> bool {
        matches!(
            self,
            SolveStatus::Unbounded | SolveStatus::UnboundedInaccurate
        )
    }

    /// Check for either infeasibility status.
    pub fn is_infeasible(&self) -> bool {
        matches!(
            self,
            SolveStatus::Infeasible | SolveStatus::InfeasibleInaccurate
        )
    }

    /// Objective value reported when no solution is present.
    ///
    /// Minimization convention: `-inf` for unbounded problems, `+inf` otherwise.
    pub fn missing_value(&self) -> f64 {
        if self.is_unbounded() {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        }
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::OptimalInaccurate => "optimal_inaccurate",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::InfeasibleInaccurate => "infeasible_inaccurate",
            SolveStatus::Unbounded => "unbounded",
            SolveStatus::UnboundedInaccurate => "unbounded_inaccurate",
            SolveStatus::UserLimit => "user_limit",
            SolveStatus::SolverError => "solver_error",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solution_present() {
        assert!(SolveStatus::Optimal.has_solution());
        assert!(SolveStatus::UserLimit.has_solution());
        assert!(!SolveStatus::Infeasible.has_solution());
        assert!(!SolveStatus::SolverError.has_solution());
        // a user limit may carry a point that is not optimal
        assert!(!SolveStatus::UserLimit.is_optimal());
        assert!(SolveStatus::OptimalInaccurate.is_optimal());
    }

    #[test]
    fn test_missing_value_sign() {
        assert_eq!(SolveStatus::Unbounded.missing_value(), f64::NEG_INFINITY);
        assert_eq!(
            SolveStatus::UnboundedInaccurate.missing_value(),
            f64::NEG_INFINITY
        );
        assert_eq!(SolveStatus::Infeasible.missing_value(), f64::INFINITY);
        assert_eq!(SolveStatus::SolverError.missing_value(), f64::INFINITY);
    }

    #[test]
    fn test_display() {
        assert_eq!(SolveStatus::OptimalInaccurate.to_string(), "optimal_inaccurate");
    }
}
