//! Outcome of a solve.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of outcomes reported by [`cptp_solve`](crate::solvers::cptp_solve).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveStatus {
    /// Proven optimal tour.
    Optimal,
    /// A tour was produced but optimality was not proven.
    Feasible,
    /// A tour was produced, then the run was cancelled.
    AbortedFeasible,
    /// Proven that no feasible tour exists.
    Infeasible,
    /// Inputs inconsistent; solution invalidated.
    Invalid,
    /// Cancelled before reaching a meaningful state.
    AbortedInvalid,
    /// The engine reported an unrecoverable error.
    Err,
    /// Error path under cancellation.
    AbortedErr,
}

impl SolveStatus {
    /// Status after cancellation. `Optimal` is never downgraded.
    ///
    /// ```
    /// use u_cptp::models::SolveStatus;
    ///
    /// assert_eq!(SolveStatus::Feasible.aborted(), SolveStatus::AbortedFeasible);
    /// assert_eq!(SolveStatus::Optimal.aborted(), SolveStatus::Optimal);
    /// ```
    pub fn aborted(self) -> Self {
        match self {
            Self::Feasible => Self::AbortedFeasible,
            Self::Invalid => Self::AbortedInvalid,
            Self::Err => Self::AbortedErr,
            other => other,
        }
    }

    /// A tour is available.
    pub fn is_feasible(self) -> bool {
        matches!(
            self,
            Self::Optimal | Self::Feasible | Self::AbortedFeasible
        )
    }

    /// The solution must be invalidated.
    pub fn is_invalid(self) -> bool {
        matches!(
            self,
            Self::Invalid | Self::AbortedInvalid | Self::Err | Self::AbortedErr
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Optimal => "OPTIMAL",
            Self::Feasible => "FEASIBLE",
            Self::AbortedFeasible => "ABORTED_FEASIBLE",
            Self::Infeasible => "INFEASIBLE",
            Self::Invalid => "INVALID",
            Self::AbortedInvalid => "ABORTED_INVALID",
            Self::Err => "ERR",
            Self::AbortedErr => "ABORTED_ERR",
        }
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
