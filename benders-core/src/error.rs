//! Error types for the Benders loop.

use std::fmt;

use oracle_core::OracleError;
use serde::Serialize;
use thiserror::Error;

/// Which of the two decomposed problems an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProblemKind {
    Master,
    Subproblem,
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProblemKind::Master => write!(f, "master"),
            ProblemKind::Subproblem => write!(f, "subproblem"),
        }
    }
}

/// Errors that end a Benders run without an outcome.
///
/// Master or subproblem infeasibility is not an error: it is reported
/// through [`crate::BendersStatus`].
#[derive(Error, Debug)]
pub enum BendersError {
    /// Instance data is malformed
    #[error("Invalid instance: {0}")]
    InvalidInstance(String),

    /// The oracle reported an unbounded problem
    #[error("{problem} is unbounded: variable `{variable}` lacks a bound")]
    Unbounded {
        /// Problem that was being solved.
        problem: ProblemKind,
        /// Variable whose column exposed the unbounded ray.
        variable: String,
    },

    /// Oracle failure (pivot/node budget, numerical breakdown)
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),
}

/// Result type for Benders operations.
pub type BendersResult<T> = Result<T, BendersError>;
