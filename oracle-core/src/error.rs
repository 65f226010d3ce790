//! Error types for the solve oracle.

use thiserror::Error;

/// Errors that can occur while building or solving a model.
///
/// Infeasibility and unboundedness are not errors: they are reported through
/// [`crate::SolveStatus`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    /// Model data is malformed (NaN, inverted infinite bounds, bad index).
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// Vector or matrix dimensions do not agree.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Simplex pivot budget exhausted.
    #[error("Pivot limit of {0} reached")]
    PivotLimit(usize),

    /// Branch-and-bound node budget exhausted before optimality was proven.
    #[error("Node limit of {0} reached")]
    NodeLimit(u64),

    /// Conflict extraction requested on a model whose relaxation is feasible.
    #[error("IIS unavailable: {0}")]
    IisUnavailable(String),

    /// Numerical breakdown (e.g. a vanishing pivot).
    #[error("Numerical error: {0}")]
    Numerical(String),
}

/// Result type for oracle operations.
pub type OracleResult<T> = Result<T, OracleError>;
