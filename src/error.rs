//! Error types for the exbound library.
//!
//! Only parameter validation is fallible in the exception sense: a value
//! outside its documented interval is rejected before any iteration starts.
//! Numerical difficulties inside the solvers (derivative collapse, budget
//! exhaustion, detected instability) are recovered locally and reported
//! through [`ConvergenceStatus`](crate::numerics::ConvergenceStatus) fields,
//! never raised as errors.

use thiserror::Error;

/// Convenience type alias for results in this crate.
pub type Result<T> = std::result::Result<T, ExBoundError>;

/// Errors that can occur while constructing solver inputs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExBoundError {
    /// A parameter lies outside its documented closed interval, or is
    /// NaN/infinite. Carries the parameter name, the offending value, and
    /// the valid interval. Raised before any iteration begins; the solver
    /// never silently clamps at this layer.
    #[error("{parameter} must be in [{min}, {max}], got {value}")]
    BoundsViolation {
        parameter: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Input is structurally invalid (e.g., too few collocation points).
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// A numerical computation produced an unusable result where no
    /// best-effort fallback exists.
    #[error("numerical error: {message}")]
    NumericalError { message: String },
}
