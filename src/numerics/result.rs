//! Result wrapper for bounded iterative algorithms.
//!
//! Every bounded loop in the crate (Newton-Raphson, bisection,
//! Super-Halley, the Kim refinement sweeps) reports through
//! [`NumericalResult`], so callers can always distinguish "answer within
//! tolerance" from "best-effort answer after exhausting the budget" without
//! catching exceptions.

use serde::{Deserialize, Serialize};

/// How a bounded iterative routine terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConvergenceStatus {
    /// No iterative routine has run (e.g., refinement not requested).
    Unknown,
    /// Terminated within tolerance.
    Converged,
    /// Budget exhausted; the carried value is the best available estimate.
    MaxIterationsReached,
    /// A derivative-based step hit a near-zero derivative.
    DerivativeTooSmall,
    /// An input or intermediate left the documented valid range.
    BoundsViolation,
    /// Divergence or a step leaving the physically valid region was
    /// detected.
    NumericalInstability,
    /// Converged, but via the guaranteed-convergent fallback path
    /// (bisection) rather than the fast derivative-based method.
    FallbackUsed,
}

/// Value plus convergence diagnostics from a bounded iterative routine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericalResult<T> {
    /// The computed value (best effort when not converged).
    pub value: T,
    /// Whether the stopping tolerance was met.
    pub converged: bool,
    /// Iterations actually performed.
    pub iterations: usize,
    /// Final error estimate (residual magnitude or last step size).
    pub error: f64,
    /// Termination classification.
    pub status: ConvergenceStatus,
}

impl<T> NumericalResult<T> {
    /// A converged result.
    pub fn converged(value: T, iterations: usize, error: f64) -> Self {
        Self {
            value,
            converged: true,
            iterations,
            error,
            status: ConvergenceStatus::Converged,
        }
    }

    /// A converged result that went through the bisection fallback.
    pub fn fallback(value: T, iterations: usize, error: f64) -> Self {
        Self {
            value,
            converged: true,
            iterations,
            error,
            status: ConvergenceStatus::FallbackUsed,
        }
    }

    /// A best-effort, non-converged result.
    pub fn best_effort(value: T, iterations: usize, error: f64, status: ConvergenceStatus) -> Self {
        Self {
            value,
            converged: false,
            iterations,
            error,
            status,
        }
    }

    /// Map the carried value, keeping the diagnostics.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> NumericalResult<U> {
        NumericalResult {
            value: f(self.value),
            converged: self.converged,
            iterations: self.iterations,
            error: self.error,
            status: self.status,
        }
    }
}
