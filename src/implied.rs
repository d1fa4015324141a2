//! Implied volatility extraction from European option prices.
//!
//! Newton-Raphson seeded by the Brenner-Subrahmanyam approximation
//! σ₀ ≈ √(2π/τ)·(price/S), clamped into the admissible volatility interval.
//! When vega collapses or a Newton step leaves the interval, the solver
//! hands off to bisection over the full interval, which is
//! guaranteed-convergent for the monotone price function. The handoff is
//! reported through [`ConvergenceStatus::FallbackUsed`] /
//! [`ConvergenceStatus::DerivativeTooSmall`], never as an error.
//!
//! A target price below the σ → 0 arbitrage floor (or above the σ → ∞ cap)
//! has no implied volatility at all; the solver returns NaN with
//! [`ConvergenceStatus::BoundsViolation`] in that case, per the error
//! policy: callers that only read the value get NaN, never a panic.
//!
//! # References
//! - Brenner, M. & Subrahmanyam, M. "A Simple Formula to Compute the
//!   Implied Standard Deviation" (1988)

use std::f64::consts::PI;

use crate::numerics::black_scholes;
use crate::numerics::result::{ConvergenceStatus, NumericalResult};
use crate::numerics::roots::bisection;
use crate::types::{OptionClass, MAX_VOLATILITY, MIN_VOLATILITY};

/// Absolute price tolerance for the Newton and bisection loops.
const PRICE_TOLERANCE: f64 = 1e-8;
/// Iteration budget shared by the Newton loop and the bisection fallback.
const MAX_ITERATIONS: usize = 100;
/// Vega below this is numerically useless for a Newton step.
const VEGA_FLOOR: f64 = 1e-12;

/// Compute the implied volatility matching `target_price`.
///
/// Returns a [`NumericalResult`] whose value is NaN when no implied
/// volatility exists (price outside the no-arbitrage band) or when neither
/// method converges within budget.
///
/// # Examples
/// ```
/// use exbound::{implied_volatility, OptionClass};
///
/// let price = 10.4506; // ATM call, σ = 20%, r = 5%, τ = 1
/// let iv = implied_volatility(price, 100.0, 100.0, 1.0, 0.05, 0.0, OptionClass::Call);
/// assert!(iv.converged);
/// assert!((iv.value - 0.20).abs() < 1e-4);
/// ```
pub fn implied_volatility(
    target_price: f64,
    spot: f64,
    strike: f64,
    maturity: f64,
    rate: f64,
    dividend_yield: f64,
    class: OptionClass,
) -> NumericalResult<f64> {
    if !target_price.is_finite()
        || target_price <= 0.0
        || spot <= 0.0
        || strike <= 0.0
        || maturity <= 0.0
    {
        return NumericalResult::best_effort(f64::NAN, 0, f64::NAN, ConvergenceStatus::BoundsViolation);
    }

    // No-arbitrage band: the σ → 0 floor is the discounted forward
    // intrinsic, the σ → ∞ cap the discounted spot/strike leg.
    let df_r = (-rate * maturity).exp();
    let df_q = (-dividend_yield * maturity).exp();
    let (floor, cap) = match class {
        OptionClass::Call => ((spot * df_q - strike * df_r).max(0.0), spot * df_q),
        OptionClass::Put => ((strike * df_r - spot * df_q).max(0.0), strike * df_r),
    };
    if target_price < floor || target_price > cap {
        return NumericalResult::best_effort(f64::NAN, 0, f64::NAN, ConvergenceStatus::BoundsViolation);
    }

    let objective = |sigma: f64| {
        black_scholes::price(spot, strike, maturity, sigma, rate, dividend_yield, class)
            - target_price
    };

    // Brenner-Subrahmanyam seed, clamped into the admissible interval.
    let mut sigma = ((2.0 * PI / maturity).sqrt() * target_price / spot)
        .clamp(MIN_VOLATILITY, MAX_VOLATILITY);

    for iteration in 0..MAX_ITERATIONS {
        let diff = objective(sigma);
        if diff.abs() < PRICE_TOLERANCE {
            return NumericalResult::converged(sigma, iteration, diff.abs());
        }

        let vega = black_scholes::vega(spot, strike, maturity, sigma, rate, dividend_yield);
        if vega < VEGA_FLOOR {
            return bisect_fallback(objective, iteration, ConvergenceStatus::DerivativeTooSmall);
        }

        let next = sigma - diff / vega;
        if !next.is_finite() || next < MIN_VOLATILITY || next > MAX_VOLATILITY {
            return bisect_fallback(objective, iteration, ConvergenceStatus::FallbackUsed);
        }
        sigma = next;
    }

    bisect_fallback(objective, MAX_ITERATIONS, ConvergenceStatus::FallbackUsed)
}

/// Run the bisection fallback over the full volatility interval.
///
/// `origin` records why Newton handed off: it becomes the status of a
/// successful fallback so callers can see which path produced the value.
fn bisect_fallback<F>(
    objective: F,
    newton_iterations: usize,
    origin: ConvergenceStatus,
) -> NumericalResult<f64>
where
    F: Fn(f64) -> f64,
{
    let r = bisection(
        &objective,
        MIN_VOLATILITY,
        MAX_VOLATILITY,
        PRICE_TOLERANCE,
        MAX_ITERATIONS,
    );
    let iterations = newton_iterations + r.iterations;
    match r.status {
        ConvergenceStatus::Converged => NumericalResult {
            value: r.value,
            converged: true,
            iterations,
            error: r.error,
            status: origin,
        },
        ConvergenceStatus::MaxIterationsReached => NumericalResult::best_effort(
            r.value,
            iterations,
            r.error,
            ConvergenceStatus::MaxIterationsReached,
        ),
        // No sign change inside the interval: the target sits outside the
        // prices reachable with admissible volatilities.
        _ => NumericalResult::best_effort(f64::NAN, iterations, r.error, r.status),
    }
}
