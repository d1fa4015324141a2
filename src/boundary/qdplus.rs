//! QD+ quasi-analytic boundary approximation.
//!
//! Approximates the early-exercise premium of the American put as
//! A·(S/B)^λ, where λ solves the characteristic quadratic
//!
//! ```text
//! λ² + (ω − 1)·λ − γ_h = 0,   ω = 2(r − q)/σ²,  γ_h = 2r/(σ²h),
//! h = 1 − e^{−rτ}
//! ```
//!
//! Value matching plus smooth pasting collapse to one nonlinear equation
//! per time slice,
//!
//! ```text
//! f(B) = 1 − e^{−qτ}Φ(−d₁(B,K,τ)) + (λ + c₀)·(K − B − p(B,τ))/B = 0,
//! ```
//!
//! with c₀ the Ju-Zhong refinement of the plain QD exponent. Under
//! negative rates with q < r < 0 the quadratic has one root of each sign:
//! the negative root governs the top of the exercise band (and the
//! classical single boundary), the positive root the bottom. Each grid
//! point is solved with the bracketed Super-Halley iteration, seeded by the
//! previous slice (continuation in τ).
//!
//! # References
//! - Ju, N. & Zhong, R. "An Approximate Formula for Pricing American
//!   Options" (1999)
//! - Li, M. "Analytical Approximations for the Critical Stock Prices of
//!   American Options" (2010)

use crate::numerics::black_scholes as bs;
use crate::numerics::distributions::{normal_cdf, normal_pdf};
use crate::numerics::result::{ConvergenceStatus, NumericalResult};
use crate::numerics::roots::super_halley;
use crate::boundary::regime;
use crate::types::OptionClass;

/// Per-point iteration budget for the Super-Halley solve.
const SUPER_HALLEY_MAX_ITER: usize = 25;
/// Residual tolerance of the per-point boundary equation.
const ROOT_TOLERANCE: f64 = 1e-9;
/// Geometric step of the directional bracket scan.
const SCAN_FACTOR: f64 = 1.04;
/// Bracket-scan step budget.
const SCAN_STEPS: usize = 80;
/// Early-exercise premia below this switch the c₀ correction off.
const PREMIUM_FLOOR: f64 = 1e-10;

/// QD+ output in exercise-band coordinates for the effective put problem:
/// `band_top` is the critical price below which exercise begins,
/// `band_bottom` (double-boundary regime only) the price below which
/// holding resumes.
#[derive(Debug, Clone)]
pub(crate) struct QdPlusPaths {
    pub band_top: Vec<f64>,
    pub band_bottom: Option<Vec<f64>>,
    pub result: NumericalResult<f64>,
}

/// Characteristic-quadratic data for one time slice.
struct Quadratic {
    omega: f64,
    h: f64,
    /// γ_h = α/h with the r → 0 limit r/h → 1/τ applied.
    gamma_h: f64,
    lambda_minus: f64,
    lambda_plus: f64,
    sigma_sq: f64,
}

fn characteristic(tau: f64, rate: f64, dividend_yield: f64, sigma: f64) -> Quadratic {
    let sigma_sq = sigma * sigma;
    let omega = 2.0 * (rate - dividend_yield) / sigma_sq;
    let h = 1.0 - (-rate * tau).exp();
    let r_over_h = if h.abs() < 1e-12 { 1.0 / tau } else { rate / h };
    let gamma_h = 2.0 * r_over_h / sigma_sq;
    let disc = (omega - 1.0) * (omega - 1.0) + 4.0 * gamma_h;
    let sq = disc.max(0.0).sqrt();
    Quadratic {
        omega,
        h,
        gamma_h,
        lambda_minus: 0.5 * (-(omega - 1.0) - sq),
        lambda_plus: 0.5 * (-(omega - 1.0) + sq),
        sigma_sq,
    }
}

/// Ju-Zhong c₀ correction to the QD exponent, refreshed at the current
/// iterate and treated as constant within a root-finder step.
///
/// All r-sensitive pieces are expressed through γ_h = α/h and α/r = 2/σ²
/// so the r → 0 limit stays finite.
fn ju_zhong_correction(
    b: f64,
    tau: f64,
    strike: f64,
    rate: f64,
    dividend_yield: f64,
    sigma: f64,
    lambda: f64,
    quad: &Quadratic,
) -> f64 {
    let premium = strike
        - b
        - bs::price(b, strike, tau, sigma, rate, dividend_yield, OptionClass::Put);
    if premium.abs() < PREMIUM_FLOOR {
        return 0.0;
    }
    let theta = bs::theta(b, strike, tau, sigma, rate, dividend_yield, OptionClass::Put);
    let denom = 2.0 * lambda + quad.omega - 1.0;
    let term_h = quad.gamma_h;
    let term_theta = (2.0 / quad.sigma_sq) * theta * (rate * tau).exp() / premium;
    let term_lambda = -(quad.gamma_h * quad.gamma_h) / (denom * denom);
    let c0 = -((1.0 - quad.h) / denom) * (term_h - term_theta + term_lambda);
    if !c0.is_finite() {
        return 0.0;
    }
    // Keep the corrected exponent on the same side as λ so the root
    // structure of the boundary equation is preserved.
    c0.clamp(-0.5 * lambda.abs(), 0.5 * lambda.abs())
}

/// Boundary equation value and first two derivatives at `b`, for a fixed
/// effective exponent.
fn boundary_equation(
    b: f64,
    tau: f64,
    strike: f64,
    rate: f64,
    dividend_yield: f64,
    sigma: f64,
    lambda_eff: f64,
) -> (f64, f64, f64) {
    let stv = sigma * tau.sqrt();
    let d_1 = bs::d1(b, strike, tau, sigma, rate, dividend_yield);
    let df_q = (-dividend_yield * tau).exp();
    let phi = normal_pdf(d_1);
    let d1p = 1.0 / (b * stv);

    let f_one = 1.0 - df_q * normal_cdf(-d_1);
    let f_one_p = df_q * phi * d1p;
    let f_one_pp = df_q * phi * d1p * (-d_1 * d1p - 1.0 / b);

    let premium = strike
        - b
        - bs::price(b, strike, tau, sigma, rate, dividend_yield, OptionClass::Put);
    let premium_p = -f_one;
    let premium_pp = -f_one_p;

    let g = premium / b;
    let g_p = premium_p / b - g / b;
    let g_pp = premium_pp / b - 2.0 * premium_p / (b * b) + 2.0 * premium / (b * b * b);

    (
        f_one + lambda_eff * g,
        f_one_p + lambda_eff * g_p,
        f_one_pp + lambda_eff * g_pp,
    )
}

/// Solve one time slice: directional scan for a sign-change bracket around
/// the seed, then bracketed Super-Halley.
///
/// The boundary equation is negative below its root and positive above it
/// for both λ branches, so the sign at the seed picks the scan direction
/// and the first sign flip yields a tight bracket (a wide bracket could
/// capture the spurious deep-out-of-band root of the λ₋ branch).
#[allow(clippy::too_many_arguments)]
fn solve_point(
    seed: f64,
    tau: f64,
    strike: f64,
    rate: f64,
    dividend_yield: f64,
    sigma: f64,
    lambda: f64,
    quad: &Quadratic,
    floor: f64,
    ceiling: f64,
) -> NumericalResult<f64> {
    let f3 = |b: f64| {
        let c0 = ju_zhong_correction(b, tau, strike, rate, dividend_yield, sigma, lambda, quad);
        boundary_equation(b, tau, strike, rate, dividend_yield, sigma, lambda + c0)
    };

    let seed = seed.clamp(floor, ceiling);
    let f_seed = f3(seed).0;
    if !f_seed.is_finite() {
        return NumericalResult::best_effort(seed, 0, f64::MAX, ConvergenceStatus::NumericalInstability);
    }
    if f_seed.abs() < ROOT_TOLERANCE {
        return NumericalResult::converged(seed, 0, f_seed.abs());
    }

    let downward = f_seed > 0.0;
    let mut prev = seed;
    let mut bracket = None;
    for step in 0..SCAN_STEPS {
        let x = if downward {
            (prev / SCAN_FACTOR).max(floor)
        } else {
            (prev * SCAN_FACTOR).min(ceiling)
        };
        let fx = f3(x).0;
        if fx == 0.0 {
            return NumericalResult::converged(x, step, 0.0);
        }
        if fx.is_finite() && (fx > 0.0) != (f_seed > 0.0) {
            bracket = Some((prev.min(x), prev.max(x)));
            break;
        }
        if x == floor || x == ceiling {
            break;
        }
        prev = x;
    }

    let Some((lo, hi)) = bracket else {
        // No sign change inside the economically valid range: carry the
        // seed forward rather than inventing a value.
        return NumericalResult::best_effort(
            seed,
            SCAN_STEPS,
            f_seed.abs(),
            ConvergenceStatus::NumericalInstability,
        );
    };

    super_halley(f3, lo, hi, 0.5 * (lo + hi), ROOT_TOLERANCE, SUPER_HALLEY_MAX_ITER)
}

/// Severity ordering for aggregating per-point statuses into one.
fn severity(status: ConvergenceStatus) -> u8 {
    match status {
        ConvergenceStatus::Unknown => 0,
        ConvergenceStatus::Converged => 1,
        ConvergenceStatus::FallbackUsed => 2,
        ConvergenceStatus::DerivativeTooSmall => 3,
        ConvergenceStatus::MaxIterationsReached => 4,
        ConvergenceStatus::BoundsViolation => 5,
        ConvergenceStatus::NumericalInstability => 6,
    }
}

/// Run QD+ over the N-point uniform time-to-expiry grid.
///
/// `double` selects the q < r < 0 branch with both band edges; otherwise
/// only the classical band top is produced. The τ = 0 node carries the
/// analytic near-expiry limit and is never solved.
pub(crate) fn approximate(
    strike: f64,
    rate: f64,
    dividend_yield: f64,
    sigma: f64,
    maturity: f64,
    grid_points: usize,
    double: bool,
) -> QdPlusPaths {
    let n = grid_points;
    let dt = maturity / (n - 1) as f64;
    let floor = strike * 1e-6;
    let ceiling = strike * (1.0 - 1e-9);

    let mut band_top = vec![0.0; n];
    band_top[0] = regime::band_top_limit(strike, rate, dividend_yield).max(floor);
    let mut band_bottom = if double {
        let mut b = vec![0.0; n];
        b[0] = regime::band_bottom_limit(strike, rate, dividend_yield).max(floor);
        Some(b)
    } else {
        None
    };

    let mut worst = ConvergenceStatus::Converged;
    let mut worst_residual: f64 = 0.0;
    let mut max_iterations = 0;

    for i in 1..n {
        let tau = i as f64 * dt;
        let quad = characteristic(tau, rate, dividend_yield, sigma);

        let top = solve_point(
            band_top[i - 1],
            tau,
            strike,
            rate,
            dividend_yield,
            sigma,
            quad.lambda_minus,
            &quad,
            floor,
            ceiling,
        );
        band_top[i] = top.value;
        if severity(top.status) > severity(worst) {
            worst = top.status;
        }
        worst_residual = worst_residual.max(top.error);
        max_iterations = max_iterations.max(top.iterations);

        if let Some(bottom_path) = band_bottom.as_mut() {
            let bottom = solve_point(
                bottom_path[i - 1],
                tau,
                strike,
                rate,
                dividend_yield,
                sigma,
                quad.lambda_plus,
                &quad,
                floor,
                ceiling,
            );
            bottom_path[i] = bottom.value;
            if severity(bottom.status) > severity(worst) {
                worst = bottom.status;
            }
            worst_residual = worst_residual.max(bottom.error);
            max_iterations = max_iterations.max(bottom.iterations);
        }
    }

    let converged = severity(worst) <= severity(ConvergenceStatus::DerivativeTooSmall);
    QdPlusPaths {
        band_top,
        band_bottom,
        result: NumericalResult {
            value: worst_residual,
            converged,
            iterations: max_iterations,
            error: worst_residual,
            status: worst,
        },
    }
}
