//! American early-exercise boundary solving.
//!
//! Data flow per solve: parameters are validated at construction, the
//! regime classifier picks the branch from the signs and ordering of
//! (r, q), the QD+ approximator produces the initial boundary paths, the
//! Kim FP-B' stage refines them when requested, and the assembler packages
//! everything into an immutable [`BoundarySolution`].
//!
//! The whole computation is pure, synchronous and deterministic: identical
//! inputs produce bit-identical solutions, and independent solves share no
//! state, so callers can parallelize across contracts freely (or use
//! [`solve_many`]).
//!
//! # Calls
//!
//! Only the put problem is ever solved. A call is reduced through
//! McDonald-Schroder symmetry: C(S, K, τ, r, q) corresponds to the put
//! problem with r and q swapped, and the boundaries map back through
//! B ↦ K²/B (which swaps the roles of the band edges).
//!
//! # Reporting convention
//!
//! The solution reports the boundaries of the *hold* region. For a
//! single-boundary put the critical price is the lower boundary and the
//! upper boundary is +∞ by convention; for a single-boundary call the
//! critical price is the upper boundary and the lower is 0. In the
//! negative-rate double-boundary regime the exercise region is the band
//! between the two reported finite boundaries.

mod kim;
mod qdplus;
pub mod regime;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::numerics::result::ConvergenceStatus;
use crate::types::{BoundarySolution, ContractParameters, OptionClass, NO_CROSSING};

pub use regime::Regime;

/// Validity ceiling multiple for a finite put upper boundary.
const UPPER_BOUNDARY_CEILING: f64 = 10.0;

/// Solve the early-exercise boundary problem for one contract.
///
/// Never fails: parameter validation already happened when the
/// [`ContractParameters`] were constructed, and in-solver numerical
/// difficulty is reported through the solution's status fields.
///
/// # Examples
/// ```
/// use exbound::{solve, ContractParameters, OptionClass};
///
/// let params = ContractParameters::new(
///     100.0, 100.0, 10.0, -0.005, -0.01, 0.08, OptionClass::Put,
/// )
/// .unwrap();
/// let solution = solve(&params);
/// assert!(solution.is_valid);
/// assert!(solution.upper_boundary.is_finite());
/// assert!(solution.lower_boundary < solution.upper_boundary);
/// ```
pub fn solve(params: &ContractParameters) -> BoundarySolution {
    let (eff_rate, eff_yield) = effective_put_rates(params);
    let regime = regime::classify(eff_rate, eff_yield);

    #[cfg(feature = "logging")]
    tracing::debug!(
        ?regime,
        class = ?params.class(),
        rate = params.rate(),
        dividend_yield = params.dividend_yield(),
        "boundary solve started"
    );

    if regime == Regime::NoExercise {
        return assemble_no_exercise(params);
    }

    let strike = params.strike();
    let maturity = params.maturity();
    let sigma = params.volatility();
    let n = params.grid_points();
    let double = regime == Regime::DoubleBoundary;
    let dt = maturity / (n - 1) as f64;

    let qd = qdplus::approximate(strike, eff_rate, eff_yield, sigma, maturity, n, double);

    let (mut top, bottom, crossing_time, refinement_status, refinement_residual) =
        if params.refine() {
            let refined = kim::refine(
                strike,
                eff_rate,
                eff_yield,
                sigma,
                maturity,
                &qd.band_top,
                qd.band_bottom.as_deref(),
            );
            (
                refined.band_top,
                refined.band_bottom,
                refined.crossing_time,
                refined.result.status,
                refined.result.error,
            )
        } else {
            let mut top = qd.band_top.clone();
            let mut bottom = qd.band_bottom.clone();
            let crossing = match bottom.as_mut() {
                Some(b) => kim::detect_crossing(&mut top, b, dt, strike),
                None => NO_CROSSING,
            };
            (top, bottom, crossing, ConvergenceStatus::Unknown, 0.0)
        };

    // Map exercise-band coordinates to the reported hold-region convention.
    let (upper_path, lower_path) = to_reported_paths(params, regime, &mut top, bottom.as_deref());
    let (qd_upper, qd_lower) = reported_headline(params, regime, &qd.band_top, qd.band_bottom.as_deref());

    let upper = *upper_path.last().unwrap_or(&f64::NAN);
    let lower = *lower_path.last().unwrap_or(&f64::NAN);
    let is_refined = params.refine();

    let method = match (double, is_refined) {
        (false, false) => "Single Boundary QD+",
        (false, true) => "Single Boundary FP-B'",
        (true, false) => "QD+ Double Boundary",
        (true, true) => "FP-B' Double Boundary",
    }
    .to_string();

    let is_valid = validity(params, &upper_path, &lower_path, upper, lower);

    let (upper_improvement, lower_improvement) = if is_refined {
        (improvement(upper, qd_upper), improvement(lower, qd_lower))
    } else {
        (0.0, 0.0)
    };

    BoundarySolution {
        upper_boundary: upper,
        lower_boundary: lower,
        upper_improvement,
        lower_improvement,
        qd_upper_boundary: qd_upper,
        qd_lower_boundary: qd_lower,
        crossing_time,
        is_refined,
        is_valid,
        refinement_status,
        refinement_residual,
        method,
        upper_path: params.with_paths_requested().then_some(upper_path),
        lower_path: params.with_paths_requested().then_some(lower_path),
    }
}

/// Solve a batch of independent contracts.
///
/// Runs on the rayon pool when the `parallel` feature is enabled;
/// order-preserving either way, so results are deterministic.
pub fn solve_many(params: &[ContractParameters]) -> Vec<BoundarySolution> {
    #[cfg(feature = "parallel")]
    {
        params.par_iter().map(solve).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        params.iter().map(solve).collect()
    }
}

/// The (r, q) pair of the put problem actually solved.
fn effective_put_rates(params: &ContractParameters) -> (f64, f64) {
    match params.class() {
        OptionClass::Put => (params.rate(), params.dividend_yield()),
        OptionClass::Call => (params.dividend_yield(), params.rate()),
    }
}

/// |refined − QD+| with the both-infinite single-regime upper mapped to 0.
fn improvement(refined: f64, qd: f64) -> f64 {
    if refined.is_finite() && qd.is_finite() {
        (refined - qd).abs()
    } else {
        0.0
    }
}

/// Translate exercise-band paths of the effective put into the reported
/// upper/lower hold-region paths for the actual option class.
fn to_reported_paths(
    params: &ContractParameters,
    regime: Regime,
    band_top: &mut Vec<f64>,
    band_bottom: Option<&[f64]>,
) -> (Vec<f64>, Vec<f64>) {
    let n = band_top.len();
    let strike = params.strike();
    match (params.class(), regime) {
        (OptionClass::Put, Regime::DoubleBoundary) => (
            std::mem::take(band_top),
            band_bottom.map(<[f64]>::to_vec).unwrap_or_default(),
        ),
        (OptionClass::Put, _) => (vec![f64::INFINITY; n], std::mem::take(band_top)),
        (OptionClass::Call, Regime::DoubleBoundary) => {
            let bottom = band_bottom.unwrap_or(&[]);
            (
                bottom.iter().map(|b| strike * strike / b).collect(),
                band_top.iter().map(|b| strike * strike / b).collect(),
            )
        }
        (OptionClass::Call, _) => (
            band_top.iter().map(|b| strike * strike / b).collect(),
            vec![0.0; n],
        ),
    }
}

/// Headline (full time-to-expiry) QD+ values in reported convention.
fn reported_headline(
    params: &ContractParameters,
    regime: Regime,
    band_top: &[f64],
    band_bottom: Option<&[f64]>,
) -> (f64, f64) {
    let strike = params.strike();
    let top = *band_top.last().unwrap_or(&f64::NAN);
    let bottom = band_bottom.and_then(|b| b.last().copied()).unwrap_or(f64::NAN);
    match (params.class(), regime) {
        (OptionClass::Put, Regime::DoubleBoundary) => (top, bottom),
        (OptionClass::Put, _) => (f64::INFINITY, top),
        (OptionClass::Call, Regime::DoubleBoundary) => {
            (strike * strike / bottom, strike * strike / top)
        }
        (OptionClass::Call, _) => (strike * strike / top, 0.0),
    }
}

/// Conjunction of sanity constraints on the assembled solution.
fn validity(
    params: &ContractParameters,
    upper_path: &[f64],
    lower_path: &[f64],
    upper: f64,
    lower: f64,
) -> bool {
    if upper.is_nan() || lower.is_nan() {
        return false;
    }
    if lower < 0.0 || upper <= 0.0 {
        return false;
    }
    let ceiling = UPPER_BOUNDARY_CEILING * params.spot().max(params.strike());
    if params.class() == OptionClass::Put && upper.is_finite() && upper >= ceiling {
        return false;
    }
    for (u, l) in upper_path.iter().zip(lower_path) {
        if u.is_nan() || l.is_nan() || *l > *u * (1.0 + 1e-12) + 1e-9 {
            return false;
        }
    }
    true
}

/// European-equivalent solution for the no-exercise regime: the hold
/// region is everything, so the boundary pair degenerates to (0, +∞).
fn assemble_no_exercise(params: &ContractParameters) -> BoundarySolution {
    let n = params.grid_points();
    BoundarySolution {
        upper_boundary: f64::INFINITY,
        lower_boundary: 0.0,
        upper_improvement: 0.0,
        lower_improvement: 0.0,
        qd_upper_boundary: f64::INFINITY,
        qd_lower_boundary: 0.0,
        crossing_time: NO_CROSSING,
        is_refined: false,
        is_valid: true,
        refinement_status: ConvergenceStatus::Unknown,
        refinement_residual: 0.0,
        method: "Single Boundary (no early exercise)".to_string(),
        upper_path: params
            .with_paths_requested()
            .then(|| vec![f64::INFINITY; n]),
        lower_path: params.with_paths_requested().then(|| vec![0.0; n]),
    }
}
