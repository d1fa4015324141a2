//! Early-exercise regime classification.
//!
//! A pure decision on the signs and ordering of the rate r and dividend
//! yield q — no iteration. The classifier works on *effective put*
//! parameters: calls are reduced to puts beforehand through
//! McDonald-Schroder symmetry (see the module docs in
//! [`crate::boundary`]), so only the put taxonomy is needed here.
//!
//! The near-expiry carry of exercising a put is rK − qS per unit time:
//! exercise can only be optimal where that carry is non-negative, which
//! pins the τ → 0⁺ limits of the exercise region and drives the split:
//!
//! - q < r < 0: the carry condition S ≥ (r/q)·K bounds the exercise
//!   region to a band [(r/q)·K, K] — two finite boundaries that both must
//!   be solved (the negative-rate double-boundary regime).
//! - r > 0, or r = 0 with q < 0: the classical single boundary.
//! - anything else (r < 0 with q ≥ r, or r = 0 with q ≥ 0): the carry is
//!   nowhere positive below the strike, early exercise is never optimal
//!   and the American put collapses to its European value. The r = q and
//!   r = 0 edges are deliberately assigned to this side of the split; see
//!   DESIGN.md.

use serde::{Deserialize, Serialize};

/// Which boundary structure the (r, q) pair produces for a put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Regime {
    /// One finite critical price (classical American put).
    SingleBoundary,
    /// Two finite boundaries that can merge before maturity (q < r < 0).
    DoubleBoundary,
    /// Early exercise never optimal; European-equivalent solution.
    NoExercise,
}

/// Classify the effective-put parameter pair.
pub fn classify(rate: f64, dividend_yield: f64) -> Regime {
    if dividend_yield < rate && rate < 0.0 {
        Regime::DoubleBoundary
    } else if rate > 0.0 || (rate == 0.0 && dividend_yield < 0.0) {
        Regime::SingleBoundary
    } else {
        Regime::NoExercise
    }
}

/// τ → 0⁺ limit of the exercise-band top for the effective put.
///
/// Classical result: K·min(1, r/q) for q > 0, otherwise K. In the
/// double-boundary regime the band top starts at K as well.
pub(crate) fn band_top_limit(strike: f64, rate: f64, dividend_yield: f64) -> f64 {
    if dividend_yield > 0.0 {
        strike * (rate / dividend_yield).min(1.0)
    } else {
        strike
    }
}

/// τ → 0⁺ limit of the exercise-band bottom in the double-boundary regime.
///
/// The carry condition rK − qS ≥ 0 with q < 0 gives S ≥ (r/q)·K.
pub(crate) fn band_bottom_limit(strike: f64, rate: f64, dividend_yield: f64) -> f64 {
    strike * rate / dividend_yield
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_rate_is_single() {
        assert_eq!(classify(0.05, 0.0), Regime::SingleBoundary);
        assert_eq!(classify(0.05, 0.12), Regime::SingleBoundary);
        assert_eq!(classify(0.001, -0.01), Regime::SingleBoundary);
    }

    #[test]
    fn negative_ordered_pair_is_double() {
        assert_eq!(classify(-0.005, -0.01), Regime::DoubleBoundary);
        assert_eq!(classify(-0.0001, -0.05), Regime::DoubleBoundary);
    }

    #[test]
    fn double_requires_strict_ordering() {
        // q = r < 0 gives an empty band, not a double boundary.
        assert_eq!(classify(-0.01, -0.01), Regime::NoExercise);
        // r negative but q above it: no exercise region at all.
        assert_eq!(classify(-0.01, -0.005), Regime::NoExercise);
        assert_eq!(classify(-0.01, 0.02), Regime::NoExercise);
    }

    #[test]
    fn zero_rate_edge_policy() {
        // r = 0 with q < 0: carry −qS > 0 everywhere, classical boundary.
        assert_eq!(classify(0.0, -0.02), Regime::SingleBoundary);
        // r = 0 with q ≥ 0: exercising never beats holding.
        assert_eq!(classify(0.0, 0.0), Regime::NoExercise);
        assert_eq!(classify(0.0, 0.03), Regime::NoExercise);
    }

    #[test]
    fn band_top_limits() {
        // q > r > 0: top starts at K·r/q.
        assert_eq!(band_top_limit(100.0, 0.05, 0.10), 50.0);
        // r ≥ q > 0: capped at K.
        assert_eq!(band_top_limit(100.0, 0.10, 0.05), 100.0);
        // q ≤ 0: K.
        assert_eq!(band_top_limit(100.0, 0.05, 0.0), 100.0);
        assert_eq!(band_top_limit(100.0, -0.005, -0.01), 100.0);
    }

    #[test]
    fn band_bottom_limit_double_regime() {
        let b = band_bottom_limit(100.0, -0.005, -0.01);
        assert_eq!(b, 50.0);
        assert!(b < band_top_limit(100.0, -0.005, -0.01));
    }
}
