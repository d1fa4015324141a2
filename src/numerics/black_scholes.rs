//! Black-Scholes closed forms with continuous dividend yield.
//!
//! European price and Greeks parameterized by (S, K, τ, σ, r, q, class).
//! The put price is computed from the put leg of the formula directly, not
//! via put-call parity, so parity drift cannot compound rounding error into
//! the boundary equations built on top of these forms.
//!
//! Degenerate inputs (σ√τ → 0) map `d₁`/`d₂` to ±∞ by the sign of the log
//! forward moneyness, which makes prices collapse to discounted intrinsic
//! value instead of NaN.

use crate::numerics::distributions::{normal_cdf, normal_pdf};
use crate::types::OptionClass;

/// Below this, σ√τ is treated as degenerate and `d₁`/`d₂` saturate.
const MIN_STDDEV: f64 = 1e-12;

/// Total standard deviation σ√τ with the degenerate floor applied to the
/// inputs' product rather than each factor.
fn stddev(maturity: f64, volatility: f64) -> f64 {
    if maturity <= 0.0 || volatility <= 0.0 {
        0.0
    } else {
        volatility * maturity.sqrt()
    }
}

/// Black-Scholes d₁.
///
/// For degenerate σ√τ returns ±∞ by the sign of ln(S·e^{(r−q)τ}/K), and 0
/// at exact forward-at-the-money.
pub fn d1(spot: f64, strike: f64, maturity: f64, volatility: f64, rate: f64, yield_q: f64) -> f64 {
    let stv = stddev(maturity, volatility);
    if stv < MIN_STDDEV {
        let log_fwd = (spot / strike).ln() + (rate - yield_q) * maturity.max(0.0);
        return if log_fwd > 0.0 {
            f64::INFINITY
        } else if log_fwd < 0.0 {
            f64::NEG_INFINITY
        } else {
            0.0
        };
    }
    ((spot / strike).ln() + (rate - yield_q + 0.5 * volatility * volatility) * maturity) / stv
}

/// Black-Scholes d₂ = d₁ − σ√τ.
pub fn d2(spot: f64, strike: f64, maturity: f64, volatility: f64, rate: f64, yield_q: f64) -> f64 {
    let stv = stddev(maturity, volatility);
    let d_1 = d1(spot, strike, maturity, volatility, rate, yield_q);
    if d_1.is_infinite() {
        d_1
    } else {
        d_1 - stv
    }
}

/// European option price.
pub fn price(
    spot: f64,
    strike: f64,
    maturity: f64,
    volatility: f64,
    rate: f64,
    yield_q: f64,
    class: OptionClass,
) -> f64 {
    let d_1 = d1(spot, strike, maturity, volatility, rate, yield_q);
    let d_2 = d2(spot, strike, maturity, volatility, rate, yield_q);
    let df_r = (-rate * maturity).exp();
    let df_q = (-yield_q * maturity).exp();
    match class {
        OptionClass::Call => spot * df_q * normal_cdf(d_1) - strike * df_r * normal_cdf(d_2),
        OptionClass::Put => strike * df_r * normal_cdf(-d_2) - spot * df_q * normal_cdf(-d_1),
    }
}

/// Spot delta ∂V/∂S.
pub fn delta(
    spot: f64,
    strike: f64,
    maturity: f64,
    volatility: f64,
    rate: f64,
    yield_q: f64,
    class: OptionClass,
) -> f64 {
    let d_1 = d1(spot, strike, maturity, volatility, rate, yield_q);
    let df_q = (-yield_q * maturity).exp();
    match class {
        OptionClass::Call => df_q * normal_cdf(d_1),
        OptionClass::Put => -df_q * normal_cdf(-d_1),
    }
}

/// Gamma ∂²V/∂S², identical for calls and puts.
pub fn gamma(
    spot: f64,
    strike: f64,
    maturity: f64,
    volatility: f64,
    rate: f64,
    yield_q: f64,
) -> f64 {
    let stv = stddev(maturity, volatility);
    let d_1 = d1(spot, strike, maturity, volatility, rate, yield_q);
    let phi = normal_pdf(d_1);
    if phi == 0.0 || stv < MIN_STDDEV {
        return 0.0;
    }
    (-yield_q * maturity).exp() * phi / (spot * stv)
}

/// Vega ∂V/∂σ, identical for calls and puts.
pub fn vega(
    spot: f64,
    strike: f64,
    maturity: f64,
    volatility: f64,
    rate: f64,
    yield_q: f64,
) -> f64 {
    let d_1 = d1(spot, strike, maturity, volatility, rate, yield_q);
    spot * (-yield_q * maturity).exp() * normal_pdf(d_1) * maturity.sqrt()
}

/// Calendar theta ∂V/∂t (time decay; typically negative).
pub fn theta(
    spot: f64,
    strike: f64,
    maturity: f64,
    volatility: f64,
    rate: f64,
    yield_q: f64,
    class: OptionClass,
) -> f64 {
    let d_1 = d1(spot, strike, maturity, volatility, rate, yield_q);
    let d_2 = d2(spot, strike, maturity, volatility, rate, yield_q);
    let df_r = (-rate * maturity).exp();
    let df_q = (-yield_q * maturity).exp();
    let phi = normal_pdf(d_1);
    let decay = if phi == 0.0 || maturity <= 0.0 {
        0.0
    } else {
        -spot * df_q * phi * volatility / (2.0 * maturity.sqrt())
    };
    match class {
        OptionClass::Call => {
            decay - rate * strike * df_r * normal_cdf(d_2) + yield_q * spot * df_q * normal_cdf(d_1)
        }
        OptionClass::Put => {
            decay + rate * strike * df_r * normal_cdf(-d_2)
                - yield_q * spot * df_q * normal_cdf(-d_1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    // Canonical textbook point: S = K = 100, τ = 1, σ = 20%, r = 5%, q = 0.
    const S: f64 = 100.0;
    const K: f64 = 100.0;
    const T: f64 = 1.0;
    const SIGMA: f64 = 0.2;
    const R: f64 = 0.05;
    const Q: f64 = 0.0;

    #[test]
    fn d1_d2_canonical() {
        // d1 = (0.05 + 0.02)/0.2 = 0.35, d2 = 0.15
        assert_abs_diff_eq!(d1(S, K, T, SIGMA, R, Q), 0.35, epsilon = 1e-12);
        assert_abs_diff_eq!(d2(S, K, T, SIGMA, R, Q), 0.15, epsilon = 1e-12);
    }

    #[test]
    fn call_price_canonical() {
        let c = price(S, K, T, SIGMA, R, Q, OptionClass::Call);
        assert_abs_diff_eq!(c, 10.4506, epsilon = 1e-3);
    }

    #[test]
    fn put_price_canonical() {
        let p = price(S, K, T, SIGMA, R, Q, OptionClass::Put);
        assert_abs_diff_eq!(p, 5.5735, epsilon = 1e-3);
    }

    #[test]
    fn put_call_parity_holds_to_rounding() {
        // C − P = S·e^{−qτ} − K·e^{−rτ}; exact because Φ(x)+Φ(−x) = 1.
        for &(s, k, t, v, r, q) in &[
            (100.0, 100.0, 1.0, 0.2, 0.05, 0.0),
            (90.0, 110.0, 0.5, 0.35, -0.01, 0.02),
            (120.0, 100.0, 5.0, 0.1, -0.005, -0.01),
        ] {
            let c = price(s, k, t, v, r, q, OptionClass::Call);
            let p = price(s, k, t, v, r, q, OptionClass::Put);
            let forward = s * (-q * t).exp() - k * (-r * t).exp();
            assert_abs_diff_eq!(c - p, forward, epsilon = 1e-9);
        }
    }

    #[test]
    fn put_price_under_negative_rates_exceeds_intrinsic() {
        // With r < 0 the discounted strike exceeds the strike, so even the
        // at-the-money European put is worth more than K − S = 0 by a wide
        // margin as τ grows.
        let p = price(100.0, 100.0, 10.0, 0.08, -0.005, -0.01, OptionClass::Put);
        assert!(p > 0.0);
        let deep = price(10.0, 100.0, 10.0, 0.08, -0.005, -0.01, OptionClass::Put);
        assert!(
            deep > 90.0,
            "deep ITM put should exceed undiscounted intrinsic under r < 0, got {deep}"
        );
    }

    #[test]
    fn degenerate_sigma_collapses_to_discounted_intrinsic() {
        let c = price(110.0, 100.0, 1.0, 0.0, 0.05, 0.0, OptionClass::Call);
        assert_abs_diff_eq!(c, 110.0 - 100.0 * (-0.05_f64).exp(), epsilon = 1e-10);
        let p = price(110.0, 100.0, 1.0, 0.0, 0.05, 0.0, OptionClass::Put);
        assert_abs_diff_eq!(p, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn delta_ranges() {
        let dc = delta(S, K, T, SIGMA, R, Q, OptionClass::Call);
        let dp = delta(S, K, T, SIGMA, R, Q, OptionClass::Put);
        assert!(dc > 0.0 && dc < 1.0);
        assert!(dp < 0.0 && dp > -1.0);
        // With q = 0: call delta − put delta = 1.
        assert_abs_diff_eq!(dc - dp, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn gamma_and_vega_positive() {
        assert!(gamma(S, K, T, SIGMA, R, Q) > 0.0);
        assert!(vega(S, K, T, SIGMA, R, Q) > 0.0);
    }

    #[test]
    fn vega_canonical_value() {
        // vega = S·φ(d1)·√τ = 100·φ(0.35) ≈ 37.524
        assert_abs_diff_eq!(vega(S, K, T, SIGMA, R, Q), 37.524, epsilon = 1e-2);
    }

    #[test]
    fn theta_negative_for_atm_call() {
        assert!(theta(S, K, T, SIGMA, R, Q, OptionClass::Call) < 0.0);
    }

    #[test]
    fn greeks_finite_at_degenerate_inputs() {
        for f in [
            gamma(100.0, 100.0, 0.0, 0.2, 0.05, 0.0),
            vega(100.0, 100.0, 0.0, 0.2, 0.05, 0.0),
            theta(100.0, 100.0, 0.0, 0.2, 0.05, 0.0, OptionClass::Put),
            gamma(50.0, 100.0, 1.0, 0.0, 0.05, 0.0),
        ] {
            assert!(f.is_finite(), "expected finite Greek, got {f}");
        }
    }
}
