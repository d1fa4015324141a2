//! Core domain types for the boundary solver.
//!
//! [`ContractParameters`] is the single input record: constructed once per
//! solve, validated on construction, immutable afterwards. Invalid inputs
//! never reach an iteration loop. [`BoundarySolution`] is the output record:
//! a plain immutable carrier with public fields, created once per solve
//! call and never mutated.
//!
//! # Why no `Eq` or `Ord`?
//! These types wrap `f64`, which does not implement `Eq` or `Ord` because
//! `NaN` breaks total ordering. We derive `PartialEq` only.

use serde::{Deserialize, Serialize};

use crate::error::ExBoundError;
use crate::numerics::ConvergenceStatus;
use crate::validate::{validate_above, validate_finite, validate_in_range};

/// Smallest admissible volatility, also the lower edge of the implied-vol
/// search interval.
pub const MIN_VOLATILITY: f64 = 0.001;
/// Largest admissible volatility.
pub const MAX_VOLATILITY: f64 = 5.0;
/// Shortest admissible time to expiry: one trading day.
pub const MIN_MATURITY: f64 = 1.0 / 252.0;
/// Longest admissible time to expiry in years.
pub const MAX_MATURITY: f64 = 30.0;
/// Largest admissible absolute log-moneyness |ln(K/S)| at the entry API.
pub const MAX_LOG_MONEYNESS: f64 = 3.0;
/// Prices below this are indistinguishable from zero for validation.
pub const MIN_PRICE: f64 = 1e-10;

/// Sentinel reported as the crossing time when the two boundaries never
/// meet before maturity.
pub const NO_CROSSING: f64 = -1.0;

/// Option class: call or put.
///
/// Determines the payoff branch and, through put-call symmetry, which
/// boundary problem is actually solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionClass {
    /// Right to buy at the strike price.
    Call,
    /// Right to sell at the strike price.
    Put,
}

/// Immutable contract and market parameters for one boundary solve.
///
/// # Examples
/// ```
/// use exbound::{ContractParameters, OptionClass};
///
/// let params = ContractParameters::new(
///     100.0, 100.0, 10.0, -0.005, -0.01, 0.08, OptionClass::Put,
/// )
/// .unwrap()
/// .with_grid_points(201)
/// .unwrap()
/// .with_paths(true);
/// assert_eq!(params.grid_points(), 201);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ContractParametersRaw", into = "ContractParametersRaw")]
pub struct ContractParameters {
    spot: f64,
    strike: f64,
    maturity: f64,
    rate: f64,
    dividend_yield: f64,
    volatility: f64,
    class: OptionClass,
    grid_points: usize,
    refine: bool,
    with_paths: bool,
}

#[derive(Serialize, Deserialize)]
struct ContractParametersRaw {
    spot: f64,
    strike: f64,
    maturity: f64,
    rate: f64,
    dividend_yield: f64,
    volatility: f64,
    class: OptionClass,
    grid_points: usize,
    refine: bool,
    with_paths: bool,
}

impl TryFrom<ContractParametersRaw> for ContractParameters {
    type Error = ExBoundError;
    fn try_from(raw: ContractParametersRaw) -> Result<Self, Self::Error> {
        Ok(Self::new(
            raw.spot,
            raw.strike,
            raw.maturity,
            raw.rate,
            raw.dividend_yield,
            raw.volatility,
            raw.class,
        )?
        .with_grid_points(raw.grid_points)?
        .with_refinement(raw.refine)
        .with_paths(raw.with_paths))
    }
}

impl From<ContractParameters> for ContractParametersRaw {
    fn from(p: ContractParameters) -> Self {
        Self {
            spot: p.spot,
            strike: p.strike,
            maturity: p.maturity,
            rate: p.rate,
            dividend_yield: p.dividend_yield,
            volatility: p.volatility,
            class: p.class,
            grid_points: p.grid_points,
            refine: p.refine,
            with_paths: p.with_paths,
        }
    }
}

impl ContractParameters {
    /// Create validated contract parameters.
    ///
    /// Defaults: 101 collocation points, refinement enabled, full boundary
    /// paths omitted from the solution.
    ///
    /// # Errors
    /// Returns [`ExBoundError::BoundsViolation`] when any parameter lies
    /// outside its documented interval: volatility ∈
    /// [[`MIN_VOLATILITY`], [`MAX_VOLATILITY`]], maturity ∈
    /// [[`MIN_MATURITY`], [`MAX_MATURITY`]] years, spot and strike >
    /// [`MIN_PRICE`], |ln(K/S)| ≤ [`MAX_LOG_MONEYNESS`], rate and dividend
    /// yield finite.
    pub fn new(
        spot: f64,
        strike: f64,
        maturity: f64,
        rate: f64,
        dividend_yield: f64,
        volatility: f64,
        class: OptionClass,
    ) -> crate::error::Result<Self> {
        validate_above(spot, "spot", MIN_PRICE)?;
        validate_above(strike, "strike", MIN_PRICE)?;
        validate_in_range(maturity, "maturity", MIN_MATURITY, MAX_MATURITY)?;
        validate_finite(rate, "rate")?;
        validate_finite(dividend_yield, "dividend_yield")?;
        validate_in_range(volatility, "volatility", MIN_VOLATILITY, MAX_VOLATILITY)?;
        let log_moneyness = (strike / spot).ln();
        validate_in_range(
            log_moneyness,
            "log_moneyness",
            -MAX_LOG_MONEYNESS,
            MAX_LOG_MONEYNESS,
        )?;

        Ok(Self {
            spot,
            strike,
            maturity,
            rate,
            dividend_yield,
            volatility,
            class,
            grid_points: 101,
            refine: true,
            with_paths: false,
        })
    }

    /// Set the collocation-point count of the time-to-expiry grid.
    ///
    /// # Errors
    /// Returns [`ExBoundError::InvalidInput`] for fewer than 3 points (the
    /// grid needs the analytic τ = 0 node plus at least two solved slices).
    pub fn with_grid_points(mut self, n: usize) -> crate::error::Result<Self> {
        if n < 3 {
            return Err(ExBoundError::InvalidInput {
                message: format!("at least 3 collocation points required, got {n}"),
            });
        }
        self.grid_points = n;
        Ok(self)
    }

    /// Enable or disable refinement of the QD+ approximation against the
    /// Kim integral equation. QD+ always runs either way.
    pub fn with_refinement(mut self, refine: bool) -> Self {
        self.refine = refine;
        self
    }

    /// Request the full N-point boundary paths in the solution.
    pub fn with_paths(mut self, with_paths: bool) -> Self {
        self.with_paths = with_paths;
        self
    }

    /// Spot price S.
    pub fn spot(&self) -> f64 {
        self.spot
    }

    /// Strike price K.
    pub fn strike(&self) -> f64 {
        self.strike
    }

    /// Time to expiry in years.
    pub fn maturity(&self) -> f64 {
        self.maturity
    }

    /// Continuously compounded risk-free rate r.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Continuous dividend yield q.
    pub fn dividend_yield(&self) -> f64 {
        self.dividend_yield
    }

    /// Annualized volatility σ.
    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    /// Option class.
    pub fn class(&self) -> OptionClass {
        self.class
    }

    /// Collocation-point count of the time-to-expiry grid.
    pub fn grid_points(&self) -> usize {
        self.grid_points
    }

    /// Whether Kim refinement is requested.
    pub fn refine(&self) -> bool {
        self.refine
    }

    /// Whether full boundary paths are requested in the solution.
    pub fn with_paths_requested(&self) -> bool {
        self.with_paths
    }
}

/// Result of one boundary solve.
///
/// Created once per [`solve`](crate::boundary::solve) call and immutable
/// afterwards. Boundary values are reported at full time-to-expiry
/// ("today"); paths, when requested, are indexed by the time-to-expiry grid
/// from 0 to maturity and have exactly `grid_points` entries.
///
/// The upper boundary is `f64::INFINITY` for a put in the single-boundary
/// regime (the conventional "no upper boundary"), and the lower boundary is
/// 0 for a call in that regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundarySolution {
    /// Upper early-exercise boundary at full time-to-expiry.
    pub upper_boundary: f64,
    /// Lower early-exercise boundary at full time-to-expiry.
    pub lower_boundary: f64,
    /// Full upper-boundary path over the time-to-expiry grid, if requested.
    pub upper_path: Option<Vec<f64>>,
    /// Full lower-boundary path over the time-to-expiry grid, if requested.
    pub lower_path: Option<Vec<f64>>,
    /// Unrefined QD+ upper boundary at full time-to-expiry.
    pub qd_upper_boundary: f64,
    /// Unrefined QD+ lower boundary at full time-to-expiry.
    pub qd_lower_boundary: f64,
    /// |refined − QD+| for the upper boundary; 0 when unrefined.
    pub upper_improvement: f64,
    /// |refined − QD+| for the lower boundary; 0 when unrefined.
    pub lower_improvement: f64,
    /// Time to expiry at which the boundaries merge, or [`NO_CROSSING`].
    pub crossing_time: f64,
    /// Whether Kim refinement ran.
    pub is_refined: bool,
    /// Conjunction of sanity constraints; see the result assembler.
    pub is_valid: bool,
    /// Convergence status of the refinement stage ([`ConvergenceStatus::Unknown`]
    /// when refinement was not requested).
    pub refinement_status: ConvergenceStatus,
    /// Maximum pointwise boundary change in the final refinement sweep.
    pub refinement_residual: f64,
    /// Human-readable tag of the regime/algorithm that produced the result.
    pub method: String,
}

impl BoundarySolution {
    /// True when the two boundaries merge strictly before maturity.
    pub fn has_crossing(&self) -> bool {
        self.crossing_time > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> crate::error::Result<ContractParameters> {
        ContractParameters::new(100.0, 100.0, 10.0, -0.005, -0.01, 0.08, OptionClass::Put)
    }

    #[test]
    fn new_valid_params() {
        let p = base().unwrap();
        assert_eq!(p.spot(), 100.0);
        assert_eq!(p.grid_points(), 101);
        assert!(p.refine());
        assert!(!p.with_paths_requested());
    }

    #[test]
    fn new_rejects_negative_spot() {
        let r = ContractParameters::new(-1.0, 100.0, 1.0, 0.05, 0.0, 0.2, OptionClass::Put);
        assert!(matches!(r, Err(ExBoundError::BoundsViolation { .. })));
    }

    #[test]
    fn new_rejects_zero_strike() {
        let r = ContractParameters::new(100.0, 0.0, 1.0, 0.05, 0.0, 0.2, OptionClass::Put);
        assert!(matches!(r, Err(ExBoundError::BoundsViolation { .. })));
    }

    #[test]
    fn new_rejects_volatility_outside_interval() {
        for sigma in [0.0009, 5.1, f64::NAN] {
            let r = ContractParameters::new(100.0, 100.0, 1.0, 0.05, 0.0, sigma, OptionClass::Put);
            assert!(
                matches!(r, Err(ExBoundError::BoundsViolation { parameter: "volatility", .. })),
                "sigma = {sigma} should be rejected"
            );
        }
    }

    #[test]
    fn new_accepts_volatility_interval_edges() {
        for sigma in [MIN_VOLATILITY, MAX_VOLATILITY] {
            assert!(
                ContractParameters::new(100.0, 100.0, 1.0, 0.05, 0.0, sigma, OptionClass::Put)
                    .is_ok()
            );
        }
    }

    #[test]
    fn new_rejects_maturity_outside_interval() {
        for tau in [0.5 / 252.0, 30.5] {
            let r = ContractParameters::new(100.0, 100.0, tau, 0.05, 0.0, 0.2, OptionClass::Put);
            assert!(matches!(
                r,
                Err(ExBoundError::BoundsViolation { parameter: "maturity", .. })
            ));
        }
    }

    #[test]
    fn new_rejects_nan_rate() {
        let r = ContractParameters::new(100.0, 100.0, 1.0, f64::NAN, 0.0, 0.2, OptionClass::Put);
        assert!(matches!(
            r,
            Err(ExBoundError::BoundsViolation { parameter: "rate", .. })
        ));
    }

    #[test]
    fn new_accepts_negative_rate_and_yield() {
        assert!(base().is_ok());
    }

    #[test]
    fn new_rejects_extreme_moneyness() {
        // ln(3000/100) ≈ 3.4 > 3
        let r = ContractParameters::new(100.0, 3000.0, 1.0, 0.05, 0.0, 0.2, OptionClass::Put);
        assert!(matches!(
            r,
            Err(ExBoundError::BoundsViolation { parameter: "log_moneyness", .. })
        ));
    }

    #[test]
    fn with_grid_points_rejects_too_few() {
        let r = base().unwrap().with_grid_points(2);
        assert!(matches!(r, Err(ExBoundError::InvalidInput { .. })));
    }

    #[test]
    fn with_grid_points_minimum_accepted() {
        let p = base().unwrap().with_grid_points(3).unwrap();
        assert_eq!(p.grid_points(), 3);
    }

    #[test]
    fn builder_flags_round_trip() {
        let p = base().unwrap().with_refinement(false).with_paths(true);
        assert!(!p.refine());
        assert!(p.with_paths_requested());
    }

    #[test]
    fn serde_round_trip() {
        let p = base().unwrap().with_grid_points(51).unwrap().with_paths(true);
        let json = serde_json::to_string(&p).unwrap();
        let p2: ContractParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(p, p2);
    }

    #[test]
    fn serde_rejects_invalid_volatility() {
        let json = r#"{"spot":100.0,"strike":100.0,"maturity":1.0,"rate":0.05,
            "dividend_yield":0.0,"volatility":9.0,"class":"Put",
            "grid_points":101,"refine":true,"with_paths":false}"#;
        assert!(serde_json::from_str::<ContractParameters>(json).is_err());
    }

    #[test]
    fn serde_rejects_invalid_grid() {
        let json = r#"{"spot":100.0,"strike":100.0,"maturity":1.0,"rate":0.05,
            "dividend_yield":0.0,"volatility":0.2,"class":"Put",
            "grid_points":1,"refine":true,"with_paths":false}"#;
        assert!(serde_json::from_str::<ContractParameters>(json).is_err());
    }

    #[test]
    fn no_crossing_sentinel_is_negative() {
        assert!(NO_CROSSING < 0.0);
    }
}
