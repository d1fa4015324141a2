//! # exbound
//!
//! Early-exercise boundary solver for American-style options, including
//! the negative-rate regime q < r < 0 where the classical single exercise
//! boundary splits into two time-dependent boundaries that can merge
//! before maturity.
//!
//! Provides the full solving pipeline: validated contract parameters →
//! regime classification → quasi-analytic QD+ seed → fixed-point
//! refinement against the exact Kim integral equation → packaged
//! [`BoundarySolution`] with convergence and validity diagnostics.
//!
//! ## Architecture
//!
//! - **`numerics`** — Stateless primitives: erf / normal distribution,
//!   Black-Scholes closed forms and Greeks, bracketed Super-Halley and
//!   bisection root finding, the [`NumericalResult`] diagnostics carrier
//! - **`implied`** — Newton + bisection implied-volatility extraction
//! - **`boundary`** — Regime classifier, QD+ approximator, Kim FP-B'
//!   refinement, and the [`solve`] / [`solve_many`] entry points
//!
//! ## Design
//!
//! - **Fail fast on inputs, never on numerics.** Parameter validation
//!   returns [`Result`]; everything downstream always produces a value,
//!   with reduced confidence reported through [`ConvergenceStatus`]
//!   fields. Library code never calls `unwrap()` or `expect()`.
//! - **Immutable records.** [`ContractParameters`] is validated once and
//!   read-only; [`BoundarySolution`] is created once per solve and never
//!   mutated. No shared state between solves.
//! - **Deterministic.** No randomness, no wall clock: identical inputs
//!   give bit-identical solutions, including under the `parallel` batch
//!   feature.
//! - **Serializable.** Value types implement Serde with validation on
//!   deserialization where invariants exist.
//!
//! ## Example
//!
//! ```
//! use exbound::{solve, ContractParameters, OptionClass};
//!
//! // Healy (2021) Table 2 market: both boundaries finite.
//! let params = ContractParameters::new(
//!     100.0,   // spot
//!     100.0,   // strike
//!     10.0,    // maturity (years)
//!     -0.005,  // risk-free rate
//!     -0.01,   // dividend yield
//!     0.08,    // volatility
//!     OptionClass::Put,
//! )
//! .unwrap();
//!
//! let solution = solve(&params);
//! assert!(solution.is_valid);
//! assert!(solution.lower_boundary < solution.upper_boundary);
//! ```

pub mod boundary;
pub mod error;
pub mod implied;
pub mod numerics;
pub mod types;
mod validate;

#[doc(inline)]
pub use boundary::{solve, solve_many, Regime};
#[doc(inline)]
pub use error::{ExBoundError, Result};
#[doc(inline)]
pub use implied::implied_volatility;
#[doc(inline)]
pub use numerics::{ConvergenceStatus, NumericalResult};
#[doc(inline)]
pub use types::{BoundarySolution, ContractParameters, OptionClass};
