//! Validation against Healy (2021), "Pricing American Options under
//! Negative Rates".
//!
//! Reproduces the Table 2 double-boundary reference values for the market
//! S = K = 100, r = −0.5%, q = −1%, σ = 8% (American put). Both boundaries
//! are finite in this regime and the refined solver must land within 1.0
//! of the published values at every quoted maturity.

use exbound::{solve, ContractParameters, ConvergenceStatus, OptionClass};

const SPOT: f64 = 100.0;
const STRIKE: f64 = 100.0;
const RATE: f64 = -0.005;
const DIVIDEND_YIELD: f64 = -0.01;
const SIGMA: f64 = 0.08;
const TOLERANCE: f64 = 1.0;

fn table_2_params(maturity: f64, grid_points: usize) -> ContractParameters {
    ContractParameters::new(
        SPOT,
        STRIKE,
        maturity,
        RATE,
        DIVIDEND_YIELD,
        SIGMA,
        OptionClass::Put,
    )
    .unwrap()
    .with_grid_points(grid_points)
    .unwrap()
}

fn assert_table_2(maturity: f64, grid_points: usize, upper: f64, lower: f64) {
    let solution = solve(&table_2_params(maturity, grid_points));
    assert!(solution.is_valid, "invalid solution at τ = {maturity}");
    assert!(
        solution.is_refined,
        "refinement must run for the benchmark"
    );
    assert!(
        (solution.upper_boundary - upper).abs() < TOLERANCE,
        "τ = {maturity}: upper boundary {} vs published {upper}",
        solution.upper_boundary
    );
    assert!(
        (solution.lower_boundary - lower).abs() < TOLERANCE,
        "τ = {maturity}: lower boundary {} vs published {lower}",
        solution.lower_boundary
    );
}

#[test]
fn table_2_one_year() {
    assert_table_2(1.0, 201, 73.50, 63.50);
}

#[test]
fn table_2_five_years() {
    assert_table_2(5.0, 201, 71.60, 61.60);
}

#[test]
fn table_2_ten_years() {
    assert_table_2(10.0, 401, 69.62, 58.72);
}

#[test]
fn table_2_fifteen_years() {
    assert_table_2(15.0, 401, 68.00, 57.00);
}

#[test]
fn refinement_improves_or_preserves_the_qd_seed() {
    // Non-corruption: the improvement magnitudes are absolute changes and
    // must never be negative, and refinement must converge cleanly on the
    // benchmark market.
    let solution = solve(&table_2_params(10.0, 201));
    assert!(solution.upper_improvement >= 0.0);
    assert!(solution.lower_improvement >= 0.0);
    assert_eq!(solution.refinement_status, ConvergenceStatus::Converged);
}

#[test]
fn double_boundary_method_tag() {
    let solution = solve(&table_2_params(10.0, 101));
    assert!(
        solution.method.contains("FP-B'"),
        "method = {}",
        solution.method
    );
    assert!(
        !solution.method.contains("Single Boundary"),
        "method = {}",
        solution.method
    );
}

#[test]
fn no_crossing_in_table_2_market() {
    // The Table 2 band stays ~10 price units wide out to 15 years.
    for maturity in [1.0, 5.0, 10.0] {
        let solution = solve(&table_2_params(maturity, 101));
        assert!(
            !solution.has_crossing(),
            "spurious crossing at τ = {maturity}: {}",
            solution.crossing_time
        );
    }
}

#[test]
fn boundaries_are_ordered_along_the_whole_path() {
    let params = table_2_params(10.0, 201).with_paths(true);
    let solution = solve(&params);
    let upper = solution.upper_path.as_ref().unwrap();
    let lower = solution.lower_path.as_ref().unwrap();
    assert_eq!(upper.len(), 201);
    assert_eq!(lower.len(), 201);
    for i in 0..upper.len() {
        assert!(
            lower[i] <= upper[i] + 1e-9,
            "band inverted at node {i}: {} vs {}",
            lower[i],
            upper[i]
        );
    }
    // Near-expiry limits: the band opens at [K·r/q, K] = [50, 100].
    assert!((upper[0] - 100.0).abs() < 1e-9);
    assert!((lower[0] - 50.0).abs() < 1e-9);
}

#[test]
fn solver_is_idempotent_on_the_benchmark() {
    let params = table_2_params(10.0, 201).with_paths(true);
    let a = solve(&params);
    let b = solve(&params);
    assert_eq!(a, b, "identical inputs must give bit-identical solutions");
}
