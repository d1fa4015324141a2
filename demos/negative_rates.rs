//! Solve the double-boundary problem of the negative-rate regime.
//!
//! Shows how to:
//!   - Build validated contract parameters
//!   - Run the QD+ seed and the Kim FP-B' refinement
//!   - Read boundaries, improvements, and convergence diagnostics
//!
//! Run with: `cargo run --example negative_rates`

use exbound::{solve, ContractParameters, OptionClass};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Healy (2021) Table 2 market: q < r < 0, both boundaries finite.
    let params = ContractParameters::new(
        100.0,  // spot
        100.0,  // strike
        10.0,   // maturity in years
        -0.005, // risk-free rate
        -0.01,  // dividend yield
        0.08,   // volatility
        OptionClass::Put,
    )?
    .with_grid_points(401)?;

    let solution = solve(&params);

    println!("American put under negative rates (S = K = 100, τ = 10y)");
    println!("  Method:           {}", solution.method);
    println!("  Upper boundary:   {:.4}", solution.upper_boundary);
    println!("  Lower boundary:   {:.4}", solution.lower_boundary);
    println!("  QD+ seed (upper): {:.4}", solution.qd_upper_boundary);
    println!("  QD+ seed (lower): {:.4}", solution.qd_lower_boundary);
    println!(
        "  Improvement:      {:.4} / {:.4}",
        solution.upper_improvement, solution.lower_improvement
    );
    println!("  Refinement:       {:?}", solution.refinement_status);
    println!("  Valid:            {}", solution.is_valid);

    // The same strike with a positive rate collapses to the classical
    // single-boundary problem.
    let classical = solve(&ContractParameters::new(
        100.0, 100.0, 1.0, 0.05, 0.0, 0.2, OptionClass::Put,
    )?);
    println!();
    println!("Classical regime (r = 5%):");
    println!("  Method:         {}", classical.method);
    println!("  Critical price: {:.4}", classical.lower_boundary);

    Ok(())
}
