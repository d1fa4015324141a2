//! Print the full boundary paths and locate a boundary crossing.
//!
//! Uses a deliberately narrow exercise band (r close to q, both negative)
//! with meaningful volatility, so the two boundaries merge well before
//! maturity.
//!
//! Run with: `cargo run --example boundary_paths`

use exbound::{solve, ContractParameters, OptionClass};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let maturity = 5.0;
    let grid_points = 51;
    let params = ContractParameters::new(
        100.0, 100.0, maturity, -0.009, -0.01, 0.2, OptionClass::Put,
    )?
    .with_grid_points(grid_points)?
    .with_paths(true);

    let solution = solve(&params);
    let upper = solution.upper_path.as_ref().expect("paths were requested");
    let lower = solution.lower_path.as_ref().expect("paths were requested");

    println!("Method: {}", solution.method);
    if solution.has_crossing() {
        println!("Boundaries merge at τ = {:.3}y", solution.crossing_time);
    } else {
        println!("No crossing before maturity");
    }
    println!();
    println!("{:>8}  {:>12}  {:>12}", "τ (y)", "upper", "lower");

    let dt = maturity / (grid_points - 1) as f64;
    for i in (0..grid_points).step_by(5) {
        let tau = i as f64 * dt;
        println!("{:8.2}  {:12.4}  {:12.4}", tau, upper[i], lower[i]);
    }

    Ok(())
}
