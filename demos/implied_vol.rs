//! Extract implied volatility from option prices.
//!
//! Shows how to:
//!   - Price an option with the Black-Scholes closed forms
//!   - Recover the volatility with the Newton + bisection solver
//!   - Inspect the convergence status of the result
//!
//! Run with: `cargo run --example implied_vol`

use exbound::numerics::black_scholes;
use exbound::{implied_volatility, OptionClass};

fn main() {
    let spot = 100.0;
    let strike = 105.0;
    let maturity = 0.5;
    let rate = 0.02;
    let dividend_yield = 0.0;
    let sigma = 0.25;

    let call = black_scholes::price(
        spot,
        strike,
        maturity,
        sigma,
        rate,
        dividend_yield,
        OptionClass::Call,
    );
    let put = black_scholes::price(
        spot,
        strike,
        maturity,
        sigma,
        rate,
        dividend_yield,
        OptionClass::Put,
    );

    println!("Black-Scholes pricing");
    println!("  Spot:    {spot}");
    println!("  Strike:  {strike}");
    println!("  Expiry:  {maturity}y");
    println!("  Vol:     {:.0}%", sigma * 100.0);
    println!("  Call:    {call:.4}");
    println!("  Put:     {put:.4}");

    let iv = implied_volatility(
        call,
        spot,
        strike,
        maturity,
        rate,
        dividend_yield,
        OptionClass::Call,
    );
    println!();
    println!("Implied volatility extraction");
    println!("  Recovered vol: {:.6}", iv.value);
    println!("  Iterations:    {}", iv.iterations);
    println!("  Status:        {:?}", iv.status);
    println!("  Residual:      {:.2e}", iv.error);

    // A price below intrinsic has no implied volatility at all.
    let bad = implied_volatility(20.0, 120.0, 100.0, 1.0, 0.05, 0.0, OptionClass::Call);
    println!();
    println!("Below-intrinsic price: value = {}, status = {:?}", bad.value, bad.status);
}
