//! The pricing engine: a pure function from cost inputs to a layered
//! price breakdown.
//!
//! Callers normalize input first (`PricingInput::normalized`); the engine
//! assumes well-formed non-negative numbers and never fails.

use crate::pricing::models::{PricingBreakdown, PricingInput};

/// Compute the full cost/profit/price breakdown for one input.
///
/// Profit and tax are both taken on the base cost, not on each other and
/// not on shipping. Retail is exactly double wholesale; this 2x markup is
/// a product convention, not a tunable parameter.
pub fn compute(input: &PricingInput) -> PricingBreakdown {
    // Materials
    let materials_cost: f64 = input.materials.iter().map(|m| m.line_cost()).sum();

    // Labor, scaled by project difficulty
    let labor_cost = input.hourly_rate * input.hours_spent * input.complexity_factor;

    // Overhead attributed to the project
    let business_cost: f64 = input.business_expenses.iter().map(|e| e.cost).sum();

    let base_cost = materials_cost + labor_cost + business_cost;

    let profit_amount = base_cost * (input.profit_margin_percent / 100.0);
    let tax_amount = base_cost * (input.tax_rate_percent / 100.0);

    let wholesale_price = base_cost + profit_amount + input.shipping_cost + tax_amount;
    let retail_price = wholesale_price * 2.0;

    PricingBreakdown {
        materials_cost,
        labor_cost,
        business_cost,
        base_cost,
        profit_amount,
        tax_amount,
        wholesale_price,
        retail_price,
    }
}
