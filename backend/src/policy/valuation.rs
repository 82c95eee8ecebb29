//! Investment valuation
//!
//! ```text
//! NPV = -CapitalCost + Σ_{t=1..10} q × P(year + t) / (1 + r)^t
//! ```
//!
//! `P` is the price path assumption (flat continuation of the published
//! price unless an override is supplied) plus any border-carbon uplift the
//! facility faces. `CapitalCost` is already net of subsidy.

use crate::models::mac::MacStep;
use crate::policy::TickContext;

/// Economic life of an abatement investment (years)
pub const ECONOMIC_LIFE_YEARS: u32 = 10;

/// Discount rate, including the country risk premium
pub const DISCOUNT_RATE: f64 = 0.08;

/// Share of a measure's capital cost the subsidy pool must hold before a
/// subsidy-driven facility invests
pub const SUBSIDY_COVERAGE: f64 = 0.6;

/// Whether `pool` can fund a subsidy-driven investment costing `capital_cost`.
pub fn pool_covers(pool: f64, capital_cost: f64) -> bool {
    pool > 0.0 && pool >= SUBSIDY_COVERAGE * capital_cost
}

/// Upfront capital for a measure before subsidy (M$).
///
/// Measures with a negative MAC pay for themselves and carry no capital cost.
pub fn capital_cost(step: &MacStep, capex_multiple: f64) -> f64 {
    step.cost.max(0.0) * step.quantity * capex_multiple
}

/// Net present value of abating `quantity` for the economic life.
///
/// `uplift` is added to every year's price (exporter border cost per tonne).
pub fn npv(net_capital_cost: f64, quantity: f64, ctx: &TickContext, uplift: f64) -> f64 {
    let mut value = -net_capital_cost;
    let mut discount = 1.0;
    for t in 1..=ECONOMIC_LIFE_YEARS {
        discount /= 1.0 + DISCOUNT_RATE;
        let price = ctx.price_path.price_at(ctx.year + t, ctx.price) + uplift;
        value += quantity * price * discount;
    }
    value
}

/// Present value of one unit per year over the economic life.
pub fn annuity_factor() -> f64 {
    (1..=ECONOMIC_LIFE_YEARS)
        .map(|t| 1.0 / (1.0 + DISCOUNT_RATE).powi(t as i32))
        .sum()
}
