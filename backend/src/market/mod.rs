//! Market operator
//!
//! Owns the market state: cap, clearing price, subsidy pool and the
//! revenue ledgers. Each year it publishes a [`TickContext`](crate::policy::TickContext),
//! receives the aggregated outcome of all agent decisions, and clears the
//! market for the following year.
//!
//! - [`pricing`]: tunable price-formation heuristic and price bounds
//! - [`operator`]: cap path, clearing, subsidy disbursement, revenue recycling

pub mod operator;
pub mod pricing;

pub use operator::{
    AggregatedActions, ClearingOutcome, Disbursement, InvestmentRequest, MarketOperator,
    MarketState,
};
pub use pricing::{PriceBounds, PriceFormation};
