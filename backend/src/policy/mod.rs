//! Agent decision policies
//!
//! This module defines the per-tick decision interface shared by every
//! agent in the simulation.
//!
//! # Overview
//!
//! Each year the market operator publishes a [`TickContext`] (cap, last
//! clearing price, subsidy availability, border-carbon price). Every agent
//! decides from that same immutable value. No agent observes another
//! agent's same-year decision: decisions are collected first, aggregated
//! second, and only then does the market clear.
//!
//! # Agent Interface
//!
//! Agents form a closed set ([`AgentKind`]). Agents that act on the
//! published context implement [`YearlyStep`], which the orchestrator
//! drives without knowing the concrete type:
//!
//! ```rust
//! use ets_simulator_core_rs::policy::{Agent, AgentKind, StepOutcome, TickContext, YearlyStep};
//! use ets_simulator_core_rs::SimulationError;
//!
//! struct Observer;
//!
//! impl Agent for Observer {
//!     fn agent_id(&self) -> &str {
//!         "OBS"
//!     }
//!
//!     fn kind(&self) -> AgentKind {
//!         AgentKind::Household
//!     }
//! }
//!
//! impl YearlyStep for Observer {
//!     fn step(&mut self, ctx: &TickContext) -> Result<StepOutcome, SimulationError> {
//!         Ok(StepOutcome::Household { demand: ctx.price, emissions: 0.0 })
//!     }
//! }
//! ```
//!
//! # Rules
//!
//! - [`facility_rule`]: MAC comparison, NPV evaluation, closure threshold
//! - [`valuation`]: investment valuation shared by the facility rule
//! - [`household_rule`]: constant-elasticity demand response

use crate::error::{DataGapError, SimulationError};
use crate::models::facility::ConversionProgress;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub mod facility_rule;
pub mod household_rule;
pub mod valuation;

/// Closed set of agent variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    Facility,
    ExporterFacility,
    Household,
    MarketOperator,
    Mrv,
}

/// Identity shared by all agents
pub trait Agent {
    fn agent_id(&self) -> &str;
    fn kind(&self) -> AgentKind;
}

/// Agents that act once per year on the published context
pub trait YearlyStep: Agent {
    /// Act on this year's context. May mutate only the agent's own state.
    fn step(&mut self, ctx: &TickContext) -> Result<StepOutcome, SimulationError>;
}

/// Facility action for one year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Keep current capital and emissions
    Hold,
    /// Start installing the next abatement measure
    Invest,
    /// Shut down permanently
    Close,
}

/// External price trajectory used in investment valuation
///
/// `Flat` continues the current price. `Override` supplies prices for
/// specific years and falls back to the current price elsewhere.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PricePath {
    #[default]
    Flat,
    Override(Arc<BTreeMap<u32, f64>>),
}

impl PricePath {
    pub fn from_override(path: Option<&BTreeMap<u32, f64>>) -> Self {
        match path {
            Some(p) if !p.is_empty() => PricePath::Override(Arc::new(p.clone())),
            _ => PricePath::Flat,
        }
    }

    /// Assumed price in `year` given the currently published price.
    pub fn price_at(&self, year: u32, current: f64) -> f64 {
        match self {
            PricePath::Flat => current,
            PricePath::Override(path) => path.get(&year).copied().unwrap_or(current),
        }
    }
}

/// Immutable per-tick view published by the market operator
///
/// Constructed once per year and shared by reference with every agent.
#[derive(Debug, Clone, PartialEq)]
pub struct TickContext {
    pub year: u32,
    /// Cap in force this year (Mt)
    pub cap: f64,
    /// Clearing price from the previous tick ($/t)
    pub price: f64,
    /// Scenario border-carbon price ($/t), also the price ceiling
    pub border_carbon_price: f64,
    /// Share of capital cost covered if the facility invests, 0 when the
    /// subsidy pool is empty
    pub subsidy_rate: f64,
    /// Unspent subsidy pool when the context was published (M$)
    pub subsidy_pool: f64,
    pub free_allocation_share: f64,
    /// Audit penalties push facilities into their next measure
    pub penalty_triggers_investment: bool,
    pub price_path: PricePath,
}

impl TickContext {
    /// Context with no subsidy, no free allocation and a flat price path.
    pub fn new(year: u32, cap: f64, price: f64, border_carbon_price: f64) -> Self {
        Self {
            year,
            cap,
            price,
            border_carbon_price,
            subsidy_rate: 0.0,
            subsidy_pool: 0.0,
            free_allocation_share: 0.0,
            penalty_triggers_investment: true,
            price_path: PricePath::Flat,
        }
    }

    pub fn with_subsidy_rate(mut self, rate: f64) -> Self {
        self.subsidy_rate = rate;
        self
    }

    pub fn with_subsidy_pool(mut self, pool: f64) -> Self {
        self.subsidy_pool = pool;
        self
    }

    pub fn with_free_allocation(mut self, share: f64) -> Self {
        self.free_allocation_share = share;
        self
    }

    pub fn with_price_path(mut self, path: PricePath) -> Self {
        self.price_path = path;
        self
    }

    pub fn with_penalty_feedback(mut self, enabled: bool) -> Self {
        self.penalty_triggers_investment = enabled;
        self
    }
}

/// Outcome of one facility decision
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub action: Action,
    /// Carbon price the facility compared against its MAC, including any
    /// border-carbon uplift
    pub effective_price: f64,
    pub mac_cost: Option<f64>,
    pub npv: Option<f64>,
    /// Capital cost before subsidy (M$), non-zero only for `Invest`
    pub capital_cost: f64,
    /// Carbon cost tested against the survival ceiling (M$)
    pub carbon_cost: f64,
    pub forced: bool,
    /// MAC data gap that reduced this decision to Hold
    pub degraded: Option<DataGapError>,
    /// Set when the facility was converting and only counted down
    pub conversion: Option<ConversionProgress>,
}

impl Decision {
    pub fn hold(effective_price: f64) -> Self {
        Self {
            action: Action::Hold,
            effective_price,
            mac_cost: None,
            npv: None,
            capital_cost: 0.0,
            carbon_cost: 0.0,
            forced: false,
            degraded: None,
            conversion: None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

/// What an agent produced in its yearly step
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Facility(Decision),
    Household { demand: f64, emissions: f64 },
}

pub use facility_rule::decide;
pub use valuation::{capital_cost, npv, DISCOUNT_RATE, ECONOMIC_LIFE_YEARS};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_path_override_falls_back_to_current() {
        let mut years = BTreeMap::new();
        years.insert(2030, 120.0);
        let path = PricePath::from_override(Some(&years));

        assert_eq!(path.price_at(2030, 50.0), 120.0);
        assert_eq!(path.price_at(2031, 50.0), 50.0);
    }

    #[test]
    fn test_empty_override_is_flat() {
        let path = PricePath::from_override(Some(&BTreeMap::new()));
        assert_eq!(path, PricePath::Flat);
    }
}
