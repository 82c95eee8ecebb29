//! Market operator: cap path, clearing, subsidies
//!
//! # Yearly protocol
//!
//! ```text
//! open_year(y)          → TickContext (cap_y, price from y-1, subsidy availability)
//! ... agents decide, orchestrator aggregates ...
//! advance_year(y, agg)  → ClearingOutcome (cap_{y+1}, price for y+1, disbursements)
//! book_penalties(x)     ← MRV results for y, reported with the next clearing
//! ```
//!
//! # Critical Invariants
//!
//! 1. The cap never increases (cap reduction rate is validated ≥ 0)
//! 2. The clearing price lies in `[0, border_carbon_price]`
//! 3. Subsidy availability is fixed when the context is published; a
//!    facility past the budget cutoff still invests, unsubsidised
//! 4. Market state only moves forward in time

use crate::error::{Invariant, SimulationError};
use crate::market::pricing::PriceBounds;
use crate::policy::{Agent, AgentKind, PricePath, TickContext};
use crate::rng::RngManager;
use crate::scenario::{AllocationRule, RevenueRecycling, Scenario};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// State owned exclusively by the market operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    /// Last year opened, `None` before the first tick
    pub year: Option<u32>,
    /// Cap in force for the next year to open (Mt)
    pub cap: f64,
    /// Price published to the next year to open ($/t)
    pub price: f64,
    /// Unspent subsidy pool (M$)
    pub subsidy_remaining: f64,
    pub allocation: AllocationRule,
    /// Cumulative enforcement revenue (M$)
    pub enforcement_revenue: f64,
    /// Cumulative auction revenue (M$)
    pub auction_revenue: f64,
    /// Cumulative transfers to households (M$)
    pub household_transfers: f64,
    /// Cumulative technology support paid to facilities (M$)
    #[serde(default)]
    pub firm_support: f64,
}

/// Facility asking for capital support this year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentRequest {
    pub facility_id: String,
    /// Capital cost before subsidy (M$)
    pub capital_cost: f64,
}

/// Aggregated outcome of one year's agent decisions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedActions {
    /// Post-decision emissions of all non-closed facilities (Mt)
    pub facility_emissions: f64,
    /// Household emissions from the previous tick (Mt)
    pub household_emissions: f64,
    /// Emissions not covered by free allocation or banked permits (Mt)
    pub net_emissions: f64,
    /// Investors in roster order
    pub investments: Vec<InvestmentRequest>,
    pub holds: usize,
    pub closures: usize,
    pub degraded: usize,
    /// Facilities still operating after this year's decisions
    pub operating: usize,
}

impl AggregatedActions {
    /// Permit demand used for clearing.
    pub fn demand(&self) -> f64 {
        self.facility_emissions + self.household_emissions
    }
}

/// Subsidy payment to one investor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disbursement {
    pub facility_id: String,
    pub amount: f64,
}

/// Result of clearing one year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearingOutcome {
    pub year: u32,
    /// Cap that was in force this year
    pub cap: f64,
    /// Cap for next year
    pub new_cap: f64,
    pub demand: f64,
    /// Price published to next year
    pub clearing_price: f64,
    /// Enforcement revenue booked since the previous clearing
    pub penalties_assessed: f64,
    pub disbursements: Vec<Disbursement>,
    pub auction_revenue: f64,
    pub recycled_to_subsidy: f64,
    pub household_transfer: f64,
    /// Technology support paid to operating facilities (M$)
    pub firm_support: f64,
}

impl ClearingOutcome {
    /// Support paid to each operating facility, 0 when none operate.
    pub fn firm_support_per_facility(&self, operating: usize) -> f64 {
        if operating == 0 {
            0.0
        } else {
            self.firm_support / operating as f64
        }
    }

    pub fn subsidies_paid(&self) -> f64 {
        self.disbursements.iter().map(|d| d.amount).sum()
    }
}

/// The market operator agent
///
/// # Example
/// ```
/// use ets_simulator_core_rs::market::{AggregatedActions, MarketOperator};
/// use ets_simulator_core_rs::{RngManager, Scenario};
///
/// let scenario = Scenario::strict_ets();
/// let mut operator = MarketOperator::new(&scenario, RngManager::new(1), 0.0);
///
/// let ctx = operator.open_year(2025).unwrap();
/// assert_eq!(ctx.cap, 111.0);
///
/// let actions = AggregatedActions {
///     facility_emissions: 146.0,
///     ..Default::default()
/// };
/// let outcome = operator.advance_year(2025, &actions).unwrap();
/// assert!(outcome.new_cap <= outcome.cap);
/// assert!(outcome.clearing_price <= scenario.border_carbon_price);
/// ```
#[derive(Debug, Clone)]
pub struct MarketOperator {
    scenario: Scenario,
    bounds: PriceBounds,
    state: MarketState,
    rng: RngManager,
    price_noise_sd: f64,
    /// Context published for the open year
    published: Option<TickContext>,
    price_path: PricePath,
    pending_penalties: f64,
}

impl MarketOperator {
    /// Create the operator at horizon start.
    ///
    /// `rng` drives price noise only; `price_noise_sd = 0` makes clearing
    /// fully deterministic.
    pub fn new(scenario: &Scenario, rng: RngManager, price_noise_sd: f64) -> Self {
        let bounds = PriceBounds::new(scenario.price_floor, scenario.border_carbon_price);
        let start = scenario.horizon.start_year;
        let price = if scenario.ets_active(start) {
            bounds.clamp(scenario.initial_price.unwrap_or(scenario.price_floor))
        } else {
            0.0
        };

        Self {
            scenario: scenario.clone(),
            bounds,
            state: MarketState {
                year: None,
                cap: scenario.initial_cap,
                price,
                subsidy_remaining: 0.0,
                allocation: scenario.allocation,
                enforcement_revenue: 0.0,
                auction_revenue: 0.0,
                household_transfers: 0.0,
                firm_support: 0.0,
            },
            rng,
            price_noise_sd,
            published: None,
            price_path: PricePath::from_override(scenario.price_path.as_ref()),
            pending_penalties: 0.0,
        }
    }

    pub fn state(&self) -> &MarketState {
        &self.state
    }

    pub fn cap(&self) -> f64 {
        self.state.cap
    }

    pub fn price(&self) -> f64 {
        self.state.price
    }

    pub fn bounds(&self) -> PriceBounds {
        self.bounds
    }

    pub fn subsidy_remaining(&self) -> f64 {
        self.state.subsidy_remaining
    }

    /// Open `year`: top up the subsidy pool and publish the tick context.
    pub fn open_year(&mut self, year: u32) -> Result<TickContext, SimulationError> {
        if let Some(last) = self.state.year {
            if year <= last {
                return Err(SimulationError::ClockViolation(format!(
                    "market already opened {}, cannot open {}",
                    last, year
                )));
            }
        }
        if self.published.is_some() {
            return Err(SimulationError::ClockViolation(
                "previous market year was never cleared".to_string(),
            ));
        }

        self.state.year = Some(year);
        self.state.subsidy_remaining += self.scenario.subsidy_budget;

        let subsidy_rate = if self.state.subsidy_remaining > 0.0 {
            self.scenario.subsidy_share
        } else {
            0.0
        };
        let ctx = TickContext::new(
            year,
            self.state.cap,
            self.state.price,
            self.scenario.border_carbon_price,
        )
        .with_subsidy_rate(subsidy_rate)
        .with_subsidy_pool(self.state.subsidy_remaining)
        .with_free_allocation(self.scenario.free_allocation_share)
        .with_penalty_feedback(self.scenario.penalty_triggers_investment)
        .with_price_path(self.price_path.clone());

        self.published = Some(ctx.clone());
        Ok(ctx)
    }

    /// Clear the market for `year` and advance the cap and price.
    pub fn advance_year(
        &mut self,
        year: u32,
        actions: &AggregatedActions,
    ) -> Result<ClearingOutcome, SimulationError> {
        let ctx = match self.published.take() {
            Some(ctx) if ctx.year == year => ctx,
            Some(ctx) => {
                let open = ctx.year;
                self.published = Some(ctx);
                return Err(SimulationError::ClockViolation(format!(
                    "clearing {} while {} is open",
                    year, open
                )));
            }
            None => {
                return Err(SimulationError::ClockViolation(format!(
                    "clearing {} before it was opened",
                    year
                )))
            }
        };

        // Cap path
        let cap = self.state.cap;
        let new_cap = if self.scenario.ets_active(year) {
            (cap * (1.0 - self.scenario.cap_reduction_rate)).max(0.0)
        } else {
            cap
        };
        if !(new_cap <= cap) {
            return Err(SimulationError::violation(
                &ctx,
                Invariant::CapNonIncreasing,
                format!("cap moved from {} to {}", cap, new_cap),
            ));
        }

        // Price for next year
        let demand = actions.demand();
        let shock = self.rng.normal(0.0, self.price_noise_sd);
        let clearing_price = if self.scenario.ets_active(year + 1) {
            let raw = self
                .scenario
                .price_formation
                .next_price(self.state.price, demand, new_cap, &self.bounds);
            self.bounds.clamp(raw * (1.0 + shock))
        } else {
            0.0
        };
        if !self.bounds.contains(clearing_price) {
            return Err(SimulationError::violation(
                &ctx,
                Invariant::PriceWithinBounds,
                format!(
                    "price {} outside [0, {}]",
                    clearing_price, self.bounds.ceiling
                ),
            ));
        }

        // Subsidies, in roster order, only if available when published
        let mut disbursements = Vec::new();
        if ctx.subsidy_rate > 0.0 {
            for request in &actions.investments {
                if self.state.subsidy_remaining <= 0.0 {
                    break;
                }
                if request.capital_cost <= 0.0 {
                    continue;
                }
                let amount = (request.capital_cost * ctx.subsidy_rate)
                    .min(self.state.subsidy_remaining);
                self.state.subsidy_remaining -= amount;
                disbursements.push(Disbursement {
                    facility_id: request.facility_id.clone(),
                    amount,
                });
            }
        }

        // Auction revenue and recycling
        let auction_revenue = cap * self.scenario.auction_share(year) * clearing_price;
        let mut recycled_to_subsidy = 0.0;
        let mut household_transfer = 0.0;
        let mut firm_support = 0.0;
        match self.scenario.recycling {
            RevenueRecycling::Treasury => {}
            RevenueRecycling::GreenInvestment { ratio } => recycled_to_subsidy = auction_revenue * ratio,
            RevenueRecycling::HouseholdTransfer { ratio } => household_transfer = auction_revenue * ratio,
            RevenueRecycling::FirmSupport { ratio } if actions.operating > 0 => {
                firm_support = auction_revenue * ratio
            }
            // Nobody left to support, the revenue stays with the treasury
            RevenueRecycling::FirmSupport { .. } => {}
        }
        self.state.subsidy_remaining += recycled_to_subsidy;
        self.state.auction_revenue += auction_revenue;
        self.state.household_transfers += household_transfer;
        self.state.firm_support += firm_support;

        let penalties_assessed = std::mem::take(&mut self.pending_penalties);

        debug!(
            year,
            cap,
            new_cap,
            demand,
            clearing_price,
            subsidies = disbursements.len(),
            "market cleared"
        );

        self.state.cap = new_cap;
        self.state.price = clearing_price;

        Ok(ClearingOutcome {
            year,
            cap,
            new_cap,
            demand,
            clearing_price,
            penalties_assessed,
            disbursements,
            auction_revenue,
            recycled_to_subsidy,
            household_transfer,
            firm_support,
        })
    }

    /// Add MRV penalties to the enforcement ledger.
    pub fn book_penalties(&mut self, amount: f64) {
        self.state.enforcement_revenue += amount;
        self.pending_penalties += amount;
    }
}

impl Agent for MarketOperator {
    fn agent_id(&self) -> &str {
        "MARKET-OPERATOR"
    }

    fn kind(&self) -> AgentKind {
        AgentKind::MarketOperator
    }
}
