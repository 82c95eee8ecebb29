//! Orchestrator Engine
//!
//! Main simulation loop integrating all agents:
//! - Market operator (cap path, price formation, subsidies)
//! - Facility and household agents (yearly decisions)
//! - MRV agent (audits, penalties)
//! - Event logging (complete decision trace)
//!
//! # Architecture
//!
//! ```text
//! For each year y in the horizon:
//! 1. Publish cap and last clearing price (TickContext)
//! 2. Collect facility and household decisions from that same context
//! 3. Aggregate emissions, settle allowances, check invariants
//! 4. Market operator clears the market for next year's price
//! 5. MRV audits and penalises; penalties go to the enforcement ledger
//! 6. Record the year snapshot
//! ```
//!
//! A failure in any step aborts the run. Completed snapshots are kept and
//! returned inside [`RunFailure`].
//!
//! # Example
//!
//! ```rust
//! use ets_simulator_core_rs::orchestrator::{Orchestrator, SimulationConfig};
//! use ets_simulator_core_rs::scenario::{RosterConfig, StochasticParams};
//! use ets_simulator_core_rs::Scenario;
//!
//! let config = SimulationConfig {
//!     scenario: Scenario::strict_ets().with_horizon(2025, 2027),
//!     population: RosterConfig::default().build().unwrap(),
//!     rng_seed: 12345,
//!     stochastic: StochasticParams::default(),
//! };
//!
//! let mut orchestrator = Orchestrator::new(config).unwrap();
//! let first = orchestrator.tick().unwrap();
//! assert_eq!(first.year, 2025);
//!
//! let run = orchestrator.run().unwrap();
//! assert_eq!(run.snapshots.len(), 3);
//! ```

use crate::core::clock::YearClock;
use crate::enforcement::MrvAgent;
use crate::error::{Invariant, SimulationError};
use crate::market::{AggregatedActions, InvestmentRequest, MarketOperator};
use crate::models::event::{Event, EventLog};
use crate::models::facility::ConversionProgress;
use crate::models::state::{Population, SimulationState};
use crate::orchestrator::snapshot::{
    compute_config_hash, compute_trace_digest, RunFailure, SimulationRun, YearSnapshot,
};
use crate::policy::{Action, StepOutcome, TickContext, YearlyStep};
use crate::rng::RngManager;
use crate::scenario::{RunDraw, Scenario, StochasticParams};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// ============================================================================
// Configuration Types
// ============================================================================

/// RNG sub-streams derived from the run seed
const STREAM_MAC: u64 = 0;
const STREAM_MARKET: u64 = 1;
const STREAM_MRV: u64 = 2;
const STREAM_DRAW: u64 = 3;

/// Complete configuration of one simulation run
///
/// # Fields
///
/// * `scenario` - Immutable policy bundle
/// * `population` - Initial facilities and household segments
/// * `rng_seed` - Seed for every stochastic draw in the run
/// * `stochastic` - Declared stochastic inputs layered over the scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub scenario: Scenario,
    pub population: Population,
    pub rng_seed: u64,
    #[serde(default)]
    pub stochastic: StochasticParams,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Main orchestrator owning all state of one run
///
/// # Determinism
///
/// Every random draw comes from a sub-stream of `rng_seed`. Same config and
/// seed give identical snapshots and an identical trace digest.
pub struct Orchestrator {
    scenario: Scenario,
    state: SimulationState,
    clock: YearClock,
    operator: MarketOperator,
    mrv: MrvAgent,
    draw: RunDraw,
    rng_seed: u64,
    config_hash: String,
    /// Household emissions from the previous tick, read by this tick's clearing
    lagged_household_emissions: f64,
    event_log: EventLog,
    snapshots: Vec<YearSnapshot>,
}

impl Orchestrator {
    /// Validate the configuration and set up all agents.
    ///
    /// # Returns
    ///
    /// * `Ok(Orchestrator)` - ready to tick the first year
    /// * `Err(SimulationError::Configuration)` - invalid scenario or stochastic inputs
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.scenario.validate()?;
        config.stochastic.validate()?;

        let config_hash = compute_config_hash(&config)?;
        let SimulationConfig {
            scenario,
            population,
            rng_seed,
            stochastic,
        } = config;

        let root = RngManager::new(rng_seed);
        let mut state = SimulationState::new(population);

        if stochastic.mac_perturbation_sd > 0.0 {
            let mut mac_rng = root.fork(STREAM_MAC);
            for facility in state.facilities_mut() {
                let factor = stochastic.mac_factor(&mut mac_rng);
                facility.scale_mac(factor);
            }
        }

        let draw = stochastic.draw(&mut root.fork(STREAM_DRAW), scenario.enforcement.audit_rate);
        let operator = MarketOperator::new(
            &scenario,
            root.fork(STREAM_MARKET),
            stochastic.price_noise_sd,
        );
        let mrv = MrvAgent::new(
            scenario.enforcement.clone(),
            stochastic.misreport_probability,
            root.fork(STREAM_MRV),
        );
        let clock = YearClock::new(scenario.horizon.start_year, scenario.horizon.end_year)?;
        let lagged_household_emissions = state.household_emissions();

        Ok(Self {
            scenario,
            state,
            clock,
            operator,
            mrv,
            draw,
            rng_seed,
            config_hash,
            lagged_household_emissions,
            event_log: EventLog::new(),
            snapshots: Vec::new(),
        })
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn operator(&self) -> &MarketOperator {
        &self.operator
    }

    pub fn clock(&self) -> &YearClock {
        &self.clock
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    pub fn snapshots(&self) -> &[YearSnapshot] {
        &self.snapshots
    }

    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }

    /// Audit rate drawn for this run.
    pub fn audit_rate(&self) -> f64 {
        self.draw.audit_rate
    }

    pub fn is_complete(&self) -> bool {
        self.clock.is_completed()
    }

    /// Execute one simulated year.
    ///
    /// On error the year stays open and later calls fail, so a corrupted
    /// tick is never silently continued.
    pub fn tick(&mut self) -> Result<YearSnapshot, SimulationError> {
        let year = self.clock.begin_year()?;

        // STEP 1: PUBLISH
        let ctx = self.operator.open_year(year)?;
        debug!(year, cap = ctx.cap, price = ctx.price, "year opened");

        // STEP 2: DECISIONS
        // Every agent reads the same context; none sees another's decision
        let outcomes = self.collect_decisions(&ctx)?;

        // STEP 3: AGGREGATION
        let (actions, household_emissions) = self.aggregate(&ctx, outcomes)?;

        // STEP 4: MARKET CLEARING
        let clearing = self.operator.advance_year(year, &actions)?;
        for disbursement in &clearing.disbursements {
            if let Some(facility) = self.state.get_facility_mut(&disbursement.facility_id) {
                facility.record_subsidy(disbursement.amount);
            }
            self.event_log.log(Event::SubsidyDisbursed {
                year,
                facility_id: disbursement.facility_id.clone(),
                amount: disbursement.amount,
            });
        }
        self.event_log.log(Event::MarketCleared {
            year,
            cap: clearing.cap,
            next_cap: clearing.new_cap,
            demand: clearing.demand,
            clearing_price: clearing.clearing_price,
        });

        // STEP 5: ENFORCEMENT
        let report = self
            .mrv
            .audit(year, self.state.facilities_mut(), self.draw.audit_rate);
        self.operator.book_penalties(report.total_penalties);
        for id in &report.selected {
            self.event_log.log(Event::AuditSelected {
                year,
                facility_id: id.clone(),
            });
        }
        for finding in report.penalised() {
            self.event_log.log(Event::PenaltyAssessed {
                year,
                facility_id: finding.facility_id.clone(),
                declared_emissions: finding.declared_emissions,
                actual_emissions: finding.actual_emissions,
                penalty: finding.penalty,
            });
        }

        // STEP 6: SNAPSHOT
        self.lagged_household_emissions = household_emissions;
        let facility_emissions = actions.facility_emissions;
        let snapshot = YearSnapshot {
            year,
            total_emissions: facility_emissions + household_emissions,
            facility_emissions,
            household_emissions,
            net_emissions: actions.net_emissions,
            cap: clearing.cap,
            published_price: ctx.price,
            clearing_price: clearing.clearing_price,
            state_counts: self.state.state_counts(),
            invest_actions: actions.investments.len(),
            closures: actions.closures,
            degraded_decisions: actions.degraded,
            subsidized_investments: clearing
                .disbursements
                .iter()
                .filter(|d| d.amount > 0.0)
                .count(),
            subsidies_disbursed: clearing.subsidies_paid(),
            subsidy_remaining: self.operator.subsidy_remaining(),
            audited_facilities: report.selected.len(),
            penalties_collected: report.total_penalties,
            auction_revenue: clearing.auction_revenue,
            household_transfer: clearing.household_transfer,
            firm_support: clearing.firm_support,
            border_carbon_cost: self.state.border_carbon_cost(),
        };
        self.snapshots.push(snapshot.clone());
        self.clock.finish_year();

        debug!(
            year,
            emissions = snapshot.total_emissions,
            price = snapshot.clearing_price,
            converting = snapshot.state_counts.converting,
            clean = snapshot.state_counts.clean,
            "year closed"
        );
        Ok(snapshot)
    }

    /// Run every remaining year and return the run record.
    pub fn run(mut self) -> Result<SimulationRun, RunFailure> {
        info!(
            scenario = %self.scenario.name,
            seed = self.rng_seed,
            years = self.clock.years_remaining(),
            "simulation started"
        );

        while !self.clock.is_completed() {
            if let Err(error) = self.tick() {
                warn!(scenario = %self.scenario.name, seed = self.rng_seed, %error, "simulation aborted");
                return Err(RunFailure {
                    error,
                    partial: self.snapshots,
                });
            }
        }

        let trace_digest = match compute_trace_digest(&self.event_log) {
            Ok(digest) => digest,
            Err(error) => {
                return Err(RunFailure {
                    error,
                    partial: self.snapshots,
                })
            }
        };

        info!(
            scenario = %self.scenario.name,
            events = self.event_log.len(),
            "simulation completed"
        );

        Ok(SimulationRun {
            scenario: self.scenario.name,
            rng_seed: self.rng_seed,
            config_hash: self.config_hash,
            trace_digest,
            snapshots: self.snapshots,
            events: self.event_log,
        })
    }

    // ========================================================================
    // Tick steps
    // ========================================================================

    fn collect_decisions(
        &mut self,
        ctx: &TickContext,
    ) -> Result<Vec<(String, StepOutcome)>, SimulationError> {
        let (facilities, households) = self.state.agents_mut();
        let agents = facilities
            .iter_mut()
            .filter(|f| !f.is_closed())
            .map(|f| f as &mut dyn YearlyStep)
            .chain(households.iter_mut().map(|h| h as &mut dyn YearlyStep));

        let mut outcomes = Vec::new();
        for agent in agents {
            let outcome = agent.step(ctx)?;
            outcomes.push((agent.agent_id().to_string(), outcome));
        }
        Ok(outcomes)
    }

    fn aggregate(
        &mut self,
        ctx: &TickContext,
        outcomes: Vec<(String, StepOutcome)>,
    ) -> Result<(AggregatedActions, f64), SimulationError> {
        let year = ctx.year;
        let mut actions = AggregatedActions {
            household_emissions: self.lagged_household_emissions,
            ..Default::default()
        };
        let mut household_emissions = 0.0;

        for (id, outcome) in outcomes {
            match outcome {
                StepOutcome::Household { demand, emissions } => {
                    household_emissions += emissions;
                    self.event_log.log(Event::HouseholdResponse {
                        year,
                        segment_id: id,
                        demand,
                        emissions,
                    });
                }
                StepOutcome::Facility(decision) => {
                    if let Some(progress) = decision.conversion {
                        if let ConversionProgress::Completed {
                            emissions_before,
                            emissions_after,
                        } = progress
                        {
                            self.event_log.log(Event::ConversionCompleted {
                                year,
                                facility_id: id,
                                emissions_before,
                                emissions_after,
                            });
                        }
                        continue;
                    }

                    if let Some(gap) = &decision.degraded {
                        warn!(year, facility = %id, %gap, "degraded decision: holding");
                        actions.degraded += 1;
                        self.event_log.log(Event::DegradedDecision {
                            year,
                            facility_id: id,
                            reason: gap.to_string(),
                        });
                        continue;
                    }

                    self.event_log.log(Event::FacilityDecision {
                        year,
                        facility_id: id.clone(),
                        action: decision.action,
                        effective_price: decision.effective_price,
                        mac_cost: decision.mac_cost,
                        npv: decision.npv,
                        forced: decision.forced,
                    });

                    match decision.action {
                        Action::Hold => actions.holds += 1,
                        Action::Invest => {
                            if let Some(conversion) = self
                                .state
                                .get_facility(&id)
                                .and_then(|f| f.conversion().copied())
                            {
                                self.event_log.log(Event::ConversionStarted {
                                    year,
                                    facility_id: id.clone(),
                                    step_index: conversion.step_index,
                                    years: conversion.years_remaining,
                                    target_emissions: conversion.post_conversion_emissions,
                                });
                            }
                            actions.investments.push(InvestmentRequest {
                                facility_id: id,
                                capital_cost: decision.capital_cost,
                            });
                        }
                        Action::Close => {
                            actions.closures += 1;
                            let cost_limit = self
                                .state
                                .get_facility(&id)
                                .map(|f| f.cost_limit())
                                .unwrap_or(0.0);
                            self.event_log.log(Event::FacilityClosed {
                                year,
                                facility_id: id,
                                carbon_cost: decision.carbon_cost,
                                cost_limit,
                            });
                        }
                    }
                }
            }
        }

        // Settle allowances and check emission invariants
        let mut net_emissions = 0.0;
        let mut operating = 0;
        for facility in self.state.facilities_mut() {
            let emissions = facility.emissions();
            if !emissions.is_finite() || emissions < 0.0 {
                return Err(SimulationError::violation(
                    ctx,
                    Invariant::NonNegativeEmissions,
                    format!("{} reports emissions {}", facility.id(), emissions),
                ));
            }
            if facility.is_closed() {
                if emissions != 0.0 {
                    return Err(SimulationError::violation(
                        ctx,
                        Invariant::ClosedEmitsNothing,
                        format!("closed {} reports emissions {}", facility.id(), emissions),
                    ));
                }
                continue;
            }
            operating += 1;
            net_emissions +=
                facility.settle_allowances(ctx.free_allocation_share, ctx.border_carbon_price);
        }

        actions.facility_emissions = self.state.facility_emissions();
        actions.net_emissions = net_emissions;
        actions.operating = operating;
        Ok((actions, household_emissions))
    }
}

// ============================================================================
// Convenience entry points
// ============================================================================

/// Run one scenario on a population with default stochastic inputs.
pub fn run_scenario(
    scenario: &Scenario,
    population: &Population,
    rng_seed: u64,
) -> Result<SimulationRun, RunFailure> {
    run_with(SimulationConfig {
        scenario: scenario.clone(),
        population: population.clone(),
        rng_seed,
        stochastic: StochasticParams::default(),
    })
}

/// Build and run an orchestrator, folding setup errors into [`RunFailure`].
pub fn run_with(config: SimulationConfig) -> Result<SimulationRun, RunFailure> {
    Orchestrator::new(config)
        .map_err(|error| RunFailure {
            error,
            partial: Vec::new(),
        })?
        .run()
}
