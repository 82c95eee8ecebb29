//! Facility decision rule
//!
//! Evaluated once per year for every facility that is neither closed nor
//! converting. Three ordered stages:
//!
//! 1. **MAC comparison**: the next measure on the curve is worth pursuing
//!    only if the effective carbon price exceeds its cost.
//! 2. **NPV evaluation**: invest if the measure's net present value over
//!    its economic life is positive, net of any available subsidy.
//! 3. **Closure threshold**: with no investment made, close if the annual
//!    carbon cost of uncovered emissions exceeds the survival ceiling.
//!
//! Exporters face `price + fraction × border_price` per tonne in every
//! stage. A facility penalised by an audit skips stages 1-2 and invests in
//! its next measure when the scenario enables penalty feedback.
//!
//! Subsidy-driven facilities (agriculture in the default roster) also skip
//! stages 1-2 whenever the published subsidy pool holds at least 60% of the
//! next measure's capital cost. Otherwise they decide like everyone else.
//!
//! Converting facilities only count down. When the countdown reaches zero
//! the facility is `Clean` and its reduced emissions count in this tick's
//! aggregation.
//!
//! # Critical Invariants
//!
//! 1. Deciding for a closed facility is an invariant violation
//! 2. Only the deciding facility's own state is mutated
//! 3. A MAC data gap degrades the decision to Hold, it is never fatal

use crate::error::{Invariant, SimulationError};
use crate::models::facility::{CapitalState, Facility};
use crate::policy::valuation;
use crate::policy::{Action, Agent, AgentKind, Decision, StepOutcome, TickContext, YearlyStep};

/// Decide this year's action for `facility`.
///
/// # Example
/// ```
/// use ets_simulator_core_rs::models::{CapitalState, FacilitySpec, MacStep, Sector};
/// use ets_simulator_core_rs::policy::{decide, Action, TickContext};
/// use ets_simulator_core_rs::Facility;
///
/// let mut facility = Facility::new(FacilitySpec {
///     id: "IND-001".to_string(),
///     sector: Sector::Industry,
///     emissions: 1.0,
///     mac: vec![MacStep::new(25.0, 0.2)],
///     cost_limit: 150.0,
///     capex_multiple: 8.0,
///     conversion_years: 4,
///     export: None,
///     capital_state: CapitalState::Dirty,
///     subsidy_driven: false,
/// })
/// .unwrap();
///
/// let ctx = TickContext::new(2030, 100.0, 60.0, 90.0);
/// let decision = decide(&mut facility, &ctx).unwrap();
/// assert_eq!(decision.action, Action::Invest);
/// assert_eq!(facility.capital_state(), CapitalState::Converting);
/// assert_eq!(facility.years_remaining(), Some(4));
/// ```
pub fn decide(facility: &mut Facility, ctx: &TickContext) -> Result<Decision, SimulationError> {
    match facility.capital_state() {
        CapitalState::Closed => Err(SimulationError::violation(
            ctx,
            Invariant::NoDecisionWhenClosed,
            format!("decide() called on closed facility {}", facility.id()),
        )),
        CapitalState::Converting => {
            let progress = facility.advance_conversion().ok_or_else(|| {
                SimulationError::violation(
                    ctx,
                    Invariant::ConversionTracked,
                    format!("{} is converting without a conversion record", facility.id()),
                )
            })?;
            let mut decision = Decision::hold(ctx.price);
            decision.conversion = Some(progress);
            Ok(decision)
        }
        CapitalState::Dirty | CapitalState::Clean => Ok(evaluate(facility, ctx)),
    }
}

fn evaluate(facility: &mut Facility, ctx: &TickContext) -> Decision {
    let uplift = facility
        .export()
        .map(|e| e.uplift(ctx.border_carbon_price))
        .unwrap_or(0.0);
    let effective_price = ctx.price + uplift;
    let mut decision = Decision::hold(effective_price);

    // STAGE 1: MAC COMPARISON
    let next = facility.next_step();
    let step = match facility.mac().step_at(facility.id(), next) {
        Ok(step) => step,
        Err(gap) => {
            decision.degraded = Some(gap);
            return decision;
        }
    };

    if let Some(step) = step {
        decision.mac_cost = Some(step.cost);
        let gross = valuation::capital_cost(&step, facility.capex_multiple());

        if ctx.penalty_triggers_investment && facility.penalty_flag() {
            facility.start_conversion(next, step);
            decision.action = Action::Invest;
            decision.capital_cost = gross;
            decision.forced = true;
            return decision;
        }

        if facility.is_subsidy_driven() && valuation::pool_covers(ctx.subsidy_pool, gross) {
            facility.start_conversion(next, step);
            decision.action = Action::Invest;
            decision.capital_cost = gross;
            return decision;
        }

        // STAGE 2: NPV EVALUATION
        if effective_price > step.cost {
            let net = gross * (1.0 - ctx.subsidy_rate);
            let value = valuation::npv(net, step.quantity, ctx, uplift);
            decision.npv = Some(value);
            if value > 0.0 {
                facility.start_conversion(next, step);
                decision.action = Action::Invest;
                decision.capital_cost = gross;
                return decision;
            }
        }
    }

    // STAGE 3: CLOSURE THRESHOLD
    let carbon_cost = facility.projected_net_emissions(ctx.free_allocation_share) * effective_price;
    decision.carbon_cost = carbon_cost;
    if carbon_cost > facility.cost_limit() {
        facility.close();
        decision.action = Action::Close;
    }
    decision
}

impl Agent for Facility {
    fn agent_id(&self) -> &str {
        self.id()
    }

    fn kind(&self) -> AgentKind {
        if self.is_exporter() {
            AgentKind::ExporterFacility
        } else {
            AgentKind::Facility
        }
    }
}

impl YearlyStep for Facility {
    fn step(&mut self, ctx: &TickContext) -> Result<StepOutcome, SimulationError> {
        decide(self, ctx).map(StepOutcome::Facility)
    }
}
