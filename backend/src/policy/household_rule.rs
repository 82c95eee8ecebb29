//! Household response rule
//!
//! Segments respond to the price published at the start of the tick. The
//! emissions they produce are read by the next tick's clearing, never by
//! the current one.

use crate::error::SimulationError;
use crate::models::household::HouseholdSegment;
use crate::policy::{Agent, AgentKind, StepOutcome, TickContext, YearlyStep};

impl Agent for HouseholdSegment {
    fn agent_id(&self) -> &str {
        self.id()
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Household
    }
}

impl YearlyStep for HouseholdSegment {
    fn step(&mut self, ctx: &TickContext) -> Result<StepOutcome, SimulationError> {
        let demand = self.respond(ctx.price);
        Ok(StepOutcome::Household {
            demand,
            emissions: self.emissions(),
        })
    }
}
