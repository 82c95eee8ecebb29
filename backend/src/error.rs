//! Error taxonomy for the simulation kernel
//!
//! Three tiers, each with a different blast radius:
//!
//! - [`ConfigurationError`]: the scenario or roster is unusable. Raised
//!   before any tick executes.
//! - [`SimulationError::InvariantViolation`]: a tick produced a state the
//!   model forbids (negative emissions, a rising cap, a price outside its
//!   bounds, a decision on a closed facility). Aborts the run and carries
//!   the offending tick's published inputs. Never clamped away.
//! - [`DataGapError`]: a facility's MAC curve has no usable entry at the
//!   level it needs. Recovered locally; the facility holds for the tick.

use crate::policy::TickContext;
use thiserror::Error;

/// Invalid scenario, roster, or harness configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("cap reduction rate must be non-negative, got {0}")]
    NegativeCapReductionRate(f64),

    #[error("cap reduction rate must not exceed 1.0, got {0}")]
    CapReductionRateTooLarge(f64),

    #[error("subsidy budget must be non-negative, got {0}")]
    NegativeSubsidyBudget(f64),

    #[error("border carbon price must be non-negative, got {0}")]
    NegativeBorderCarbonPrice(f64),

    #[error("horizon end {end} is before start {start}")]
    HorizonEndBeforeStart { start: u32, end: u32 },

    #[error("horizon of {years} years exceeds maximum {max}")]
    HorizonTooLong { years: u32, max: u32 },

    #[error("{years} years x {repetitions} repetitions exceeds iteration limit {limit}")]
    IterationLimitExceeded {
        years: u32,
        repetitions: usize,
        limit: usize,
    },

    #[error("roster contains no facilities")]
    EmptyRoster,

    #[error("duplicate facility id: {0}")]
    DuplicateFacilityId(String),

    #[error("invalid MAC curve for {facility_id}: {reason}")]
    InvalidMacCurve { facility_id: String, reason: String },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
}

impl ConfigurationError {
    pub fn invalid(name: &str, reason: impl Into<String>) -> Self {
        ConfigurationError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Missing or unusable MAC-curve data at the abatement level a facility needs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataGapError {
    #[error("facility {facility_id} has an empty MAC curve")]
    EmptyCurve { facility_id: String },

    #[error("facility {facility_id} MAC step {step} has no usable cost/quantity")]
    MissingStep { facility_id: String, step: usize },
}

/// Model invariant that a tick must not break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Invariant {
    #[error("emissions must be finite and non-negative")]
    NonNegativeEmissions,

    #[error("closed facilities emit nothing")]
    ClosedEmitsNothing,

    #[error("closed facilities make no decisions")]
    NoDecisionWhenClosed,

    #[error("converting facilities carry a conversion record")]
    ConversionTracked,

    #[error("cap must not increase")]
    CapNonIncreasing,

    #[error("clearing price must lie in [0, ceiling]")]
    PriceWithinBounds,
}

/// Fatal error for a single simulation run.
#[derive(Debug, Clone, Error)]
pub enum SimulationError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("invariant violated in {year}: {invariant} ({detail}); tick inputs: cap={cap}, price={price}", cap = .context.cap, price = .context.price)]
    InvariantViolation {
        year: u32,
        invariant: Invariant,
        detail: String,
        context: Box<TickContext>,
    },

    #[error("clock violation: {0}")]
    ClockViolation(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl SimulationError {
    /// Build an invariant violation from the tick context that produced it.
    pub fn violation(ctx: &TickContext, invariant: Invariant, detail: impl Into<String>) -> Self {
        SimulationError::InvariantViolation {
            year: ctx.year,
            invariant,
            detail: detail.into(),
            context: Box::new(ctx.clone()),
        }
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, SimulationError::InvariantViolation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_carries_tick_inputs() {
        let ctx = TickContext::new(2030, 80.0, 45.0, 90.0);
        let err = SimulationError::violation(&ctx, Invariant::CapNonIncreasing, "81 > 80");

        let msg = err.to_string();
        assert!(msg.contains("2030"));
        assert!(msg.contains("cap=80"));
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_configuration_error_converts() {
        let err: SimulationError = ConfigurationError::EmptyRoster.into();
        assert!(matches!(err, SimulationError::Configuration(_)));
        assert!(!err.is_invariant_violation());
    }
}
