//! Event logging for simulation replay and auditing.
//!
//! Every decision and state change in a run is recorded as an [`Event`].
//! The log serves three purposes:
//! - Determinism checks (two runs with the same seed must produce the same
//!   log, compared through its digest)
//! - Diagnosis (what each facility did and why, year by year)
//! - Audit trail (penalties, subsidies, closures)
//!
//! # Event Types
//!
//! - **Decision**: facility action, conversion progress, closure, degraded decision
//! - **Household**: segment demand response
//! - **Market**: subsidy disbursement, market clearing
//! - **Enforcement**: audit selection, penalty
//!
//! # Example
//!
//! ```rust
//! use ets_simulator_core_rs::models::Event;
//! use ets_simulator_core_rs::policy::Action;
//!
//! let event = Event::FacilityDecision {
//!     year: 2027,
//!     facility_id: "ENE-004".to_string(),
//!     action: Action::Invest,
//!     effective_price: 42.0,
//!     mac_cost: Some(35.0),
//!     npv: Some(12.5),
//!     forced: false,
//! };
//!
//! assert_eq!(event.year(), 2027);
//! assert_eq!(event.event_type(), "FacilityDecision");
//! assert_eq!(event.agent_id(), Some("ENE-004"));
//! ```

use crate::policy::Action;
use serde::{Deserialize, Serialize};

/// Simulation event capturing a state change.
///
/// Events are logged in the order they occur within a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Facility evaluated its options and chose an action
    FacilityDecision {
        year: u32,
        facility_id: String,
        action: Action,
        effective_price: f64,
        mac_cost: Option<f64>,
        npv: Option<f64>,
        /// Investment forced by a prior audit penalty
        forced: bool,
    },

    ConversionStarted {
        year: u32,
        facility_id: String,
        step_index: usize,
        years: u32,
        target_emissions: f64,
    },

    ConversionCompleted {
        year: u32,
        facility_id: String,
        emissions_before: f64,
        emissions_after: f64,
    },

    FacilityClosed {
        year: u32,
        facility_id: String,
        carbon_cost: f64,
        cost_limit: f64,
    },

    /// MAC data gap; the facility held for this tick
    DegradedDecision {
        year: u32,
        facility_id: String,
        reason: String,
    },

    HouseholdResponse {
        year: u32,
        segment_id: String,
        demand: f64,
        emissions: f64,
    },

    SubsidyDisbursed {
        year: u32,
        facility_id: String,
        amount: f64,
    },

    MarketCleared {
        year: u32,
        cap: f64,
        next_cap: f64,
        demand: f64,
        clearing_price: f64,
    },

    AuditSelected {
        year: u32,
        facility_id: String,
    },

    PenaltyAssessed {
        year: u32,
        facility_id: String,
        declared_emissions: f64,
        actual_emissions: f64,
        penalty: f64,
    },
}

impl Event {
    /// Year in which this event occurred
    pub fn year(&self) -> u32 {
        match self {
            Event::FacilityDecision { year, .. } => *year,
            Event::ConversionStarted { year, .. } => *year,
            Event::ConversionCompleted { year, .. } => *year,
            Event::FacilityClosed { year, .. } => *year,
            Event::DegradedDecision { year, .. } => *year,
            Event::HouseholdResponse { year, .. } => *year,
            Event::SubsidyDisbursed { year, .. } => *year,
            Event::MarketCleared { year, .. } => *year,
            Event::AuditSelected { year, .. } => *year,
            Event::PenaltyAssessed { year, .. } => *year,
        }
    }

    /// Short name of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::FacilityDecision { .. } => "FacilityDecision",
            Event::ConversionStarted { .. } => "ConversionStarted",
            Event::ConversionCompleted { .. } => "ConversionCompleted",
            Event::FacilityClosed { .. } => "FacilityClosed",
            Event::DegradedDecision { .. } => "DegradedDecision",
            Event::HouseholdResponse { .. } => "HouseholdResponse",
            Event::SubsidyDisbursed { .. } => "SubsidyDisbursed",
            Event::MarketCleared { .. } => "MarketCleared",
            Event::AuditSelected { .. } => "AuditSelected",
            Event::PenaltyAssessed { .. } => "PenaltyAssessed",
        }
    }

    /// Facility or household segment this event concerns
    pub fn agent_id(&self) -> Option<&str> {
        match self {
            Event::FacilityDecision { facility_id, .. } => Some(facility_id),
            Event::ConversionStarted { facility_id, .. } => Some(facility_id),
            Event::ConversionCompleted { facility_id, .. } => Some(facility_id),
            Event::FacilityClosed { facility_id, .. } => Some(facility_id),
            Event::DegradedDecision { facility_id, .. } => Some(facility_id),
            Event::HouseholdResponse { segment_id, .. } => Some(segment_id),
            Event::SubsidyDisbursed { facility_id, .. } => Some(facility_id),
            Event::AuditSelected { facility_id, .. } => Some(facility_id),
            Event::PenaltyAssessed { facility_id, .. } => Some(facility_id),
            Event::MarketCleared { .. } => None,
        }
    }
}

/// Event log for storing and querying simulation events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events for a specific year
    pub fn events_in_year(&self, year: u32) -> Vec<&Event> {
        self.events.iter().filter(|e| e.year() == year).collect()
    }

    /// Events of a specific type
    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Events for a specific facility or segment
    pub fn events_for_agent(&self, agent_id: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.agent_id() == Some(agent_id))
            .collect()
    }

    /// IDs of facilities audited in `year`, in selection order
    pub fn audited_in_year(&self, year: u32) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::AuditSelected {
                    year: y,
                    facility_id,
                } if *y == year => Some(facility_id.as_str()),
                _ => None,
            })
            .collect()
    }
}
