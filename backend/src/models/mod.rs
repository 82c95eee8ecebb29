//! Domain models for the emissions trading simulator

pub mod event;
pub mod facility;
pub mod household;
pub mod mac;
pub mod state;

// Re-exports
pub use event::{Event, EventLog};
pub use facility::{
    CapitalState, Conversion, ConversionProgress, ExportExposure, Facility, FacilitySpec, Sector,
};
pub use household::{HouseholdSegment, HouseholdSpec};
pub use mac::{MacCurve, MacStep};
pub use state::{Population, PopulationSpec, SimulationState, StateCounts};
