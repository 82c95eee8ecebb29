//! ETS Simulator Core - Rust Engine
//!
//! Multi-agent kernel of a cap-and-trade emissions market with
//! deterministic execution.
//!
//! # Architecture
//!
//! - **core**: Simulation clock (yearly tick state machine)
//! - **models**: Domain types (Facility, MAC curve, Household, Event, State)
//! - **policy**: Agent decision rules (MAC test, NPV valuation, closure)
//! - **market**: Market operator (cap path, price formation, subsidies)
//! - **enforcement**: MRV audits and penalties
//! - **scenario**: Policy bundles, presets, roster generation, stochastic inputs
//! - **orchestrator**: Main simulation loop and run records
//! - **monte_carlo**: Repeated runs and percentile aggregation
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. Emissions in Mt/yr, prices in $/t, money in M$
//! 2. All randomness is deterministic (seeded RNG)
//! 3. Agents decide from the same published context; state changes only
//!    after every decision of the year is collected
//! 4. FFI boundary is minimal and safe

// Module declarations
pub mod core;
pub mod enforcement;
pub mod error;
pub mod market;
pub mod models;
pub mod monte_carlo;
pub mod orchestrator;
pub mod policy;
pub mod rng;
pub mod scenario;

// Re-exports for convenience
pub use crate::core::clock::{ClockState, YearClock};
pub use error::{ConfigurationError, DataGapError, Invariant, SimulationError};
pub use market::{MarketOperator, PriceFormation};
pub use models::{
    event::{Event, EventLog},
    facility::{CapitalState, Facility, Sector},
    household::HouseholdSegment,
    mac::{MacCurve, MacStep},
    state::{Population, SimulationState},
};
pub use monte_carlo::{run_monte_carlo, MonteCarloConfig, MonteCarloError, MonteCarloSummary};
pub use orchestrator::{
    compare_scenarios, run_scenario, Orchestrator, RunFailure, SimulationConfig, SimulationRun,
    YearSnapshot,
};
pub use policy::{Action, Decision, TickContext};
pub use rng::RngManager;
pub use scenario::{Scenario, StochasticParams};

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn ets_simulator_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    ffi::register(m)
}
