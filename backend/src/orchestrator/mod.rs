//! Orchestrator - main simulation loop
//!
//! Drives one scenario through its horizon. See `engine.rs` for the tick
//! loop, `snapshot.rs` for run records and `compare.rs` for running
//! several scenarios side by side.

pub mod compare;
pub mod engine;
pub mod snapshot;

pub use compare::{compare_scenarios, ScenarioSummary};
pub use engine::{run_scenario, run_with, Orchestrator, SimulationConfig};
pub use snapshot::{
    compute_config_hash, compute_trace_digest, snapshots_to_csv, RunFailure, SimulationRun,
    YearSnapshot,
};
