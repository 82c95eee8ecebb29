//! Type conversion utilities for FFI boundary
//!
//! Configuration crosses the boundary as JSON text; yearly snapshots come
//! back as Python dicts so the dashboard can read them without a decoder.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::orchestrator::{SimulationConfig, YearSnapshot};
use crate::scenario::{RosterSource, Scenario, StochasticParams};

// ========================================================================
// Error Helpers
// ========================================================================

pub fn value_error(context: &str, e: impl std::fmt::Display) -> PyErr {
    PyErr::new::<PyValueError, _>(format!("{}: {}", context, e))
}

pub fn runtime_error(context: &str, e: impl std::fmt::Display) -> PyErr {
    PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!("{}: {}", context, e))
}

// ========================================================================
// Configuration Parsers
// ========================================================================

/// Resolve a scenario given either as a preset name or as JSON text.
pub fn parse_scenario(spec: &str) -> PyResult<Scenario> {
    let trimmed = spec.trim_start();
    if trimmed.starts_with('{') {
        serde_json::from_str(trimmed).map_err(|e| value_error("Invalid scenario JSON", e))
    } else {
        Scenario::preset(spec).map_err(|e| value_error("Unknown scenario", e))
    }
}

/// Build a run configuration from the dashboard's arguments.
///
/// `roster_json` is a roster configuration or a facility inventory and
/// defaults to the standard roster; `stochastic_json` defaults to
/// [`StochasticParams::default`].
pub fn parse_simulation_config(
    scenario: &str,
    rng_seed: u64,
    roster_json: Option<&str>,
    stochastic_json: Option<&str>,
) -> PyResult<SimulationConfig> {
    let scenario = parse_scenario(scenario)?;

    let roster = match roster_json {
        Some(json) => {
            RosterSource::from_json(json).map_err(|e| value_error("Invalid roster JSON", e))?
        }
        None => RosterSource::default(),
    };
    let population = roster
        .build()
        .map_err(|e| value_error("Invalid roster", e))?;

    let stochastic: StochasticParams = match stochastic_json {
        Some(json) => {
            serde_json::from_str(json).map_err(|e| value_error("Invalid stochastic JSON", e))?
        }
        None => StochasticParams::default(),
    };

    Ok(SimulationConfig {
        scenario,
        population,
        rng_seed,
        stochastic,
    })
}

// ========================================================================
// Result Converters
// ========================================================================

/// Convert a yearly snapshot to a Python dict
pub fn snapshot_to_py(py: Python<'_>, snapshot: &YearSnapshot) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new_bound(py);

    dict.set_item("year", snapshot.year)?;
    dict.set_item("total_emissions", snapshot.total_emissions)?;
    dict.set_item("facility_emissions", snapshot.facility_emissions)?;
    dict.set_item("household_emissions", snapshot.household_emissions)?;
    dict.set_item("net_emissions", snapshot.net_emissions)?;
    dict.set_item("cap", snapshot.cap)?;
    dict.set_item("published_price", snapshot.published_price)?;
    dict.set_item("clearing_price", snapshot.clearing_price)?;
    dict.set_item("invest_actions", snapshot.invest_actions)?;
    dict.set_item("closures", snapshot.closures)?;
    dict.set_item("subsidies_disbursed", snapshot.subsidies_disbursed)?;
    dict.set_item("penalties_collected", snapshot.penalties_collected)?;
    dict.set_item("border_carbon_cost", snapshot.border_carbon_cost)?;

    let counts = PyDict::new_bound(py);
    counts.set_item("dirty", snapshot.state_counts.dirty)?;
    counts.set_item("converting", snapshot.state_counts.converting)?;
    counts.set_item("clean", snapshot.state_counts.clean)?;
    counts.set_item("closed", snapshot.state_counts.closed)?;
    dict.set_item("state_counts", counts)?;

    Ok(dict.unbind())
}
