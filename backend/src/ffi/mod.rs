//! Python bindings (behind the `pyo3` feature)
//!
//! Batch entry points take and return JSON text.

pub mod orchestrator;
pub mod types;

use pyo3::prelude::*;

use crate::monte_carlo::{run_monte_carlo, MonteCarloConfig};
use crate::orchestrator::{compare_scenarios, run_with};
use crate::scenario::{preset_names, RosterConfig};
use types::{parse_scenario, parse_simulation_config, runtime_error, value_error};

/// Run a whole scenario and return the run record as JSON.
#[pyfunction]
#[pyo3(signature = (scenario, rng_seed, roster_json=None, stochastic_json=None))]
pub fn run_scenario_json(
    scenario: &str,
    rng_seed: u64,
    roster_json: Option<&str>,
    stochastic_json: Option<&str>,
) -> PyResult<String> {
    let config = parse_simulation_config(scenario, rng_seed, roster_json, stochastic_json)?;
    let run = run_with(config).map_err(|e| runtime_error("Simulation failed", e))?;
    serde_json::to_string(&run).map_err(|e| runtime_error("Failed to serialize run", e))
}

/// Run a Monte Carlo batch and return the percentile summary as JSON.
#[pyfunction]
#[pyo3(signature = (scenario, config_json=None))]
pub fn run_monte_carlo_json(scenario: &str, config_json: Option<&str>) -> PyResult<String> {
    let scenario = parse_scenario(scenario)?;
    let config: MonteCarloConfig = match config_json {
        Some(json) => {
            serde_json::from_str(json).map_err(|e| value_error("Invalid Monte Carlo JSON", e))?
        }
        None => MonteCarloConfig::default(),
    };
    let population = RosterConfig::default()
        .build()
        .map_err(|e| value_error("Invalid roster", e))?;

    let summary = run_monte_carlo(&scenario, &population, &config)
        .map_err(|e| runtime_error("Monte Carlo batch failed", e))?;
    serde_json::to_string(&summary).map_err(|e| runtime_error("Failed to serialize summary", e))
}

/// Compare the named scenarios on the default roster.
#[pyfunction]
pub fn compare_scenarios_json(scenarios: Vec<String>, rng_seed: u64) -> PyResult<String> {
    let scenarios = scenarios
        .iter()
        .map(|s| parse_scenario(s))
        .collect::<PyResult<Vec<_>>>()?;
    let population = RosterConfig::default()
        .build()
        .map_err(|e| value_error("Invalid roster", e))?;

    let summaries = compare_scenarios(&scenarios, &population, rng_seed)
        .map_err(|e| runtime_error("Comparison failed", e))?;
    serde_json::to_string(&summaries).map_err(|e| runtime_error("Failed to serialize summary", e))
}

#[pyfunction]
pub fn presets() -> Vec<String> {
    preset_names()
}

pub(crate) fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<orchestrator::PyOrchestrator>()?;
    m.add_function(wrap_pyfunction!(run_scenario_json, m)?)?;
    m.add_function(wrap_pyfunction!(run_monte_carlo_json, m)?)?;
    m.add_function(wrap_pyfunction!(compare_scenarios_json, m)?)?;
    m.add_function(wrap_pyfunction!(presets, m)?)?;
    Ok(())
}
