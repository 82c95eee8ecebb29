//! PyO3 wrapper for Orchestrator
//!
//! This module provides the Python interface to the Rust orchestrator.

use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use super::types::{parse_simulation_config, runtime_error, snapshot_to_py};
use crate::orchestrator::Orchestrator as RustOrchestrator;

/// Python wrapper for Rust Orchestrator
///
/// # Example (from Python)
///
/// ```python
/// from ets_simulator._core import Orchestrator
///
/// orch = Orchestrator("Strict-ETS", 12345)
/// while not orch.is_complete():
///     snap = orch.tick()
///     print(snap["year"], snap["clearing_price"])
/// ```
#[pyclass(name = "Orchestrator")]
pub struct PyOrchestrator {
    inner: RustOrchestrator,
}

#[pymethods]
impl PyOrchestrator {
    /// Create an orchestrator from a preset name or scenario JSON.
    ///
    /// Raises ValueError on an invalid scenario, roster or stochastic block.
    #[new]
    #[pyo3(signature = (scenario, rng_seed, roster_json=None, stochastic_json=None))]
    fn new(
        scenario: &str,
        rng_seed: u64,
        roster_json: Option<&str>,
        stochastic_json: Option<&str>,
    ) -> PyResult<Self> {
        let config = parse_simulation_config(scenario, rng_seed, roster_json, stochastic_json)?;
        let inner = RustOrchestrator::new(config)
            .map_err(|e| runtime_error("Failed to create orchestrator", e))?;
        Ok(PyOrchestrator { inner })
    }

    /// Execute one simulated year and return its snapshot.
    fn tick(&mut self, py: Python<'_>) -> PyResult<Py<PyDict>> {
        let snapshot = self
            .inner
            .tick()
            .map_err(|e| runtime_error("Tick execution failed", e))?;
        snapshot_to_py(py, &snapshot)
    }

    fn is_complete(&self) -> bool {
        self.inner.is_complete()
    }

    fn current_year(&self) -> Option<u32> {
        self.inner.clock().current_year()
    }

    fn config_hash(&self) -> String {
        self.inner.config_hash().to_string()
    }

    /// All snapshots recorded so far.
    fn snapshots(&self, py: Python<'_>) -> PyResult<Py<PyList>> {
        let list = PyList::empty_bound(py);
        for snapshot in self.inner.snapshots() {
            list.append(snapshot_to_py(py, snapshot)?)?;
        }
        Ok(list.unbind())
    }

    /// Event log as JSON text.
    fn events_json(&self) -> PyResult<String> {
        serde_json::to_string(self.inner.event_log())
            .map_err(|e| runtime_error("Failed to serialize events", e))
    }
}
