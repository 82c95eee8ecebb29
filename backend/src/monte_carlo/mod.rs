//! Monte Carlo harness
//!
//! Repeats a full scenario run under independently seeded stochastic
//! inputs and aggregates the yearly snapshots into percentile bands.
//!
//! # Critical Invariants
//!
//! 1. Repetition `i` is seeded with `derive_seed(seed, i)`; nothing else
//!    differs between repetitions
//! 2. Repetitions share no mutable state; parallel and sequential
//!    execution give identical summaries
//! 3. Failed repetitions are excluded from aggregation and reported
//!    separately; the batch fails when more than `max_failure_fraction`
//!    of repetitions fail
//!
//! # Example
//!
//! ```rust
//! use ets_simulator_core_rs::monte_carlo::{run_monte_carlo, Metric, MonteCarloConfig};
//! use ets_simulator_core_rs::scenario::{RosterConfig, StochasticParams};
//! use ets_simulator_core_rs::Scenario;
//!
//! let scenario = Scenario::soft_ets().with_horizon(2025, 2027);
//! let population = RosterConfig::default().build().unwrap();
//! let config = MonteCarloConfig {
//!     repetitions: 8,
//!     stochastic: StochasticParams::none(),
//!     ..MonteCarloConfig::default()
//! };
//!
//! let summary = run_monte_carlo(&scenario, &population, &config).unwrap();
//! let band = summary.band(Metric::TotalEmissions, 2027).unwrap();
//! assert_eq!(band.p5, band.p95);
//! ```

pub mod aggregate;

pub use aggregate::{aggregate, band, quantile_sorted, Metric, MetricSeries, PercentileBand};

use crate::error::{ConfigurationError, SimulationError};
use crate::models::state::Population;
use crate::orchestrator::{
    compute_config_hash, run_with, RunFailure, SimulationConfig, SimulationRun,
};
use crate::rng::derive_seed;
use crate::scenario::{unit_interval, Scenario, StochasticParams, MAX_ITERATIONS, MAX_REPETITIONS};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Batch configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    pub repetitions: usize,
    /// Top-level seed; repetition seeds derive from it
    pub seed: u64,
    pub stochastic: StochasticParams,
    /// Largest tolerated share of failed repetitions, in [0, 1]
    pub max_failure_fraction: f64,
    /// Run repetitions on the rayon pool
    pub parallel: bool,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            repetitions: 100,
            seed: 42,
            stochastic: StochasticParams::monte_carlo(),
            max_failure_fraction: 0.1,
            parallel: true,
        }
    }
}

impl MonteCarloConfig {
    /// Check batch bounds against the scenario horizon.
    pub fn validate(&self, scenario: &Scenario) -> Result<(), ConfigurationError> {
        scenario.validate()?;
        self.stochastic.validate()?;
        unit_interval("max_failure_fraction", self.max_failure_fraction)?;

        if self.repetitions == 0 {
            return Err(ConfigurationError::invalid(
                "repetitions",
                "at least one repetition is required",
            ));
        }
        if self.repetitions > MAX_REPETITIONS {
            return Err(ConfigurationError::invalid(
                "repetitions",
                format!("{} exceeds maximum {}", self.repetitions, MAX_REPETITIONS),
            ));
        }

        let years = scenario.horizon.years();
        if (years as usize).saturating_mul(self.repetitions) > MAX_ITERATIONS {
            return Err(ConfigurationError::IterationLimitExceeded {
                years,
                repetitions: self.repetitions,
                limit: MAX_ITERATIONS,
            });
        }
        Ok(())
    }

    /// Seed of repetition `index`.
    pub fn repetition_seed(&self, index: usize) -> u64 {
        derive_seed(self.seed, index as u64)
    }
}

/// Batch-level failure
#[derive(Debug, Clone, Error)]
pub enum MonteCarloError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("{failed} of {total} repetitions failed (tolerated fraction {max_fraction})")]
    TooManyFailures {
        failed: usize,
        total: usize,
        max_fraction: f64,
    },

    #[error("no repetition completed")]
    NoSuccessfulRepetitions,
}

/// A repetition that hit a fatal error
#[derive(Debug, Clone, Serialize)]
pub struct RepetitionFailure {
    pub index: usize,
    pub seed: u64,
    #[serde(serialize_with = "serialize_display")]
    pub error: SimulationError,
    pub completed_years: usize,
}

fn serialize_display<S: serde::Serializer>(
    error: &SimulationError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Aggregated result of a batch
#[derive(Debug, Clone, Serialize)]
pub struct MonteCarloSummary {
    pub scenario: String,
    pub seed: u64,
    pub config_hash: String,
    pub repetitions: usize,
    pub successful: usize,
    pub failures: Vec<RepetitionFailure>,
    pub series: Vec<MetricSeries>,
    /// Trace digests of successful repetitions in index order
    pub trace_digests: Vec<String>,
}

impl MonteCarloSummary {
    pub fn series(&self, metric: Metric) -> Option<&MetricSeries> {
        self.series.iter().find(|s| s.metric == metric)
    }

    pub fn band(&self, metric: Metric, year: u32) -> Option<&PercentileBand> {
        self.series(metric)?.band(year)
    }

    pub fn failure_fraction(&self) -> f64 {
        self.failures.len() as f64 / self.repetitions as f64
    }
}

#[derive(Serialize)]
struct BatchIdentity<'a> {
    scenario: &'a Scenario,
    population: &'a Population,
    config: &'a MonteCarloConfig,
}

/// Run `config.repetitions` independent repetitions of `scenario`.
pub fn run_monte_carlo(
    scenario: &Scenario,
    population: &Population,
    config: &MonteCarloConfig,
) -> Result<MonteCarloSummary, MonteCarloError> {
    config.validate(scenario)?;

    let config_hash = compute_config_hash(&BatchIdentity {
        scenario,
        population,
        config,
    })
    .map_err(|e| ConfigurationError::invalid("monte_carlo", e.to_string()))?;

    info!(
        scenario = %scenario.name,
        repetitions = config.repetitions,
        seed = config.seed,
        parallel = config.parallel,
        "monte carlo batch started"
    );

    let run_one = |index: usize| -> (usize, u64, Result<SimulationRun, RunFailure>) {
        let seed = config.repetition_seed(index);
        let result = run_with(SimulationConfig {
            scenario: scenario.clone(),
            population: population.clone(),
            rng_seed: seed,
            stochastic: config.stochastic.clone(),
        });
        (index, seed, result)
    };

    // Indexed collect keeps repetition order on both paths
    let results: Vec<_> = if config.parallel {
        (0..config.repetitions).into_par_iter().map(run_one).collect()
    } else {
        (0..config.repetitions).map(run_one).collect()
    };

    let mut runs = Vec::new();
    let mut failures = Vec::new();
    for (index, seed, result) in results {
        match result {
            Ok(run) => runs.push(run),
            Err(RunFailure { error, partial }) => {
                warn!(index, seed, %error, "repetition failed");
                failures.push(RepetitionFailure {
                    index,
                    seed,
                    error,
                    completed_years: partial.len(),
                });
            }
        }
    }

    if runs.is_empty() {
        return Err(MonteCarloError::NoSuccessfulRepetitions);
    }
    let failed = failures.len();
    if failed as f64 > config.max_failure_fraction * config.repetitions as f64 {
        return Err(MonteCarloError::TooManyFailures {
            failed,
            total: config.repetitions,
            max_fraction: config.max_failure_fraction,
        });
    }

    let sequences: Vec<&[_]> = runs.iter().map(|r| r.snapshots.as_slice()).collect();
    let series = aggregate(&sequences);

    info!(
        scenario = %scenario.name,
        successful = runs.len(),
        failed,
        "monte carlo batch completed"
    );

    Ok(MonteCarloSummary {
        scenario: scenario.name.clone(),
        seed: config.seed,
        config_hash,
        repetitions: config.repetitions,
        successful: runs.len(),
        failures,
        series,
        trace_digests: runs.into_iter().map(|r| r.trace_digest).collect(),
    })
}
