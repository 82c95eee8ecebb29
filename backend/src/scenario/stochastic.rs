//! Stochastic inputs for repeated runs
//!
//! Distributions:
//!
//! - **Price noise**: clearing price × (1 + N(0, `price_noise_sd`))
//! - **MAC perturbation**: one factor `max(1 + N(0, mac_perturbation_sd), 0.1)`
//!   per facility, applied to every cost on its curve
//! - **Audit rate**: U(lo, hi) once per run when `audit_rate_range` is set,
//!   otherwise the scenario's audit rate
//! - **Misreporting**: each audited facility under-reports with
//!   `misreport_probability`

use crate::error::ConfigurationError;
use crate::rng::RngManager;
use crate::scenario::{non_negative, unit_interval};
use serde::{Deserialize, Serialize};

/// Declared stochastic parameters of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StochasticParams {
    pub price_noise_sd: f64,
    pub mac_perturbation_sd: f64,
    #[serde(default)]
    pub audit_rate_range: Option<(f64, f64)>,
    pub misreport_probability: f64,
}

impl Default for StochasticParams {
    /// Single deterministic run: no noise, occasional misreporting.
    fn default() -> Self {
        Self {
            price_noise_sd: 0.0,
            mac_perturbation_sd: 0.0,
            audit_rate_range: None,
            misreport_probability: 0.05,
        }
    }
}

impl StochasticParams {
    /// Zero-variance inputs: every repetition of a scenario is identical.
    pub fn none() -> Self {
        Self {
            misreport_probability: 0.0,
            ..Self::default()
        }
    }

    /// Typical uncertainty bands for Monte Carlo batches.
    pub fn monte_carlo() -> Self {
        Self {
            price_noise_sd: 0.1,
            mac_perturbation_sd: 0.1,
            audit_rate_range: Some((0.1, 0.3)),
            misreport_probability: 0.05,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        non_negative("stochastic.price_noise_sd", self.price_noise_sd)?;
        non_negative("stochastic.mac_perturbation_sd", self.mac_perturbation_sd)?;
        unit_interval("stochastic.misreport_probability", self.misreport_probability)?;
        if let Some((lo, hi)) = self.audit_rate_range {
            unit_interval("stochastic.audit_rate_range.lo", lo)?;
            unit_interval("stochastic.audit_rate_range.hi", hi)?;
            if hi < lo {
                return Err(ConfigurationError::invalid(
                    "stochastic.audit_rate_range",
                    format!("upper bound {} below lower bound {}", hi, lo),
                ));
            }
        }
        Ok(())
    }

    /// Draw the per-run values from `rng`.
    pub fn draw(&self, rng: &mut RngManager, scenario_audit_rate: f64) -> RunDraw {
        let audit_rate = match self.audit_rate_range {
            Some((lo, hi)) => rng.uniform(lo, hi),
            None => scenario_audit_rate,
        };
        RunDraw { audit_rate }
    }

    /// Multiplicative MAC factor for one facility.
    pub fn mac_factor(&self, rng: &mut RngManager) -> f64 {
        rng.normal(1.0, self.mac_perturbation_sd).max(0.1)
    }
}

/// Values fixed for the whole of one run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunDraw {
    pub audit_rate: f64,
}
