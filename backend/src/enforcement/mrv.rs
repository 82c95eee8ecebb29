//! MRV agent
//!
//! Each year the MRV agent audits `round(audit_rate × facility count)`
//! distinct facilities chosen by its own seeded stream. An audited facility
//! under-reports with the configured probability; its true emissions are
//! then `declared × (1 + gap)` with `gap ~ U(gap_min, gap_max)`. Any positive
//! gap is penalised at `gap × penalty_price × penalty_multiplier`.
//!
//! # Critical Invariants
//!
//! 1. No facility is audited twice in one year
//! 2. Selection depends only on the seed, the year count and the roster
//!    size, so a fixed seed reproduces the audited IDs exactly
//! 3. Every selected facility consumes the same number of draws whatever
//!    the misreporting outcome

use crate::models::facility::Facility;
use crate::policy::{Agent, AgentKind};
use crate::rng::RngManager;
use crate::scenario::EnforcementConfig;
use serde::{Deserialize, Serialize};

/// Penalty outcome for one audited facility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditFinding {
    pub facility_id: String,
    pub declared_emissions: f64,
    pub actual_emissions: f64,
    pub penalty: f64,
}

/// Result of one year's audits
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub year: u32,
    /// Audited facility IDs in selection order
    pub selected: Vec<String>,
    /// Findings for every audited facility, penalised or not
    pub findings: Vec<AuditFinding>,
    pub total_penalties: f64,
}

impl AuditReport {
    pub fn penalised(&self) -> impl Iterator<Item = &AuditFinding> {
        self.findings.iter().filter(|f| f.penalty > 0.0)
    }
}

/// Monitoring and enforcement agent
///
/// # Example
/// ```
/// use ets_simulator_core_rs::enforcement::MrvAgent;
/// use ets_simulator_core_rs::scenario::{EnforcementConfig, RosterConfig};
/// use ets_simulator_core_rs::RngManager;
///
/// let mut facilities = RosterConfig::default().build().unwrap().facilities;
/// let mut mrv = MrvAgent::new(EnforcementConfig::default(), 0.0, RngManager::new(7));
///
/// let report = mrv.audit(2025, &mut facilities, 0.1);
/// assert_eq!(report.selected.len(), 11);
/// assert_eq!(report.total_penalties, 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct MrvAgent {
    config: EnforcementConfig,
    misreport_probability: f64,
    rng: RngManager,
}

impl MrvAgent {
    pub fn new(config: EnforcementConfig, misreport_probability: f64, rng: RngManager) -> Self {
        Self {
            config,
            misreport_probability,
            rng,
        }
    }

    /// Number of facilities audited out of `population` at `audit_rate`.
    pub fn sample_size(population: usize, audit_rate: f64) -> usize {
        let k = (audit_rate.clamp(0.0, 1.0) * population as f64).round() as usize;
        k.min(population)
    }

    /// Audit a subset of the operating `facilities` and apply penalties to them.
    ///
    /// Closed facilities are outside the sampling frame.
    pub fn audit(&mut self, year: u32, facilities: &mut [Facility], audit_rate: f64) -> AuditReport {
        let active: Vec<usize> = facilities
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.is_closed())
            .map(|(i, _)| i)
            .collect();
        let k = Self::sample_size(active.len(), audit_rate);
        let picked: Vec<usize> = self
            .rng
            .sample_indices(active.len(), k)
            .into_iter()
            .map(|i| active[i])
            .collect();

        let mut report = AuditReport {
            year,
            ..Default::default()
        };

        for index in picked {
            let misreported = self.rng.chance(self.misreport_probability);
            let gap = self.rng.uniform(self.config.gap_min, self.config.gap_max);

            let facility = &mut facilities[index];
            let declared = facility.emissions();
            let actual = if misreported {
                declared * (1.0 + gap)
            } else {
                declared
            };
            let penalty = (actual - declared).max(0.0)
                * self.config.penalty_price
                * self.config.penalty_multiplier;

            if penalty > 0.0 {
                facility.record_penalty(penalty);
                report.total_penalties += penalty;
            }
            report.selected.push(facility.id().to_string());
            report.findings.push(AuditFinding {
                facility_id: facility.id().to_string(),
                declared_emissions: declared,
                actual_emissions: actual,
                penalty,
            });
        }

        report
    }
}

impl Agent for MrvAgent {
    fn agent_id(&self) -> &str {
        "MRV"
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Mrv
    }
}
