//! Run records
//!
//! The yearly snapshot sequence is the kernel's only exported artifact.
//! A completed run also carries the SHA-256 hash of its configuration and a
//! digest of its full event trace, so two runs can be compared without
//! diffing their logs.
//!
//! # Critical Invariants
//!
//! - **Append-only**: snapshots are pushed once per completed year, in order
//! - **Determinism**: same config + seed produces the same trace digest
//! - **Config Matching**: outputs carry the hash of the inputs that made them

use crate::error::SimulationError;
use crate::models::event::EventLog;
use crate::models::state::StateCounts;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use thiserror::Error;

// ============================================================================
// Snapshot Structures
// ============================================================================

/// State of the system at the end of one simulated year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSnapshot {
    pub year: u32,
    /// Facility plus household emissions (Mt)
    pub total_emissions: f64,
    pub facility_emissions: f64,
    pub household_emissions: f64,
    /// Emissions not covered by free allocation or banked permits (Mt)
    pub net_emissions: f64,
    /// Cap in force this year (Mt)
    pub cap: f64,
    /// Price agents decided on this year ($/t)
    pub published_price: f64,
    /// Price cleared this year for next year ($/t)
    pub clearing_price: f64,
    pub state_counts: StateCounts,
    pub invest_actions: usize,
    pub closures: usize,
    pub degraded_decisions: usize,
    pub subsidized_investments: usize,
    /// Subsidy paid this year (M$)
    pub subsidies_disbursed: f64,
    pub subsidy_remaining: f64,
    pub audited_facilities: usize,
    /// MRV penalties assessed this year (M$)
    pub penalties_collected: f64,
    pub auction_revenue: f64,
    pub household_transfer: f64,
    /// Auction revenue paid to operating facilities (M$)
    pub firm_support: f64,
    /// Border-carbon cost borne by exporters (M$)
    pub border_carbon_cost: f64,
}

/// Completed simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRun {
    pub scenario: String,
    pub rng_seed: u64,
    /// SHA-256 of the canonical run configuration
    pub config_hash: String,
    /// SHA-256 of the canonical event trace
    pub trace_digest: String,
    pub snapshots: Vec<YearSnapshot>,
    #[serde(skip)]
    pub events: EventLog,
}

impl SimulationRun {
    pub fn final_snapshot(&self) -> Option<&YearSnapshot> {
        self.snapshots.last()
    }

    pub fn snapshot(&self, year: u32) -> Option<&YearSnapshot> {
        self.snapshots.iter().find(|s| s.year == year)
    }
}

/// Run aborted by a fatal error, with the years completed before it
#[derive(Debug, Clone, Error)]
#[error("run aborted after {} completed years: {error}", .partial.len())]
pub struct RunFailure {
    pub error: SimulationError,
    pub partial: Vec<YearSnapshot>,
}

// ============================================================================
// Hashing
// ============================================================================

/// Compute a deterministic SHA-256 hash of a serializable value.
///
/// Object keys are sorted recursively so field order never changes the hash.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, SimulationError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    let value = serde_json::to_value(config).map_err(|e| {
        SimulationError::Serialization(format!("config serialization failed: {}", e))
    })?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value)).map_err(|e| {
        SimulationError::Serialization(format!("config serialization failed: {}", e))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Digest of an event trace.
pub fn compute_trace_digest(events: &EventLog) -> Result<String, SimulationError> {
    compute_config_hash(events)
}

// ============================================================================
// Export
// ============================================================================

const CSV_HEADER: &str = "year,total_emissions,facility_emissions,household_emissions,\
net_emissions,cap,published_price,clearing_price,dirty,converting,clean,closed,\
invest_actions,closures,degraded_decisions,subsidized_investments,subsidies_disbursed,\
subsidy_remaining,audited_facilities,penalties_collected,auction_revenue,\
household_transfer,firm_support,border_carbon_cost";

/// Render snapshots as CSV, one row per year.
pub fn snapshots_to_csv(snapshots: &[YearSnapshot]) -> String {
    let mut out = String::with_capacity(64 * (snapshots.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');
    for s in snapshots {
        let c = &s.state_counts;
        // writing to a String cannot fail
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            s.year,
            s.total_emissions,
            s.facility_emissions,
            s.household_emissions,
            s.net_emissions,
            s.cap,
            s.published_price,
            s.clearing_price,
            c.dirty,
            c.converting,
            c.clean,
            c.closed,
            s.invest_actions,
            s.closures,
            s.degraded_decisions,
            s.subsidized_investments,
            s.subsidies_disbursed,
            s.subsidy_remaining,
            s.audited_facilities,
            s.penalties_collected,
            s.auction_revenue,
            s.household_transfer,
            s.firm_support,
            s.border_carbon_cost,
        );
    }
    out
}
