//! Side-by-side scenario comparison
//!
//! Runs several scenarios on the same population and seed and reduces each
//! run to a handful of headline figures.

use crate::models::state::Population;
use crate::orchestrator::engine::run_scenario;
use crate::orchestrator::snapshot::{RunFailure, SimulationRun, YearSnapshot};
use crate::scenario::Scenario;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Headline figures of one completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub scenario: String,
    pub first_year: u32,
    pub final_year: u32,
    /// Total emissions summed over the horizon (Mt)
    pub cumulative_emissions: f64,
    pub initial_emissions: f64,
    pub final_emissions: f64,
    /// Final emissions relative to the first year, in [−1, ∞)
    pub emissions_change: f64,
    pub final_cap: f64,
    pub final_price: f64,
    pub mean_price: f64,
    pub total_subsidies: f64,
    pub total_penalties: f64,
    pub total_auction_revenue: f64,
    pub total_household_transfer: f64,
    pub total_firm_support: f64,
    pub converted_facilities: usize,
    pub closed_facilities: usize,
    pub border_carbon_cost: f64,
}

impl ScenarioSummary {
    /// Summarise a completed run. `None` for a run without snapshots.
    pub fn from_run(run: &SimulationRun) -> Option<Self> {
        let first = run.snapshots.first()?;
        let last = run.snapshots.last()?;
        let years = run.snapshots.len() as f64;

        let sum = |f: fn(&YearSnapshot) -> f64| -> f64 {
            run.snapshots.iter().map(f).sum()
        };

        let emissions_change = if first.total_emissions > 0.0 {
            last.total_emissions / first.total_emissions - 1.0
        } else {
            0.0
        };

        Some(Self {
            scenario: run.scenario.clone(),
            first_year: first.year,
            final_year: last.year,
            cumulative_emissions: sum(|s| s.total_emissions),
            initial_emissions: first.total_emissions,
            final_emissions: last.total_emissions,
            emissions_change,
            final_cap: last.cap,
            final_price: last.clearing_price,
            mean_price: sum(|s| s.clearing_price) / years,
            total_subsidies: sum(|s| s.subsidies_disbursed),
            total_penalties: sum(|s| s.penalties_collected),
            total_auction_revenue: sum(|s| s.auction_revenue),
            total_household_transfer: sum(|s| s.household_transfer),
            total_firm_support: sum(|s| s.firm_support),
            converted_facilities: last.state_counts.converting + last.state_counts.clean,
            closed_facilities: last.state_counts.closed,
            border_carbon_cost: last.border_carbon_cost,
        })
    }
}

/// Run each scenario on `population` with the same seed.
///
/// Results keep the order of `scenarios`. The first failing run aborts the
/// comparison.
pub fn compare_scenarios(
    scenarios: &[Scenario],
    population: &Population,
    rng_seed: u64,
) -> Result<Vec<ScenarioSummary>, RunFailure> {
    let runs: Vec<SimulationRun> = scenarios
        .par_iter()
        .map(|scenario| run_scenario(scenario, population, rng_seed))
        .collect::<Result<_, _>>()?;

    Ok(runs.iter().filter_map(ScenarioSummary::from_run).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::RosterConfig;

    #[test]
    fn test_summary_order_follows_input() {
        let population = RosterConfig::default().build().unwrap();
        let scenarios = vec![
            Scenario::strict_ets().with_horizon(2025, 2028),
            Scenario::bau().with_horizon(2025, 2028),
        ];

        let summaries = compare_scenarios(&scenarios, &population, 7).unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].scenario, "Strict-ETS");
        assert_eq!(summaries[1].scenario, "BAU");
        assert_eq!(summaries[1].final_price, 0.0);
        assert_eq!(summaries[1].final_cap, 146.0);
        assert!(summaries[0].final_cap < summaries[1].final_cap);
    }
}
