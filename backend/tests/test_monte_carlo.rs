//! Monte Carlo harness tests
//!
//! Covers repetition seeding, parallel/sequential equivalence, percentile
//! bands and batch-level failure handling.

use ets_simulator_core_rs::error::ConfigurationError;
use ets_simulator_core_rs::models::{FacilitySpec, MacStep, Sector};
use ets_simulator_core_rs::monte_carlo::{Metric, MonteCarloError};
use ets_simulator_core_rs::orchestrator::{run_with, SimulationConfig};
use ets_simulator_core_rs::rng::derive_seed;
use ets_simulator_core_rs::scenario::{RosterConfig, StochasticParams};
use ets_simulator_core_rs::{
    run_monte_carlo, CapitalState, Facility, MonteCarloConfig, Population, Scenario,
};

fn population() -> Population {
    RosterConfig::default().build().unwrap()
}

fn short_strict() -> Scenario {
    Scenario::strict_ets().with_horizon(2025, 2030)
}

fn config(repetitions: usize) -> MonteCarloConfig {
    MonteCarloConfig {
        repetitions,
        ..MonteCarloConfig::default()
    }
}

#[test]
fn test_zero_variance_collapses_bands() {
    let mc = MonteCarloConfig {
        stochastic: StochasticParams::none(),
        ..config(100)
    };
    let summary = run_monte_carlo(&short_strict(), &population(), &mc).unwrap();

    assert_eq!(summary.successful, 100);
    assert!(summary.failures.is_empty());
    assert_eq!(summary.series.len(), Metric::ALL.len());
    for series in &summary.series {
        assert_eq!(series.bands.len(), 6);
        for band in &series.bands {
            assert_eq!(band.p5, band.p50, "{:?} {}", series.metric, band.year);
            assert_eq!(band.p50, band.p95, "{:?} {}", series.metric, band.year);
            assert!((band.mean - band.p50).abs() <= 1e-9 * band.p50.abs().max(1.0));
        }
    }

    // Every repetition traced the same events
    let first = &summary.trace_digests[0];
    assert!(summary.trace_digests.iter().all(|d| d == first));
}

#[test]
fn test_parallel_matches_sequential() {
    let parallel = run_monte_carlo(&short_strict(), &population(), &config(24)).unwrap();
    let sequential = run_monte_carlo(
        &short_strict(),
        &population(),
        &MonteCarloConfig {
            parallel: false,
            ..config(24)
        },
    )
    .unwrap();

    assert_eq!(parallel.series, sequential.series);
    assert_eq!(parallel.trace_digests, sequential.trace_digests);
    assert_eq!(parallel.config_hash, sequential.config_hash);
}

#[test]
fn test_repetition_runs_in_isolation() {
    let mc = config(8);
    let summary = run_monte_carlo(&short_strict(), &population(), &mc).unwrap();

    let seed = derive_seed(42, 3);
    assert_eq!(mc.repetition_seed(3), seed);

    let solo = run_with(SimulationConfig {
        scenario: short_strict(),
        population: population(),
        rng_seed: seed,
        stochastic: mc.stochastic.clone(),
    })
    .unwrap();
    assert_eq!(solo.trace_digest, summary.trace_digests[3]);
}

#[test]
fn test_stochastic_batch_spreads_bands() {
    let summary = run_monte_carlo(&short_strict(), &population(), &config(40)).unwrap();

    let price = summary.band(Metric::ClearingPrice, 2025).unwrap();
    assert!(price.p5 < price.p95);

    for series in &summary.series {
        for band in &series.bands {
            assert!(band.p5 <= band.p50 && band.p50 <= band.p95);
        }
    }
    // Prices stay inside the scheme's bounds in every repetition
    for band in &summary.series(Metric::ClearingPrice).unwrap().bands {
        assert!(band.p5 >= 0.0 && band.p95 <= 90.0);
    }
}

#[test]
fn test_different_seeds_different_batches() {
    let a = run_monte_carlo(&short_strict(), &population(), &config(10)).unwrap();
    let b = run_monte_carlo(
        &short_strict(),
        &population(),
        &MonteCarloConfig {
            seed: 7,
            ..config(10)
        },
    )
    .unwrap();
    assert_ne!(a.trace_digests, b.trace_digests);
    assert_ne!(a.config_hash, b.config_hash);
}

// ============================================================================
// Configuration limits
// ============================================================================

#[test]
fn test_zero_repetitions_rejected() {
    let err = run_monte_carlo(&short_strict(), &population(), &config(0)).unwrap_err();
    assert!(matches!(
        err,
        MonteCarloError::Configuration(ConfigurationError::InvalidParameter { .. })
    ));
}

#[test]
fn test_iteration_limit() {
    let scenario = Scenario::strict_ets().with_horizon(2025, 2224);
    let mc = config(10_000);
    assert_eq!(
        mc.validate(&scenario),
        Err(ConfigurationError::IterationLimitExceeded {
            years: 200,
            repetitions: 10_000,
            limit: 1_000_000,
        })
    );

    assert!(config(5_000).validate(&scenario).is_ok());
}

#[test]
fn test_too_many_repetitions_rejected() {
    let scenario = Scenario::strict_ets().with_horizon(2025, 2025);
    assert!(config(10_001).validate(&scenario).is_err());
}

#[test]
fn test_invalid_scenario_rejected_before_running() {
    let scenario = Scenario {
        border_carbon_price: -1.0,
        ..short_strict()
    };
    let err = run_monte_carlo(&scenario, &population(), &config(4)).unwrap_err();
    assert!(matches!(
        err,
        MonteCarloError::Configuration(ConfigurationError::NegativeBorderCarbonPrice(_))
    ));
}

// ============================================================================
// Failed repetitions
// ============================================================================

fn poisoned_population() -> Population {
    let healthy = Facility::new(FacilitySpec {
        id: "BROKEN-001".to_string(),
        sector: Sector::Energy,
        emissions: 1.0,
        mac: vec![MacStep::new(10.0, 0.2)],
        cost_limit: 100.0,
        capex_multiple: 7.5,
        conversion_years: 3,
        export: None,
        capital_state: CapitalState::Dirty,
        subsidy_driven: false,
    })
    .unwrap();
    let mut value = serde_json::to_value(&healthy).unwrap();
    value["capital_state"] = serde_json::json!("Converting");
    value["conversion"] = serde_json::json!({
        "years_remaining": 2,
        "step_index": 0,
        "post_conversion_emissions": -1.0
    });
    let broken: Facility = serde_json::from_value(value).unwrap();

    let base = population();
    let mut facilities = base.facilities;
    facilities.push(broken);
    Population::new(facilities, base.households).unwrap()
}

#[test]
fn test_all_repetitions_failing() {
    let mc = MonteCarloConfig {
        stochastic: StochasticParams::none(),
        ..config(4)
    };
    let err = run_monte_carlo(&short_strict(), &poisoned_population(), &mc).unwrap_err();
    assert!(matches!(err, MonteCarloError::NoSuccessfulRepetitions));
}
