//! Property-based tests for model invariants.
//!
//! Cap monotonicity, price bounds, valuation and demand monotonicity and
//! the closed-state rules must hold for all inputs, not just the presets.

use ets_simulator_core_rs::error::Invariant;
use ets_simulator_core_rs::market::{AggregatedActions, MarketOperator};
use ets_simulator_core_rs::models::household::demand_at;
use ets_simulator_core_rs::models::{FacilitySpec, MacStep, Sector};
use ets_simulator_core_rs::monte_carlo::band;
use ets_simulator_core_rs::policy::{decide, npv, Action, TickContext};
use ets_simulator_core_rs::{CapitalState, Facility, RngManager, Scenario, SimulationError};
use proptest::prelude::*;
use std::collections::HashSet;

fn live_scenario(rate: f64, floor: f64, ceiling: f64) -> Scenario {
    Scenario {
        cap_reduction_rate: rate,
        price_floor: floor,
        border_carbon_price: ceiling,
        ets_start_year: None,
        ..Scenario::strict_ets()
    }
}

fn facility(emissions: f64, mut costs: Vec<f64>, cost_limit: f64, state: CapitalState) -> Facility {
    costs.sort_by(|a, b| a.total_cmp(b));
    Facility::new(FacilitySpec {
        id: "PROP-001".to_string(),
        sector: Sector::Industry,
        emissions,
        mac: costs
            .into_iter()
            .map(|c| MacStep::new(c, 0.1 * emissions))
            .collect(),
        cost_limit,
        capex_multiple: 8.0,
        conversion_years: 3,
        export: None,
        capital_state: state,
        subsidy_driven: false,
    })
    .unwrap()
}

// ============================================================================
// Market
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: the cap never rises and the price stays in [0, ceiling].
    #[test]
    fn prop_cap_and_price_bounded(
        rate in 0.0f64..=1.0,
        floor in 0.0f64..100.0,
        ceiling in 0.0f64..200.0,
        noise in 0.0f64..0.5,
        seed in any::<u64>(),
        demands in prop::collection::vec(0.0f64..400.0, 1..15),
    ) {
        let scenario = live_scenario(rate, floor, ceiling);
        let mut op = MarketOperator::new(&scenario, RngManager::new(seed), noise);

        let mut previous_cap = f64::INFINITY;
        for (i, demand) in demands.iter().enumerate() {
            let year = 2025 + i as u32;
            op.open_year(year).unwrap();
            let actions = AggregatedActions {
                facility_emissions: *demand,
                ..Default::default()
            };
            let outcome = op.advance_year(year, &actions).unwrap();

            prop_assert!(outcome.cap <= previous_cap);
            prop_assert!(outcome.new_cap <= outcome.cap);
            prop_assert!(outcome.new_cap >= 0.0);
            prop_assert!(outcome.clearing_price >= 0.0);
            prop_assert!(outcome.clearing_price <= ceiling);
            previous_cap = outcome.cap;
        }
    }

    /// Property: same seed and inputs give the same price path.
    #[test]
    fn prop_market_deterministic(
        seed in any::<u64>(),
        demands in prop::collection::vec(50.0f64..250.0, 1..10),
    ) {
        let scenario = live_scenario(0.04, 20.0, 90.0);
        let path = |seed: u64| {
            let mut op = MarketOperator::new(&scenario, RngManager::new(seed), 0.2);
            demands
                .iter()
                .enumerate()
                .map(|(i, d)| {
                    let year = 2025 + i as u32;
                    op.open_year(year).unwrap();
                    let actions = AggregatedActions {
                        facility_emissions: *d,
                        ..Default::default()
                    };
                    op.advance_year(year, &actions).unwrap().clearing_price
                })
                .collect::<Vec<_>>()
        };
        prop_assert_eq!(path(seed), path(seed));
    }
}

// ============================================================================
// Valuation and demand
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Property: with a positive abatable quantity, NPV strictly rises
    /// with the carbon price.
    #[test]
    fn prop_npv_increasing_in_price(
        capital in 0.0f64..500.0,
        quantity in 0.01f64..5.0,
        low in 0.0f64..200.0,
        delta in 0.01f64..100.0,
        uplift in 0.0f64..50.0,
    ) {
        let cheap = TickContext::new(2030, 100.0, low, 200.0);
        let dear = TickContext::new(2030, 100.0, low + delta, 200.0);
        prop_assert!(npv(capital, quantity, &dear, uplift) > npv(capital, quantity, &cheap, uplift));
    }

    /// Property: a band over identical values collapses to that value.
    #[test]
    fn prop_zero_variance_band_is_exact(
        x in -1.0e6f64..1.0e6,
        n in 1usize..300,
    ) {
        let b = band(2030, &vec![x; n]);
        prop_assert_eq!(b.p5, x);
        prop_assert_eq!(b.p50, x);
        prop_assert_eq!(b.p95, x);
    }

    /// Property: household demand never rises with a positive price.
    #[test]
    fn prop_demand_non_increasing(
        baseline in 1.0f64..1000.0,
        elasticity in 0.0f64..2.0,
        reference in 1.0f64..100.0,
        low in 1.0f64..200.0,
        delta in 0.0f64..200.0,
    ) {
        let before = demand_at(baseline, elasticity, reference, low);
        let after = demand_at(baseline, elasticity, reference, low + delta);
        prop_assert!(after <= before * (1.0 + 1e-12));
        prop_assert!(after >= 0.0);
    }
}

// ============================================================================
// Facility decisions
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Property: a closed facility never decides and never emits.
    #[test]
    fn prop_closed_is_terminal(
        price in 0.0f64..200.0,
        year in 2025u32..2100,
    ) {
        let mut f = facility(1.0, vec![10.0], 1.0, CapitalState::Closed);
        let ctx = TickContext::new(year, 100.0, price, 200.0);

        match decide(&mut f, &ctx) {
            Err(SimulationError::InvariantViolation { invariant, .. }) => {
                prop_assert_eq!(invariant, Invariant::NoDecisionWhenClosed);
            }
            _ => prop_assert!(false, "closed facility produced a decision"),
        }
        prop_assert_eq!(f.emissions(), 0.0);
        prop_assert!(f.is_closed());
    }

    /// Property: an unforced investment only happens above the MAC cost,
    /// and a closure only when the carbon bill exceeds the limit.
    #[test]
    fn prop_decision_respects_thresholds(
        emissions in 0.1f64..10.0,
        costs in prop::collection::vec(-20.0f64..150.0, 1..4),
        cost_limit in 0.0f64..1000.0,
        price in 0.0f64..150.0,
    ) {
        let mut f = facility(emissions, costs, cost_limit, CapitalState::Dirty);
        let ctx = TickContext::new(2030, 100.0, price, 150.0);
        let decision = decide(&mut f, &ctx).unwrap();

        match decision.action {
            Action::Invest => {
                prop_assert!(!decision.forced);
                prop_assert!(decision.mac_cost.map_or(false, |c| price > c));
                prop_assert!(decision.npv.map_or(false, |v| v > 0.0));
                prop_assert_eq!(f.capital_state(), CapitalState::Converting);
            }
            Action::Close => {
                prop_assert!(decision.carbon_cost > cost_limit);
                prop_assert_eq!(f.emissions(), 0.0);
            }
            Action::Hold => {
                prop_assert!(decision.carbon_cost <= cost_limit);
                prop_assert_eq!(f.capital_state(), CapitalState::Dirty);
            }
        }
    }
}

// ============================================================================
// Sampling
// ============================================================================

proptest! {
    /// Property: audit samples are distinct and in range.
    #[test]
    fn prop_sample_indices_distinct(
        seed in any::<u64>(),
        n in 0usize..300,
        k in 0usize..400,
    ) {
        let mut rng = RngManager::new(seed);
        let sample = rng.sample_indices(n, k);

        prop_assert_eq!(sample.len(), k.min(n));
        prop_assert!(sample.iter().all(|&i| i < n));
        let unique: HashSet<_> = sample.iter().collect();
        prop_assert_eq!(unique.len(), sample.len());
    }
}
