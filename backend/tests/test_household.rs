//! Tests for household segments
//!
//! Constant-elasticity demand against the published carbon price.

use ets_simulator_core_rs::models::household::demand_at;
use ets_simulator_core_rs::models::{HouseholdSegment, HouseholdSpec};
use ets_simulator_core_rs::policy::{Agent, AgentKind, StepOutcome, TickContext, YearlyStep};
use ets_simulator_core_rs::scenario::RosterConfig;

fn segment(elasticity: f64) -> HouseholdSegment {
    HouseholdSegment::new(HouseholdSpec {
        id: "HH-MID".to_string(),
        baseline_demand: 100.0,
        elasticity,
        reference_price: 50.0,
        emission_intensity: 0.03,
    })
    .unwrap()
}

#[test]
fn test_demand_at_reference_price_is_baseline() {
    assert_eq!(demand_at(100.0, 0.4, 50.0, 50.0), 100.0);
}

#[test]
fn test_zero_price_keeps_baseline() {
    assert_eq!(demand_at(100.0, 0.4, 50.0, 0.0), 100.0);
}

#[test]
fn test_doubling_price_follows_elasticity() {
    let d = demand_at(100.0, 0.5, 50.0, 100.0);
    assert!((d - 100.0 / 2f64.sqrt()).abs() < 1e-9);
}

#[test]
fn test_zero_elasticity_is_inelastic() {
    let mut s = segment(0.0);
    assert_eq!(s.respond(90.0), 100.0);
}

#[test]
fn test_more_elastic_segment_cuts_more() {
    let mut low = segment(0.25);
    let mut high = segment(0.6);
    assert!(high.respond(80.0) < low.respond(80.0));
}

#[test]
fn test_respond_updates_emissions() {
    let mut s = segment(0.4);
    assert!((s.emissions() - 3.0).abs() < 1e-12);

    let demand = s.respond(80.0);
    assert_eq!(s.current_demand(), demand);
    assert!((s.emissions() - demand * 0.03).abs() < 1e-12);
    assert!(s.emissions() < 3.0);
}

#[test]
fn test_invalid_segment_rejected() {
    let spec = HouseholdSpec {
        id: "HH-BAD".to_string(),
        baseline_demand: 100.0,
        elasticity: 0.4,
        reference_price: 0.0,
        emission_intensity: 0.03,
    };
    assert!(HouseholdSegment::new(spec).is_err());
}

#[test]
fn test_yearly_step_reports_demand_and_emissions() {
    let mut s = segment(0.4);
    assert_eq!(s.agent_id(), "HH-MID");
    assert_eq!(s.kind(), AgentKind::Household);

    let outcome = s.step(&TickContext::new(2030, 100.0, 50.0, 90.0)).unwrap();
    match outcome {
        StepOutcome::Household { demand, emissions } => {
            assert_eq!(demand, 100.0);
            assert!((emissions - 3.0).abs() < 1e-12);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_default_segments() {
    let population = RosterConfig::default().build().unwrap();
    let ids: Vec<&str> = population.households.iter().map(|h| h.id()).collect();
    assert_eq!(ids, vec!["HH-LOW", "HH-MID", "HH-HIGH"]);

    let total: f64 = population.households.iter().map(|h| h.emissions()).sum();
    assert!((total - 9.0).abs() < 1e-9);
}
