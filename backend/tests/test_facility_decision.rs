//! Tests for the facility decision rule
//!
//! Covers the three ordered stages (MAC comparison, NPV evaluation,
//! closure threshold), exporter border costs, conversion countdown and
//! degraded decisions on MAC data gaps.

use ets_simulator_core_rs::error::{DataGapError, Invariant};
use ets_simulator_core_rs::models::{
    CapitalState, ConversionProgress, ExportExposure, Facility, FacilitySpec, MacStep, Sector,
};
use ets_simulator_core_rs::policy::valuation::annuity_factor;
use ets_simulator_core_rs::policy::{
    Action, Agent, AgentKind, PricePath, StepOutcome, TickContext, YearlyStep,
};
use ets_simulator_core_rs::SimulationError;
use std::collections::BTreeMap;

/// 1 Mt/yr facility, capex multiple 8, three-year conversions
fn facility_with(mac: Vec<MacStep>, cost_limit: f64) -> Facility {
    Facility::new(FacilitySpec {
        id: "IND-001".to_string(),
        sector: Sector::Industry,
        emissions: 1.0,
        mac,
        cost_limit,
        capex_multiple: 8.0,
        conversion_years: 3,
        export: None,
        capital_state: CapitalState::Dirty,
        subsidy_driven: false,
    })
    .unwrap()
}

fn exporter(fraction: f64, border_price_reference: Option<f64>) -> Facility {
    Facility::new(FacilitySpec {
        id: "EXP-001".to_string(),
        sector: Sector::Industry,
        emissions: 1.0,
        mac: vec![MacStep::new(25.0, 0.2)],
        cost_limit: 1000.0,
        capex_multiple: 8.0,
        conversion_years: 4,
        export: Some(ExportExposure {
            fraction,
            border_price_reference,
        }),
        capital_state: CapitalState::Dirty,
        subsidy_driven: false,
    })
    .unwrap()
}

fn ctx(price: f64) -> TickContext {
    TickContext::new(2030, 100.0, price, 90.0)
}

// ============================================================================
// Stage 1: MAC comparison
// ============================================================================

#[test]
fn test_price_below_mac_holds() {
    let mut f = facility_with(vec![MacStep::new(50.0, 0.2)], 1000.0);
    let d = f.decide(&ctx(40.0)).unwrap();

    assert_eq!(d.action, Action::Hold);
    assert_eq!(d.mac_cost, Some(50.0));
    assert_eq!(d.npv, None);
    assert_eq!(f.capital_state(), CapitalState::Dirty);
}

#[test]
fn test_negative_mac_at_zero_price_holds() {
    // NPV of a free measure at a zero price is exactly 0, not positive
    let mut f = facility_with(vec![MacStep::new(-15.0, 0.1)], 1000.0);
    let d = f.decide(&ctx(0.0)).unwrap();

    assert_eq!(d.action, Action::Hold);
    assert_eq!(d.npv, Some(0.0));
}

// ============================================================================
// Stage 2: NPV evaluation
// ============================================================================

#[test]
fn test_positive_npv_invests() {
    // Capital: 25 × 0.2 × 8 = 40 M$; savings 0.2 × 60 per year over 10 years
    let mut f = facility_with(vec![MacStep::new(25.0, 0.2)], 1000.0);
    let d = f.decide(&ctx(60.0)).unwrap();

    assert_eq!(d.action, Action::Invest);
    assert!(!d.forced);
    assert_eq!(d.capital_cost, 40.0);
    let expected = 0.2 * 60.0 * annuity_factor() - 40.0;
    assert!((d.npv.unwrap() - expected).abs() < 1e-9);

    assert_eq!(f.capital_state(), CapitalState::Converting);
    assert_eq!(f.years_remaining(), Some(3));
    // Emissions only fall when the conversion completes
    assert_eq!(f.emissions(), 1.0);
}

#[test]
fn test_negative_npv_holds() {
    // Capital 55 × 0.2 × 8 = 88 M$ exceeds ~80.5 M$ of discounted savings
    let mut f = facility_with(vec![MacStep::new(55.0, 0.2)], 1000.0);
    let d = f.decide(&ctx(60.0)).unwrap();

    assert_eq!(d.action, Action::Hold);
    assert!(d.npv.unwrap() < 0.0);
    assert_eq!(f.capital_state(), CapitalState::Dirty);
}

#[test]
fn test_subsidy_turns_npv_positive() {
    let mut f = facility_with(vec![MacStep::new(55.0, 0.2)], 1000.0);
    let d = f.decide(&ctx(60.0).with_subsidy_rate(0.6)).unwrap();

    assert_eq!(d.action, Action::Invest);
    // Reported capital cost stays gross; the operator pays the subsidy share
    assert_eq!(d.capital_cost, 88.0);
    assert!(d.npv.unwrap() > 0.0);
}

// ============================================================================
// Subsidy-driven facilities
// ============================================================================

fn farm(subsidy_driven: bool) -> Facility {
    // Capital 40 × 0.2 × 9 = 72 M$, pool must hold 43.2 M$
    Facility::new(FacilitySpec {
        id: "AGR-001".to_string(),
        sector: Sector::Agriculture,
        emissions: 1.0,
        mac: vec![MacStep::new(40.0, 0.2)],
        cost_limit: 999.0,
        capex_multiple: 9.0,
        conversion_years: 5,
        export: None,
        capital_state: CapitalState::Dirty,
        subsidy_driven,
    })
    .unwrap()
}

#[test]
fn test_funded_pool_triggers_investment_without_carbon_price() {
    let mut f = farm(true);
    let d = f.decide(&ctx(0.0).with_subsidy_rate(0.6).with_subsidy_pool(50.0)).unwrap();

    assert_eq!(d.action, Action::Invest);
    assert_eq!(d.capital_cost, 72.0);
    // MAC and NPV stages never ran
    assert_eq!(d.npv, None);
    assert!(!d.forced);
    assert_eq!(f.capital_state(), CapitalState::Converting);
    assert_eq!(f.years_remaining(), Some(5));
}

#[test]
fn test_pool_exactly_at_coverage_is_enough() {
    let mut f = farm(true);
    let d = f.decide(&ctx(0.0).with_subsidy_pool(72.0 * 0.6)).unwrap();
    assert_eq!(d.action, Action::Invest);
}

#[test]
fn test_thin_pool_falls_back_to_price_stages() {
    let mut f = farm(true);
    let d = f.decide(&ctx(0.0).with_subsidy_rate(0.6).with_subsidy_pool(40.0)).unwrap();
    assert_eq!(d.action, Action::Hold);
    assert_eq!(f.capital_state(), CapitalState::Dirty);

    // Price above the MAC still reaches the NPV stage
    let d = f.decide(&ctx(80.0).with_subsidy_pool(40.0)).unwrap();
    assert!(d.npv.is_some());
    assert_eq!(d.action, Action::Invest);
}

#[test]
fn test_pool_ignored_by_price_driven_facility() {
    let mut f = farm(false);
    let d = f.decide(&ctx(0.0).with_subsidy_rate(0.6).with_subsidy_pool(500.0)).unwrap();
    assert_eq!(d.action, Action::Hold);
    assert_eq!(f.capital_state(), CapitalState::Dirty);
}

#[test]
fn test_empty_pool_never_triggers_investment() {
    let mut f = farm(true);
    let d = f.decide(&ctx(0.0)).unwrap();
    assert_eq!(d.action, Action::Hold);
}

#[test]
fn test_price_path_override_drives_npv() {
    let path: BTreeMap<u32, f64> = (2031..=2040).map(|y| (y, 0.0)).collect();
    let ctx = ctx(60.0).with_price_path(PricePath::from_override(Some(&path)));

    let mut f = facility_with(vec![MacStep::new(25.0, 0.2)], 1000.0);
    let d = f.decide(&ctx).unwrap();

    // Published price beats the MAC but the projected path is worthless
    assert_eq!(d.action, Action::Hold);
    assert_eq!(d.npv, Some(-40.0));
}

// ============================================================================
// Exporters
// ============================================================================

#[test]
fn test_exporter_faces_border_uplift() {
    let mut f = exporter(0.4, None);
    assert_eq!(f.kind(), AgentKind::ExporterFacility);

    // 10 + 0.4 × 90 = 46 $/t beats the 25 $/t measure
    let d = f.decide(&ctx(10.0)).unwrap();
    assert_eq!(d.effective_price, 46.0);
    assert_eq!(d.action, Action::Invest);
}

#[test]
fn test_domestic_twin_holds_at_same_price() {
    let mut f = facility_with(vec![MacStep::new(25.0, 0.2)], 1000.0);
    assert_eq!(f.kind(), AgentKind::Facility);

    let d = f.decide(&ctx(10.0)).unwrap();
    assert_eq!(d.effective_price, 10.0);
    assert_eq!(d.action, Action::Hold);
}

#[test]
fn test_exporter_reference_price_overrides_scenario() {
    let mut f = exporter(0.4, Some(50.0));
    let d = f.decide(&ctx(10.0)).unwrap();
    assert_eq!(d.effective_price, 30.0);
}

#[test]
fn test_zero_export_fraction_matches_domestic() {
    let mut f = exporter(0.0, None);
    let d = f.decide(&ctx(10.0)).unwrap();
    assert_eq!(d.effective_price, 10.0);
    assert_eq!(d.action, Action::Hold);
}

// ============================================================================
// Stage 3: closure threshold
// ============================================================================

#[test]
fn test_carbon_cost_above_limit_closes() {
    // Measure too expensive; 1 Mt × 60 $/t = 60 M$ > 50 M$
    let mut f = facility_with(vec![MacStep::new(80.0, 0.2)], 50.0);
    let d = f.decide(&ctx(60.0)).unwrap();

    assert_eq!(d.action, Action::Close);
    assert_eq!(d.carbon_cost, 60.0);
    assert_eq!(f.capital_state(), CapitalState::Closed);
    assert_eq!(f.emissions(), 0.0);
}

#[test]
fn test_free_allocation_relieves_closure() {
    let mut f = facility_with(vec![MacStep::new(80.0, 0.2)], 50.0);
    let d = f.decide(&ctx(60.0).with_free_allocation(0.5)).unwrap();

    assert_eq!(d.action, Action::Hold);
    assert_eq!(d.carbon_cost, 30.0);
}

#[test]
fn test_cost_at_limit_does_not_close() {
    let mut f = facility_with(vec![MacStep::new(80.0, 0.2)], 60.0);
    assert_eq!(f.decide(&ctx(60.0)).unwrap().action, Action::Hold);
}

#[test]
fn test_closed_facility_cannot_decide() {
    let mut f = facility_with(vec![MacStep::new(80.0, 0.2)], 50.0);
    f.decide(&ctx(60.0)).unwrap();
    assert!(f.is_closed());

    let err = f.decide(&ctx(60.0)).unwrap_err();
    match err {
        SimulationError::InvariantViolation {
            year, invariant, ..
        } => {
            assert_eq!(year, 2030);
            assert_eq!(invariant, Invariant::NoDecisionWhenClosed);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(f.emissions(), 0.0);
}

#[test]
fn test_facility_can_start_closed() {
    let f = Facility::new(FacilitySpec {
        id: "AGR-009".to_string(),
        sector: Sector::Agriculture,
        emissions: 0.4,
        mac: vec![MacStep::new(10.0, 0.1)],
        cost_limit: 100.0,
        capex_multiple: 9.0,
        conversion_years: 5,
        export: None,
        capital_state: CapitalState::Closed,
        subsidy_driven: false,
    })
    .unwrap();
    assert_eq!(f.emissions(), 0.0);
}

// ============================================================================
// Conversion lifecycle
// ============================================================================

#[test]
fn test_conversion_counts_down_then_cleans() {
    let mut f = facility_with(vec![MacStep::new(25.0, 0.2), MacStep::new(40.0, 0.3)], 1000.0);
    assert_eq!(f.decide(&ctx(60.0)).unwrap().action, Action::Invest);

    for remaining in [2, 1] {
        let d = f.decide(&ctx(60.0)).unwrap();
        assert_eq!(d.action, Action::Hold);
        assert_eq!(
            d.conversion,
            Some(ConversionProgress::InProgress {
                years_remaining: remaining
            })
        );
        assert_eq!(f.capital_state(), CapitalState::Converting);
        assert_eq!(f.emissions(), 1.0);
    }

    let d = f.decide(&ctx(60.0)).unwrap();
    match d.conversion {
        Some(ConversionProgress::Completed {
            emissions_before,
            emissions_after,
        }) => {
            assert_eq!(emissions_before, 1.0);
            assert!((emissions_after - 0.8).abs() < 1e-12);
        }
        other => panic!("expected completion, got {:?}", other),
    }
    assert_eq!(f.capital_state(), CapitalState::Clean);
    assert_eq!(f.next_step(), 1);
    assert_eq!(f.years_remaining(), None);
}

#[test]
fn test_clean_facility_invests_in_next_measure() {
    let mut f = facility_with(vec![MacStep::new(25.0, 0.2), MacStep::new(40.0, 0.3)], 1000.0);
    f.decide(&ctx(80.0)).unwrap();
    for _ in 0..3 {
        f.decide(&ctx(80.0)).unwrap();
    }
    assert_eq!(f.capital_state(), CapitalState::Clean);

    // 40 × 0.3 × 8 = 96 M$ against 0.3 × 80 × 6.71 ≈ 161 M$
    let d = f.decide(&ctx(80.0)).unwrap();
    assert_eq!(d.action, Action::Invest);
    assert_eq!(d.mac_cost, Some(40.0));
    assert_eq!(f.conversion().unwrap().step_index, 1);
}

#[test]
fn test_converting_facility_never_closes() {
    let mut f = facility_with(vec![MacStep::new(25.0, 0.2)], 70.0);
    assert_eq!(f.decide(&ctx(60.0)).unwrap().action, Action::Invest);

    // Price would breach the limit for a dirty facility
    let d = f.decide(&ctx(90.0)).unwrap();
    assert_eq!(d.action, Action::Hold);
    assert_eq!(f.capital_state(), CapitalState::Converting);
}

// ============================================================================
// Degraded decisions
// ============================================================================

#[test]
fn test_empty_curve_degrades_to_hold() {
    let mut f = facility_with(Vec::new(), 10.0);
    let d = f.decide(&ctx(60.0)).unwrap();

    assert_eq!(d.action, Action::Hold);
    assert!(d.is_degraded());
    assert_eq!(
        d.degraded,
        Some(DataGapError::EmptyCurve {
            facility_id: "IND-001".to_string()
        })
    );
    // Closure is not tested on a degraded tick
    assert_eq!(f.capital_state(), CapitalState::Dirty);
}

#[test]
fn test_missing_step_degrades_to_hold() {
    let mut f = facility_with(vec![MacStep::new(f64::NAN, 0.2)], 1000.0);
    let d = f.decide(&ctx(60.0)).unwrap();

    assert_eq!(d.action, Action::Hold);
    assert!(matches!(
        d.degraded,
        Some(DataGapError::MissingStep { step: 0, .. })
    ));
}

#[test]
fn test_exhausted_curve_holds_without_gap() {
    let mut f = facility_with(vec![MacStep::new(25.0, 0.2)], 1000.0);
    f.decide(&ctx(60.0)).unwrap();
    for _ in 0..3 {
        f.decide(&ctx(60.0)).unwrap();
    }

    let d = f.decide(&ctx(60.0)).unwrap();
    assert_eq!(d.action, Action::Hold);
    assert!(!d.is_degraded());
    assert_eq!(d.mac_cost, None);
}

// ============================================================================
// Agent trait
// ============================================================================

#[test]
fn test_yearly_step_wraps_decision() {
    let mut f = facility_with(vec![MacStep::new(25.0, 0.2)], 1000.0);
    assert_eq!(f.agent_id(), "IND-001");

    match f.step(&ctx(60.0)).unwrap() {
        StepOutcome::Facility(d) => assert_eq!(d.action, Action::Invest),
        other => panic!("unexpected outcome {:?}", other),
    }
}
