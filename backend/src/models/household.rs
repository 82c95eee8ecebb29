//! Household demand segments
//!
//! A segment aggregates many households of one income group. It has no
//! individual identity: each tick it observes the published price and
//! updates its demand with a constant-elasticity response. The resulting
//! emissions feed the next tick's market clearing (one-tick lag).

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};

/// Input record for one household segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseholdSpec {
    pub id: String,
    /// Demand at the reference price (index units)
    pub baseline_demand: f64,
    /// Price elasticity magnitude (0.4 means a 1% price rise cuts demand ~0.4%)
    pub elasticity: f64,
    /// Price at which demand equals baseline ($/t)
    pub reference_price: f64,
    /// Emissions per unit of demand (Mt per index unit)
    pub emission_intensity: f64,
}

/// Price-elastic household segment
///
/// # Example
/// ```
/// use ets_simulator_core_rs::models::{HouseholdSegment, HouseholdSpec};
///
/// let mut segment = HouseholdSegment::new(HouseholdSpec {
///     id: "HH-LOW".to_string(),
///     baseline_demand: 100.0,
///     elasticity: 0.6,
///     reference_price: 50.0,
///     emission_intensity: 0.02,
/// })
/// .unwrap();
///
/// assert_eq!(segment.respond(0.0), 100.0);
/// assert_eq!(segment.respond(50.0), 100.0);
/// assert!(segment.respond(100.0) < 100.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseholdSegment {
    id: String,
    baseline_demand: f64,
    elasticity: f64,
    reference_price: f64,
    emission_intensity: f64,
    current_demand: f64,
}

impl HouseholdSegment {
    pub fn new(spec: HouseholdSpec) -> Result<Self, ConfigurationError> {
        let field = |name: &str, value: f64, positive: bool| {
            let ok = value.is_finite() && if positive { value > 0.0 } else { value >= 0.0 };
            if ok {
                Ok(())
            } else {
                Err(ConfigurationError::invalid(
                    name,
                    format!("{} has value {}", spec.id, value),
                ))
            }
        };
        field("household.baseline_demand", spec.baseline_demand, false)?;
        field("household.elasticity", spec.elasticity, false)?;
        field("household.reference_price", spec.reference_price, true)?;
        field("household.emission_intensity", spec.emission_intensity, false)?;

        Ok(Self {
            id: spec.id,
            baseline_demand: spec.baseline_demand,
            elasticity: spec.elasticity,
            reference_price: spec.reference_price,
            emission_intensity: spec.emission_intensity,
            current_demand: spec.baseline_demand,
        })
    }

    /// Demand at `price`: `baseline × (price / reference)^(-elasticity)`.
    ///
    /// A zero (pre-scheme) price leaves demand at baseline. Updates the
    /// segment's current demand and returns it.
    pub fn respond(&mut self, price: f64) -> f64 {
        self.current_demand = demand_at(
            self.baseline_demand,
            self.elasticity,
            self.reference_price,
            price,
        );
        self.current_demand
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn baseline_demand(&self) -> f64 {
        self.baseline_demand
    }

    pub fn elasticity(&self) -> f64 {
        self.elasticity
    }

    pub fn reference_price(&self) -> f64 {
        self.reference_price
    }

    pub fn current_demand(&self) -> f64 {
        self.current_demand
    }

    /// Emissions implied by current demand.
    pub fn emissions(&self) -> f64 {
        self.current_demand * self.emission_intensity
    }
}

/// Constant-elasticity demand curve.
pub fn demand_at(baseline: f64, elasticity: f64, reference_price: f64, price: f64) -> f64 {
    if price <= 0.0 {
        return baseline;
    }
    baseline * (price / reference_price).powf(-elasticity)
}
