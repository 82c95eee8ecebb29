//! Marginal abatement cost curves
//!
//! A MAC curve is an ordered list of abatement measures, each with a cost
//! per tonne avoided and the quantity it avoids. Costs are non-decreasing
//! along the curve, so a facility always works through its cheapest
//! measures first. Curves are immutable input data; the facility only
//! tracks how far along its curve it has progressed.
//!
//! Inventory data may contain gaps. A step whose cost or quantity is not a
//! finite number is accepted at load time and surfaces as a
//! [`DataGapError`] when a decision actually needs it.

use crate::error::{ConfigurationError, DataGapError};
use serde::{Deserialize, Serialize};

/// One abatement measure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacStep {
    /// Cost per tonne avoided ($/t). May be negative (no-regret measures).
    pub cost: f64,
    /// Emissions avoided once the measure is in place (Mt/yr)
    pub quantity: f64,
}

impl MacStep {
    pub fn new(cost: f64, quantity: f64) -> Self {
        Self { cost, quantity }
    }

    fn is_usable(&self) -> bool {
        self.cost.is_finite() && self.quantity.is_finite() && self.quantity > 0.0
    }
}

/// Non-decreasing marginal abatement cost curve
///
/// # Example
/// ```
/// use ets_simulator_core_rs::models::{MacCurve, MacStep};
///
/// let curve = MacCurve::new(
///     "ENE-001",
///     vec![MacStep::new(-15.0, 0.25), MacStep::new(35.0, 0.5)],
/// )
/// .unwrap();
/// assert_eq!(curve.len(), 2);
/// assert_eq!(curve.total_quantity(), 0.75);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MacCurve {
    steps: Vec<MacStep>,
}

impl MacCurve {
    /// Validate and build a curve.
    ///
    /// Usable steps must be non-decreasing in cost and have non-negative
    /// quantity. Steps with non-finite data are kept as gaps.
    pub fn new(facility_id: &str, steps: Vec<MacStep>) -> Result<Self, ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::InvalidMacCurve {
            facility_id: facility_id.to_string(),
            reason,
        };

        let mut last_cost: Option<f64> = None;
        for (i, step) in steps.iter().enumerate() {
            if step.quantity.is_finite() && step.quantity < 0.0 {
                return Err(invalid(format!("step {} has negative quantity", i)));
            }
            if !step.cost.is_finite() {
                continue;
            }
            if let Some(prev) = last_cost {
                if step.cost < prev {
                    return Err(invalid(format!(
                        "step {} cost {} is below previous cost {}",
                        i, step.cost, prev
                    )));
                }
            }
            last_cost = Some(step.cost);
        }

        Ok(Self { steps })
    }

    /// Curve with no measures at all.
    pub fn empty() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[MacStep] {
        &self.steps
    }

    /// Sum of all usable quantities.
    pub fn total_quantity(&self) -> f64 {
        self.steps
            .iter()
            .filter(|s| s.is_usable())
            .map(|s| s.quantity)
            .sum()
    }

    /// Measure at position `index` on the curve.
    ///
    /// * `Ok(Some(step))` - usable measure
    /// * `Ok(None)` - curve fully worked through, nothing left to abate
    /// * `Err(DataGapError)` - curve is empty, or the entry at `index` is unusable
    pub fn step_at(&self, facility_id: &str, index: usize) -> Result<Option<MacStep>, DataGapError> {
        if self.steps.is_empty() {
            return Err(DataGapError::EmptyCurve {
                facility_id: facility_id.to_string(),
            });
        }
        match self.steps.get(index) {
            None => Ok(None),
            Some(step) if step.is_usable() => Ok(Some(*step)),
            Some(_) => Err(DataGapError::MissingStep {
                facility_id: facility_id.to_string(),
                step: index,
            }),
        }
    }

    /// Scale every cost by one positive factor.
    ///
    /// A single factor per curve keeps the ordering intact.
    pub fn scaled(&self, factor: f64) -> Self {
        debug_assert!(factor > 0.0, "MAC scale factor must be positive");
        Self {
            steps: self
                .steps
                .iter()
                .map(|s| MacStep::new(s.cost * factor, s.quantity))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_decreasing_costs() {
        let result = MacCurve::new(
            "F1",
            vec![MacStep::new(30.0, 0.1), MacStep::new(10.0, 0.2)],
        );
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidMacCurve { .. })
        ));
    }

    #[test]
    fn test_gap_entries_skip_ordering_check() {
        let curve = MacCurve::new(
            "F1",
            vec![
                MacStep::new(10.0, 0.1),
                MacStep::new(f64::NAN, 0.2),
                MacStep::new(20.0, 0.1),
            ],
        )
        .unwrap();
        assert!(curve.step_at("F1", 1).is_err());
        assert_eq!(curve.step_at("F1", 2).unwrap().unwrap().cost, 20.0);
    }

    #[test]
    fn test_scaled_negative_costs_keep_order() {
        let curve = MacCurve::new(
            "F1",
            vec![MacStep::new(-15.0, 0.1), MacStep::new(35.0, 0.2)],
        )
        .unwrap();
        let scaled = curve.scaled(1.5);
        assert_eq!(scaled.steps()[0].cost, -22.5);
        assert_eq!(scaled.steps()[1].cost, 52.5);
        assert!(MacCurve::new("F1", scaled.steps().to_vec()).is_ok());
    }
}
