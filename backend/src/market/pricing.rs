//! Price formation
//!
//! A one-step heuristic, not an equilibrium solve. Demand for permits
//! (facility emissions this tick plus household emissions from the previous
//! tick) is compared with the cap:
//!
//! ```text
//! ratio = demand / cap
//! ratio > 1: price rises with the excess ratio toward the ceiling
//! ratio ≤ 1: price decays toward the floor
//! ```
//!
//! The result is always clamped to `[floor, ceiling]`, with the ceiling (the
//! border-carbon price) winning when the two cross.

use crate::error::ConfigurationError;
use crate::scenario::non_negative;
use serde::{Deserialize, Serialize};

/// Price floor and ceiling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBounds {
    pub floor: f64,
    pub ceiling: f64,
}

impl PriceBounds {
    pub fn new(floor: f64, ceiling: f64) -> Self {
        Self { floor, ceiling }
    }

    /// Clamp into bounds. The ceiling is applied last; NaN maps to the floor.
    pub fn clamp(&self, price: f64) -> f64 {
        price.max(self.floor).min(self.ceiling).max(0.0)
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= 0.0 && price <= self.ceiling.max(0.0)
    }
}

/// Tunable clearing rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PriceFormation {
    /// Above the cap: `p + min(sensitivity × (ratio − 1), 1) × (ceiling − p)`
    /// from `p = max(previous, floor)`.
    /// Below the cap: `p − decay × (p − floor)`.
    ProportionalExcess { sensitivity: f64, decay: f64 },

    /// Above the cap: `floor × ratio²`. Below: `floor × √ratio`.
    /// Memoryless; needs a positive floor to move at all.
    QuadraticRatio,
}

impl Default for PriceFormation {
    fn default() -> Self {
        PriceFormation::ProportionalExcess {
            sensitivity: 1.0,
            decay: 0.25,
        }
    }
}

impl PriceFormation {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match *self {
            PriceFormation::ProportionalExcess { sensitivity, decay } => {
                non_negative("price_formation.sensitivity", sensitivity)?;
                if !(0.0..=1.0).contains(&decay) {
                    return Err(ConfigurationError::invalid(
                        "price_formation.decay",
                        format!("must lie in [0, 1], got {}", decay),
                    ));
                }
                Ok(())
            }
            PriceFormation::QuadraticRatio => Ok(()),
        }
    }

    /// Unclamped next price.
    ///
    /// A zero cap with positive demand saturates at the ceiling.
    pub fn next_price(&self, previous: f64, demand: f64, cap: f64, bounds: &PriceBounds) -> f64 {
        let ratio = if cap > 0.0 {
            demand / cap
        } else if demand > 0.0 {
            return bounds.ceiling;
        } else {
            0.0
        };

        match *self {
            PriceFormation::ProportionalExcess { sensitivity, decay } => {
                if ratio > 1.0 {
                    let base = previous.max(bounds.floor);
                    let pull = (sensitivity * (ratio - 1.0)).min(1.0);
                    base + pull * (bounds.ceiling - base).max(0.0)
                } else {
                    previous - decay * (previous - bounds.floor)
                }
            }
            PriceFormation::QuadraticRatio => {
                if ratio > 1.0 {
                    bounds.floor * ratio * ratio
                } else {
                    bounds.floor * ratio.sqrt()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: PriceBounds = PriceBounds {
        floor: 20.0,
        ceiling: 90.0,
    };

    #[test]
    fn test_excess_moves_toward_ceiling() {
        let rule = PriceFormation::default();
        // 10% excess pulls 10% of the way from 40 to 90
        let p = rule.next_price(40.0, 110.0, 100.0, &BOUNDS);
        assert!((p - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_surplus_decays_toward_floor() {
        let rule = PriceFormation::default();
        let p = rule.next_price(60.0, 80.0, 100.0, &BOUNDS);
        assert_eq!(p, 50.0);
    }

    #[test]
    fn test_zero_cap_saturates() {
        let rule = PriceFormation::default();
        assert_eq!(rule.next_price(30.0, 5.0, 0.0, &BOUNDS), 90.0);
        assert_eq!(rule.next_price(30.0, 0.0, 0.0, &BOUNDS), 27.5);
    }

    #[test]
    fn test_quadratic_ratio_matches_source_rule() {
        let rule = PriceFormation::QuadraticRatio;
        assert_eq!(rule.next_price(0.0, 150.0, 100.0, &BOUNDS), 45.0);
        assert_eq!(rule.next_price(0.0, 25.0, 100.0, &BOUNDS), 10.0);
    }

    #[test]
    fn test_ceiling_wins_over_floor() {
        let bounds = PriceBounds::new(20.0, 0.0);
        assert_eq!(bounds.clamp(50.0), 0.0);
        assert_eq!(bounds.clamp(f64::NAN), 0.0);
    }
}
