//! Scenario configuration
//!
//! A [`Scenario`] is the immutable policy bundle for one run: cap path,
//! subsidy budget, border-carbon price and horizon, plus the market and
//! enforcement settings that go with them. It is created once, validated
//! before the first tick, and never mutated. Monte Carlo repetitions layer
//! their perturbations on top through [`StochasticParams`] instead.
//!
//! # Presets
//!
//! | Name            | Cap cut/yr | Subsidy (M$/yr) | Border price ($/t) |
//! |-----------------|------------|-----------------|--------------------|
//! | `BAU`           | 0%         | 0               | 0                  |
//! | `Soft-ETS`      | 2%         | 30              | 60                 |
//! | `Strict-ETS`    | 4%         | 50              | 90                 |
//! | `ETS-Incentive` | 4%         | 150             | 90                 |
//!
//! # Example
//!
//! ```rust
//! use ets_simulator_core_rs::Scenario;
//!
//! let scenario = Scenario::preset("strict-ets").unwrap();
//! assert_eq!(scenario.cap_reduction_rate, 0.04);
//! assert!(scenario.validate().is_ok());
//! ```

use crate::error::ConfigurationError;
use crate::market::PriceFormation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod roster;
pub mod stochastic;

pub use roster::{RosterConfig, RosterSource, SectorProfile};
pub use stochastic::{RunDraw, StochasticParams};

/// Longest horizon a scenario may request
pub const MAX_HORIZON_YEARS: u32 = 200;

/// Most repetitions a Monte Carlo batch may request
pub const MAX_REPETITIONS: usize = 10_000;

/// Bound on years × repetitions for one batch
pub const MAX_ITERATIONS: usize = 1_000_000;

/// Inclusive range of simulated years
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Horizon {
    pub start_year: u32,
    pub end_year: u32,
}

impl Horizon {
    pub fn new(start_year: u32, end_year: u32) -> Self {
        Self {
            start_year,
            end_year,
        }
    }

    /// Number of ticks, 0 when the horizon is inverted.
    pub fn years(&self) -> u32 {
        if self.end_year < self.start_year {
            0
        } else {
            self.end_year - self.start_year + 1
        }
    }
}

impl Default for Horizon {
    fn default() -> Self {
        Self::new(2025, 2035)
    }
}

/// How permits enter the market
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AllocationRule {
    /// Permits are only handed out free (see `free_allocation_share`)
    #[default]
    FreeAllocation,
    /// `share` of the cap is auctioned from `start_year`
    Auction { share: f64, start_year: u32 },
}

/// Destination of auction revenue
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RevenueRecycling {
    /// Revenue stays with the treasury
    #[default]
    Treasury,
    /// `ratio` of revenue tops up the subsidy pool
    GreenInvestment { ratio: f64 },
    /// `ratio` of revenue is transferred to households
    HouseholdTransfer { ratio: f64 },
    /// `ratio` of revenue is paid to operating facilities as technology support
    FirmSupport { ratio: f64 },
}

/// Monitoring and enforcement settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnforcementConfig {
    /// Share of facilities audited per year
    pub audit_rate: f64,
    /// Under-reporting gap drawn from U(gap_min, gap_max) when a facility misreports
    pub gap_min: f64,
    pub gap_max: f64,
    /// Base penalty per tonne of under-reported emissions ($/t)
    pub penalty_price: f64,
    /// Deterrent multiplier, must exceed 1
    pub penalty_multiplier: f64,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            audit_rate: 0.2,
            gap_min: 0.05,
            gap_max: 0.15,
            penalty_price: 100.0,
            penalty_multiplier: 1.5,
        }
    }
}

fn default_price_floor() -> f64 {
    20.0
}

fn default_subsidy_share() -> f64 {
    0.6
}

fn default_true() -> bool {
    true
}

/// Immutable policy scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    /// Fractional cap cut per year
    pub cap_reduction_rate: f64,
    /// Subsidy budget added to the pool each year (M$)
    pub subsidy_budget: f64,
    /// Border-carbon price ($/t), also the market price ceiling
    pub border_carbon_price: f64,
    #[serde(default)]
    pub horizon: Horizon,
    /// Cap in the first simulated year (Mt)
    pub initial_cap: f64,
    /// First year the scheme is live. Before it the cap is frozen and the
    /// price is zero. `None` means live from the horizon start.
    #[serde(default)]
    pub ets_start_year: Option<u32>,
    #[serde(default = "default_price_floor")]
    pub price_floor: f64,
    /// Price published in the first year, defaults to the floor (or 0 before the scheme starts)
    #[serde(default)]
    pub initial_price: Option<f64>,
    #[serde(default)]
    pub price_formation: PriceFormation,
    /// Share of capital cost a subsidy covers
    #[serde(default = "default_subsidy_share")]
    pub subsidy_share: f64,
    /// Free permits per year as a share of each facility's baseline emissions
    #[serde(default)]
    pub free_allocation_share: f64,
    #[serde(default)]
    pub allocation: AllocationRule,
    #[serde(default)]
    pub recycling: RevenueRecycling,
    #[serde(default)]
    pub enforcement: EnforcementConfig,
    #[serde(default = "default_true")]
    pub penalty_triggers_investment: bool,
    /// External price trajectory for investment valuation ($/t by year)
    #[serde(default)]
    pub price_path: Option<BTreeMap<u32, f64>>,
}

impl Scenario {
    /// Business as usual: no cap cut, no subsidy, no border price.
    pub fn bau() -> Self {
        Self {
            name: "BAU".to_string(),
            cap_reduction_rate: 0.0,
            subsidy_budget: 0.0,
            border_carbon_price: 0.0,
            horizon: Horizon::default(),
            initial_cap: 146.0,
            ets_start_year: None,
            price_floor: 0.0,
            initial_price: None,
            price_formation: PriceFormation::default(),
            subsidy_share: default_subsidy_share(),
            free_allocation_share: 0.0,
            allocation: AllocationRule::FreeAllocation,
            recycling: RevenueRecycling::Treasury,
            enforcement: EnforcementConfig::default(),
            penalty_triggers_investment: true,
            price_path: None,
        }
    }

    /// Gentle scheme: pilot from 2026, mostly free allocation.
    pub fn soft_ets() -> Self {
        Self {
            name: "Soft-ETS".to_string(),
            cap_reduction_rate: 0.02,
            subsidy_budget: 30.0,
            border_carbon_price: 60.0,
            initial_cap: 139.0,
            ets_start_year: Some(2026),
            price_floor: default_price_floor(),
            free_allocation_share: 0.7,
            recycling: RevenueRecycling::GreenInvestment { ratio: 0.5 },
            ..Self::bau()
        }
    }

    /// Tight cap with auctioning from 2028 and household transfers.
    pub fn strict_ets() -> Self {
        Self {
            name: "Strict-ETS".to_string(),
            cap_reduction_rate: 0.04,
            subsidy_budget: 50.0,
            border_carbon_price: 90.0,
            initial_cap: 111.0,
            ets_start_year: Some(2026),
            price_floor: default_price_floor(),
            allocation: AllocationRule::Auction {
                share: 0.3,
                start_year: 2028,
            },
            recycling: RevenueRecycling::HouseholdTransfer { ratio: 0.8 },
            ..Self::bau()
        }
    }

    /// Strict cap with a large subsidy pool fed by all auction revenue.
    pub fn ets_incentive() -> Self {
        Self {
            name: "ETS-Incentive".to_string(),
            subsidy_budget: 150.0,
            recycling: RevenueRecycling::GreenInvestment { ratio: 1.0 },
            ..Self::strict_ets()
        }
    }

    /// All presets in canonical order.
    pub fn presets() -> Vec<Scenario> {
        vec![
            Self::bau(),
            Self::soft_ets(),
            Self::strict_ets(),
            Self::ets_incentive(),
        ]
    }

    /// Look up a preset by name (case-insensitive, `_` and `-` interchangeable).
    pub fn preset(name: &str) -> Result<Scenario, ConfigurationError> {
        let wanted = normalize(name);
        Self::presets()
            .into_iter()
            .find(|s| normalize(&s.name) == wanted)
            .ok_or_else(|| {
                ConfigurationError::invalid(
                    "scenario",
                    format!("unknown preset '{}' (known: {})", name, preset_names().join(", ")),
                )
            })
    }

    pub fn with_horizon(mut self, start_year: u32, end_year: u32) -> Self {
        self.horizon = Horizon::new(start_year, end_year);
        self
    }

    /// Whether the scheme is live in `year`.
    pub fn ets_active(&self, year: u32) -> bool {
        self.ets_start_year.map_or(true, |start| year >= start)
    }

    /// Auction share in effect in `year`.
    pub fn auction_share(&self, year: u32) -> f64 {
        match self.allocation {
            AllocationRule::Auction { share, start_year } if year >= start_year => share,
            _ => 0.0,
        }
    }

    /// Check every parameter. Runs before any tick.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let rate = self.cap_reduction_rate;
        if !(rate >= 0.0) {
            return Err(ConfigurationError::NegativeCapReductionRate(rate));
        }
        if rate > 1.0 {
            return Err(ConfigurationError::CapReductionRateTooLarge(rate));
        }
        if !(self.subsidy_budget >= 0.0) || !self.subsidy_budget.is_finite() {
            return Err(ConfigurationError::NegativeSubsidyBudget(self.subsidy_budget));
        }
        if !(self.border_carbon_price >= 0.0) || !self.border_carbon_price.is_finite() {
            return Err(ConfigurationError::NegativeBorderCarbonPrice(
                self.border_carbon_price,
            ));
        }
        if self.horizon.end_year < self.horizon.start_year {
            return Err(ConfigurationError::HorizonEndBeforeStart {
                start: self.horizon.start_year,
                end: self.horizon.end_year,
            });
        }
        if self.horizon.years() > MAX_HORIZON_YEARS {
            return Err(ConfigurationError::HorizonTooLong {
                years: self.horizon.years(),
                max: MAX_HORIZON_YEARS,
            });
        }

        non_negative("initial_cap", self.initial_cap)?;
        non_negative("price_floor", self.price_floor)?;
        if let Some(price) = self.initial_price {
            non_negative("initial_price", price)?;
        }
        unit_interval("subsidy_share", self.subsidy_share)?;
        unit_interval("free_allocation_share", self.free_allocation_share)?;
        if let AllocationRule::Auction { share, .. } = self.allocation {
            unit_interval("allocation.share", share)?;
        }
        match self.recycling {
            RevenueRecycling::Treasury => {}
            RevenueRecycling::GreenInvestment { ratio }
            | RevenueRecycling::HouseholdTransfer { ratio }
            | RevenueRecycling::FirmSupport { ratio } => {
                unit_interval("recycling.ratio", ratio)?
            }
        }

        let e = &self.enforcement;
        unit_interval("enforcement.audit_rate", e.audit_rate)?;
        non_negative("enforcement.gap_min", e.gap_min)?;
        if !(e.gap_max >= e.gap_min) {
            return Err(ConfigurationError::invalid(
                "enforcement.gap_max",
                format!("{} is below gap_min {}", e.gap_max, e.gap_min),
            ));
        }
        non_negative("enforcement.penalty_price", e.penalty_price)?;
        if !(e.penalty_multiplier > 1.0) || !e.penalty_multiplier.is_finite() {
            return Err(ConfigurationError::invalid(
                "enforcement.penalty_multiplier",
                format!("must exceed 1.0, got {}", e.penalty_multiplier),
            ));
        }

        if let Some(path) = &self.price_path {
            for (year, price) in path {
                non_negative(&format!("price_path[{}]", year), *price)?;
            }
        }
        self.price_formation.validate()
    }
}

/// Names of all presets.
pub fn preset_names() -> Vec<String> {
    Scenario::presets().into_iter().map(|s| s.name).collect()
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace('_', "-")
}

pub(crate) fn non_negative(name: &str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::invalid(
            name,
            format!("must be finite and non-negative, got {}", value),
        ))
    }
}

pub(crate) fn unit_interval(name: &str, value: f64) -> Result<(), ConfigurationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigurationError::invalid(
            name,
            format!("must lie in [0, 1], got {}", value),
        ))
    }
}
