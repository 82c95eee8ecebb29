//! Facility model
//!
//! Represents one emitting installation in the trading scheme. Exporters
//! are facilities carrying an [`ExportExposure`]; they share every field
//! and state transition with domestic facilities and differ only in the
//! border-carbon term of their decision rule.
//!
//! # Critical Invariants
//!
//! 1. Emissions are finite and never negative
//! 2. `Closed` is terminal: emissions stay at 0 and the state never changes
//! 3. The MAC curve is immutable input; only capital state, emissions and
//!    the accounting ledgers are mutated
//! 4. A facility only mutates its own state

use crate::error::{ConfigurationError, SimulationError};
use crate::models::mac::{MacCurve, MacStep};
use crate::policy::{facility_rule, Decision, TickContext};
use serde::{Deserialize, Serialize};

/// Economic sector tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sector {
    Energy,
    Industry,
    Agriculture,
}

impl Sector {
    pub fn code(&self) -> &'static str {
        match self {
            Sector::Energy => "ENE",
            Sector::Industry => "IND",
            Sector::Agriculture => "AGR",
        }
    }
}

/// Capital stock state of a facility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CapitalState {
    /// Running without the next abatement measure
    #[default]
    Dirty,
    /// Installing an abatement measure
    Converting,
    /// Finished at least one conversion
    Clean,
    /// Shut down permanently
    Closed,
}

/// Exposure of an exporter to a foreign border-carbon adjustment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExportExposure {
    /// Share of output sold into the adjusting market, in [0, 1]
    pub fraction: f64,
    /// Border price this exporter faces. `None` follows the scenario's
    /// border-carbon price.
    #[serde(default)]
    pub border_price_reference: Option<f64>,
}

impl ExportExposure {
    /// Border price this exporter faces under the published tick context.
    pub fn border_price(&self, scenario_border_price: f64) -> f64 {
        self.border_price_reference.unwrap_or(scenario_border_price)
    }

    /// Border cost per tonne of uncovered emissions.
    pub fn uplift(&self, scenario_border_price: f64) -> f64 {
        self.fraction * self.border_price(scenario_border_price)
    }
}

/// Conversion in progress
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub years_remaining: u32,
    pub step_index: usize,
    pub post_conversion_emissions: f64,
}

/// Result of advancing a conversion by one year
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConversionProgress {
    InProgress { years_remaining: u32 },
    Completed { emissions_before: f64, emissions_after: f64 },
}

fn default_capex_multiple() -> f64 {
    8.0
}

fn default_conversion_years() -> u32 {
    3
}

/// Input record for one facility (inventory row)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilitySpec {
    pub id: String,
    pub sector: Sector,
    /// Annual emissions (Mt/yr)
    pub emissions: f64,
    pub mac: Vec<MacStep>,
    /// Survival ceiling on annual carbon cost (M$)
    pub cost_limit: f64,
    /// Upfront capital per unit of annualised abatement cost
    #[serde(default = "default_capex_multiple")]
    pub capex_multiple: f64,
    #[serde(default = "default_conversion_years")]
    pub conversion_years: u32,
    #[serde(default)]
    pub export: Option<ExportExposure>,
    #[serde(default)]
    pub capital_state: CapitalState,
    /// Invests whenever the subsidy pool can fund most of the next measure
    #[serde(default)]
    pub subsidy_driven: bool,
}

/// An emitting facility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    id: String,
    sector: Sector,
    export: Option<ExportExposure>,
    emissions: f64,
    baseline_emissions: f64,
    mac: MacCurve,
    capital_state: CapitalState,
    conversion: Option<Conversion>,
    /// Next unused position on the MAC curve
    next_step: usize,
    cost_limit: f64,
    capex_multiple: f64,
    conversion_years: u32,
    permit_bank: f64,
    net_emissions: f64,
    border_carbon_cost: f64,
    cumulative_penalties: f64,
    cumulative_subsidy: f64,
    /// Set by an audit penalty, cleared when the next conversion starts
    penalty_flag: bool,
    #[serde(default)]
    subsidy_driven: bool,
}

impl Facility {
    /// Build a facility from its inventory record.
    ///
    /// # Example
    /// ```
    /// use ets_simulator_core_rs::models::{CapitalState, FacilitySpec, MacStep, Sector};
    /// use ets_simulator_core_rs::Facility;
    ///
    /// let facility = Facility::new(FacilitySpec {
    ///     id: "ENE-001".to_string(),
    ///     sector: Sector::Energy,
    ///     emissions: 1.5,
    ///     mac: vec![MacStep::new(-15.0, 0.12), MacStep::new(35.0, 0.3)],
    ///     cost_limit: 135.0,
    ///     capex_multiple: 7.5,
    ///     conversion_years: 3,
    ///     export: None,
    ///     capital_state: CapitalState::Dirty,
    ///     subsidy_driven: false,
    /// })
    /// .unwrap();
    ///
    /// assert_eq!(facility.capital_state(), CapitalState::Dirty);
    /// assert_eq!(facility.years_remaining(), None);
    /// ```
    pub fn new(spec: FacilitySpec) -> Result<Self, ConfigurationError> {
        if spec.id.is_empty() {
            return Err(ConfigurationError::invalid("facility.id", "must not be empty"));
        }
        if !spec.emissions.is_finite() || spec.emissions < 0.0 {
            return Err(ConfigurationError::invalid(
                "facility.emissions",
                format!("{} has emissions {}", spec.id, spec.emissions),
            ));
        }
        if !spec.cost_limit.is_finite() || spec.cost_limit < 0.0 {
            return Err(ConfigurationError::invalid(
                "facility.cost_limit",
                format!("{} has cost limit {}", spec.id, spec.cost_limit),
            ));
        }
        if !spec.capex_multiple.is_finite() || spec.capex_multiple < 0.0 {
            return Err(ConfigurationError::invalid(
                "facility.capex_multiple",
                format!("{} has capex multiple {}", spec.id, spec.capex_multiple),
            ));
        }
        if spec.conversion_years == 0 {
            return Err(ConfigurationError::invalid(
                "facility.conversion_years",
                format!("{} must take at least one year to convert", spec.id),
            ));
        }
        if spec.capital_state == CapitalState::Converting {
            return Err(ConfigurationError::invalid(
                "facility.capital_state",
                format!("{} cannot start mid-conversion", spec.id),
            ));
        }
        if let Some(export) = &spec.export {
            if !(0.0..=1.0).contains(&export.fraction) {
                return Err(ConfigurationError::invalid(
                    "facility.export.fraction",
                    format!("{} has export fraction {}", spec.id, export.fraction),
                ));
            }
            if matches!(export.border_price_reference, Some(p) if !(p >= 0.0)) {
                return Err(ConfigurationError::invalid(
                    "facility.export.border_price_reference",
                    format!("{} has a negative border price", spec.id),
                ));
            }
        }

        let mac = MacCurve::new(&spec.id, spec.mac)?;
        let emissions = if spec.capital_state == CapitalState::Closed {
            0.0
        } else {
            spec.emissions
        };

        Ok(Self {
            id: spec.id,
            sector: spec.sector,
            export: spec.export,
            emissions,
            baseline_emissions: emissions,
            mac,
            capital_state: spec.capital_state,
            conversion: None,
            next_step: 0,
            cost_limit: spec.cost_limit,
            capex_multiple: spec.capex_multiple,
            conversion_years: spec.conversion_years,
            permit_bank: 0.0,
            net_emissions: emissions,
            border_carbon_cost: 0.0,
            cumulative_penalties: 0.0,
            cumulative_subsidy: 0.0,
            penalty_flag: false,
            subsidy_driven: spec.subsidy_driven,
        })
    }

    /// Run this year's decision rule. See [`facility_rule::decide`].
    pub fn decide(&mut self, ctx: &TickContext) -> Result<Decision, SimulationError> {
        facility_rule::decide(self, ctx)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sector(&self) -> Sector {
        self.sector
    }

    pub fn export(&self) -> Option<&ExportExposure> {
        self.export.as_ref()
    }

    pub fn is_exporter(&self) -> bool {
        self.export.is_some()
    }

    pub fn emissions(&self) -> f64 {
        self.emissions
    }

    pub fn baseline_emissions(&self) -> f64 {
        self.baseline_emissions
    }

    pub fn mac(&self) -> &MacCurve {
        &self.mac
    }

    pub fn capital_state(&self) -> CapitalState {
        self.capital_state
    }

    pub fn is_closed(&self) -> bool {
        self.capital_state == CapitalState::Closed
    }

    pub fn is_subsidy_driven(&self) -> bool {
        self.subsidy_driven
    }

    pub fn conversion(&self) -> Option<&Conversion> {
        self.conversion.as_ref()
    }

    /// Years left in the current conversion, `None` when not converting.
    pub fn years_remaining(&self) -> Option<u32> {
        self.conversion.map(|c| c.years_remaining)
    }

    pub fn next_step(&self) -> usize {
        self.next_step
    }

    pub fn cost_limit(&self) -> f64 {
        self.cost_limit
    }

    pub fn capex_multiple(&self) -> f64 {
        self.capex_multiple
    }

    pub fn conversion_years(&self) -> u32 {
        self.conversion_years
    }

    pub fn permit_bank(&self) -> f64 {
        self.permit_bank
    }

    /// Emissions not covered by free allocation or banked permits in the
    /// most recent settlement.
    pub fn net_emissions(&self) -> f64 {
        self.net_emissions
    }

    pub fn border_carbon_cost(&self) -> f64 {
        self.border_carbon_cost
    }

    pub fn cumulative_penalties(&self) -> f64 {
        self.cumulative_penalties
    }

    pub fn cumulative_subsidy(&self) -> f64 {
        self.cumulative_subsidy
    }

    pub fn penalty_flag(&self) -> bool {
        self.penalty_flag
    }

    /// Free permits for one year under the given allocation share.
    pub fn free_allocation(&self, share: f64) -> f64 {
        if self.is_closed() {
            0.0
        } else {
            self.baseline_emissions * share
        }
    }

    /// Uncovered emissions if the current level persists this year.
    pub fn projected_net_emissions(&self, free_share: f64) -> f64 {
        (self.emissions - self.free_allocation(free_share) - self.permit_bank).max(0.0)
    }

    // ========================================================================
    // Mutations (own state only)
    // ========================================================================

    pub(crate) fn start_conversion(&mut self, step_index: usize, step: MacStep) {
        self.capital_state = CapitalState::Converting;
        self.conversion = Some(Conversion {
            years_remaining: self.conversion_years,
            step_index,
            post_conversion_emissions: (self.emissions - step.quantity).max(0.0),
        });
        self.penalty_flag = false;
    }

    /// Count one year off the conversion. At zero the facility becomes
    /// `Clean` and the reduced emission level applies immediately.
    pub(crate) fn advance_conversion(&mut self) -> Option<ConversionProgress> {
        let conversion = self.conversion.as_mut()?;
        conversion.years_remaining = conversion.years_remaining.saturating_sub(1);
        if conversion.years_remaining > 0 {
            return Some(ConversionProgress::InProgress {
                years_remaining: conversion.years_remaining,
            });
        }

        let before = self.emissions;
        let done = *conversion;
        self.conversion = None;
        self.emissions = done.post_conversion_emissions;
        self.next_step = done.step_index + 1;
        self.capital_state = CapitalState::Clean;
        Some(ConversionProgress::Completed {
            emissions_before: before,
            emissions_after: self.emissions,
        })
    }

    pub(crate) fn close(&mut self) {
        self.capital_state = CapitalState::Closed;
        self.conversion = None;
        self.emissions = 0.0;
        self.net_emissions = 0.0;
        self.border_carbon_cost = 0.0;
    }

    /// Surrender permits for this year's emissions.
    ///
    /// Free allocation covers emissions first; any surplus is banked, any
    /// shortfall draws on the bank before counting as net emissions.
    pub(crate) fn settle_allowances(&mut self, free_share: f64, scenario_border_price: f64) -> f64 {
        let allocation = self.free_allocation(free_share);
        if self.emissions <= allocation {
            self.permit_bank += allocation - self.emissions;
            self.net_emissions = 0.0;
        } else {
            let shortfall = self.emissions - allocation;
            let drawn = shortfall.min(self.permit_bank);
            self.permit_bank -= drawn;
            self.net_emissions = shortfall - drawn;
        }
        self.border_carbon_cost = self
            .export
            .map(|e| e.uplift(scenario_border_price) * self.net_emissions)
            .unwrap_or(0.0);
        self.net_emissions
    }

    pub(crate) fn record_penalty(&mut self, amount: f64) {
        self.cumulative_penalties += amount;
        if amount > 0.0 {
            self.penalty_flag = true;
        }
    }

    pub(crate) fn record_subsidy(&mut self, amount: f64) {
        self.cumulative_subsidy += amount;
    }

    pub(crate) fn scale_mac(&mut self, factor: f64) {
        self.mac = self.mac.scaled(factor);
    }
}
