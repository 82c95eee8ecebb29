//! Simulation State
//!
//! The agent population of one run: facilities in roster order plus the
//! household segments. Each Monte Carlo repetition owns its own copy.
//!
//! # Critical Invariants
//!
//! 1. **ID Uniqueness**: each facility ID appears exactly once
//! 2. **Roster Order**: facilities keep their input order for the whole run;
//!    subsidy disbursement and audit selection depend on it
//! 3. **Persistence**: closed facilities stay in the roster for the audit trail

use crate::error::ConfigurationError;
use crate::models::facility::{CapitalState, Facility, FacilitySpec};
use crate::models::household::{HouseholdSegment, HouseholdSpec};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Serializable roster as supplied by an inventory store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationSpec {
    pub facilities: Vec<FacilitySpec>,
    #[serde(default)]
    pub households: Vec<HouseholdSpec>,
}

/// Validated initial population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Population {
    pub facilities: Vec<Facility>,
    pub households: Vec<HouseholdSegment>,
}

impl Population {
    /// Validate an inventory roster.
    pub fn from_spec(spec: PopulationSpec) -> Result<Self, ConfigurationError> {
        let facilities = spec
            .facilities
            .into_iter()
            .map(Facility::new)
            .collect::<Result<Vec<_>, _>>()?;
        let households = spec
            .households
            .into_iter()
            .map(HouseholdSegment::new)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(facilities, households)
    }

    pub fn new(
        facilities: Vec<Facility>,
        households: Vec<HouseholdSegment>,
    ) -> Result<Self, ConfigurationError> {
        if facilities.is_empty() {
            return Err(ConfigurationError::EmptyRoster);
        }
        let mut seen = HashSet::with_capacity(facilities.len());
        for facility in &facilities {
            if !seen.insert(facility.id()) {
                return Err(ConfigurationError::DuplicateFacilityId(
                    facility.id().to_string(),
                ));
            }
        }
        Ok(Self {
            facilities,
            households,
        })
    }

    pub fn total_facility_emissions(&self) -> f64 {
        self.facilities.iter().map(|f| f.emissions()).sum()
    }
}

/// Facility counts per capital state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCounts {
    pub dirty: usize,
    pub converting: usize,
    pub clean: usize,
    pub closed: usize,
}

impl StateCounts {
    pub fn total(&self) -> usize {
        self.dirty + self.converting + self.clean + self.closed
    }

    pub fn get(&self, state: CapitalState) -> usize {
        match state {
            CapitalState::Dirty => self.dirty,
            CapitalState::Converting => self.converting,
            CapitalState::Clean => self.clean,
            CapitalState::Closed => self.closed,
        }
    }
}

/// Mutable agent population of a running simulation
///
/// # Example
///
/// ```rust
/// use ets_simulator_core_rs::scenario::RosterConfig;
/// use ets_simulator_core_rs::SimulationState;
///
/// let population = RosterConfig::default().build().unwrap();
/// let state = SimulationState::new(population);
/// assert_eq!(state.num_facilities(), 110);
/// assert_eq!(state.state_counts().dirty, 110);
/// ```
#[derive(Debug, Clone)]
pub struct SimulationState {
    facilities: Vec<Facility>,
    index: HashMap<String, usize>,
    households: Vec<HouseholdSegment>,
}

impl SimulationState {
    pub fn new(population: Population) -> Self {
        let index = population
            .facilities
            .iter()
            .enumerate()
            .map(|(i, f)| (f.id().to_string(), i))
            .collect();
        Self {
            facilities: population.facilities,
            index,
            households: population.households,
        }
    }

    pub fn facilities(&self) -> &[Facility] {
        &self.facilities
    }

    pub fn facilities_mut(&mut self) -> &mut [Facility] {
        &mut self.facilities
    }

    pub fn households(&self) -> &[HouseholdSegment] {
        &self.households
    }

    pub fn households_mut(&mut self) -> &mut [HouseholdSegment] {
        &mut self.households
    }

    /// Both populations at once, for the decision phase
    pub fn agents_mut(&mut self) -> (&mut [Facility], &mut [HouseholdSegment]) {
        (&mut self.facilities, &mut self.households)
    }

    pub fn get_facility(&self, id: &str) -> Option<&Facility> {
        self.index.get(id).map(|&i| &self.facilities[i])
    }

    pub fn get_facility_mut(&mut self, id: &str) -> Option<&mut Facility> {
        match self.index.get(id) {
            Some(&i) => self.facilities.get_mut(i),
            None => None,
        }
    }

    pub fn num_facilities(&self) -> usize {
        self.facilities.len()
    }

    pub fn facility_emissions(&self) -> f64 {
        self.facilities.iter().map(|f| f.emissions()).sum()
    }

    pub fn household_emissions(&self) -> f64 {
        self.households.iter().map(|h| h.emissions()).sum()
    }

    pub fn state_counts(&self) -> StateCounts {
        let mut counts = StateCounts::default();
        for facility in &self.facilities {
            match facility.capital_state() {
                CapitalState::Dirty => counts.dirty += 1,
                CapitalState::Converting => counts.converting += 1,
                CapitalState::Clean => counts.clean += 1,
                CapitalState::Closed => counts.closed += 1,
            }
        }
        counts
    }

    pub fn border_carbon_cost(&self) -> f64 {
        self.facilities.iter().map(|f| f.border_carbon_cost()).sum()
    }

    pub fn cumulative_penalties(&self) -> f64 {
        self.facilities.iter().map(|f| f.cumulative_penalties()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::facility::Sector;
    use crate::models::mac::MacStep;

    fn spec(id: &str) -> FacilitySpec {
        FacilitySpec {
            id: id.to_string(),
            sector: Sector::Energy,
            emissions: 1.0,
            mac: vec![MacStep::new(10.0, 0.1)],
            cost_limit: 90.0,
            capex_multiple: 7.5,
            conversion_years: 3,
            export: None,
            capital_state: CapitalState::Dirty,
            subsidy_driven: false,
        }
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = Population::from_spec(PopulationSpec {
            facilities: vec![spec("A"), spec("A")],
            households: vec![],
        });
        assert_eq!(
            result,
            Err(ConfigurationError::DuplicateFacilityId("A".to_string()))
        );
    }

    #[test]
    fn test_empty_roster_rejected() {
        let result = Population::from_spec(PopulationSpec::default());
        assert_eq!(result, Err(ConfigurationError::EmptyRoster));
    }

    #[test]
    fn test_lookup_by_id_preserves_roster_order() {
        let population = Population::from_spec(PopulationSpec {
            facilities: vec![spec("B"), spec("A")],
            households: vec![],
        })
        .unwrap();
        let state = SimulationState::new(population);
        assert_eq!(state.facilities()[0].id(), "B");
        assert_eq!(state.get_facility("A").unwrap().id(), "A");
        assert!(state.get_facility("Z").is_none());
    }
}
