//! Simulation clock
//!
//! The simulation advances one calendar year per tick over a closed horizon.
//!
//! # State Machine
//!
//! ```text
//! Initialized ──begin_year──▶ Running(start) ──finish/begin──▶ Running(start+1) ... Running(end) ──finish_year──▶ Completed
//! ```
//!
//! # Critical Invariants
//!
//! 1. Years are strictly increasing with no gaps
//! 2. A past year is never re-entered
//! 3. `Completed` is terminal

use crate::error::SimulationError;
use serde::{Deserialize, Serialize};

/// Clock state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockState {
    Initialized,
    Running(u32),
    Completed,
}

/// Yearly clock over an inclusive `[start_year, end_year]` horizon
///
/// # Example
/// ```
/// use ets_simulator_core_rs::YearClock;
///
/// let mut clock = YearClock::new(2025, 2026).unwrap();
/// assert_eq!(clock.begin_year().unwrap(), 2025);
/// clock.finish_year();
/// assert_eq!(clock.begin_year().unwrap(), 2026);
/// clock.finish_year();
/// assert!(clock.is_completed());
/// assert!(clock.begin_year().is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearClock {
    start_year: u32,
    end_year: u32,
    state: ClockState,
    /// Year whose tick is open (between begin_year and finish_year)
    open: Option<u32>,
}

impl YearClock {
    /// Create a clock for the inclusive horizon.
    pub fn new(start_year: u32, end_year: u32) -> Result<Self, SimulationError> {
        if end_year < start_year {
            return Err(SimulationError::ClockViolation(format!(
                "horizon end {} before start {}",
                end_year, start_year
            )));
        }
        Ok(Self {
            start_year,
            end_year,
            state: ClockState::Initialized,
            open: None,
        })
    }

    /// Enter the next year and return it.
    ///
    /// Fails if the clock is completed or the previous year was never
    /// finished.
    pub fn begin_year(&mut self) -> Result<u32, SimulationError> {
        if let Some(year) = self.open {
            return Err(SimulationError::ClockViolation(format!(
                "year {} is still open",
                year
            )));
        }
        let next = match self.state {
            ClockState::Initialized => self.start_year,
            ClockState::Running(year) if year < self.end_year => year + 1,
            ClockState::Running(year) => {
                return Err(SimulationError::ClockViolation(format!(
                    "no year after horizon end {}",
                    year
                )))
            }
            ClockState::Completed => {
                return Err(SimulationError::ClockViolation(
                    "clock already completed".to_string(),
                ))
            }
        };
        self.state = ClockState::Running(next);
        self.open = Some(next);
        Ok(next)
    }

    /// Close the open year. Closing the final year completes the clock.
    pub fn finish_year(&mut self) {
        if let Some(year) = self.open.take() {
            if year == self.end_year {
                self.state = ClockState::Completed;
            }
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Year of the most recent tick, if any has started.
    pub fn current_year(&self) -> Option<u32> {
        match self.state {
            ClockState::Running(year) => Some(year),
            ClockState::Completed => Some(self.end_year),
            ClockState::Initialized => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state == ClockState::Completed
    }

    pub fn start_year(&self) -> u32 {
        self.start_year
    }

    pub fn end_year(&self) -> u32 {
        self.end_year
    }

    /// Number of ticks in the horizon.
    pub fn horizon_len(&self) -> u32 {
        self.end_year - self.start_year + 1
    }

    /// Ticks not yet started.
    pub fn years_remaining(&self) -> u32 {
        match self.state {
            ClockState::Initialized => self.horizon_len(),
            ClockState::Running(year) => self.end_year - year,
            ClockState::Completed => 0,
        }
    }
}
