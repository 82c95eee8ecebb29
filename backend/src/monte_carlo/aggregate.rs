//! Percentile aggregation over repetitions
//!
//! Reduces the snapshot sequences of successful repetitions into one
//! P5/P50/P95 band per metric per year.
//!
//! # Critical Invariants
//!
//! 1. Only successful repetitions contribute
//! 2. Quantiles interpolate linearly between closest ranks, so identical
//!    inputs give `p5 == p50 == p95` exactly
//! 3. Aggregation order is repetition index order, independent of scheduling

use crate::orchestrator::YearSnapshot;
use serde::{Deserialize, Serialize};

/// Per-year quantity aggregated across repetitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    TotalEmissions,
    NetEmissions,
    ClearingPrice,
    Cap,
    PenaltiesCollected,
    SubsidiesDisbursed,
    DirtyFacilities,
    ConvertingFacilities,
    CleanFacilities,
    ClosedFacilities,
}

impl Metric {
    pub const ALL: [Metric; 10] = [
        Metric::TotalEmissions,
        Metric::NetEmissions,
        Metric::ClearingPrice,
        Metric::Cap,
        Metric::PenaltiesCollected,
        Metric::SubsidiesDisbursed,
        Metric::DirtyFacilities,
        Metric::ConvertingFacilities,
        Metric::CleanFacilities,
        Metric::ClosedFacilities,
    ];

    pub fn value(&self, snapshot: &YearSnapshot) -> f64 {
        match self {
            Metric::TotalEmissions => snapshot.total_emissions,
            Metric::NetEmissions => snapshot.net_emissions,
            Metric::ClearingPrice => snapshot.clearing_price,
            Metric::Cap => snapshot.cap,
            Metric::PenaltiesCollected => snapshot.penalties_collected,
            Metric::SubsidiesDisbursed => snapshot.subsidies_disbursed,
            Metric::DirtyFacilities => snapshot.state_counts.dirty as f64,
            Metric::ConvertingFacilities => snapshot.state_counts.converting as f64,
            Metric::CleanFacilities => snapshot.state_counts.clean as f64,
            Metric::ClosedFacilities => snapshot.state_counts.closed as f64,
        }
    }
}

/// Quantile band of one metric in one year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileBand {
    pub year: u32,
    pub p5: f64,
    pub p50: f64,
    pub p95: f64,
    pub mean: f64,
}

/// All yearly bands of one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub metric: Metric,
    pub bands: Vec<PercentileBand>,
}

impl MetricSeries {
    pub fn band(&self, year: u32) -> Option<&PercentileBand> {
        self.bands.iter().find(|b| b.year == year)
    }
}

/// Quantile `p` in [0, 1] of ascending `sorted`, NaN when empty.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            if lo == hi {
                return sorted[lo];
            }
            let weight = rank - lo as f64;
            // Exact when neighbouring ranks are equal
            sorted[lo] + weight * (sorted[hi] - sorted[lo])
        }
    }
}

/// Summarise `values` into a band for `year`.
pub fn band(year: u32, values: &[f64]) -> PercentileBand {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mean = if sorted.is_empty() {
        f64::NAN
    } else {
        sorted.iter().sum::<f64>() / sorted.len() as f64
    };

    PercentileBand {
        year,
        p5: quantile_sorted(&sorted, 0.05),
        p50: quantile_sorted(&sorted, 0.50),
        p95: quantile_sorted(&sorted, 0.95),
        mean,
    }
}

/// Aggregate every metric over the given snapshot sequences.
///
/// Years are taken from the first sequence; a repetition missing a year is
/// skipped for that year.
pub fn aggregate(runs: &[&[YearSnapshot]]) -> Vec<MetricSeries> {
    let years: Vec<u32> = runs
        .first()
        .map(|snaps| snaps.iter().map(|s| s.year).collect())
        .unwrap_or_default();

    Metric::ALL
        .iter()
        .map(|&metric| {
            let bands = years
                .iter()
                .enumerate()
                .map(|(i, &year)| {
                    let values: Vec<f64> = runs
                        .iter()
                        .filter_map(|snaps| snaps.get(i).filter(|s| s.year == year))
                        .map(|s| metric.value(s))
                        .collect();
                    band(year, &values)
                })
                .collect();
            MetricSeries { metric, bands }
        })
        .collect()
}
