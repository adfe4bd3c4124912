//! Forecast result structure holding point predictions and intervals.

use crate::error::{ForecastError, Result};
use crate::utils::stats::quantile_normal;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::ops::RangeInclusive;

/// Two-sided confidence level in percent, strictly inside (0, 100).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ConfidenceLevel(f64);

impl ConfidenceLevel {
    /// Validate a percentage.
    pub fn new(percent: f64) -> Result<Self> {
        if !(percent.is_finite() && percent > 0.0 && percent < 100.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "confidence level must be strictly between 0 and 100, got {percent}"
            )));
        }
        Ok(Self(percent))
    }

    pub fn percent(&self) -> f64 {
        self.0
    }

    /// Coverage probability in (0, 1).
    pub fn probability(&self) -> f64 {
        self.0 / 100.0
    }

    /// Standard normal quantile bounding the central interval.
    pub fn z_score(&self) -> f64 {
        quantile_normal(0.5 + self.probability() / 2.0)
    }
}

impl Default for ConfidenceLevel {
    fn default() -> Self {
        Self(95.0)
    }
}

impl PartialEq for ConfidenceLevel {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for ConfidenceLevel {}

impl Hash for ConfidenceLevel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl TryFrom<f64> for ConfidenceLevel {
    type Error = ForecastError;

    fn try_from(percent: f64) -> Result<Self> {
        Self::new(percent)
    }
}

impl From<ConfidenceLevel> for f64 {
    fn from(level: ConfidenceLevel) -> f64 {
        level.0
    }
}

/// One forecast step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastRecord {
    /// Weeks ahead of the last observed week, starting at 1.
    pub week_offset: usize,
    pub point: f64,
    pub lower: f64,
    pub upper: f64,
}

impl ForecastRecord {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Ordered forecast records at one confidence level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    records: Vec<ForecastRecord>,
    level: ConfidenceLevel,
    intervals_visible: bool,
}

impl ForecastResult {
    /// Assemble a result from point predictions and per-step standard errors.
    ///
    /// Offsets start at 1. Bounds are `point ∓ z·se` so every record satisfies
    /// `lower <= point <= upper`.
    pub fn from_points(points: &[f64], std_errors: &[f64], level: ConfidenceLevel) -> Result<Self> {
        if points.len() != std_errors.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "{} points but {} standard errors",
                points.len(),
                std_errors.len()
            )));
        }
        let z = level.z_score();
        let records = points
            .iter()
            .zip(std_errors)
            .enumerate()
            .map(|(i, (&point, &se))| {
                let half = z * se.max(0.0);
                ForecastRecord {
                    week_offset: i + 1,
                    point,
                    lower: point - half,
                    upper: point + half,
                }
            })
            .collect();
        Ok(Self {
            records,
            level,
            intervals_visible: true,
        })
    }

    /// Wrap already computed records.
    pub fn from_records(records: Vec<ForecastRecord>, level: ConfidenceLevel) -> Self {
        Self {
            records,
            level,
            intervals_visible: true,
        }
    }

    /// Toggle whether presentation should draw the interval band.
    pub fn with_intervals_visible(mut self, visible: bool) -> Self {
        self.intervals_visible = visible;
        self
    }

    pub fn intervals_visible(&self) -> bool {
        self.intervals_visible
    }

    pub fn level(&self) -> ConfidenceLevel {
        self.level
    }

    pub fn records(&self) -> &[ForecastRecord] {
        &self.records
    }

    /// Number of forecast steps.
    pub fn horizon(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn points(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.point).collect()
    }

    pub fn lower(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.lower).collect()
    }

    pub fn upper(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.upper).collect()
    }

    /// Record at a given week offset.
    pub fn at_offset(&self, week_offset: usize) -> Option<&ForecastRecord> {
        self.records.iter().find(|r| r.week_offset == week_offset)
    }

    /// Records whose week offset falls in `offsets`, keeping their original offsets.
    pub fn slice(&self, offsets: RangeInclusive<usize>) -> ForecastResult {
        ForecastResult {
            records: self
                .records
                .iter()
                .filter(|r| offsets.contains(&r.week_offset))
                .copied()
                .collect(),
            level: self.level,
            intervals_visible: self.intervals_visible,
        }
    }
}
