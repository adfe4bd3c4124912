//! Gap-free weekly series.

use crate::error::{ForecastError, Result};

/// Default seasonal period of a weekly series (one year).
pub const WEEKS_PER_YEAR: usize = 52;

/// A weekly series indexed by consecutive week numbers.
///
/// `values[i]` is the sales amount of week `start_week + i`; there are no gaps
/// by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklySeries {
    label: String,
    start_week: u32,
    values: Vec<f64>,
    period: usize,
}

impl WeeklySeries {
    /// Create a series starting at `start_week` with the given seasonal period.
    pub fn new(
        label: impl Into<String>,
        start_week: u32,
        values: Vec<f64>,
        period: usize,
    ) -> Result<Self> {
        if values.is_empty() {
            return Err(ForecastError::EmptySeries);
        }
        if start_week == 0 {
            return Err(ForecastError::InvalidParameter(
                "start_week must be at least 1".to_string(),
            ));
        }
        if period == 0 {
            return Err(ForecastError::InvalidParameter(
                "seasonal period must be positive".to_string(),
            ));
        }
        Ok(Self {
            label: label.into(),
            start_week,
            values,
            period,
        })
    }

    /// Create a yearly-seasonal series starting at week 1.
    pub fn weekly(label: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        Self::new(label, 1, values, WEEKS_PER_YEAR)
    }

    /// Human-readable description of what the series covers.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn start_week(&self) -> u32 {
        self.start_week
    }

    /// Week number of the last observation.
    pub fn end_week(&self) -> u32 {
        self.start_week + self.values.len() as u32 - 1
    }

    /// Value observed at a given week, if covered.
    pub fn at_week(&self, week: u32) -> Option<f64> {
        week.checked_sub(self.start_week)
            .and_then(|i| self.values.get(i as usize))
            .copied()
    }

    /// Number of complete seasonal cycles covered.
    pub fn full_seasons(&self) -> usize {
        self.values.len() / self.period
    }

    /// Whether the series meets the two-season length recommended for seasonal fitting.
    pub fn supports_seasonal_fit(&self) -> bool {
        self.full_seasons() >= 2
    }

    /// The last `n` values (or the whole series when shorter).
    pub fn tail(&self, n: usize) -> &[f64] {
        &self.values[self.values.len().saturating_sub(n)..]
    }
}
