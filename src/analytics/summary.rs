use crate::core::ForecastResult;
use crate::error::{ForecastError, Result};
use crate::utils::stats::{median_of_sorted, sorted};
use serde::Serialize;
use std::ops::RangeInclusive;

/// Total, mean and median of forecast point values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastSummary {
    pub total: f64,
    pub mean: f64,
    pub median: f64,
    /// Records summarised.
    pub count: usize,
}

/// Summarise the points of `result`, optionally restricted to a range of week offsets.
///
/// Values are accumulated in sorted order, so the result does not depend on
/// record order.
///
/// # Example
///
/// ```
/// use weekcast::analytics::summarize;
/// use weekcast::core::{ConfidenceLevel, ForecastResult};
///
/// let result = ForecastResult::from_points(&[3.0, 1.0, 2.0, 10.0], &[0.0; 4], ConfidenceLevel::default()).unwrap();
/// let whole = summarize(&result, None).unwrap();
/// assert_eq!(whole.total, 16.0);
/// assert_eq!(whole.median, 2.5);
///
/// let first_three = summarize(&result, Some(1..=3)).unwrap();
/// assert_eq!(first_three.mean, 2.0);
/// ```
pub fn summarize(
    result: &ForecastResult,
    offsets: Option<RangeInclusive<usize>>,
) -> Result<ForecastSummary> {
    let points: Vec<f64> = result
        .records()
        .iter()
        .filter(|r| offsets.as_ref().map_or(true, |o| o.contains(&r.week_offset)))
        .map(|r| r.point)
        .collect();
    summarize_values(&points)
}

/// Summary of plain values; fails on an empty slice.
pub fn summarize_values(values: &[f64]) -> Result<ForecastSummary> {
    if values.is_empty() {
        return Err(ForecastError::EmptyRange);
    }
    let ordered = sorted(values);
    let total: f64 = ordered.iter().sum();
    Ok(ForecastSummary {
        total,
        mean: total / ordered.len() as f64,
        median: median_of_sorted(&ordered),
        count: ordered.len(),
    })
}
