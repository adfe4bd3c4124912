use crate::core::{ForecastResult, Quarter, WEEKS_PER_YEAR};
use crate::error::{ForecastError, Result};
use serde::Serialize;

/// Actual versus forecast sales for one quarter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GrowthRecord {
    pub quarter: Quarter,
    pub actual_total: f64,
    pub forecast_total: f64,
    /// `None` when the actual baseline is zero.
    pub growth_pct: Option<f64>,
}

impl GrowthRecord {
    fn new(quarter: Quarter, actual_total: f64, forecast_total: f64) -> Self {
        let growth_pct = (actual_total != 0.0)
            .then(|| (forecast_total - actual_total) / actual_total * 100.0);
        Self {
            quarter,
            actual_total,
            forecast_total,
            growth_pct,
        }
    }

    pub fn is_defined(&self) -> bool {
        self.growth_pct.is_some()
    }
}

/// Per-quarter growth and the extreme quarters among those with a defined growth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthComparison {
    /// All four quarters in calendar order, defined or not.
    pub records: Vec<GrowthRecord>,
    pub highest: GrowthRecord,
    pub lowest: GrowthRecord,
}

impl GrowthComparison {
    pub fn record(&self, quarter: Quarter) -> Option<&GrowthRecord> {
        self.records.iter().find(|r| r.quarter == quarter)
    }

    /// Quarters excluded from ranking because their baseline is zero.
    pub fn undefined_quarters(&self) -> Vec<Quarter> {
        self.records
            .iter()
            .filter(|r| !r.is_defined())
            .map(|r| r.quarter)
            .collect()
    }
}

/// Compare the last 52 weeks of actuals with the next 52 forecast weeks, quarter by quarter.
///
/// Actual week offset `k` is the k-th week of the trailing year, so the
/// last observed week is offset 52. Weeks before the start of the series
/// count as zero sales. Ties in ranking go to the earlier quarter.
pub fn compare_growth(actuals: &[f64], forecast: &ForecastResult) -> Result<GrowthComparison> {
    let mut forecast_year = vec![0.0; WEEKS_PER_YEAR];
    let mut covered = 0;
    for record in forecast.records() {
        if (1..=WEEKS_PER_YEAR).contains(&record.week_offset) {
            forecast_year[record.week_offset - 1] = record.point;
            covered += 1;
        }
    }
    if covered < WEEKS_PER_YEAR {
        return Err(ForecastError::HorizonTooShort {
            needed: WEEKS_PER_YEAR,
            got: covered,
        });
    }

    let actual_at = |offset: usize| -> f64 {
        (actuals.len() + offset)
            .checked_sub(WEEKS_PER_YEAR + 1)
            .and_then(|i| actuals.get(i))
            .copied()
            .unwrap_or(0.0)
    };

    let records: Vec<GrowthRecord> = Quarter::ALL
        .iter()
        .map(|&quarter| {
            let offsets = quarter.window().offsets();
            let actual_total: f64 = offsets.clone().map(actual_at).sum();
            let forecast_total: f64 = offsets.map(|k| forecast_year[k - 1]).sum();
            GrowthRecord::new(quarter, actual_total, forecast_total)
        })
        .collect();

    let mut highest: Option<GrowthRecord> = None;
    let mut lowest: Option<GrowthRecord> = None;
    for record in records.iter().filter(|r| r.is_defined()) {
        let growth = record.growth_pct.unwrap_or(f64::NAN);
        if highest.map_or(true, |h| growth > h.growth_pct.unwrap_or(f64::NEG_INFINITY)) {
            highest = Some(*record);
        }
        if lowest.map_or(true, |l| growth < l.growth_pct.unwrap_or(f64::INFINITY)) {
            lowest = Some(*record);
        }
    }

    match (highest, lowest) {
        (Some(highest), Some(lowest)) => Ok(GrowthComparison {
            records,
            highest,
            lowest,
        }),
        _ => Err(ForecastError::NoDefinedGrowth),
    }
}
