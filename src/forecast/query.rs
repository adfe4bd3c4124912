use crate::core::{ConfidenceLevel, ForecastResult, Quarter, QuarterWindow, WEEKS_PER_YEAR};
use crate::error::{ForecastError, Result};
use crate::models::arima::FittedModel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a caller wants forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForecastQuery {
    /// The next `horizon` weeks.
    Weekly { horizon: usize },
    /// One quarter of the next 52 weeks.
    Quarterly { quarter: Quarter },
}

impl ForecastQuery {
    pub fn weekly(horizon: usize) -> Self {
        ForecastQuery::Weekly { horizon }
    }

    pub fn quarterly(quarter: Quarter) -> Self {
        ForecastQuery::Quarterly { quarter }
    }

    /// Canonical horizon and slice for this query.
    ///
    /// Quarterly queries always generate the full year and slice afterwards.
    pub fn plan(&self) -> Result<ForecastPlan> {
        match *self {
            ForecastQuery::Weekly { horizon: 0 } => Err(ForecastError::InvalidParameter(
                "horizon must be at least 1 week".to_string(),
            )),
            ForecastQuery::Weekly { horizon } => Ok(ForecastPlan {
                horizon,
                slice: None,
            }),
            ForecastQuery::Quarterly { quarter } => Ok(ForecastPlan {
                horizon: WEEKS_PER_YEAR,
                slice: Some(quarter.window()),
            }),
        }
    }
}

impl fmt::Display for ForecastQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForecastQuery::Weekly { horizon } => write!(f, "weekly h={horizon}"),
            ForecastQuery::Quarterly { quarter } => write!(f, "quarterly {quarter}"),
        }
    }
}

/// Horizon to generate and the offsets to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForecastPlan {
    pub horizon: usize,
    pub slice: Option<QuarterWindow>,
}

/// Forecast `model` according to `plan`.
///
/// Sliced records keep their full-year week offsets.
pub fn generate_forecast(
    model: &FittedModel,
    plan: &ForecastPlan,
    level: ConfidenceLevel,
) -> Result<ForecastResult> {
    let full = model.forecast(plan.horizon, level)?;
    Ok(match plan.slice {
        Some(window) => full.slice(window.offsets()),
        None => full,
    })
}
