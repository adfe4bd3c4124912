//! Error types for the weekcast engine.

use crate::core::EntityId;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Coarse classification of failures, used by callers to decide how to
/// render an "unavailable" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Empty or unknown entity, gaps in a series, malformed raw data.
    InputData,
    /// Order search did not produce a usable model.
    ModelFit,
    /// Empty statistics range or degenerate horizon selection.
    Range,
    /// Every quarter has a zero baseline.
    GrowthUndefined,
}

/// Errors that can occur while building series, fitting models or deriving analytics.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// The selected observations produced no rows.
    #[error("empty series: no observations matched the selection")]
    EmptySeries,

    /// A specific entity identifier matched no observations.
    #[error("unknown entity: {0}")]
    UnknownEntity(EntityId),

    /// Consecutive weeks are missing from the built series.
    #[error("gap in series for {selector}: week {after_week} is followed by week {next_week}")]
    SeriesGap {
        selector: String,
        after_week: u32,
        next_week: u32,
    },

    /// Two observations share the same (entity, week) key.
    #[error("duplicate observation for entity {entity} at week {week}")]
    DuplicateObservation { entity: EntityId, week: u32 },

    /// An observation violates the raw data contract.
    #[error("invalid observation: {0}")]
    InvalidObservation(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// No candidate order produced a converged fit.
    #[error("no model could be fitted: {0}")]
    NonConvergent(String),

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// The requested statistics range selects no forecast records.
    #[error("statistics range selects no forecast records")]
    EmptyRange,

    /// The forecast does not cover the weeks a computation needs.
    #[error("forecast horizon too short: need {needed} weeks, got {got}")]
    HorizonTooShort { needed: usize, got: usize },

    /// Every quarter has a zero actual baseline.
    #[error("no growth data available: every quarter has zero actual sales")]
    NoDefinedGrowth,

    /// Reading raw data or configuration failed.
    #[error("data source error: {0}")]
    DataSource(String),
}

impl ForecastError {
    /// Map the error onto the engine's failure taxonomy.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ForecastError::EmptySeries
            | ForecastError::UnknownEntity(_)
            | ForecastError::SeriesGap { .. }
            | ForecastError::DuplicateObservation { .. }
            | ForecastError::InvalidObservation(_)
            | ForecastError::InvalidParameter(_)
            | ForecastError::DataSource(_) => ErrorCategory::InputData,
            ForecastError::InsufficientData { .. }
            | ForecastError::NonConvergent(_)
            | ForecastError::FitRequired => ErrorCategory::ModelFit,
            ForecastError::EmptyRange | ForecastError::HorizonTooShort { .. } => {
                ErrorCategory::Range
            }
            ForecastError::NoDefinedGrowth => ErrorCategory::GrowthUndefined,
        }
    }

    /// Whether retrying the same query could succeed. Fits are deterministic,
    /// so nothing in the engine is retryable.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Every failure renders as "unavailable", never as a default number.
    pub fn is_unavailable(&self) -> bool {
        true
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::DataSource(err.to_string())
    }
}

impl From<std::io::Error> for ForecastError {
    fn from(err: std::io::Error) -> Self {
        ForecastError::DataSource(err.to_string())
    }
}

impl From<toml::de::Error> for ForecastError {
    fn from(err: toml::de::Error) -> Self {
        ForecastError::DataSource(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = ForecastError::EmptySeries;
        assert_eq!(
            err.to_string(),
            "empty series: no observations matched the selection"
        );

        let err = ForecastError::UnknownEntity(EntityId::from("store-9"));
        assert_eq!(err.to_string(), "unknown entity: store-9");

        let err = ForecastError::SeriesGap {
            selector: "all".to_string(),
            after_week: 4,
            next_week: 7,
        };
        assert_eq!(
            err.to_string(),
            "gap in series for all: week 4 is followed by week 7"
        );

        let err = ForecastError::InsufficientData { needed: 10, got: 5 };
        assert_eq!(
            err.to_string(),
            "insufficient data: need at least 10, got 5"
        );

        let err = ForecastError::HorizonTooShort { needed: 52, got: 13 };
        assert_eq!(
            err.to_string(),
            "forecast horizon too short: need 52 weeks, got 13"
        );
    }

    #[test]
    fn errors_map_onto_taxonomy() {
        assert_eq!(ForecastError::EmptySeries.category(), ErrorCategory::InputData);
        assert_eq!(
            ForecastError::UnknownEntity(EntityId::from(3u32)).category(),
            ErrorCategory::InputData
        );
        assert_eq!(
            ForecastError::NonConvergent("x".into()).category(),
            ErrorCategory::ModelFit
        );
        assert_eq!(ForecastError::EmptyRange.category(), ErrorCategory::Range);
        assert_eq!(
            ForecastError::NoDefinedGrowth.category(),
            ErrorCategory::GrowthUndefined
        );
        assert!(!ForecastError::NonConvergent("x".into()).is_retryable());
        assert!(ForecastError::NoDefinedGrowth.is_unavailable());
    }

    #[test]
    fn errors_are_clonable_and_comparable() {
        let err1 = ForecastError::EmptyRange;
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }
}
