//! # weekcast
//!
//! Seasonal demand forecasting and growth analytics for multi-location weekly
//! sales data.
//!
//! A query flows through the crate's modules in order:
//! - [`series`] aggregates raw observations into a gap-free weekly series,
//! - [`models::arima`] selects and fits a seasonal ARIMA model by AICc,
//! - [`forecast`] produces point forecasts with prediction intervals,
//! - [`analytics`] summarises forecast windows and compares quarter growth.
//!
//! [`engine::ForecastEngine`] wraps the pipeline behind the query interface
//! and memoizes fitted models.

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::needless_range_loop)]

pub mod analytics;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod models;
pub mod series;
pub mod utils;
pub mod validation;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::analytics::{summarize, ForecastSummary, GrowthComparison, GrowthRecord};
    pub use crate::config::{EngineConfig, SelectorConfig};
    pub use crate::core::{
        ConfidenceLevel, EntityId, EntitySelector, ForecastRecord, ForecastResult, Observation,
        Quarter, SalesTable, WeeklySeries,
    };
    pub use crate::engine::{ComparisonReport, ForecastEngine, ForecastRequest};
    pub use crate::error::{ErrorCategory, ForecastError, Result};
    pub use crate::forecast::ForecastQuery;
    pub use crate::models::arima::{FittedModel, ModelSelector};
    pub use crate::models::Forecaster;
}
