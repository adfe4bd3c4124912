//! Seasonal ARIMA (Autoregressive Integrated Moving Average) models.
//!
//! This module provides:
//! - SARIMA(p, d, q)(P, D, Q)\[s\] fitted by conditional sum of squares
//! - Automatic order selection by AICc over a bounded search space
//! - Differencing and lag-polynomial helpers

mod diff;
mod model;
mod selector;

pub use diff::{difference, seasonal_difference};
pub use model::{FitStatistics, Sarima, SarimaCoefficients, SarimaOrder};
pub use selector::{CandidateFit, FitDiagnostics, FittedModel, ModelSelector};
