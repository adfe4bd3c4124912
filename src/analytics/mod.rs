//! Derived analytics over forecasts: window statistics and quarter growth.

mod growth;
mod summary;

pub use growth::{compare_growth, GrowthComparison, GrowthRecord};
pub use summary::{summarize, summarize_values, ForecastSummary};
