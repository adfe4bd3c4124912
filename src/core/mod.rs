//! Core data structures: raw observations, weekly series, forecasts and quarters.

mod forecast;
mod observation;
mod quarter;
mod series;

pub use forecast::{ConfidenceLevel, ForecastRecord, ForecastResult};
pub use observation::{EntityId, EntitySelector, Observation, SalesTable};
pub use quarter::{Quarter, QuarterWindow, WEEKS_PER_QUARTER};
pub use series::{WeeklySeries, WEEKS_PER_YEAR};
