//! Query resolution and forecast generation.
//!
//! A [`ForecastQuery`] is resolved once into a [`ForecastPlan`] (horizon to
//! generate plus an optional quarter slice), so weekly and quarterly requests
//! share a single code path.

mod query;

pub use query::{generate_forecast, ForecastPlan, ForecastQuery};
