//! Forecaster trait defining the common interface for fitted models.

use crate::core::{ConfidenceLevel, ForecastResult, WeeklySeries};
use crate::error::Result;

/// Common interface for forecasting models.
///
/// This trait is object-safe and can be used with `Box<dyn Forecaster>`.
pub trait Forecaster {
    /// Fit the model to a weekly series.
    fn fit(&mut self, series: &WeeklySeries) -> Result<()>;

    /// Point forecasts for weeks 1..=horizon after the last observation.
    fn predict(&self, horizon: usize) -> Result<Vec<f64>>;

    /// Point forecasts with two-sided prediction intervals.
    ///
    /// Point values do not depend on `level`.
    fn predict_with_intervals(
        &self,
        horizon: usize,
        level: ConfidenceLevel,
    ) -> Result<ForecastResult>;

    /// In-sample one-step residuals.
    fn residuals(&self) -> Option<&[f64]>;

    /// Get the model name.
    fn name(&self) -> &str;

    /// Check if the model has been fitted.
    fn is_fitted(&self) -> bool {
        self.residuals().is_some()
    }
}

/// Type alias for boxed forecaster trait objects.
///
/// # Example
///
/// ```
/// use weekcast::models::arima::{Sarima, SarimaOrder};
/// use weekcast::models::{BoxedForecaster, Forecaster};
///
/// let model: BoxedForecaster = Box::new(Sarima::new(SarimaOrder::non_seasonal(1, 0, 0)));
/// assert_eq!(model.name(), "ARIMA");
/// assert!(!model.is_fitted());
/// ```
pub type BoxedForecaster = Box<dyn Forecaster + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::arima::{Sarima, SarimaOrder};

    fn make_test_series(n: usize) -> WeeklySeries {
        let values: Vec<f64> = (1..=n).map(|i| 50.0 + (i % 5) as f64).collect();
        WeeklySeries::weekly("test", values).unwrap()
    }

    #[test]
    fn boxed_forecaster_fit_predict() {
        let mut model: BoxedForecaster = Box::new(Sarima::new(SarimaOrder::non_seasonal(0, 1, 0)));
        let series = make_test_series(20);

        assert!(model.fit(&series).is_ok());
        assert!(model.is_fitted());

        let forecast = model.predict(5).unwrap();
        assert_eq!(forecast.len(), 5);
    }

    #[test]
    fn boxed_forecaster_with_intervals() {
        let mut model: BoxedForecaster = Box::new(Sarima::new(SarimaOrder::non_seasonal(1, 0, 0)));
        model.fit(&make_test_series(40)).unwrap();

        let result = model
            .predict_with_intervals(5, ConfidenceLevel::new(80.0).unwrap())
            .unwrap();
        assert_eq!(result.horizon(), 5);
        assert_eq!(result.level().percent(), 80.0);
        assert!(result.records().iter().all(|r| r.lower <= r.upper));
    }

    #[test]
    fn point_forecasts_ignore_level() {
        let mut model = Sarima::new(SarimaOrder::non_seasonal(1, 0, 1));
        model.fit(&make_test_series(60)).unwrap();

        let narrow = model
            .predict_with_intervals(6, ConfidenceLevel::new(50.0).unwrap())
            .unwrap();
        let wide = model
            .predict_with_intervals(6, ConfidenceLevel::new(99.0).unwrap())
            .unwrap();
        assert_eq!(narrow.points(), wide.points());
        assert_eq!(narrow.points(), model.predict(6).unwrap());
    }

    #[test]
    fn residuals_available_after_fit() {
        let mut model = Sarima::new(SarimaOrder::non_seasonal(0, 1, 0));
        assert!(model.residuals().is_none());

        model.fit(&make_test_series(20)).unwrap();
        // One observation is consumed by differencing.
        assert_eq!(model.residuals().unwrap().len(), 19);
    }
}
