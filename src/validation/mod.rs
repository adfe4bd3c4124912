//! Statistical tests used by order selection and fit diagnostics.
//!
//! # Example
//!
//! ```
//! use weekcast::validation::{kpss_test, ljung_box, unit_root_differences};
//!
//! let series: Vec<f64> = (0..120).map(|i| 10.0 + 0.5 * i as f64).collect();
//! assert!(!kpss_test(&series, None).is_stationary);
//! assert!(unit_root_differences(&series, 2) >= 1);
//!
//! let residuals = vec![0.1, -0.2, 0.15, -0.1, 0.05, -0.08, 0.12, -0.15, 0.1, -0.05];
//! let lb = ljung_box(&residuals, Some(3), 0);
//! assert!(lb.statistic.is_finite());
//! ```

pub mod residual_tests;
pub mod stationarity;

pub use residual_tests::{ljung_box, LjungBoxResult};
pub use stationarity::{
    kpss_test, seasonal_differences, unit_root_differences, CriticalValues, StationarityResult,
};
