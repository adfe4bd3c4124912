//! Engine and order-search configuration.
//!
//! Both structs use `Default` plus `with_*` builders and can be loaded from
//! TOML; omitted keys keep their defaults.
//!
//! ```
//! use weekcast::config::EngineConfig;
//!
//! let config = EngineConfig::from_toml_str(
//!     r#"
//!     default_confidence = 80.0
//!     [selector]
//!     max_models = 20
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(config.selector.max_models, 20);
//! assert_eq!(config.period, 52);
//! ```

use crate::core::{ConfidenceLevel, WEEKS_PER_YEAR};
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Bounds and budget of the automatic seasonal order search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Maximum non-seasonal AR order to consider.
    pub max_p: usize,
    /// Maximum non-seasonal differencing order.
    pub max_d: usize,
    /// Maximum non-seasonal MA order to consider.
    pub max_q: usize,
    /// Maximum seasonal AR order.
    pub max_cap_p: usize,
    /// Maximum seasonal differencing order.
    pub max_cap_d: usize,
    /// Maximum seasonal MA order.
    pub max_cap_q: usize,
    /// Use stepwise search (faster) vs exhaustive.
    pub stepwise: bool,
    /// Maximum number of candidate fits per search.
    pub max_models: usize,
    /// Optional wall-clock budget for one search, in milliseconds.
    pub fit_budget_ms: Option<u64>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            max_p: 2,
            max_d: 2,
            max_q: 2,
            max_cap_p: 1,
            max_cap_d: 1,
            max_cap_q: 1,
            stepwise: true,
            max_models: 64,
            fit_budget_ms: None,
        }
    }
}

impl SelectorConfig {
    /// Set maximum non-seasonal orders.
    pub fn with_max_orders(mut self, max_p: usize, max_d: usize, max_q: usize) -> Self {
        self.max_p = max_p;
        self.max_d = max_d;
        self.max_q = max_q;
        self
    }

    /// Set maximum seasonal orders.
    pub fn with_seasonal_orders(mut self, max_p: usize, max_d: usize, max_q: usize) -> Self {
        self.max_cap_p = max_p;
        self.max_cap_d = max_d;
        self.max_cap_q = max_q;
        self
    }

    /// Use exhaustive search instead of stepwise.
    pub fn exhaustive(mut self) -> Self {
        self.stepwise = false;
        self
    }

    pub fn with_max_models(mut self, max_models: usize) -> Self {
        self.max_models = max_models;
        self
    }

    pub fn with_fit_budget(mut self, budget: Duration) -> Self {
        self.fit_budget_ms = Some(budget.as_millis() as u64);
        self
    }

    pub fn fit_budget(&self) -> Option<Duration> {
        self.fit_budget_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_models == 0 {
            return Err(ForecastError::InvalidParameter(
                "selector.max_models must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seasonal period of every built series.
    pub period: usize,
    /// Confidence level used when a query does not carry one.
    pub default_confidence: ConfidenceLevel,
    /// Upper bound on model fits running at once.
    pub max_concurrent_fits: usize,
    /// Memoize fitted models and forecasts.
    pub cache_enabled: bool,
    /// Forecasts kept in the cache; the oldest is evicted first.
    pub forecast_cache_capacity: usize,
    /// Last week treated as actual data; later weeks are ignored.
    pub actuals_cutoff: Option<u32>,
    pub selector: SelectorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            period: WEEKS_PER_YEAR,
            default_confidence: ConfidenceLevel::default(),
            max_concurrent_fits: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            cache_enabled: true,
            forecast_cache_capacity: 256,
            actuals_cutoff: None,
            selector: SelectorConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_selector(mut self, selector: SelectorConfig) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_period(mut self, period: usize) -> Self {
        self.period = period;
        self
    }

    pub fn with_max_concurrent_fits(mut self, workers: usize) -> Self {
        self.max_concurrent_fits = workers;
        self
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_forecast_cache_capacity(mut self, capacity: usize) -> Self {
        self.forecast_cache_capacity = capacity;
        self
    }

    pub fn with_actuals_cutoff(mut self, week: u32) -> Self {
        self.actuals_cutoff = Some(week);
        self
    }

    pub fn with_default_confidence(mut self, level: ConfidenceLevel) -> Self {
        self.default_confidence = level;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.period == 0 {
            return Err(ForecastError::InvalidParameter(
                "period must be positive".to_string(),
            ));
        }
        if self.forecast_cache_capacity == 0 {
            return Err(ForecastError::InvalidParameter(
                "forecast_cache_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_concurrent_fits == 0 {
            return Err(ForecastError::InvalidParameter(
                "max_concurrent_fits must be at least 1".to_string(),
            ));
        }
        self.selector.validate()
    }
}
