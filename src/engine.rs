//! Query interface tying series construction, model selection, forecasting
//! and analytics together.
//!
//! Each query is independent: it reads the immutable sales table, fits (or
//! reuses) a model for its selector and derives its outputs. Fitted models
//! and forecasts are memoized; `clear_cache` drops both.

use crate::analytics::{
    compare_growth, summarize, summarize_values, ForecastSummary, GrowthComparison,
};
use crate::config::EngineConfig;
use crate::core::{
    ConfidenceLevel, EntitySelector, ForecastResult, Quarter, SalesTable, WeeklySeries,
    WEEKS_PER_YEAR,
};
use crate::error::{ForecastError, Result};
use crate::forecast::{generate_forecast, ForecastQuery};
use crate::models::arima::{FittedModel, ModelSelector};
use crate::series::SeriesBuilder;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::ops::RangeInclusive;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// One forecast query as issued by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForecastRequest {
    pub selector: EntitySelector,
    pub query: ForecastQuery,
    /// Falls back to the engine's default confidence.
    pub confidence: Option<ConfidenceLevel>,
    pub show_intervals: bool,
}

impl ForecastRequest {
    pub fn new(selector: EntitySelector, query: ForecastQuery) -> Self {
        Self {
            selector,
            query,
            confidence: None,
            show_intervals: true,
        }
    }

    pub fn with_confidence(mut self, level: ConfidenceLevel) -> Self {
        self.confidence = Some(level);
        self
    }

    pub fn with_intervals(mut self, show: bool) -> Self {
        self.show_intervals = show;
        self
    }
}

/// Actual versus forecast comparison over one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    /// Mean weekly sales over the trailing 52 actual weeks.
    pub actual_mean: f64,
    pub actual_median: f64,
    /// Mean weekly point forecast over the next 52 weeks.
    pub forecast_mean: f64,
    pub forecast_median: f64,
    /// `None` when every quarter has a zero baseline.
    pub growth: Option<GrowthComparison>,
}

impl ComparisonReport {
    pub fn highest_growth_quarter(&self) -> Result<Quarter> {
        self.growth
            .as_ref()
            .map(|g| g.highest.quarter)
            .ok_or(ForecastError::NoDefinedGrowth)
    }

    pub fn lowest_growth_quarter(&self) -> Result<Quarter> {
        self.growth
            .as_ref()
            .map(|g| g.lowest.quarter)
            .ok_or(ForecastError::NoDefinedGrowth)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ModelKey {
    selector: EntitySelector,
    cutoff: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ForecastKey {
    model: ModelKey,
    query: ForecastQuery,
    level: ConfidenceLevel,
    show_intervals: bool,
}

/// Forecast memo with first-in first-out eviction.
#[derive(Debug)]
struct ForecastCache {
    entries: HashMap<ForecastKey, ForecastResult>,
    order: VecDeque<ForecastKey>,
    capacity: usize,
}

impl ForecastCache {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn get(&self, key: &ForecastKey) -> Option<&ForecastResult> {
        self.entries.get(key)
    }

    fn insert(&mut self, key: ForecastKey, result: ForecastResult) {
        if self.entries.insert(key.clone(), result).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Forecasting engine over one immutable sales table.
///
/// # Example
///
/// ```
/// use weekcast::config::EngineConfig;
/// use weekcast::core::{EntitySelector, Observation, SalesTable};
/// use weekcast::engine::{ForecastEngine, ForecastRequest};
/// use weekcast::forecast::ForecastQuery;
///
/// let rows = (1..=60).map(|w| Observation::new("s1", w, 100.0 + (w % 4) as f64)).collect();
/// let engine = ForecastEngine::new(SalesTable::new(rows).unwrap(), EngineConfig::default()).unwrap();
///
/// let request = ForecastRequest::new(EntitySelector::All, ForecastQuery::weekly(4));
/// let forecast = engine.run_forecast(&request).unwrap();
/// assert_eq!(forecast.horizon(), 4);
///
/// let stats = engine.run_statistics(&forecast, None).unwrap();
/// assert!(stats.total > 0.0);
/// ```
pub struct ForecastEngine {
    table: Arc<SalesTable>,
    config: EngineConfig,
    selector: ModelSelector,
    pool: rayon::ThreadPool,
    models: RwLock<HashMap<ModelKey, Arc<FittedModel>>>,
    forecasts: RwLock<ForecastCache>,
}

impl ForecastEngine {
    pub fn new(table: SalesTable, config: EngineConfig) -> Result<Self> {
        Self::with_shared_table(Arc::new(table), config)
    }

    /// Engine over a table shared with other engines or threads.
    pub fn with_shared_table(table: Arc<SalesTable>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.max_concurrent_fits)
            .thread_name(|i| format!("weekcast-fit-{i}"))
            .build()
            .map_err(|e| ForecastError::InvalidParameter(format!("worker pool: {e}")))?;

        Ok(Self {
            table,
            selector: ModelSelector::new(config.selector.clone()),
            forecasts: RwLock::new(ForecastCache::new(config.forecast_cache_capacity)),
            config,
            pool,
            models: RwLock::new(HashMap::new()),
        })
    }

    pub fn table(&self) -> &SalesTable {
        &self.table
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Actual series for a selector, up to the configured cutoff.
    pub fn actuals(&self, selector: &EntitySelector) -> Result<WeeklySeries> {
        SeriesBuilder::new(&self.table)
            .selector(selector.clone())
            .up_to(self.config.actuals_cutoff)
            .period(self.config.period)
            .build()
    }

    /// Fitted model for a selector, reused from cache when enabled.
    pub fn fit(&self, selector: &EntitySelector) -> Result<Arc<FittedModel>> {
        let key = ModelKey {
            selector: selector.clone(),
            cutoff: self.config.actuals_cutoff,
        };
        if self.config.cache_enabled {
            if let Some(model) = read(&self.models).get(&key) {
                debug!(%selector, "model cache hit");
                return Ok(Arc::clone(model));
            }
        }

        let series = self.actuals(selector)?;
        let model = Arc::new(self.selector.select(&series)?);
        if self.config.cache_enabled {
            write(&self.models).insert(key, Arc::clone(&model));
        }
        Ok(model)
    }

    /// Forecast for one request.
    ///
    /// Changing only the confidence level reuses the fitted model; point
    /// values never depend on it.
    pub fn run_forecast(&self, request: &ForecastRequest) -> Result<ForecastResult> {
        let plan = request.query.plan()?;
        let level = request.confidence.unwrap_or(self.config.default_confidence);
        let key = ForecastKey {
            model: ModelKey {
                selector: request.selector.clone(),
                cutoff: self.config.actuals_cutoff,
            },
            query: request.query,
            level,
            show_intervals: request.show_intervals,
        };
        if self.config.cache_enabled {
            if let Some(result) = read(&self.forecasts).get(&key) {
                debug!(selector = %request.selector, query = %request.query, "forecast cache hit");
                return Ok(result.clone());
            }
        }

        let model = self.fit(&request.selector)?;
        let result =
            generate_forecast(&model, &plan, level)?.with_intervals_visible(request.show_intervals);
        if self.config.cache_enabled {
            write(&self.forecasts).insert(key, result.clone());
        }
        Ok(result)
    }

    /// Total, mean and median of point forecasts, optionally over a range of week offsets.
    pub fn run_statistics(
        &self,
        result: &ForecastResult,
        offsets: Option<RangeInclusive<usize>>,
    ) -> Result<ForecastSummary> {
        summarize(result, offsets)
    }

    /// Trailing-year actuals against the next 52 forecast weeks.
    pub fn run_comparison(&self, selector: &EntitySelector) -> Result<ComparisonReport> {
        let actuals = self.actuals(selector)?;
        let request = ForecastRequest::new(selector.clone(), ForecastQuery::weekly(WEEKS_PER_YEAR));
        let forecast = self.run_forecast(&request)?;

        let actual = summarize_values(actuals.tail(WEEKS_PER_YEAR))?;
        let projected = summarize(&forecast, None)?;
        let growth = match compare_growth(actuals.values(), &forecast) {
            Ok(growth) => Some(growth),
            Err(ForecastError::NoDefinedGrowth) => {
                debug!(%selector, "no quarter has a non-zero baseline");
                None
            }
            Err(e) => return Err(e),
        };

        Ok(ComparisonReport {
            actual_mean: actual.mean,
            actual_median: actual.median,
            forecast_mean: projected.mean,
            forecast_median: projected.median,
            growth,
        })
    }

    /// Run independent requests on the engine's worker pool.
    ///
    /// Results are returned in request order.
    pub fn run_batch(&self, requests: &[ForecastRequest]) -> Vec<Result<ForecastResult>> {
        self.pool
            .install(|| requests.par_iter().map(|r| self.run_forecast(r)).collect())
    }

    /// Number of fitted models held in the cache.
    pub fn cached_models(&self) -> usize {
        read(&self.models).len()
    }

    /// Number of forecasts held in the cache.
    pub fn cached_forecasts(&self) -> usize {
        read(&self.forecasts).len()
    }

    /// Drop every cached model and forecast.
    pub fn clear_cache(&self) {
        write(&self.models).clear();
        write(&self.forecasts).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Observation;
    use approx::assert_relative_eq;

    fn flat_table(weeks: u32, amount: f64) -> SalesTable {
        SalesTable::new(
            (1..=weeks)
                .map(|w| Observation::new("store", w, amount))
                .collect(),
        )
        .unwrap()
    }

    fn engine(table: SalesTable) -> ForecastEngine {
        ForecastEngine::new(table, EngineConfig::default().with_max_concurrent_fits(2)).unwrap()
    }

    #[test]
    fn flat_sales_forecast_flat() {
        let engine = engine(flat_table(104, 1_000_000.0));
        let request = ForecastRequest::new(EntitySelector::All, ForecastQuery::weekly(8));
        let forecast = engine.run_forecast(&request).unwrap();
        let stats = engine.run_statistics(&forecast, None).unwrap();

        assert_relative_eq!(stats.total, 8_000_000.0, max_relative = 1e-6);
        assert_relative_eq!(stats.mean, 1_000_000.0, max_relative = 1e-6);
        assert_relative_eq!(stats.median, 1_000_000.0, max_relative = 1e-6);
    }

    #[test]
    fn confidence_change_reuses_model() {
        let engine = engine(flat_table(80, 50.0));
        let base = ForecastRequest::new(EntitySelector::All, ForecastQuery::weekly(6));
        let narrow = engine
            .run_forecast(&base.clone().with_confidence(ConfidenceLevel::new(80.0).unwrap()))
            .unwrap();
        let wide = engine
            .run_forecast(&base.with_confidence(ConfidenceLevel::new(95.0).unwrap()))
            .unwrap();

        assert_eq!(engine.cached_models(), 1);
        assert_eq!(narrow.points(), wide.points());
        for (n, w) in narrow.records().iter().zip(wide.records()) {
            assert!(w.width() >= n.width());
        }
    }

    #[test]
    fn hidden_intervals_keep_points() {
        let engine = engine(flat_table(80, 50.0));
        let request = ForecastRequest::new(EntitySelector::All, ForecastQuery::weekly(3));
        let shown = engine.run_forecast(&request).unwrap();
        let hidden = engine.run_forecast(&request.with_intervals(false)).unwrap();

        assert!(shown.intervals_visible());
        assert!(!hidden.intervals_visible());
        assert_eq!(shown.points(), hidden.points());
    }

    #[test]
    fn clear_cache_drops_models() {
        let engine = engine(flat_table(60, 10.0));
        engine.fit(&EntitySelector::All).unwrap();
        assert_eq!(engine.cached_models(), 1);
        engine.clear_cache();
        assert_eq!(engine.cached_models(), 0);
        assert_eq!(engine.cached_forecasts(), 0);
    }

    #[test]
    fn forecast_cache_evicts_oldest_entry() {
        let config = EngineConfig::default()
            .with_forecast_cache_capacity(2)
            .with_max_concurrent_fits(1);
        let engine = ForecastEngine::new(flat_table(80, 50.0), config).unwrap();
        let base = ForecastRequest::new(EntitySelector::All, ForecastQuery::weekly(4));

        let first = engine
            .run_forecast(&base.clone().with_confidence(ConfidenceLevel::new(80.5).unwrap()))
            .unwrap();
        for percent in [80.6, 80.7, 80.8] {
            engine
                .run_forecast(&base.clone().with_confidence(ConfidenceLevel::new(percent).unwrap()))
                .unwrap();
        }
        assert_eq!(engine.cached_forecasts(), 2);
        assert_eq!(engine.cached_models(), 1);

        let again = engine
            .run_forecast(&base.with_confidence(ConfidenceLevel::new(80.5).unwrap()))
            .unwrap();
        assert_eq!(again, first);
        assert_eq!(engine.cached_forecasts(), 2);
    }

    #[test]
    fn cache_can_be_disabled() {
        let config = EngineConfig::default().with_cache(false).with_max_concurrent_fits(1);
        let engine = ForecastEngine::new(flat_table(60, 10.0), config).unwrap();
        engine.fit(&EntitySelector::All).unwrap();
        assert_eq!(engine.cached_models(), 0);
    }

    #[test]
    fn cutoff_limits_actuals() {
        let config = EngineConfig::default()
            .with_actuals_cutoff(30)
            .with_max_concurrent_fits(1);
        let engine = ForecastEngine::new(flat_table(60, 10.0), config).unwrap();
        assert_eq!(engine.actuals(&EntitySelector::All).unwrap().len(), 30);
    }

    #[test]
    fn unknown_entity_is_input_error() {
        let engine = engine(flat_table(60, 10.0));
        let request = ForecastRequest::new(EntitySelector::entity("nowhere"), ForecastQuery::weekly(2));
        let err = engine.run_forecast(&request).unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::InputData);
    }

    #[test]
    fn comparison_on_flat_sales() {
        let engine = engine(flat_table(104, 200.0));
        let report = engine.run_comparison(&EntitySelector::All).unwrap();

        assert_relative_eq!(report.actual_mean, 200.0);
        assert_relative_eq!(report.forecast_mean, 200.0, max_relative = 1e-6);
        assert!(report.highest_growth_quarter().is_ok());
    }

    #[test]
    fn comparison_without_baseline_reports_no_growth() {
        let engine = engine(flat_table(60, 0.0));
        let report = engine.run_comparison(&EntitySelector::All).unwrap();
        assert!(report.growth.is_none());
        assert_eq!(
            report.highest_growth_quarter(),
            Err(ForecastError::NoDefinedGrowth)
        );
    }

    #[test]
    fn batch_preserves_request_order() {
        let engine = engine(flat_table(70, 20.0));
        let requests: Vec<ForecastRequest> = (1..=4)
            .map(|h| ForecastRequest::new(EntitySelector::All, ForecastQuery::weekly(h)))
            .collect();
        let results = engine.run_batch(&requests);

        for (h, result) in (1..=4).zip(results) {
            assert_eq!(result.unwrap().horizon(), h);
        }
    }
}
