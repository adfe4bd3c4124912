//! Automatic seasonal ARIMA order selection.
//!
//! Differencing orders are chosen first (seasonal strength for D, repeated
//! KPSS for d), then AR/MA orders are searched stepwise (or exhaustively) and
//! the converged candidate with the lowest AICc wins. If no seasonal candidate
//! converges, a second non-seasonal pass runs on the raw series.

use crate::config::SelectorConfig;
use crate::core::{ConfidenceLevel, ForecastResult, WeeklySeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::diff::seasonal_difference;
use crate::models::arima::model::{Sarima, SarimaOrder};
use crate::models::Forecaster;
use crate::validation::{ljung_box, seasonal_differences, unit_root_differences, LjungBoxResult};
use serde::Serialize;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// One evaluated order and its score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandidateFit {
    pub order: SarimaOrder,
    /// `+inf` when the fit failed.
    pub aicc: f64,
    pub converged: bool,
}

/// Summary of the selected model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitDiagnostics {
    pub order: SarimaOrder,
    pub aicc: f64,
    pub aic: f64,
    pub bic: f64,
    pub log_likelihood: f64,
    /// Residual variance.
    pub sigma2: f64,
    /// Residuals entering the likelihood.
    pub n_used: usize,
    pub candidates_evaluated: usize,
    /// True when the model came from the non-seasonal pass.
    pub seasonal_fallback: bool,
    pub ljung_box: LjungBoxResult,
}

/// A model selected and fitted for one series snapshot.
#[derive(Debug, Clone)]
pub struct FittedModel {
    model: Sarima,
    diagnostics: FitDiagnostics,
    candidates: Vec<CandidateFit>,
}

impl FittedModel {
    pub fn order(&self) -> SarimaOrder {
        self.diagnostics.order
    }

    pub fn diagnostics(&self) -> &FitDiagnostics {
        &self.diagnostics
    }

    /// Every candidate evaluated during the search, in evaluation order.
    pub fn candidates(&self) -> &[CandidateFit] {
        &self.candidates
    }

    pub fn model(&self) -> &Sarima {
        &self.model
    }

    /// Point forecasts and prediction intervals for weeks 1..=horizon.
    pub fn forecast(&self, horizon: usize, level: ConfidenceLevel) -> Result<ForecastResult> {
        if horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon must be at least 1".to_string(),
            ));
        }
        self.model.predict_with_intervals(horizon, level)
    }
}

/// Search space of one pass.
#[derive(Debug, Clone, Copy)]
struct PassLimits {
    d: usize,
    cap_d: usize,
    s: usize,
    max_p: usize,
    max_q: usize,
    max_cap_p: usize,
    max_cap_q: usize,
    burn_in: usize,
}

impl PassLimits {
    fn order(&self, p: usize, q: usize, cap_p: usize, cap_q: usize) -> SarimaOrder {
        if self.s > 1 && (cap_p > 0 || self.cap_d > 0 || cap_q > 0) {
            SarimaOrder::new((p, self.d, q), (cap_p, self.cap_d, cap_q), self.s)
        } else {
            SarimaOrder::non_seasonal(p, self.d, q)
        }
    }

    fn admits(&self, p: usize, q: usize, cap_p: usize, cap_q: usize) -> bool {
        p <= self.max_p && q <= self.max_q && cap_p <= self.max_cap_p && cap_q <= self.max_cap_q
    }

    /// Starting models of the stepwise search, clamped to the limits.
    fn initial_orders(&self) -> Vec<SarimaOrder> {
        let mut orders = Vec::with_capacity(4);
        for (p, q, cap_p, cap_q) in [(2, 2, 1, 1), (0, 0, 0, 0), (1, 0, 1, 0), (0, 1, 0, 1)] {
            let order = self.order(
                p.min(self.max_p),
                q.min(self.max_q),
                cap_p.min(self.max_cap_p),
                cap_q.min(self.max_cap_q),
            );
            if !orders.contains(&order) {
                orders.push(order);
            }
        }
        orders
    }

    /// Orders one step away from `current`.
    fn neighbours(&self, current: SarimaOrder) -> Vec<SarimaOrder> {
        let base = [
            current.p as isize,
            current.q as isize,
            current.cap_p as isize,
            current.cap_q as isize,
        ];
        let moves: [[isize; 4]; 12] = [
            [-1, 0, 0, 0],
            [1, 0, 0, 0],
            [0, -1, 0, 0],
            [0, 1, 0, 0],
            [0, 0, -1, 0],
            [0, 0, 1, 0],
            [0, 0, 0, -1],
            [0, 0, 0, 1],
            [-1, -1, 0, 0],
            [1, 1, 0, 0],
            [0, 0, -1, -1],
            [0, 0, 1, 1],
        ];
        moves
            .iter()
            .filter_map(|step| {
                let next = base
                    .iter()
                    .zip(step)
                    .map(|(b, d)| usize::try_from(b + d).ok())
                    .collect::<Option<Vec<usize>>>()?;
                let (p, q, cap_p, cap_q) = (next[0], next[1], next[2], next[3]);
                self.admits(p, q, cap_p, cap_q)
                    .then(|| self.order(p, q, cap_p, cap_q))
            })
            .collect()
    }

    fn all_orders(&self) -> Vec<SarimaOrder> {
        let mut orders = Vec::new();
        for p in 0..=self.max_p {
            for q in 0..=self.max_q {
                for cap_p in 0..=self.max_cap_p {
                    for cap_q in 0..=self.max_cap_q {
                        orders.push(self.order(p, q, cap_p, cap_q));
                    }
                }
            }
        }
        orders
    }
}

/// State of one selection call.
struct Search<'a> {
    series: &'a WeeklySeries,
    max_models: usize,
    /// Candidate limit of the running pass.
    pass_limit: usize,
    deadline: Option<Instant>,
    candidates: Vec<CandidateFit>,
    best: Option<(Sarima, f64)>,
}

impl Search<'_> {
    fn exhausted(&self) -> bool {
        self.candidates.len() >= self.pass_limit || self.out_of_time()
    }

    fn out_of_time(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Fit one order. Returns its AICc when it converged.
    fn evaluate(&mut self, order: SarimaOrder, burn_in: usize) -> Option<f64> {
        let mut model = Sarima::new(order);
        let outcome = model
            .fit_conditioned(self.series, burn_in)
            .ok()
            .and_then(|_| model.statistics().copied());

        let (aicc, converged) = match outcome {
            Some(stats) => (stats.aicc, stats.converged && stats.aicc.is_finite()),
            None => (f64::INFINITY, false),
        };
        debug!(%order, aicc, converged, "evaluated candidate");
        self.candidates.push(CandidateFit {
            order,
            aicc,
            converged,
        });

        if !converged {
            return None;
        }
        let improves = self.best.as_ref().map_or(true, |(_, best)| aicc < *best);
        if improves {
            self.best = Some((model, aicc));
        }
        Some(aicc)
    }

    /// Evaluate `order` unless this pass already did; true when it becomes the pass best.
    fn try_order(&mut self, pass: &mut PassState, order: SarimaOrder, burn_in: usize) -> bool {
        if !pass.visited.insert(order) {
            return false;
        }
        match self.evaluate(order, burn_in) {
            Some(aicc) if pass.best.map_or(true, |(_, best)| aicc < best) => {
                pass.best = Some((order, aicc));
                true
            }
            _ => false,
        }
    }

    /// Seasonal pass within its share of the budget, then a non-seasonal pass
    /// when it found nothing. Returns true when the non-seasonal pass ran.
    fn run(
        &mut self,
        seasonal: Option<PassLimits>,
        non_seasonal: impl FnOnce() -> PassLimits,
        stepwise: bool,
    ) -> bool {
        let Some(limits) = seasonal else {
            debug!(
                series = self.series.label(),
                weeks = self.series.len(),
                "series too short for seasonal terms"
            );
            self.run_pass(&non_seasonal(), stepwise);
            return true;
        };

        self.pass_limit = seasonal_share(self.max_models);
        self.run_pass(&limits, stepwise);
        self.pass_limit = self.max_models;
        if self.best.is_some() || self.exhausted() {
            return false;
        }

        warn!(
            series = self.series.label(),
            evaluated = self.candidates.len(),
            "no seasonal candidate converged, retrying without seasonal terms"
        );
        self.run_pass(&non_seasonal(), stepwise);
        true
    }

    fn run_pass(&mut self, limits: &PassLimits, stepwise: bool) {
        let mut pass = PassState::default();

        if !stepwise {
            for order in limits.all_orders() {
                if self.exhausted() {
                    break;
                }
                self.try_order(&mut pass, order, limits.burn_in);
            }
            return;
        }

        for order in limits.initial_orders() {
            if self.exhausted() {
                return;
            }
            self.try_order(&mut pass, order, limits.burn_in);
        }

        'search: while let Some((current, _)) = pass.best {
            for next in limits.neighbours(current) {
                if self.exhausted() {
                    break 'search;
                }
                if self.try_order(&mut pass, next, limits.burn_in) {
                    continue 'search;
                }
            }
            break;
        }
    }
}

/// Orders visited by one pass and its best converged candidate.
#[derive(Default)]
struct PassState {
    visited: HashSet<SarimaOrder>,
    best: Option<(SarimaOrder, f64)>,
}

/// Candidates the seasonal pass may use; the rest stay reserved for the
/// non-seasonal fallback.
fn seasonal_share(max_models: usize) -> usize {
    if max_models < 2 {
        max_models
    } else {
        max_models - (max_models / 4).max(1)
    }
}

/// Automatic seasonal ARIMA selector.
///
/// Stateless between calls: the same series and configuration always yield
/// the same model (unless a wall-clock budget cuts the search short).
#[derive(Debug, Clone, Default)]
pub struct ModelSelector {
    config: SelectorConfig,
}

impl ModelSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Seasonal pass limits, or `None` when the series cannot support one.
    fn seasonal_limits(&self, series: &WeeklySeries) -> Option<PassLimits> {
        let c = &self.config;
        let s = series.period();
        if s < 2 || !series.supports_seasonal_fit() {
            return None;
        }
        if c.max_cap_p == 0 && c.max_cap_d == 0 && c.max_cap_q == 0 {
            return None;
        }

        let values = series.values();
        let cap_d = seasonal_differences(values, s, c.max_cap_d);
        let d = unit_root_differences(&seasonal_difference(values, cap_d, s), c.max_d);

        // Seasonal AR lags eat into the sample; drop P until the largest model fits.
        let mut max_cap_p = c.max_cap_p;
        while max_cap_p > 0 {
            let largest =
                SarimaOrder::new((c.max_p, d, c.max_q), (max_cap_p, cap_d, c.max_cap_q), s);
            if Sarima::min_length(largest, 0) <= values.len() {
                break;
            }
            max_cap_p -= 1;
        }

        debug!(d, cap_d, max_cap_p, "seasonal differencing chosen");
        Some(PassLimits {
            d,
            cap_d,
            s,
            max_p: c.max_p,
            max_q: c.max_q,
            max_cap_p,
            max_cap_q: c.max_cap_q,
            burn_in: c.max_p + s * max_cap_p,
        })
    }

    fn non_seasonal_limits(&self, series: &WeeklySeries) -> PassLimits {
        let c = &self.config;
        let d = unit_root_differences(series.values(), c.max_d);
        debug!(d, "non-seasonal differencing chosen");
        PassLimits {
            d,
            cap_d: 0,
            s: 0,
            max_p: c.max_p,
            max_q: c.max_q,
            max_cap_p: 0,
            max_cap_q: 0,
            burn_in: c.max_p,
        }
    }

    /// Search the configured order space and fit the best candidate.
    pub fn select(&self, series: &WeeklySeries) -> Result<FittedModel> {
        self.config.validate()?;
        let started = Instant::now();
        let max_models = self.config.max_models;
        let mut search = Search {
            series,
            max_models,
            pass_limit: max_models,
            deadline: self.config.fit_budget().map(|budget| started + budget),
            candidates: Vec::new(),
            best: None,
        };

        let seasonal_fallback = search.run(
            self.seasonal_limits(series),
            || self.non_seasonal_limits(series),
            self.config.stepwise,
        );

        let Search {
            candidates, best, ..
        } = search;
        let Some((model, _)) = best else {
            if candidates.len() >= max_models
                || started.elapsed() >= self.config.fit_budget().unwrap_or(Duration::MAX)
            {
                warn!(
                    series = series.label(),
                    evaluated = candidates.len(),
                    "search budget exhausted without a converged candidate"
                );
            }
            return Err(ForecastError::NonConvergent(format!(
                "{}: none of {} candidate orders converged",
                series.label(),
                candidates.len()
            )));
        };

        let diagnostics = Self::diagnose(&model, candidates.len(), seasonal_fallback)?;
        info!(
            series = series.label(),
            order = %diagnostics.order,
            aicc = diagnostics.aicc,
            evaluated = candidates.len(),
            "selected model"
        );

        Ok(FittedModel {
            model,
            diagnostics,
            candidates,
        })
    }

    fn diagnose(
        model: &Sarima,
        candidates_evaluated: usize,
        seasonal_fallback: bool,
    ) -> Result<FitDiagnostics> {
        let stats = model.statistics().ok_or(ForecastError::FitRequired)?;
        let order = model.order();
        let residuals = model.residuals().ok_or(ForecastError::FitRequired)?;
        let arma_terms = order.p + order.q + order.cap_p + order.cap_q;

        Ok(FitDiagnostics {
            order,
            aicc: stats.aicc,
            aic: stats.aic,
            bic: stats.bic,
            log_likelihood: stats.log_likelihood,
            sigma2: stats.sigma2,
            n_used: stats.n_used,
            candidates_evaluated,
            seasonal_fallback,
            ljung_box: ljung_box(residuals, None, arma_terms),
        })
    }
}
