//! Seasonal ARIMA(p, d, q)(P, D, Q)\[s\] model.
//!
//! Parameters are estimated by minimising the conditional sum of squares of
//! the differenced series, which maximises the conditional Gaussian
//! likelihood. AR and MA polynomials are parameterised through partial
//! autocorrelations in (-1, 1), so every candidate the optimizer visits is
//! stationary and invertible.

use crate::core::{ConfidenceLevel, ForecastResult, WeeklySeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::diff::{
    difference, differencing_operator, lag_operator, poly_mul, seasonal_difference,
};
use crate::models::Forecaster;
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use crate::utils::stats::{mean, root_mean_square};
use serde::Serialize;
use std::f64::consts::PI;
use std::fmt;

/// Partial autocorrelations are kept inside this bound.
const PACF_BOUND: f64 = 0.99;

/// Smallest residual variance, relative to the squared scale of the differenced series.
const VARIANCE_FLOOR: f64 = 1e-12;

/// Model order (p, d, q)(P, D, Q)\[s\].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SarimaOrder {
    /// Non-seasonal AR order.
    pub p: usize,
    /// Non-seasonal differencing order.
    pub d: usize,
    /// Non-seasonal MA order.
    pub q: usize,
    /// Seasonal AR order.
    pub cap_p: usize,
    /// Seasonal differencing order.
    pub cap_d: usize,
    /// Seasonal MA order.
    pub cap_q: usize,
    /// Seasonal period.
    pub s: usize,
}

impl SarimaOrder {
    pub fn new(
        (p, d, q): (usize, usize, usize),
        (cap_p, cap_d, cap_q): (usize, usize, usize),
        s: usize,
    ) -> Self {
        Self {
            p,
            d,
            q,
            cap_p,
            cap_d,
            cap_q,
            s,
        }
    }

    /// ARIMA(p, d, q) without seasonal terms.
    pub fn non_seasonal(p: usize, d: usize, q: usize) -> Self {
        Self::new((p, d, q), (0, 0, 0), 0)
    }

    /// Check if this is a seasonal model.
    pub fn is_seasonal(&self) -> bool {
        self.s > 1 && (self.cap_p > 0 || self.cap_d > 0 || self.cap_q > 0)
    }

    /// A constant mean is estimated only for undifferenced models.
    pub fn includes_mean(&self) -> bool {
        self.d == 0 && self.cap_d == 0
    }

    /// Number of estimated ARMA coefficients plus the mean, if any.
    pub fn num_coefficients(&self) -> usize {
        self.p + self.q + self.cap_p + self.cap_q + usize::from(self.includes_mean())
    }

    /// Largest AR lag on the differenced scale.
    pub fn max_ar_lag(&self) -> usize {
        self.p + self.s * self.cap_p
    }

    /// Observations consumed by differencing.
    pub fn differencing_lag(&self) -> usize {
        self.d + self.s * self.cap_d
    }
}

impl fmt::Display for SarimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)?;
        if self.is_seasonal() {
            write!(
                f,
                "({},{},{})[{}]",
                self.cap_p, self.cap_d, self.cap_q, self.s
            )?;
        }
        Ok(())
    }
}

/// Estimated coefficients in the sign convention
/// `(1 - Σφ B^i)(1 - ΣΦ B^{is}) w_t = (1 + Σθ B^i)(1 + ΣΘ B^{is}) e_t`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SarimaCoefficients {
    pub ar: Vec<f64>,
    pub seasonal_ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub seasonal_ma: Vec<f64>,
    /// Mean of the undifferenced series; `None` when the model differences.
    pub mean: Option<f64>,
}

/// Goodness-of-fit statistics of a fitted model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitStatistics {
    /// Residual variance.
    pub sigma2: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    /// Small-sample corrected AIC.
    pub aicc: f64,
    pub bic: f64,
    /// Residuals entering the likelihood.
    pub n_used: usize,
    /// Whether the optimizer met its tolerance.
    pub converged: bool,
    pub iterations: usize,
}

/// Map partial autocorrelations to the coefficients of a stationary
/// `1 - Σ a_i B^i` via the Durbin-Levinson recursion.
fn pacf_to_coefficients(partials: &[f64]) -> Vec<f64> {
    let mut coefs: Vec<f64> = Vec::with_capacity(partials.len());
    for (k, &r) in partials.iter().enumerate() {
        let previous = coefs.clone();
        for j in 0..k {
            coefs[j] = previous[j] - r * previous[k - 1 - j];
        }
        coefs.push(r);
    }
    coefs
}

/// Sparse `(lag, coefficient)` expansion of a multiplicative polynomial pair.
///
/// `sign` is -1 for AR (`w_t = Σ c w_{t-lag}`) and +1 for MA.
fn sparse_lags(regular: &[f64], seasonal: &[f64], s: usize, sign: f64) -> Vec<(usize, f64)> {
    let mut lags: Vec<(usize, f64)> = regular
        .iter()
        .enumerate()
        .map(|(i, &c)| (i + 1, c))
        .collect();
    for (j, &big) in seasonal.iter().enumerate() {
        let seasonal_lag = (j + 1) * s;
        lags.push((seasonal_lag, big));
        for (i, &small) in regular.iter().enumerate() {
            lags.push((seasonal_lag + i + 1, sign * small * big));
        }
    }
    lags
}

/// Layout of the optimizer's parameter vector.
#[derive(Debug, Clone, Copy)]
struct ParamLayout {
    order: SarimaOrder,
}

impl ParamLayout {
    fn len(&self) -> usize {
        self.order.num_coefficients()
    }

    fn decode(&self, params: &[f64]) -> SarimaCoefficients {
        let o = self.order;
        let mut rest = params;
        let mean = if o.includes_mean() {
            let (m, tail) = rest.split_at(1);
            rest = tail;
            Some(m[0])
        } else {
            None
        };
        let (ar, rest) = rest.split_at(o.p);
        let (sar, rest) = rest.split_at(o.cap_p);
        let (ma, sma) = rest.split_at(o.q);
        let negate = |v: Vec<f64>| v.into_iter().map(|c| -c).collect::<Vec<_>>();
        SarimaCoefficients {
            ar: pacf_to_coefficients(ar),
            seasonal_ar: pacf_to_coefficients(sar),
            ma: negate(pacf_to_coefficients(ma)),
            seasonal_ma: negate(pacf_to_coefficients(&sma[..o.cap_q])),
            mean,
        }
    }

    fn initial(&self, mean: f64) -> Vec<f64> {
        let mut init = vec![0.0; self.len()];
        if self.order.includes_mean() {
            init[0] = mean;
        }
        init
    }

    fn bounds(&self) -> Vec<(f64, f64)> {
        let mut bounds = vec![(-PACF_BOUND, PACF_BOUND); self.len()];
        if self.order.includes_mean() {
            bounds[0] = (f64::NEG_INFINITY, f64::INFINITY);
        }
        bounds
    }
}

/// Residuals of the conditional recursion, zero before `burn_in`.
fn conditional_residuals(
    w: &[f64],
    burn_in: usize,
    coefs: &SarimaCoefficients,
    s: usize,
) -> Vec<f64> {
    let ar = sparse_lags(&coefs.ar, &coefs.seasonal_ar, s, -1.0);
    let ma = sparse_lags(&coefs.ma, &coefs.seasonal_ma, s, 1.0);
    let mu = coefs.mean.unwrap_or(0.0);

    let mut residuals = vec![0.0; w.len()];
    for t in burn_in..w.len() {
        let mut pred = mu;
        for &(lag, c) in &ar {
            if lag <= t {
                pred += c * (w[t - lag] - mu);
            }
        }
        for &(lag, c) in &ma {
            if lag <= t {
                pred += c * residuals[t - lag];
            }
        }
        residuals[t] = w[t] - pred;
    }
    residuals
}

/// Seasonal ARIMA forecasting model.
#[derive(Debug, Clone)]
pub struct Sarima {
    order: SarimaOrder,
    coefficients: Option<SarimaCoefficients>,
    /// Observed series the model is conditioned on.
    history: Vec<f64>,
    /// Residuals on the differenced scale, zero before the burn-in.
    residuals: Option<Vec<f64>>,
    burn_in: usize,
    statistics: Option<FitStatistics>,
}

impl Sarima {
    /// Create an unfitted model.
    pub fn new(order: SarimaOrder) -> Self {
        Self {
            order,
            coefficients: None,
            history: Vec::new(),
            residuals: None,
            burn_in: 0,
            statistics: None,
        }
    }

    pub fn order(&self) -> SarimaOrder {
        self.order
    }

    pub fn coefficients(&self) -> Option<&SarimaCoefficients> {
        self.coefficients.as_ref()
    }

    pub fn statistics(&self) -> Option<&FitStatistics> {
        self.statistics.as_ref()
    }

    /// Observations needed before the first residual enters the likelihood,
    /// for a given burn-in on the differenced scale.
    pub fn min_length(order: SarimaOrder, burn_in: usize) -> usize {
        // n_used must exceed k + 1 so the AICc correction stays finite.
        let k = order.num_coefficients() + 1;
        order.differencing_lag() + burn_in.max(order.max_ar_lag()) + k + 2
    }

    /// Fit, excluding the first `burn_in` differenced observations from the
    /// likelihood so candidates with different AR lags share one sample.
    pub fn fit_conditioned(&mut self, series: &WeeklySeries, burn_in: usize) -> Result<()> {
        let order = self.order;
        let values = series.values();
        let needed = Self::min_length(order, burn_in);
        if values.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: values.len(),
            });
        }

        let burn_in = burn_in.max(order.max_ar_lag());
        let w = difference(&seasonal_difference(values, order.cap_d, order.s), order.d);
        let n_used = w.len() - burn_in;

        let scale = match root_mean_square(&w) {
            rms if rms.is_finite() && rms > 0.0 => rms,
            _ => 1.0,
        };
        let scaled: Vec<f64> = w.iter().map(|x| x / scale).collect();

        let layout = ParamLayout { order };
        let objective = |params: &[f64]| {
            let coefs = layout.decode(params);
            let residuals = conditional_residuals(&scaled, burn_in, &coefs, order.s);
            residuals[burn_in..].iter().map(|e| e * e).sum::<f64>() / n_used as f64
        };

        let sample_mean = mean(&scaled[burn_in..]);
        let (params, converged, iterations) = if layout.len() == 0 {
            (Vec::new(), true, 0)
        } else if layout.len() == 1 && order.includes_mean() {
            // Mean-only model: least squares is the sample mean.
            (vec![sample_mean], true, 0)
        } else {
            let config = NelderMeadConfig {
                max_iter: 500 + 250 * layout.len(),
                tolerance: 1e-9,
                initial_step: 0.1,
                ..Default::default()
            };
            let bounds = layout.bounds();
            let result = nelder_mead(
                objective,
                &layout.initial(sample_mean),
                Some(&bounds),
                config,
            );
            (result.optimal_point, result.converged, result.iterations)
        };

        let mut coefs = layout.decode(&params);
        let scaled_residuals = conditional_residuals(&scaled, burn_in, &coefs, order.s);
        let mse = scaled_residuals[burn_in..].iter().map(|e| e * e).sum::<f64>() / n_used as f64;
        if !mse.is_finite() {
            return Err(ForecastError::NonConvergent(format!(
                "{order}: residual variance is not finite"
            )));
        }

        let sigma2 = mse.max(VARIANCE_FLOOR) * scale * scale;
        let k = (layout.len() + 1) as f64;
        let n = n_used as f64;
        let log_likelihood = -0.5 * n * ((2.0 * PI * sigma2).ln() + 1.0);
        let aic = -2.0 * log_likelihood + 2.0 * k;
        let aicc = aic + 2.0 * k * (k + 1.0) / (n - k - 1.0);
        let bic = -2.0 * log_likelihood + k * n.ln();

        coefs.mean = coefs.mean.map(|m| m * scale);
        self.coefficients = Some(coefs);
        self.residuals = Some(scaled_residuals.into_iter().map(|e| e * scale).collect());
        self.history = values.to_vec();
        self.burn_in = burn_in;
        self.statistics = Some(FitStatistics {
            sigma2,
            log_likelihood,
            aic,
            aicc,
            bic,
            n_used,
            converged,
            iterations,
        });

        Ok(())
    }

    /// AR operator on the original scale, including differencing.
    fn full_ar_operator(&self, coefs: &SarimaCoefficients) -> Vec<f64> {
        let o = self.order;
        let stationary = poly_mul(
            &lag_operator(&coefs.ar, 1, -1.0),
            &lag_operator(&coefs.seasonal_ar, o.s.max(1), -1.0),
        );
        poly_mul(&stationary, &differencing_operator(o.d, o.cap_d, o.s))
    }

    fn full_ma_operator(&self, coefs: &SarimaCoefficients) -> Vec<f64> {
        poly_mul(
            &lag_operator(&coefs.ma, 1, 1.0),
            &lag_operator(&coefs.seasonal_ma, self.order.s.max(1), 1.0),
        )
    }

    /// Psi weights ψ_0..ψ_{horizon-1} of the MA(∞) representation.
    pub fn psi_weights(&self, horizon: usize) -> Result<Vec<f64>> {
        let coefs = self.coefficients.as_ref().ok_or(ForecastError::FitRequired)?;
        let ar = self.full_ar_operator(coefs);
        let ma = self.full_ma_operator(coefs);

        let mut psi = Vec::with_capacity(horizon);
        for j in 0..horizon {
            if j == 0 {
                psi.push(1.0);
                continue;
            }
            let mut value = ma.get(j).copied().unwrap_or(0.0);
            for k in 1..ar.len().min(j + 1) {
                value -= ar[k] * psi[j - k];
            }
            psi.push(value);
        }
        Ok(psi)
    }

    /// Standard error of the h-step forecast error for h = 1..=horizon.
    pub fn forecast_std_errors(&self, horizon: usize) -> Result<Vec<f64>> {
        let sigma2 = self
            .statistics
            .as_ref()
            .ok_or(ForecastError::FitRequired)?
            .sigma2;
        let psi = self.psi_weights(horizon)?;
        Ok(psi
            .iter()
            .scan(0.0, |acc, w| {
                *acc += w * w;
                Some((sigma2 * *acc).sqrt())
            })
            .collect())
    }
}

impl Forecaster for Sarima {
    fn fit(&mut self, series: &WeeklySeries) -> Result<()> {
        self.fit_conditioned(series, 0)
    }

    fn predict(&self, horizon: usize) -> Result<Vec<f64>> {
        let coefs = self.coefficients.as_ref().ok_or(ForecastError::FitRequired)?;
        let residuals = self.residuals.as_ref().ok_or(ForecastError::FitRequired)?;

        let ar = self.full_ar_operator(coefs);
        let ma = self.full_ma_operator(coefs);
        let mu = coefs.mean.unwrap_or(0.0);
        let offset = self.order.differencing_lag();
        let n = self.history.len();

        // In-sample shock at original index t.
        let shock = |t: usize| -> f64 {
            t.checked_sub(offset)
                .and_then(|i| residuals.get(i))
                .copied()
                .unwrap_or(0.0)
        };

        let mut z: Vec<f64> = self.history.iter().map(|y| y - mu).collect();
        z.reserve(horizon);
        for t in n..n + horizon {
            let mut value = 0.0;
            for (k, &c) in ar.iter().enumerate().skip(1) {
                if k <= t {
                    value -= c * z[t - k];
                }
            }
            for (j, &c) in ma.iter().enumerate().skip(1) {
                if j <= t && t - j < n {
                    value += c * shock(t - j);
                }
            }
            z.push(value);
        }

        Ok(z[n..].iter().map(|v| v + mu).collect())
    }

    fn predict_with_intervals(
        &self,
        horizon: usize,
        level: ConfidenceLevel,
    ) -> Result<ForecastResult> {
        let points = self.predict(horizon)?;
        let std_errors = self.forecast_std_errors(horizon)?;
        ForecastResult::from_points(&points, &std_errors, level)
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_ref().map(|r| &r[self.burn_in.min(r.len())..])
    }

    fn name(&self) -> &str {
        if self.order.is_seasonal() {
            "SARIMA"
        } else {
            "ARIMA"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn weekly(values: Vec<f64>) -> WeeklySeries {
        WeeklySeries::weekly("test", values).unwrap()
    }

    fn seasonal_sales(weeks: usize) -> Vec<f64> {
        (0..weeks)
            .map(|i| {
                let season = 2.0 * PI * (i % 52) as f64 / 52.0;
                1000.0 + 200.0 * season.sin() + 15.0 * ((i * 7 + 3) % 11) as f64
            })
            .collect()
    }

    #[test]
    fn pacf_transform_is_levinson() {
        assert_eq!(pacf_to_coefficients(&[]), Vec::<f64>::new());
        assert_eq!(pacf_to_coefficients(&[0.5]), vec![0.5]);
        let c = pacf_to_coefficients(&[0.5, 0.4]);
        assert_relative_eq!(c[0], 0.5 * (1.0 - 0.4), epsilon = 1e-12);
        assert_relative_eq!(c[1], 0.4, epsilon = 1e-12);
    }

    #[test]
    fn sparse_lags_expand_multiplicative_terms() {
        let ar = sparse_lags(&[0.5], &[0.3], 4, -1.0);
        assert_eq!(ar, vec![(1, 0.5), (4, 0.3), (5, -0.15)]);
        let ma = sparse_lags(&[0.5], &[0.3], 4, 1.0);
        assert_eq!(ma[2], (5, 0.15));
    }

    #[test]
    fn order_display_and_counts() {
        let order = SarimaOrder::new((1, 1, 1), (0, 1, 1), 52);
        assert_eq!(order.to_string(), "ARIMA(1,1,1)(0,1,1)[52]");
        assert!(order.is_seasonal());
        assert!(!order.includes_mean());
        assert_eq!(order.num_coefficients(), 3);
        assert_eq!(order.differencing_lag(), 53);

        let plain = SarimaOrder::non_seasonal(2, 0, 0);
        assert_eq!(plain.to_string(), "ARIMA(2,0,0)");
        assert_eq!(plain.num_coefficients(), 3);
    }

    fn ar1_series(phi: f64, n: usize, seed: u64) -> Vec<f64> {
        use rand::{rngs::StdRng, Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(seed);
        let mut values = vec![0.0];
        for i in 1..n {
            values.push(phi * values[i - 1] + rng.gen_range(-1.0..1.0));
        }
        values
    }

    #[test]
    fn ar1_coefficient_is_recovered() {
        for (phi, seed) in [(0.7, 42), (0.3, 7), (-0.5, 123)] {
            let mut model = Sarima::new(SarimaOrder::non_seasonal(1, 0, 0));
            model.fit(&weekly(ar1_series(phi, 400, seed))).unwrap();

            let coefs = model.coefficients().unwrap();
            assert!(
                (coefs.ar[0] - phi).abs() < 0.15,
                "phi {phi}: estimated {}",
                coefs.ar[0]
            );
            assert!(model.statistics().unwrap().converged);
        }
    }

    #[test]
    fn constant_series_forecasts_flat() {
        let mut model = Sarima::new(SarimaOrder::non_seasonal(0, 0, 0));
        model.fit(&weekly(vec![1_000_000.0; 104])).unwrap();

        let forecast = model.predict(8).unwrap();
        for value in forecast {
            assert_relative_eq!(value, 1_000_000.0, epsilon = 1e-6);
        }
        let stats = model.statistics().unwrap();
        assert!(stats.aicc.is_finite());
    }

    #[test]
    fn random_walk_forecast_continues_last_value() {
        let values: Vec<f64> = (0..60).map(|i| 100.0 + ((i * 13) % 7) as f64).collect();
        let mut model = Sarima::new(SarimaOrder::non_seasonal(0, 1, 0));
        model.fit(&weekly(values.clone())).unwrap();

        let forecast = model.predict(5).unwrap();
        for value in &forecast {
            assert_relative_eq!(*value, *values.last().unwrap(), epsilon = 1e-9);
        }

        // Random walk variance grows linearly with lead time.
        let se = model.forecast_std_errors(4).unwrap();
        let sigma = se[0];
        assert_relative_eq!(se[3], sigma * 2.0, epsilon = 1e-9);
    }

    #[test]
    fn seasonal_random_walk_repeats_last_year() {
        let values = seasonal_sales(130);
        let mut model = Sarima::new(SarimaOrder::new((0, 0, 0), (0, 1, 0), 52));
        model.fit(&weekly(values.clone())).unwrap();

        let forecast = model.predict(52).unwrap();
        for (h, value) in forecast.iter().enumerate() {
            assert_relative_eq!(*value, values[130 - 52 + h], epsilon = 1e-9);
        }
    }

    #[test]
    fn seasonal_model_fits_and_widens() {
        let values = seasonal_sales(156);
        let mut model = Sarima::new(SarimaOrder::new((1, 0, 0), (0, 1, 1), 52));
        model.fit(&weekly(values)).unwrap();

        let result = model
            .predict_with_intervals(52, ConfidenceLevel::default())
            .unwrap();
        assert_eq!(result.horizon(), 52);
        let widths: Vec<f64> = result.records().iter().map(|r| r.width()).collect();
        for pair in widths.windows(2) {
            assert!(pair[1] >= pair[0] - 1e-9);
        }
        for r in result.records() {
            assert!(r.lower <= r.point && r.point <= r.upper);
            assert!(r.point.is_finite());
        }
    }

    #[test]
    fn insufficient_data_is_reported() {
        let mut model = Sarima::new(SarimaOrder::new((1, 0, 0), (1, 1, 0), 52));
        let err = model.fit(&weekly(vec![1.0; 60])).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientData { .. }));

        let mut single = Sarima::new(SarimaOrder::non_seasonal(0, 0, 0));
        assert!(single.fit(&weekly(vec![42.0])).is_err());
    }

    #[test]
    fn requires_fit() {
        let model = Sarima::new(SarimaOrder::non_seasonal(1, 0, 0));
        assert!(matches!(model.predict(3), Err(ForecastError::FitRequired)));
        assert!(model.residuals().is_none());
        assert!(!model.is_fitted());
    }

    #[test]
    fn burn_in_shrinks_the_likelihood_sample() {
        let values = seasonal_sales(156);
        let mut a = Sarima::new(SarimaOrder::non_seasonal(1, 0, 0));
        a.fit_conditioned(&weekly(values.clone()), 0).unwrap();
        let mut b = Sarima::new(SarimaOrder::non_seasonal(1, 0, 0));
        b.fit_conditioned(&weekly(values), 53).unwrap();

        assert_eq!(a.statistics().unwrap().n_used, 155);
        assert_eq!(b.statistics().unwrap().n_used, 103);
        assert_eq!(b.residuals().unwrap().len(), 103);
    }
}
