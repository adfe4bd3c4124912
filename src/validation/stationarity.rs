//! Unit-root and seasonal-difference tests used to choose differencing orders.

use crate::models::arima::{difference, seasonal_difference};
use crate::utils::stats::variance;

/// Result of a stationarity test.
#[derive(Debug, Clone)]
pub struct StationarityResult {
    /// Test statistic
    pub statistic: f64,
    /// P-value (interpolated from the critical value table)
    pub p_value: f64,
    /// Number of lags used
    pub lags: usize,
    /// Whether series appears stationary
    pub is_stationary: bool,
    /// Critical values at common significance levels
    pub critical_values: CriticalValues,
}

/// Critical values for stationarity tests.
#[derive(Debug, Clone, Default)]
pub struct CriticalValues {
    /// Critical value at 1% significance
    pub cv_1pct: f64,
    /// Critical value at 5% significance
    pub cv_5pct: f64,
    /// Critical value at 10% significance
    pub cv_10pct: f64,
}

/// KPSS level-stationarity critical values (Kwiatkowski et al., 1992, table 1).
const KPSS_LEVEL: CriticalValues = CriticalValues {
    cv_1pct: 0.739,
    cv_5pct: 0.463,
    cv_10pct: 0.347,
};

/// Minimum length for which the KPSS statistic is computed.
pub const KPSS_MIN_LEN: usize = 4;

/// Seasonal differencing is chosen when it removes at least this share of variance.
const SEASONAL_VARIANCE_RATIO: f64 = 0.7;

/// KPSS test for level stationarity.
///
/// Null hypothesis: the series is stationary around a constant. Rejection at
/// the 5% level marks it non-stationary. A series with zero variance is
/// reported stationary.
///
/// # Arguments
/// * `series` - Time series data
/// * `lags` - Bartlett window for the long-run variance (default: 4*(n/100)^0.25)
pub fn kpss_test(series: &[f64], lags: Option<usize>) -> StationarityResult {
    let n = series.len();

    if n < KPSS_MIN_LEN {
        return StationarityResult {
            statistic: f64::NAN,
            p_value: f64::NAN,
            lags: 0,
            is_stationary: false,
            critical_values: CriticalValues::default(),
        };
    }

    let lags = lags
        .unwrap_or_else(|| (4.0 * (n as f64 / 100.0).powf(0.25)).floor() as usize)
        .clamp(1, n / 2);

    let mean = series.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = series.iter().map(|&x| x - mean).collect();

    // Partial sums of the demeaned series.
    let eta: f64 = centered
        .iter()
        .scan(0.0, |acc, &e| {
            *acc += e;
            Some(*acc * *acc)
        })
        .sum::<f64>()
        / (n * n) as f64;

    let long_run_variance = bartlett_variance(&centered, lags);

    if long_run_variance <= f64::EPSILON * (1.0 + mean.abs()) {
        return StationarityResult {
            statistic: 0.0,
            p_value: 1.0,
            lags,
            is_stationary: true,
            critical_values: KPSS_LEVEL,
        };
    }

    let statistic = eta / long_run_variance;

    StationarityResult {
        statistic,
        p_value: kpss_p_value(statistic),
        lags,
        is_stationary: statistic < KPSS_LEVEL.cv_5pct,
        critical_values: KPSS_LEVEL,
    }
}

/// Newey-West long-run variance with a Bartlett kernel.
fn bartlett_variance(centered: &[f64], lags: usize) -> f64 {
    let n = centered.len() as f64;
    let autocovariance = |lag: usize| -> f64 {
        centered
            .iter()
            .skip(lag)
            .zip(centered)
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / n
    };

    (1..=lags).fold(autocovariance(0), |acc, j| {
        let weight = 1.0 - j as f64 / (lags + 1) as f64;
        acc + 2.0 * weight * autocovariance(j)
    })
}

/// Piecewise-linear p-value between tabulated critical values.
fn kpss_p_value(stat: f64) -> f64 {
    let table = [
        (KPSS_LEVEL.cv_10pct, 0.10),
        (KPSS_LEVEL.cv_5pct, 0.05),
        (KPSS_LEVEL.cv_1pct, 0.01),
    ];
    if stat <= table[0].0 {
        return 0.10;
    }
    for pair in table.windows(2) {
        let ((x0, p0), (x1, p1)) = (pair[0], pair[1]);
        if stat <= x1 {
            return p0 + (p1 - p0) * (stat - x0) / (x1 - x0);
        }
    }
    0.01
}

/// Number of first differences needed for KPSS to accept level stationarity.
///
/// Differencing stops once the series becomes too short to test.
pub fn unit_root_differences(series: &[f64], max_d: usize) -> usize {
    let mut current = series.to_vec();
    let mut d = 0;
    while d < max_d && current.len() >= KPSS_MIN_LEN {
        if kpss_test(&current, None).is_stationary {
            break;
        }
        current = difference(&current, 1);
        d += 1;
    }
    d
}

/// Whether seasonal differencing removes enough variance to be worthwhile.
///
/// Compares the variance of `y_t - y_{t-period}` against the variance of the
/// series itself; needs two full periods.
pub fn seasonal_differences(series: &[f64], period: usize, max_cap_d: usize) -> usize {
    if max_cap_d == 0 || period < 2 || series.len() < 2 * period {
        return 0;
    }

    let original = variance(series);
    if !original.is_finite() || original <= 0.0 {
        return 0;
    }

    let differenced = seasonal_difference(series, 1, period);
    let reduced = variance(&differenced);
    if reduced.is_finite() && reduced < original * SEASONAL_VARIANCE_RATIO {
        1
    } else {
        0
    }
}
