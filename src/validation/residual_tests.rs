//! Residual whiteness check reported with every fitted model.

use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Ljung-Box test result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LjungBoxResult {
    /// Test statistic Q
    pub statistic: f64,
    /// Upper-tail chi-squared probability of Q
    pub p_value: f64,
    /// Number of lags tested
    pub lags: usize,
    /// Degrees of freedom
    pub df: usize,
}

impl LjungBoxResult {
    /// Returns true if we fail to reject the null of white-noise residuals.
    pub fn is_white_noise(&self, alpha: f64) -> bool {
        self.p_value > alpha
    }
}

/// Ljung-Box portmanteau test for autocorrelation in residuals.
///
/// # Arguments
/// * `residuals` - Model residuals
/// * `lags` - Number of lags to include (default: min(10, n/5))
/// * `fitted_params` - ARMA coefficients estimated, subtracted from the degrees of freedom
pub fn ljung_box(residuals: &[f64], lags: Option<usize>, fitted_params: usize) -> LjungBoxResult {
    let n = residuals.len();

    if n < 3 {
        return LjungBoxResult {
            statistic: f64::NAN,
            p_value: f64::NAN,
            lags: 0,
            df: 0,
        };
    }

    let lags = lags.unwrap_or_else(|| 10.min(n / 5).max(1)).min(n - 1);
    let df = lags.saturating_sub(fitted_params).max(1);

    let mean = residuals.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = residuals.iter().map(|&x| x - mean).collect();
    let denom: f64 = centered.iter().map(|x| x * x).sum();

    if denom <= 0.0 {
        return LjungBoxResult {
            statistic: 0.0,
            p_value: 1.0,
            lags,
            df,
        };
    }

    let q = (1..=lags)
        .map(|k| {
            let rho = centered
                .iter()
                .skip(k)
                .zip(&centered)
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / denom;
            rho * rho / (n - k) as f64
        })
        .sum::<f64>()
        * (n * (n + 2)) as f64;

    let p_value = ChiSquared::new(df as f64)
        .map(|chi| chi.sf(q))
        .unwrap_or(f64::NAN);

    LjungBoxResult {
        statistic: q,
        p_value,
        lags,
        df,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ljung_box_white_noise_passes() {
        let residuals: Vec<f64> = (0..200)
            .map(|i| ((i * 7919 + 13) % 101) as f64 / 50.0 - 1.0)
            .collect();
        let result = ljung_box(&residuals, Some(10), 0);
        assert!(result.statistic.is_finite());
        assert!((0.0..=1.0).contains(&result.p_value));
        assert_eq!(result.df, 10);
    }

    #[test]
    fn ljung_box_detects_autocorrelation() {
        let residuals: Vec<f64> = (0..200).map(|i| (i as f64 * 0.1).sin()).collect();
        let result = ljung_box(&residuals, Some(10), 2);
        assert!(!result.is_white_noise(0.05));
        assert_eq!(result.df, 8);
    }

    #[test]
    fn ljung_box_zero_residuals() {
        let result = ljung_box(&[0.0; 50], None, 1);
        assert_eq!(result.statistic, 0.0);
        assert!(result.is_white_noise(0.05));
    }

    #[test]
    fn ljung_box_short_input() {
        let result = ljung_box(&[1.0, -1.0], None, 0);
        assert!(result.statistic.is_nan());
    }
}
