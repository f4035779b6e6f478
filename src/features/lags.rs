//! Lag and rolling-window features over the target history.
//!
//! `history` is always the target column strictly before the row's date, with
//! the most recent day last.

use crate::error::{ForecastError, Result};
use crate::utils::stats::{mean, std_dev};

/// Lag offsets in days.
pub const LAGS: [usize; 5] = [1, 7, 14, 21, 30];

/// Short rolling window.
pub const SHORT_WINDOW: usize = 7;

/// Long rolling window.
pub const LONG_WINDOW: usize = 30;

/// Prior days a row needs before every lag and window is defined.
pub const MAX_LOOKBACK: usize = 30;

/// History-derived features for one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagFeatures {
    /// Values at each offset in [`LAGS`].
    pub lags: [f64; 5],
    pub diff_1_7: f64,
    pub rolling_mean_7: f64,
    pub rolling_std_7: f64,
    pub rolling_mean_30: f64,
}

impl LagFeatures {
    /// Compute lag features from the prior history.
    pub fn from_history(history: &[f64]) -> Result<Self> {
        if history.len() < MAX_LOOKBACK {
            return Err(ForecastError::InsufficientData {
                needed: MAX_LOOKBACK,
                got: history.len(),
            });
        }
        Ok(Self::compute(history))
    }

    /// Caller guarantees `history.len() >= MAX_LOOKBACK`.
    pub(crate) fn compute(history: &[f64]) -> Self {
        let n = history.len();
        let lags = LAGS.map(|k| history[n - k]);
        let short = &history[n - SHORT_WINDOW..];
        let long = &history[n - LONG_WINDOW..];

        Self {
            lags,
            diff_1_7: lags[0] - lags[1],
            rolling_mean_7: mean(short),
            rolling_std_7: std_dev(short),
            rolling_mean_30: mean(long),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp(n: usize) -> Vec<f64> {
        (1..=n).map(|i| i as f64).collect()
    }

    #[test]
    fn lags_pick_days_before_the_row() {
        let features = LagFeatures::from_history(&ramp(40)).unwrap();

        assert_eq!(features.lags, [40.0, 34.0, 27.0, 20.0, 11.0]);
        assert_relative_eq!(features.diff_1_7, 6.0);
    }

    #[test]
    fn rolling_windows_cover_prior_days_only() {
        let features = LagFeatures::from_history(&ramp(30)).unwrap();

        // Last 7 values: 24..=30
        assert_relative_eq!(features.rolling_mean_7, 27.0, epsilon = 1e-12);
        assert_relative_eq!(features.rolling_std_7, (28.0f64 / 6.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(features.rolling_mean_30, 15.5, epsilon = 1e-12);
    }

    #[test]
    fn constant_history_has_zero_std() {
        let features = LagFeatures::from_history(&[100.0; 35]).unwrap();
        assert_relative_eq!(features.rolling_std_7, 0.0);
        assert_relative_eq!(features.diff_1_7, 0.0);
        assert_relative_eq!(features.rolling_mean_30, 100.0);
    }

    #[test]
    fn short_history_is_rejected() {
        assert!(LagFeatures::from_history(&ramp(30)).is_ok());
        assert_eq!(
            LagFeatures::from_history(&ramp(29)),
            Err(ForecastError::InsufficientData { needed: 30, got: 29 })
        );
    }
}
