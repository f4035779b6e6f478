//! Accuracy metrics for hold-out and cross-validation evaluation.

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// Point-forecast accuracy over a set of days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    /// Mean absolute error, in revenue units.
    pub mae: f64,
    pub mse: f64,
    pub rmse: f64,
    /// Mean absolute percentage error; undefined when any actual day is zero.
    pub mape: Option<f64>,
    /// Symmetric MAPE in percent. Days where both values are zero count as exact.
    pub smape: f64,
    /// Coefficient of determination (1.0 for a flat, perfectly predicted series).
    pub r_squared: f64,
}

/// Compare predictions with the values that actually happened.
pub fn calculate_metrics(actual: &[f64], predicted: &[f64]) -> Result<AccuracyMetrics> {
    if actual.is_empty() || predicted.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    if actual.len() != predicted.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }

    let n = actual.len() as f64;
    let mean_actual = actual.iter().sum::<f64>() / n;

    let mut abs_sum = 0.0;
    let mut sq_sum = 0.0;
    let mut pct_sum = Some(0.0);
    let mut spread = 0.0;
    for (&a, &p) in actual.iter().zip(predicted) {
        let err = a - p;
        abs_sum += err.abs();
        sq_sum += err * err;
        spread += (a - mean_actual).powi(2);
        pct_sum = match pct_sum {
            Some(sum) if a != 0.0 => Some(sum + (err / a).abs()),
            _ => None,
        };
    }

    let mse = sq_sum / n;
    Ok(AccuracyMetrics {
        mae: abs_sum / n,
        mse,
        rmse: mse.sqrt(),
        mape: pct_sum.map(|sum| 100.0 * sum / n),
        smape: smape(actual, predicted),
        r_squared: if spread == 0.0 { 1.0 } else { 1.0 - sq_sum / spread },
    })
}

fn paired_mean(actual: &[f64], predicted: &[f64], f: impl Fn(f64, f64) -> f64) -> f64 {
    if actual.is_empty() || actual.len() != predicted.len() {
        return f64::NAN;
    }
    actual.iter().zip(predicted).map(|(&a, &p)| f(a, p)).sum::<f64>() / actual.len() as f64
}

/// Mean absolute error; NaN for empty or mismatched input.
pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    paired_mean(actual, predicted, |a, p| (a - p).abs())
}

/// Mean squared error; NaN for empty or mismatched input.
pub fn mse(actual: &[f64], predicted: &[f64]) -> f64 {
    paired_mean(actual, predicted, |a, p| (a - p).powi(2))
}

/// Root mean squared error; NaN for empty or mismatched input.
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    mse(actual, predicted).sqrt()
}

/// Symmetric MAPE in percent; NaN for empty or mismatched input.
pub fn smape(actual: &[f64], predicted: &[f64]) -> f64 {
    100.0
        * paired_mean(actual, predicted, |a, p| {
            let denom = a.abs() + p.abs();
            if denom == 0.0 {
                0.0
            } else {
                2.0 * (a - p).abs() / denom
            }
        })
}
