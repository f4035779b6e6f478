//! Forecast and backtest result structures.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::utils::metrics::{calculate_metrics, AccuracyMetrics};

/// One predicted day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted_value: f64,
}

/// A fixed-percentage band around a forecast point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandPoint {
    pub date: NaiveDate,
    pub lower: f64,
    pub predicted_value: f64,
    pub upper: f64,
}

/// Predictions for consecutive days following the history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ForecastRecord")]
pub struct ForecastSeries {
    points: Vec<ForecastPoint>,
}

#[derive(Deserialize)]
struct ForecastRecord {
    points: Vec<ForecastPoint>,
}

impl TryFrom<ForecastRecord> for ForecastSeries {
    type Error = ForecastError;

    fn try_from(record: ForecastRecord) -> Result<Self> {
        Self::new(record.points)
    }
}

impl ForecastSeries {
    /// Wrap points that are already in date order.
    pub fn new(points: Vec<ForecastPoint>) -> Result<Self> {
        for pair in points.windows(2) {
            if pair[0].date.succ_opt() != Some(pair[1].date) {
                return Err(ForecastError::TimestampError(format!(
                    "forecast dates must be consecutive: {} followed by {}",
                    pair[0].date, pair[1].date
                )));
            }
        }
        Ok(Self { points })
    }

    /// Forecast horizon.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get the forecast points.
    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    /// Iterate over the forecast points.
    pub fn iter(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter()
    }

    /// Get the forecast dates.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Get the predicted values.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.predicted_value).collect()
    }

    /// First forecast day.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    /// Last forecast day.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Sum of all predictions.
    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.predicted_value).sum()
    }

    /// Symmetric band of `pct` percent around every point.
    ///
    /// This is a presentation heuristic, not a model-derived interval.
    ///
    /// # Example
    /// ```
    /// use chrono::NaiveDate;
    /// use revenue_forecast::core::{ForecastPoint, ForecastSeries};
    ///
    /// let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    /// let series = ForecastSeries::new(vec![ForecastPoint { date, predicted_value: 200.0 }]).unwrap();
    /// let band = series.band(15.0).unwrap();
    /// assert!((band[0].lower - 170.0).abs() < 1e-9);
    /// assert!((band[0].upper - 230.0).abs() < 1e-9);
    /// ```
    pub fn band(&self, pct: f64) -> Result<Vec<BandPoint>> {
        if !(pct >= 0.0 && pct.is_finite()) {
            return Err(ForecastError::InvalidParameter(format!(
                "band percentage must be non-negative, got {pct}"
            )));
        }
        let ratio = pct / 100.0;
        Ok(self
            .points
            .iter()
            .map(|p| BandPoint {
                date: p.date,
                lower: p.predicted_value * (1.0 - ratio),
                predicted_value: p.predicted_value,
                upper: p.predicted_value * (1.0 + ratio),
            })
            .collect())
    }

    /// The `n` highest predicted days, largest first.
    ///
    /// Equal values keep date order.
    pub fn top_peaks(&self, n: usize) -> Vec<ForecastPoint> {
        let mut sorted = self.points.clone();
        sorted.sort_by(|a, b| {
            b.predicted_value
                .partial_cmp(&a.predicted_value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted.truncate(n);
        sorted
    }
}

/// A hold-out day with the real value and the model's prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestPoint {
    pub date: NaiveDate,
    pub actual_value: f64,
    pub predicted_value: f64,
}

impl BacktestPoint {
    /// Actual minus predicted.
    pub fn error(&self) -> f64 {
        self.actual_value - self.predicted_value
    }
}

/// Hold-out backtest in date order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestSeries {
    points: Vec<BacktestPoint>,
}

impl BacktestSeries {
    /// Wrap hold-out points in date order.
    pub fn new(points: Vec<BacktestPoint>) -> Self {
        Self { points }
    }

    /// Number of hold-out days.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get the hold-out points.
    pub fn points(&self) -> &[BacktestPoint] {
        &self.points
    }

    /// Get the hold-out dates.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Get the real values.
    pub fn actuals(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.actual_value).collect()
    }

    /// Get the predicted values.
    pub fn predictions(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.predicted_value).collect()
    }

    /// Accuracy of the predictions against the real values.
    pub fn metrics(&self) -> Result<AccuracyMetrics> {
        calculate_metrics(&self.actuals(), &self.predictions())
    }
}
