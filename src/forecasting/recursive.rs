//! Recursive multi-step forecasting.
//!
//! A single-step model is rolled forward one day at a time: each prediction is
//! appended to a working copy of the history so the next day's lag and
//! rolling features can see it. Errors therefore compound over the horizon.

use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::core::{DailySeries, ForecastPoint, ForecastSeries};
use crate::error::{ForecastError, Result};
use crate::features::lags::MAX_LOOKBACK;
use crate::features::{build_feature_row, FeatureSchema};
use crate::training::TrainedModel;

/// Default number of days forecast.
pub const DEFAULT_HORIZON: usize = 30;

/// Append-only target history that grows with each prediction.
#[derive(Debug, Clone)]
struct WorkingSeries {
    values: Vec<f64>,
    last_date: NaiveDate,
}

impl WorkingSeries {
    fn seed(history: &DailySeries, model: &TrainedModel) -> Result<Self> {
        let last_date = history.last_date().ok_or(ForecastError::EmptyData)?;
        let values = history
            .tail(MAX_LOOKBACK)
            .column(model.target_column());
        Ok(Self { values, last_date })
    }

    fn next_date(&self) -> Result<NaiveDate> {
        self.last_date
            .checked_add_signed(Duration::days(1))
            .ok_or_else(|| {
                ForecastError::TimestampError(format!("no day after {}", self.last_date))
            })
    }

    /// The predicted value stands in for both the raw and the clipped column.
    fn push(&mut self, date: NaiveDate, value: f64) {
        self.values.push(value);
        self.last_date = date;
    }
}

/// Rolls a [`TrainedModel`] forward over a fixed horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecursiveForecaster {
    horizon: usize,
}

impl Default for RecursiveForecaster {
    fn default() -> Self {
        Self::new(DEFAULT_HORIZON)
    }
}

impl RecursiveForecaster {
    /// Create a forecaster for `horizon` days.
    pub fn new(horizon: usize) -> Self {
        Self { horizon }
    }

    /// Days forecast per call.
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Forecast the days after `history`.
    ///
    /// Needs at least 30 days of history. Predictions are clamped at zero
    /// and are not clipped again before being fed back.
    pub fn forecast(&self, model: &TrainedModel, history: &DailySeries) -> Result<ForecastSeries> {
        if self.horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon must be positive".to_string(),
            ));
        }
        if history.len() < MAX_LOOKBACK {
            return Err(ForecastError::InsufficientData {
                needed: MAX_LOOKBACK,
                got: history.len(),
            });
        }

        let produced = FeatureSchema::standard();
        let mut working = WorkingSeries::seed(history, model)?;
        let mut points = Vec::with_capacity(self.horizon);

        for _ in 0..self.horizon {
            let date = working.next_date()?;
            let row = build_feature_row(date, &working.values)?;
            let raw = model.predict_row(&produced, &row.values)?;
            if !raw.is_finite() {
                return Err(ForecastError::ComputationError(format!(
                    "non-finite prediction for {date}"
                )));
            }
            let predicted_value = raw.max(0.0);

            working.push(date, predicted_value);
            points.push(ForecastPoint {
                date,
                predicted_value,
            });
        }

        let forecast = ForecastSeries::new(points)?;
        debug!(
            horizon = forecast.len(),
            first = ?forecast.first_date(),
            total = forecast.total(),
            "recursive forecast complete"
        );
        Ok(forecast)
    }
}
