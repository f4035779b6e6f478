//! End-to-end pipeline: transform, train and forecast.

use tracing::info;

use crate::config::PipelineConfig;
use crate::core::{BacktestSeries, DailySeries, ForecastSeries};
use crate::error::{ForecastError, Result};
use crate::features::{build_feature_matrix, MIN_SERIES_LEN};
use crate::forecasting::RecursiveForecaster;
use crate::training::{SearchResult, TrainedModel, Trainer};
use crate::utils::metrics::AccuracyMetrics;

/// All artifacts of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub model: TrainedModel,
    pub backtest: BacktestSeries,
    pub metrics: AccuracyMetrics,
    pub forecast: ForecastSeries,
    pub search: SearchResult,
}

/// Runs the full forecasting workflow on a daily series.
///
/// # Example
/// ```no_run
/// use chrono::NaiveDate;
/// use revenue_forecast::config::PipelineConfig;
/// use revenue_forecast::core::DailySeries;
/// use revenue_forecast::pipeline::Pipeline;
///
/// let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
/// let values: Vec<f64> = (0..400).map(|i| 1000.0 + (i % 7) as f64 * 50.0).collect();
/// let series = DailySeries::from_values(start, &values).unwrap();
///
/// let output = Pipeline::new(PipelineConfig::default()).unwrap().run(&series).unwrap();
/// assert_eq!(output.forecast.len(), 30);
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline, rejecting an invalid configuration.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Transform, train with a hold-out backtest, then forecast from the full history.
    pub fn run(&self, series: &DailySeries) -> Result<PipelineOutput> {
        if series.len() <= MIN_SERIES_LEN {
            return Err(ForecastError::InsufficientData {
                needed: MIN_SERIES_LEN + 1,
                got: series.len(),
            });
        }

        let matrix = build_feature_matrix(series, self.config.target_column);
        info!(
            days = series.len(),
            rows = matrix.len(),
            features = matrix.schema().len(),
            "built feature matrix"
        );

        let outcome = Trainer::new(&self.config).train(&matrix)?;
        let forecast =
            RecursiveForecaster::new(self.config.horizon).forecast(&outcome.model, series)?;
        info!(
            horizon = forecast.len(),
            total = forecast.total(),
            "forecast complete"
        );

        Ok(PipelineOutput {
            model: outcome.model,
            backtest: outcome.backtest,
            metrics: outcome.metrics,
            forecast,
            search: outcome.search,
        })
    }
}
