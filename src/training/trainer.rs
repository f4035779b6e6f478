//! Hold-out split, search, refit and backtest.

use tracing::info;

use crate::config::PipelineConfig;
use crate::core::{BacktestPoint, BacktestSeries};
use crate::error::{ForecastError, Result};
use crate::features::FeatureMatrix;
use crate::models::{GradientBoostingRegressor, Regressor};
use crate::training::model::TrainedModel;
use crate::training::search::{RandomizedSearch, SearchResult};
use crate::utils::metrics::AccuracyMetrics;

/// Everything produced by one training run.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: TrainedModel,
    pub backtest: BacktestSeries,
    pub metrics: AccuracyMetrics,
    pub search: SearchResult,
}

/// Trains a model on a feature matrix with a chronological hold-out.
#[derive(Debug, Clone)]
pub struct Trainer {
    search: RandomizedSearch,
    holdout_days: usize,
}

impl Trainer {
    /// Create a trainer from the pipeline settings.
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            search: RandomizedSearch::new(config.search.clone(), config.base_params.clone()),
            holdout_days: config.holdout_days,
        }
    }

    /// Rows the matrix needs: the hold-out plus one more than the fold count.
    pub fn min_rows(&self) -> usize {
        self.holdout_days + self.search.config().n_splits + 1
    }

    /// Train on all but the final `holdout_days` rows and backtest on those.
    pub fn train(&self, matrix: &FeatureMatrix) -> Result<TrainingOutcome> {
        if self.holdout_days == 0 {
            return Err(ForecastError::InvalidParameter(
                "holdout_days must be positive".to_string(),
            ));
        }
        let needed = self.min_rows();
        if matrix.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: matrix.len(),
            });
        }

        let (pool, holdout) = matrix.split_at(matrix.len() - self.holdout_days)?;
        let trained_through = pool.last_date().ok_or(ForecastError::EmptyData)?;
        info!(
            train_rows = pool.len(),
            holdout_rows = holdout.len(),
            %trained_through,
            "split feature matrix"
        );

        let features = pool.design();
        let labels = pool.labels();
        let search = self.search.run(&features, &labels)?;

        let mut regressor = GradientBoostingRegressor::new(search.best_params.clone());
        regressor.fit(&features, &labels)?;

        let predicted = regressor.predict(&holdout.design())?;
        let backtest = BacktestSeries::new(
            holdout
                .dates()
                .into_iter()
                .zip(holdout.actuals())
                .zip(predicted)
                .map(|((date, actual_value), predicted_value)| BacktestPoint {
                    date,
                    actual_value,
                    predicted_value,
                })
                .collect(),
        );
        let metrics = backtest.metrics()?;
        info!(
            mae = metrics.mae,
            rmse = metrics.rmse,
            r_squared = metrics.r_squared,
            "hold-out backtest"
        );

        let model = TrainedModel::new(
            regressor,
            matrix.schema().clone(),
            matrix.target_column(),
            trained_through,
        )?;

        Ok(TrainingOutcome {
            model,
            backtest,
            metrics,
            search,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ParamGrid, SearchConfig};
    use crate::core::{DailySeries, TargetColumn};
    use crate::features::build_feature_matrix;
    use chrono::NaiveDate;

    fn quick_config() -> PipelineConfig {
        PipelineConfig::default().with_search(
            SearchConfig::default()
                .with_grid(ParamGrid {
                    n_estimators: vec![10, 20],
                    learning_rate: vec![0.3],
                    max_depth: vec![2, 3],
                    subsample: vec![1.0],
                    colsample_bytree: vec![1.0],
                })
                .with_n_iter(3)
                .with_n_splits(3),
        )
    }

    fn weekly_series(n: usize) -> DailySeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let values: Vec<f64> = (0..n)
            .map(|i| if i % 7 >= 5 { 300.0 } else { 100.0 + (i % 7) as f64 * 10.0 })
            .collect();
        DailySeries::from_values(start, &values).unwrap()
    }

    #[test]
    fn holdout_is_the_final_rows() {
        let series = weekly_series(150);
        let matrix = build_feature_matrix(&series, TargetColumn::Clipped);
        let outcome = Trainer::new(&quick_config()).train(&matrix).unwrap();

        assert_eq!(outcome.backtest.len(), 30);
        let expected: Vec<NaiveDate> = matrix.dates()[matrix.len() - 30..].to_vec();
        assert_eq!(outcome.backtest.dates(), expected);
        assert!(outcome.model.trained_through() < expected[0]);
        assert_eq!(outcome.model.schema(), matrix.schema());
    }

    #[test]
    fn backtest_uses_real_values() {
        let series = weekly_series(120);
        let matrix = build_feature_matrix(&series, TargetColumn::Clipped);
        let outcome = Trainer::new(&quick_config()).train(&matrix).unwrap();

        let tail: Vec<f64> = series.values()[series.len() - 30..].to_vec();
        assert_eq!(outcome.backtest.actuals(), tail);
        assert!(outcome.metrics.mae < 20.0, "mae = {}", outcome.metrics.mae);
    }

    #[test]
    fn short_matrix_is_rejected() {
        let series = weekly_series(63);
        let matrix = build_feature_matrix(&series, TargetColumn::Clipped);
        let trainer = Trainer::new(&quick_config());

        assert_eq!(matrix.len(), 33);
        assert_eq!(trainer.min_rows(), 34);
        assert_eq!(
            trainer.train(&matrix).unwrap_err(),
            ForecastError::InsufficientData { needed: 34, got: 33 }
        );
    }
}
