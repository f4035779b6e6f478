//! Pipeline configuration.
//!
//! Every knob is explicit; defaults reproduce the production setup of a
//! 30-day hold-out, a 30-day horizon and a 20-candidate randomized search over
//! five expanding time-series folds.

use serde::{Deserialize, Serialize};

use crate::core::TargetColumn;
use crate::error::{ForecastError, Result};
use crate::models::GbmParams;

/// Candidate values for each searched hyperparameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub n_estimators: Vec<usize>,
    pub learning_rate: Vec<f64>,
    pub max_depth: Vec<usize>,
    pub subsample: Vec<f64>,
    pub colsample_bytree: Vec<f64>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![500, 1000],
            learning_rate: vec![0.01, 0.05, 0.1],
            max_depth: vec![3, 5, 7],
            subsample: vec![0.8, 1.0],
            colsample_bytree: vec![0.8, 1.0],
        }
    }
}

impl ParamGrid {
    /// Total number of grid points.
    pub fn total_combinations(&self) -> usize {
        self.n_estimators.len()
            * self.learning_rate.len()
            * self.max_depth.len()
            * self.subsample.len()
            * self.colsample_bytree.len()
    }

    /// Every grid point, last axis varying fastest.
    ///
    /// Fields not on the grid are taken from `base`.
    pub fn combinations(&self, base: &GbmParams) -> Vec<GbmParams> {
        let mut combos = Vec::with_capacity(self.total_combinations());

        for &n_estimators in &self.n_estimators {
            for &learning_rate in &self.learning_rate {
                for &max_depth in &self.max_depth {
                    for &subsample in &self.subsample {
                        for &colsample_bytree in &self.colsample_bytree {
                            combos.push(GbmParams {
                                n_estimators,
                                learning_rate,
                                max_depth,
                                subsample,
                                colsample_bytree,
                                ..base.clone()
                            });
                        }
                    }
                }
            }
        }

        combos
    }

    /// Check every grid point as it would be fitted on top of `base`.
    pub fn validate(&self, base: &GbmParams) -> Result<()> {
        if self.total_combinations() == 0 {
            return Err(ForecastError::InvalidParameter(
                "every parameter grid axis needs at least one value".to_string(),
            ));
        }
        self.combinations(base)
            .iter()
            .try_for_each(GbmParams::validate)
    }
}

/// Randomized hyperparameter search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub grid: ParamGrid,
    /// Number of sampled candidates.
    pub n_iter: usize,
    /// Number of time-series folds.
    pub n_splits: usize,
    /// Rolling training window for the folds (None = expanding).
    pub max_train_size: Option<usize>,
    /// Seed for candidate sampling.
    pub seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            grid: ParamGrid::default(),
            n_iter: 20,
            n_splits: 5,
            max_train_size: None,
            seed: 42,
        }
    }
}

impl SearchConfig {
    /// Set the parameter grid.
    pub fn with_grid(mut self, grid: ParamGrid) -> Self {
        self.grid = grid;
        self
    }

    /// Set the number of sampled candidates.
    pub fn with_n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    /// Set the number of time-series folds.
    pub fn with_n_splits(mut self, n_splits: usize) -> Self {
        self.n_splits = n_splits;
        self
    }

    /// Use a rolling training window of at most `size` rows.
    pub fn with_max_train_size(mut self, size: usize) -> Self {
        self.max_train_size = Some(size);
        self
    }

    /// Set the candidate sampling seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check search settings and every grid point built from `base`.
    pub fn validate(&self, base: &GbmParams) -> Result<()> {
        if self.n_iter == 0 {
            return Err(ForecastError::InvalidParameter(
                "n_iter must be positive".to_string(),
            ));
        }
        if self.n_splits < 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "n_splits must be at least 2, got {}",
                self.n_splits
            )));
        }
        if self.max_train_size == Some(0) {
            return Err(ForecastError::InvalidParameter(
                "max_train_size must be positive".to_string(),
            ));
        }
        self.grid.validate(base)
    }
}

/// Configuration for [`crate::pipeline::Pipeline`].
///
/// # Example
/// ```
/// use revenue_forecast::config::PipelineConfig;
///
/// let config = PipelineConfig::from_json_str(r#"{ "horizon": 14, "search": { "n_iter": 5 } }"#).unwrap();
/// assert_eq!(config.horizon, 14);
/// assert_eq!(config.search.n_iter, 5);
/// assert_eq!(config.holdout_days, 30);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub search: SearchConfig,
    /// Hyperparameters outside the grid (tree leaf sizes, seed).
    pub base_params: GbmParams,
    /// Final matrix rows withheld for the backtest.
    pub holdout_days: usize,
    /// Days forecast past the end of the history.
    pub horizon: usize,
    pub target_column: TargetColumn,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            base_params: GbmParams::default(),
            holdout_days: 30,
            horizon: 30,
            target_column: TargetColumn::Clipped,
        }
    }
}

impl PipelineConfig {
    /// Set the search settings.
    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    /// Set the hyperparameters the grid does not cover.
    pub fn with_base_params(mut self, params: GbmParams) -> Self {
        self.base_params = params;
        self
    }

    /// Set the number of hold-out rows.
    pub fn with_holdout_days(mut self, days: usize) -> Self {
        self.holdout_days = days;
        self
    }

    /// Set the forecast horizon in days.
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    /// Choose which revenue column is modeled.
    pub fn with_target_column(mut self, column: TargetColumn) -> Self {
        self.target_column = column;
        self
    }

    /// Parse a (possibly partial) JSON configuration and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the whole configuration.
    pub fn validate(&self) -> Result<()> {
        if self.holdout_days == 0 {
            return Err(ForecastError::InvalidParameter(
                "holdout_days must be positive".to_string(),
            ));
        }
        if self.horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon must be positive".to_string(),
            ));
        }
        self.search.validate(&self.base_params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid_has_72_points() {
        let grid = ParamGrid::default();
        assert_eq!(grid.total_combinations(), 72);

        let combos = grid.combinations(&GbmParams::default());
        assert_eq!(combos.len(), 72);
        assert_eq!(combos[0].n_estimators, 500);
        assert_eq!(combos[0].colsample_bytree, 0.8);
        assert_eq!(combos[1].colsample_bytree, 1.0);
        assert_eq!(combos[71].n_estimators, 1000);
        assert_eq!(combos[71].max_depth, 7);
    }

    #[test]
    fn combinations_inherit_base_fields() {
        let base = GbmParams {
            min_samples_leaf: 4,
            seed: 9,
            ..GbmParams::default()
        };
        for params in ParamGrid::default().combinations(&base) {
            assert_eq!(params.min_samples_leaf, 4);
            assert_eq!(params.seed, 9);
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
        assert_eq!(PipelineConfig::default().search.n_iter, 20);
        assert_eq!(PipelineConfig::default().search.seed, 42);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let cases = [
            PipelineConfig::default().with_holdout_days(0),
            PipelineConfig::default().with_horizon(0),
            PipelineConfig::default().with_search(SearchConfig::default().with_n_iter(0)),
            PipelineConfig::default().with_search(SearchConfig::default().with_n_splits(1)),
            PipelineConfig::default().with_search(SearchConfig::default().with_grid(ParamGrid {
                learning_rate: vec![],
                ..ParamGrid::default()
            })),
            PipelineConfig::default().with_search(SearchConfig::default().with_grid(ParamGrid {
                subsample: vec![1.2],
                ..ParamGrid::default()
            })),
        ];
        for config in cases {
            assert!(matches!(
                config.validate(),
                Err(ForecastError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn grid_is_checked_against_base_params() {
        let grid = ParamGrid::default();
        let loose_leaves = GbmParams {
            min_samples_leaf: 0,
            ..GbmParams::default()
        };

        assert!(grid.validate(&GbmParams::default()).is_ok());
        assert!(matches!(
            grid.validate(&loose_leaves),
            Err(ForecastError::InvalidParameter(_))
        ));
        assert!(PipelineConfig::default()
            .with_base_params(loose_leaves)
            .validate()
            .is_err());
    }

    #[test]
    fn json_round_trip() {
        let config = PipelineConfig::default()
            .with_horizon(7)
            .with_target_column(TargetColumn::Raw);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(PipelineConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn bad_json_is_a_serialization_error() {
        assert!(matches!(
            PipelineConfig::from_json_str("{ horizon: }"),
            Err(ForecastError::Serialization(_))
        ));
        assert!(matches!(
            PipelineConfig::from_json_str(r#"{ "horizon": 0 }"#),
            Err(ForecastError::InvalidParameter(_))
        ));
    }
}
