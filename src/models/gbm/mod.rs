//! Gradient-boosted regression trees.
//!
//! Squared-error boosting over depth-limited [`RegressionTree`]s with
//! per-round row subsampling and per-tree column subsampling. All randomness
//! comes from a `StdRng` seeded by [`GbmParams::seed`], so a fit is fully
//! reproducible.
//!
//! # Example
//!
//! ```
//! use revenue_forecast::models::gbm::{GbmParams, GradientBoostingRegressor};
//! use revenue_forecast::models::Regressor;
//!
//! let features: Vec<Vec<f64>> = (0..50).map(|i| vec![(i % 5) as f64]).collect();
//! let targets: Vec<f64> = (0..50).map(|i| 10.0 * (i % 5) as f64).collect();
//!
//! let mut model = GradientBoostingRegressor::new(GbmParams::default().with_n_estimators(50));
//! model.fit(&features, &targets).unwrap();
//!
//! let pred = model.predict_row(&[3.0]).unwrap();
//! assert!((pred - 30.0).abs() < 1.0);
//! ```

mod tree;

pub use tree::{RegressionTree, TreeParams};

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ForecastError, Result};
use crate::models::traits::check_design;
use crate::models::Regressor;

/// Boosting hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbmParams {
    /// Number of boosting rounds (trees).
    pub n_estimators: usize,
    /// Shrinkage applied to every tree's output.
    pub learning_rate: f64,
    /// Maximum depth of each tree.
    pub max_depth: usize,
    /// Fraction of rows sampled (without replacement) for each tree.
    pub subsample: f64,
    /// Fraction of columns sampled for each tree.
    pub colsample_bytree: f64,
    /// Minimum rows required to split a node.
    pub min_samples_split: usize,
    /// Minimum rows required in a leaf.
    pub min_samples_leaf: usize,
    /// RNG seed for row/column sampling.
    pub seed: u64,
}

impl Default for GbmParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 5,
            subsample: 1.0,
            colsample_bytree: 1.0,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

impl GbmParams {
    /// Set the number of boosting rounds.
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    /// Set the shrinkage.
    pub fn with_learning_rate(mut self, rate: f64) -> Self {
        self.learning_rate = rate;
        self
    }

    /// Set the maximum tree depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the row sampling ratio.
    pub fn with_subsample(mut self, ratio: f64) -> Self {
        self.subsample = ratio;
        self
    }

    /// Set the column sampling ratio.
    pub fn with_colsample_bytree(mut self, ratio: f64) -> Self {
        self.colsample_bytree = ratio;
        self
    }

    /// Set the sampling seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(ForecastError::InvalidParameter(
                "n_estimators must be positive".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ForecastError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        for (name, ratio) in [
            ("subsample", self.subsample),
            ("colsample_bytree", self.colsample_bytree),
        ] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(ForecastError::InvalidParameter(format!(
                    "{name} must be in (0, 1], got {ratio}"
                )));
            }
        }
        if self.min_samples_split < 2 || self.min_samples_leaf == 0 {
            return Err(ForecastError::InvalidParameter(format!(
                "min_samples_split must be at least 2 and min_samples_leaf at least 1, got {} and {}",
                self.min_samples_split, self.min_samples_leaf
            )));
        }
        Ok(())
    }

    /// Compact label for logs.
    pub fn key(&self) -> String {
        format!(
            "n{}_lr{}_d{}_ss{}_cs{}",
            self.n_estimators,
            self.learning_rate,
            self.max_depth,
            self.subsample,
            self.colsample_bytree
        )
    }

    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        }
    }
}

/// Gradient-boosted ensemble of regression trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    params: GbmParams,
    base_score: f64,
    trees: Vec<RegressionTree>,
    n_features: Option<usize>,
}

impl GradientBoostingRegressor {
    /// Create an unfitted model.
    pub fn new(params: GbmParams) -> Self {
        Self {
            params,
            base_score: 0.0,
            trees: Vec::new(),
            n_features: None,
        }
    }

    /// Hyperparameters.
    pub fn params(&self) -> &GbmParams {
        &self.params
    }

    /// Number of fitted trees.
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Initial prediction (mean of the training labels).
    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    /// Check a decoded ensemble: every tree must be walkable for rows of the
    /// fitted width.
    pub fn validate_trees(&self) -> Result<()> {
        match self.n_features {
            Some(width) => self.trees.iter().try_for_each(|tree| tree.validate(width)),
            None if self.trees.is_empty() => Ok(()),
            None => Err(ForecastError::Serialization(
                "trees present on an unfitted model".to_string(),
            )),
        }
    }
}

impl Default for GradientBoostingRegressor {
    fn default() -> Self {
        Self::new(GbmParams::default())
    }
}

impl Regressor for GradientBoostingRegressor {
    fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<()> {
        self.params.validate()?;
        let width = check_design(features, targets)?;
        let n = features.len();

        let n_rows = sample_size(n, self.params.subsample);
        let n_cols = sample_size(width, self.params.colsample_bytree);
        let tree_params = self.params.tree_params();
        let mut rng = StdRng::seed_from_u64(self.params.seed);

        let base_score = targets.iter().sum::<f64>() / n as f64;
        let mut predictions = vec![base_score; n];
        let mut residuals = vec![0.0; n];
        let mut trees = Vec::with_capacity(self.params.n_estimators);

        for _ in 0..self.params.n_estimators {
            for i in 0..n {
                residuals[i] = targets[i] - predictions[i];
            }

            let rows = draw(&mut rng, n, n_rows);
            let columns = draw(&mut rng, width, n_cols);
            let tree = RegressionTree::fit(features, &residuals, &rows, &columns, &tree_params);

            for (pred, row) in predictions.iter_mut().zip(features) {
                *pred += self.params.learning_rate * tree.predict_row(row);
            }
            trees.push(tree);
        }

        debug!(
            params = %self.params.key(),
            rows = n,
            features = width,
            "fitted gradient boosting ensemble"
        );

        self.base_score = base_score;
        self.trees = trees;
        self.n_features = Some(width);
        Ok(())
    }

    fn predict_row(&self, row: &[f64]) -> Result<f64> {
        let width = self.n_features.ok_or(ForecastError::FitRequired)?;
        if row.len() != width {
            return Err(ForecastError::DimensionMismatch {
                expected: width,
                got: row.len(),
            });
        }
        let boost: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
        Ok(self.base_score + self.params.learning_rate * boost)
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn name(&self) -> &str {
        "GradientBoosting"
    }
}

fn sample_size(n: usize, ratio: f64) -> usize {
    ((n as f64 * ratio).round() as usize).clamp(1, n)
}

/// Sorted sample of `k` distinct indices from `0..n`; all indices when `k == n`.
fn draw(rng: &mut StdRng, n: usize, k: usize) -> Vec<usize> {
    if k >= n {
        return (0..n).collect();
    }
    let mut picked = index::sample(rng, n, k).into_vec();
    picked.sort_unstable();
    picked
}
