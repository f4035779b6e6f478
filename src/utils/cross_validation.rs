//! Time-series cross-validation for tabular regressors.
//!
//! Folds are chronological: every validation block lies strictly after the
//! training block it is paired with.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::models::Regressor;
use crate::utils::metrics::mae;
use crate::utils::stats::{mean, std_dev};

/// A single train/validation split expressed as row ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    /// Training rows.
    pub train: Range<usize>,
    /// Validation rows, always after `train`.
    pub validation: Range<usize>,
}

/// Configuration for time-series cross-validation.
///
/// With `n_splits = k`, the rows are cut into `k + 1` blocks; fold `i`
/// trains on blocks `0..=i` and validates on block `i + 1`. Setting
/// `max_train_size` turns the expanding window into a rolling one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesSplit {
    /// Number of folds.
    pub n_splits: usize,
    /// Validation block size (defaults to `n_samples / (n_splits + 1)`).
    pub test_size: Option<usize>,
    /// Maximum training window (None = expanding window).
    pub max_train_size: Option<usize>,
    /// Rows skipped between the end of training and the validation block.
    pub gap: usize,
}

impl Default for TimeSeriesSplit {
    fn default() -> Self {
        Self::new(5)
    }
}

impl TimeSeriesSplit {
    /// Create an expanding-window split with `n_splits` folds.
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            test_size: None,
            max_train_size: None,
            gap: 0,
        }
    }

    /// Limit the training window to the most recent `size` rows.
    pub fn with_max_train_size(mut self, size: usize) -> Self {
        self.max_train_size = Some(size);
        self
    }

    /// Use a fixed validation block size.
    pub fn with_test_size(mut self, size: usize) -> Self {
        self.test_size = Some(size);
        self
    }

    /// Skip `gap` rows between training and validation.
    pub fn with_gap(mut self, gap: usize) -> Self {
        self.gap = gap;
        self
    }

    /// Lower bound on the number of rows `split` needs.
    pub fn min_samples(&self) -> usize {
        match self.test_size {
            Some(size) => self.n_splits * size + self.gap + 1,
            None => self.n_splits + self.gap + 1,
        }
    }

    /// Compute the folds for `n_samples` rows.
    ///
    /// # Example
    /// ```
    /// use revenue_forecast::utils::cross_validation::TimeSeriesSplit;
    ///
    /// let folds = TimeSeriesSplit::new(3).split(8).unwrap();
    /// assert_eq!(folds.len(), 3);
    /// assert_eq!(folds[0].train, 0..2);
    /// assert_eq!(folds[0].validation, 2..4);
    /// assert_eq!(folds[2].validation, 6..8);
    /// ```
    pub fn split(&self, n_samples: usize) -> Result<Vec<Fold>> {
        if self.n_splits < 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "n_splits must be at least 2, got {}",
                self.n_splits
            )));
        }

        let n_folds = self.n_splits + 1;
        if n_folds > n_samples {
            return Err(ForecastError::InsufficientData {
                needed: n_folds,
                got: n_samples,
            });
        }

        let test_size = self.test_size.unwrap_or(n_samples / n_folds);
        if test_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "test_size must be positive".to_string(),
            ));
        }
        let needed = self.n_splits * test_size + self.gap + 1;
        if n_samples < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: n_samples,
            });
        }

        let first_test_start = n_samples - self.n_splits * test_size;
        let folds = (0..self.n_splits)
            .map(|i| {
                let test_start = first_test_start + i * test_size;
                let train_end = test_start - self.gap;
                let train_start = match self.max_train_size {
                    Some(max) => train_end.saturating_sub(max),
                    None => 0,
                };
                Fold {
                    train: train_start..train_end,
                    validation: test_start..test_start + test_size,
                }
            })
            .collect();

        Ok(folds)
    }
}

/// Results from cross-validation.
#[derive(Debug, Clone, PartialEq)]
pub struct CVResults {
    /// Number of folds evaluated.
    pub n_folds: usize,
    /// Mean validation MAE across folds.
    pub mean_mae: f64,
    /// Standard deviation of MAE across folds.
    pub mae_std: f64,
    /// Per-fold validation MAE.
    pub fold_mae: Vec<f64>,
}

impl CVResults {
    /// Aggregate per-fold scores.
    pub fn from_fold_scores(fold_mae: Vec<f64>) -> Result<Self> {
        if fold_mae.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        // A single fold has no spread.
        let mae_std = if fold_mae.len() == 1 {
            0.0
        } else {
            std_dev(&fold_mae)
        };
        Ok(Self {
            n_folds: fold_mae.len(),
            mean_mae: mean(&fold_mae),
            mae_std,
            fold_mae,
        })
    }
}

/// Fit a fresh model on one fold's training rows and return its validation MAE.
pub fn score_fold<R: Regressor>(
    mut model: R,
    fold: &Fold,
    features: &[Vec<f64>],
    targets: &[f64],
) -> Result<f64> {
    if fold.validation.end > features.len() || fold.train.start >= fold.train.end {
        return Err(ForecastError::IndexOutOfBounds {
            index: fold.validation.end,
            size: features.len(),
        });
    }

    model.fit(&features[fold.train.clone()], &targets[fold.train.clone()])?;
    let predicted = model.predict(&features[fold.validation.clone()])?;
    let score = mae(&targets[fold.validation.clone()], &predicted);

    if score.is_finite() {
        Ok(score)
    } else {
        Err(ForecastError::ComputationError(format!(
            "non-finite validation MAE for {}",
            model.name()
        )))
    }
}

/// Perform time-series cross-validation.
///
/// # Arguments
/// * `split` - Fold configuration
/// * `features` - Design matrix in chronological order
/// * `targets` - Labels aligned with `features`
/// * `model_factory` - Function that creates a fresh model instance for each fold
pub fn cross_validate<R, Factory>(
    split: &TimeSeriesSplit,
    features: &[Vec<f64>],
    targets: &[f64],
    model_factory: Factory,
) -> Result<CVResults>
where
    R: Regressor,
    Factory: Fn() -> R,
{
    let folds = split.split(features.len())?;
    let scores = folds
        .iter()
        .map(|fold| score_fold(model_factory(), fold, features, targets))
        .collect::<Result<Vec<_>>>()?;
    CVResults::from_fold_scores(scores)
}
