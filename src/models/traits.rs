//! Regressor trait defining the single-step model interface.

use crate::error::{ForecastError, Result};

/// Common interface for single-step tabular regressors.
///
/// Rows are dense feature vectors in a fixed column order; the caller is
/// responsible for keeping that order identical between fit and predict.
pub trait Regressor {
    /// Fit the model to a design matrix and its labels.
    fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<()>;

    /// Predict a single row.
    fn predict_row(&self, row: &[f64]) -> Result<f64>;

    /// Predict every row of a design matrix.
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>> {
        features.iter().map(|row| self.predict_row(row)).collect()
    }

    /// Number of columns the model was fitted on.
    fn n_features(&self) -> Option<usize>;

    /// Get the model name.
    fn name(&self) -> &str;

    /// Check if the model has been fitted.
    fn is_fitted(&self) -> bool {
        self.n_features().is_some()
    }
}

/// Validate that a design matrix is non-empty, rectangular and matches its labels.
///
/// Returns the number of columns.
pub(crate) fn check_design(features: &[Vec<f64>], targets: &[f64]) -> Result<usize> {
    if features.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    if features.len() != targets.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: features.len(),
            got: targets.len(),
        });
    }
    let width = features[0].len();
    if width == 0 {
        return Err(ForecastError::InvalidParameter(
            "feature rows must have at least one column".to_string(),
        ));
    }
    if let Some(row) = features.iter().find(|r| r.len() != width) {
        return Err(ForecastError::DimensionMismatch {
            expected: width,
            got: row.len(),
        });
    }
    if features.iter().flatten().chain(targets).any(|v| !v.is_finite()) {
        return Err(ForecastError::ComputationError(
            "non-finite value in training data".to_string(),
        ));
    }
    Ok(width)
}
