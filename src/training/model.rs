//! Fitted model artifact.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::TargetColumn;
use crate::error::{ForecastError, Result};
use crate::features::FeatureSchema;
use crate::models::{GbmParams, GradientBoostingRegressor, Regressor};

/// A fitted regressor bundled with the exact feature schema it was trained on.
///
/// Immutable once built. Rows presented at inference are aligned to the
/// stored schema by name, never by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    regressor: GradientBoostingRegressor,
    schema: FeatureSchema,
    target_column: TargetColumn,
    trained_through: NaiveDate,
}

impl TrainedModel {
    /// Bundle a fitted regressor with its schema.
    ///
    /// Fails with `FitRequired` for an unfitted regressor and with
    /// `DimensionMismatch` when the schema width differs from the fitted width.
    pub fn new(
        regressor: GradientBoostingRegressor,
        schema: FeatureSchema,
        target_column: TargetColumn,
        trained_through: NaiveDate,
    ) -> Result<Self> {
        let width = regressor.n_features().ok_or(ForecastError::FitRequired)?;
        if width != schema.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: width,
                got: schema.len(),
            });
        }
        Ok(Self {
            regressor,
            schema,
            target_column,
            trained_through,
        })
    }

    /// Get the fitted regressor.
    pub fn regressor(&self) -> &GradientBoostingRegressor {
        &self.regressor
    }

    /// Feature schema the regressor was fitted on.
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Selected hyperparameters.
    pub fn params(&self) -> &GbmParams {
        self.regressor.params()
    }

    /// Column the model was trained to predict.
    pub fn target_column(&self) -> TargetColumn {
        self.target_column
    }

    /// Last date in the training pool.
    pub fn trained_through(&self) -> NaiveDate {
        self.trained_through
    }

    /// Predict one row whose values are laid out by `produced`.
    pub fn predict_row(&self, produced: &FeatureSchema, values: &[f64]) -> Result<f64> {
        let aligned = self.schema.align(produced, values)?;
        self.regressor.predict_row(&aligned)
    }

    /// Encode the model as compact JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Encode the model as indented JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode a model and re-check the trees and schema against the regressor.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Self = serde_json::from_str(json)?;
        raw.regressor.validate_trees()?;
        Self::new(
            raw.regressor,
            raw.schema,
            raw.target_column,
            raw.trained_through,
        )
    }
}
