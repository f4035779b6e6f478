//! Feature schema, rows and the series-to-matrix transform.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::{DailySeries, TargetColumn};
use crate::error::{ForecastError, Result};
use crate::features::calendar::CalendarFeatures;
use crate::features::lags::{LagFeatures, MAX_LOOKBACK, SHORT_WINDOW};

/// Feature names in the order the transform produces them.
pub const FEATURE_NAMES: [&str; 19] = [
    "dayofweek",
    "month",
    "day",
    "is_weekend",
    "is_december",
    "days_to_christmas",
    "month_sin",
    "month_cos",
    "day_sin",
    "day_cos",
    "lag_1",
    "lag_7",
    "lag_14",
    "lag_21",
    "lag_30",
    "diff_1_7",
    "rolling_mean_7",
    "rolling_std_7",
    "rolling_mean_30",
];

/// Series must be longer than this to yield any rows.
pub const MIN_SERIES_LEN: usize = MAX_LOOKBACK + SHORT_WINDOW;

/// Ordered, duplicate-free list of feature names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SchemaRecord")]
pub struct FeatureSchema {
    names: Vec<String>,
}

#[derive(Deserialize)]
struct SchemaRecord {
    names: Vec<String>,
}

impl TryFrom<SchemaRecord> for FeatureSchema {
    type Error = ForecastError;

    fn try_from(record: SchemaRecord) -> Result<Self> {
        Self::new(record.names)
    }
}

impl FeatureSchema {
    /// Build a schema, rejecting empty or duplicated names.
    pub fn new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "feature schema must not be empty".to_string(),
            ));
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(ForecastError::InvalidParameter(format!(
                    "duplicate feature name '{name}'"
                )));
            }
        }
        Ok(Self { names })
    }

    /// The schema produced by [`build_feature_matrix`] and [`build_feature_row`].
    pub fn standard() -> Self {
        Self {
            names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Feature names in column order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Column index of `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Whether the schema has a feature called `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Reorder `values` (laid out by `produced`) into this schema's order.
    ///
    /// Every name on either side must be matched by the other; otherwise the
    /// unmatched names are reported in a `SchemaMismatch`.
    pub fn align(&self, produced: &FeatureSchema, values: &[f64]) -> Result<Vec<f64>> {
        if values.len() != produced.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: produced.len(),
                got: values.len(),
            });
        }

        let missing: Vec<String> = self
            .names
            .iter()
            .filter(|n| !produced.contains(n))
            .cloned()
            .collect();
        let unexpected: Vec<String> = produced
            .names
            .iter()
            .filter(|n| !self.contains(n))
            .cloned()
            .collect();
        if !missing.is_empty() || !unexpected.is_empty() {
            return Err(ForecastError::SchemaMismatch {
                missing,
                unexpected,
            });
        }

        Ok(self
            .names
            .iter()
            .filter_map(|n| produced.position(n).map(|i| values[i]))
            .collect())
    }
}

/// Features for one date, in [`FEATURE_NAMES`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub values: Vec<f64>,
}

impl FeatureRow {
    /// Value of a named feature.
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .and_then(|i| self.values.get(i).copied())
    }
}

/// Both target columns for a matrix row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetPair {
    pub clipped: f64,
    pub real: f64,
}

/// Date-aligned feature rows with their targets.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    schema: FeatureSchema,
    target_column: TargetColumn,
    rows: Vec<FeatureRow>,
    targets: Vec<TargetPair>,
}

impl FeatureMatrix {
    fn empty(target_column: TargetColumn) -> Self {
        Self {
            schema: FeatureSchema::standard(),
            target_column,
            rows: Vec::new(),
            targets: Vec::new(),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column layout of every row.
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Column the labels and lags were built from.
    pub fn target_column(&self) -> TargetColumn {
        self.target_column
    }

    /// Get the feature rows.
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    /// Get the label pairs aligned with the rows.
    pub fn targets(&self) -> &[TargetPair] {
        &self.targets
    }

    /// Get the row dates.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    /// Date of the first row.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    /// Date of the last row.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    /// Feature values as a dense design matrix.
    pub fn design(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(|r| r.values.clone()).collect()
    }

    /// Training labels from the matrix's target column.
    pub fn labels(&self) -> Vec<f64> {
        self.targets
            .iter()
            .map(|t| match self.target_column {
                TargetColumn::Clipped => t.clipped,
                TargetColumn::Raw => t.real,
            })
            .collect()
    }

    /// Unclipped values.
    pub fn actuals(&self) -> Vec<f64> {
        self.targets.iter().map(|t| t.real).collect()
    }

    /// Split chronologically into rows `[0, at)` and `[at, len)`.
    pub fn split_at(&self, at: usize) -> Result<(FeatureMatrix, FeatureMatrix)> {
        if at > self.rows.len() {
            return Err(ForecastError::IndexOutOfBounds {
                index: at,
                size: self.rows.len(),
            });
        }
        let (head_rows, tail_rows) = self.rows.split_at(at);
        let (head_targets, tail_targets) = self.targets.split_at(at);
        let part = |rows: &[FeatureRow], targets: &[TargetPair]| FeatureMatrix {
            schema: self.schema.clone(),
            target_column: self.target_column,
            rows: rows.to_vec(),
            targets: targets.to_vec(),
        };
        Ok((part(head_rows, head_targets), part(tail_rows, tail_targets)))
    }
}

/// Build the feature row for `date` from the prior target history.
///
/// `history` holds the target column for the days strictly before `date`,
/// most recent last. At least [`MAX_LOOKBACK`] values are required.
pub fn build_feature_row(date: NaiveDate, history: &[f64]) -> Result<FeatureRow> {
    let lags = LagFeatures::from_history(history)?;
    Ok(assemble_row(date, &lags))
}

/// Transform a daily series into a feature matrix.
///
/// Series of [`MIN_SERIES_LEN`] days or fewer give an empty matrix. Longer
/// series lose their first [`MAX_LOOKBACK`] days, which only feed lags.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use revenue_forecast::core::{DailySeries, TargetColumn};
/// use revenue_forecast::features::build_feature_matrix;
///
/// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let values: Vec<f64> = (0..90).map(|i| 100.0 + (i % 7) as f64).collect();
/// let series = DailySeries::from_values(start, &values).unwrap();
///
/// let matrix = build_feature_matrix(&series, TargetColumn::Clipped);
/// assert_eq!(matrix.len(), 60);
/// assert_eq!(matrix.first_date(), NaiveDate::from_ymd_opt(2024, 1, 31));
/// ```
pub fn build_feature_matrix(series: &DailySeries, target_column: TargetColumn) -> FeatureMatrix {
    if series.len() <= MIN_SERIES_LEN {
        return FeatureMatrix::empty(target_column);
    }

    let history = series.column(target_column);
    let (rows, targets): (Vec<FeatureRow>, Vec<TargetPair>) = series
        .iter()
        .enumerate()
        .skip(MAX_LOOKBACK)
        .map(|(i, obs)| {
            let lags = LagFeatures::compute(&history[..i]);
            (
                assemble_row(obs.date, &lags),
                TargetPair {
                    clipped: obs.clipped_value,
                    real: obs.value,
                },
            )
        })
        .unzip();

    FeatureMatrix {
        schema: FeatureSchema::standard(),
        target_column,
        rows,
        targets,
    }
}

fn assemble_row(date: NaiveDate, lags: &LagFeatures) -> FeatureRow {
    let cal = CalendarFeatures::for_date(date);
    let flag = |b: bool| if b { 1.0 } else { 0.0 };

    let mut values = Vec::with_capacity(FEATURE_NAMES.len());
    values.extend([
        cal.day_of_week as f64,
        cal.month as f64,
        cal.day as f64,
        flag(cal.is_weekend),
        flag(cal.is_december),
        cal.days_to_christmas as f64,
        cal.month_sin(),
        cal.month_cos(),
        cal.day_sin(),
        cal.day_cos(),
    ]);
    values.extend(lags.lags);
    values.extend([
        lags.diff_1_7,
        lags.rolling_mean_7,
        lags.rolling_std_7,
        lags.rolling_mean_30,
    ]);

    FeatureRow { date, values }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
    }

    fn ramp_series(n: usize) -> DailySeries {
        let values: Vec<f64> = (0..n).map(|i| i as f64).collect();
        DailySeries::from_values(start(), &values).unwrap()
    }

    fn names(list: &[&str]) -> FeatureSchema {
        FeatureSchema::new(list.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn matrix_drops_lookback_rows() {
        let matrix = build_feature_matrix(&ramp_series(100), TargetColumn::Clipped);

        assert_eq!(matrix.len(), 70);
        assert_eq!(matrix.schema(), &FeatureSchema::standard());
        assert_eq!(matrix.rows()[0].values.len(), FEATURE_NAMES.len());
        assert_eq!(matrix.first_date(), ramp_series(100).get(30).map(|o| o.date));
    }

    #[test]
    fn short_series_give_empty_matrix() {
        assert!(build_feature_matrix(&ramp_series(37), TargetColumn::Clipped).is_empty());
        assert_eq!(
            build_feature_matrix(&ramp_series(38), TargetColumn::Clipped).len(),
            8
        );
        assert!(build_feature_matrix(&ramp_series(0), TargetColumn::Raw).is_empty());
    }

    #[test]
    fn features_only_use_prior_days() {
        let matrix = build_feature_matrix(&ramp_series(60), TargetColumn::Clipped);

        // Row k corresponds to series index 30 + k whose value is 30 + k.
        for (k, row) in matrix.rows().iter().enumerate() {
            let today = (30 + k) as f64;
            assert_relative_eq!(row.get("lag_1").unwrap(), today - 1.0);
            assert_relative_eq!(row.get("lag_30").unwrap(), today - 30.0);
            assert_relative_eq!(row.get("rolling_mean_7").unwrap(), today - 4.0);
            assert!(row.get("rolling_mean_30").unwrap() < today);
        }
    }

    #[test]
    fn target_column_drives_lags_and_labels() {
        let dates: Vec<NaiveDate> = (0..45)
            .map(|i| start() + chrono::Duration::days(i))
            .collect();
        let raw: Vec<f64> = (0..45).map(|i| if i % 10 == 0 { 500.0 } else { 10.0 }).collect();
        let clipped: Vec<f64> = raw.iter().map(|v| v.min(50.0)).collect();
        let series = DailySeries::from_columns(&dates, &raw, &clipped).unwrap();

        let clipped_matrix = build_feature_matrix(&series, TargetColumn::Clipped);
        let raw_matrix = build_feature_matrix(&series, TargetColumn::Raw);

        // Row 0 is index 30; lag_30 points at index 0.
        assert_relative_eq!(clipped_matrix.rows()[0].get("lag_30").unwrap(), 50.0);
        assert_relative_eq!(raw_matrix.rows()[0].get("lag_30").unwrap(), 500.0);
        assert_relative_eq!(clipped_matrix.labels()[0], 50.0);
        assert_relative_eq!(raw_matrix.labels()[0], 500.0);
        assert_eq!(clipped_matrix.actuals(), raw_matrix.actuals());
    }

    #[test]
    fn matrix_rows_match_row_builder() {
        let series = ramp_series(50);
        let matrix = build_feature_matrix(&series, TargetColumn::Clipped);
        let history = series.clipped_values();

        let row = build_feature_row(matrix.rows()[5].date, &history[..35]).unwrap();
        assert_eq!(row, matrix.rows()[5]);
        assert!(build_feature_row(start(), &history[..29]).is_err());
    }

    #[test]
    fn split_at_is_chronological() {
        let matrix = build_feature_matrix(&ramp_series(80), TargetColumn::Clipped);
        let (train, test) = matrix.split_at(20).unwrap();

        assert_eq!(train.len(), 20);
        assert_eq!(test.len(), 30);
        assert!(train.last_date() < test.first_date());
        assert!(matrix.split_at(51).is_err());
    }

    #[test]
    fn align_reorders_by_name() {
        let model = names(&["b", "a"]);
        let produced = names(&["a", "b"]);

        assert_eq!(model.align(&produced, &[1.0, 2.0]).unwrap(), vec![2.0, 1.0]);
    }

    #[test]
    fn align_reports_missing_and_unexpected() {
        let model = names(&["a", "lag_365"]);
        let produced = names(&["a", "b"]);

        assert_eq!(
            model.align(&produced, &[1.0, 2.0]),
            Err(ForecastError::SchemaMismatch {
                missing: vec!["lag_365".to_string()],
                unexpected: vec!["b".to_string()],
            })
        );
    }

    #[test]
    fn schema_rejects_duplicates() {
        let result = FeatureSchema::new(vec!["a".to_string(), "a".to_string()]);
        assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));
        assert!(FeatureSchema::new(vec![]).is_err());
    }

    #[test]
    fn deserialized_schema_rejects_duplicates() {
        let decoded: FeatureSchema =
            serde_json::from_str(&serde_json::to_string(&FeatureSchema::standard()).unwrap())
                .unwrap();
        assert_eq!(decoded, FeatureSchema::standard());

        assert!(serde_json::from_str::<FeatureSchema>(r#"{"names":["lag_1","lag_1"]}"#).is_err());
        assert!(serde_json::from_str::<FeatureSchema>(r#"{"names":[]}"#).is_err());
    }
}
