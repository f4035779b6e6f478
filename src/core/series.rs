//! Gap-free daily revenue series.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::utils::stats::quantile;

/// Default multiplier for the upper outlier cap `Q3 + k * IQR`.
pub const DEFAULT_IQR_MULTIPLIER: f64 = 5.0;

/// Which column drives lag features and the training label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TargetColumn {
    /// Outlier-capped revenue.
    #[default]
    Clipped,
    /// Revenue as observed.
    Raw,
}

impl TargetColumn {
    /// Pick this column's value from an observation.
    pub fn select(self, obs: &DailyObservation) -> f64 {
        match self {
            TargetColumn::Clipped => obs.clipped_value,
            TargetColumn::Raw => obs.value,
        }
    }
}

/// One calendar day of revenue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyObservation {
    pub date: NaiveDate,
    pub value: f64,
    pub clipped_value: f64,
}

impl DailyObservation {
    /// Create an observation.
    pub fn new(date: NaiveDate, value: f64, clipped_value: f64) -> Self {
        Self {
            date,
            value,
            clipped_value,
        }
    }

    /// Observation whose clipped value equals its raw value.
    pub fn unclipped(date: NaiveDate, value: f64) -> Self {
        Self::new(date, value, value)
    }
}

/// A daily series with exactly one observation per calendar day.
///
/// Invariants (checked on construction):
/// - dates are consecutive calendar days,
/// - values are finite and non-negative,
/// - `clipped_value <= value`.
///
/// Deserialization goes through [`DailySeries::new`], so decoded series obey
/// the same invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SeriesRecord")]
pub struct DailySeries {
    observations: Vec<DailyObservation>,
}

/// Serialized form of [`DailySeries`], validated on conversion.
#[derive(Deserialize)]
struct SeriesRecord {
    observations: Vec<DailyObservation>,
}

impl TryFrom<SeriesRecord> for DailySeries {
    type Error = ForecastError;

    fn try_from(record: SeriesRecord) -> Result<Self> {
        Self::new(record.observations)
    }
}

impl DailySeries {
    /// Build a series from observations, validating the invariants.
    pub fn new(observations: Vec<DailyObservation>) -> Result<Self> {
        for (i, obs) in observations.iter().enumerate() {
            if !obs.value.is_finite() || !obs.clipped_value.is_finite() {
                return Err(ForecastError::InvalidParameter(format!(
                    "non-finite value on {}",
                    obs.date
                )));
            }
            if obs.value < 0.0 || obs.clipped_value < 0.0 {
                return Err(ForecastError::InvalidParameter(format!(
                    "negative value on {}",
                    obs.date
                )));
            }
            if obs.clipped_value > obs.value {
                return Err(ForecastError::InvalidParameter(format!(
                    "clipped value {} exceeds value {} on {}",
                    obs.clipped_value, obs.value, obs.date
                )));
            }
            if i > 0 {
                let prev = observations[i - 1].date;
                if prev.succ_opt() != Some(obs.date) {
                    return Err(ForecastError::TimestampError(format!(
                        "dates must be consecutive days: {} followed by {}",
                        prev, obs.date
                    )));
                }
            }
        }
        Ok(Self { observations })
    }

    /// Build a series from parallel columns.
    pub fn from_columns(dates: &[NaiveDate], values: &[f64], clipped: &[f64]) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: dates.len(),
                got: values.len(),
            });
        }
        if dates.len() != clipped.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: dates.len(),
                got: clipped.len(),
            });
        }
        let observations = dates
            .iter()
            .zip(values.iter().zip(clipped))
            .map(|(&date, (&value, &clipped_value))| {
                DailyObservation::new(date, value, clipped_value)
            })
            .collect();
        Self::new(observations)
    }

    /// Consecutive days starting at `start` with no clipping applied.
    ///
    /// # Example
    /// ```
    /// use chrono::NaiveDate;
    /// use revenue_forecast::core::DailySeries;
    ///
    /// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    /// let series = DailySeries::from_values(start, &[10.0, 12.0, 9.0]).unwrap();
    /// assert_eq!(series.len(), 3);
    /// assert_eq!(series.last_date(), NaiveDate::from_ymd_opt(2024, 1, 3));
    /// ```
    pub fn from_values(start: NaiveDate, values: &[f64]) -> Result<Self> {
        let observations = values
            .iter()
            .enumerate()
            .map(|(i, &v)| DailyObservation::unclipped(start + Duration::days(i as i64), v))
            .collect();
        Self::new(observations)
    }

    /// Build a clean series from per-day revenue totals.
    ///
    /// Totals sharing a date are summed. The clipped column is capped at
    /// `Q3 + iqr_multiplier * IQR` of the observed days, then missing days
    /// between the first and last date are filled with zero in both columns.
    pub fn from_daily_totals(totals: &[(NaiveDate, f64)], iqr_multiplier: f64) -> Result<Self> {
        if totals.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if !(iqr_multiplier >= 0.0 && iqr_multiplier.is_finite()) {
            return Err(ForecastError::InvalidParameter(format!(
                "iqr_multiplier must be non-negative, got {iqr_multiplier}"
            )));
        }

        let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for &(date, amount) in totals {
            *by_day.entry(date).or_insert(0.0) += amount;
        }

        let observed: Vec<f64> = by_day.values().copied().collect();
        let q1 = quantile(&observed, 0.25);
        let q3 = quantile(&observed, 0.75);
        let upper_cap = q3 + iqr_multiplier * (q3 - q1);

        let (first, last) = match (by_day.keys().next(), by_day.keys().next_back()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return Err(ForecastError::EmptyData),
        };

        let observations = first
            .iter_days()
            .take_while(|d| *d <= last)
            .map(|date| match by_day.get(&date) {
                Some(&value) => DailyObservation::new(date, value, value.min(upper_cap)),
                None => DailyObservation::new(date, 0.0, 0.0),
            })
            .collect();

        Self::new(observations)
    }

    /// Number of days.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Get the observations.
    pub fn observations(&self) -> &[DailyObservation] {
        &self.observations
    }

    /// Iterate over the observations.
    pub fn iter(&self) -> impl Iterator<Item = &DailyObservation> {
        self.observations.iter()
    }

    /// Observation at `index`.
    pub fn get(&self, index: usize) -> Option<&DailyObservation> {
        self.observations.get(index)
    }

    /// First day of the series.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    /// Last day of the series.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }

    /// Get the dates.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.observations.iter().map(|o| o.date).collect()
    }

    /// Raw values.
    pub fn values(&self) -> Vec<f64> {
        self.column(TargetColumn::Raw)
    }

    /// Outlier-capped values.
    pub fn clipped_values(&self) -> Vec<f64> {
        self.column(TargetColumn::Clipped)
    }

    /// Values of the selected column.
    pub fn column(&self, column: TargetColumn) -> Vec<f64> {
        self.observations.iter().map(|o| column.select(o)).collect()
    }

    /// The last `n` days (or the whole series when shorter).
    pub fn tail(&self, n: usize) -> DailySeries {
        let start = self.observations.len().saturating_sub(n);
        DailySeries {
            observations: self.observations[start..].to_vec(),
        }
    }

    /// Sub-series `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> Result<DailySeries> {
        if start > end || end > self.observations.len() {
            return Err(ForecastError::IndexOutOfBounds {
                index: end,
                size: self.observations.len(),
            });
        }
        Ok(DailySeries {
            observations: self.observations[start..end].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn from_values_builds_consecutive_days() {
        let series = DailySeries::from_values(day(2023, 12, 30), &[1.0, 2.0, 3.0]).unwrap();

        assert_eq!(
            series.dates(),
            vec![day(2023, 12, 30), day(2023, 12, 31), day(2024, 1, 1)]
        );
        assert_eq!(series.values(), series.clipped_values());
    }

    #[test]
    fn gaps_are_rejected() {
        let obs = vec![
            DailyObservation::unclipped(day(2024, 1, 1), 1.0),
            DailyObservation::unclipped(day(2024, 1, 3), 1.0),
        ];
        assert!(matches!(
            DailySeries::new(obs),
            Err(ForecastError::TimestampError(_))
        ));
    }

    #[test]
    fn unordered_and_duplicate_dates_are_rejected() {
        let dup = vec![
            DailyObservation::unclipped(day(2024, 1, 1), 1.0),
            DailyObservation::unclipped(day(2024, 1, 1), 1.0),
        ];
        assert!(DailySeries::new(dup).is_err());

        let backwards = vec![
            DailyObservation::unclipped(day(2024, 1, 2), 1.0),
            DailyObservation::unclipped(day(2024, 1, 1), 1.0),
        ];
        assert!(DailySeries::new(backwards).is_err());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let negative = vec![DailyObservation::unclipped(day(2024, 1, 1), -1.0)];
        assert!(matches!(
            DailySeries::new(negative),
            Err(ForecastError::InvalidParameter(_))
        ));

        let over_clipped = vec![DailyObservation::new(day(2024, 1, 1), 5.0, 6.0)];
        assert!(DailySeries::new(over_clipped).is_err());

        let nan = vec![DailyObservation::unclipped(day(2024, 1, 1), f64::NAN)];
        assert!(DailySeries::new(nan).is_err());
    }

    #[test]
    fn from_columns_checks_lengths() {
        let dates = [day(2024, 1, 1), day(2024, 1, 2)];
        assert!(matches!(
            DailySeries::from_columns(&dates, &[1.0], &[1.0, 1.0]),
            Err(ForecastError::DimensionMismatch { .. })
        ));
        let series = DailySeries::from_columns(&dates, &[3.0, 4.0], &[3.0, 2.0]).unwrap();
        assert_eq!(series.clipped_values(), vec![3.0, 2.0]);
        assert_eq!(series.column(TargetColumn::Raw), vec![3.0, 4.0]);
    }

    #[test]
    fn daily_totals_fill_gaps_and_sum_duplicates() {
        let totals = [
            (day(2024, 1, 1), 10.0),
            (day(2024, 1, 1), 5.0),
            (day(2024, 1, 4), 20.0),
        ];
        let series = DailySeries::from_daily_totals(&totals, DEFAULT_IQR_MULTIPLIER).unwrap();

        assert_eq!(series.len(), 4);
        assert_eq!(series.values(), vec![15.0, 0.0, 0.0, 20.0]);
    }

    #[test]
    fn daily_totals_cap_outliers() {
        // Observed: 1..=8 and one spike of 1000.
        let mut totals: Vec<(NaiveDate, f64)> = (1..=8)
            .map(|d| (day(2024, 3, d), d as f64))
            .collect();
        totals.push((day(2024, 3, 9), 1000.0));

        let series = DailySeries::from_daily_totals(&totals, 1.5).unwrap();

        // Q1 = 3, Q3 = 7, IQR = 4, cap = 13
        let last = series.get(8).unwrap();
        assert_relative_eq!(last.value, 1000.0);
        assert_relative_eq!(last.clipped_value, 13.0, epsilon = 1e-12);
        assert_relative_eq!(series.get(0).unwrap().clipped_value, 1.0);
    }

    #[test]
    fn daily_totals_reject_empty_input() {
        assert!(matches!(
            DailySeries::from_daily_totals(&[], 5.0),
            Err(ForecastError::EmptyData)
        ));
    }

    #[test]
    fn tail_and_slice() {
        let series = DailySeries::from_values(day(2024, 1, 1), &[1.0, 2.0, 3.0, 4.0]).unwrap();

        let tail = series.tail(2);
        assert_eq!(tail.values(), vec![3.0, 4.0]);
        assert_eq!(tail.first_date(), Some(day(2024, 1, 3)));
        assert_eq!(series.tail(10).len(), 4);

        let mid = series.slice(1, 3).unwrap();
        assert_eq!(mid.values(), vec![2.0, 3.0]);
        assert!(series.slice(2, 9).is_err());
    }

    #[test]
    fn deserialization_round_trips_valid_series() {
        let series = DailySeries::from_values(day(2024, 2, 28), &[5.0, 6.0, 7.0]).unwrap();

        let json = serde_json::to_string(&series).unwrap();
        let decoded: DailySeries = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded, series);
    }

    #[test]
    fn deserialization_enforces_invariants() {
        let unordered = r#"{"observations":[
            {"date":"2024-01-05","value":3.0,"clipped_value":3.0},
            {"date":"2024-01-01","value":4.0,"clipped_value":4.0}]}"#;
        let gapped = r#"{"observations":[
            {"date":"2024-01-01","value":3.0,"clipped_value":3.0},
            {"date":"2024-01-03","value":4.0,"clipped_value":4.0}]}"#;
        let negative = r#"{"observations":[
            {"date":"2024-01-01","value":-3.0,"clipped_value":-3.0}]}"#;
        let overclipped = r#"{"observations":[
            {"date":"2024-01-01","value":3.0,"clipped_value":9.0}]}"#;

        for json in [unordered, gapped, negative, overclipped] {
            assert!(serde_json::from_str::<DailySeries>(json).is_err(), "{json}");
        }
    }
}
