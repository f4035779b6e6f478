//! Flat history-plus-forecast records for BI tools.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::core::{DailySeries, ForecastSeries};

/// Trailing window of the trend line.
pub const TREND_WINDOW: usize = 7;

/// Whether a record is observed or predicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordCategory {
    Actual,
    Forecast,
}

/// One row of the master report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReportRecord {
    pub date: NaiveDate,
    pub revenue: f64,
    pub category: RecordCategory,
    /// Full weekday name, e.g. "Monday".
    pub weekday: String,
    /// Full month name, e.g. "January".
    pub month: String,
    pub is_weekend: bool,
    pub year: i32,
    /// Mean revenue of this row and the six before it.
    #[serde(rename = "TrendLine_7D")]
    pub trend_line_7d: Option<f64>,
}

/// History (raw values) followed by the forecast, with calendar labels and a
/// trailing 7-row mean over the unified sequence.
pub fn master_report(history: &DailySeries, forecast: &ForecastSeries) -> Vec<ReportRecord> {
    let actual = history
        .iter()
        .map(|obs| (obs.date, obs.value, RecordCategory::Actual));
    let predicted = forecast
        .iter()
        .map(|p| (p.date, p.predicted_value, RecordCategory::Forecast));
    let unified: Vec<(NaiveDate, f64, RecordCategory)> = actual.chain(predicted).collect();

    unified
        .iter()
        .enumerate()
        .map(|(i, &(date, revenue, category))| {
            let trend_line_7d = (i + 1 >= TREND_WINDOW).then(|| {
                unified[i + 1 - TREND_WINDOW..=i]
                    .iter()
                    .map(|r| r.1)
                    .sum::<f64>()
                    / TREND_WINDOW as f64
            });
            ReportRecord {
                date,
                revenue,
                category,
                weekday: date.format("%A").to_string(),
                month: date.format("%B").to_string(),
                is_weekend: date.weekday().num_days_from_monday() >= 5,
                year: date.year(),
                trend_line_7d,
            }
        })
        .collect()
}
