//! Calendar features derived from a row's date alone.

use std::f64::consts::PI;

use chrono::{Datelike, NaiveDate};

/// Days-to-Christmas values outside `[0, CHRISTMAS_WINDOW]` collapse to this bucket.
pub const FAR_FROM_CHRISTMAS: i64 = 31;

/// Width of the pre-Christmas countdown window in days.
pub const CHRISTMAS_WINDOW: i64 = 30;

/// Date-only features for one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalendarFeatures {
    /// Monday = 0 .. Sunday = 6.
    pub day_of_week: u32,
    /// 1..=12.
    pub month: u32,
    /// 1..=31.
    pub day: u32,
    pub is_weekend: bool,
    pub is_december: bool,
    pub days_to_christmas: i64,
}

impl CalendarFeatures {
    /// Calendar features of one day.
    pub fn for_date(date: NaiveDate) -> Self {
        let day_of_week = date.weekday().num_days_from_monday();
        let month = date.month();
        Self {
            day_of_week,
            month,
            day: date.day(),
            is_weekend: day_of_week >= 5,
            is_december: month == 12,
            days_to_christmas: days_to_christmas(date),
        }
    }

    /// Yearly cycle encoded on the month.
    pub fn month_sin(&self) -> f64 {
        (2.0 * PI * self.month as f64 / 12.0).sin()
    }

    /// Cosine counterpart of [`month_sin`](Self::month_sin).
    pub fn month_cos(&self) -> f64 {
        (2.0 * PI * self.month as f64 / 12.0).cos()
    }

    /// Weekly cycle encoded on the day of week.
    pub fn day_sin(&self) -> f64 {
        (2.0 * PI * self.day_of_week as f64 / 7.0).sin()
    }

    /// Cosine counterpart of [`day_sin`](Self::day_sin).
    pub fn day_cos(&self) -> f64 {
        (2.0 * PI * self.day_of_week as f64 / 7.0).cos()
    }
}

/// Days from `date` to December 25 of the same year, bucketed.
///
/// Only the 30-day run-up keeps its exact count; every other date, including
/// Dec 26-31, maps to [`FAR_FROM_CHRISTMAS`].
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use revenue_forecast::features::calendar::days_to_christmas;
///
/// let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
/// assert_eq!(days_to_christmas(d(12, 20)), 5);
/// assert_eq!(days_to_christmas(d(12, 25)), 0);
/// assert_eq!(days_to_christmas(d(12, 26)), 31);
/// assert_eq!(days_to_christmas(d(7, 1)), 31);
/// ```
pub fn days_to_christmas(date: NaiveDate) -> i64 {
    match NaiveDate::from_ymd_opt(date.year(), 12, 25) {
        Some(christmas) => {
            let days = (christmas - date).num_days();
            if (0..=CHRISTMAS_WINDOW).contains(&days) {
                days
            } else {
                FAR_FROM_CHRISTMAS
            }
        }
        None => FAR_FROM_CHRISTMAS,
    }
}
