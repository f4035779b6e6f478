//! Core data structures for daily revenue forecasting.

mod forecast;
mod series;

pub use forecast::{BacktestPoint, BacktestSeries, BandPoint, ForecastPoint, ForecastSeries};
pub use series::{DailyObservation, DailySeries, TargetColumn, DEFAULT_IQR_MULTIPLIER};
