//! # revenue-forecast
//!
//! Daily revenue forecasting with gradient-boosted trees over engineered
//! calendar and lag features.
//!
//! The crate turns a clean daily series into a 30-day forecast in three
//! stages: a feature transform that only looks backwards in time, a trainer
//! that selects hyperparameters by randomized search under time-series
//! cross-validation and backtests on a chronological hold-out, and a
//! recursive forecaster that feeds each prediction back as history for the
//! next day.
//!
//! # Example
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use revenue_forecast::prelude::*;
//!
//! let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
//! let values: Vec<f64> = (0..365).map(|i| 500.0 + (i % 7) as f64 * 40.0).collect();
//! let series = DailySeries::from_values(start, &values)?;
//!
//! let output = Pipeline::new(PipelineConfig::default())?.run(&series)?;
//! for point in output.forecast.top_peaks(5) {
//!     println!("{}: {:.0}", point.date, point.predicted_value);
//! }
//! # Ok::<(), ForecastError>(())
//! ```

#![allow(clippy::needless_range_loop)]

pub mod config;
pub mod core;
pub mod error;
pub mod features;
pub mod forecasting;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod training;
pub mod utils;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::config::{ParamGrid, PipelineConfig, SearchConfig};
    pub use crate::core::{
        BacktestSeries, DailyObservation, DailySeries, ForecastPoint, ForecastSeries, TargetColumn,
    };
    pub use crate::error::{ForecastError, Result};
    pub use crate::features::{build_feature_matrix, FeatureMatrix, FeatureSchema};
    pub use crate::forecasting::RecursiveForecaster;
    pub use crate::models::{GbmParams, GradientBoostingRegressor, Regressor};
    pub use crate::pipeline::{Pipeline, PipelineOutput};
    pub use crate::report::{master_report, ReportRecord};
    pub use crate::training::{TrainedModel, Trainer};
    pub use crate::utils::{calculate_metrics, AccuracyMetrics};
}
