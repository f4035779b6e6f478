//! Utility functions shared by training and evaluation.

pub mod cross_validation;
pub mod metrics;
pub mod stats;

pub use cross_validation::{cross_validate, CVResults, Fold, TimeSeriesSplit};
pub use metrics::{calculate_metrics, AccuracyMetrics};
pub use stats::quantile;
