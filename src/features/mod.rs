//! Feature engineering for daily revenue.
//!
//! One row per date: calendar features from the date itself plus lag and
//! rolling-window features from the target history strictly before it. The
//! same row builder serves training ([`build_feature_matrix`]) and recursive
//! inference ([`build_feature_row`]), so both see identical definitions.

pub mod calendar;
pub mod lags;
mod matrix;

pub use matrix::{
    build_feature_matrix, build_feature_row, FeatureMatrix, FeatureRow, FeatureSchema,
    TargetPair, FEATURE_NAMES, MIN_SERIES_LEN,
};
