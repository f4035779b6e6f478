//! Single-step regression models.

mod traits;

pub mod gbm;

pub use gbm::{GbmParams, GradientBoostingRegressor};
pub use traits::Regressor;
