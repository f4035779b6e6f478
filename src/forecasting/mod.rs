//! Multi-step forecasting with a single-step model.

mod recursive;

pub use recursive::{RecursiveForecaster, DEFAULT_HORIZON};
