//! Model selection and training.
//!
//! The final rows of the feature matrix are withheld as a backtest; the rest
//! feed a randomized hyperparameter search under time-series
//! cross-validation, after which the winner is refit on the whole training
//! pool.

mod model;
mod search;
mod trainer;

pub use model::TrainedModel;
pub use search::{sample_candidates, CandidateScore, RandomizedSearch, SearchResult};
pub use trainer::{Trainer, TrainingOutcome};
