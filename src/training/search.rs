//! Randomized hyperparameter search under time-series cross-validation.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::{ParamGrid, SearchConfig};
use crate::error::{ForecastError, Result};
use crate::models::{GbmParams, GradientBoostingRegressor};
use crate::utils::cross_validation::{score_fold, CVResults, TimeSeriesSplit};

/// Outcome of evaluating one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub params: GbmParams,
    /// Cross-validation scores, or the error that stopped the candidate.
    pub outcome: std::result::Result<CVResults, ForecastError>,
}

impl CandidateScore {
    /// Mean validation MAE, if the candidate was scored.
    pub fn mean_mae(&self) -> Option<f64> {
        self.outcome.as_ref().ok().map(|cv| cv.mean_mae)
    }
}

/// Result of a completed search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Winning hyperparameters.
    pub best_params: GbmParams,
    /// Cross-validation scores of the winner.
    pub best_cv: CVResults,
    /// Every candidate in evaluation order.
    pub candidates: Vec<CandidateScore>,
}

impl SearchResult {
    /// Number of candidates that could not be scored.
    pub fn n_failed(&self) -> usize {
        self.candidates.iter().filter(|c| c.outcome.is_err()).count()
    }
}

/// Draw up to `n_iter` distinct grid points with a seeded RNG.
///
/// When the grid has no more than `n_iter` points, all of them are returned
/// in grid order.
pub fn sample_candidates(
    grid: &ParamGrid,
    base: &GbmParams,
    n_iter: usize,
    seed: u64,
) -> Vec<GbmParams> {
    let all = grid.combinations(base);
    if all.len() <= n_iter {
        return all;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    index::sample(&mut rng, all.len(), n_iter)
        .into_iter()
        .map(|i| all[i].clone())
        .collect()
}

/// Randomized search over a [`ParamGrid`] scored by mean validation MAE.
#[derive(Debug, Clone)]
pub struct RandomizedSearch {
    config: SearchConfig,
    base: GbmParams,
}

impl RandomizedSearch {
    /// Create a search; `base` supplies the fields the grid leaves open.
    pub fn new(config: SearchConfig, base: GbmParams) -> Self {
        Self { config, base }
    }

    /// Get the search settings.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    fn splitter(&self) -> TimeSeriesSplit {
        let split = TimeSeriesSplit::new(self.config.n_splits);
        match self.config.max_train_size {
            Some(size) => split.with_max_train_size(size),
            None => split,
        }
    }

    /// Evaluate the sampled candidates and pick the lowest mean MAE.
    ///
    /// `(candidate, fold)` pairs are scored in parallel; ties go to the
    /// candidate sampled first.
    pub fn run(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<SearchResult> {
        self.config.validate(&self.base)?;
        let folds = self.splitter().split(features.len())?;
        let candidates = sample_candidates(
            &self.config.grid,
            &self.base,
            self.config.n_iter,
            self.config.seed,
        );

        info!(
            candidates = candidates.len(),
            folds = folds.len(),
            rows = features.len(),
            "starting randomized search"
        );

        let jobs: Vec<(usize, usize)> = (0..candidates.len())
            .flat_map(|c| (0..folds.len()).map(move |f| (c, f)))
            .collect();

        let fold_scores: Vec<Result<f64>> = jobs
            .par_iter()
            .map(|&(c, f)| {
                let model = GradientBoostingRegressor::new(candidates[c].clone());
                score_fold(model, &folds[f], features, targets)
            })
            .collect();

        let scored: Vec<CandidateScore> = candidates
            .into_iter()
            .zip(fold_scores.chunks(folds.len()))
            .map(|(params, scores)| {
                let outcome = scores
                    .iter()
                    .cloned()
                    .collect::<Result<Vec<f64>>>()
                    .and_then(CVResults::from_fold_scores);
                match &outcome {
                    Ok(cv) => debug!(params = %params.key(), mean_mae = cv.mean_mae, "candidate scored"),
                    Err(err) => warn!(params = %params.key(), error = %err, "candidate failed"),
                }
                CandidateScore { params, outcome }
            })
            .collect();

        let mut best: Option<(usize, f64)> = None;
        for (i, candidate) in scored.iter().enumerate() {
            if let Some(score) = candidate.mean_mae() {
                if best.map_or(true, |(_, b)| score < b) {
                    best = Some((i, score));
                }
            }
        }

        let Some((best_idx, best_mae)) = best else {
            return Err(ForecastError::SearchExhausted(format!(
                "0 of {} candidates scored",
                scored.len()
            )));
        };

        let winner = &scored[best_idx];
        let best_cv = match &winner.outcome {
            Ok(cv) => cv.clone(),
            Err(err) => return Err(err.clone()),
        };

        info!(
            best = %winner.params.key(),
            mean_mae = best_mae,
            failed = scored.iter().filter(|c| c.outcome.is_err()).count(),
            "randomized search finished"
        );

        Ok(SearchResult {
            best_params: winner.params.clone(),
            best_cv,
            candidates: scored,
        })
    }
}
