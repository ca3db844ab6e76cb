//! Random hyperparameter search
//!
//! Samples a fixed number of trials from a [`SearchSpace`] and scores each
//! one with a caller-supplied objective. The search owns no hidden state:
//! the caller provides the RNG, and the full trial history comes back in
//! the outcome. Ties on the best score keep the earlier trial.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::tuner::space::{SearchSpace, TrialConfig};
use crate::utils::error::{CataractError, Result};

/// One completed trial with its sampled configuration and score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Zero-based trial index, in execution order
    pub index: usize,
    /// The sampled hyperparameters
    pub config: TrialConfig,
    /// Objective score (higher is better)
    pub score: f64,
}

/// The result of a finished search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Every trial, in execution order
    pub trials: Vec<TrialRecord>,
    /// The best trial (highest score; earliest on ties)
    pub best: TrialRecord,
}

/// Random search over a declared space
#[derive(Debug, Clone)]
pub struct RandomSearch {
    space: SearchSpace,
    max_trials: usize,
}

impl RandomSearch {
    /// Create a new search over `space` running `max_trials` trials
    pub fn new(space: SearchSpace, max_trials: usize) -> Result<Self> {
        if space.is_empty() {
            return Err(CataractError::Search(
                "Search space has no parameters".to_string(),
            ));
        }
        if max_trials == 0 {
            return Err(CataractError::Search(
                "max_trials must be at least 1".to_string(),
            ));
        }

        Ok(Self { space, max_trials })
    }

    /// The number of trials this search will run
    pub fn max_trials(&self) -> usize {
        self.max_trials
    }

    /// Run the search.
    ///
    /// Each trial samples a configuration and evaluates it with `objective`,
    /// which returns a score where higher is better. An objective failure
    /// aborts the whole search.
    pub fn run<R, F>(&self, rng: &mut R, mut objective: F) -> Result<SearchOutcome>
    where
        R: Rng,
        F: FnMut(usize, &TrialConfig) -> Result<f64>,
    {
        let mut trials: Vec<TrialRecord> = Vec::with_capacity(self.max_trials);
        let mut best: Option<usize> = None;

        for index in 0..self.max_trials {
            let config = self.space.sample(rng);
            info!("Trial {}/{}: {}", index + 1, self.max_trials, config);

            let score = objective(index, &config)?;
            info!("Trial {}/{} scored {:.4}", index + 1, self.max_trials, score);

            trials.push(TrialRecord {
                index,
                config,
                score,
            });

            // Strict comparison keeps the first trial on ties
            let improved = match best {
                Some(best_idx) => score > trials[best_idx].score,
                None => true,
            };
            if improved {
                best = Some(index);
                info!("Trial {} is the new best ({:.4})", index + 1, score);
            }
        }

        let best_idx = best.ok_or_else(|| {
            CataractError::Search("Search finished without any completed trial".to_string())
        })?;
        let best = trials[best_idx].clone();

        info!(
            "Search complete: best trial {} with score {:.4}",
            best.index + 1,
            best.score
        );

        Ok(SearchOutcome { trials, best })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuner::space::{ParamRange, ParamValue};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn int_space() -> SearchSpace {
        let mut space = SearchSpace::new();
        space
            .add("width", ParamRange::Int { min: 0, max: 100, step: 10 })
            .unwrap();
        space
    }

    #[test]
    fn test_runs_requested_number_of_trials() {
        let search = RandomSearch::new(int_space(), 5).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(38);

        let outcome = search.run(&mut rng, |_, _| Ok(0.5)).unwrap();
        assert_eq!(outcome.trials.len(), 5);
    }

    #[test]
    fn test_best_is_highest_score() {
        let search = RandomSearch::new(int_space(), 4).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(38);

        let scores = [0.3, 0.9, 0.7, 0.8];
        let outcome = search
            .run(&mut rng, |index, _| Ok(scores[index]))
            .unwrap();

        assert_eq!(outcome.best.index, 1);
        assert!((outcome.best.score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_ties_keep_the_first_trial() {
        let search = RandomSearch::new(int_space(), 3).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(38);

        let outcome = search.run(&mut rng, |_, _| Ok(0.75)).unwrap();
        assert_eq!(outcome.best.index, 0);
    }

    #[test]
    fn test_objective_sees_sampled_values() {
        let search = RandomSearch::new(int_space(), 3).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(38);

        // Score by the sampled width itself: best trial carries the max width
        let outcome = search
            .run(&mut rng, |_, config| Ok(config.get_int("width")? as f64))
            .unwrap();

        let best_width = outcome.best.config.get_int("width").unwrap();
        for trial in &outcome.trials {
            assert!(trial.config.get_int("width").unwrap() <= best_width);
        }
    }

    #[test]
    fn test_objective_failure_aborts() {
        let search = RandomSearch::new(int_space(), 3).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(38);

        let result = search.run(&mut rng, |index, _| {
            if index == 1 {
                Err(CataractError::Training("diverged".to_string()))
            } else {
                Ok(0.5)
            }
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_space_rejected() {
        assert!(RandomSearch::new(SearchSpace::new(), 5).is_err());
    }

    #[test]
    fn test_zero_trials_rejected() {
        assert!(RandomSearch::new(int_space(), 0).is_err());
    }

    #[test]
    fn test_same_seed_same_samples() {
        let search = RandomSearch::new(int_space(), 5).unwrap();

        let collect = |seed: u64| -> Vec<ParamValue> {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let outcome = search.run(&mut rng, |_, _| Ok(0.0)).unwrap();
            outcome
                .trials
                .iter()
                .map(|t| ParamValue::Int(t.config.get_int("width").unwrap()))
                .collect()
        };

        assert_eq!(collect(9), collect(9));
    }
}
