//! Two-stage deterministic dataset splitting
//!
//! The dataset is partitioned with two seeded carves:
//! 1. shuffle everything and carve off the test set
//! 2. re-seed, shuffle what remains and carve off the validation set
//!
//! Both stages use a fresh RNG seeded with the same value, so the full
//! partition is reproducible from a single seed. The carve size is
//! `round(len * fraction)`.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::dataset::loader::FundusItem;
use crate::utils::error::{CataractError, Result};
use crate::SPLIT_SEED;

/// Configuration for dataset splitting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of the whole dataset carved off as the test set
    pub test_fraction: f64,
    /// Fraction of the remainder carved off as the validation set
    pub validation_fraction: f64,
    /// Seed used by both carve stages
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.20,
            validation_fraction: 0.10,
            seed: SPLIT_SEED,
        }
    }
}

impl SplitConfig {
    /// Create a new split configuration, validating the fractions.
    ///
    /// Both fractions must lie strictly inside (0, 1) and sum to less
    /// than 1, so every split ends up non-degenerate.
    pub fn new(test_fraction: f64, validation_fraction: f64, seed: u64) -> Result<Self> {
        if test_fraction <= 0.0 || test_fraction >= 1.0 {
            return Err(CataractError::Config(
                "Test fraction must be in (0.0, 1.0)".to_string(),
            ));
        }
        if validation_fraction <= 0.0 || validation_fraction >= 1.0 {
            return Err(CataractError::Config(
                "Validation fraction must be in (0.0, 1.0)".to_string(),
            ));
        }
        if test_fraction + validation_fraction >= 1.0 {
            return Err(CataractError::Config(
                "Test + validation fractions must be less than 1.0".to_string(),
            ));
        }

        Ok(Self {
            test_fraction,
            validation_fraction,
            seed,
        })
    }
}

/// Train/validation/test partition of a dataset
#[derive(Debug, Clone)]
pub struct DatasetSplits {
    /// Training items
    pub train: Vec<FundusItem>,
    /// Validation items (carved from the non-test remainder)
    pub validation: Vec<FundusItem>,
    /// Test items (carved first, never seen during training)
    pub test: Vec<FundusItem>,
    /// Configuration used to create these splits
    pub config: SplitConfig,
}

impl DatasetSplits {
    /// Partition `items` according to `config`.
    ///
    /// Stage 1 carves the test set off the whole dataset; stage 2 carves the
    /// validation set off what remains, with a fresh RNG seeded identically.
    pub fn from_items(items: Vec<FundusItem>, config: SplitConfig) -> Result<Self> {
        if items.is_empty() {
            return Err(CataractError::Dataset(
                "No items provided for splitting".to_string(),
            ));
        }

        let (test, remainder) = carve(items, config.test_fraction, config.seed);
        let (validation, train) = carve(remainder, config.validation_fraction, config.seed);

        if train.is_empty() {
            return Err(CataractError::Dataset(
                "Split fractions leave no training items".to_string(),
            ));
        }

        Ok(Self {
            train,
            validation,
            test,
            config,
        })
    }

    /// Total number of items across all three splits
    pub fn total(&self) -> usize {
        self.train.len() + self.validation.len() + self.test.len()
    }

    /// Count items of a label in one split
    pub fn label_count(split: &[FundusItem], label: usize) -> usize {
        split.iter().filter(|item| item.label == label).count()
    }
}

/// Shuffle `items` with a fresh seeded RNG and split off `round(len * fraction)`
/// items. Returns `(taken, rest)`.
fn carve(mut items: Vec<FundusItem>, fraction: f64, seed: u64) -> (Vec<FundusItem>, Vec<FundusItem>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    items.shuffle(&mut rng);

    let n_taken = ((items.len() as f64) * fraction).round() as usize;
    let n_taken = n_taken.min(items.len());

    let rest = items.split_off(n_taken);
    (items, rest)
}
