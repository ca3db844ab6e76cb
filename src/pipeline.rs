//! End-to-end experiment pipeline
//!
//! One experiment run takes a loaded dataset through splitting, random
//! hyperparameter search, final training and evaluation on all three
//! splits. Each run owns its own search state: a fresh RNG is created per
//! run, so nothing carries over between experiments with different split
//! fractions.

use burn::tensor::backend::AutodiffBackend;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::loader::FundusDataset;
use crate::dataset::split::{DatasetSplits, SplitConfig};
use crate::model::config::ClassifierConfig;
use crate::training::trainer::{FitSummary, Trainer, TrainingConfig};
use crate::tuner::search::{RandomSearch, SearchOutcome};
use crate::tuner::space::SearchSpace;
use crate::utils::error::{CataractError, Result};
use crate::utils::metrics::Metrics;

/// Configuration for one experiment run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// How the dataset is partitioned
    pub split: SplitConfig,
    /// Hyperparameter space to search
    pub space: SearchSpace,
    /// Number of random-search trials
    pub max_trials: usize,
    /// Epochs per search trial
    pub search_epochs: usize,
    /// Epochs for the final training run
    pub final_epochs: usize,
    /// Batch size for training and evaluation
    pub batch_size: usize,
    /// Adam learning rate
    pub learning_rate: f64,
    /// Edge length images are resized to
    pub image_size: usize,
    /// Seed for this run's search RNG
    pub search_seed: u64,
}

impl ExperimentConfig {
    /// Validate the configuration before any work starts
    pub fn validate(&self) -> Result<()> {
        if self.max_trials == 0 {
            return Err(CataractError::Config(
                "max_trials must be at least 1".to_string(),
            ));
        }
        if self.search_epochs == 0 || self.final_epochs == 0 {
            return Err(CataractError::Config(
                "search_epochs and final_epochs must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(CataractError::Config(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.learning_rate <= 0.0 {
            return Err(CataractError::Config(
                "learning_rate must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Metrics for one evaluated split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitReport {
    /// Split name ("validation", "test" or "train")
    pub name: String,
    /// Mean loss over the split
    pub loss: f64,
    /// Full evaluation metrics
    pub metrics: Metrics,
}

/// Everything one experiment run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentReport {
    /// The split configuration of this run
    pub split: SplitConfig,
    /// Sizes of the three splits
    pub train_size: usize,
    pub validation_size: usize,
    pub test_size: usize,
    /// Full search history and the winning trial
    pub search: SearchOutcome,
    /// The configuration retrained for the final model
    pub best_config: ClassifierConfig,
    /// Per-epoch history of the final training run
    pub fit: FitSummary,
    /// Evaluations of the final model
    pub validation: SplitReport,
    pub test: SplitReport,
    pub train: SplitReport,
}

/// Run one full experiment on an already-loaded dataset.
///
/// The search phase trains a short model per trial and scores it by its
/// best validation accuracy. The winning configuration is then retrained
/// from scratch for the full epoch count and evaluated on validation, test
/// and train splits.
pub fn run_experiment<B: AutodiffBackend>(
    device: B::Device,
    dataset: &FundusDataset,
    config: &ExperimentConfig,
) -> Result<ExperimentReport> {
    config.validate()?;

    info!(
        "Starting experiment: test fraction {:.2}, validation fraction {:.2}, seed {}",
        config.split.test_fraction, config.split.validation_fraction, config.split.seed
    );

    let splits = DatasetSplits::from_items(dataset.items.clone(), config.split.clone())?;
    info!(
        "Split sizes: train {}, validation {}, test {}",
        splits.train.len(),
        splits.validation.len(),
        splits.test.len()
    );

    // Search phase: short training runs, scored by best validation accuracy
    let search_trainer = Trainer::<B>::new(
        device.clone(),
        TrainingConfig {
            epochs: config.search_epochs,
            batch_size: config.batch_size,
            learning_rate: config.learning_rate,
            shuffle_seed: config.split.seed,
        },
    )?;

    let search = RandomSearch::new(config.space.clone(), config.max_trials)?;
    let mut search_rng = ChaCha8Rng::seed_from_u64(config.search_seed);

    let outcome = search.run(&mut search_rng, |_, trial| {
        let model_config = classifier_config_for(trial, config.image_size)?;
        let (_, summary) = search_trainer.fit(&model_config, &splits.train, &splits.validation)?;
        Ok(summary.best_val_accuracy)
    })?;

    info!(
        "Best trial: {} (validation accuracy {:.4})",
        outcome.best.config, outcome.best.score
    );

    // Final phase: retrain the winner from scratch for the full epoch count
    let best_config = classifier_config_for(&outcome.best.config, config.image_size)?;

    let final_trainer = Trainer::<B>::new(
        device,
        TrainingConfig {
            epochs: config.final_epochs,
            batch_size: config.batch_size,
            learning_rate: config.learning_rate,
            shuffle_seed: config.split.seed,
        },
    )?;

    let (model, fit) = final_trainer.fit(&best_config, &splits.train, &splits.validation)?;

    let class_names = dataset.class_names();
    let name_refs: Vec<&str> = class_names.iter().map(|s| s.as_str()).collect();

    let report_for = |name: &str, items: &[crate::dataset::loader::FundusItem]| -> Result<SplitReport> {
        let evaluation = final_trainer.evaluate(&model, items, &best_config)?;
        let metrics = Metrics::from_predictions(
            &evaluation.predictions,
            &evaluation.targets,
            best_config.num_classes,
        )
        .with_class_names(&name_refs);

        info!(
            "{}: accuracy {:.4}, loss {:.4}",
            name, evaluation.accuracy, evaluation.loss
        );

        Ok(SplitReport {
            name: name.to_string(),
            loss: evaluation.loss,
            metrics,
        })
    };

    let validation = report_for("validation", &splits.validation)?;
    let test = report_for("test", &splits.test)?;
    let train = report_for("train", &splits.train)?;

    Ok(ExperimentReport {
        split: config.split.clone(),
        train_size: splits.train.len(),
        validation_size: splits.validation.len(),
        test_size: splits.test.len(),
        search: outcome,
        best_config,
        fit,
        validation,
        test,
        train,
    })
}

/// Build a classifier config from a trial, overriding the input size
fn classifier_config_for(
    trial: &crate::tuner::space::TrialConfig,
    image_size: usize,
) -> Result<ClassifierConfig> {
    let mut model_config = ClassifierConfig::from_trial(trial)?;
    model_config.input_size = image_size;
    model_config.validate()?;
    Ok(model_config)
}
