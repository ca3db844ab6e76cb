//! Training and Evaluation
//!
//! A custom training loop built directly on Burn's optimizer API. Training
//! minimizes categorical cross-entropy over one-hot targets with Adam and
//! runs for a fixed number of epochs; there is no early stopping, so every
//! configured epoch executes. Evaluation runs on the inner (non-autodiff)
//! backend with dropout disabled.

use burn::{
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{activation::log_softmax, backend::AutodiffBackend, ElementConversion, Tensor},
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::batch::FundusBatcher;
use crate::dataset::loader::FundusItem;
use crate::model::cnn::CataractClassifier;
use crate::model::config::ClassifierConfig;
use crate::utils::error::{CataractError, Result};
use crate::utils::logging::TrainingLogger;
use crate::utils::metrics::{AccuracyTracker, RunningAverage};

/// Training loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Number of epochs to run (all of them; no early stopping)
    pub epochs: usize,

    /// Batch size for training and evaluation
    pub batch_size: usize,

    /// Adam learning rate
    pub learning_rate: f64,

    /// Seed for the per-epoch shuffle of training items
    pub shuffle_seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 15,
            batch_size: 32,
            learning_rate: 1e-3,
            shuffle_seed: crate::SPLIT_SEED,
        }
    }
}

impl TrainingConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(CataractError::Config(
                "epochs must be at least 1".to_string(),
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

/// Metrics recorded at the end of one training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochRecord {
    /// Zero-based epoch index
    pub epoch: usize,
    /// Mean training loss over the epoch's batches
    pub train_loss: f64,
    /// Training accuracy over the epoch
    pub train_accuracy: f64,
    /// Validation accuracy after the epoch
    pub val_accuracy: f64,
}

/// Summary of a completed training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitSummary {
    /// Per-epoch metrics, in order
    pub history: Vec<EpochRecord>,
    /// Highest validation accuracy seen across epochs
    pub best_val_accuracy: f64,
    /// Validation accuracy after the final epoch
    pub final_val_accuracy: f64,
}

/// Result of evaluating a model on one split
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Mean loss over the split
    pub loss: f64,
    /// Accuracy over the split
    pub accuracy: f64,
    /// Predicted class per item, in item order
    pub predictions: Vec<usize>,
    /// Ground-truth class per item, in item order
    pub targets: Vec<usize>,
}

/// Runs training and evaluation on a fixed device
pub struct Trainer<B: AutodiffBackend> {
    device: B::Device,
    config: TrainingConfig,
}

impl<B: AutodiffBackend> Trainer<B> {
    /// Create a new trainer
    pub fn new(device: B::Device, config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { device, config })
    }

    /// The training configuration
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train a fresh model on `train`, validating after every epoch.
    ///
    /// Returns the trained model together with the per-epoch history. The
    /// model returned is the one from the final epoch.
    pub fn fit(
        &self,
        model_config: &ClassifierConfig,
        train: &[FundusItem],
        validation: &[FundusItem],
    ) -> Result<(CataractClassifier<B>, FitSummary)> {
        model_config.validate()?;
        if train.is_empty() {
            return Err(CataractError::Training(
                "No training items provided".to_string(),
            ));
        }

        let batcher = FundusBatcher::<B>::new(
            self.device.clone(),
            model_config.input_size,
            model_config.num_classes,
        );

        let mut model = CataractClassifier::<B>::new(model_config, &self.device);
        let mut optimizer = AdamConfig::new().init();

        let mut epoch_rng = ChaCha8Rng::seed_from_u64(self.config.shuffle_seed);
        let mut logger = TrainingLogger::new(self.config.epochs);

        let mut history = Vec::with_capacity(self.config.epochs);
        let mut best_val_accuracy = 0.0f64;

        for epoch in 0..self.config.epochs {
            logger.start_epoch(epoch);

            let mut indices: Vec<usize> = (0..train.len()).collect();
            indices.shuffle(&mut epoch_rng);

            let mut epoch_loss = RunningAverage::new();
            let mut epoch_accuracy = AccuracyTracker::new();

            for chunk in indices.chunks(self.config.batch_size) {
                let items: Vec<FundusItem> =
                    chunk.iter().map(|&i| train[i].clone()).collect();
                let batch = batcher.batch(&items)?;

                let logits = model.forward(batch.images.clone());
                let loss = categorical_cross_entropy(logits.clone(), batch.targets_one_hot);

                let loss_value: f64 = loss.clone().into_scalar().elem();
                epoch_loss.add(loss_value);

                let predictions = tensor_predictions(logits)?;
                let labels: Vec<usize> = items.iter().map(|item| item.label).collect();
                epoch_accuracy.add_batch(&predictions, &labels);

                let grads = loss.backward();
                let grads = GradientsParams::from_grads(grads, &model);
                model = optimizer.step(self.config.learning_rate, model, grads);

                debug!("Batch loss: {:.4}", loss_value);
            }

            let val_accuracy = if validation.is_empty() {
                0.0
            } else {
                self.evaluate(&model, validation, model_config)?.accuracy
            };

            if val_accuracy > best_val_accuracy {
                best_val_accuracy = val_accuracy;
                logger.log_new_best(val_accuracy);
            }

            logger.end_epoch(epoch_loss.average(), epoch_accuracy.accuracy(), val_accuracy);

            history.push(EpochRecord {
                epoch,
                train_loss: epoch_loss.average(),
                train_accuracy: epoch_accuracy.accuracy(),
                val_accuracy,
            });
        }

        logger.log_complete(best_val_accuracy);

        let final_val_accuracy = history.last().map(|r| r.val_accuracy).unwrap_or(0.0);

        Ok((
            model,
            FitSummary {
                history,
                best_val_accuracy,
                final_val_accuracy,
            },
        ))
    }

    /// Evaluate a model on one split with dropout disabled.
    pub fn evaluate(
        &self,
        model: &CataractClassifier<B>,
        items: &[FundusItem],
        model_config: &ClassifierConfig,
    ) -> Result<Evaluation> {
        if items.is_empty() {
            return Err(CataractError::Training(
                "No items provided for evaluation".to_string(),
            ));
        }

        let inner_model = model.clone().valid();
        let batcher = FundusBatcher::<B::InnerBackend>::new(
            self.device.clone(),
            model_config.input_size,
            model_config.num_classes,
        );

        let mut loss_avg = RunningAverage::new();
        let mut predictions = Vec::with_capacity(items.len());
        let mut targets = Vec::with_capacity(items.len());

        for chunk in items.chunks(self.config.batch_size) {
            let batch = batcher.batch(chunk)?;

            let logits = inner_model.forward(batch.images);
            let loss = categorical_cross_entropy(logits.clone(), batch.targets_one_hot);
            loss_avg.add(loss.into_scalar().elem::<f64>());

            predictions.extend(tensor_predictions(logits)?);
            targets.extend(chunk.iter().map(|item| item.label));
        }

        let correct = predictions
            .iter()
            .zip(targets.iter())
            .filter(|(p, t)| p == t)
            .count();
        let accuracy = correct as f64 / targets.len() as f64;

        Ok(Evaluation {
            loss: loss_avg.average(),
            accuracy,
            predictions,
            targets,
        })
    }
}

/// Categorical cross-entropy over one-hot targets:
/// `-mean(sum(one_hot * log_softmax(logits)))`
fn categorical_cross_entropy<B: burn::tensor::backend::Backend>(
    logits: Tensor<B, 2>,
    targets_one_hot: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let log_probs = log_softmax(logits, 1);
    (targets_one_hot * log_probs).sum_dim(1).mean().neg()
}

/// Argmax over the class dimension as plain indices
fn tensor_predictions<B: burn::tensor::backend::Backend>(
    logits: Tensor<B, 2>,
) -> Result<Vec<usize>> {
    let indices = logits.argmax(1).squeeze::<1>(1);
    let values = indices
        .to_data()
        .to_vec::<i64>()
        .map_err(|e| CataractError::Training(format!("Failed to read predictions: {:?}", e)))?;
    Ok(values.into_iter().map(|v| v as usize).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{default_device, TrainingBackend};
    use std::path::PathBuf;

    fn small_model_config() -> ClassifierConfig {
        ClassifierConfig {
            input_size: 8,
            conv1_filters: 4,
            conv2_filters: 4,
            dense1_units: 16,
            dense2_units: 8,
            dense3_units: 8,
            ..Default::default()
        }
    }

    fn make_items(n: usize, size: usize) -> Vec<FundusItem> {
        (0..n)
            .map(|i| {
                let label = i % 2;
                // Separable data: class 0 is dark, class 1 is bright
                let fill = if label == 0 { 0.1 } else { 0.9 };
                FundusItem {
                    pixels: vec![fill; 3 * size * size],
                    label,
                    path: PathBuf::from(format!("item_{}.png", i)),
                }
            })
            .collect()
    }

    #[test]
    fn test_config_validation() {
        let mut config = TrainingConfig::default();
        assert!(config.validate().is_ok());

        config.epochs = 0;
        assert!(config.validate().is_err());

        config = TrainingConfig::default();
        config.learning_rate = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fit_runs_every_epoch() {
        let config = TrainingConfig {
            epochs: 2,
            batch_size: 4,
            learning_rate: 1e-3,
            shuffle_seed: 38,
        };
        let trainer = Trainer::<TrainingBackend>::new(default_device(), config).unwrap();

        let train = make_items(8, 8);
        let validation = make_items(4, 8);

        let (_, summary) = trainer
            .fit(&small_model_config(), &train, &validation)
            .unwrap();

        assert_eq!(summary.history.len(), 2);
        assert_eq!(summary.history[0].epoch, 0);
        assert!(summary.best_val_accuracy >= summary.history[0].val_accuracy);
    }

    #[test]
    fn test_evaluate_covers_every_item() {
        let config = TrainingConfig {
            epochs: 1,
            batch_size: 3,
            learning_rate: 1e-3,
            shuffle_seed: 38,
        };
        let trainer = Trainer::<TrainingBackend>::new(default_device(), config).unwrap();

        let train = make_items(6, 8);
        let (model, _) = trainer.fit(&small_model_config(), &train, &[]).unwrap();

        let items = make_items(7, 8); // not a multiple of the batch size
        let evaluation = trainer
            .evaluate(&model, &items, &small_model_config())
            .unwrap();

        assert_eq!(evaluation.predictions.len(), 7);
        assert_eq!(evaluation.targets.len(), 7);
        assert!(evaluation.loss.is_finite());
        assert!((0.0..=1.0).contains(&evaluation.accuracy));
    }

    #[test]
    fn test_fit_rejects_empty_training_set() {
        let trainer =
            Trainer::<TrainingBackend>::new(default_device(), TrainingConfig::default()).unwrap();
        assert!(trainer
            .fit(&small_model_config(), &[], &[])
            .is_err());
    }

    #[test]
    fn test_cross_entropy_matches_hand_computation() {
        use crate::backend::DefaultBackend;
        use burn::tensor::TensorData;

        let device = default_device();
        // Uniform logits over 2 classes: loss is ln(2)
        let logits = Tensor::<DefaultBackend, 2>::from_data(
            TensorData::new(vec![0.0f32, 0.0, 0.0, 0.0], [2, 2]),
            &device,
        );
        let one_hot = Tensor::<DefaultBackend, 2>::from_data(
            TensorData::new(vec![1.0f32, 0.0, 0.0, 1.0], [2, 2]),
            &device,
        );

        let loss: f64 = categorical_cross_entropy(logits, one_hot)
            .into_scalar()
            .elem();
        assert!((loss - std::f64::consts::LN_2).abs() < 1e-5);
    }
}
