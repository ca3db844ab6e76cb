//! # Cataract CNN
//!
//! A Rust library for classifying retinal fundus images as cataract or
//! normal using a hyperparameter-tuned convolutional neural network built
//! with the Burn framework.
//!
//! ## Pipeline
//!
//! 1. Load images from two labeled folders (cataract / normal)
//! 2. Assemble one dataset and split it into train/validation/test with a
//!    deterministic two-stage seeded partition
//! 3. Random-search the CNN hyperparameter space, scoring each candidate by
//!    validation accuracy over a short training run
//! 4. Retrain the best configuration from scratch and report accuracy,
//!    weighted precision/recall/F1, confusion matrix and a per-class
//!    classification report
//!
//! ## Modules
//!
//! - `dataset`: image loading, dataset assembly, splitting, label encoding,
//!   batching
//! - `model`: CNN architecture and hyperparameter configuration
//! - `tuner`: declarative search space and random-search driver
//! - `training`: fit/evaluate loops
//! - `pipeline`: the end-to-end experiment
//! - `utils`: logging, metrics, and error types

pub mod backend;
pub mod dataset;
pub mod model;
pub mod pipeline;
pub mod training;
pub mod tuner;
pub mod utils;

// Re-export commonly used items for convenience
pub use dataset::encode::{decode, one_hot, one_hot_batch};
pub use dataset::loader::{ClassFolder, DatasetStats, FundusDataset, FundusItem};
pub use dataset::split::{DatasetSplits, SplitConfig};
pub use model::cnn::CataractClassifier;
pub use model::config::ClassifierConfig;
pub use pipeline::{run_experiment, ExperimentConfig, ExperimentReport};
pub use training::trainer::{Evaluation, FitSummary, Trainer, TrainingConfig};
pub use tuner::search::{RandomSearch, SearchOutcome, TrialRecord};
pub use tuner::space::{ParamRange, ParamValue, SearchSpace, TrialConfig};
pub use utils::error::{CataractError, Result};
pub use utils::metrics::{ConfusionMatrix, Metrics};

/// Number of classification targets (cataract, normal)
pub const NUM_CLASSES: usize = 2;

/// Image edge length after resizing (images are square)
pub const IMAGE_SIZE: usize = 128;

/// Label index for cataract images
pub const LABEL_CATARACT: usize = 0;

/// Label index for normal images
pub const LABEL_NORMAL: usize = 1;

/// Fixed seed used for the two split stages
pub const SPLIT_SEED: u64 = 38;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
