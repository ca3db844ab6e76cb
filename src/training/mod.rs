//! Training and evaluation loops.

pub mod trainer;

pub use trainer::{EpochRecord, Evaluation, FitSummary, Trainer, TrainingConfig};
