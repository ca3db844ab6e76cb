//! CNN model architecture and its hyperparameter configuration.

pub mod cnn;
pub mod config;

pub use cnn::{CataractClassifier, ConvBlock};
pub use config::ClassifierConfig;
