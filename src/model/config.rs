//! Model Configuration Module
//!
//! The classifier configuration holds every tunable hyperparameter of the
//! CNN. Configurations come either from defaults, from a JSON file, or from
//! a sampled hyperparameter trial.

use serde::{Deserialize, Serialize};

use crate::tuner::space::TrialConfig;
use crate::utils::error::{CataractError, Result};
use crate::{IMAGE_SIZE, NUM_CLASSES};

/// Configuration for the cataract classifier CNN
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Number of output classes
    pub num_classes: usize,

    /// Input image size (width and height, assumed square)
    pub input_size: usize,

    /// Number of input channels (3 for RGB)
    pub in_channels: usize,

    /// Filters in the first convolutional block
    pub conv1_filters: usize,

    /// Dropout rate after the first convolutional block
    pub conv1_dropout: f64,

    /// Filters in the second convolutional block
    pub conv2_filters: usize,

    /// Dropout rate after the second convolutional block
    pub conv2_dropout: f64,

    /// Units in the first dense layer
    pub dense1_units: usize,

    /// Dropout rate after the first dense layer
    pub dense1_dropout: f64,

    /// Units in the second dense layer
    pub dense2_units: usize,

    /// Dropout rate after the second dense layer
    pub dense2_dropout: f64,

    /// Units in the third dense layer
    pub dense3_units: usize,

    /// Dropout rate after the third dense layer
    pub dense3_dropout: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            num_classes: NUM_CLASSES,
            input_size: IMAGE_SIZE,
            in_channels: 3,
            conv1_filters: 32,
            conv1_dropout: 0.3,
            conv2_filters: 64,
            conv2_dropout: 0.3,
            dense1_units: 512,
            dense1_dropout: 0.3,
            dense2_units: 256,
            dense2_dropout: 0.3,
            dense3_units: 128,
            dense3_dropout: 0.3,
        }
    }
}

impl ClassifierConfig {
    /// Build a configuration from a sampled hyperparameter trial.
    ///
    /// The trial must carry every architecture parameter; geometry
    /// (image size, channel count, class count) stays at its defaults.
    pub fn from_trial(trial: &TrialConfig) -> Result<Self> {
        let config = Self {
            conv1_filters: trial.get_int("conv1_filters")? as usize,
            conv1_dropout: trial.get_float("conv1_dropout")?,
            conv2_filters: trial.get_int("conv2_filters")? as usize,
            conv2_dropout: trial.get_float("conv2_dropout")?,
            dense1_units: trial.get_int("dense1_units")? as usize,
            dense1_dropout: trial.get_float("dense1_dropout")?,
            dense2_units: trial.get_int("dense2_units")? as usize,
            dense2_dropout: trial.get_float("dense2_dropout")?,
            dense3_units: trial.get_int("dense3_units")? as usize,
            dense3_dropout: trial.get_float("dense3_dropout")?,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.num_classes == 0 {
            return Err(CataractError::Config(
                "num_classes must be greater than 0".to_string(),
            ));
        }

        if self.input_size == 0 || self.input_size % 4 != 0 {
            return Err(CataractError::Config(
                "input_size must be a positive multiple of 4 (two 2x2 pools)".to_string(),
            ));
        }

        if self.in_channels == 0 {
            return Err(CataractError::Config(
                "in_channels must be greater than 0".to_string(),
            ));
        }

        for (name, units) in [
            ("conv1_filters", self.conv1_filters),
            ("conv2_filters", self.conv2_filters),
            ("dense1_units", self.dense1_units),
            ("dense2_units", self.dense2_units),
            ("dense3_units", self.dense3_units),
        ] {
            if units == 0 {
                return Err(CataractError::Config(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }

        for (name, rate) in [
            ("conv1_dropout", self.conv1_dropout),
            ("conv2_dropout", self.conv2_dropout),
            ("dense1_dropout", self.dense1_dropout),
            ("dense2_dropout", self.dense2_dropout),
            ("dense3_dropout", self.dense3_dropout),
        ] {
            if !(0.0..1.0).contains(&rate) {
                return Err(CataractError::Config(format!(
                    "{} must be in range [0.0, 1.0)",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Feature count after both conv blocks are flattened.
    ///
    /// Each block halves the spatial resolution with a 2x2 max pool, so the
    /// flattened size is `conv2_filters * (input_size / 4)^2`.
    pub fn flattened_size(&self) -> usize {
        let spatial = self.input_size / 4;
        self.conv2_filters * spatial * spatial
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CataractError::Config(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self =
            serde_json::from_str(&json).map_err(|e| CataractError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
