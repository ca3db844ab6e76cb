//! Utility modules: error types, logging, and evaluation metrics.

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{CataractError, Result};
pub use metrics::{ClassMetrics, ConfusionMatrix, Metrics};
