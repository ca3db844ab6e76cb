//! Backend selection
//!
//! Training runs on the portable NdArray backend so the pipeline works on
//! any machine. The aliases keep the rest of the crate backend-agnostic.

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};

/// The default inference backend
pub type DefaultBackend = NdArray;

/// The default autodiff backend for training
pub type TrainingBackend = Autodiff<DefaultBackend>;

/// Get the default device
pub fn default_device() -> NdArrayDevice {
    NdArrayDevice::Cpu
}

/// Get a human-readable name for the current backend
pub fn backend_name() -> &'static str {
    "NdArray (CPU)"
}
