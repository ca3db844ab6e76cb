//! Tensor batching
//!
//! Converts slices of loaded items into Burn tensors. Batches carry both
//! integer targets (for accuracy and the confusion matrix) and one-hot
//! targets (for the categorical cross-entropy loss).

use burn::prelude::*;

use crate::dataset::encode::one_hot_batch;
use crate::dataset::loader::FundusItem;
use crate::utils::error::{CataractError, Result};

/// A batch of fundus images ready for the model
#[derive(Debug, Clone)]
pub struct FundusBatch<B: Backend> {
    /// Images, shape [batch, 3, size, size]
    pub images: Tensor<B, 4>,
    /// Integer class targets, shape [batch]
    pub targets: Tensor<B, 1, Int>,
    /// One-hot class targets, shape [batch, num_classes]
    pub targets_one_hot: Tensor<B, 2>,
}

impl<B: Backend> FundusBatch<B> {
    /// Number of items in the batch
    pub fn len(&self) -> usize {
        self.images.dims()[0]
    }

    /// Check if the batch is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds tensor batches on a fixed device
#[derive(Debug, Clone)]
pub struct FundusBatcher<B: Backend> {
    device: B::Device,
    image_size: usize,
    num_classes: usize,
}

impl<B: Backend> FundusBatcher<B> {
    /// Create a new batcher for the given device and image geometry
    pub fn new(device: B::Device, image_size: usize, num_classes: usize) -> Self {
        Self {
            device,
            image_size,
            num_classes,
        }
    }

    /// Assemble a batch from loaded items
    pub fn batch(&self, items: &[FundusItem]) -> Result<FundusBatch<B>> {
        if items.is_empty() {
            return Err(CataractError::Dataset(
                "Cannot build a batch from zero items".to_string(),
            ));
        }

        let pixels_per_image = 3 * self.image_size * self.image_size;
        let mut flat = Vec::with_capacity(items.len() * pixels_per_image);
        let mut labels = Vec::with_capacity(items.len());

        for item in items {
            if item.pixels.len() != pixels_per_image {
                return Err(CataractError::Dataset(format!(
                    "Image {:?} has {} pixel values, expected {}",
                    item.path,
                    item.pixels.len(),
                    pixels_per_image
                )));
            }
            flat.extend_from_slice(&item.pixels);
            labels.push(item.label);
        }

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(
                flat,
                [items.len(), 3, self.image_size, self.image_size],
            ),
            &self.device,
        );

        let target_values: Vec<i64> = labels.iter().map(|&l| l as i64).collect();
        let targets = Tensor::<B, 1, Int>::from_data(
            TensorData::new(target_values, [items.len()]),
            &self.device,
        );

        let one_hot = one_hot_batch(&labels, self.num_classes)?;
        let targets_one_hot = Tensor::<B, 2>::from_data(
            TensorData::new(one_hot, [items.len(), self.num_classes]),
            &self.device,
        );

        Ok(FundusBatch {
            images,
            targets,
            targets_one_hot,
        })
    }
}
