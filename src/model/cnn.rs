//! CNN Model Architecture for Cataract Classification
//!
//! Implements the classifier network with the Burn framework: two
//! convolutional blocks (conv, ReLU, 2x2 max pool, dropout) followed by
//! three dense blocks (linear, ReLU, dropout) and a linear classification
//! head. The head emits raw logits; use [`CataractClassifier::forward_softmax`]
//! for class probabilities.

use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

use crate::model::config::ClassifierConfig;

/// A CNN block with Conv2d, ReLU, MaxPool and Dropout
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub relu: Relu,
    pub pool: MaxPool2d,
    pub dropout: Dropout,
}

impl<B: Backend> ConvBlock<B> {
    /// Create a new convolutional block
    pub fn new(in_channels: usize, out_channels: usize, dropout_rate: f64, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);

        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();
        let dropout = DropoutConfig::new(dropout_rate).init();

        Self {
            conv,
            relu: Relu::new(),
            pool,
            dropout,
        }
    }

    /// Forward pass through the block, halving spatial resolution
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.relu.forward(x);
        let x = self.pool.forward(x);
        self.dropout.forward(x)
    }
}

/// A dense block with Linear, ReLU and Dropout
#[derive(Module, Debug)]
pub struct DenseBlock<B: Backend> {
    pub linear: Linear<B>,
    pub relu: Relu,
    pub dropout: Dropout,
}

impl<B: Backend> DenseBlock<B> {
    /// Create a new dense block
    pub fn new(in_features: usize, out_features: usize, dropout_rate: f64, device: &B::Device) -> Self {
        Self {
            linear: LinearConfig::new(in_features, out_features).init(device),
            relu: Relu::new(),
            dropout: DropoutConfig::new(dropout_rate).init(),
        }
    }

    /// Forward pass through the block
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.linear.forward(x);
        let x = self.relu.forward(x);
        self.dropout.forward(x)
    }
}

/// Cataract Classifier CNN
///
/// Architecture:
/// - 2 convolutional blocks with tunable filter counts and dropout
/// - Flatten
/// - 3 dense blocks with tunable widths and dropout
/// - Linear classification head over 2 classes
#[derive(Module, Debug)]
pub struct CataractClassifier<B: Backend> {
    pub block1: ConvBlock<B>,
    pub block2: ConvBlock<B>,

    pub dense1: DenseBlock<B>,
    pub dense2: DenseBlock<B>,
    pub dense3: DenseBlock<B>,

    pub head: Linear<B>,

    num_classes: usize,
}

impl<B: Backend> CataractClassifier<B> {
    /// Create a new classifier from configuration
    pub fn new(config: &ClassifierConfig, device: &B::Device) -> Self {
        let block1 = ConvBlock::new(
            config.in_channels,
            config.conv1_filters,
            config.conv1_dropout,
            device,
        );
        let block2 = ConvBlock::new(
            config.conv1_filters,
            config.conv2_filters,
            config.conv2_dropout,
            device,
        );

        let dense1 = DenseBlock::new(
            config.flattened_size(),
            config.dense1_units,
            config.dense1_dropout,
            device,
        );
        let dense2 = DenseBlock::new(
            config.dense1_units,
            config.dense2_units,
            config.dense2_dropout,
            device,
        );
        let dense3 = DenseBlock::new(
            config.dense2_units,
            config.dense3_units,
            config.dense3_dropout,
            device,
        );

        let head = LinearConfig::new(config.dense3_units, config.num_classes).init(device);

        Self {
            block1,
            block2,
            dense1,
            dense2,
            dense3,
            head,
            num_classes: config.num_classes,
        }
    }

    /// Forward pass through the network
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape [batch_size, 3, height, width]
    ///
    /// # Returns
    /// * Logits tensor of shape [batch_size, num_classes]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.block1.forward(x);
        let x = self.block2.forward(x);

        // Flatten: [B, C, H, W] -> [B, C * H * W]
        let [batch_size, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);

        let x = self.dense1.forward(x);
        let x = self.dense2.forward(x);
        let x = self.dense3.forward(x);

        self.head.forward(x)
    }

    /// Forward pass with softmax for inference
    pub fn forward_softmax(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let logits = self.forward(x);
        burn::tensor::activation::softmax(logits, 1)
    }

    /// Get the number of output classes
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{default_device, DefaultBackend};

    fn small_config() -> ClassifierConfig {
        ClassifierConfig {
            input_size: 16,
            conv1_filters: 4,
            conv2_filters: 8,
            dense1_units: 32,
            dense2_units: 16,
            dense3_units: 8,
            ..Default::default()
        }
    }

    #[test]
    fn test_classifier_output_shape() {
        let device = default_device();
        let config = small_config();
        let model = CataractClassifier::<DefaultBackend>::new(&config, &device);

        let input = Tensor::<DefaultBackend, 4>::zeros([2, 3, 16, 16], &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [2, 2]);
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let device = default_device();
        let config = small_config();
        let model = CataractClassifier::<DefaultBackend>::new(&config, &device);

        let input = Tensor::<DefaultBackend, 4>::ones([3, 3, 16, 16], &device);
        let probs = model.forward_softmax(input);

        let rows = probs.sum_dim(1).to_data().to_vec::<f32>().unwrap();
        for row in rows {
            assert!((row - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_conv_block_halves_resolution() {
        let device = default_device();
        let block = ConvBlock::<DefaultBackend>::new(3, 4, 0.3, &device);

        let input = Tensor::<DefaultBackend, 4>::zeros([1, 3, 16, 16], &device);
        let output = block.forward(input);

        assert_eq!(output.dims(), [1, 4, 8, 8]);
    }
}
