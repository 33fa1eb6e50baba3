// ============================================================
// Reference architectures
// ============================================================
// Three deliberately plain models, one per script:
//
//   MnistDnn   — fully-connected classifier over flattened digits
//   Cifar10Cnn — two conv/batch-norm blocks with dropout, the
//                architecture the augmentation script trains
//   BikesRnn   — stacked recurrent layers projecting each hour's
//                hidden state to a demand estimate
//
// Each model implements TrainStep/ValidStep so the shared training
// loop can drive it, plus the capability trait its tester needs
// (ImageClassifier or SequenceRegressor).
//
// Reference: Burn Book §3 (Building Blocks)

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::{CrossEntropyLossConfig, MseLoss, Reduction},
        pool::{MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig, Lstm,
        LstmConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::{activation, backend::AutodiffBackend},
};

use crate::data::batcher::{ImageBatch, SequenceBatch};
use crate::ml::trainer::{TrainStep, ValidStep};
use crate::transform::{self, TransformPipeline, TransformedImages};

// ─── Capability traits for the testers ───────────────────────────────────────

/// A model that maps transformed image batches to class logits.
pub trait ImageClassifier<B: Backend> {
    fn logits(&self, input: TransformedImages<B>) -> Tensor<B, 2>;
}

/// A model that maps [batch, steps, features] sequences to
/// per-step scalar estimates [batch, steps, 1].
pub trait SequenceRegressor<B: Backend> {
    fn forecast(&self, inputs: Tensor<B, 3>) -> Tensor<B, 3>;
}

/// Cross-entropy between logits [N, classes] and targets [N].
fn classification_loss<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
    CrossEntropyLossConfig::new()
        .init(&logits.device())
        .forward(logits, targets)
}

// ─── MnistDnn ────────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct MnistDnnConfig {
    pub num_inputs: usize,
    pub hidden_size: usize,
    pub num_classes: usize,
    pub dropout: f64,
}

impl MnistDnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> MnistDnn<B> {
        MnistDnn {
            fc1: LinearConfig::new(self.num_inputs, self.hidden_size).init(device),
            fc2: LinearConfig::new(self.hidden_size, self.hidden_size).init(device),
            out: LinearConfig::new(self.hidden_size, self.num_classes).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// Fully-connected classifier. Expects flattened input, so its
/// transform pipeline must end in Flatten.
#[derive(Module, Debug)]
pub struct MnistDnn<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
    out: Linear<B>,
    dropout: Dropout,
}

impl<B: Backend> MnistDnn<B> {
    /// input: [batch, features] → logits: [batch, num_classes]
    pub fn forward(&self, input: TransformedImages<B>) -> Tensor<B, 2> {
        let x = input.into_flat();
        let x = activation::relu(self.fc1.forward(x));
        let x = self.dropout.forward(x);
        let x = activation::relu(self.fc2.forward(x));
        self.out.forward(x)
    }

    fn batch_loss(
        &self,
        batch: ImageBatch<B>,
        transforms: Option<&TransformPipeline>,
    ) -> Tensor<B, 1> {
        let input = transform::apply(transforms, batch.images);
        classification_loss(self.forward(input), batch.labels)
    }
}

impl<B: Backend> ImageClassifier<B> for MnistDnn<B> {
    fn logits(&self, input: TransformedImages<B>) -> Tensor<B, 2> {
        self.forward(input)
    }
}

impl<B: AutodiffBackend> TrainStep<B> for MnistDnn<B> {
    type Batch = ImageBatch<B>;

    fn step(&self, batch: Self::Batch, transforms: Option<&TransformPipeline>) -> Tensor<B, 1> {
        self.batch_loss(batch, transforms)
    }
}

impl<B: Backend> ValidStep<B> for MnistDnn<B> {
    type Batch = ImageBatch<B>;

    fn step(&self, batch: Self::Batch, transforms: Option<&TransformPipeline>) -> Tensor<B, 1> {
        self.batch_loss(batch, transforms)
    }
}

// ─── Cifar10Cnn ──────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct Cifar10CnnConfig {
    pub num_classes: usize,
    pub dropout: f64,
}

impl Cifar10CnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Cifar10Cnn<B> {
        Cifar10Cnn {
            conv1: Conv2dConfig::new([3, 32], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device),
            norm1: BatchNormConfig::new(32).init(device),
            conv2: Conv2dConfig::new([32, 64], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device),
            norm2: BatchNormConfig::new(64).init(device),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            fc1: LinearConfig::new(FEATURE_MAP, 512).init(device),
            fc2: LinearConfig::new(512, self.num_classes).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

// 32x32 input halved by each of the two pools: 64 channels of 8x8
const FEATURE_MAP: usize = 64 * 8 * 8;

/// Convolutional classifier with batch normalisation and dropout.
/// Expects plane layout, so its pipeline must not flatten.
#[derive(Module, Debug)]
pub struct Cifar10Cnn<B: Backend> {
    conv1: Conv2d<B>,
    norm1: BatchNorm<B, 2>,
    conv2: Conv2d<B>,
    norm2: BatchNorm<B, 2>,
    pool: MaxPool2d,
    fc1: Linear<B>,
    fc2: Linear<B>,
    dropout: Dropout,
}

impl<B: Backend> Cifar10Cnn<B> {
    /// input: [batch, 3, 32, 32] → logits: [batch, num_classes]
    pub fn forward(&self, input: TransformedImages<B>) -> Tensor<B, 2> {
        let x = input.into_planes();
        let x = self.pool.forward(activation::relu(self.norm1.forward(self.conv1.forward(x))));
        let x = self.pool.forward(activation::relu(self.norm2.forward(self.conv2.forward(x))));
        let x = x.flatten::<2>(1, 3);
        let x = self.dropout.forward(activation::relu(self.fc1.forward(x)));
        self.fc2.forward(x)
    }

    fn batch_loss(
        &self,
        batch: ImageBatch<B>,
        transforms: Option<&TransformPipeline>,
    ) -> Tensor<B, 1> {
        let input = transform::apply(transforms, batch.images);
        classification_loss(self.forward(input), batch.labels)
    }
}

impl<B: Backend> ImageClassifier<B> for Cifar10Cnn<B> {
    fn logits(&self, input: TransformedImages<B>) -> Tensor<B, 2> {
        self.forward(input)
    }
}

impl<B: AutodiffBackend> TrainStep<B> for Cifar10Cnn<B> {
    type Batch = ImageBatch<B>;

    fn step(&self, batch: Self::Batch, transforms: Option<&TransformPipeline>) -> Tensor<B, 1> {
        self.batch_loss(batch, transforms)
    }
}

impl<B: Backend> ValidStep<B> for Cifar10Cnn<B> {
    type Batch = ImageBatch<B>;

    fn step(&self, batch: Self::Batch, transforms: Option<&TransformPipeline>) -> Tensor<B, 1> {
        self.batch_loss(batch, transforms)
    }
}

// ─── BikesRnn ────────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct BikesRnnConfig {
    pub num_features: usize,
    pub hidden_size: usize,
}

impl BikesRnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BikesRnn<B> {
        BikesRnn {
            lstm1: LstmConfig::new(self.num_features, self.hidden_size, true).init(device),
            lstm2: LstmConfig::new(self.hidden_size, self.hidden_size, true).init(device),
            out: LinearConfig::new(self.hidden_size, 1).init(device),
        }
    }
}

/// Two stacked recurrent layers; the linear head projects every
/// hour's hidden state to one demand estimate.
#[derive(Module, Debug)]
pub struct BikesRnn<B: Backend> {
    lstm1: Lstm<B>,
    lstm2: Lstm<B>,
    out: Linear<B>,
}

impl<B: Backend> BikesRnn<B> {
    /// inputs: [batch, steps, features] → [batch, steps, 1]
    pub fn forward(&self, inputs: Tensor<B, 3>) -> Tensor<B, 3> {
        let (x, _) = self.lstm1.forward(inputs, None);
        let (x, _) = self.lstm2.forward(x, None);
        self.out.forward(x)
    }

    fn batch_loss(&self, batch: SequenceBatch<B>) -> Tensor<B, 1> {
        let output = self.forward(batch.inputs);
        MseLoss::new().forward(output, batch.targets, Reduction::Mean)
    }
}

impl<B: Backend> SequenceRegressor<B> for BikesRnn<B> {
    fn forecast(&self, inputs: Tensor<B, 3>) -> Tensor<B, 3> {
        self.forward(inputs)
    }
}

impl<B: AutodiffBackend> TrainStep<B> for BikesRnn<B> {
    type Batch = SequenceBatch<B>;

    // Sequence inputs carry no image transforms; the pipeline slot
    // exists so the shared loop signature stays uniform.
    fn step(&self, batch: Self::Batch, _transforms: Option<&TransformPipeline>) -> Tensor<B, 1> {
        self.batch_loss(batch)
    }
}

impl<B: Backend> ValidStep<B> for BikesRnn<B> {
    type Batch = SequenceBatch<B>;

    fn step(&self, batch: Self::Batch, _transforms: Option<&TransformPipeline>) -> Tensor<B, 1> {
        self.batch_loss(batch)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TB = burn::backend::NdArray;

    fn device() -> burn::backend::ndarray::NdArrayDevice {
        burn::backend::ndarray::NdArrayDevice::default()
    }

    #[test]
    fn test_dnn_logit_shape() {
        let device = device();
        let model = MnistDnnConfig::new(16, 8, 10, 0.0).init::<TB>(&device);
        let input = Tensor::<TB, 2>::zeros([3, 16], &device);
        let logits = model.forward(TransformedImages::Flat(input));
        assert_eq!(logits.dims(), [3, 10]);
    }

    /// Same weights, same input — identical output.
    #[test]
    fn test_dnn_inference_is_deterministic() {
        let device = device();
        let model = MnistDnnConfig::new(8, 4, 3, 0.0).init::<TB>(&device);
        let input = Tensor::<TB, 1>::from_floats(
            [0.1, 0.9, 0.3, 0.7, 0.5, 0.2, 0.8, 0.4],
            &device,
        )
        .reshape([1, 8]);

        let first: Vec<f32> = model
            .forward(TransformedImages::Flat(input.clone()))
            .into_data()
            .to_vec()
            .unwrap();
        let second: Vec<f32> = model
            .forward(TransformedImages::Flat(input))
            .into_data()
            .to_vec()
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_cnn_logit_shape() {
        let device = device();
        let model = Cifar10CnnConfig::new(10, 0.0).init::<TB>(&device);
        let input = Tensor::<TB, 4>::zeros([2, 3, 32, 32], &device);
        let logits = model.forward(TransformedImages::Planes(input));
        assert_eq!(logits.dims(), [2, 10]);
    }

    #[test]
    fn test_rnn_output_shape() {
        let device = device();
        let model = BikesRnnConfig::new(5, 8).init::<TB>(&device);
        let input = Tensor::<TB, 3>::zeros([2, 6, 5], &device);
        let output = model.forward(input);
        assert_eq!(output.dims(), [2, 6, 1]);
    }
}
