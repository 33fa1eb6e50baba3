// ============================================================
// Transform pipeline
// ============================================================
// A sequential chain of per-batch tensor transforms, applied to
// batch inputs right before the forward pass — the equivalent of
// composing normalisation and augmentation modules in front of a
// model.
//
// All steps operate on image batches of shape [batch, channels,
// height, width]. `Flatten` collapses each image to a feature
// vector and therefore must be the final step; after it the batch
// is [batch, channels * height * width].
//
// Stochastic steps draw once per batch: a whole batch is flipped
// (or not), and one crop offset is shared by every image in it.

use burn::prelude::*;
use rand::Rng;

/// One step of the pipeline.
#[derive(Debug, Clone)]
pub enum Transform {
    /// Per-channel standardisation: (x - mean[c]) / std[c].
    Normalize { mean: Vec<f32>, std: Vec<f32> },

    /// Mirror the width axis of the whole batch with probability `p`.
    RandomHorizontalFlip { p: f64 },

    /// Zero-pad by `padding` on every side, then crop back to the
    /// original size at a random offset.
    RandomCrop { padding: usize },

    /// Collapse [batch, C, H, W] to [batch, C*H*W]. Terminal step.
    Flatten,
}

/// The pipeline output: either the image layout untouched, or the
/// flattened feature vectors when the pipeline ends in `Flatten`.
/// Each model asserts the layout it expects; feeding the wrong one
/// aborts the run just like any other shape mismatch.
#[derive(Debug, Clone)]
pub enum TransformedImages<B: Backend> {
    /// Channel planes preserved: [batch, channels, height, width]
    Planes(Tensor<B, 4>),

    /// Feature vectors: [batch, features]
    Flat(Tensor<B, 2>),
}

impl<B: Backend> TransformedImages<B> {
    /// The batch as feature vectors, flattening plane layout if the
    /// pipeline did not already do so.
    pub fn into_flat(self) -> Tensor<B, 2> {
        match self {
            Self::Flat(t) => t,
            Self::Planes(t) => t.flatten::<2>(1, 3),
        }
    }

    /// The batch in plane layout. A flattened batch cannot be
    /// reinterpreted — the channel/height/width split is gone.
    pub fn into_planes(self) -> Tensor<B, 4> {
        match self {
            Self::Planes(t) => t,
            Self::Flat(t) => panic!(
                "model expects [batch, channels, height, width] input but the \
                 transform pipeline flattened the batch to {:?}",
                t.dims()
            ),
        }
    }
}

/// An ordered chain of transforms applied per batch.
#[derive(Debug, Clone)]
pub struct TransformPipeline {
    steps: Vec<Transform>,
}

impl TransformPipeline {
    /// Build a pipeline. `Flatten` is only meaningful as the last
    /// step, so any earlier placement is a construction error.
    pub fn new(steps: Vec<Transform>) -> Self {
        let early_flatten = steps
            .iter()
            .take(steps.len().saturating_sub(1))
            .any(|s| matches!(s, Transform::Flatten));
        assert!(!early_flatten, "Flatten must be the final transform step");
        Self { steps }
    }

    /// Run every step over one image batch.
    pub fn apply<B: Backend>(&self, images: Tensor<B, 4>) -> TransformedImages<B> {
        let mut rng = rand::thread_rng();
        let mut x = images;

        for step in &self.steps {
            x = match step {
                Transform::Normalize { mean, std } => normalize(x, mean, std),
                Transform::RandomHorizontalFlip { p } => {
                    if rng.gen::<f64>() < *p {
                        x.flip([3])
                    } else {
                        x
                    }
                }
                Transform::RandomCrop { padding } => random_crop(x, *padding, &mut rng),
                // Constructor guarantees this is the last step.
                Transform::Flatten => return TransformedImages::Flat(x.flatten::<2>(1, 3)),
            };
        }

        TransformedImages::Planes(x)
    }
}

/// Apply an optional pipeline; scripts without one (the time-series
/// regressor) pass `None` and the batch goes through untouched.
pub fn apply<B: Backend>(
    pipeline: Option<&TransformPipeline>,
    images: Tensor<B, 4>,
) -> TransformedImages<B> {
    match pipeline {
        Some(p) => p.apply(images),
        None => TransformedImages::Planes(images),
    }
}

/// (x - mean[c]) / std[c], broadcast over [batch, C, H, W].
fn normalize<B: Backend>(x: Tensor<B, 4>, mean: &[f32], std: &[f32]) -> Tensor<B, 4> {
    let [_, channels, _, _] = x.dims();
    assert_eq!(mean.len(), channels, "one mean per channel");
    assert_eq!(std.len(), channels, "one std per channel");

    let device = x.device();
    let mean = Tensor::<B, 1>::from_floats(mean, &device).reshape([1, channels, 1, 1]);
    let std = Tensor::<B, 1>::from_floats(std, &device).reshape([1, channels, 1, 1]);
    (x - mean) / std
}

/// Zero-pad each side by `padding`, then take a window of the
/// original size at a random (top, left) offset. One offset is
/// drawn for the whole batch.
fn random_crop<B: Backend>(x: Tensor<B, 4>, padding: usize, rng: &mut impl Rng) -> Tensor<B, 4> {
    if padding == 0 {
        return x;
    }
    let [batch, channels, height, width] = x.dims();
    let device = x.device();

    let padded = Tensor::<B, 4>::zeros(
        [batch, channels, height + 2 * padding, width + 2 * padding],
        &device,
    )
    .slice_assign(
        [
            0..batch,
            0..channels,
            padding..padding + height,
            padding..padding + width,
        ],
        x,
    );

    let top = rng.gen_range(0..=2 * padding);
    let left = rng.gen_range(0..=2 * padding);
    padded.slice([0..batch, 0..channels, top..top + height, left..left + width])
}
