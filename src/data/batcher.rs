// ============================================================
// Batchers
// ============================================================
// Implements Burn's Batcher trait to convert sample vectors into
// device-resident tensor batches. The DataLoader calls .batch(items)
// with each mini-batch; we flatten the per-sample payloads into one
// long Vec and reshape, the same way every Burn batcher does.
//
// Pixel payloads arrive as raw u8 in channel-plane order and are
// scaled to [0, 1] floats here (the ToTensor step); statistical
// normalisation is left to the transform pipeline so train and test
// scripts can share constants.
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::bikes::DaySample;

// ─── Image samples and batches ───────────────────────────────────────────────

/// One raw image with its class label. Pixels are channel-plane
/// ordered (all of channel 0, then channel 1, ...), one byte each.
#[derive(Debug, Clone)]
pub struct ImageSample {
    pub pixels: Vec<u8>,
    pub label: usize,
}

/// A batch of images ready for a classifier forward pass.
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Pixel values in [0, 1] — shape: [batch, channels, height, width]
    pub images: Tensor<B, 4>,

    /// Class indices — shape: [batch]
    pub labels: Tensor<B, 1, Int>,
}

/// Stacks `ImageSample`s into `ImageBatch`es. Holds the target
/// device and the image geometry, which every sample must match.
#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    device: B::Device,
    channels: usize,
    height: usize,
    width: usize,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device, channels: usize, height: usize, width: usize) -> Self {
        Self { device, channels, height, width }
    }
}

impl<B: Backend> Batcher<ImageSample, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageSample>) -> ImageBatch<B> {
        let batch_size = items.len();

        // Flatten all pixels into one Vec<f32>, scaling u8 -> [0, 1]
        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|s| s.pixels.iter().map(|&p| f32::from(p) / 255.0))
            .collect();

        let labels: Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        let images = Tensor::<B, 1>::from_floats(pixels.as_slice(), &self.device)
            .reshape([batch_size, self.channels, self.height, self.width]);

        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        ImageBatch { images, labels }
    }
}

// ─── Sequence batches ────────────────────────────────────────────────────────

/// A batch of daily sequences for the regressor.
#[derive(Debug, Clone)]
pub struct SequenceBatch<B: Backend> {
    /// Hourly feature rows — shape: [batch, steps, features]
    pub inputs: Tensor<B, 3>,

    /// Hourly targets — shape: [batch, steps, 1]
    pub targets: Tensor<B, 3>,
}

/// Stacks `DaySample`s into `SequenceBatch`es.
#[derive(Clone, Debug)]
pub struct SequenceBatcher<B: Backend> {
    device: B::Device,
    steps: usize,
    features: usize,
}

impl<B: Backend> SequenceBatcher<B> {
    pub fn new(device: B::Device, steps: usize, features: usize) -> Self {
        Self { device, steps, features }
    }
}

impl<B: Backend> Batcher<DaySample, SequenceBatch<B>> for SequenceBatcher<B> {
    fn batch(&self, items: Vec<DaySample>) -> SequenceBatch<B> {
        let batch_size = items.len();

        let features: Vec<f32> = items.iter().flat_map(|d| d.features.iter().copied()).collect();
        let targets: Vec<f32> = items.iter().flat_map(|d| d.targets.iter().copied()).collect();

        let inputs = Tensor::<B, 1>::from_floats(features.as_slice(), &self.device)
            .reshape([batch_size, self.steps, self.features]);

        let targets = Tensor::<B, 1>::from_floats(targets.as_slice(), &self.device)
            .reshape([batch_size, self.steps, 1]);

        SequenceBatch { inputs, targets }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::InMemDataset,
    };

    type TB = burn::backend::NdArray;

    fn device() -> burn::backend::ndarray::NdArrayDevice {
        burn::backend::ndarray::NdArrayDevice::default()
    }

    fn sample(label: usize) -> ImageSample {
        // 1x2x2 image whose pixels encode the label for traceability
        ImageSample { pixels: vec![label as u8; 4], label }
    }

    #[test]
    fn test_image_batch_shapes() {
        let batcher = ImageBatcher::<TB>::new(device(), 1, 2, 2);
        let batch = batcher.batch(vec![sample(0), sample(1), sample(2)]);
        assert_eq!(batch.images.dims(), [3, 1, 2, 2]);
        assert_eq!(batch.labels.dims(), [3]);
    }

    #[test]
    fn test_pixels_scaled_to_unit_interval() {
        let batcher = ImageBatcher::<TB>::new(device(), 1, 2, 2);
        let batch = batcher.batch(vec![ImageSample { pixels: vec![0, 51, 102, 255], label: 0 }]);
        let values: Vec<f32> = batch.images.into_data().to_vec().unwrap();
        assert!((values[0] - 0.0).abs() < 1e-6);
        assert!((values[1] - 0.2).abs() < 1e-6);
        assert!((values[3] - 1.0).abs() < 1e-6);
    }

    /// One unshuffled pass over the dataloader must reproduce the
    /// dataset in order when the batches are concatenated.
    #[test]
    fn test_unshuffled_pass_preserves_order() {
        let samples: Vec<ImageSample> = (0..10).map(sample).collect();
        let dataset = InMemDataset::new(samples);

        let loader = DataLoaderBuilder::new(ImageBatcher::<TB>::new(device(), 1, 2, 2))
            .batch_size(3)
            .build(dataset);

        let mut seen: Vec<i64> = Vec::new();
        for batch in loader.iter() {
            let labels: Vec<i64> = batch.labels.into_data().to_vec().unwrap();
            seen.extend(labels);
        }
        assert_eq!(seen, (0..10).collect::<Vec<i64>>());
    }

    #[test]
    fn test_sequence_batch_shapes() {
        let day = DaySample {
            features: vec![0.5; 24 * 3],
            targets: vec![1.0; 24],
        };
        let batcher = SequenceBatcher::<TB>::new(device(), 24, 3);
        let batch = batcher.batch(vec![day.clone(), day]);
        assert_eq!(batch.inputs.dims(), [2, 24, 3]);
        assert_eq!(batch.targets.dims(), [2, 24, 1]);
    }
}
