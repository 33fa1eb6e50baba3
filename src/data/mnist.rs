// ============================================================
// MNIST IDX adapter
// ============================================================
// Reads the classic IDX-format digit files from a fixed directory:
//
//   data/mnist/
//     train-images-idx3-ubyte   ← 60 000 images, 28x28 grayscale
//     train-labels-idx1-ubyte   ← 60 000 labels, one byte each
//     t10k-images-idx3-ubyte    ← 10 000 held-out images
//     t10k-labels-idx1-ubyte    ← 10 000 held-out labels
//
// IDX layout: a big-endian u32 magic number (2051 for images, 2049
// for labels), one big-endian u32 per dimension, then the raw bytes
// row-major. We validate the magic and the dimensions and fail with
// context on anything malformed — a corrupt dataset aborts the run.

use anyhow::{bail, ensure, Context, Result};
use burn::data::dataset::Dataset;
use std::{fs, path::Path};

use crate::data::batcher::ImageSample;

/// Images and labels are 28x28 single-channel.
pub const IMAGE_SIDE: usize = 28;
pub const CHANNELS: usize = 1;
pub const NUM_CLASSES: usize = 10;

const IMAGES_MAGIC: u32 = 2051;
const LABELS_MAGIC: u32 = 2049;

/// The full MNIST split loaded into memory.
pub struct MnistDataset {
    samples: Vec<ImageSample>,
}

impl MnistDataset {
    /// Load the 60k training split from `dir`.
    pub fn train(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Self::load(
            &dir.join("train-images-idx3-ubyte"),
            &dir.join("train-labels-idx1-ubyte"),
        )
    }

    /// Load the 10k held-out split from `dir`.
    pub fn test(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Self::load(
            &dir.join("t10k-images-idx3-ubyte"),
            &dir.join("t10k-labels-idx1-ubyte"),
        )
    }

    fn load(images_path: &Path, labels_path: &Path) -> Result<Self> {
        let (pixels, count) = read_idx_images(images_path)?;
        let labels = read_idx_labels(labels_path)?;

        ensure!(
            labels.len() == count,
            "image/label count mismatch: {} images vs {} labels",
            count,
            labels.len()
        );

        let image_len = IMAGE_SIDE * IMAGE_SIDE;
        let samples = labels
            .into_iter()
            .enumerate()
            .map(|(i, label)| ImageSample {
                pixels: pixels[i * image_len..(i + 1) * image_len].to_vec(),
                label: usize::from(label),
            })
            .collect();

        tracing::info!("Loaded {} MNIST samples from '{}'", count, images_path.display());
        Ok(Self { samples })
    }

    /// Hand the samples over for splitting.
    pub fn into_samples(self) -> Vec<ImageSample> {
        self.samples
    }
}

impl Dataset<ImageSample> for MnistDataset {
    fn get(&self, index: usize) -> Option<ImageSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Parse an IDX image file into a flat pixel buffer.
fn read_idx_images(path: &Path) -> Result<(Vec<u8>, usize)> {
    let bytes = fs::read(path)
        .with_context(|| format!("Cannot read MNIST images from '{}'", path.display()))?;

    ensure!(bytes.len() >= 16, "'{}' is too short for an IDX image header", path.display());

    let magic = be_u32(&bytes[0..4]);
    if magic != IMAGES_MAGIC {
        bail!("'{}' has magic {} (expected {})", path.display(), magic, IMAGES_MAGIC);
    }

    let count = be_u32(&bytes[4..8]) as usize;
    let rows = be_u32(&bytes[8..12]) as usize;
    let cols = be_u32(&bytes[12..16]) as usize;
    ensure!(
        rows == IMAGE_SIDE && cols == IMAGE_SIDE,
        "'{}' holds {}x{} images (expected {}x{})",
        path.display(),
        rows,
        cols,
        IMAGE_SIDE,
        IMAGE_SIDE
    );

    let pixels = &bytes[16..];
    ensure!(
        pixels.len() == count * rows * cols,
        "'{}' is truncated: {} pixel bytes for {} images",
        path.display(),
        pixels.len(),
        count
    );

    Ok((pixels.to_vec(), count))
}

/// Parse an IDX label file.
fn read_idx_labels(path: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(path)
        .with_context(|| format!("Cannot read MNIST labels from '{}'", path.display()))?;

    ensure!(bytes.len() >= 8, "'{}' is too short for an IDX label header", path.display());

    let magic = be_u32(&bytes[0..4]);
    if magic != LABELS_MAGIC {
        bail!("'{}' has magic {} (expected {})", path.display(), magic, LABELS_MAGIC);
    }

    let count = be_u32(&bytes[4..8]) as usize;
    let labels = &bytes[8..];
    ensure!(
        labels.len() == count,
        "'{}' is truncated: {} label bytes for {} entries",
        path.display(),
        labels.len(),
        count
    );

    Ok(labels.to_vec())
}

fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
