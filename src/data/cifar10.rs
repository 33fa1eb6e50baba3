// ============================================================
// CIFAR-10 binary adapter
// ============================================================
// Reads the "binary version" of CIFAR-10 from a fixed directory:
//
//   data/cifar10/
//     data_batch_1.bin .. data_batch_5.bin  ← 50 000 training images
//     test_batch.bin                         ← 10 000 held-out images
//
// Each record is exactly 3073 bytes: 1 label byte (0-9) followed by
// 3072 pixel bytes in channel-plane order (1024 red, 1024 green,
// 1024 blue), which is already the [C, H, W] layout the batcher
// expects. Truncated files abort the run with context.

use anyhow::{ensure, Context, Result};
use burn::data::dataset::Dataset;
use std::{fs, path::Path};

use crate::data::batcher::ImageSample;

pub const IMAGE_SIDE: usize = 32;
pub const CHANNELS: usize = 3;
pub const NUM_CLASSES: usize = 10;

/// Index-to-name mapping fixed by the dataset authors.
pub const CLASS_NAMES: [&str; 10] = [
    "airplane", "automobile", "bird", "cat", "deer",
    "dog", "frog", "horse", "ship", "truck",
];

const PIXELS_PER_IMAGE: usize = CHANNELS * IMAGE_SIDE * IMAGE_SIDE;
const RECORD_LEN: usize = 1 + PIXELS_PER_IMAGE;

/// One CIFAR-10 split loaded into memory.
pub struct Cifar10Dataset {
    samples: Vec<ImageSample>,
}

impl Cifar10Dataset {
    /// Load the five training batches from `dir`.
    pub fn train(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut samples = Vec::new();
        for batch in 1..=5 {
            read_batch_file(&dir.join(format!("data_batch_{batch}.bin")), &mut samples)?;
        }
        tracing::info!("Loaded {} CIFAR-10 training samples", samples.len());
        Ok(Self { samples })
    }

    /// Load the held-out batch from `dir`.
    pub fn test(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut samples = Vec::new();
        read_batch_file(&dir.join("test_batch.bin"), &mut samples)?;
        tracing::info!("Loaded {} CIFAR-10 test samples", samples.len());
        Ok(Self { samples })
    }

    /// Hand the samples over for splitting.
    pub fn into_samples(self) -> Vec<ImageSample> {
        self.samples
    }
}

impl Dataset<ImageSample> for Cifar10Dataset {
    fn get(&self, index: usize) -> Option<ImageSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Append every record of one batch file to `samples`.
fn read_batch_file(path: &Path, samples: &mut Vec<ImageSample>) -> Result<()> {
    let bytes = fs::read(path)
        .with_context(|| format!("Cannot read CIFAR-10 batch '{}'", path.display()))?;

    ensure!(
        !bytes.is_empty() && bytes.len() % RECORD_LEN == 0,
        "'{}' is not a whole number of {}-byte records ({} bytes)",
        path.display(),
        RECORD_LEN,
        bytes.len()
    );

    for record in bytes.chunks_exact(RECORD_LEN) {
        let label = usize::from(record[0]);
        ensure!(
            label < NUM_CLASSES,
            "'{}' holds label {} (valid range 0..{})",
            path.display(),
            label,
            NUM_CLASSES
        );
        samples.push(ImageSample {
            pixels: record[1..].to_vec(),
            label,
        });
    }

    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_batch(path: &Path, labels: &[u8]) {
        let mut bytes = Vec::new();
        for &label in labels {
            bytes.push(label);
            bytes.extend(std::iter::repeat(label.wrapping_mul(10)).take(PIXELS_PER_IMAGE));
        }
        fs::File::create(path).unwrap().write_all(&bytes).unwrap();
    }

    #[test]
    fn test_parses_test_batch() {
        let dir = tempfile::tempdir().unwrap();
        write_batch(&dir.path().join("test_batch.bin"), &[3, 7]);

        let dataset = Cifar10Dataset::test(dir.path()).unwrap();
        assert_eq!(dataset.len(), 2);

        let first = dataset.get(0).unwrap();
        assert_eq!(first.label, 3);
        assert_eq!(first.pixels.len(), PIXELS_PER_IMAGE);
        assert_eq!(first.pixels[0], 30);
        assert_eq!(CLASS_NAMES[first.label], "cat");
    }

    #[test]
    fn test_rejects_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_batch.bin");
        fs::write(&path, vec![0u8; RECORD_LEN - 1]).unwrap();

        assert!(Cifar10Dataset::test(dir.path()).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_label() {
        let dir = tempfile::tempdir().unwrap();
        write_batch(&dir.path().join("test_batch.bin"), &[12]);

        assert!(Cifar10Dataset::test(dir.path()).is_err());
    }

    #[test]
    fn test_train_requires_all_five_batches() {
        let dir = tempfile::tempdir().unwrap();
        // Only batch 1 present
        write_batch(&dir.path().join("data_batch_1.bin"), &[0]);

        assert!(Cifar10Dataset::train(dir.path()).is_err());
    }
}
