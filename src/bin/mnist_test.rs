// ============================================================
// mnist_test — evaluate a trained MNIST checkpoint
// ============================================================
// Loads the held-out IDX split as one full-size batch, restores
// the requested checkpoint slot, and reports aggregate loss and
// accuracy. Finishes with a single-sample inference on the first
// test digit, the raw scores next to the predicted class.

use anyhow::Result;
use burn::data::{dataloader::DataLoaderBuilder, dataset::Dataset};
use clap::Parser;

use burn_lab::{
    cli,
    data::{batcher::ImageBatcher, mnist::{self, MnistDataset}},
    infra::checkpoint::{CheckpointStore, Slot},
    ml::{self, model::MnistDnnConfig, tester::ClassificationTester, InferBackend},
    transform::{Transform, TransformPipeline},
};

const PROJECT: &str = "mnist";

// Must match the constants the training script used
const MNIST_MEAN: f32 = 0.1307;
const MNIST_STD: f32 = 0.3081;

#[derive(Parser, Debug)]
#[command(name = "mnist_test", about = "Evaluate a trained MNIST checkpoint")]
struct Cli {
    /// Directory holding the IDX files
    #[arg(long, default_value = "data/mnist")]
    data_dir: String,

    /// Directory the training script wrote checkpoints into
    #[arg(long, default_value = "checkpoints")]
    checkpoint_dir: String,

    /// Hidden width used at training time
    #[arg(long, default_value_t = 256)]
    hidden_size: usize,

    /// Load the best checkpoint instead of the latest
    #[arg(long)]
    best: bool,
}

fn main() -> Result<()> {
    cli::init_tracing();
    let cli = Cli::parse();
    let device = ml::default_device();

    // ── Data: the whole held-out split as one batch ───────────────────────────
    let dataset = MnistDataset::test(&cli.data_dir)?;
    let num_samples = dataset.len();
    println!("Num Test Samples: {num_samples}");

    let first_sample = dataset.get(0);

    let batcher = ImageBatcher::<InferBackend>::new(
        device.clone(),
        mnist::CHANNELS,
        mnist::IMAGE_SIDE,
        mnist::IMAGE_SIDE,
    );
    let loader = DataLoaderBuilder::new(batcher.clone())
        .batch_size(num_samples)
        .build(dataset);

    let transforms = TransformPipeline::new(vec![
        Transform::Normalize { mean: vec![MNIST_MEAN], std: vec![MNIST_STD] },
        Transform::Flatten,
    ]);

    // ── Model from checkpoint ─────────────────────────────────────────────────
    // Dropout plays no role at inference time
    let model = MnistDnnConfig::new(
        mnist::IMAGE_SIDE * mnist::IMAGE_SIDE,
        cli.hidden_size,
        mnist::NUM_CLASSES,
        0.0,
    )
    .init::<InferBackend>(&device);

    let checkpoints = CheckpointStore::new(&cli.checkpoint_dir, PROJECT)?;
    let slot = if cli.best { Slot::Best } else { Slot::Latest };
    let model = checkpoints.load(model, slot, &device)?;

    // ── Evaluate ──────────────────────────────────────────────────────────────
    let tester = ClassificationTester::new(PROJECT, model, loader, batcher, Some(transforms));
    tester.test()?;

    if let Some(sample) = first_sample {
        println!();
        println!("     LABEL: {}", sample.label);
        let prediction = tester.test_single(&sample);
        println!("PREDICTION: {}", prediction.class);
        println!("    SCORES: {:?}", prediction.scores);
    }

    Ok(())
}
