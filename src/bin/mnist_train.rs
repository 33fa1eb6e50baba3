// ============================================================
// mnist_train — fully-connected MNIST classifier
// ============================================================
// Loads the IDX training files, holds out a validation fraction,
// and runs the shared training loop with normalise+flatten
// transforms. Checkpoints land in checkpoints/, the run record in
// runs/ when --tracking is passed.

use anyhow::Result;
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::InMemDataset},
    optim::AdamConfig,
};
use clap::Parser;
use serde::Serialize;

use burn_lab::{
    cli::{self, TrainArgs},
    data::{batcher::ImageBatcher, mnist::{self, MnistDataset}, splitter},
    infra::{
        checkpoint::CheckpointStore,
        tracker::{generate_run_name, RunStatus, RunTracker, TrackingMode},
    },
    ml::{self, model::MnistDnnConfig, trainer::train_loop, InferBackend, TrainBackend},
    transform::{Transform, TransformPipeline},
};

const PROJECT: &str = "mnist";
const DATA_DIR: &str = "data/mnist";
const CHECKPOINT_DIR: &str = "checkpoints";
const RUNS_DIR: &str = "runs";

// Dataset statistics; mnist_test uses the same constants
const MNIST_MEAN: f32 = 0.1307;
const MNIST_STD: f32 = 0.3081;

#[derive(Parser, Debug, Serialize)]
#[command(name = "mnist_train", about = "Train the fully-connected MNIST classifier")]
struct Cli {
    #[command(flatten)]
    #[serde(flatten)]
    train: TrainArgs,

    /// Fraction of the training split held out for validation
    #[arg(long, default_value_t = 0.1)]
    validation_fraction: f64,

    /// Width of the two hidden layers
    #[arg(long, default_value_t = 256)]
    hidden_size: usize,

    /// Dropout probability between the hidden layers
    #[arg(long, default_value_t = 0.2)]
    dropout: f64,
}

fn main() -> Result<()> {
    cli::init_tracing();
    let cli = Cli::parse();

    let run_name = generate_run_name();
    let mut tracker = RunTracker::init(
        TrackingMode::from_flag(cli.train.tracking),
        RUNS_DIR,
        PROJECT,
        &run_name,
        &cli,
    )?;

    let device = ml::default_device();

    // ── Data ──────────────────────────────────────────────────────────────────
    let samples = MnistDataset::train(DATA_DIR)?.into_samples();
    let (train_samples, val_samples) =
        splitter::split_train_val(samples, 1.0 - cli.validation_fraction);
    println!("Num Train Samples: {}", train_samples.len());
    println!("Num Validation Samples: {}", val_samples.len());

    let workers = cli.train.workers();
    let train_loader = DataLoaderBuilder::new(ImageBatcher::<TrainBackend>::new(
        device.clone(),
        mnist::CHANNELS,
        mnist::IMAGE_SIDE,
        mnist::IMAGE_SIDE,
    ))
    .batch_size(cli.train.batch_size)
    .shuffle(42)
    .num_workers(workers)
    .build(InMemDataset::new(train_samples));

    let validation_loader = DataLoaderBuilder::new(ImageBatcher::<InferBackend>::new(
        device.clone(),
        mnist::CHANNELS,
        mnist::IMAGE_SIDE,
        mnist::IMAGE_SIDE,
    ))
    .batch_size(cli.train.batch_size)
    .num_workers(workers)
    .build(InMemDataset::new(val_samples));

    let transforms = TransformPipeline::new(vec![
        Transform::Normalize { mean: vec![MNIST_MEAN], std: vec![MNIST_STD] },
        Transform::Flatten,
    ]);

    // ── Model and optimizer ───────────────────────────────────────────────────
    let model = MnistDnnConfig::new(
        mnist::IMAGE_SIDE * mnist::IMAGE_SIDE,
        cli.hidden_size,
        mnist::NUM_CLASSES,
        cli.dropout,
    )
    .init::<TrainBackend>(&device);
    let optim = AdamConfig::new().init();

    // ── Train ─────────────────────────────────────────────────────────────────
    let checkpoints = CheckpointStore::new(CHECKPOINT_DIR, PROJECT)?;
    let (_model, report) = train_loop(
        &cli.train.trainer_config(PROJECT),
        model,
        optim,
        train_loader,
        Some(validation_loader),
        Some(&transforms),
        &checkpoints,
        &mut tracker,
    )?;
    tracker.finish(RunStatus::Completed)?;

    println!(
        "Run '{run_name}' finished after {} epochs{}",
        report.epochs_run,
        if report.stopped_early { " (stopped early)" } else { "" },
    );
    if let Some(best) = report.best_validation_loss {
        println!("Best validation loss: {best:.5}");
    }
    Ok(())
}
