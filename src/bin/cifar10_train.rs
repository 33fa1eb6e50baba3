// ============================================================
// cifar10_train — CNN with augmentation and batch normalisation
// ============================================================
// Loads the five binary training batches, holds out a validation
// fraction, and trains the convolutional classifier under a
// flip + padded-crop + normalise pipeline. Augmentation runs per
// batch inside the transform pipeline, so the stored dataset stays
// untouched.

use anyhow::Result;
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::InMemDataset},
    optim::{decay::WeightDecayConfig, AdamConfig},
};
use clap::Parser;
use serde::Serialize;

use burn_lab::{
    cli::{self, TrainArgs},
    data::{batcher::ImageBatcher, cifar10::{self, Cifar10Dataset}, splitter},
    infra::{
        checkpoint::CheckpointStore,
        tracker::{generate_run_name, RunStatus, RunTracker, TrackingMode},
    },
    ml::{self, model::Cifar10CnnConfig, trainer::train_loop, InferBackend, TrainBackend},
    transform::{Transform, TransformPipeline},
};

const PROJECT: &str = "cifar10";
const DATA_DIR: &str = "data/cifar10";
const CHECKPOINT_DIR: &str = "checkpoints";
const RUNS_DIR: &str = "runs";

// Channel statistics of the 50k training images; cifar10_test uses
// the same constants
const CIFAR10_MEAN: [f32; 3] = [0.4915, 0.4823, 0.4468];
const CIFAR10_STD: [f32; 3] = [0.2470, 0.2435, 0.2616];

#[derive(Parser, Debug, Serialize)]
#[command(
    name = "cifar10_train",
    about = "Train the CIFAR-10 CNN with image augmentation and batch normalisation"
)]
struct Cli {
    #[command(flatten)]
    #[serde(flatten)]
    train: TrainArgs,

    /// Fraction of the training split held out for validation
    #[arg(long, default_value_t = 0.1)]
    validation_fraction: f64,

    /// Adam weight decay (0 disables it)
    #[arg(long, default_value_t = 2e-3)]
    weight_decay: f64,

    /// Dropout probability before the classification head
    #[arg(long, default_value_t = 0.5)]
    dropout: f64,

    /// Probability of mirroring a batch horizontally
    #[arg(long, default_value_t = 0.5)]
    flip_probability: f64,

    /// Zero-padding for the random crop
    #[arg(long, default_value_t = 4)]
    crop_padding: usize,
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
    let samples = Cifar10Dataset::train(DATA_DIR)?.into_samples();
    let (train_samples, val_samples) =
        splitter::split_train_val(samples, 1.0 - cli.validation_fraction);
    println!("Num Train Samples: {}", train_samples.len());
    println!("Num Validation Samples: {}", val_samples.len());

    let workers = cli.train.workers();
    println!("Number of Data Loading Workers: {workers}");

    let train_loader = DataLoaderBuilder::new(ImageBatcher::<TrainBackend>::new(
        device.clone(),
        cifar10::CHANNELS,
        cifar10::IMAGE_SIDE,
        cifar10::IMAGE_SIDE,
    ))
    .batch_size(cli.train.batch_size)
    .shuffle(42)
    .num_workers(workers)
    .build(InMemDataset::new(train_samples));

    let validation_loader = DataLoaderBuilder::new(ImageBatcher::<InferBackend>::new(
        device.clone(),
        cifar10::CHANNELS,
        cifar10::IMAGE_SIDE,
        cifar10::IMAGE_SIDE,
    ))
    .batch_size(cli.train.batch_size)
    .num_workers(workers)
    .build(InMemDataset::new(val_samples));

    // Augment first, then standardise — the crop sees real pixels
    let transforms = TransformPipeline::new(vec![
        Transform::RandomHorizontalFlip { p: cli.flip_probability },
        Transform::RandomCrop { padding: cli.crop_padding },
        Transform::Normalize { mean: CIFAR10_MEAN.to_vec(), std: CIFAR10_STD.to_vec() },
    ]);

    // ── Model and optimizer ───────────────────────────────────────────────────
    let model = Cifar10CnnConfig::new(cifar10::NUM_CLASSES, cli.dropout)
        .init::<TrainBackend>(&device);

    let mut optim_config = AdamConfig::new();
    if cli.weight_decay > 0.0 {
        optim_config = optim_config
            .with_weight_decay(Some(WeightDecayConfig::new(cli.weight_decay as f32)));
    }
    let optim = optim_config.init();

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
