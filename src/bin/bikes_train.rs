// ============================================================
// bikes_train — recurrent hourly-demand regressor
// ============================================================
// Loads the bike-sharing hourly CSV, splits it 70/20/10 into
// train/validation/test days, trains the recurrent regressor, then
// reloads the latest checkpoint and prints per-hour predictions
// against the held-out test days — train and test in one run, the
// way the time-series experiment is meant to be read.

use anyhow::Result;
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::InMemDataset},
    optim::AdamConfig,
};
use clap::Parser;
use serde::Serialize;

use burn_lab::{
    cli::{self, TrainArgs},
    data::{
        batcher::SequenceBatcher,
        bikes::{self, BikesDataset},
        splitter,
    },
    infra::{
        checkpoint::{CheckpointStore, Slot},
        tracker::{generate_run_name, RunStatus, RunTracker, TrackingMode},
    },
    ml::{
        self,
        model::BikesRnnConfig,
        tester::RegressionTester,
        trainer::train_loop,
        InferBackend, TrainBackend,
    },
};

const PROJECT: &str = "bikes";
const DATA_DIR: &str = "data/bikes";
const CHECKPOINT_DIR: &str = "checkpoints";
const RUNS_DIR: &str = "runs";

const TRAIN_FRACTION: f64 = 0.7;
const VALIDATION_FRACTION: f64 = 0.2;

#[derive(Parser, Debug, Serialize)]
#[command(name = "bikes_train", about = "Train and evaluate the bike-sharing regressor")]
struct Cli {
    #[command(flatten)]
    #[serde(flatten)]
    train: TrainArgs,

    /// Hidden width of the recurrent layers
    #[arg(long, default_value_t = 128)]
    hidden_size: usize,
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
    let days = BikesDataset::load(DATA_DIR)?.into_samples();
    let (train_days, val_days, test_days) =
        splitter::split_three(days, TRAIN_FRACTION, VALIDATION_FRACTION);
    println!("Num Train Samples: {}", train_days.len());
    println!("Num Validation Samples: {}", val_days.len());
    println!("Num Test Samples: {}", test_days.len());

    let workers = cli.train.workers();
    let train_loader = DataLoaderBuilder::new(SequenceBatcher::<TrainBackend>::new(
        device.clone(),
        bikes::HOURS_PER_DAY,
        bikes::FEATURES_PER_HOUR,
    ))
    .batch_size(cli.train.batch_size)
    .shuffle(42)
    .num_workers(workers)
    .build(InMemDataset::new(train_days));

    let validation_loader = DataLoaderBuilder::new(SequenceBatcher::<InferBackend>::new(
        device.clone(),
        bikes::HOURS_PER_DAY,
        bikes::FEATURES_PER_HOUR,
    ))
    .batch_size(cli.train.batch_size)
    .num_workers(workers)
    .build(InMemDataset::new(val_days));

    let test_loader = DataLoaderBuilder::new(SequenceBatcher::<InferBackend>::new(
        device.clone(),
        bikes::HOURS_PER_DAY,
        bikes::FEATURES_PER_HOUR,
    ))
    .batch_size(cli.train.batch_size)
    .build(InMemDataset::new(test_days));

    // ── Model and optimizer ───────────────────────────────────────────────────
    let model = BikesRnnConfig::new(bikes::FEATURES_PER_HOUR, cli.hidden_size)
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
        None,
        &checkpoints,
        &mut tracker,
    )?;
    tracker.finish(RunStatus::Completed)?;

    println!(
        "Run '{run_name}' finished after {} epochs{}",
        report.epochs_run,
        if report.stopped_early { " (stopped early)" } else { "" },
    );

    // ── Test on the held-out days ─────────────────────────────────────────────
    // Evaluate what was persisted, not the in-memory model — this is
    // exactly what a later inference consumer would load.
    let test_model = BikesRnnConfig::new(bikes::FEATURES_PER_HOUR, cli.hidden_size)
        .init::<InferBackend>(&device);
    let test_model = checkpoints.load(test_model, Slot::Latest, &device)?;

    let tester = RegressionTester::new(PROJECT, test_model, test_loader);
    tester.test()?;

    Ok(())
}
