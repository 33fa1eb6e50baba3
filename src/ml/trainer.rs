// ============================================================
// Training loop
// ============================================================
// One loop shared by every script: forward pass, loss, backward
// pass, optimizer step, periodic validation, early stopping, and
// latest/best checkpointing. The loop is generic over the model
// through two small traits with an associated batch type, so the
// classifiers (image batches, cross-entropy) and the regressor
// (sequence batches, MSE) both drive it unchanged.
//
// Policy, per validation check (every `validation_intervals`
// epochs):
//   1. run a no-gradient pass over the validation loader using the
//      inner-backend model from AutodiffModule::valid()
//   2. always persist the model as "latest"
//   3. on strict improvement over the best loss seen, also persist
//      as "best" and reset the patience counter
//   4. otherwise bump the counter; reaching `early_stop_patience`
//      ends training
//
// Best starts at +infinity, so the first check always counts as an
// improvement: a run that never improves afterwards stops exactly
// `early_stop_patience` checks after the first one.
//
// No retries anywhere — framework panics and I/O errors abort the
// run, and that is the intended failure mode for these scripts.
//
// Reference: Burn Book §5 (Training)

use std::sync::Arc;

use anyhow::Result;
use burn::{
    data::dataloader::DataLoader,
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::infra::{
    checkpoint::{CheckpointStore, Slot},
    metrics::MetricsLogger,
    tracker::RunTracker,
};
use crate::transform::TransformPipeline;

// ─── Model seams ─────────────────────────────────────────────────────────────

/// Forward pass + loss on the autodiff backend. Implemented by every
/// model the training loop can drive.
pub trait TrainStep<B: AutodiffBackend>: AutodiffModule<B> {
    type Batch;

    /// Apply the transform pipeline to the batch inputs, run the
    /// forward pass, and return the scalar loss.
    fn step(&self, batch: Self::Batch, transforms: Option<&TransformPipeline>) -> Tensor<B, 1>;
}

/// The same contract on a plain (no-gradient) backend, used for
/// validation passes.
pub trait ValidStep<B: Backend> {
    type Batch;

    fn step(&self, batch: Self::Batch, transforms: Option<&TransformPipeline>) -> Tensor<B, 1>;
}

// ─── Configuration and outcome ───────────────────────────────────────────────

/// Hyperparameters of one training run.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    pub project: String,
    pub epochs: usize,
    pub validation_intervals: usize,
    pub early_stop_patience: usize,
    pub learning_rate: f64,
}

/// What the loop did before returning.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub epochs_run: usize,
    pub best_validation_loss: Option<f64>,
    pub stopped_early: bool,
}

// ─── Early stopping ──────────────────────────────────────────────────────────

/// Outcome of one validation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Strictly better than everything seen before
    Improved,
    /// No improvement, patience remains
    NoImprovement,
    /// No improvement and patience is spent
    OutOfPatience,
}

/// Counts consecutive validation checks without strict improvement.
#[derive(Debug)]
pub struct EarlyStopping {
    patience: usize,
    best: f64,
    checks_without_improvement: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            best: f64::INFINITY,
            checks_without_improvement: 0,
        }
    }

    /// Record one validation loss and decide how to proceed.
    pub fn observe(&mut self, validation_loss: f64) -> Verdict {
        if validation_loss < self.best {
            self.best = validation_loss;
            self.checks_without_improvement = 0;
            Verdict::Improved
        } else {
            self.checks_without_improvement += 1;
            if self.checks_without_improvement >= self.patience {
                Verdict::OutOfPatience
            } else {
                Verdict::NoImprovement
            }
        }
    }

    /// Best validation loss observed so far, if any check happened.
    pub fn best_loss(&self) -> Option<f64> {
        if self.best.is_finite() {
            Some(self.best)
        } else {
            None
        }
    }

    pub fn counter(&self) -> usize {
        self.checks_without_improvement
    }
}

// ─── The loop ────────────────────────────────────────────────────────────────

/// Run up to `cfg.epochs` passes over `train_loader`, validating,
/// checkpointing, and possibly stopping early as described above.
/// Returns the trained model and a report of what happened.
#[allow(clippy::too_many_arguments)]
pub fn train_loop<B, M, O>(
    cfg: &TrainerConfig,
    mut model: M,
    mut optim: O,
    train_loader: Arc<dyn DataLoader<<M as TrainStep<B>>::Batch>>,
    validation_loader: Option<
        Arc<dyn DataLoader<<M::InnerModule as ValidStep<B::InnerBackend>>::Batch>>,
    >,
    transforms: Option<&TransformPipeline>,
    checkpoints: &CheckpointStore,
    tracker: &mut RunTracker,
) -> Result<(M, TrainReport)>
where
    B: AutodiffBackend,
    M: TrainStep<B>,
    M::InnerModule: ValidStep<B::InnerBackend>,
    O: Optimizer<M, B>,
{
    let metrics = MetricsLogger::new(checkpoints.dir(), &cfg.project)?;
    let mut stopper = EarlyStopping::new(cfg.early_stop_patience);
    let interval = cfg.validation_intervals.max(1);

    let mut epochs_run = 0;
    let mut stopped_early = false;

    for epoch in 1..=cfg.epochs {
        epochs_run = epoch;

        // ── Training phase ────────────────────────────────────────────────────
        let mut loss_sum = 0.0f64;
        let mut batches = 0usize;

        for batch in train_loader.iter() {
            let loss = model.step(batch, transforms);

            loss_sum += loss.clone().into_scalar().elem::<f64>();
            batches += 1;

            // Backward pass + optimizer update
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(cfg.learning_rate, model, grads);
        }

        let train_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
        tracker.log_metric("train_loss", train_loss, epoch);

        // ── Validation phase ──────────────────────────────────────────────────
        let mut validation_loss = None;
        if let Some(loader) = &validation_loader {
            if epoch % interval == 0 {
                // valid() drops the gradient tape for this pass
                let val_loss = validation_pass(&model.valid(), loader, transforms);
                validation_loss = Some(val_loss);
                tracker.log_metric("validation_loss", val_loss, epoch);

                checkpoints.save::<B, M>(&model, Slot::Latest, epoch, Some(val_loss))?;

                match stopper.observe(val_loss) {
                    Verdict::Improved => {
                        checkpoints.save::<B, M>(&model, Slot::Best, epoch, Some(val_loss))?;
                    }
                    Verdict::NoImprovement => {}
                    Verdict::OutOfPatience => {
                        println!(
                            "Epoch {:>4}/{} | train loss {:.5} | validation loss {:.5} | \
                             early stopping after {} checks without improvement",
                            epoch, cfg.epochs, train_loss, val_loss, cfg.early_stop_patience
                        );
                        metrics.log(epoch, train_loss, validation_loss)?;
                        stopped_early = true;
                        break;
                    }
                }

                println!(
                    "Epoch {:>4}/{} | train loss {:.5} | validation loss {:.5} | patience {}/{}",
                    epoch,
                    cfg.epochs,
                    train_loss,
                    val_loss,
                    stopper.counter(),
                    cfg.early_stop_patience
                );
            }
        }

        if validation_loss.is_none() {
            println!("Epoch {:>4}/{} | train loss {:.5}", epoch, cfg.epochs, train_loss);
        }
        metrics.log(epoch, train_loss, validation_loss)?;
    }

    // Without a validation loader nothing was checkpointed above, so
    // persist the final weights for the test scripts.
    if validation_loader.is_none() {
        checkpoints.save::<B, M>(&model, Slot::Latest, epochs_run, None)?;
    }

    let report = TrainReport {
        epochs_run,
        best_validation_loss: stopper.best_loss(),
        stopped_early,
    };
    tracing::info!(
        "Training finished after {} epochs (best validation loss: {:?})",
        report.epochs_run,
        report.best_validation_loss
    );

    Ok((model, report))
}

/// Average loss over one no-gradient pass.
fn validation_pass<B, M>(
    model: &M,
    loader: &Arc<dyn DataLoader<M::Batch>>,
    transforms: Option<&TransformPipeline>,
) -> f64
where
    B: Backend,
    M: ValidStep<B>,
{
    let mut loss_sum = 0.0f64;
    let mut batches = 0usize;

    for batch in loader.iter() {
        loss_sum += model.step(batch, transforms).into_scalar().elem::<f64>();
        batches += 1;
    }

    if batches > 0 {
        loss_sum / batches as f64
    } else {
        f64::NAN
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::data::{dataloader::DataLoaderBuilder, dataset::InMemDataset};
    use burn::optim::AdamConfig;

    use crate::data::batcher::{ImageBatcher, ImageSample};
    use crate::infra::tracker::{RunStatus, TrackingMode};
    use crate::ml::model::MnistDnnConfig;
    use crate::transform::{Transform, TransformPipeline};

    type TB = burn::backend::NdArray;
    type TAB = burn::backend::Autodiff<burn::backend::NdArray>;

    fn device() -> burn::backend::ndarray::NdArrayDevice {
        burn::backend::ndarray::NdArrayDevice::default()
    }

    // ── EarlyStopping ─────────────────────────────────────────────────────────

    #[test]
    fn test_first_check_always_improves() {
        let mut stopper = EarlyStopping::new(3);
        assert_eq!(stopper.observe(123.4), Verdict::Improved);
        assert_eq!(stopper.best_loss(), Some(123.4));
    }

    /// With no improvement after the first check, the stop verdict
    /// arrives exactly `patience` checks later.
    #[test]
    fn test_stops_exactly_patience_checks_after_first() {
        let patience = 4;
        let mut stopper = EarlyStopping::new(patience);

        assert_eq!(stopper.observe(1.0), Verdict::Improved);
        for _ in 0..patience - 1 {
            assert_eq!(stopper.observe(1.0), Verdict::NoImprovement);
        }
        assert_eq!(stopper.observe(1.0), Verdict::OutOfPatience);
    }

    #[test]
    fn test_improvement_resets_counter() {
        let mut stopper = EarlyStopping::new(2);
        stopper.observe(1.0);
        assert_eq!(stopper.observe(1.0), Verdict::NoImprovement);
        assert_eq!(stopper.observe(0.5), Verdict::Improved);
        assert_eq!(stopper.counter(), 0);
        // Patience is fresh again
        assert_eq!(stopper.observe(0.5), Verdict::NoImprovement);
        assert_eq!(stopper.observe(0.5), Verdict::OutOfPatience);
    }

    #[test]
    fn test_equal_loss_is_not_an_improvement() {
        let mut stopper = EarlyStopping::new(5);
        stopper.observe(1.0);
        assert_eq!(stopper.observe(1.0), Verdict::NoImprovement);
        assert_eq!(stopper.best_loss(), Some(1.0));
    }

    // ── Full loop ─────────────────────────────────────────────────────────────

    fn tiny_samples(n: usize) -> Vec<ImageSample> {
        (0..n)
            .map(|i| ImageSample {
                // 1x2x2 image correlated with the label
                pixels: vec![if i % 2 == 0 { 0 } else { 255 }; 4],
                label: i % 2,
            })
            .collect()
    }

    #[test]
    fn test_train_loop_checkpoints_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let device = device();

        let cfg = TrainerConfig {
            project: "probe".into(),
            epochs: 3,
            validation_intervals: 1,
            early_stop_patience: 5,
            learning_rate: 1e-2,
        };

        let train_loader = DataLoaderBuilder::new(ImageBatcher::<TAB>::new(device, 1, 2, 2))
            .batch_size(4)
            .shuffle(42)
            .build(InMemDataset::new(tiny_samples(8)));
        let val_loader = DataLoaderBuilder::new(ImageBatcher::<TB>::new(device, 1, 2, 2))
            .batch_size(4)
            .build(InMemDataset::new(tiny_samples(4)));

        let model = MnistDnnConfig::new(4, 8, 2, 0.0).init::<TAB>(&device);
        let optim = AdamConfig::new().init();
        let transforms = TransformPipeline::new(vec![Transform::Flatten]);

        let checkpoints = CheckpointStore::new(dir.path(), "probe").unwrap();
        let mut tracker = RunTracker::init(
            TrackingMode::Disabled,
            dir.path().join("runs"),
            "probe",
            "test-run",
            &serde_json::json!({}),
        )
        .unwrap();

        let (_model, report) = train_loop(
            &cfg,
            model,
            optim,
            train_loader,
            Some(val_loader),
            Some(&transforms),
            &checkpoints,
            &mut tracker,
        )
        .unwrap();
        tracker.finish(RunStatus::Completed).unwrap();

        assert!(report.epochs_run <= 3);
        assert!(report.best_validation_loss.is_some());

        // Both slots written, and best never worse than latest.
        let latest = checkpoints.meta(Slot::Latest).unwrap();
        let best = checkpoints.meta(Slot::Best).unwrap();
        assert!(best.validation_loss.unwrap() <= latest.validation_loss.unwrap());
        assert!(latest.epoch <= 3);
    }
}
