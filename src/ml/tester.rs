// ============================================================
// Testers
// ============================================================
// Held-out evaluation for trained models. The caller loads the
// checkpoint into an inner-backend model first, so every forward
// pass here runs without a gradient tape.
//
//   ClassificationTester — aggregate loss + accuracy over a loader,
//                          plus single-sample inference that runs
//                          one raw sample through the training-time
//                          transform pipeline
//   RegressionTester     — aggregate MSE over a loader, printing
//                          each hour's predicted vs. actual value
//
// Single-sample inference returns both the raw per-class scores and
// the argmax class index, so callers can print either.

use std::sync::Arc;

use anyhow::Result;
use burn::{
    data::dataloader::{batcher::Batcher, DataLoader},
    nn::loss::{CrossEntropyLossConfig, MseLoss, Reduction},
    prelude::*,
};

use crate::data::batcher::{ImageBatch, ImageBatcher, ImageSample, SequenceBatch};
use crate::ml::model::{ImageClassifier, SequenceRegressor};
use crate::transform::{self, TransformPipeline};

// ─── Classification ──────────────────────────────────────────────────────────

/// Aggregate held-out results.
#[derive(Debug, Clone)]
pub struct TestReport {
    pub loss: f64,
    pub accuracy: f64,
    pub samples: usize,
}

/// What the model said about one sample.
#[derive(Debug, Clone)]
pub struct Prediction {
    /// Raw logits, one per class
    pub scores: Vec<f32>,
    /// Index of the highest score
    pub class: usize,
}

pub struct ClassificationTester<B: Backend, M: ImageClassifier<B>> {
    project: String,
    model: M,
    loader: Arc<dyn DataLoader<ImageBatch<B>>>,
    batcher: ImageBatcher<B>,
    transforms: Option<TransformPipeline>,
}

impl<B: Backend, M: ImageClassifier<B>> ClassificationTester<B, M> {
    pub fn new(
        project: impl Into<String>,
        model: M,
        loader: Arc<dyn DataLoader<ImageBatch<B>>>,
        batcher: ImageBatcher<B>,
        transforms: Option<TransformPipeline>,
    ) -> Self {
        Self { project: project.into(), model, loader, batcher, transforms }
    }

    /// One pass over the whole loader: average loss and accuracy.
    pub fn test(&self) -> Result<TestReport> {
        let mut loss_sum = 0.0f64;
        let mut batches = 0usize;
        let mut correct = 0usize;
        let mut total = 0usize;

        for batch in self.loader.iter() {
            let labels = batch.labels.clone();
            let input = transform::apply(self.transforms.as_ref(), batch.images);
            let logits = self.model.logits(input);

            let loss = CrossEntropyLossConfig::new()
                .init(&logits.device())
                .forward(logits.clone(), labels.clone());
            loss_sum += loss.into_scalar().elem::<f64>();
            batches += 1;

            total += labels.dims()[0];

            // argmax(1) returns [batch, 1]; flatten before comparing
            let predictions = logits.argmax(1).flatten::<1>(0, 1);
            let hits: i64 = predictions.equal(labels).int().sum().into_scalar().elem::<i64>();
            correct += hits as usize;
        }

        let report = TestReport {
            loss: if batches > 0 { loss_sum / batches as f64 } else { f64::NAN },
            accuracy: if total > 0 { correct as f64 / total as f64 } else { 0.0 },
            samples: total,
        };

        println!(
            "[{}] TEST RESULTS: loss {:.5} | accuracy {:.2}% ({}/{} correct)",
            self.project,
            report.loss,
            report.accuracy * 100.0,
            correct,
            total,
        );

        Ok(report)
    }

    /// Run one raw sample through the training-time transforms and
    /// the model.
    pub fn test_single(&self, sample: &ImageSample) -> Prediction {
        let batch = self.batcher.batch(vec![sample.clone()]);
        let input = transform::apply(self.transforms.as_ref(), batch.images);

        let scores: Vec<f32> = self
            .model
            .logits(input)
            .into_data()
            .to_vec()
            .unwrap_or_default();
        let class = argmax(&scores);

        Prediction { scores, class }
    }
}

/// Index of the largest score; 0 for an empty slice.
fn argmax(scores: &[f32]) -> usize {
    scores
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(index, _)| index)
        .unwrap_or(0)
}

// ─── Regression ──────────────────────────────────────────────────────────────

pub struct RegressionTester<B: Backend, M: SequenceRegressor<B>> {
    project: String,
    model: M,
    loader: Arc<dyn DataLoader<SequenceBatch<B>>>,
}

impl<B: Backend, M: SequenceRegressor<B>> RegressionTester<B, M> {
    pub fn new(
        project: impl Into<String>,
        model: M,
        loader: Arc<dyn DataLoader<SequenceBatch<B>>>,
    ) -> Self {
        Self { project: project.into(), model, loader }
    }

    /// One pass over the loader: average MSE, printing each hour's
    /// predicted vs. actual value along the way.
    pub fn test(&self) -> Result<f64> {
        let mut loss_sum = 0.0f64;
        let mut batches = 0usize;

        for batch in self.loader.iter() {
            let targets = batch.targets.clone();
            let output = self.model.forecast(batch.inputs);

            let loss = MseLoss::new().forward(output.clone(), targets.clone(), Reduction::Mean);
            loss_sum += loss.into_scalar().elem::<f64>();
            batches += 1;

            let [days, steps, _] = output.dims();
            let predicted: Vec<f32> = output.into_data().to_vec().unwrap_or_default();
            let actual: Vec<f32> = targets.into_data().to_vec().unwrap_or_default();

            for day in 0..days {
                for hour in 0..steps {
                    let i = day * steps + hour;
                    println!(
                        "{:2}: {:7.2} <--> {:7.2} (error {:7.2})",
                        hour,
                        predicted[i],
                        actual[i],
                        actual[i] - predicted[i],
                    );
                }
            }
        }

        let loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
        println!("[{}] TEST RESULTS: mse {:.4}", self.project, loss);
        Ok(loss)
    }
}
