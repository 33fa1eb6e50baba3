// ============================================================
// Checkpoint store
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder
// (MessagePack + gzip; the recorder appends its own .mpk.gz
// extension). Each project owns exactly two slots:
//
//   checkpoints/
//     {project}_checkpoint_latest(.mpk.gz)  ← every validation check
//     {project}_checkpoint_latest.json      ← epoch + loss sidecar
//     {project}_checkpoint_best(.mpk.gz)    ← strict improvements only
//     {project}_checkpoint_best.json
//
// The training loop overwrites "latest" on every validation check
// and "best" only when validation loss strictly improves, so the
// best sidecar's loss is never above the latest sidecar's loss.
//
// Loading is type-safe: the caller constructs a model with the same
// architecture and the recorder restores its weights, failing if
// the shapes do not match.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};

/// Which snapshot of a project's model to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Latest,
    Best,
}

impl Slot {
    fn tag(self) -> &'static str {
        match self {
            Slot::Latest => "latest",
            Slot::Best => "best",
        }
    }
}

/// What was known about the model when a slot was written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMeta {
    pub epoch: usize,
    pub validation_loss: Option<f64>,
}

/// Manages the two checkpoint slots of one project.
pub struct CheckpointStore {
    dir: PathBuf,
    project: String,
}

impl CheckpointStore {
    /// Create the store, making the directory if needed. A directory
    /// that cannot be created is fatal — nothing downstream works
    /// without somewhere to write.
    pub fn new(dir: impl Into<PathBuf>, project: impl Into<String>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir, project: project.into() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Weight file path for a slot, without the recorder extension.
    fn slot_path(&self, slot: Slot) -> PathBuf {
        self.dir.join(format!("{}_checkpoint_{}", self.project, slot.tag()))
    }

    fn meta_path(&self, slot: Slot) -> PathBuf {
        self.dir.join(format!("{}_checkpoint_{}.json", self.project, slot.tag()))
    }

    /// Persist model weights into a slot, together with the sidecar
    /// recording when and how well the model was doing.
    pub fn save<B: Backend, M: Module<B>>(
        &self,
        model: &M,
        slot: Slot,
        epoch: usize,
        validation_loss: Option<f64>,
    ) -> Result<()> {
        let path = self.slot_path(slot);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let meta = CheckpointMeta { epoch, validation_loss };
        fs::write(self.meta_path(slot), serde_json::to_string_pretty(&meta)?)
            .with_context(|| format!("Failed to write {} checkpoint sidecar", slot.tag()))?;

        tracing::debug!("Saved {} checkpoint at epoch {}", slot.tag(), epoch);
        Ok(())
    }

    /// Restore the weights of a slot into `model`. The model must
    /// have the architecture the checkpoint was written with.
    pub fn load<B: Backend, M: Module<B>>(
        &self,
        model: M,
        slot: Slot,
        device: &B::Device,
    ) -> Result<M> {
        let path = self.slot_path(slot);
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!(
                    "Cannot load checkpoint '{}'. Have you trained this project first?",
                    path.display()
                )
            })?;
        tracing::info!("Loaded {} checkpoint for '{}'", slot.tag(), self.project);
        Ok(model.load_record(record))
    }

    /// Read a slot's sidecar.
    pub fn meta(&self, slot: Slot) -> Result<CheckpointMeta> {
        let path = self.meta_path(slot);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read checkpoint sidecar '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::nn::{Linear, LinearConfig};

    type TB = burn::backend::NdArray;

    fn device() -> burn::backend::ndarray::NdArrayDevice {
        burn::backend::ndarray::NdArrayDevice::default()
    }

    #[derive(Module, Debug)]
    struct TinyModel<B: Backend> {
        fc: Linear<B>,
    }

    fn tiny_model(device: &burn::backend::ndarray::NdArrayDevice) -> TinyModel<TB> {
        TinyModel { fc: LinearConfig::new(4, 2).init(device) }
    }

    #[test]
    fn test_meta_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path(), "probe").unwrap();
        let model = tiny_model(&device());

        store.save(&model, Slot::Best, 7, Some(0.25)).unwrap();

        let meta = store.meta(Slot::Best).unwrap();
        assert_eq!(meta.epoch, 7);
        assert_eq!(meta.validation_loss, Some(0.25));
    }

    #[test]
    fn test_save_then_load_restores_weights() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path(), "probe").unwrap();
        let device = device();

        let model = tiny_model(&device);
        store.save(&model, Slot::Latest, 1, None).unwrap();

        let input = Tensor::<TB, 2>::from_floats([[1.0, 2.0, 3.0, 4.0]], &device);
        let expected: Vec<f32> =
            model.fc.forward(input.clone()).into_data().to_vec().unwrap();

        // A freshly initialised model has different weights until the
        // checkpoint is loaded into it.
        let restored = store.load(tiny_model(&device), Slot::Latest, &device).unwrap();
        let actual: Vec<f32> = restored.fc.forward(input).into_data().to_vec().unwrap();

        assert_eq!(expected, actual);
    }

    #[test]
    fn test_load_without_training_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path(), "probe").unwrap();

        let result = store.load(tiny_model(&device()), Slot::Best, &device());
        assert!(result.is_err());
    }

    #[test]
    fn test_slots_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path(), "probe").unwrap();
        let model = tiny_model(&device());

        store.save(&model, Slot::Latest, 3, Some(1.0)).unwrap();
        store.save(&model, Slot::Best, 2, Some(0.5)).unwrap();

        assert_eq!(store.meta(Slot::Latest).unwrap().epoch, 3);
        assert_eq!(store.meta(Slot::Best).unwrap().epoch, 2);
    }
}
