// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores the best model of a training run using
// Burn's CompactRecorder.
//
// Only one checkpoint per run is kept on disk: saving a new best
// removes the one saved before it. That removal is best-effort,
// a failure is logged and training continues.
//
// File layout:
//   checkpoints/
//     model_epoch_7/
//       model.mpk            ← model weights
//       optimizer.mpk        ← Adam moment estimates
//       state.json           ← epoch, losses, learning rate
//     latest_checkpoint.json ← which model_epoch_* is current
//     train_config.json      ← hyperparameters to rebuild the model
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    optim::Optimizer,
    prelude::*,
    record::{CompactRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::TransformerTts;

const LATEST_FILE: &str = "latest_checkpoint.json";
const CONFIG_FILE: &str = "train_config.json";

/// Everything about a checkpoint that is not a tensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    pub epoch:      usize,
    pub train_loss: f64,
    pub val_loss:   f64,
    pub lr:         f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LatestPointer {
    epoch: usize,
    dir:   String,
}

pub struct CheckpointManager {
    /// Directory where checkpoints are stored
    dir: PathBuf,

    /// Checkpoint directory written earlier in this run, if any
    latest: Option<PathBuf>,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), latest: None }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save model, optimizer state and metadata for `state.epoch`,
    /// then drop the checkpoint this run saved before.
    pub fn save_checkpoint<B, O>(
        &mut self,
        model: &TransformerTts<B>,
        optim: &O,
        state: &CheckpointState,
    ) -> Result<PathBuf>
    where
        B: AutodiffBackend,
        O: Optimizer<TransformerTts<B>, B>,
    {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", self.dir.display()))?;

        if let Some(previous) = self.latest.take() {
            match fs::remove_dir_all(&previous) {
                Ok(()) => tracing::info!("Removed previous checkpoint: {}", previous.display()),
                Err(e) => tracing::warn!(
                    "Error removing checkpoint {}: {}",
                    previous.display(),
                    e
                ),
            }
        }

        let name = format!("model_epoch_{}", state.epoch);
        let path = self.dir.join(&name);
        fs::create_dir_all(&path)
            .with_context(|| format!("Cannot create '{}'", path.display()))?;

        model
            .clone()
            .save_file(path.join("model"), &CompactRecorder::new())
            .with_context(|| format!("Failed to save model to '{}'", path.display()))?;

        <CompactRecorder as Recorder<B>>::record(
            &CompactRecorder::new(),
            optim.to_record(),
            path.join("optimizer"),
        )
        .with_context(|| format!("Failed to save optimizer state to '{}'", path.display()))?;

        fs::write(path.join("state.json"), serde_json::to_string_pretty(state)?)
            .with_context(|| format!("Cannot write state.json in '{}'", path.display()))?;

        let pointer = LatestPointer { epoch: state.epoch, dir: name };
        fs::write(self.dir.join(LATEST_FILE), serde_json::to_string_pretty(&pointer)?)
            .with_context(|| format!("Failed to write {LATEST_FILE}"))?;

        tracing::info!("Checkpoint saved at {}", path.display());
        self.latest = Some(path.clone());
        Ok(path)
    }

    /// Load weights from the latest checkpoint into `model`.
    /// The model must have the architecture the checkpoint was saved with.
    pub fn load_model<B: Backend>(
        &self,
        model:  TransformerTts<B>,
        device: &B::Device,
    ) -> Result<TransformerTts<B>> {
        let path = self.latest_dir()?;
        tracing::info!("Loading checkpoint from '{}'", path.display());

        model
            .load_file(path.join("model"), &CompactRecorder::new(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display())
            })
    }

    /// Metadata of the latest checkpoint
    pub fn load_state(&self) -> Result<CheckpointState> {
        let path = self.latest_dir()?.join("state.json");
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Save the training configuration so evaluation can rebuild the model.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", self.dir.display()))?;
        let path = self.dir.join(CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read config from '{}'. \
                     Make sure you have run 'train' before 'evaluate'.",
                    path.display()
                )
            })?;
        Ok(serde_json::from_str(&json)?)
    }

    fn latest_dir(&self) -> Result<PathBuf> {
        let path = self.dir.join(LATEST_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot find '{}'. Have you run 'train' first?", path.display()))?;
        let pointer: LatestPointer = serde_json::from_str(&json)?;
        Ok(self.dir.join(pointer.dir))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::module::AutodiffModule;
    use burn::optim::AdamConfig;

    use crate::ml::model::tests::tiny_config;

    type TestBackend = Autodiff<NdArray>;

    fn state(epoch: usize, val_loss: f64) -> CheckpointState {
        CheckpointState { epoch, train_loss: 1.0, val_loss, lr: 1e-4 }
    }

    #[test]
    fn test_only_latest_checkpoint_kept() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let model: TransformerTts<TestBackend> = tiny_config(5, 3).init(&device);
        let optim = AdamConfig::new().init::<TestBackend, TransformerTts<TestBackend>>();

        let mut ckpt = CheckpointManager::new(dir.path());
        let first = ckpt.save_checkpoint(&model, &optim, &state(0, 2.0)).unwrap();
        assert!(first.is_dir());

        let second = ckpt.save_checkpoint(&model, &optim, &state(3, 1.5)).unwrap();
        assert!(!first.exists());
        assert!(second.is_dir());
        assert_eq!(ckpt.load_state().unwrap(), state(3, 1.5));
    }

    #[test]
    fn test_missing_previous_checkpoint_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let model: TransformerTts<TestBackend> = tiny_config(5, 3).init(&device);
        let optim = AdamConfig::new().init::<TestBackend, TransformerTts<TestBackend>>();

        let mut ckpt = CheckpointManager::new(dir.path());
        let first = ckpt.save_checkpoint(&model, &optim, &state(0, 2.0)).unwrap();
        fs::remove_dir_all(&first).unwrap();

        assert!(ckpt.save_checkpoint(&model, &optim, &state(1, 1.0)).is_ok());
    }

    #[test]
    fn test_saved_weights_reload() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let model: TransformerTts<TestBackend> = tiny_config(5, 3).init(&device);
        let optim = AdamConfig::new().init::<TestBackend, TransformerTts<TestBackend>>();

        let mut ckpt = CheckpointManager::new(dir.path());
        ckpt.save_checkpoint(&model, &optim, &state(0, 2.0)).unwrap();

        let fresh: TransformerTts<NdArray> = tiny_config(5, 3).init(&device);
        let loaded = ckpt.load_model(fresh, &device).unwrap();

        let expected = model.valid().mel_head.weight.val().into_data();
        loaded.mel_head.weight.val().into_data().assert_approx_eq(&expected, 2);
    }
}
