// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Rebuilds the model from train_config.json, loads the best
// checkpoint and reports the mean validation loss.
use anyhow::Result;
use burn::{data::dataloader::DataLoaderBuilder, prelude::*};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::TtsBatcher, dataset::TtsDataset};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::TransformerTts;
use crate::ml::trainer::validate;

type InferBackend = burn::backend::Wgpu;

pub struct Evaluator<B: Backend = InferBackend> {
    model:  TransformerTts<B>,
    config: TrainConfig,
    device: B::Device,
}

impl Evaluator<InferBackend> {
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager) -> Result<Self> {
        Self::load(ckpt_manager, burn::backend::wgpu::WgpuDevice::default())
    }
}

impl<B: Backend> Evaluator<B> {
    pub fn load(ckpt_manager: &CheckpointManager, device: B::Device) -> Result<Self> {
        let config = ckpt_manager.load_config()?;
        let model: TransformerTts<B> = config.model_config().with_dropout(0.0).init(&device);
        let model = ckpt_manager.load_model(model, &device)?;
        tracing::info!("Model loaded from checkpoint");
        Ok(Self { model, config, device })
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Mean combined loss over `dataset`
    pub fn evaluate(&self, dataset: TtsDataset) -> f64 {
        let batcher = TtsBatcher::<B>::new(self.device.clone(), self.config.pad_id, self.config.n_mels);
        let loader = DataLoaderBuilder::new(batcher)
            .batch_size(self.config.batch_size)
            .num_workers(self.config.num_workers)
            .build(dataset);
        validate(&self.model, &loader)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    use crate::data::dataset::tests::write_corpus;
    use crate::infra::{mel_stats::MelStats, phoneme_store::PhonemeStore};
    use crate::ml::trainer::train_loop;

    #[test]
    fn test_evaluate_after_training() {
        let dir = tempfile::tempdir().unwrap();
        let (utts, source) = write_corpus(dir.path(), 4, &[("a", "A B", &[1.0, 2.0]), ("b", "B", &[2.0])]);
        let vocab = PhonemeStore::new(dir.path()).load_or_build(&utts).unwrap();
        let stats = MelStats::new(0.0, 7.0).unwrap();
        let dataset = || TtsDataset::load(&utts, &source, &vocab, stats).unwrap();

        let cfg = TrainConfig {
            checkpoint_dir: dir.path().join("ckpt").to_string_lossy().into_owned(),
            epochs: 1, batch_size: 2, d_model: 8, num_heads: 2, num_layers: 1, d_ff: 16,
            n_mels: 4, max_phonemes: 8, max_frames: 16, num_workers: 1,
            vocab_size: vocab.vocab_size(), pad_id: vocab.pad_id(),
            ..TrainConfig::default()
        };
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt.save_config(&cfg).unwrap();
        train_loop::<Autodiff<NdArray>>(&cfg, dataset(), dataset(), ckpt, Default::default()).unwrap();

        let evaluator = Evaluator::<NdArray>::load(&CheckpointManager::new(&cfg.checkpoint_dir), Default::default()).unwrap();
        assert_eq!(evaluator.config().vocab_size, vocab.vocab_size());
        assert!(evaluator.evaluate(dataset()).is_finite());
    }
}
