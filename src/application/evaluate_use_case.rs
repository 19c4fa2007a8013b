// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Scores the best checkpoint of a finished run on a metadata file
// (the run's validation set unless another one is given).

use anyhow::Result;
use burn::prelude::Backend;
use std::path::Path;

use crate::data::{dataset::TtsDataset, loader::MetadataLoader};
use crate::domain::traits::MetadataSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    mel_stats::MelStats,
    phoneme_store::PhonemeStore,
};
use crate::ml::evaluator::Evaluator;

pub struct EvaluateUseCase {
    checkpoint_dir: String,
    metadata:       Option<String>,
    max_items:      Option<usize>,
}

/// Result of an evaluation run
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub epoch:       usize,
    pub utterances:  usize,
    pub loss:        f64,
}

impl EvaluateUseCase {
    pub fn new(checkpoint_dir: String, metadata: Option<String>, max_items: Option<usize>) -> Self {
        Self { checkpoint_dir, metadata, max_items }
    }

    pub fn execute(&self) -> Result<EvaluationReport> {
        let ckpt = CheckpointManager::new(&self.checkpoint_dir);
        self.execute_with(&ckpt, Evaluator::from_checkpoint(&ckpt)?)
    }

    /// Score an already loaded evaluator on the selected metadata
    pub fn execute_with<B: Backend>(
        &self,
        ckpt:      &CheckpointManager,
        evaluator: Evaluator<B>,
    ) -> Result<EvaluationReport> {
        let epoch = ckpt.load_state()?.epoch;
        let cfg   = evaluator.config().clone();

        let vocab = PhonemeStore::new(ckpt.dir()).load()?;
        let stats = MelStats::load(Path::new(&cfg.mel_stats))?;

        let metadata = self.metadata.clone().unwrap_or_else(|| cfg.val_metadata.clone());
        tracing::info!("Evaluating checkpoint from epoch {} on '{}'", epoch, metadata);
        let utterances = MetadataLoader::new(&metadata)
            .with_max_items(self.max_items.unwrap_or(cfg.val_max_items))
            .load_all()?;

        let dataset = TtsDataset::load(&utterances, &cfg.dataset_source(), &vocab, stats)?;
        let count   = dataset.sample_count();
        let loss    = evaluator.evaluate(dataset);

        Ok(EvaluationReport { epoch, utterances: count, loss })
    }
}
