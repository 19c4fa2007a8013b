// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Read training metadata       (Layer 4 - data)
//   Step 2: Build / load phoneme vocab   (Layer 6 - infra)
//   Step 3: Read validation metadata     (Layer 4 - data)
//           or split it off the training set
//   Step 4: Load mel statistics          (Layer 6 - infra)
//   Step 5: Build datasets               (Layer 4 - data)
//   Step 6: Save config                  (Layer 6 - infra)
//   Step 7: Run training loop            (Layer 5 - ml)
//
// Steps 1-6 live in prepare() so a run can be set up without
// touching the GPU backend.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::{
    dataset::{DatasetSource, TtsDataset},
    loader::MetadataLoader,
    splitter::split_train_val,
};
use crate::domain::traits::MetadataSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    mel_stats::MelStats,
    phoneme_store::PhonemeStore,
};
use crate::ml::model::TransformerTtsConfig;
use crate::ml::scheduler::LrStepPer;
use crate::ml::trainer::{run_training, TrainingSummary};

// ─── Training Configuration ──────────────────────────────────────────────────
// All paths and hyperparameters for a training run.
// Saved next to the checkpoints so evaluation can rebuild the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub train_metadata:  String,
    pub val_metadata:    String,
    pub mel_dir:         String,
    pub duration_dir:    String,
    pub mel_stats:       String,
    pub checkpoint_dir:  String,
    pub epochs:          usize,
    pub batch_size:      usize,
    pub lr:              f64,
    pub patience:        usize,
    pub d_model:         usize,
    pub num_heads:       usize,
    pub num_layers:      usize,
    pub d_ff:            usize,
    pub dropout:         f64,
    pub n_mels:          usize,
    pub max_phonemes:    usize,
    pub max_frames:      usize,
    pub train_max_items: usize,
    pub val_max_items:   usize,
    pub val_fraction:    f64,
    pub lr_step_size:    usize,
    pub lr_gamma:        f64,
    pub lr_step_per:     LrStepPer,
    pub num_workers:     usize,
    pub seed:            u64,
    /// Filled in from the phoneme vocabulary before training
    pub vocab_size:      usize,
    /// Filled in from the phoneme vocabulary before training
    pub pad_id:          u32,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            train_metadata:  "./LJSPEECH/train.txt".to_string(),
            val_metadata:    "./LJSPEECH/val.txt".to_string(),
            mel_dir:         "./LJSPEECH/mel".to_string(),
            duration_dir:    "./LJSPEECH/duration".to_string(),
            mel_stats:       "./mel_min_max.json".to_string(),
            checkpoint_dir:  "checkpoints".to_string(),
            epochs:          200,
            batch_size:      16,
            lr:              1e-4,
            patience:        20,
            d_model:         768,
            num_heads:       12,
            num_layers:      12,
            d_ff:            3072,
            dropout:         0.1,
            n_mels:          80,
            max_phonemes:    256,
            max_frames:      1000,
            train_max_items: 10000,
            val_max_items:   1000,
            val_fraction:    0.1,
            lr_step_size:    10,
            lr_gamma:        0.5,
            lr_step_per:     LrStepPer::Batch,
            num_workers:     4,
            seed:            42,
            vocab_size:      0,
            pad_id:          0,
        }
    }
}

impl TrainConfig {
    pub fn model_config(&self) -> TransformerTtsConfig {
        TransformerTtsConfig::new(
            self.vocab_size, self.pad_id as usize, self.n_mels,
            self.max_phonemes, self.max_frames, self.d_model,
            self.num_heads, self.num_layers, self.d_ff,
        )
        .with_dropout(self.dropout)
    }

    pub fn dataset_source(&self) -> DatasetSource {
        DatasetSource {
            mel_dir:      PathBuf::from(&self.mel_dir),
            duration_dir: PathBuf::from(&self.duration_dir),
            n_mels:       self.n_mels,
            max_phonemes: self.max_phonemes,
            max_frames:   self.max_frames,
        }
    }
}

/// Everything the training loop needs, loaded and validated.
pub struct PreparedRun {
    /// Config with the vocabulary fields filled in
    pub config:      TrainConfig,
    pub train:       TtsDataset,
    pub val:         TtsDataset,
    pub checkpoints: CheckpointManager,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainingSummary> {
        let run = self.prepare()?;

        // ── Step 7: Run training loop (Layer 5) ───────────────────────────────
        run_training(&run.config, run.train, run.val, run.checkpoints)
    }

    /// Steps 1-6: metadata, vocabulary, split, datasets and saved config
    pub fn prepare(&self) -> Result<PreparedRun> {
        let mut cfg = self.config.clone();

        // ── Step 1: Training metadata ─────────────────────────────────────────
        tracing::info!("Reading training metadata from '{}'", cfg.train_metadata);
        let mut train_utts = MetadataLoader::new(&cfg.train_metadata).load_all()?;

        // ── Step 2: Phoneme vocabulary (from the whole training file) ─────────
        let vocab = PhonemeStore::new(&cfg.checkpoint_dir).load_or_build(&train_utts)?;
        cfg.vocab_size = vocab.vocab_size();
        cfg.pad_id     = vocab.pad_id();
        tracing::info!(
            "Vocabulary: {} ids, PAD={}, UNK={}",
            cfg.vocab_size,
            cfg.pad_id,
            vocab.unk_id()
        );

        // ── Step 3: Validation metadata, or hold out part of training ─────────
        let val_loader = MetadataLoader::new(&cfg.val_metadata);
        let mut val_utts = if val_loader.exists() {
            val_loader.load_all()?
        } else {
            tracing::warn!(
                "No validation metadata at '{}', holding out {:.0}% of training utterances",
                cfg.val_metadata,
                cfg.val_fraction * 100.0
            );
            let (train, val) = split_train_val(train_utts, cfg.val_fraction, cfg.seed);
            train_utts = train;
            val
        };
        train_utts.truncate(cfg.train_max_items);
        val_utts.truncate(cfg.val_max_items);

        // ── Step 4: Mel normalisation ─────────────────────────────────────────
        let stats = MelStats::load(Path::new(&cfg.mel_stats))?;

        // ── Step 5: Datasets ──────────────────────────────────────────────────
        let source = cfg.dataset_source();
        let train_dataset = TtsDataset::load(&train_utts, &source, &vocab, stats)?;
        let val_dataset   = TtsDataset::load(&val_utts, &source, &vocab, stats)?;
        tracing::info!(
            "Datasets: {} train, {} validation",
            train_dataset.sample_count(),
            val_dataset.sample_count()
        );
        if let Some(s) = train_dataset.first() {
            tracing::info!(
                "First sample: id={} text={:?} phonemes={:?} frames={} durations={:?}",
                s.id, s.text, s.phoneme_ids, s.num_frames, s.durations
            );
        }

        // ── Step 6: Save config for evaluation ────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt_manager.save_config(&cfg)?;

        Ok(PreparedRun {
            config:      cfg,
            train:       train_dataset,
            val:         val_dataset,
            checkpoints: ckpt_manager,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use std::fs;

    use crate::data::dataset::tests::write_corpus;
    use crate::ml::trainer::{train_loop, PLOT_FILE};

    /// Six two-phoneme utterances on disk, a train.txt listing them,
    /// mel statistics and a small model config pointing at all of it.
    /// No val.txt is written.
    pub(crate) fn corpus_config(root: &Path) -> TrainConfig {
        fn path(p: &Path) -> String {
            p.to_string_lossy().into_owned()
        }

        let ids = ["a", "b", "c", "d", "e", "f"];
        let durations = [2.0f32, 1.0];
        let entries: Vec<(&str, &str, &[f32])> =
            ids.iter().map(|id| (*id, "K AE1", &durations[..])).collect();
        let (utts, source) = write_corpus(root, 4, &entries);

        let lines: Vec<String> = utts
            .iter()
            .map(|u| format!("{}|{}|{{{}}}", u.id, u.text, u.phonemes.join(" ")))
            .collect();
        let train_metadata = root.join("train.txt");
        fs::write(&train_metadata, lines.join("\n")).unwrap();
        let mel_stats = root.join("mel_min_max.json");
        fs::write(&mel_stats, r#"{"mel_min": 0.0, "mel_max": 7.0}"#).unwrap();

        TrainConfig {
            train_metadata:  path(&train_metadata),
            val_metadata:    path(&root.join("val.txt")),
            mel_dir:         path(&source.mel_dir),
            duration_dir:    path(&source.duration_dir),
            mel_stats:       path(&mel_stats),
            checkpoint_dir:  path(&root.join("checkpoints")),
            epochs:          2,
            batch_size:      2,
            lr:              1e-3,
            d_model:         8,
            num_heads:       2,
            num_layers:      1,
            d_ff:            16,
            dropout:         0.0,
            n_mels:          4,
            max_phonemes:    16,
            max_frames:      32,
            num_workers:     1,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_config_json_roundtrip_fills_missing_fields() {
        // Configs written before a field existed still load
        let cfg: TrainConfig = serde_json::from_str(r#"{"epochs": 3, "vocab_size": 70}"#).unwrap();
        assert_eq!(cfg.epochs, 3);
        assert_eq!(cfg.vocab_size, 70);
        assert_eq!(cfg.batch_size, 16);
        assert_eq!(cfg.checkpoint_dir, "checkpoints");
    }

    #[test]
    fn test_model_config_carries_vocabulary() {
        let cfg = TrainConfig { vocab_size: 72, pad_id: 70, ..TrainConfig::default() };
        let m = cfg.model_config();
        assert_eq!(m.vocab_size, 72);
        assert_eq!(m.pad_id, 70);
        assert_eq!(m.d_model, 768);
        assert_eq!(m.dropout, 0.1);
    }

    #[test]
    fn test_prepare_splits_truncates_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            val_fraction:    0.34,
            train_max_items: 3,
            val_max_items:   1,
            ..corpus_config(dir.path())
        };

        // 6 utterances, 2 held out, then capped to 3 + 1
        let run = TrainUseCase::new(cfg).prepare().unwrap();
        assert_eq!(run.train.sample_count(), 3);
        assert_eq!(run.val.sample_count(), 1);

        // K, AE1, PAD, UNK
        assert_eq!(run.config.vocab_size, 4);
        assert_eq!(run.config.pad_id, 2);

        let ckpt_dir = run.checkpoints.dir();
        assert!(ckpt_dir.join("phonemes.json").is_file());
        let saved: TrainConfig =
            serde_json::from_str(&fs::read_to_string(ckpt_dir.join("train_config.json")).unwrap()).unwrap();
        assert_eq!(saved.vocab_size, 4);
        assert_eq!(saved.train_max_items, 3);
    }

    #[test]
    fn test_prepare_uses_validation_file_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = corpus_config(dir.path());
        fs::write(&cfg.val_metadata, "a|text a|{K AE1}\nb|text b|{K AE1}\n").unwrap();

        let run = TrainUseCase::new(cfg).prepare().unwrap();
        assert_eq!(run.train.sample_count(), 6);
        assert_eq!(run.val.sample_count(), 2);
    }

    /// In-memory log sink for a scoped subscriber
    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_first_sample_logged_at_default_level() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = corpus_config(dir.path());

        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("tts_trainer=info"))
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            TrainUseCase::new(cfg).prepare().unwrap();
        });

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("First sample: id="));
    }

    #[test]
    fn test_prepare_fails_without_training_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            train_metadata: dir.path().join("missing.txt").to_string_lossy().into_owned(),
            ..corpus_config(dir.path())
        };
        assert!(TrainUseCase::new(cfg).prepare().is_err());
    }

    #[test]
    fn test_prepared_run_trains() {
        let dir = tempfile::tempdir().unwrap();
        let run = TrainUseCase::new(corpus_config(dir.path())).prepare().unwrap();
        let ckpt_dir = run.checkpoints.dir().to_path_buf();

        let summary = train_loop::<Autodiff<NdArray>>(
            &run.config, run.train, run.val, run.checkpoints, Default::default(),
        )
        .unwrap();

        assert_eq!(summary.epochs_run, 2);
        assert!(ckpt_dir.join(PLOT_FILE).is_file());
        assert!(ckpt_dir.join("latest_checkpoint.json").is_file());
    }
}
