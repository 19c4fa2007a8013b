// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `evaluate`, and all
// their configurable flags. Defaults match an LJSpeech layout:
//
//   LJSPEECH/train.txt   LJSPEECH/val.txt
//   LJSPEECH/mel/<id>.npy
//   LJSPEECH/duration/<id>.npy
//   mel_min_max.json
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use crate::application::train_use_case::TrainConfig;
use crate::ml::scheduler::LrStepPer;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the TTS model
    Train(TrainArgs),

    /// Score the best checkpoint of a finished run
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Training metadata file (id|text|{phonemes})
    #[arg(long, default_value = "./LJSPEECH/train.txt")]
    pub train_metadata: String,

    /// Validation metadata file; if missing, part of the training set is held out
    #[arg(long, default_value = "./LJSPEECH/val.txt")]
    pub val_metadata: String,

    /// Directory of <id>.npy mel spectrograms
    #[arg(long, default_value = "./LJSPEECH/mel")]
    pub mel_dir: String,

    /// Directory of <id>.npy phoneme durations
    #[arg(long, default_value = "./LJSPEECH/duration")]
    pub duration_dir: String,

    /// JSON file with "mel_min" and "mel_max"
    #[arg(long, default_value = "./mel_min_max.json")]
    pub mel_stats: String,

    /// Directory for checkpoints, vocabulary, metrics and the loss plot
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Maximum number of epochs
    #[arg(long, default_value_t = 200)]
    pub epochs: usize,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    /// Initial Adam learning rate
    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    /// Epochs without validation improvement before stopping
    #[arg(long, default_value_t = 20)]
    pub patience: usize,

    /// Embedding / hidden dimension
    #[arg(long, default_value_t = 768)]
    pub d_model: usize,

    /// Attention heads; d_model must be divisible by this
    #[arg(long, default_value_t = 12)]
    pub num_heads: usize,

    /// Layers in each of the encoder and the decoder
    #[arg(long, default_value_t = 12)]
    pub num_layers: usize,

    /// Feed-forward inner dimension
    #[arg(long, default_value_t = 3072)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Mel bands per frame
    #[arg(long, default_value_t = 80)]
    pub n_mels: usize,

    /// Longer utterances are skipped
    #[arg(long, default_value_t = 256)]
    pub max_phonemes: usize,

    /// Longer utterances are skipped
    #[arg(long, default_value_t = 1000)]
    pub max_frames: usize,

    /// Use at most this many training utterances
    #[arg(long, default_value_t = 10000)]
    pub train_max_items: usize,

    /// Use at most this many validation utterances
    #[arg(long, default_value_t = 1000)]
    pub val_max_items: usize,

    /// Held-out fraction when there is no validation metadata
    #[arg(long, default_value_t = 0.1)]
    pub val_fraction: f64,

    /// Scheduler steps between learning-rate decays
    #[arg(long, default_value_t = 10)]
    pub lr_step_size: usize,

    /// Whether a scheduler step is one batch or one epoch
    #[arg(long, value_enum, default_value_t = LrStepPer::Batch)]
    pub lr_step_per: LrStepPer,

    /// Learning-rate decay factor
    #[arg(long, default_value_t = 0.5)]
    pub lr_gamma: f64,

    /// Data loader worker threads
    #[arg(long, default_value_t = 4)]
    pub num_workers: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            train_metadata:  a.train_metadata,
            val_metadata:    a.val_metadata,
            mel_dir:         a.mel_dir,
            duration_dir:    a.duration_dir,
            mel_stats:       a.mel_stats,
            checkpoint_dir:  a.checkpoint_dir,
            epochs:          a.epochs,
            batch_size:      a.batch_size,
            lr:              a.lr,
            patience:        a.patience,
            d_model:         a.d_model,
            num_heads:       a.num_heads,
            num_layers:      a.num_layers,
            d_ff:            a.d_ff,
            dropout:         a.dropout,
            n_mels:          a.n_mels,
            max_phonemes:    a.max_phonemes,
            max_frames:      a.max_frames,
            train_max_items: a.train_max_items,
            val_max_items:   a.val_max_items,
            val_fraction:    a.val_fraction,
            lr_step_size:    a.lr_step_size,
            lr_step_per:     a.lr_step_per,
            lr_gamma:        a.lr_gamma,
            num_workers:     a.num_workers,
            seed:            a.seed,
            ..TrainConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Metadata to evaluate on (defaults to the run's validation metadata)
    #[arg(long)]
    pub metadata: Option<String>,

    /// Use at most this many utterances
    #[arg(long)]
    pub max_items: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults_match_config_defaults() {
        let cli = Cli::try_parse_from(["tts-trainer", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        let defaults = TrainConfig::default();
        assert_eq!(cfg.epochs, defaults.epochs);
        assert_eq!(cfg.batch_size, defaults.batch_size);
        assert_eq!(cfg.lr, defaults.lr);
        assert_eq!(cfg.patience, defaults.patience);
        assert_eq!(cfg.train_metadata, defaults.train_metadata);
        assert_eq!(cfg.d_ff, defaults.d_ff);
        assert_eq!(cfg.val_fraction, defaults.val_fraction);
        assert_eq!(cfg.lr_step_per, LrStepPer::Batch);
    }

    #[test]
    fn test_lr_step_per_epoch_flag() {
        let cli = Cli::try_parse_from(["tts-trainer", "train", "--lr-step-per", "epoch"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        assert_eq!(args.lr_step_per, LrStepPer::Epoch);
        assert!(Cli::try_parse_from(["tts-trainer", "train", "--lr-step-per", "step"]).is_err());
    }

    #[test]
    fn test_evaluate_optional_flags() {
        let cli = Cli::try_parse_from([
            "tts-trainer", "evaluate", "--metadata", "val2.txt", "--max-items", "5",
        ])
        .unwrap();
        let Commands::Evaluate(args) = cli.command else { panic!("expected evaluate") };
        assert_eq!(args.metadata.as_deref(), Some("val2.txt"));
        assert_eq!(args.max_items, Some(5));
        assert_eq!(args.checkpoint_dir, "checkpoints");
    }
}
