// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the checkpoint directory:
//
//   checkpoint.rs    — best-model checkpoints (Burn CompactRecorder),
//                      the latest-checkpoint pointer and the saved
//                      TrainConfig used to rebuild the model.
//
//   phoneme_store.rs — phoneme vocabulary, persisted as a WordLevel
//                      tokenizer JSON shared by train and evaluate.
//
//   mel_stats.rs     — mel min/max JSON used for normalisation.
//
//   metrics.rs       — per-epoch CSV log.
//
//   plot.rs          — loss_plot.png, redrawn every epoch.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Phoneme vocabulary building, saving, and loading
pub mod phoneme_store;

/// Mel normalisation statistics
pub mod mel_stats;

/// Training metrics CSV logger
pub mod metrics;

/// Loss curve PNG renderer
pub mod plot;
