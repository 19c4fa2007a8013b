// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All model and optimisation code. Burn types appear in the data
// and infra layers only where they hand tensors or records across.
//
//   model.rs          — TransformerTts: phoneme encoder, duration
//                       predictor, length regulator, mel decoder
//
//   loss.rs           — 0.5·MSE + 0.5·L1 on mels, 2·MSE on durations
//
//   scheduler.rs      — step learning-rate decay
//
//   early_stopping.rs — patience on the validation loss
//
//   trainer.rs        — the epoch loop: train, validate, checkpoint,
//                       metrics, loss plot
//
//   evaluator.rs      — reloads the best checkpoint and scores a
//                       dataset
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Ren et al. (2019) FastSpeech

/// Transformer text-to-spectrogram model
pub mod model;

/// Combined spectrogram + duration objective
pub mod loss;

/// Step learning-rate schedule
pub mod scheduler;

/// Validation-loss early stopping
pub mod early_stopping;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Checkpoint evaluation on a dataset
pub mod evaluator;
