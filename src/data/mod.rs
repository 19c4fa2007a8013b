// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from metadata files to padded tensor batches:
//
//   train.txt / val.txt
//       │
//       ▼
//   MetadataLoader    → id | text | {phonemes}
//       │
//       ▼
//   PhonemeVocab      → phoneme ids (Layer 6)
//       │
//       ▼
//   TtsDataset        → reads mel/<id>.npy and duration/<id>.npy,
//       │               implements Burn's Dataset trait
//       ▼
//   TtsBatcher        → pads and stacks into tensors
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads pipe-separated utterance metadata
pub mod loader;

/// Minimal NumPy .npy decoder for mel and duration files
pub mod npy;

/// Implements Burn's Dataset trait for TTS samples
pub mod dataset;

/// Implements Burn's Batcher trait with per-batch padding
pub mod batcher;

/// Shuffles and splits utterances into train/validation sets
pub mod splitter;
