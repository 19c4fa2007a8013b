// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer reads metadata through this trait, so
// the LJSpeech pipe-separated reader can be swapped for another
// corpus format without touching the training workflow.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::utterance::UtteranceMeta;

// ─── MetadataSource ───────────────────────────────────────────────────────────
/// Any component that can list the utterances of a corpus split.
///
/// Implementations:
///   - MetadataLoader → pipe-separated LJSpeech metadata file
pub trait MetadataSource {
    /// Load every utterance described by this source, in file order.
    fn load_all(&self) -> Result<Vec<UtteranceMeta>>;
}
