// ============================================================
// Layer 3 — Utterance Domain Type
// ============================================================
// Represents one entry of an LJSpeech-style metadata file:
//
//   LJ001-0001|Printing, in the only sense...|{P R IH1 N T IH0 NG ...}
//
// Field 0 is the utterance id (also the stem of its .npy files),
// field 1 the transcript, field 2 the phoneme sequence. The phoneme
// field may be wrapped in braces and is whitespace-separated.
//
// Reference: Rust Book §5 (Structs and Methods)

use serde::{Deserialize, Serialize};

/// A single utterance described by the corpus metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtteranceMeta {
    /// Utterance id, e.g. "LJ001-0001"
    pub id: String,

    /// The original transcript, carried through for logging
    pub text: String,

    /// Phoneme symbols in order, e.g. ["P", "R", "IH1"]
    pub phonemes: Vec<String>,
}

impl UtteranceMeta {
    pub fn new(id: impl Into<String>, text: impl Into<String>, phonemes: Vec<String>) -> Self {
        Self {
            id:       id.into(),
            text:     text.into(),
            phonemes,
        }
    }

    /// Parse one `id|text|{phonemes}` line.
    /// Returns None for blank lines or lines with fewer than three fields.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let mut fields = line.split('|');
        let id       = fields.next()?.trim();
        let text     = fields.next()?.trim();
        let phonemes = fields.next()?.trim();

        if id.is_empty() {
            return None;
        }

        // "{P R IH1}" → "P R IH1"
        let phonemes = phonemes
            .trim_start_matches('{')
            .trim_end_matches('}')
            .split_whitespace()
            .map(str::to_string)
            .collect();

        Some(Self::new(id, text, phonemes))
    }
}
