// ============================================================
// Layer 4 — Metadata Loader
// ============================================================
// Reads an LJSpeech-style metadata file (train.txt / val.txt):
//
//   id|transcript|{phonemes}
//
// one utterance per line. Lines that cannot be parsed are skipped
// with a warning so a single bad row does not abort training.
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::domain::traits::MetadataSource;
use crate::domain::utterance::UtteranceMeta;

/// Loads utterance metadata from a pipe-separated text file.
/// Implements the MetadataSource trait from Layer 3.
pub struct MetadataLoader {
    /// Path to the metadata file
    path: PathBuf,

    /// Keep at most this many utterances (first N in file order)
    max_items: Option<usize>,
}

impl MetadataLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), max_items: None }
    }

    /// Limit the number of utterances returned by load_all()
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

impl MetadataSource for MetadataLoader {
    fn load_all(&self) -> Result<Vec<UtteranceMeta>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read metadata file '{}'", self.path.display()))?;

        let limit = self.max_items.unwrap_or(usize::MAX);
        let mut utterances = Vec::new();

        for (line_no, line) in content.lines().enumerate() {
            if utterances.len() >= limit {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            match UtteranceMeta::parse_line(line) {
                Some(u) => utterances.push(u),
                None => tracing::warn!(
                    "Skipping malformed metadata line {} in '{}'",
                    line_no + 1,
                    self.path.display()
                ),
            }
        }

        tracing::debug!(
            "Loaded {} utterances from '{}'",
            utterances.len(),
            self.path.display()
        );
        Ok(utterances)
    }
}
