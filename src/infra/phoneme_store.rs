// ============================================================
// Layer 6 — Phoneme Vocabulary Store
// ============================================================
// Builds the phoneme → id table from the training metadata and
// persists it as a HuggingFace WordLevel tokenizer so training
// and evaluation always share one vocabulary.
//
// Numbering:
//   distinct phonemes, sorted   → 0 .. n-1
//   "PAD"                       → n
//   "UNK"                       → n + 1
//
// The tokenizer uses a WhitespaceSplit pre-tokenizer and no
// normaliser: phoneme symbols are case-sensitive ("AH0" vs "ah").
//
// File: {checkpoint_dir}/phonemes.json

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tokenizers::Tokenizer;

use crate::domain::utterance::UtteranceMeta;

pub const PAD_TOKEN: &str = "PAD";
pub const UNK_TOKEN: &str = "UNK";

const VOCAB_FILE: &str = "phonemes.json";

/// The phoneme vocabulary used to turn phoneme symbols into ids.
pub struct PhonemeVocab {
    tokenizer: Tokenizer,
    pad_id:    u32,
    unk_id:    u32,
}

impl PhonemeVocab {
    fn from_tokenizer(tokenizer: Tokenizer) -> Result<Self> {
        let pad_id = tokenizer
            .token_to_id(PAD_TOKEN)
            .with_context(|| format!("Phoneme vocabulary has no '{PAD_TOKEN}' entry"))?;
        let unk_id = tokenizer
            .token_to_id(UNK_TOKEN)
            .with_context(|| format!("Phoneme vocabulary has no '{UNK_TOKEN}' entry"))?;
        Ok(Self { tokenizer, pad_id, unk_id })
    }

    /// Map phoneme symbols to ids; unknown symbols become UNK.
    pub fn encode(&self, phonemes: &[String]) -> Result<Vec<u32>> {
        if phonemes.is_empty() {
            return Ok(Vec::new());
        }
        let enc = self
            .tokenizer
            .encode(phonemes.join(" "), false)
            .map_err(|e| anyhow::anyhow!("Phoneme encoding error: {e}"))?;
        Ok(enc.get_ids().to_vec())
    }

    pub fn pad_id(&self) -> u32 {
        self.pad_id
    }

    pub fn unk_id(&self) -> u32 {
        self.unk_id
    }

    /// Number of ids including PAD and UNK (the embedding table size)
    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }
}

pub struct PhonemeStore {
    dir: PathBuf,
}

impl PhonemeStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join(VOCAB_FILE)
    }

    /// Load an existing vocabulary or build one from the training utterances
    pub fn load_or_build(&self, utterances: &[UtteranceMeta]) -> Result<PhonemeVocab> {
        if self.path().exists() {
            tracing::info!("Loading existing phoneme vocabulary from '{}'", self.path().display());
            self.load()
        } else {
            tracing::info!("Building phoneme vocabulary from {} utterances", utterances.len());
            self.build_and_save(utterances)
        }
    }

    /// Load a previously saved vocabulary
    pub fn load(&self) -> Result<PhonemeVocab> {
        let path = self.path();
        let tokenizer = Tokenizer::from_file(&path).map_err(|e| {
            anyhow::anyhow!("Cannot load phoneme vocabulary from '{}': {}", path.display(), e)
        })?;
        PhonemeVocab::from_tokenizer(tokenizer)
    }

    fn build_and_save(&self, utterances: &[UtteranceMeta]) -> Result<PhonemeVocab> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        // ── Step 1: Distinct phonemes in sorted order ─────────────────────────
        let phonemes: BTreeSet<&str> = utterances
            .iter()
            .flat_map(|u| u.phonemes.iter().map(String::as_str))
            .collect();

        // ── Step 2: Build vocab JSON ──────────────────────────────────────────
        let mut vocab = serde_json::Map::new();
        for (id, phoneme) in phonemes.iter().enumerate() {
            vocab.insert(phoneme.to_string(), serde_json::json!(id));
        }
        let n = phonemes.len();
        vocab.insert(PAD_TOKEN.to_string(), serde_json::json!(n));
        vocab.insert(UNK_TOKEN.to_string(), serde_json::json!(n + 1));

        // ── Step 3: Write tokenizer JSON in HuggingFace format ────────────────
        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": null,
            "pre_tokenizer": {
                "type": "WhitespaceSplit"
            },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": UNK_TOKEN
            }
        });

        let path = self.path();
        std::fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write phoneme vocabulary '{}'", path.display()))?;

        tracing::info!(
            "Phoneme vocabulary built with {} phonemes (+PAD, UNK), saved to '{}'",
            n,
            path.display()
        );

        self.load()
    }
}
