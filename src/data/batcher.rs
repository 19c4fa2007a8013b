// ============================================================
// Layer 4 — TTS Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<TtsSample>
// into padded tensors.
//
// Utterances differ in length, so every field is padded to the
// longest item of the batch:
//
//   phonemes  [batch, max_phonemes]          padded with PAD id
//   mel       [batch, max_frames, n_mels]    padded with 0.0
//   durations [batch, max_phonemes]          padded with 0.0
//
// A padded phoneme has duration 0, so it never receives frames
// in the length regulator.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::TtsSample;

// ─── TtsBatch ─────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TtsBatch<B: Backend> {
    /// Phoneme ids — shape: [batch_size, max_phonemes]
    pub phonemes: Tensor<B, 2, Int>,

    /// Normalised target mel frames — shape: [batch_size, max_frames, n_mels]
    pub mel: Tensor<B, 3>,

    /// Ground truth frames per phoneme — shape: [batch_size, max_phonemes]
    pub durations: Tensor<B, 2>,

    /// Transcripts, for logging only
    pub texts: Vec<String>,
}

// ─── TtsBatcher ───────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct TtsBatcher<B: Backend> {
    pub device: B::Device,
    pub pad_id: u32,
    pub n_mels: usize,
}

impl<B: Backend> TtsBatcher<B> {
    pub fn new(device: B::Device, pad_id: u32, n_mels: usize) -> Self {
        Self { device, pad_id, n_mels }
    }
}

impl<B: Backend> Batcher<TtsSample, TtsBatch<B>> for TtsBatcher<B> {
    fn batch(&self, items: Vec<TtsSample>) -> TtsBatch<B> {
        let batch_size   = items.len();
        let max_phonemes = items.iter().map(|s| s.num_phonemes()).max().unwrap_or(0).max(1);
        let max_frames   = items.iter().map(|s| s.num_frames).max().unwrap_or(0).max(1);
        let n_mels       = self.n_mels;

        // ── Pad into flat buffers ─────────────────────────────────────────────
        let mut phonemes  = vec![self.pad_id as i32; batch_size * max_phonemes];
        let mut durations = vec![0.0f32; batch_size * max_phonemes];
        let mut mel       = vec![0.0f32; batch_size * max_frames * n_mels];

        for (b, s) in items.iter().enumerate() {
            let p0 = b * max_phonemes;
            for (i, &id) in s.phoneme_ids.iter().enumerate() {
                phonemes[p0 + i] = id as i32;
            }
            durations[p0..p0 + s.durations.len()].copy_from_slice(&s.durations);

            let m0 = b * max_frames * n_mels;
            mel[m0..m0 + s.mel.len()].copy_from_slice(&s.mel);
        }

        // ── Create tensors ────────────────────────────────────────────────────
        let phonemes = Tensor::<B, 1, Int>::from_ints(phonemes.as_slice(), &self.device)
            .reshape([batch_size, max_phonemes]);

        let durations = Tensor::<B, 1>::from_floats(durations.as_slice(), &self.device)
            .reshape([batch_size, max_phonemes]);

        let mel = Tensor::<B, 1>::from_floats(mel.as_slice(), &self.device)
            .reshape([batch_size, max_frames, n_mels]);

        TtsBatch {
            phonemes,
            mel,
            durations,
            texts: items.into_iter().map(|s| s.text).collect(),
        }
    }
}
