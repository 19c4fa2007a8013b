use anyhow::{bail, ensure, Result};
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::npy::read_npy;
use crate::domain::utterance::UtteranceMeta;
use crate::infra::mel_stats::MelStats;
use crate::infra::phoneme_store::PhonemeVocab;

/// One utterance ready for batching.
/// `mel` is row-major [num_frames, n_mels], already min-max normalised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsSample {
    pub id:          String,
    pub text:        String,
    pub phoneme_ids: Vec<u32>,
    pub mel:         Vec<f32>,
    pub num_frames:  usize,
    pub durations:   Vec<f32>,
}

impl TtsSample {
    pub fn num_phonemes(&self) -> usize {
        self.phoneme_ids.len()
    }

    /// Sum of durations in frames; normally equals num_frames
    pub fn total_duration(&self) -> f32 {
        self.durations.iter().sum()
    }
}

/// Where the per-utterance feature files live and which ones to keep.
#[derive(Debug, Clone)]
pub struct DatasetSource {
    pub mel_dir:      PathBuf,
    pub duration_dir: PathBuf,
    pub n_mels:       usize,
    pub max_phonemes: usize,
    pub max_frames:   usize,
}

pub struct TtsDataset {
    samples: Vec<TtsSample>,
}

impl TtsDataset {
    /// Load features for every utterance, skipping the ones that cannot
    /// be used. Fails only if nothing usable remains.
    pub fn load(
        utterances: &[UtteranceMeta],
        source:     &DatasetSource,
        vocab:      &PhonemeVocab,
        stats:      MelStats,
    ) -> Result<Self> {
        let mut samples = Vec::with_capacity(utterances.len());
        let mut skipped = 0usize;

        for utt in utterances {
            match load_sample(utt, source, vocab, stats) {
                Ok(sample) => samples.push(sample),
                Err(e) => {
                    skipped += 1;
                    tracing::warn!("Skipping utterance '{}': {:#}", utt.id, e);
                }
            }
        }

        if samples.is_empty() {
            bail!(
                "No usable utterances ({} listed, {} skipped) in '{}'",
                utterances.len(),
                skipped,
                source.mel_dir.display()
            );
        }

        tracing::info!("Loaded {} utterances ({} skipped)", samples.len(), skipped);
        Ok(Self { samples })
    }

    pub fn sample_count(&self) -> usize { self.samples.len() }

    pub fn first(&self) -> Option<&TtsSample> { self.samples.first() }
}

impl Dataset<TtsSample> for TtsDataset {
    fn get(&self, index: usize) -> Option<TtsSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

fn load_sample(
    utt:    &UtteranceMeta,
    source: &DatasetSource,
    vocab:  &PhonemeVocab,
    stats:  MelStats,
) -> Result<TtsSample> {
    let phoneme_ids = vocab.encode(&utt.phonemes)?;
    ensure!(!phoneme_ids.is_empty(), "no phonemes");
    ensure!(
        phoneme_ids.len() <= source.max_phonemes,
        "{} phonemes exceeds the limit of {}",
        phoneme_ids.len(),
        source.max_phonemes
    );

    let (mel, num_frames) = load_mel(&feature_path(&source.mel_dir, &utt.id), source.n_mels)?;
    ensure!(num_frames > 0, "empty mel spectrogram");
    ensure!(
        num_frames <= source.max_frames,
        "{} frames exceeds the limit of {}",
        num_frames,
        source.max_frames
    );

    let durations = read_npy(&feature_path(&source.duration_dir, &utt.id))?.data;
    ensure!(
        durations.len() == phoneme_ids.len(),
        "{} durations for {} phonemes",
        durations.len(),
        phoneme_ids.len()
    );

    let sample = TtsSample {
        id:   utt.id.clone(),
        text: utt.text.clone(),
        phoneme_ids,
        mel:  mel.into_iter().map(|x| stats.normalize(x)).collect(),
        num_frames,
        durations,
    };

    // Frames past the total duration are still trained as decoder targets
    if sample.total_duration() as usize != num_frames {
        tracing::debug!(
            "'{}': durations sum to {} but the mel has {} frames",
            sample.id,
            sample.total_duration(),
            num_frames
        );
    }
    Ok(sample)
}

fn feature_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{id}.npy"))
}

/// Read a mel spectrogram as row-major [frames, n_mels].
/// A channel-first [n_mels, frames] array is transposed.
fn load_mel(path: &Path, n_mels: usize) -> Result<(Vec<f32>, usize)> {
    let arr = read_npy(path)?;
    match arr.shape.as_slice() {
        [_, m] if *m == n_mels => {
            let frames = arr.shape[0];
            Ok((arr.data, frames))
        }
        [m, frames] if *m == n_mels => {
            let frames = *frames;
            let mut out = vec![0.0f32; frames * n_mels];
            for c in 0..n_mels {
                for t in 0..frames {
                    out[t * n_mels + c] = arr.data[c * frames + t];
                }
            }
            Ok((out, frames))
        }
        other => bail!("mel shape {:?} does not have {} mel bands", other, n_mels),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::npy::encode_f32;
    use crate::infra::phoneme_store::PhonemeStore;
    use std::fs;

    /// Lay out an LJSpeech-style corpus: mel/<id>.npy, duration/<id>.npy.
    /// Each entry is (id, phonemes, durations); mel frames = sum(durations).
    pub(crate) fn write_corpus(
        root:    &Path,
        n_mels:  usize,
        entries: &[(&str, &str, &[f32])],
    ) -> (Vec<UtteranceMeta>, DatasetSource) {
        let mel_dir = root.join("mel");
        let duration_dir = root.join("duration");
        fs::create_dir_all(&mel_dir).unwrap();
        fs::create_dir_all(&duration_dir).unwrap();

        let mut utterances = Vec::new();
        for (id, phonemes, durations) in entries {
            let frames = durations.iter().sum::<f32>() as usize;
            let mel: Vec<f32> = (0..frames * n_mels).map(|i| (i % 7) as f32).collect();
            fs::write(mel_dir.join(format!("{id}.npy")), encode_f32(&[frames, n_mels], &mel)).unwrap();
            fs::write(
                duration_dir.join(format!("{id}.npy")),
                encode_f32(&[durations.len()], durations),
            )
            .unwrap();
            utterances.push(UtteranceMeta::parse_line(&format!("{id}|text {id}|{{{phonemes}}}")).unwrap());
        }

        let source = DatasetSource {
            mel_dir,
            duration_dir,
            n_mels,
            max_phonemes: 64,
            max_frames:   256,
        };
        (utterances, source)
    }

    #[test]
    fn test_load_normalises_and_skips_bad_entries() {
        let dir = tempfile::tempdir().unwrap();
        let (mut utts, source) = write_corpus(
            dir.path(),
            4,
            &[("a", "A B", &[2.0, 1.0]), ("b", "B", &[3.0])],
        );
        // Listed but no feature files on disk
        utts.push(UtteranceMeta::parse_line("ghost|x|{A}").unwrap());
        // Duration count mismatch
        fs::write(source.duration_dir.join("b.npy"), encode_f32(&[2], &[1.0, 2.0])).unwrap();

        let vocab = PhonemeStore::new(dir.path()).load_or_build(&utts).unwrap();
        let stats = MelStats::new(0.0, 10.0).unwrap();
        let ds = TtsDataset::load(&utts, &source, &vocab, stats).unwrap();

        assert_eq!(ds.len(), 1);
        let s = ds.get(0).unwrap();
        assert_eq!(s.id, "a");
        assert_eq!(s.num_frames, 3);
        assert_eq!(s.mel.len(), 3 * 4);
        assert!((s.mel[1] - 0.1).abs() < 1e-6);
        assert_eq!(s.total_duration(), 3.0);
    }

    #[test]
    fn test_channel_first_mel_is_transposed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.npy");
        // [n_mels = 2, frames = 3]
        fs::write(&path, encode_f32(&[2, 3], &[1.0, 2.0, 3.0, 10.0, 20.0, 30.0])).unwrap();
        let (mel, frames) = load_mel(&path, 2).unwrap();
        assert_eq!(frames, 3);
        assert_eq!(mel, vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0]);
    }

    #[test]
    fn test_too_long_utterance_skipped_and_empty_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let (utts, mut source) = write_corpus(dir.path(), 2, &[("a", "A", &[5.0])]);
        source.max_frames = 4;
        let vocab = PhonemeStore::new(dir.path()).load_or_build(&utts).unwrap();
        let stats = MelStats::new(0.0, 1.0).unwrap();
        assert!(TtsDataset::load(&utts, &source, &vocab, stats).is_err());
    }
}
