// ============================================================
// Layer 6 — Mel Normalisation Statistics
// ============================================================
// Corpus-wide mel minimum and maximum, computed offline and stored
// as JSON:
//
//   { "mel_min": -11.51, "mel_max": 2.34 }
//
// Every mel value is min-max scaled into [0, 1] before training.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MelStats {
    pub mel_min: f32,
    pub mel_max: f32,
}

impl MelStats {
    pub fn new(mel_min: f32, mel_max: f32) -> Result<Self> {
        if !(mel_max > mel_min) {
            bail!("mel_max ({mel_max}) must be greater than mel_min ({mel_min})");
        }
        Ok(Self { mel_min, mel_max })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read mel statistics '{}'", path.display()))?;
        let stats: MelStats = serde_json::from_str(&json)
            .with_context(|| format!("Cannot parse mel statistics '{}'", path.display()))?;
        Self::new(stats.mel_min, stats.mel_max)
    }

    pub fn normalize(&self, x: f32) -> f32 {
        (x - self.mel_min) / (self.mel_max - self.mel_min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_range() {
        let s = MelStats::new(-4.0, 4.0).unwrap();
        assert_eq!(s.normalize(-4.0), 0.0);
        assert_eq!(s.normalize(0.0), 0.5);
        assert_eq!(s.normalize(4.0), 1.0);
    }

    #[test]
    fn test_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mel_min_max.json");
        fs::write(&path, r#"{"mel_min": -11.5, "mel_max": 2.0}"#).unwrap();
        assert_eq!(MelStats::load(&path).unwrap(), MelStats { mel_min: -11.5, mel_max: 2.0 });
    }

    #[test]
    fn test_degenerate_range_rejected() {
        assert!(MelStats::new(1.0, 1.0).is_err());
        assert!(MelStats::new(2.0, 1.0).is_err());
    }
}
