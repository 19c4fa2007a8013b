// ============================================================
// Layer 5 — Learning-Rate Schedule
// ============================================================
// Step decay: the learning rate is multiplied by `gamma` every
// `step_size` steps. A step is one optimizer update by default,
// or one epoch with `--lr-step-per epoch`.

use serde::{Deserialize, Serialize};

/// What counts as one scheduler step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LrStepPer {
    /// After every optimizer update
    #[default]
    Batch,
    /// After every completed epoch
    Epoch,
}

/// Multiplies the learning rate by `gamma` every `step_size` steps:
/// `lr = base_lr * gamma^(step / step_size)`.
#[derive(Debug, Clone)]
pub struct StepLr {
    base_lr:      f64,
    step_size:    usize,
    gamma:        f64,
    current_step: usize,
}

impl StepLr {
    pub fn new(base_lr: f64, step_size: usize, gamma: f64) -> Self {
        Self {
            base_lr,
            // a zero step size would divide by zero; treat it as "decay every step"
            step_size: step_size.max(1),
            gamma,
            current_step: 0,
        }
    }

    /// Learning rate for the current step
    pub fn lr(&self) -> f64 {
        let decays = (self.current_step / self.step_size) as i32;
        self.base_lr * self.gamma.powi(decays)
    }

    pub fn step(&mut self) {
        self.current_step += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halves_every_step_size() {
        let mut s = StepLr::new(1e-4, 10, 0.5);
        for _ in 0..9 {
            s.step();
        }
        assert_eq!(s.lr(), 1e-4);
        s.step();
        assert!((s.lr() - 5e-5).abs() < 1e-12);
        for _ in 0..10 {
            s.step();
        }
        assert!((s.lr() - 2.5e-5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_step_size_does_not_panic() {
        let mut s = StepLr::new(1.0, 0, 0.5);
        s.step();
        assert_eq!(s.lr(), 0.5);
    }

    #[test]
    fn test_step_per_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&LrStepPer::Batch).unwrap(), r#""batch""#);
        let parsed: LrStepPer = serde_json::from_str(r#""epoch""#).unwrap();
        assert_eq!(parsed, LrStepPer::Epoch);
        assert_eq!(LrStepPer::default(), LrStepPer::Batch);
    }
}
