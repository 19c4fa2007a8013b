// ============================================================
// Layer 5 — Early Stopping
// ============================================================
// Watches the validation loss once per epoch. Only a strictly
// lower loss counts as an improvement; training stops after
// `patience` consecutive epochs without one.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochOutcome {
    /// New best validation loss: save a checkpoint
    Improved,
    /// No improvement, patience not exhausted yet
    NoImprovement,
    /// Patience exhausted: stop training
    Stop,
}

#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience:      usize,
    counter:       usize,
    best_val_loss: f64,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self { patience, counter: 0, best_val_loss: f64::INFINITY }
    }

    pub fn observe(&mut self, val_loss: f64) -> EpochOutcome {
        if val_loss < self.best_val_loss {
            self.best_val_loss = val_loss;
            self.counter = 0;
            return EpochOutcome::Improved;
        }

        self.counter += 1;
        if self.counter >= self.patience {
            EpochOutcome::Stop
        } else {
            EpochOutcome::NoImprovement
        }
    }

    pub fn best_val_loss(&self) -> f64 {
        self.best_val_loss
    }

    pub fn epochs_without_improvement(&self) -> usize {
        self.counter
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_improvement_resets_counter() {
        let mut es = EarlyStopping::new(3);
        assert_eq!(es.observe(2.0), EpochOutcome::Improved);
        assert_eq!(es.observe(2.5), EpochOutcome::NoImprovement);
        assert_eq!(es.epochs_without_improvement(), 1);
        assert_eq!(es.observe(1.5), EpochOutcome::Improved);
        assert_eq!(es.epochs_without_improvement(), 0);
        assert_eq!(es.best_val_loss(), 1.5);
    }

    #[test]
    fn test_equal_loss_is_not_improvement() {
        let mut es = EarlyStopping::new(5);
        es.observe(1.0);
        assert_eq!(es.observe(1.0), EpochOutcome::NoImprovement);
    }

    #[test]
    fn test_stops_exactly_at_patience() {
        let mut es = EarlyStopping::new(2);
        es.observe(1.0);
        assert_eq!(es.observe(1.1), EpochOutcome::NoImprovement);
        assert_eq!(es.observe(1.2), EpochOutcome::Stop);
    }

    #[test]
    fn test_nan_never_improves() {
        let mut es = EarlyStopping::new(1);
        assert_eq!(es.observe(f64::NAN), EpochOutcome::Stop);
    }
}
