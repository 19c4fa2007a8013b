// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Used only when the corpus has no separate validation metadata
// file: the training utterances are shuffled with a fixed seed
// and the tail becomes the validation set, so repeated runs with
// the same seed see the same split. Neither side is left empty
// when there are at least two items.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `items` with `seed` and split off `val_fraction` of them.
/// Returns (train, validation).
pub fn split_train_val<T>(mut items: Vec<T>, val_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);

    let total = items.len();
    let n_val = ((total as f64) * val_fraction.clamp(0.0, 1.0)).round() as usize;
    // Both sides keep at least one item whenever there are two to share;
    // a lone item stays in training
    let n_val = if total >= 2 { n_val.clamp(1, total - 1) } else { 0 };
    let val   = items.split_off(total - n_val);

    tracing::debug!(
        "Dataset split: {} training, {} validation",
        items.len(),
        val.len(),
    );

    (items, val)
}
