// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal
// (training a model, or scoring a trained one).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination

// The training workflow
pub mod train_use_case;

// Checkpoint evaluation workflow
pub mod evaluate_use_case;
