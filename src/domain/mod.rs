// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits describing the corpus.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// One line of corpus metadata (id, transcript, phonemes)
pub mod utterance;

// Core abstractions (traits) that other layers implement
pub mod traits;
