// ============================================================
// Domain Layer
// ============================================================
// Plain Rust types describing what the system works with:
// a labelled product row, the two label fields, and the
// sample handed to a training loop.
//
// Rules for this layer:
//   - NO burn types
//   - NO file or image I/O
//   - Only structs, enums and traits
//
// The data layer builds these; the ml layer consumes them
// through the batcher.

// One filtered row of the label table
pub mod record;

// A transformed image plus its two dense label ids
pub mod sample;

// Abstractions the data layer implements
pub mod traits;
