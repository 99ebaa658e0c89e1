// ============================================================
// Infrastructure Layer
// ============================================================
// Files on disk that are not label tables or images:
//
//   config.rs     : DataConfig as JSON (paths, resize/crop
//                   sizes, normalization statistics) and the
//                   standard transform pipeline built from it
//
//   pretrained.rs : backbone weights through Burn's
//                   CompactRecorder, loaded once before the
//                   heads are attached

/// JSON data-preparation config
pub mod config;

/// Pretrained feature-extractor weights
pub mod pretrained;
