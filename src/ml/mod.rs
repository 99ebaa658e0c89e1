// ============================================================
// ML / Model Layer (Burn)
// ============================================================
// The classifier: a shared convolutional feature extractor
// and two linear heads reading the same embedding.
//
//   images [N, 3, H, W]
//       │
//       ▼
//   FeatureExtractor    → [N, D]   (ResNet-style, D = 512 by default)
//       │
//       ├──► category head   → [N, num_categories]
//       └──► condition head  → [N, num_conditions]
//
//   backbone.rs : residual blocks and the extractor config
//   model.rs    : MultitaskModel, its config and output
//
// Loading pretrained extractor weights lives in infra.

/// ResNet-style feature extractor
pub mod backbone;

/// Two-headed category / condition classifier
pub mod model;
