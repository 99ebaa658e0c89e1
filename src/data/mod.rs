// ============================================================
// Data Pipeline
// ============================================================
// Everything between the label table on disk and a batch of
// tensors ready for the model.
//
//   labels.csv / labels.xlsx
//       │
//       ▼
//   TableLoader         → filtered DataRecords (id, category, condition)
//       │
//       ▼
//   LabelVocabulary     → label ↔ dense id, per field
//   ClassWeightTable    → max(count) / count, per field
//       │
//       ▼
//   ProductsDataset     → <id>.jpg + TransformPipeline → Sample
//       │
//       ▼
//   ProductBatcher      → images [N, C, H, W] + label id tensors
//
// Each stage is testable on its own; only the dataset touches
// the image directory.

/// Reads the label table (.csv / .tsv / .xlsx)
pub mod loader;

/// Sorted label ↔ id mappings
pub mod vocabulary;

/// Inverse-frequency class weights
pub mod weights;

/// Resize / CenterCrop / Normalize / ToTensor and their composition
pub mod transform;

/// Implements Burn's Dataset trait for product samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
