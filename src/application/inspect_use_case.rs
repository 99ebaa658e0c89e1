// ============================================================
// InspectUseCase
// ============================================================
// Loads the label table and reports what a training run would
// see: how many rows survived filtering, and for each field the
// label ↔ id mapping with per-class counts and loss weights.
// Images are not opened.

use anyhow::{Context, Result};

use product_classifier::{ClassWeights, DataConfig, LabelField, ProductsDataset, Vocabulary};

/// One vocabulary entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassSummary {
    pub id:     usize,
    pub label:  String,
    pub count:  usize,
    pub weight: f64,
}

#[derive(Debug, Clone)]
pub struct InspectReport {
    pub records:    usize,
    pub categories: Vec<ClassSummary>,
    pub conditions: Vec<ClassSummary>,
}

pub struct InspectUseCase {
    config: DataConfig,
}

impl InspectUseCase {
    pub fn new(config: DataConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<InspectReport> {
        let cfg = &self.config;
        tracing::info!("Inspecting labels in '{}'", cfg.labels_path.display());

        let dataset = ProductsDataset::new(&cfg.labels_path, &cfg.image_root, None)
            .with_context(|| format!("Cannot load dataset from '{}'", cfg.labels_path.display()))?;

        let vocabulary = dataset.vocabulary()?;
        let weights    = dataset.class_weights()?;

        Ok(InspectReport {
            records:    dataset.len(),
            categories: summarise(vocabulary.field(LabelField::Category), weights.field(LabelField::Category))?,
            conditions: summarise(vocabulary.field(LabelField::Condition), weights.field(LabelField::Condition))?,
        })
    }
}

fn summarise(vocabulary: &Vocabulary, weights: &ClassWeights) -> Result<Vec<ClassSummary>> {
    vocabulary
        .labels()
        .iter()
        .enumerate()
        .map(|(id, label)| -> Result<ClassSummary> {
            Ok(ClassSummary {
                id,
                label:  label.clone(),
                count:  weights.count(id)?,
                weight: weights.weight(id)?,
            })
        })
        .collect()
}
