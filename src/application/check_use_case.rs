// ============================================================
// CheckUseCase
// ============================================================
// Smoke-tests the full path from disk to logits:
//
//   Step 1: Open the dataset with the standard pipeline
//   Step 2: Load the first `batch_size` samples and stack them
//   Step 3: Build the multitask model sized from the vocabularies
//           (optionally on top of pretrained backbone weights)
//   Step 4: Forward one batch, map arg-max ids back to labels
//
// Runs on NdArray, or on Wgpu when built with `--features wgpu`.

use std::path::PathBuf;

use anyhow::{bail, Result};
use burn::prelude::*;

use product_classifier::{
    data::batcher::ProductBatcher,
    ml::backbone::{FeatureExtractor, FeatureExtractorConfig},
    DataConfig, MultitaskModelConfig,
};

#[cfg(feature = "wgpu")]
type CheckBackend = burn::backend::Wgpu;
#[cfg(not(feature = "wgpu"))]
type CheckBackend = burn::backend::NdArray;

#[derive(Debug, Clone)]
pub struct CheckConfig {
    pub data:          DataConfig,
    pub batch_size:    usize,
    pub weights:       Option<PathBuf>,
    pub base_channels: usize,
}

/// Predicted labels for one product in the batch.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub id:        String,
    pub category:  String,
    pub condition: String,
}

#[derive(Debug, Clone)]
pub struct CheckReport {
    pub category_logits:  [usize; 2],
    pub condition_logits: [usize; 2],
    pub predictions:      Vec<Prediction>,
}

pub struct CheckUseCase {
    config: CheckConfig,
}

impl CheckUseCase {
    pub fn new(config: CheckConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<CheckReport> {
        let cfg    = &self.config;
        let device = <CheckBackend as Backend>::Device::default();

        // ── Step 1: Dataset ───────────────────────────────────────────────────
        let dataset = cfg.data.open_dataset()?;
        if dataset.is_empty() {
            bail!("No usable rows in '{}'", cfg.data.labels_path.display());
        }

        // ── Step 2: First batch ───────────────────────────────────────────────
        let count   = cfg.batch_size.clamp(1, dataset.len());
        let samples = (0..count).map(|i| dataset.get(i)).collect::<Result<Vec<_>, _>>()?;
        let batch   = ProductBatcher::<CheckBackend>::new(device.clone()).try_batch(samples)?;
        tracing::info!("Loaded batch of {} images {:?}", count, batch.images.dims());

        // ── Step 3: Model ─────────────────────────────────────────────────────
        let backbone     = FeatureExtractorConfig::new().with_base_channels(cfg.base_channels);
        let model_config = MultitaskModelConfig::for_vocabulary(dataset.vocabulary()?)
            .with_backbone(backbone.clone());
        let model = match &cfg.weights {
            Some(path) => {
                let extractor = FeatureExtractor::<CheckBackend>::load_pretrained(path, &backbone, &device)?;
                model_config.init_with_extractor(extractor, &device)?
            }
            None => model_config.init::<CheckBackend>(&device)?,
        };

        // ── Step 4: Forward ───────────────────────────────────────────────────
        let output = model.forward(batch.images);
        let (categories, conditions) = output.predicted_ids();

        let predictions = categories
            .iter()
            .zip(&conditions)
            .enumerate()
            .map(|(i, (&category, &condition))| -> Result<Prediction> {
                Ok(Prediction {
                    id:        dataset.record(i)?.id.clone(),
                    category:  dataset.category_name(category)?.to_string(),
                    condition: dataset.condition_name(condition)?.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CheckReport {
            category_logits:  output.category_logits.dims(),
            condition_logits: output.condition_logits.dims(),
            predictions,
        })
    }
}
