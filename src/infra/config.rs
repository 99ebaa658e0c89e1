// ============================================================
// Data Configuration
// ============================================================
// Where the labels and images live and how images are prepared,
// stored as JSON so a run can be repeated exactly:
//
//   {
//     "labels_path": "data/labels.xlsx",
//     "image_root":  "data/images",
//     "resize": 256,
//     "crop":   224,
//     "mean":   [0.485, 0.456, 0.406],
//     "std":    [0.229, 0.224, 0.225]
//   }
//
// Every field except the two paths may be omitted. The mean/std
// defaults are the statistics the pretrained backbone expects.

use std::{fs, path::{Path, PathBuf}};

use serde::{Deserialize, Serialize};

use crate::data::dataset::ProductsDataset;
use crate::data::transform::{
    CenterCrop, Normalize, Resize, ToTensor, TransformPipeline, IMAGENET_MEAN, IMAGENET_STD,
};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Label table (.csv, .tsv or .xlsx)
    pub labels_path: PathBuf,

    /// Directory holding one `<id>.jpg` per product
    pub image_root: PathBuf,

    /// Shorter image edge after resizing
    #[serde(default = "default_resize")]
    pub resize: u32,

    /// Side of the square center crop
    #[serde(default = "default_crop")]
    pub crop: u32,

    #[serde(default = "default_mean")]
    pub mean: Vec<f32>,

    #[serde(default = "default_std")]
    pub std: Vec<f32>,
}

fn default_resize() -> u32 { 256 }
fn default_crop()   -> u32 { 224 }
fn default_mean()   -> Vec<f32> { IMAGENET_MEAN.to_vec() }
fn default_std()    -> Vec<f32> { IMAGENET_STD.to_vec() }

impl DataConfig {
    pub fn new(labels_path: impl Into<PathBuf>, image_root: impl Into<PathBuf>) -> Self {
        Self {
            labels_path: labels_path.into(),
            image_root:  image_root.into(),
            resize:      default_resize(),
            crop:        default_crop(),
            mean:        default_mean(),
            std:         default_std(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
        serde_json::from_str(&json)
            .map_err(|source| Error::Json { path: path.to_path_buf(), source })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|source| Error::Json { path: path.to_path_buf(), source })?;
        fs::write(path, json).map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
        tracing::debug!("Saved data config to '{}'", path.display());
        Ok(())
    }

    /// Resize → CenterCrop → Normalize → ToTensor
    pub fn pipeline(&self) -> Result<TransformPipeline> {
        Ok(TransformPipeline::new()
            .with(Resize::new(self.resize)?)
            .with(CenterCrop::new(self.crop)?)
            .with(Normalize::new(self.mean.clone(), self.std.clone())?)
            .with(ToTensor))
    }

    /// The dataset this config describes, with the standard pipeline.
    pub fn open_dataset(&self) -> Result<ProductsDataset> {
        ProductsDataset::new(&self.labels_path, &self.image_root, Some(self.pipeline()?))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: DataConfig =
            serde_json::from_str(r#"{ "labels_path": "l.csv", "image_root": "img" }"#).unwrap();
        assert_eq!(config, DataConfig::new("l.csv", "img"));
        assert_eq!((config.resize, config.crop), (256, 224));
        assert_eq!(config.mean, vec![0.485, 0.456, 0.406]);
    }

    #[test]
    fn test_save_and_load() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let mut config = DataConfig::new("labels.xlsx", "images");
        config.crop = 128;

        config.save(&path).unwrap();
        assert_eq!(DataConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_errors() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        assert!(matches!(DataConfig::load(&path), Err(Error::Io { .. })));

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(DataConfig::load(&path), Err(Error::Json { .. })));
    }

    #[test]
    fn test_pipeline_is_standard_four_steps() {
        let pipeline = DataConfig::new("l.csv", "img").pipeline().unwrap();
        assert_eq!(pipeline.len(), 4);
    }

    #[test]
    fn test_bad_values_rejected_by_pipeline() {
        let mut config = DataConfig::new("l.csv", "img");
        config.std = vec![0.2, 0.0, 0.2];
        assert!(matches!(config.pipeline(), Err(Error::InvalidTransform(_))));

        let mut config = DataConfig::new("l.csv", "img");
        config.crop = 0;
        assert!(matches!(config.pipeline(), Err(Error::InvalidTransform(_))));
    }
}
