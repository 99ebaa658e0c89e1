// ============================================================
// Pretrained Backbone Weights
// ============================================================
// Saves and restores FeatureExtractor parameters with Burn's
// CompactRecorder (MessagePack + gzip, half precision).
//
// Loading is the one-time initialisation step for transfer
// learning: rebuild the extractor from its config, then load
// the recorded parameters into it. Only the extractor is
// stored; the heads are always created fresh for the label
// vocabularies at hand.
//
// File naming: the recorder appends its own extension, so
//   PretrainedWeights::new("weights/resnet18")
// reads and writes  weights/resnet18.mpk.gz
//
// A path ending in .pt or .pth is read instead as a PyTorch
// state dict in torchvision's ResNet layout (see `torchvision_remaps`
// for the key mapping). BatchNorm weight/bias become gamma/beta,
// and keys with no counterpart (fc.*, num_batches_tracked) are
// ignored.
//
// A record whose parameter count disagrees with the config is
// refused, so a 64-channel file cannot be loaded into a
// 32-channel extractor.

use std::fs;
use std::path::{Path, PathBuf};

use burn::{
    prelude::*,
    record::{CompactRecorder, FullPrecisionSettings, Recorder},
};
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};

use crate::error::{Error, Result};
use crate::ml::backbone::{FeatureExtractor, FeatureExtractorConfig};

pub struct PretrainedWeights {
    /// Path without the recorder's extension
    path: PathBuf,
}

impl PretrainedWeights {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when the path names a PyTorch state dict.
    pub fn is_torch_state_dict(&self) -> bool {
        matches!(
            self.path.extension().and_then(|e| e.to_str()),
            Some("pt") | Some("pth")
        )
    }

    /// Build an extractor from `config` and fill it with the
    /// recorded parameters.
    pub fn load<B: Backend>(
        &self,
        config: &FeatureExtractorConfig,
        device: &B::Device,
    ) -> Result<FeatureExtractor<B>> {
        let extractor = config.init::<B>(device)?;
        let expected  = extractor.num_params();

        let extractor = if self.is_torch_state_dict() {
            let args = torchvision_remaps(config)
                .into_iter()
                .fold(LoadArgs::new(self.path.clone()), |args, (pattern, replacement)| {
                    args.with_key_remap(&pattern, &replacement)
                });
            let record = PyTorchFileRecorder::<FullPrecisionSettings>::default()
                .load(args, device)
                .map_err(|e| self.error(e.to_string()))?;
            extractor.load_record(record)
        } else {
            extractor
                .load_file(self.path.clone(), &CompactRecorder::new(), device)
                .map_err(|e| self.error(e.to_string()))?
        };

        let found = extractor.num_params();
        if found != expected {
            return Err(self.error(format!(
                "record holds {found} parameters but the configured extractor has {expected}"
            )));
        }

        tracing::info!(
            "Loaded backbone weights from '{}' ({} parameters)",
            self.path.display(),
            found,
        );
        Ok(extractor)
    }

    /// Always writes the CompactRecorder format.
    pub fn save<B: Backend>(&self, extractor: &FeatureExtractor<B>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| Error::Io { path: parent.to_path_buf(), source })?;
        }

        extractor
            .clone()
            .save_file(self.path.clone(), &CompactRecorder::new())
            .map_err(|e| self.error(e.to_string()))?;

        tracing::debug!("Saved backbone weights to '{}'", self.path.display());
        Ok(())
    }

    fn error(&self, reason: String) -> Error {
        Error::Weights { path: self.path.clone(), reason }
    }
}

/// Key rewrites from torchvision's ResNet state dict to the
/// extractor's record, applied in order:
///
///   conv1.* / bn1.*               → stem_conv.* / stem_norm.*
///   layer{s}.{b}.*                → blocks.{flat index}.*
///   .bn1. / .bn2.                 → .norm1. / .norm2.
///   .downsample.0. / .downsample.1. → .downsample.conv. / .downsample.norm.
fn torchvision_remaps(config: &FeatureExtractorConfig) -> Vec<(String, String)> {
    let mut remaps = vec![
        (r"^conv1\.".to_string(), "stem_conv.".to_string()),
        (r"^bn1\.".to_string(), "stem_norm.".to_string()),
    ];

    let mut flat = 0;
    for (stage, &depth) in config.blocks_per_stage.iter().enumerate() {
        for block in 0..depth {
            remaps.push((format!(r"^layer{}\.{block}\.", stage + 1), format!("blocks.{flat}.")));
            flat += 1;
        }
    }

    remaps.extend([
        (r"\.bn([12])\.".to_string(), ".norm${1}.".to_string()),
        (r"\.downsample\.0\.".to_string(), ".downsample.conv.".to_string()),
        (r"\.downsample\.1\.".to_string(), ".downsample.norm.".to_string()),
    ]);
    remaps
}
