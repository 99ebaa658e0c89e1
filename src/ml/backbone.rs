// ============================================================
// Feature Extractor (ResNet-style backbone)
// ============================================================
// Turns a batch of normalized images into one embedding per
// image:
//
//   [N, 3, H, W]
//     │  stem: conv 7×7 /2 → BN → ReLU → maxpool 3×3 /2
//     ▼
//   stage 1 .. stage S   (residual BasicBlocks, width doubles
//     │                   and resolution halves after stage 1)
//     ▼
//   adaptive avg pool → flatten
//     ▼
//   [N, base_channels · 2^(S-1)]
//
// The default config ([2, 2, 2, 2] blocks, 64 base channels)
// is ResNet-18 without its classifier, giving 512-wide
// embeddings. Smaller configs keep the same topology and are
// what the tests run on.

use std::path::PathBuf;

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::error::{self, Error};
use crate::infra::pretrained::PretrainedWeights;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct FeatureExtractorConfig {
    #[config(default = 3)]
    pub in_channels:      usize,
    #[config(default = 64)]
    pub base_channels:    usize,
    #[config(default = "vec![2, 2, 2, 2]")]
    pub blocks_per_stage: Vec<usize>,
}

impl FeatureExtractorConfig {
    /// Width of the vector `forward` produces for each image.
    pub fn embedding_dim(&self) -> usize {
        let stages = self.blocks_per_stage.len().max(1);
        self.base_channels << (stages - 1)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> error::Result<FeatureExtractor<B>> {
        self.validate()?;

        let stem_conv = Conv2dConfig::new([self.in_channels, self.base_channels], [7, 7])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(3, 3))
            .with_bias(false)
            .init(device);
        let stem_norm = BatchNormConfig::new(self.base_channels).init(device);
        let stem_pool = MaxPool2dConfig::new([3, 3])
            .with_strides([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init();

        let mut blocks   = Vec::new();
        let mut channels = self.base_channels;
        for (stage, &depth) in self.blocks_per_stage.iter().enumerate() {
            let width  = self.base_channels << stage;
            let stride = if stage == 0 { 1 } else { 2 };
            for i in 0..depth {
                let block_stride = if i == 0 { stride } else { 1 };
                blocks.push(BasicBlock::new(channels, width, block_stride, device));
                channels = width;
            }
        }

        Ok(FeatureExtractor {
            stem_conv,
            stem_norm,
            stem_pool,
            blocks,
            pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            embedding_dim: channels,
        })
    }

    fn validate(&self) -> error::Result<()> {
        if self.in_channels == 0 || self.base_channels == 0 {
            return Err(Error::Configuration(format!(
                "backbone needs non-zero channels (in_channels = {}, base_channels = {})",
                self.in_channels, self.base_channels
            )));
        }
        if self.blocks_per_stage.is_empty() || self.blocks_per_stage.contains(&0) {
            return Err(Error::Configuration(format!(
                "every backbone stage needs at least one block, got {:?}",
                self.blocks_per_stage
            )));
        }
        Ok(())
    }
}

// ─── Residual Blocks ──────────────────────────────────────────────────────────
/// 1×1 projection used when a block changes width or resolution.
#[derive(Module, Debug)]
pub struct Downsample<B: Backend> {
    pub conv: Conv2d<B>,
    pub norm: BatchNorm<B, 2>,
}

#[derive(Module, Debug)]
pub struct BasicBlock<B: Backend> {
    pub conv1:      Conv2d<B>,
    pub norm1:      BatchNorm<B, 2>,
    pub conv2:      Conv2d<B>,
    pub norm2:      BatchNorm<B, 2>,
    pub downsample: Option<Downsample<B>>,
}

impl<B: Backend> BasicBlock<B> {
    fn new(in_channels: usize, out_channels: usize, stride: usize, device: &B::Device) -> Self {
        let conv3x3 = |c_in, s| {
            Conv2dConfig::new([c_in, out_channels], [3, 3])
                .with_stride([s, s])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .with_bias(false)
                .init(device)
        };

        let downsample = (stride != 1 || in_channels != out_channels).then(|| Downsample {
            conv: Conv2dConfig::new([in_channels, out_channels], [1, 1])
                .with_stride([stride, stride])
                .with_bias(false)
                .init(device),
            norm: BatchNormConfig::new(out_channels).init(device),
        });

        Self {
            conv1: conv3x3(in_channels, stride),
            norm1: BatchNormConfig::new(out_channels).init(device),
            conv2: conv3x3(out_channels, 1),
            norm2: BatchNormConfig::new(out_channels).init(device),
            downsample,
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = match &self.downsample {
            Some(down) => down.norm.forward(down.conv.forward(x.clone())),
            None       => x.clone(),
        };

        let out = relu(self.norm1.forward(self.conv1.forward(x)));
        let out = self.norm2.forward(self.conv2.forward(out));
        relu(out + identity)
    }
}

// ─── FeatureExtractor ─────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct FeatureExtractor<B: Backend> {
    pub stem_conv:     Conv2d<B>,
    pub stem_norm:     BatchNorm<B, 2>,
    pub stem_pool:     MaxPool2d,
    pub blocks:        Vec<BasicBlock<B>>,
    pub pool:          AdaptiveAvgPool2d,
    pub embedding_dim: usize,
}

impl<B: Backend> FeatureExtractor<B> {
    /// images: [batch, channels, height, width] → [batch, embedding_dim]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = relu(self.stem_norm.forward(self.stem_conv.forward(images)));
        let mut x = self.stem_pool.forward(x);
        for block in &self.blocks {
            x = block.forward(x);
        }
        self.pool.forward(x).flatten::<2>(1, 3)
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    /// Build from `config` and load recorded parameters from `path`:
    /// a torchvision ResNet state dict (`.pt` / `.pth`) or a file
    /// written by `save_weights` (see `infra::pretrained`).
    pub fn load_pretrained(
        path:   impl Into<PathBuf>,
        config: &FeatureExtractorConfig,
        device: &B::Device,
    ) -> error::Result<Self> {
        PretrainedWeights::new(path).load(config, device)
    }

    pub fn save_weights(&self, path: impl Into<PathBuf>) -> error::Result<()> {
        PretrainedWeights::new(path).save(self)
    }
}
