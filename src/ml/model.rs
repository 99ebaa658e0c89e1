use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
};

use crate::data::vocabulary::LabelVocabulary;
use crate::error::{self, Error};
use crate::ml::backbone::{FeatureExtractor, FeatureExtractorConfig};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally, do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct MultitaskModelConfig {
    #[config(default = "FeatureExtractorConfig::new()")]
    pub backbone:       FeatureExtractorConfig,
    #[config(default = 15)]
    pub num_categories: usize,
    #[config(default = 5)]
    pub num_conditions: usize,
}

impl MultitaskModelConfig {
    /// Head sizes taken from the vocabularies a dataset built.
    pub fn for_vocabulary(vocabulary: &LabelVocabulary) -> Self {
        Self::new()
            .with_num_categories(vocabulary.num_categories())
            .with_num_conditions(vocabulary.num_conditions())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> error::Result<MultitaskModel<B>> {
        self.check_heads()?;
        let extractor = self.backbone.init(device)?;
        self.init_with_extractor(extractor, device)
    }

    /// Attach freshly initialised heads to an existing (typically
    /// pretrained) feature extractor.
    pub fn init_with_extractor<B: Backend>(
        &self,
        extractor: FeatureExtractor<B>,
        device:    &B::Device,
    ) -> error::Result<MultitaskModel<B>> {
        self.check_heads()?;
        let width          = extractor.embedding_dim();
        let category_head  = LinearConfig::new(width, self.num_categories).init(device);
        let condition_head = LinearConfig::new(width, self.num_conditions).init(device);
        MultitaskModel::from_parts(extractor, category_head, condition_head)
    }

    fn check_heads(&self) -> error::Result<()> {
        if self.num_categories == 0 || self.num_conditions == 0 {
            return Err(Error::Configuration(format!(
                "both heads need at least one class (categories = {}, conditions = {})",
                self.num_categories, self.num_conditions
            )));
        }
        Ok(())
    }
}

#[derive(Module, Debug)]
pub struct MultitaskModel<B: Backend> {
    pub extractor:      FeatureExtractor<B>,
    pub category_head:  Linear<B>,
    pub condition_head: Linear<B>,
}

/// Raw scores, one row per image. No softmax is applied.
#[derive(Debug, Clone)]
pub struct MultitaskOutput<B: Backend> {
    /// [batch, num_categories]
    pub category_logits:  Tensor<B, 2>,
    /// [batch, num_conditions]
    pub condition_logits: Tensor<B, 2>,
}

impl<B: Backend> MultitaskOutput<B> {
    /// Arg-max ids per image, as (categories, conditions).
    pub fn predicted_ids(&self) -> (Vec<usize>, Vec<usize>) {
        (argmax_ids(&self.category_logits), argmax_ids(&self.condition_logits))
    }
}

fn argmax_ids<B: Backend>(logits: &Tensor<B, 2>) -> Vec<usize> {
    let [batch_size, _] = logits.dims();
    logits
        .clone()
        .argmax(1)
        .reshape([batch_size])
        .into_data()
        .iter::<i64>()
        .map(|id| id as usize)
        .collect()
}

impl<B: Backend> MultitaskModel<B> {
    /// Assemble a model, checking that both heads read the
    /// extractor's embedding width.
    pub fn from_parts(
        extractor:      FeatureExtractor<B>,
        category_head:  Linear<B>,
        condition_head: Linear<B>,
    ) -> error::Result<Self> {
        let width = extractor.embedding_dim();
        for (name, head) in [("category", &category_head), ("condition", &condition_head)] {
            let [d_in, _] = head.weight.val().dims();
            if d_in != width {
                return Err(Error::Configuration(format!(
                    "{name} head expects {d_in}-wide features but the extractor produces {width}"
                )));
            }
        }
        Ok(Self { extractor, category_head, condition_head })
    }

    /// images: [batch, 3, height, width] → one logit row per head
    pub fn forward(&self, images: Tensor<B, 4>) -> MultitaskOutput<B> {
        // Both heads read the same embedding.
        let features = self.extractor.forward(images);
        MultitaskOutput {
            category_logits:  self.category_head.forward(features.clone()),
            condition_logits: self.condition_head.forward(features),
        }
    }

    pub fn num_categories(&self) -> usize {
        self.category_head.weight.val().dims()[1]
    }

    pub fn num_conditions(&self) -> usize {
        self.condition_head.weight.val().dims()[1]
    }

    /// Stop gradients through the extractor; only the heads train.
    pub fn freeze_backbone(mut self) -> Self {
        self.extractor = self.extractor.no_grad();
        self
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::DataRecord;
    use burn::backend::{Autodiff, NdArray};
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    fn small() -> MultitaskModelConfig {
        MultitaskModelConfig::new().with_backbone(FeatureExtractorConfig::new().with_base_channels(4))
    }

    #[test]
    fn test_default_heads() {
        let config = MultitaskModelConfig::new();
        assert_eq!((config.num_categories, config.num_conditions), (15, 5));
        assert_eq!(config.backbone.embedding_dim(), 512);
    }

    #[test]
    fn test_forward_shapes_on_standard_input() {
        let device = Default::default();
        let model  = small().init::<TestBackend>(&device).unwrap();
        let images = Tensor::<TestBackend, 4>::random([8, 3, 224, 224], Distribution::Normal(0.0, 1.0), &device);

        let output = model.forward(images);
        assert_eq!(output.category_logits.dims(), [8, 15]);
        assert_eq!(output.condition_logits.dims(), [8, 5]);

        let (categories, conditions) = output.predicted_ids();
        assert_eq!(categories.len(), 8);
        assert!(categories.iter().all(|&id| id < 15));
        assert!(conditions.iter().all(|&id| id < 5));
    }

    #[test]
    fn test_predicted_ids_pick_largest_logit() {
        let device = Default::default();
        let output = MultitaskOutput::<TestBackend> {
            category_logits:  Tensor::from_floats([[0.1, 2.0, -1.0], [3.0, 0.0, 0.5]], &device),
            condition_logits: Tensor::from_floats([[-1.0, -0.5], [0.2, 0.1]], &device),
        };
        assert_eq!(output.predicted_ids(), (vec![1, 0], vec![1, 0]));
    }

    #[test]
    fn test_head_width_mismatch_is_configuration_error() {
        let device    = Default::default();
        let extractor = FeatureExtractorConfig::new()
            .with_base_channels(4)
            .init::<TestBackend>(&device)
            .unwrap();
        let wrong = LinearConfig::new(64, 15).init(&device);
        let right = LinearConfig::new(32, 5).init(&device);

        assert!(matches!(
            MultitaskModel::from_parts(extractor, wrong, right),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_zero_classes_rejected() {
        let device = Default::default();
        let config = small().with_num_conditions(0);
        assert!(matches!(config.init::<TestBackend>(&device), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_config_sized_from_vocabulary() {
        let records = vec![
            DataRecord::new("1", "shoes", "new"),
            DataRecord::new("2", "bags", "used"),
            DataRecord::new("3", "hats", "used"),
        ];
        let vocabulary = LabelVocabulary::build(&records);
        let config     = MultitaskModelConfig::for_vocabulary(&vocabulary);
        assert_eq!((config.num_categories, config.num_conditions), (3, 2));

        let device = Default::default();
        let model  = config
            .with_backbone(FeatureExtractorConfig::new().with_base_channels(4))
            .init::<TestBackend>(&device)
            .unwrap();
        assert_eq!((model.num_categories(), model.num_conditions()), (3, 2));
    }

    #[test]
    fn test_pretrained_extractor_keeps_its_weights() {
        let device    = Default::default();
        let extractor = FeatureExtractorConfig::new()
            .with_base_channels(4)
            .init::<TestBackend>(&device)
            .unwrap();
        let before = extractor.stem_conv.weight.val().into_data();

        let model = small().init_with_extractor(extractor, &device).unwrap();
        assert_eq!(model.extractor.stem_conv.weight.val().into_data(), before);
        assert_eq!(model.num_categories(), 15);
    }

    #[test]
    fn test_freeze_backbone_stops_extractor_gradients_only() {
        type TrainBackend = Autodiff<NdArray>;

        let device = Default::default();
        let model  = small().init::<TrainBackend>(&device).unwrap();
        assert!(model.extractor.stem_conv.weight.val().is_require_grad());

        let model = model.freeze_backbone();
        assert!(!model.extractor.stem_conv.weight.val().is_require_grad());
        assert!(!model.extractor.blocks[0].conv1.weight.val().is_require_grad());
        assert!(!model.extractor.stem_norm.gamma.val().is_require_grad());
        assert!(model.category_head.weight.val().is_require_grad());
        assert!(model.condition_head.weight.val().is_require_grad());
    }
}
