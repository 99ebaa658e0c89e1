//! Product photo dataset preparation and a two-headed
//! category / condition classifier built on Burn.
//!
//! ```text
//!   domain/  records, samples, the LabelSource seam
//!   data/    label tables, vocabularies, class weights,
//!            image transforms, Dataset + Batcher
//!   ml/      feature extractor and the multitask model
//!   infra/   JSON data config, pretrained weight files
//! ```

#![recursion_limit = "256"]

pub mod error;
pub mod domain;
pub mod data;
pub mod ml;
pub mod infra;

pub use error::{Error, Result};
pub use domain::record::{DataRecord, LabelField};
pub use domain::sample::{ImageTensor, Sample};
pub use data::dataset::{LoadedSample, ProductsDataset};
pub use data::batcher::{ProductBatch, ProductBatcher};
pub use data::transform::{CenterCrop, ImageData, Normalize, Resize, ToTensor, Transform, TransformPipeline};
pub use data::vocabulary::{LabelVocabulary, Vocabulary};
pub use data::weights::{ClassWeightTable, ClassWeights};
pub use ml::model::{MultitaskModel, MultitaskModelConfig, MultitaskOutput};
pub use infra::config::DataConfig;
