// ============================================================
// Product Batcher
// ============================================================
// Implements Burn's Batcher trait to stack the DataLoader's items
// into one set of tensors:
//
//   Input:  N loaded samples, each image [C, H, W] + two label ids
//   Output: images [M, C, H, W], categories [M], conditions [M]
//           plus the N - M failures that were left out
//
// The images are already channel-major, so stacking is a plain
// concatenation of their buffers followed by a reshape.
//
// Every image in a batch must have the same shape. The standard
// pipeline (Resize → CenterCrop) guarantees that. `try_batch`
// refuses a batch that breaks it; the DataLoader path records each
// odd sample as a Batch failure next to the load failures, so
// images + failures always accounts for every requested index.

use std::sync::Arc;

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::LoadedSample;
use crate::domain::sample::Sample;
use crate::error::{Error, Result};

// ─── ProductBatch ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct ProductBatch<B: Backend> {
    /// Shape: [batch_size, channels, height, width]
    pub images: Tensor<B, 4>,

    /// Category ids, shape [batch_size]
    pub categories: Tensor<B, 1, Int>,

    /// Condition ids, shape [batch_size]
    pub conditions: Tensor<B, 1, Int>,

    /// Items that were requested but are not in the tensors above
    pub failures: Vec<Arc<Error>>,
}

impl<B: Backend> ProductBatch<B> {
    /// Number of samples actually stacked.
    pub fn len(&self) -> usize {
        self.images.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when every requested item made it into the tensors.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

// ─── ProductBatcher ───────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct ProductBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ProductBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Stack `items`, failing when the batch is empty or the
    /// image shapes disagree.
    pub fn try_batch(&self, items: Vec<Sample>) -> Result<ProductBatch<B>> {
        let shape = items
            .first()
            .map(|s| s.image.shape())
            .ok_or_else(|| Error::Batch("no samples to batch".to_string()))?;

        if let Some((i, odd)) = items.iter().enumerate().find(|(_, s)| s.image.shape() != shape) {
            return Err(Error::Batch(format!(
                "sample {i} has image shape {:?}, expected {shape:?}",
                odd.image.shape()
            )));
        }

        Ok(self.stack(items, shape))
    }

    fn stack(&self, items: Vec<Sample>, [channels, height, width]: [usize; 3]) -> ProductBatch<B> {
        let batch_size = items.len();

        let categories: Vec<i32> = items.iter().map(|s| s.category as i32).collect();
        let conditions: Vec<i32> = items.iter().map(|s| s.condition as i32).collect();

        let mut pixels = Vec::with_capacity(batch_size * channels * height * width);
        for sample in items {
            pixels.extend(sample.image.into_data());
        }

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, channels, height, width]),
            &self.device,
        );
        let categories = Tensor::<B, 1, Int>::from_ints(categories.as_slice(), &self.device);
        let conditions = Tensor::<B, 1, Int>::from_ints(conditions.as_slice(), &self.device);

        ProductBatch { images, categories, conditions, failures: Vec::new() }
    }
}

// ─── Burn Batcher Trait Implementation ────────────────────────────────────────
// The DataLoader cannot receive an error from here, so failures
// travel inside the batch and the training loop decides whether
// to skip, retry or abort.
impl<B: Backend> Batcher<LoadedSample, ProductBatch<B>> for ProductBatcher<B> {
    fn batch(&self, items: Vec<LoadedSample>) -> ProductBatch<B> {
        let mut samples  = Vec::with_capacity(items.len());
        let mut failures = Vec::new();
        for item in items {
            match item {
                Ok(sample) => samples.push(sample),
                Err(e)     => failures.push(e),
            }
        }

        let shape = samples.first().map(|s| s.image.shape()).unwrap_or([0, 0, 0]);
        let (kept, odd): (Vec<Sample>, Vec<Sample>) =
            samples.into_iter().partition(|s| s.image.shape() == shape);
        failures.extend(odd.into_iter().map(|s| {
            Arc::new(Error::Batch(format!(
                "image shape {:?} differs from the batch shape {:?}",
                s.image.shape(),
                shape
            )))
        }));

        let mut batch = self.stack(kept, shape);
        if !failures.is_empty() {
            tracing::warn!(
                "Batch of {} has {} failed samples; first: {}",
                batch.len() + failures.len(),
                failures.len(),
                failures[0],
            );
        }
        batch.failures = failures;
        batch
    }
}
