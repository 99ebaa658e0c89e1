// ============================================================
// ProductsDataset
// ============================================================
// Index-addressable product samples.
//
// Built once from a label source and an image directory:
//   1. load the filtered records (id, category, condition)
//   2. build the category / condition vocabularies
//   3. build the class weight table from the same records
//
// After construction nothing is mutated. `get(i)` reads
// `<image_root>/<id>.jpg`, decodes it, runs the optional
// transform pipeline on the image, and pairs the result with
// the record's dense label ids. Each call re-reads the file;
// there is no cache and no shared mutable state, so distinct
// indices can be fetched from many threads at once.
//
// An empty dataset (every row had a missing value) is valid,
// but asking it for its vocabulary or weights fails with
// EmptyDataset instead of handing back empty tables.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use burn::data::dataset::Dataset;

use crate::data::loader::TableLoader;
use crate::data::transform::{ImageData, TransformPipeline};
use crate::data::vocabulary::LabelVocabulary;
use crate::data::weights::ClassWeightTable;
use crate::domain::record::{DataRecord, LabelField};
use crate::domain::sample::Sample;
use crate::domain::traits::LabelSource;
use crate::error::{Error, Result};

pub struct ProductsDataset {
    origin:     String,
    records:    Vec<DataRecord>,
    vocabulary: LabelVocabulary,
    weights:    ClassWeightTable,
    image_root: PathBuf,
    transform:  Option<TransformPipeline>,
}

impl ProductsDataset {
    /// Load labels from a `.csv` / `.tsv` / `.xlsx` table on disk.
    pub fn new(
        labels_path: impl Into<PathBuf>,
        image_root:  impl Into<PathBuf>,
        transform:   Option<TransformPipeline>,
    ) -> Result<Self> {
        Self::from_source(&TableLoader::new(labels_path), image_root, transform)
    }

    pub fn from_source(
        source:     &impl LabelSource,
        image_root: impl Into<PathBuf>,
        transform:  Option<TransformPipeline>,
    ) -> Result<Self> {
        let mut records = source.load_records()?;
        let loaded      = records.len();
        records.retain(DataRecord::is_complete);
        if records.len() < loaded {
            tracing::info!(
                "Dropped {} records with an empty id, category or condition",
                loaded - records.len(),
            );
        }

        let vocabulary = LabelVocabulary::build(&records);
        let weights    = ClassWeightTable::build(&records, &vocabulary)?;
        let image_root = image_root.into();

        if records.is_empty() {
            tracing::warn!("No usable rows in '{}'", source.describe());
        } else {
            tracing::info!(
                "Dataset ready: {} samples, {} categories, {} conditions, images in '{}'",
                records.len(),
                vocabulary.num_categories(),
                vocabulary.num_conditions(),
                image_root.display(),
            );
        }

        Ok(Self {
            origin: source.describe(),
            records,
            vocabulary,
            weights,
            image_root,
            transform,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Load, decode and transform sample `index`.
    pub fn get(&self, index: usize) -> Result<Sample> {
        let record    = self.record(index)?;
        let category  = self.vocabulary.label_to_id(LabelField::Category, &record.category)?;
        let condition = self.vocabulary.label_to_id(LabelField::Condition, &record.condition)?;

        let path  = self.image_root.join(record.image_file_name());
        let image = ImageData::Pixels(load_rgb(&path)?);
        let image = match &self.transform {
            Some(pipeline) => pipeline.apply(image)?,
            None           => image,
        };

        let image = image.into_tensor();
        tracing::debug!("Sample {} ('{}') → {:?}", index, record.id, image.shape());
        Ok(Sample { image, category, condition })
    }

    /// The filtered table row behind sample `index`.
    pub fn record(&self, index: usize) -> Result<&DataRecord> {
        self.records
            .get(index)
            .ok_or(Error::Index { index, len: self.records.len() })
    }

    pub fn records(&self) -> &[DataRecord] {
        &self.records
    }

    /// Where `get(index)` reads its image from.
    pub fn image_path(&self, index: usize) -> Result<PathBuf> {
        Ok(self.image_root.join(self.record(index)?.image_file_name()))
    }

    pub fn image_root(&self) -> &Path {
        &self.image_root
    }

    pub fn transform(&self) -> Option<&TransformPipeline> {
        self.transform.as_ref()
    }

    pub fn vocabulary(&self) -> Result<&LabelVocabulary> {
        self.ensure_not_empty()?;
        Ok(&self.vocabulary)
    }

    pub fn class_weights(&self) -> Result<&ClassWeightTable> {
        self.ensure_not_empty()?;
        Ok(&self.weights)
    }

    pub fn label_to_id(&self, field: LabelField, label: &str) -> Result<usize> {
        self.vocabulary()?.label_to_id(field, label)
    }

    pub fn category_name(&self, id: usize) -> Result<&str> {
        self.vocabulary()?.id_to_label(LabelField::Category, id)
    }

    pub fn condition_name(&self, id: usize) -> Result<&str> {
        self.vocabulary()?.id_to_label(LabelField::Condition, id)
    }

    fn ensure_not_empty(&self) -> Result<()> {
        if self.records.is_empty() {
            return Err(Error::EmptyDataset { origin: self.origin.clone() });
        }
        Ok(())
    }
}

/// Read and decode one image as 8-bit RGB.
fn load_rgb(path: &Path) -> Result<image::RgbImage> {
    let bytes = std::fs::read(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => Error::MissingResource { path: path.to_path_buf() },
        _                            => Error::Io { path: path.to_path_buf(), source },
    })?;

    let image = image::load_from_memory(&bytes)
        .map_err(|source| Error::Decode { path: path.to_path_buf(), source })?;
    Ok(image.to_rgb8())
}

// ─── Burn Dataset Trait Implementation ────────────────────────────────────────
/// One item as burn's DataLoader sees it: the sample, or the reason
/// it could not be loaded. burn stops iterating at the first `None`,
/// so a failed load is carried as an `Err` item instead and the
/// batcher decides what to do with it.
pub type LoadedSample = std::result::Result<Sample, Arc<Error>>;

impl Dataset<LoadedSample> for ProductsDataset {
    fn get(&self, index: usize) -> Option<LoadedSample> {
        if index >= self.records.len() {
            return None;
        }
        Some(ProductsDataset::get(self, index).map_err(|e| {
            tracing::warn!("Cannot load sample {}: {}", index, e);
            Arc::new(e)
        }))
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::transform::{CenterCrop, Normalize, Resize, ToTensor};
    use image::{Rgb, RgbImage};
    use std::fs;

    /// Writes `labels.csv` plus one small JPEG per row with an id.
    fn fixture(rows: &[(&str, &str, &str)]) -> tempfile::TempDir {
        let dir    = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        fs::create_dir(&images).unwrap();

        let mut csv = String::from("id,category,condition\n");
        for (i, (id, category, condition)) in rows.iter().enumerate() {
            csv.push_str(&format!("{id},{category},{condition}\n"));
            if !id.is_empty() {
                let shade = (i * 10 % 256) as u8;
                RgbImage::from_pixel(12, 8, Rgb([shade, 64, 200]))
                    .save(images.join(format!("{id}.jpg")))
                    .unwrap();
            }
        }
        fs::write(dir.path().join("labels.csv"), csv).unwrap();
        dir
    }

    fn open(dir: &tempfile::TempDir, transform: Option<TransformPipeline>) -> ProductsDataset {
        ProductsDataset::new(dir.path().join("labels.csv"), dir.path().join("images"), transform)
            .unwrap()
    }

    #[test]
    fn test_samples_carry_vocabulary_ids() {
        let dir = fixture(&[("10", "shoes", "new"), ("11", "bags", "used"), ("12", "shoes", "used")]);
        let ds  = open(&dir, None);

        assert_eq!(ds.len(), 3);
        let s = ds.get(0).unwrap();
        // bags=0, shoes=1 / new=0, used=1
        assert_eq!((s.category, s.condition), (1, 0));
        assert_eq!(s.image.shape(), [3, 8, 12]);
        assert!(s.image.data().iter().all(|v| (0.0..=1.0).contains(v)));

        let s = ds.get(1).unwrap();
        assert_eq!((s.category, s.condition), (0, 1));
        assert_eq!(ds.category_name(s.category).unwrap(), "bags");
        assert_eq!(ds.condition_name(s.condition).unwrap(), "used");
    }

    #[test]
    fn test_filtering_drops_incomplete_rows() {
        let ids: Vec<String> = (0..100).map(|i| format!("p{i}")).collect();
        let rows: Vec<(&str, &str, &str)> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let category = if i % 14 == 3 { "" } else { ["shoes", "bags", "hats"][i % 3] };
                (id.as_str(), category, ["new", "used"][i % 2])
            })
            .collect();
        let dropped: Vec<&str> = rows.iter().filter(|r| r.1.is_empty()).map(|r| r.0).collect();
        assert_eq!(dropped.len(), 7);

        let dir = fixture(&rows);
        let ds  = open(&dir, None);

        assert_eq!(ds.len(), 93);
        for i in 0..ds.len() {
            assert!(!dropped.contains(&ds.record(i).unwrap().id.as_str()));
        }
        // order preserved
        assert_eq!(ds.record(0).unwrap().id, "p0");
        assert_eq!(ds.record(3).unwrap().id, "p4");
    }

    #[test]
    fn test_out_of_range_index() {
        let dir = fixture(&[("1", "shoes", "new")]);
        let ds  = open(&dir, None);
        assert!(matches!(ds.get(1), Err(Error::Index { index: 1, len: 1 })));
        assert!(Dataset::<LoadedSample>::get(&ds, 5).is_none());
    }

    #[test]
    fn test_missing_image_fails_only_that_index() {
        let dir = fixture(&[("1", "shoes", "new"), ("2", "bags", "used"), ("3", "hats", "new")]);
        fs::remove_file(dir.path().join("images/2.jpg")).unwrap();
        let ds = open(&dir, None);

        assert!(matches!(ds.get(1), Err(Error::MissingResource { .. })));
        assert!(ds.get(2).is_ok());
        assert!(ds.get(0).is_ok());
        assert!(matches!(ds.get(1), Err(Error::MissingResource { .. })));
    }

    #[test]
    fn test_corrupt_image_is_decode_error() {
        let dir = fixture(&[("1", "shoes", "new"), ("2", "bags", "used")]);
        fs::write(dir.path().join("images/2.jpg"), b"definitely not a jpeg").unwrap();
        let ds = open(&dir, None);

        assert!(matches!(ds.get(1), Err(Error::Decode { .. })));
        assert!(ds.get(0).is_ok());
    }

    #[test]
    fn test_pipeline_applied_to_image_only() {
        let dir = fixture(&[("1", "shoes", "worn"), ("2", "bags", "new")]);
        let pipeline = TransformPipeline::new()
            .with(Resize::new(256).unwrap())
            .with(CenterCrop::new(224).unwrap())
            .with(Normalize::imagenet())
            .with(ToTensor);
        let plain = open(&dir, None);
        let ds    = open(&dir, Some(pipeline));

        for i in 0..ds.len() {
            let (raw, s) = (plain.get(i).unwrap(), ds.get(i).unwrap());
            assert_eq!((s.category, s.condition), (raw.category, raw.condition));
            assert_eq!(s.image.shape(), [3, 224, 224]);
            assert!(s.image.data().iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_empty_dataset_fails_fast() {
        let dir = fixture(&[("1", "", "new"), ("", "shoes", "new")]);
        let ds  = open(&dir, None);

        assert!(ds.is_empty());
        assert!(matches!(ds.vocabulary(), Err(Error::EmptyDataset { .. })));
        assert!(matches!(ds.class_weights(), Err(Error::EmptyDataset { .. })));
        assert!(matches!(ds.category_name(0), Err(Error::EmptyDataset { .. })));
        assert!(matches!(ds.get(0), Err(Error::Index { .. })));
    }

    #[test]
    fn test_weights_align_with_sample_ids() {
        let dir = fixture(&[
            ("1", "shoes", "new"),
            ("2", "shoes", "new"),
            ("3", "shoes", "used"),
            ("4", "bags", "new"),
        ]);
        let ds      = open(&dir, None);
        let weights = ds.class_weights().unwrap();

        let bags = ds.label_to_id(LabelField::Category, "bags").unwrap();
        assert_eq!(weights.category().weight(bags).unwrap(), 3.0);
        let s = ds.get(0).unwrap();
        assert_eq!(weights.category().weight(s.category).unwrap(), 1.0);
        assert_eq!(weights.condition().as_slice(), &[1.0, 3.0]);
    }

    #[test]
    fn test_concurrent_reads_of_distinct_indices() {
        let rows: Vec<(String, &str, &str)> =
            (0..16).map(|i| (i.to_string(), ["a", "b"][i % 2], "new")).collect();
        let borrowed: Vec<(&str, &str, &str)> =
            rows.iter().map(|(id, c, d)| (id.as_str(), *c, *d)).collect();
        let dir = fixture(&borrowed);
        let ds  = Arc::new(open(&dir, None));

        let expected: Vec<usize> = (0..16).map(|i| ProductsDataset::get(&ds, i).unwrap().category).collect();

        std::thread::scope(|scope| {
            for worker in 0..4 {
                let ds       = Arc::clone(&ds);
                let expected = &expected;
                scope.spawn(move || {
                    for i in (worker..16).step_by(4) {
                        assert_eq!(ProductsDataset::get(&ds, i).unwrap().category, expected[i]);
                    }
                });
            }
        });
    }

    #[test]
    fn test_burn_iteration_continues_past_a_missing_image() {
        let dir = fixture(&[
            ("0", "shoes", "new"),
            ("1", "bags", "used"),
            ("2", "hats", "new"),
            ("3", "shoes", "used"),
            ("4", "bags", "new"),
        ]);
        fs::remove_file(dir.path().join("images/1.jpg")).unwrap();
        let ds = open(&dir, None);

        let items: Vec<LoadedSample> = Dataset::iter(&ds).collect();
        assert_eq!(items.len(), 5);
        assert_eq!(items.iter().filter(|item| item.is_ok()).count(), 4);
        assert!(matches!(
            items[1].as_ref().map(|_| ()).unwrap_err().as_ref(),
            Error::MissingResource { .. }
        ));
        assert_eq!(items[4].as_ref().unwrap().category, 0);
    }

    #[test]
    fn test_data_loader_yields_every_record() {
        use crate::data::batcher::ProductBatcher;
        use burn::backend::NdArray;
        use burn::data::dataloader::DataLoaderBuilder;

        let rows: Vec<(String, &str, &str)> =
            (0..5).map(|i| (i.to_string(), ["a", "b"][i % 2], "new")).collect();
        let borrowed: Vec<(&str, &str, &str)> =
            rows.iter().map(|(id, c, d)| (id.as_str(), *c, *d)).collect();
        let dir = fixture(&borrowed);
        fs::remove_file(dir.path().join("images/2.jpg")).unwrap();

        let loader = DataLoaderBuilder::new(ProductBatcher::<NdArray>::new(Default::default()))
            .batch_size(2)
            .build(open(&dir, None));

        let (mut stacked, mut failed) = (0, 0);
        for batch in loader.iter() {
            stacked += batch.len();
            failed  += batch.failures.len();
        }
        assert_eq!((stacked, failed), (4, 1));
    }

    #[test]
    fn test_in_memory_source_drops_incomplete_records() {
        let dir = fixture(&[("1", "shoes", "new"), ("2", "bags", "used")]);
        let records = vec![
            DataRecord::new("1", "shoes", "new"),
            DataRecord::new("3", "", "new"),
            DataRecord::new("", "bags", "used"),
            DataRecord::new("2", "bags", " "),
        ];
        let ds = ProductsDataset::from_source(&records, dir.path().join("images"), None).unwrap();

        assert_eq!(ds.len(), 1);
        assert_eq!(ds.record(0).unwrap().id, "1");
        assert_eq!(ds.vocabulary().unwrap().num_categories(), 1);
    }

    #[test]
    fn test_in_memory_source() {
        let dir = fixture(&[("1", "shoes", "new")]);
        let records = vec![DataRecord::new("1", "shoes", "new")];
        let ds = ProductsDataset::from_source(&records, dir.path().join("images"), None).unwrap();
        assert_eq!(ds.get(0).unwrap().category, 0);
    }
}
