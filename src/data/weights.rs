// ============================================================
// Class Weight Table
// ============================================================
// Per-class loss weights that up-weight rare labels:
//
//   weight(c) = max_count / count(c)
//
// Example, counts in id order [10, 5, 20] → weights [2.0, 4.0, 1.0].
//
// The most frequent class always gets exactly 1.0 and every
// other weight is ≥ 1.0. Weights are stored by dense id, not by
// label string, so the table can be indexed directly with the
// ids a Sample carries (and passed to a weighted cross-entropy).
//
// Counts come from the same filtered records the vocabulary was
// built from, so every class in the vocabulary has count ≥ 1.

use crate::data::vocabulary::{LabelVocabulary, Vocabulary};
use crate::domain::record::{DataRecord, LabelField};
use crate::error::{Error, Result};

/// Weights for one label field, indexed by dense id.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassWeights {
    field:   LabelField,
    counts:  Vec<usize>,
    weights: Vec<f64>,
}

impl ClassWeights {
    pub fn build(records: &[DataRecord], vocabulary: &Vocabulary) -> Result<Self> {
        let field      = vocabulary.field();
        let mut counts = vec![0usize; vocabulary.len()];
        for record in records {
            counts[vocabulary.label_to_id(record.label(field))?] += 1;
        }

        let max = counts.iter().copied().max().unwrap_or(0) as f64;
        let weights = counts.iter().map(|&count| max / count as f64).collect();

        Ok(Self { field, counts, weights })
    }

    pub fn weight(&self, id: usize) -> Result<f64> {
        self.weights.get(id).copied().ok_or(Error::UnknownId {
            field: self.field,
            id,
            size: self.weights.len(),
        })
    }

    /// Number of records carrying class `id`.
    pub fn count(&self, id: usize) -> Result<usize> {
        self.counts.get(id).copied().ok_or(Error::UnknownId {
            field: self.field,
            id,
            size: self.counts.len(),
        })
    }

    pub fn field(&self) -> LabelField {
        self.field
    }

    /// Weights in id order.
    pub fn as_slice(&self) -> &[f64] {
        &self.weights
    }

    /// Weights in id order as `f32`, the form burn's weighted
    /// cross-entropy expects.
    pub fn to_vec_f32(&self) -> Vec<f32> {
        self.weights.iter().map(|&w| w as f32).collect()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Category and condition weights of one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassWeightTable {
    category:  ClassWeights,
    condition: ClassWeights,
}

impl ClassWeightTable {
    pub fn build(records: &[DataRecord], vocabulary: &LabelVocabulary) -> Result<Self> {
        Ok(Self {
            category:  ClassWeights::build(records, vocabulary.category())?,
            condition: ClassWeights::build(records, vocabulary.condition())?,
        })
    }

    pub fn field(&self, field: LabelField) -> &ClassWeights {
        match field {
            LabelField::Category  => &self.category,
            LabelField::Condition => &self.condition,
        }
    }

    pub fn category(&self) -> &ClassWeights {
        &self.category
    }

    pub fn condition(&self) -> &ClassWeights {
        &self.condition
    }
}
