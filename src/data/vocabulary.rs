// ============================================================
// Label Vocabulary
// ============================================================
// Maps raw label strings to dense ids and back, one mapping per
// label field.
//
// Ids are assigned by sorting the DISTINCT labels observed in
// the filtered records and numbering them 0..k-1 in that order:
//
//   records:  bags, shoes, bags, hats
//   sorted:   bags, hats, shoes
//   ids:      bags=0, hats=1, shoes=2
//
// So the mapping depends only on the set of labels, never on
// row order. It is closed: a label that was not observed at
// build time is a Lookup error, not an "unknown" bucket.

use std::collections::{BTreeSet, HashMap};

use crate::domain::record::{DataRecord, LabelField};
use crate::error::{Error, Result};

/// Bidirectional `label ↔ id` mapping for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    field:  LabelField,
    labels: Vec<String>,
    ids:    HashMap<String, usize>,
}

impl Vocabulary {
    /// Collect the distinct values of `field`, sort them, and number them.
    pub fn build(records: &[DataRecord], field: LabelField) -> Self {
        let distinct: BTreeSet<&str> = records.iter().map(|r| r.label(field)).collect();
        let labels: Vec<String> = distinct.into_iter().map(str::to_string).collect();
        let ids = labels
            .iter()
            .enumerate()
            .map(|(id, label)| (label.clone(), id))
            .collect();

        Self { field, labels, ids }
    }

    pub fn label_to_id(&self, label: &str) -> Result<usize> {
        self.ids.get(label).copied().ok_or_else(|| Error::UnknownLabel {
            field: self.field,
            label: label.to_string(),
        })
    }

    pub fn id_to_label(&self, id: usize) -> Result<&str> {
        self.labels
            .get(id)
            .map(String::as_str)
            .ok_or(Error::UnknownId { field: self.field, id, size: self.labels.len() })
    }

    pub fn field(&self) -> LabelField {
        self.field
    }

    /// Labels in id order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// The category and condition vocabularies of one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelVocabulary {
    category:  Vocabulary,
    condition: Vocabulary,
}

impl LabelVocabulary {
    pub fn build(records: &[DataRecord]) -> Self {
        Self {
            category:  Vocabulary::build(records, LabelField::Category),
            condition: Vocabulary::build(records, LabelField::Condition),
        }
    }

    pub fn field(&self, field: LabelField) -> &Vocabulary {
        match field {
            LabelField::Category  => &self.category,
            LabelField::Condition => &self.condition,
        }
    }

    pub fn category(&self) -> &Vocabulary {
        &self.category
    }

    pub fn condition(&self) -> &Vocabulary {
        &self.condition
    }

    pub fn label_to_id(&self, field: LabelField, label: &str) -> Result<usize> {
        self.field(field).label_to_id(label)
    }

    pub fn id_to_label(&self, field: LabelField, id: usize) -> Result<&str> {
        self.field(field).id_to_label(id)
    }

    pub fn num_categories(&self) -> usize {
        self.category.len()
    }

    pub fn num_conditions(&self) -> usize {
        self.condition.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;

    fn records() -> Vec<DataRecord> {
        vec![
            DataRecord::new("1", "shoes", "new"),
            DataRecord::new("2", "bags", "used"),
            DataRecord::new("3", "shoes", "worn"),
            DataRecord::new("4", "hats", "new"),
            DataRecord::new("5", "Belts", "used"),
        ]
    }

    #[test]
    fn test_ids_follow_lexicographic_order() {
        let v = Vocabulary::build(&records(), LabelField::Category);
        // Uppercase sorts before lowercase
        assert_eq!(v.labels(), &["Belts", "bags", "hats", "shoes"]);
        for (expected, label) in v.labels().iter().enumerate() {
            assert_eq!(v.label_to_id(label).unwrap(), expected);
        }
    }

    #[test]
    fn test_independent_of_row_order() {
        let original = LabelVocabulary::build(&records());
        let mut rng  = rand::thread_rng();
        for _ in 0..10 {
            let mut shuffled = records();
            shuffled.shuffle(&mut rng);
            assert_eq!(LabelVocabulary::build(&shuffled), original);
        }
    }

    #[test]
    fn test_round_trip() {
        let vocab = LabelVocabulary::build(&records());
        for field in LabelField::ALL {
            for label in vocab.field(field).labels() {
                let id = vocab.label_to_id(field, label).unwrap();
                assert_eq!(vocab.id_to_label(field, id).unwrap(), label);
            }
        }
    }

    #[test]
    fn test_unseen_label_and_id_are_lookup_errors() {
        let vocab = LabelVocabulary::build(&records());
        assert!(vocab.label_to_id(LabelField::Condition, "refurbished").unwrap_err().is_lookup());
        assert!(vocab.id_to_label(LabelField::Condition, 3).unwrap_err().is_lookup());
        assert_eq!(vocab.num_conditions(), 3);
    }

    #[test]
    fn test_empty_records_give_empty_vocabulary() {
        let v = Vocabulary::build(&[], LabelField::Category);
        assert!(v.is_empty());
        assert!(v.label_to_id("shoes").is_err());
    }
}
