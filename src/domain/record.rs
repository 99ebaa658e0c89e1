// ============================================================
// DataRecord: one labelled product
// ============================================================
// A row of the label table that survived filtering: all three
// required values were present. The id names the image file
// (`<id>.jpg`); category and condition are raw label strings
// that the vocabulary turns into dense ids.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A product row with every required value present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRecord {
    /// Identifier, rendered as a plain string
    pub id: String,

    /// Raw category label, e.g. "shoes"
    pub category: String,

    /// Raw condition label, e.g. "used - good"
    pub condition: String,
}

impl DataRecord {
    pub fn new(
        id:        impl Into<String>,
        category:  impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        Self {
            id:        id.into(),
            category:  category.into(),
            condition: condition.into(),
        }
    }

    /// Raw label string for one of the two label fields.
    pub fn label(&self, field: LabelField) -> &str {
        match field {
            LabelField::Category  => &self.category,
            LabelField::Condition => &self.condition,
        }
    }

    /// False when any of the three values is blank.
    pub fn is_complete(&self) -> bool {
        [&self.id, &self.category, &self.condition]
            .iter()
            .all(|value| !value.trim().is_empty())
    }

    /// File name of this record's image inside the image root.
    pub fn image_file_name(&self) -> String {
        format!("{}.jpg", self.id)
    }
}

/// The two label spaces the model predicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelField {
    Category,
    Condition,
}

impl LabelField {
    pub const ALL: [LabelField; 2] = [LabelField::Category, LabelField::Condition];

    /// Column name in the label table.
    pub fn column(self) -> &'static str {
        match self {
            LabelField::Category  => "category",
            LabelField::Condition => "condition",
        }
    }
}

impl fmt::Display for LabelField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_file_name_uses_plain_id() {
        let r = DataRecord::new("1042", "shoes", "new");
        assert_eq!(r.image_file_name(), "1042.jpg");
    }

    #[test]
    fn test_blank_values_are_incomplete() {
        assert!(DataRecord::new("1", "shoes", "new").is_complete());
        assert!(!DataRecord::new("1", "", "new").is_complete());
        assert!(!DataRecord::new(" ", "shoes", "new").is_complete());
    }

    #[test]
    fn test_label_selects_field() {
        let r = DataRecord::new("7", "bags", "worn");
        assert_eq!(r.label(LabelField::Category), "bags");
        assert_eq!(r.label(LabelField::Condition), "worn");
    }
}
