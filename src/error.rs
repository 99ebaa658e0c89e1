// ============================================================
// Error Taxonomy
// ============================================================
// Every failure the library can report, as one enum.
//
// Nothing in this crate retries or substitutes a placeholder:
// the error goes straight back to the immediate caller, who
// decides whether to skip the sample, retry, or abort.
//
//   Parse            : label table unreadable or missing a column
//   MissingResource  : "<id>.jpg" not found under the image root
//   Decode           : image file present but not decodable
//   Lookup           : label / id never seen when the vocabulary was built
//   Index            : sample index past the end of the dataset
//   Configuration    : model pieces that do not fit together
//   EmptyDataset     : vocabulary / weights requested on zero records
//   InvalidTransform : bad Resize / CenterCrop / Normalize arguments
//   Batch            : samples whose image shapes cannot be stacked

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::record::LabelField;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot parse label table {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("cannot read label table {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("cannot read workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("image not found: {path}")]
    MissingResource { path: PathBuf },

    #[error("cannot decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("unknown {field} label '{label}'")]
    UnknownLabel { field: LabelField, label: String },

    #[error("unknown {field} id {id} (vocabulary has {size} labels)")]
    UnknownId {
        field: LabelField,
        id:    usize,
        size:  usize,
    },

    #[error("sample index {index} out of range for dataset of length {len}")]
    Index { index: usize, len: usize },

    #[error("invalid model configuration: {0}")]
    Configuration(String),

    #[error("dataset is empty: every row of {origin} is missing id, category or condition")]
    EmptyDataset { origin: String },

    #[error("cannot batch samples: {0}")]
    Batch(String),

    #[error("invalid transform: {0}")]
    InvalidTransform(String),

    #[error("cannot load backbone weights from {path}: {reason}")]
    Weights { path: PathBuf, reason: String },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// True for both flavours of vocabulary miss (label or id).
    pub fn is_lookup(&self) -> bool {
        matches!(self, Error::UnknownLabel { .. } | Error::UnknownId { .. })
    }

    /// True when the table itself could not be understood.
    pub fn is_parse(&self) -> bool {
        matches!(
            self,
            Error::Parse { .. } | Error::Csv { .. } | Error::Workbook { .. }
        )
    }
}
