// ============================================================
// Core Traits
// ============================================================
// The dataset is written against these abstractions rather than
// concrete loaders, so a table can come from a CSV file, a
// workbook, or an in-memory fixture in tests.

use crate::domain::record::DataRecord;
use crate::error::Result;

// ─── LabelSource ──────────────────────────────────────────────────────────────
/// Anything that can produce the filtered product rows.
///
/// Implementations:
///   - TableLoader → `.csv` / `.tsv` / `.xlsx` files on disk
///   - Vec<DataRecord> → rows already in memory
pub trait LabelSource {
    /// Rows with `id`, `category` and `condition` all present,
    /// in source order.
    fn load_records(&self) -> Result<Vec<DataRecord>>;

    /// Where the rows come from; used in error messages and logs.
    fn describe(&self) -> String;
}

impl LabelSource for Vec<DataRecord> {
    fn load_records(&self) -> Result<Vec<DataRecord>> {
        Ok(self.clone())
    }

    fn describe(&self) -> String {
        format!("<{} in-memory records>", self.len())
    }
}
