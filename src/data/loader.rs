// ============================================================
// Label Table Loader
// ============================================================
// Reads the product label table and keeps only the rows that
// can become samples.
//
// Supported formats (chosen by file extension):
//   .csv / .tsv               → csv crate
//   .xlsx / .xlsm / .xls / .ods → calamine, first worksheet
//
// In both cases the first row is the header. The table must
// contain the columns `id`, `category` and `condition` (any
// order, extra columns ignored); otherwise loading fails with
// a Parse error.
//
// A row is dropped when any of the three values is missing.
// "Missing" means an empty cell, a workbook error cell, or one
// of the usual NA markers ("NA", "NaN", "null", "#N/A", ...).
// Surviving rows keep their original order.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};

use crate::domain::record::DataRecord;
use crate::domain::traits::LabelSource;
use crate::error::{Error, Result};

/// Columns every label table must provide.
pub const REQUIRED_COLUMNS: [&str; 3] = ["id", "category", "condition"];

/// Cell contents treated as a missing value.
const NA_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan",
    "1.#IND", "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None",
    "n/a", "nan", "null",
];

/// Loads a label table from a file on disk.
pub struct TableLoader {
    path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableFormat {
    Delimited(u8),
    Workbook,
}

/// Header plus raw rows; `None` marks a missing cell.
struct RawTable {
    header: Vec<String>,
    rows:   Vec<Vec<Option<String>>>,
}

impl TableLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn format(&self) -> Result<TableFormat> {
        let ext = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("csv") => Ok(TableFormat::Delimited(b',')),
            Some("tsv") => Ok(TableFormat::Delimited(b'\t')),
            Some("xlsx" | "xlsm" | "xls" | "xlsb" | "ods") => Ok(TableFormat::Workbook),
            other => Err(Error::Parse {
                path:   self.path.clone(),
                reason: format!(
                    "unsupported table format {:?} (expected csv, tsv, xlsx, xls or ods)",
                    other.unwrap_or("")
                ),
            }),
        }
    }
}

impl LabelSource for TableLoader {
    fn load_records(&self) -> Result<Vec<DataRecord>> {
        let table = match self.format()? {
            TableFormat::Delimited(delimiter) => read_delimited(&self.path, delimiter)?,
            TableFormat::Workbook             => read_workbook(&self.path)?,
        };

        let total   = table.rows.len();
        let records = filter_records(&self.path, table)?;

        tracing::info!(
            "Loaded {} labelled rows from '{}' ({} dropped for missing values)",
            records.len(),
            self.path.display(),
            total - records.len(),
        );
        Ok(records)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

fn read_delimited(path: &Path, delimiter: u8) -> Result<RawTable> {
    let csv_err = |source| Error::Csv { path: path.to_path_buf(), source };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;

    let header = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        rows.push(record.iter().map(cell_value).collect());
    }

    Ok(RawTable { header, rows })
}

fn read_workbook(path: &Path) -> Result<RawTable> {
    let wb_err = |source| Error::Workbook { path: path.to_path_buf(), source };

    let mut workbook = open_workbook_auto(path).map_err(wb_err)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::Parse {
            path:   path.to_path_buf(),
            reason: "workbook has no worksheets".to_string(),
        })?
        .map_err(wb_err)?;

    let mut rows = range.rows();
    let header = match rows.next() {
        Some(cells) => cells
            .iter()
            .map(|c| workbook_cell(c).unwrap_or_default())
            .collect(),
        None => Vec::new(),
    };
    let rows = rows
        .map(|cells| cells.iter().map(workbook_cell).collect())
        .collect();

    Ok(RawTable { header, rows })
}

/// Keep rows where id, category and condition are all present.
fn filter_records(path: &Path, table: RawTable) -> Result<Vec<DataRecord>> {
    let position = |name: &str| table.header.iter().position(|h| h == name);

    let (id_col, category_col, condition_col) =
        match (position("id"), position("category"), position("condition")) {
            (Some(i), Some(c), Some(d)) => (i, c, d),
            _ => {
                let missing: Vec<&str> = REQUIRED_COLUMNS
                    .iter()
                    .copied()
                    .filter(|c| position(c).is_none())
                    .collect();
                return Err(Error::Parse {
                    path:   path.to_path_buf(),
                    reason: format!(
                        "missing required column(s) {} (found: {})",
                        missing.join(", "),
                        table.header.join(", ")
                    ),
                });
            }
        };

    let cell = |row: &[Option<String>], col: usize| row.get(col).cloned().flatten();

    Ok(table
        .rows
        .iter()
        .filter_map(|row| {
            Some(DataRecord {
                id:        cell(row, id_col)?,
                category:  cell(row, category_col)?,
                condition: cell(row, condition_col)?,
            })
        })
        .collect())
}

/// Trimmed cell text, or `None` when the cell counts as missing.
fn cell_value(raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() || NA_MARKERS.contains(&value) {
        None
    } else {
        Some(value.to_string())
    }
}

fn workbook_cell(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s)              => cell_value(s),
        Data::Int(i)                 => Some(i.to_string()),
        Data::Float(f)               => Some(format_number(*f)),
        other                        => cell_value(&other.to_string()),
    }
}

/// Integral floats print without a fraction so `1042.0` names `1042.jpg`.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_table(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_drops_rows_with_missing_values() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write_table(
            dir.path(),
            "labels.csv",
            "id,condition,category,price\n\
             1,new,shoes,10\n\
             2,,bags,12\n\
             3,used,NaN,3\n\
             ,used,bags,4\n\
             5,worn,hats,\n",
        );

        let records = TableLoader::new(&path).load_records().unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "5"]);
        assert_eq!(records[1], DataRecord::new("5", "hats", "worn"));
    }

    #[test]
    fn test_missing_column_is_parse_error() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write_table(dir.path(), "labels.csv", "id,category\n1,shoes\n");

        let err = TableLoader::new(&path).load_records().unwrap_err();
        assert!(err.is_parse());
        assert!(err.to_string().contains("condition"));
    }

    #[test]
    fn test_all_rows_missing_gives_empty_not_error() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write_table(
            dir.path(),
            "labels.csv",
            "id,category,condition\n1,,new\n2,shoes,\n",
        );

        let records = TableLoader::new(&path).load_records().unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_tab_separated_and_short_rows() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write_table(
            dir.path(),
            "labels.tsv",
            "category\tid\tcondition\nshoes\t9\tnew\nbags\t10\n",
        );

        let records = TableLoader::new(&path).load_records().unwrap();
        assert_eq!(records, vec![DataRecord::new("9", "shoes", "new")]);
    }

    #[test]
    fn test_workbook_rows_filtered_in_order() {
        // id 1042 is a numeric cell, row 7 has a blank category and
        // row 8 an #N/A error cell for its condition
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/labels.xlsx");
        let records = TableLoader::new(&path).load_records().unwrap();

        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1042", "abc"]);
        assert_eq!(records[0], DataRecord::new("1042", "shoes", "new"));
        assert_eq!(records[0].image_file_name(), "1042.jpg");
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let err = TableLoader::new("labels.parquet").load_records().unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_na_markers_and_numbers() {
        assert_eq!(cell_value("  shoes "), Some("shoes".to_string()));
        assert_eq!(cell_value("#N/A"), None);
        assert_eq!(cell_value("   "), None);
        assert_eq!(format_number(1042.0), "1042");
        assert_eq!(format_number(2.5), "2.5");
    }
}
