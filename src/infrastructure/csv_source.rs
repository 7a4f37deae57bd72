//! CSV row source
//!
//! Reads category rows from a CSV export of the chart-of-accounts sheet.
//! Columns are addressed by spreadsheet letter, as in the sheet itself.
//!
//! A CSV export holds a single worksheet. Export the income and expense sheet
//! and the balance sheet separately and import each file; rows from other
//! worksheets are imported too if their id cell is numeric.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::{non_empty, parse_column, DomainError, RawRow};
use crate::infrastructure::traits::RowSource;

/// Zero-based column positions of the cells the importer reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub id: usize,
    pub group: usize,
    pub name: usize,
    pub range_a: usize,
    pub range_b: usize,
}

impl ColumnMap {
    /// Build from spreadsheet letters, e.g. `("A", "B", "C", "M", "N")`.
    pub fn from_letters(
        id: &str,
        group: &str,
        name: &str,
        range_a: &str,
        range_b: &str,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            id: parse_column(id)?,
            group: parse_column(group)?,
            name: parse_column(name)?,
            range_a: parse_column(range_a)?,
            range_b: parse_column(range_b)?,
        })
    }
}

impl Default for ColumnMap {
    fn default() -> Self {
        // A, B, C, M, N
        Self {
            id: 0,
            group: 1,
            name: 2,
            range_a: 12,
            range_b: 13,
        }
    }
}

/// Row source reading a CSV file.
#[derive(Debug, Clone)]
pub struct CsvRowSource {
    path: PathBuf,
    columns: ColumnMap,
    has_headers: bool,
}

impl CsvRowSource {
    pub fn new(path: &Path, columns: ColumnMap, has_headers: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            columns,
            has_headers,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RowSource for CsvRowSource {
    fn read_rows(&self) -> io::Result<Vec<RawRow>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(self.has_headers)
            .flexible(true)
            .from_path(&self.path)?;

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let cell = |idx: usize| record.get(idx).and_then(non_empty);
            rows.push(RawRow {
                id: cell(self.columns.id),
                group_path: cell(self.columns.group),
                name: cell(self.columns.name),
                range_a: cell(self.columns.range_a),
                range_b: cell(self.columns.range_b),
            });
        }
        debug!("read {} rows from {}", rows.len(), self.path.display());
        Ok(rows)
    }
}
