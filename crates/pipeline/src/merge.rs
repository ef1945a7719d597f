//! Merging statistics tables
//!
//! Tables are concatenated in order. The merged table carries the union of
//! all columns in first-seen order; cells a source table lacks stay empty.

use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::table::StatisticsTable;

/// Concatenate tables, keeping every row and the union of columns.
pub fn merge_tables<'a>(tables: impl IntoIterator<Item = &'a StatisticsTable>) -> StatisticsTable {
    let tables: Vec<&StatisticsTable> = tables.into_iter().collect();

    let mut columns: Vec<String> = Vec::new();
    for table in &tables {
        for col in table.columns() {
            if !columns.contains(col) {
                columns.push(col.clone());
            }
        }
    }

    let mut rows: Vec<Vec<String>> = Vec::new();
    for table in tables {
        let mapping: Vec<Option<usize>> = columns.iter().map(|c| table.column_index(c)).collect();
        for row in table.rows() {
            rows.push(
                mapping
                    .iter()
                    .map(|idx| idx.and_then(|i| row.get(i).cloned()).unwrap_or_default())
                    .collect(),
            );
        }
    }
    StatisticsTable::from_rows(columns, rows)
}

/// Read and merge table files in the given order.
///
/// # Errors
/// `Merge` if any file is missing or is not a readable table.
pub fn merge_files<P: AsRef<Path>>(paths: &[P]) -> Result<StatisticsTable> {
    let mut tables = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PipelineError::Merge(format!("missing table {}", path.display())));
        }
        let table = StatisticsTable::read_csv(path).map_err(|e| {
            PipelineError::Merge(format!("malformed table {}: {}", path.display(), e))
        })?;
        tables.push(table);
    }
    Ok(merge_tables(&tables))
}

/// Expected versus merged row counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub table: String,
    pub expected: usize,
    pub merged: usize,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.expected == self.merged
    }

    pub fn missing(&self) -> usize {
        self.expected.saturating_sub(self.merged)
    }
}

/// Compare the merged row count with the number of features expected,
/// warning when they differ.
pub fn reconcile(table: &str, expected: usize, merged: usize) -> Reconciliation {
    let rec = Reconciliation {
        table: table.to_string(),
        expected,
        merged,
    };
    if rec.is_consistent() {
        debug!("{}: {} rows as expected", table, merged);
    } else {
        warn!(
            "{}: {} rows merged but {} features expected ({} missing)",
            table,
            merged,
            expected,
            rec.missing()
        );
    }
    rec
}
