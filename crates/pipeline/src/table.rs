//! Statistics tables
//!
//! A table is an ordered list of column names plus rows of text cells,
//! written and read as CSV. Per-feature tables carry one row keyed by the
//! `ZONE_ID` column.

use csv::{ReaderBuilder, Writer};
use slumpdod_algorithms::statistics::{ZonalMean, ZonalResult};
use std::path::Path;

use crate::dataset::FeatureId;
use crate::error::{PipelineError, Result};

pub const DATASET: &str = "DATASET";
pub const ZONE_ID: &str = "ZONE_ID";

/// Columns of an area / volume table
pub const ZONAL_COLUMNS: [&str; 13] = [
    DATASET, ZONE_ID, "COUNT", "AREA", "MIN", "MAX", "RANGE", "MEAN", "STD", "SUM", "VOLUME",
    "MEDIAN", "PCT90",
];

/// Columns of an RMSE table
pub const RMSE_COLUMNS: [&str; 6] = [DATASET, ZONE_ID, "COUNT", "AREA", "MEAN", "RMSE"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticsTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl StatisticsTable {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Table from rows already matching `columns` in width
    pub(crate) fn from_rows(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self { columns, rows }
    }

    /// One-row table of area / volume statistics
    pub fn from_zonal(dataset: &str, id: FeatureId, stats: &ZonalResult) -> Self {
        let mut table = Self::new(ZONAL_COLUMNS);
        table.rows.push(vec![
            dataset.to_string(),
            id.to_string(),
            stats.count.to_string(),
            stats.area.to_string(),
            stats.min.to_string(),
            stats.max.to_string(),
            stats.range.to_string(),
            stats.mean.to_string(),
            stats.std_dev.to_string(),
            stats.sum.to_string(),
            stats.volume.to_string(),
            stats.median.to_string(),
            stats.pct90.to_string(),
        ]);
        table
    }

    /// One-row table of squared-DoD mean and RMSE
    pub fn from_rmse(dataset: &str, id: FeatureId, stats: &ZonalMean) -> Self {
        let mut table = Self::new(RMSE_COLUMNS);
        table.rows.push(vec![
            dataset.to_string(),
            id.to_string(),
            stats.count.to_string(),
            stats.area.to_string(),
            stats.mean.to_string(),
            stats.rmse().to_string(),
        ]);
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a row; its length must match the column count.
    pub fn push_row(&mut self, row: Vec<String>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(PipelineError::Merge(format!(
                "row has {} cells, table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Cell of `row` in column `column`
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(col)).map(String::as_str)
    }

    /// Cell parsed as a number
    pub fn get_f64(&self, row: usize, column: &str) -> Option<f64> {
        self.get(row, column).and_then(|v| v.parse().ok())
    }

    /// Row whose `ZONE_ID` equals `id`
    pub fn find_zone(&self, id: FeatureId) -> Option<usize> {
        let col = self.column_index(ZONE_ID)?;
        let key = id.to_string();
        self.rows.iter().position(|r| r.get(col) == Some(&key))
    }

    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_path(path.as_ref())?;
        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if columns.is_empty() {
            return Err(PipelineError::Merge(format!(
                "{} has no header row",
                path.as_ref().display()
            )));
        }

        let mut table = Self::new(columns);
        for record in reader.records() {
            let record = record?;
            table.push_row(record.iter().map(str::to_string).collect())?;
        }
        Ok(table)
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = Writer::from_path(path)?;
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush().map_err(|e| PipelineError::io(path, e))?;
        Ok(())
    }
}
