//! Run reports
//!
//! Per-feature, per-dataset and whole-run records, serialized to
//! `run_summary.json` at the end of a batch.

use serde::Serialize;
use slumpdod_algorithms::statistics::ZonalResult;
use slumpdod_core::RasterStatistics;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::dataset::FeatureId;
use crate::error::{PipelineError, Result, SkipReason};
use crate::merge::Reconciliation;

/// Result of a processed feature
#[derive(Debug, Clone, Serialize)]
pub struct FeatureReport {
    pub id: FeatureId,
    /// Share of the buffered extent covered by the DEM
    pub coverage: f64,
    pub donor_count: usize,
    /// Reconstructed cells outside the donors' convex hull
    pub hull_gaps: usize,
    pub dod: RasterStatistics,
    pub zonal: ZonalResult,
    pub rmse: Option<f64>,
    pub elapsed_secs: f64,
}

/// A feature that was left out, and why
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFeature {
    pub id: FeatureId,
    #[serde(flatten)]
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub enum FeatureOutcome {
    Processed(Box<FeatureReport>),
    Skipped(SkippedFeature),
}

impl FeatureOutcome {
    pub fn id(&self) -> FeatureId {
        match self {
            FeatureOutcome::Processed(report) => report.id,
            FeatureOutcome::Skipped(skip) => skip.id,
        }
    }

    pub fn is_processed(&self) -> bool {
        matches!(self, FeatureOutcome::Processed(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetReport {
    pub name: String,
    pub source: PathBuf,
    pub feature_count: usize,
    pub processed: Vec<FeatureReport>,
    pub skipped: Vec<SkippedFeature>,
    pub zonal_table: PathBuf,
    pub rmse_table: Option<PathBuf>,
    pub reconciliation: Vec<Reconciliation>,
    pub elapsed_secs: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub config: PipelineConfig,
    /// Effective output cell size
    pub cell_size: f64,
    pub datasets: Vec<DatasetReport>,
    pub merged_zonal_table: PathBuf,
    pub merged_rmse_table: Option<PathBuf>,
    pub reconciliation: Vec<Reconciliation>,
    pub processed: usize,
    pub skipped: usize,
    pub elapsed_secs: f64,
}

impl RunSummary {
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| PipelineError::io(path, e))
    }

    pub fn feature_count(&self) -> usize {
        self.processed + self.skipped
    }
}

/// Elapsed time in seconds, minutes and hours
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    format!("{:.2} s ({:.2} min, {:.3} h)", secs, secs / 60.0, secs / 3600.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(90)), "90.00 s (1.50 min, 0.025 h)");
    }

    #[test]
    fn test_skipped_feature_json() {
        let skip = SkippedFeature {
            id: FeatureId(4),
            reason: SkipReason::EmptyZone,
        };
        let json = serde_json::to_string(&skip).unwrap();
        assert_eq!(json, r#"{"id":4,"reason":"empty_zone"}"#);
    }
}
