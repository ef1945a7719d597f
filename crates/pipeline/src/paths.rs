//! Output folder layout and artifact naming
//!
//! Every artifact path is derived here from (dataset, feature, artifact),
//! so names are deterministic and the dataset name is part of every
//! per-feature file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::dataset::FeatureId;
use crate::error::{PipelineError, Result};

pub const BUFFER_DIR: &str = "00_SlumpBuffers";
pub const CLIP_DIR: &str = "01_ClippedDEMs";
pub const PREDISTURBANCE_DIR: &str = "02_PredisturbDEMs";
pub const DOD_DIR: &str = "03_DODs";
pub const FEATURE_ZONAL_PREFIX: &str = "04_IndZonalStats";
pub const FEATURE_RMSE_PREFIX: &str = "05_IndRMSEStats";
pub const FINAL_ZONAL_DIR: &str = "06_FinalZonalStats";
pub const FINAL_RMSE_DIR: &str = "07_FinalRMSEStats";
pub const SUMMARY_FILE: &str = "run_summary.json";

/// Per-feature artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureArtifact {
    ClippedDem,
    Predisturbance,
    Dod,
    DodSquared,
    ZonalTable,
    RmseTable,
}

impl FeatureArtifact {
    fn suffix(self) -> &'static str {
        match self {
            FeatureArtifact::ClippedDem => ".tif",
            FeatureArtifact::Predisturbance => "_predisturbance.tif",
            FeatureArtifact::Dod => "_dod.tif",
            FeatureArtifact::DodSquared => "_dodsq.tif",
            FeatureArtifact::ZonalTable => "_zs.csv",
            FeatureArtifact::RmseTable => "_rmse.csv",
        }
    }
}

/// Kinds of statistics table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    /// Area / volume statistics of the DoD
    Zonal,
    /// Mean of the squared DoD and RMSE
    Rmse,
}

impl TableKind {
    fn final_dir(self) -> &'static str {
        match self {
            TableKind::Zonal => FINAL_ZONAL_DIR,
            TableKind::Rmse => FINAL_RMSE_DIR,
        }
    }

    fn stem(self) -> &'static str {
        match self {
            TableKind::Zonal => "FinalStatistics",
            TableKind::Rmse => "FinalRMSE",
        }
    }

    /// Per-feature artifact holding this kind of table
    pub fn feature_artifact(self) -> FeatureArtifact {
        match self {
            TableKind::Zonal => FeatureArtifact::ZonalTable,
            TableKind::Rmse => FeatureArtifact::RmseTable,
        }
    }
}

/// Output folder layout rooted at the workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn buffer_dir(&self) -> PathBuf {
        self.root.join(BUFFER_DIR)
    }

    /// `00_SlumpBuffers/<ds>_<r>m_buf.geojson`
    pub fn buffer_path(&self, dataset: &str, distance: f64) -> PathBuf {
        self.buffer_dir()
            .join(format!("{}_{}m_buf.geojson", dataset, format_distance(distance)))
    }

    /// Folder of a per-feature artifact. Table folders are per dataset.
    pub fn feature_dir(&self, artifact: FeatureArtifact, dataset: &str) -> PathBuf {
        match artifact {
            FeatureArtifact::ClippedDem => self.root.join(CLIP_DIR),
            FeatureArtifact::Predisturbance => self.root.join(PREDISTURBANCE_DIR),
            FeatureArtifact::Dod | FeatureArtifact::DodSquared => self.root.join(DOD_DIR),
            FeatureArtifact::ZonalTable => {
                self.root.join(format!("{}_{}", FEATURE_ZONAL_PREFIX, dataset))
            }
            FeatureArtifact::RmseTable => {
                self.root.join(format!("{}_{}", FEATURE_RMSE_PREFIX, dataset))
            }
        }
    }

    /// `<folder>/<ds>_SlumpID_<id><suffix>`
    pub fn feature_path(&self, artifact: FeatureArtifact, dataset: &str, id: FeatureId) -> PathBuf {
        self.feature_dir(artifact, dataset)
            .join(format!("{}_SlumpID_{}{}", dataset, id, artifact.suffix()))
    }

    pub fn final_dir(&self, kind: TableKind) -> PathBuf {
        self.root.join(kind.final_dir())
    }

    /// `<final folder>/<ds>_FinalStatistics.csv` or `<ds>_FinalRMSE.csv`
    pub fn dataset_table_path(&self, kind: TableKind, dataset: &str) -> PathBuf {
        self.final_dir(kind)
            .join(format!("{}_{}.csv", dataset, kind.stem()))
    }

    /// `<final folder>/FinalStatistics_merged.csv` or `FinalRMSE_merged.csv`
    pub fn merged_table_path(&self, kind: TableKind) -> PathBuf {
        self.final_dir(kind).join(format!("{}_merged.csv", kind.stem()))
    }

    pub fn summary_path(&self) -> PathBuf {
        self.root.join(SUMMARY_FILE)
    }

    /// Create every folder a dataset's run writes to.
    pub fn prepare_dataset(&self, dataset: &str, rmse: bool, rasters: bool) -> Result<()> {
        ensure_dir(self.buffer_dir())?;
        if rasters {
            ensure_dir(self.feature_dir(FeatureArtifact::ClippedDem, dataset))?;
            ensure_dir(self.feature_dir(FeatureArtifact::Predisturbance, dataset))?;
            ensure_dir(self.feature_dir(FeatureArtifact::Dod, dataset))?;
        }
        ensure_dir(self.feature_dir(FeatureArtifact::ZonalTable, dataset))?;
        ensure_dir(self.final_dir(TableKind::Zonal))?;
        if rmse {
            ensure_dir(self.feature_dir(FeatureArtifact::RmseTable, dataset))?;
            ensure_dir(self.final_dir(TableKind::Rmse))?;
        }
        Ok(())
    }
}

/// Create `path` and its parents; succeeds if it already exists.
pub fn ensure_dir(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    fs::create_dir_all(path).map_err(|e| PipelineError::io(path, e))?;
    Ok(path.to_path_buf())
}

/// Whole distances print without a fractional part (`50`), others as-is (`12.5`).
fn format_distance(distance: f64) -> String {
    if distance.fract() == 0.0 && distance.abs() < 1e15 {
        format!("{}", distance as i64)
    } else {
        format!("{}", distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_names() {
        let layout = OutputLayout::new("/ws");
        let id = FeatureId(17);

        assert_eq!(
            layout.feature_path(FeatureArtifact::ClippedDem, "Peel", id),
            PathBuf::from("/ws/01_ClippedDEMs/Peel_SlumpID_17.tif")
        );
        assert_eq!(
            layout.feature_path(FeatureArtifact::Predisturbance, "Peel", id),
            PathBuf::from("/ws/02_PredisturbDEMs/Peel_SlumpID_17_predisturbance.tif")
        );
        assert_eq!(
            layout.feature_path(FeatureArtifact::Dod, "Peel", id),
            PathBuf::from("/ws/03_DODs/Peel_SlumpID_17_dod.tif")
        );
        assert_eq!(
            layout.feature_path(FeatureArtifact::DodSquared, "Peel", id),
            PathBuf::from("/ws/03_DODs/Peel_SlumpID_17_dodsq.tif")
        );
        assert_eq!(
            layout.feature_path(FeatureArtifact::ZonalTable, "Peel", id),
            PathBuf::from("/ws/04_IndZonalStats_Peel/Peel_SlumpID_17_zs.csv")
        );
        assert_eq!(
            layout.feature_path(FeatureArtifact::RmseTable, "Peel", id),
            PathBuf::from("/ws/05_IndRMSEStats_Peel/Peel_SlumpID_17_rmse.csv")
        );
    }

    #[test]
    fn test_table_names() {
        let layout = OutputLayout::new("/ws");
        assert_eq!(
            layout.dataset_table_path(TableKind::Zonal, "Peel"),
            PathBuf::from("/ws/06_FinalZonalStats/Peel_FinalStatistics.csv")
        );
        assert_eq!(
            layout.dataset_table_path(TableKind::Rmse, "Peel"),
            PathBuf::from("/ws/07_FinalRMSEStats/Peel_FinalRMSE.csv")
        );
        assert_eq!(
            layout.merged_table_path(TableKind::Zonal),
            PathBuf::from("/ws/06_FinalZonalStats/FinalStatistics_merged.csv")
        );
        assert_eq!(
            layout.merged_table_path(TableKind::Rmse),
            PathBuf::from("/ws/07_FinalRMSEStats/FinalRMSE_merged.csv")
        );
    }

    #[test]
    fn test_buffer_name() {
        let layout = OutputLayout::new("/ws");
        assert_eq!(
            layout.buffer_path("Peel", 50.0),
            PathBuf::from("/ws/00_SlumpBuffers/Peel_50m_buf.geojson")
        );
        assert_eq!(
            layout.buffer_path("Peel", 12.5),
            PathBuf::from("/ws/00_SlumpBuffers/Peel_12.5m_buf.geojson")
        );
    }

    #[test]
    fn test_names_are_deterministic() {
        let a = OutputLayout::new("/ws");
        let b = OutputLayout::new("/ws");
        for artifact in [FeatureArtifact::Dod, FeatureArtifact::ZonalTable] {
            assert_eq!(
                a.feature_path(artifact, "ds", FeatureId(-3)),
                b.feature_path(artifact, "ds", FeatureId(-3))
            );
        }
        assert_ne!(
            a.feature_path(FeatureArtifact::Dod, "ds1", FeatureId(1)),
            a.feature_path(FeatureArtifact::Dod, "ds2", FeatureId(1))
        );
    }

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b/c");
        ensure_dir(&target).unwrap();
        ensure_dir(&target).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn test_prepare_dataset_creates_folders() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        layout.prepare_dataset("Peel", true, false).unwrap();

        assert!(dir.path().join("00_SlumpBuffers").is_dir());
        assert!(dir.path().join("04_IndZonalStats_Peel").is_dir());
        assert!(dir.path().join("05_IndRMSEStats_Peel").is_dir());
        assert!(dir.path().join("07_FinalRMSEStats").is_dir());
        assert!(!dir.path().join("01_ClippedDEMs").exists());
    }
}
