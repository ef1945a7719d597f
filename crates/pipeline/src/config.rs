//! Pipeline configuration

use serde::{Deserialize, Serialize};
use slumpdod_algorithms::interpolation::SurfaceMethod;
use slumpdod_core::Raster;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};

/// Default buffer radius around each footprint, in map units (metres)
pub const DEFAULT_BUFFER_DISTANCE: f64 = 50.0;

/// Default identifier attribute
pub const DEFAULT_ID_FIELD: &str = "UniqueID";

/// Relative tolerance when comparing the configured cell size to the DEM
const CELL_SIZE_TOLERANCE: f64 = 1e-6;

/// Attribute holding each feature's integer identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdField {
    /// Attribute name
    Name(String),
    /// Attribute position in property order
    Index(usize),
}

impl Default for IdField {
    fn default() -> Self {
        IdField::Name(DEFAULT_ID_FIELD.to_string())
    }
}

impl std::fmt::Display for IdField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdField::Name(name) => write!(f, "'{}'", name),
            IdField::Index(i) => write!(f, "attribute #{}", i),
        }
    }
}

/// Everything a batch run needs. Paths are explicit; nothing is read from
/// a process-wide workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory holding the polygon datasets; outputs are written below it
    pub workspace: PathBuf,
    /// Shared elevation raster (GeoTIFF)
    pub dem: PathBuf,
    /// Output cell size; defaults to the DEM's
    pub cell_size: Option<f64>,
    pub id_field: IdField,
    /// Buffer radius in map units
    pub buffer_distance: f64,
    /// Also produce squared DoDs and RMSE tables
    pub rmse: bool,
    pub method: SurfaceMethod,
    /// Explicit dataset files; empty means every `*.geojson` in the workspace
    pub datasets: Vec<PathBuf>,
    /// Write per-feature rasters (clip, pre-disturbance, DoD)
    pub keep_intermediates: bool,
}

impl PipelineConfig {
    pub fn new(workspace: impl Into<PathBuf>, dem: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            dem: dem.into(),
            cell_size: None,
            id_field: IdField::default(),
            buffer_distance: DEFAULT_BUFFER_DISTANCE,
            rmse: true,
            method: SurfaceMethod::default(),
            datasets: Vec::new(),
            keep_intermediates: true,
        }
    }

    /// Check the configuration without touching raster contents.
    pub fn validate(&self) -> Result<()> {
        if !self.workspace.is_dir() {
            return Err(PipelineError::config(format!(
                "workspace {} is not a directory",
                self.workspace.display()
            )));
        }
        if !self.dem.is_file() {
            return Err(PipelineError::config(format!(
                "DEM {} does not exist",
                self.dem.display()
            )));
        }
        if let Some(cs) = self.cell_size {
            if !cs.is_finite() || cs <= 0.0 {
                return Err(PipelineError::config(format!(
                    "cell size must be positive, got {}",
                    cs
                )));
            }
        }
        if !self.buffer_distance.is_finite() || self.buffer_distance <= 0.0 {
            return Err(PipelineError::config(format!(
                "buffer distance must be positive, got {}",
                self.buffer_distance
            )));
        }
        if let IdField::Name(name) = &self.id_field {
            if name.trim().is_empty() {
                return Err(PipelineError::config("identifier attribute name is empty"));
            }
        }
        for path in &self.datasets {
            if !path.is_file() {
                return Err(PipelineError::config(format!(
                    "dataset {} does not exist",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    /// Check the DEM grid against the configuration and return the
    /// effective cell size.
    pub fn check_dem(&self, dem: &Raster<f64>) -> Result<f64> {
        let gt = dem.transform();
        if !gt.is_north_up() {
            return Err(PipelineError::config("DEM must be north-up (no rotation)"));
        }
        let width = gt.pixel_width.abs();
        let height = gt.pixel_height.abs();
        if !close(width, height) {
            return Err(PipelineError::config(format!(
                "DEM cells must be square, got {} x {}",
                width, height
            )));
        }
        if dem.is_empty() {
            return Err(PipelineError::config("DEM has no cells"));
        }

        match self.cell_size {
            Some(cs) if !close(cs, width) => Err(PipelineError::config(format!(
                "configured cell size {} does not match the DEM cell size {}",
                cs, width
            ))),
            _ => Ok(width),
        }
    }

    /// Root folder for all outputs
    pub fn output_root(&self) -> &Path {
        &self.workspace
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= CELL_SIZE_TOLERANCE * a.abs().max(b.abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use slumpdod_core::GeoTransform;

    fn dem(cell: f64) -> Raster<f64> {
        let mut r = Raster::filled(4, 4, 1.0);
        r.set_transform(GeoTransform::new(0.0, 4.0 * cell, cell, -cell));
        r
    }

    #[test]
    fn test_defaults() {
        let cfg = PipelineConfig::new("/tmp", "/tmp/dem.tif");
        assert_eq!(cfg.buffer_distance, 50.0);
        assert!(cfg.rmse);
        assert_eq!(cfg.id_field, IdField::Name("UniqueID".into()));
        assert_eq!(cfg.method, SurfaceMethod::NaturalNeighbor);
    }

    #[test]
    fn test_validate_rejects_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = PipelineConfig::new(dir.path(), dir.path().join("missing.tif"));
        assert!(matches!(cfg.validate(), Err(PipelineError::Config(_))));

        let cfg = PipelineConfig::new(dir.path().join("nope"), dir.path().join("missing.tif"));
        assert!(matches!(cfg.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let dem_path = dir.path().join("dem.tif");
        std::fs::write(&dem_path, b"").unwrap();

        let mut cfg = PipelineConfig::new(dir.path(), &dem_path);
        assert!(cfg.validate().is_ok());

        cfg.buffer_distance = 0.0;
        assert!(cfg.validate().is_err());

        cfg.buffer_distance = 50.0;
        cfg.cell_size = Some(-1.0);
        assert!(cfg.validate().is_err());

        cfg.cell_size = None;
        cfg.id_field = IdField::Name("  ".into());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_cell_size_defaults_to_dem() {
        let cfg = PipelineConfig::new("/tmp", "/tmp/dem.tif");
        assert_eq!(cfg.check_dem(&dem(2.0)).unwrap(), 2.0);
    }

    #[test]
    fn test_cell_size_must_match_dem() {
        let mut cfg = PipelineConfig::new("/tmp", "/tmp/dem.tif");
        cfg.cell_size = Some(1.0);
        assert!(cfg.check_dem(&dem(1.0)).is_ok());
        assert!(matches!(cfg.check_dem(&dem(0.5)), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let mut cfg = PipelineConfig::new("/data/ws", "/data/dem.tif");
        cfg.id_field = IdField::Index(2);
        cfg.method = SurfaceMethod::Linear;
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains(r#""id_field":{"index":2}"#));
        assert!(json.contains(r#""method":"linear""#));

        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id_field, IdField::Index(2));
    }
}
