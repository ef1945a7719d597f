//! Coordinate Reference System handling

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System as read from a GeoTIFF GeoKey directory
///
/// GeoJSON datasets carry no CRS and are assumed to share the DEM's
/// projected CRS, which every derived raster inherits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CRS {
    epsg: u32,
    /// Geographic (lat/lon) rather than projected
    geographic: bool,
}

impl CRS {
    /// Projected CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            epsg: code,
            geographic: false,
        }
    }

    /// Geographic CRS from an EPSG code
    pub fn geographic_epsg(code: u32) -> Self {
        Self {
            epsg: code,
            geographic: true,
        }
    }

    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    /// Geographic CRSs have angular units; areas and volumes are meaningless
    pub fn is_geographic(&self) -> bool {
        self.geographic
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}
