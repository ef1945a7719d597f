//! Statistics of a raster inside a polygon footprint
//!
//! - **zonal**: footprint rasterization (cell-centre rule) and zonal
//!   statistics of DoD / squared DoD rasters

pub mod zonal;

pub use zonal::{footprint_zone, zonal_mean, zonal_statistics, ZonalMean, ZonalResult};
