//! # SlumpDoD Core
//!
//! Core types and I/O for the SlumpDoD pre-disturbance terrain pipeline.
//!
//! This crate provides:
//! - `Raster<T>`: Generic georeferenced raster grid
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `Extent`: Axis-aligned bounding rectangle in map units
//! - `CRS`: Coordinate Reference System handling
//! - Vector features with typed attributes
//! - I/O for GeoTIFF rasters and GeoJSON feature collections

pub mod crs;
pub mod error;
pub mod extent;
pub mod io;
pub mod raster;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use extent::Extent;
pub use raster::{GeoTransform, Raster, RasterElement, RasterStatistics};
