//! # SlumpDoD Algorithms
//!
//! Geoprocessing operations used by the pre-disturbance pipeline.
//!
//! ## Categories
//!
//! - **raster**: Clip to extent, raster to points, raster algebra (difference, square)
//! - **vector**: Buffer, footprint masking, extents of geometries
//! - **interpolation**: Delaunay triangulation rasterized by natural-neighbour
//!   or linear interpolation (backed by `spade`)
//! - **statistics**: Zonal statistics of a raster inside a polygon footprint

pub(crate) mod maybe_rayon;

pub mod interpolation;
pub mod raster;
pub mod statistics;
pub mod vector;
