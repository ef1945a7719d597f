//! Raster operations
//!
//! - **clip**: extract the cells covering a map extent
//! - **points**: convert valid cells to sample points
//! - **algebra**: cell-by-cell arithmetic on aligned grids

mod algebra;
mod clip;
mod points;

pub use algebra::{band_math, band_math_binary, difference, square, GRID_TOLERANCE};
pub use clip::{clip_to_extent, ClippedRaster, Coverage};
pub use points::raster_to_points;
