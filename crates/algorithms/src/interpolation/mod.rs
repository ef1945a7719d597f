//! Surface reconstruction from scattered points
//!
//! Donor points are triangulated (Delaunay, via `spade`) and the
//! triangulation is rasterized onto a target grid:
//! - Natural Neighbour (Sibson): the pipeline default
//! - Linear: barycentric interpolation inside each triangle

mod surface;

pub use surface::{
    reconstruct_surface, SurfaceMethod, SurfaceParams, SurfaceResult, MIN_DONOR_POINTS,
};

/// A sample point with x, y coordinates and a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl SamplePoint {
    pub fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }
}
