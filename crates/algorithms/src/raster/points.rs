//! Raster to point conversion

use crate::interpolation::SamplePoint;
use slumpdod_core::raster::Raster;

/// Convert every valid cell of `raster` to a point at the cell center
/// carrying the cell value. No-data cells produce no point.
///
/// Points are emitted in row-major order.
pub fn raster_to_points(raster: &Raster<f64>) -> Vec<SamplePoint> {
    raster
        .valid_cells()
        .map(|(row, col, value)| {
            let (x, y) = raster.cell_center(row, col);
            SamplePoint::new(x, y, value)
        })
        .collect()
}
