//! Affine geotransformation for rasters

use crate::extent::Extent;
use serde::{Deserialize, Serialize};

/// Affine transformation coefficients for georeferencing rasters.
///
/// Converts between pixel coordinates (col, row) and map coordinates (x, y):
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// DEMs handled by the pipeline are north-up, so the rotation terms are
/// zero and `pixel_height` is negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Pixel width (cell size in X direction)
    pub pixel_width: f64,
    /// Pixel height (cell size in Y direction, usually negative)
    pub pixel_height: f64,
    /// Rotation about X axis (usually 0)
    pub row_rotation: f64,
    /// Rotation about Y axis (usually 0)
    pub col_rotation: f64,
}

impl GeoTransform {
    /// Create a new GeoTransform with no rotation (north-up image)
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Convert pixel coordinates to map coordinates of the pixel center
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.pixel_to_geo_f(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Convert pixel coordinates to map coordinates of the top-left corner
    pub fn pixel_to_geo_corner(&self, col: usize, row: usize) -> (f64, f64) {
        self.pixel_to_geo_f(col as f64, row as f64)
    }

    fn pixel_to_geo_f(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.origin_x + col * self.pixel_width + row * self.row_rotation;
        let y = self.origin_y + col * self.col_rotation + row * self.pixel_height;
        (x, y)
    }

    /// Convert map coordinates to fractional pixel coordinates
    ///
    /// Use `.floor()` to get integer indices.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;

        if det.abs() < 1e-10 {
            return (f64::NAN, f64::NAN);
        }

        let dx = x - self.origin_x;
        let dy = y - self.origin_y;

        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (-self.col_rotation * dx + self.pixel_width * dy) / det;

        (col, row)
    }

    /// Cell size (assumes square pixels and no rotation)
    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// Area of one cell in squared map units
    pub fn cell_area(&self) -> f64 {
        (self.pixel_width * self.pixel_height).abs()
    }

    /// Check if this is a north-up image (no rotation)
    pub fn is_north_up(&self) -> bool {
        self.row_rotation.abs() < 1e-10
            && self.col_rotation.abs() < 1e-10
            && self.pixel_height < 0.0
    }

    /// Map extent covered by a raster of the given dimensions
    pub fn extent(&self, width: usize, height: usize) -> Extent {
        let corners = [
            self.pixel_to_geo_corner(0, 0),
            self.pixel_to_geo_corner(width, 0),
            self.pixel_to_geo_corner(0, height),
            self.pixel_to_geo_corner(width, height),
        ];

        let mut extent = Extent::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for (x, y) in corners {
            extent.min_x = extent.min_x.min(x);
            extent.min_y = extent.min_y.min(y);
            extent.max_x = extent.max_x.max(x);
            extent.max_y = extent.max_y.max(y);
        }
        extent
    }

    /// Whether both transforms describe exactly the same grid: same cell
    /// size and same origin, within `tolerance` map units.
    pub fn same_grid(&self, other: &GeoTransform, tolerance: f64) -> bool {
        (self.pixel_width - other.pixel_width).abs() <= tolerance
            && (self.pixel_height - other.pixel_height).abs() <= tolerance
            && (self.origin_x - other.origin_x).abs() <= tolerance
            && (self.origin_y - other.origin_y).abs() <= tolerance
            && (self.row_rotation - other.row_rotation).abs() <= tolerance
            && (self.col_rotation - other.col_rotation).abs() <= tolerance
    }

    /// Transform of a window starting at (`col_off`, `row_off`) of this grid
    pub fn window(&self, col_off: usize, row_off: usize) -> GeoTransform {
        let (x, y) = self.pixel_to_geo_corner(col_off, row_off);
        GeoTransform {
            origin_x: x,
            origin_y: y,
            ..*self
        }
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pixel_to_geo_roundtrip() {
        let gt = GeoTransform::new(100.0, 200.0, 10.0, -10.0);

        let (x, y) = gt.pixel_to_geo(5, 10);
        let (col, row) = gt.geo_to_pixel(x, y);

        assert_relative_eq!(col, 5.5, epsilon = 1e-10);
        assert_relative_eq!(row, 10.5, epsilon = 1e-10);
    }

    #[test]
    fn test_extent() {
        let gt = GeoTransform::new(0.0, 100.0, 1.0, -1.0);
        let extent = gt.extent(100, 50);

        assert_relative_eq!(extent.min_x, 0.0, epsilon = 1e-10);
        assert_relative_eq!(extent.min_y, 50.0, epsilon = 1e-10);
        assert_relative_eq!(extent.max_x, 100.0, epsilon = 1e-10);
        assert_relative_eq!(extent.max_y, 100.0, epsilon = 1e-10);
    }

    #[test]
    fn test_window_and_same_grid() {
        let gt = GeoTransform::new(500.0, 900.0, 2.0, -2.0);
        let win = gt.window(3, 4);

        assert_relative_eq!(win.origin_x, 506.0, epsilon = 1e-10);
        assert_relative_eq!(win.origin_y, 892.0, epsilon = 1e-10);
        assert!(win.same_grid(&gt.window(3, 4), 1e-9));
        assert!(!win.same_grid(&gt, 1e-9));
        assert_relative_eq!(gt.cell_area(), 4.0, epsilon = 1e-12);
    }
}
