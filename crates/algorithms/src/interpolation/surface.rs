//! Triangulated surface rasterization
//!
//! Builds a Delaunay triangulation of the donor points and samples it at
//! every cell center of the output grid. Interpolation is only defined
//! inside the donors' convex hull: cells outside it are left as no-data
//! (NaN) and counted in [`SurfaceResult::hull_gaps`]. Nothing is
//! extrapolated.

use crate::maybe_rayon::*;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use slumpdod_core::raster::{GeoTransform, Raster};
use slumpdod_core::{Error, Result, CRS};
use spade::{DelaunayTriangulation, FloatTriangulation, HasPosition, Point2, Triangulation};

use super::SamplePoint;

/// Fewest donor points that can span a triangle
pub const MIN_DONOR_POINTS: usize = 3;

/// Interpolation used to rasterize the triangulation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SurfaceMethod {
    /// Sibson natural-neighbour interpolation (C1 away from data points)
    #[default]
    NaturalNeighbor,
    /// Planar interpolation inside each Delaunay triangle
    Linear,
}

impl std::fmt::Display for SurfaceMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceMethod::NaturalNeighbor => write!(f, "natural-neighbor"),
            SurfaceMethod::Linear => write!(f, "linear"),
        }
    }
}

/// Parameters for surface reconstruction
#[derive(Debug, Clone)]
pub struct SurfaceParams {
    /// Output raster rows
    pub rows: usize,
    /// Output raster columns
    pub cols: usize,
    /// Output raster geotransform
    pub transform: GeoTransform,
    /// CRS stamped on the output
    pub crs: Option<CRS>,
    pub method: SurfaceMethod,
}

impl Default for SurfaceParams {
    fn default() -> Self {
        Self {
            rows: 100,
            cols: 100,
            transform: GeoTransform::default(),
            crs: None,
            method: SurfaceMethod::NaturalNeighbor,
        }
    }
}

impl SurfaceParams {
    /// Target grid identical to `template`'s
    pub fn like(template: &Raster<f64>, method: SurfaceMethod) -> Self {
        Self {
            rows: template.rows(),
            cols: template.cols(),
            transform: *template.transform(),
            crs: template.crs().cloned(),
            method,
        }
    }
}

/// Output of [`reconstruct_surface`]
#[derive(Debug, Clone)]
pub struct SurfaceResult {
    pub surface: Raster<f64>,
    /// Vertices in the triangulation (duplicate locations collapse)
    pub vertices: usize,
    /// Triangles in the triangulation
    pub triangles: usize,
    /// Output cells outside the donors' convex hull, left as no-data
    pub hull_gaps: usize,
}

/// Triangulation vertex carrying an elevation
#[derive(Debug, Clone, Copy)]
struct DonorVertex {
    position: Point2<f64>,
    value: f64,
}

impl HasPosition for DonorVertex {
    type Scalar = f64;

    fn position(&self) -> Point2<f64> {
        self.position
    }
}

/// Triangulate `points` and rasterize the surface onto the grid in `params`.
///
/// # Errors
/// - `InsufficientPoints` with fewer than [`MIN_DONOR_POINTS`] points
/// - `DegenerateTriangulation` when all points are collinear or coincide
/// - `Triangulation` when a point cannot be inserted (non-finite coordinate)
pub fn reconstruct_surface(points: &[SamplePoint], params: SurfaceParams) -> Result<SurfaceResult> {
    if points.len() < MIN_DONOR_POINTS {
        return Err(Error::InsufficientPoints {
            found: points.len(),
            required: MIN_DONOR_POINTS,
        });
    }

    let mut triangulation: DelaunayTriangulation<DonorVertex> = DelaunayTriangulation::new();
    for p in points {
        triangulation
            .insert(DonorVertex {
                position: Point2::new(p.x, p.y),
                value: p.value,
            })
            .map_err(|e| Error::Triangulation(format!("({}, {}): {:?}", p.x, p.y, e)))?;
    }

    if triangulation.num_inner_faces() == 0 {
        return Err(Error::DegenerateTriangulation(format!(
            "{} points span no triangle (collinear or coincident)",
            triangulation.num_vertices()
        )));
    }

    let rows = params.rows;
    let cols = params.cols;
    let transform = params.transform;

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            match params.method {
                SurfaceMethod::NaturalNeighbor => {
                    let nn = triangulation.natural_neighbor();
                    for (col, out) in row_data.iter_mut().enumerate() {
                        let (x, y) = transform.pixel_to_geo(col, row);
                        if let Some(v) = nn.interpolate(|v| v.data().value, Point2::new(x, y)) {
                            *out = v;
                        }
                    }
                }
                SurfaceMethod::Linear => {
                    let bary = triangulation.barycentric();
                    for (col, out) in row_data.iter_mut().enumerate() {
                        let (x, y) = transform.pixel_to_geo(col, row);
                        if let Some(v) = bary.interpolate(|v| v.data().value, Point2::new(x, y)) {
                            *out = v;
                        }
                    }
                }
            }
            row_data
        })
        .collect();

    let hull_gaps = data.iter().filter(|v| v.is_nan()).count();

    let array = Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| Error::Other(e.to_string()))?;
    let mut surface = Raster::from_array(array);
    surface.set_transform(transform);
    surface.set_crs(params.crs);
    surface.set_nodata(Some(f64::NAN));

    Ok(SurfaceResult {
        surface,
        vertices: triangulation.num_vertices(),
        triangles: triangulation.num_inner_faces(),
        hull_gaps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Ring of points around the 10x10 grid [0, 10] x [0, 10], leaving a
    /// hole in the middle, sampled from `f`.
    fn ring_points(f: impl Fn(f64, f64) -> f64) -> Vec<SamplePoint> {
        let mut pts = Vec::new();
        for i in 0..10 {
            for j in 0..10 {
                let x = i as f64 + 0.5;
                let y = j as f64 + 0.5;
                let inside_hole = (3..7).contains(&i) && (3..7).contains(&j);
                if !inside_hole {
                    pts.push(SamplePoint::new(x, y, f(x, y)));
                }
            }
        }
        pts
    }

    fn grid_params(method: SurfaceMethod) -> SurfaceParams {
        SurfaceParams {
            rows: 10,
            cols: 10,
            transform: GeoTransform::new(0.0, 10.0, 1.0, -1.0),
            method,
            ..Default::default()
        }
    }

    fn natural_neighbor(points: &[SamplePoint]) -> Result<SurfaceResult> {
        reconstruct_surface(points, grid_params(SurfaceMethod::NaturalNeighbor))
    }

    #[test]
    fn test_flat_surface_refilled_exactly() {
        let points = ring_points(|_, _| 250.0);
        let result = natural_neighbor(&points).unwrap();

        assert_eq!(result.hull_gaps, 0);
        for row in 0..10 {
            for col in 0..10 {
                let v = result.surface.get(row, col).unwrap();
                assert_relative_eq!(v, 250.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_plane_reproduced_inside_hole() {
        let plane = |x: f64, y: f64| 100.0 + 0.5 * x - 0.25 * y;
        let points = ring_points(plane);

        for method in [SurfaceMethod::NaturalNeighbor, SurfaceMethod::Linear] {
            let result = reconstruct_surface(&points, grid_params(method)).unwrap();
            // Cell (row 5, col 5) has center (5.5, 4.5), inside the hole
            let v = result.surface.get(5, 5).unwrap();
            assert_relative_eq!(v, plane(5.5, 4.5), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_exact_at_data_points() {
        let points = ring_points(|x, y| x * 10.0 + y);
        let result = natural_neighbor(&points).unwrap();
        // Cell (0, 0) center is (0.5, 9.5), a donor location
        assert_relative_eq!(result.surface.get(0, 0).unwrap(), 14.5, epsilon = 1e-9);
    }

    #[test]
    fn test_cells_outside_hull_are_nodata() {
        let points = vec![
            SamplePoint::new(0.5, 9.5, 1.0),
            SamplePoint::new(4.5, 9.5, 1.0),
            SamplePoint::new(0.5, 5.5, 1.0),
        ];
        let result = natural_neighbor(&points).unwrap();

        assert!(result.hull_gaps > 0);
        assert!(result.surface.get(9, 9).unwrap().is_nan());
        // (1.5, 8.5) lies inside the single triangle
        assert!(!result.surface.get(1, 1).unwrap().is_nan());
        assert_eq!(result.triangles, 1);
    }

    #[test]
    fn test_too_few_points() {
        let points = vec![SamplePoint::new(0.0, 0.0, 1.0), SamplePoint::new(1.0, 1.0, 2.0)];
        let err = natural_neighbor(&points).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientPoints {
                found: 2,
                required: 3
            }
        ));
    }

    #[test]
    fn test_collinear_points_are_degenerate() {
        let points: Vec<SamplePoint> = (0..5)
            .map(|i| SamplePoint::new(i as f64, i as f64, 1.0))
            .collect();
        let err = reconstruct_surface(&points, grid_params(SurfaceMethod::Linear)).unwrap_err();
        assert!(matches!(err, Error::DegenerateTriangulation(_)));
    }

    #[test]
    fn test_output_grid_metadata() {
        let points = ring_points(|_, _| 1.0);
        let mut params = grid_params(SurfaceMethod::Linear);
        params.crs = Some(CRS::from_epsg(32608));

        let result = reconstruct_surface(&points, params).unwrap();
        assert_eq!(result.surface.shape(), (10, 10));
        assert_eq!(result.surface.crs().map(|c| c.epsg()), Some(32608));
        let expected = GeoTransform::new(0.0, 10.0, 1.0, -1.0);
        assert!(result.surface.transform().same_grid(&expected, 1e-12));
        assert_eq!(result.vertices, 84);
    }
}
