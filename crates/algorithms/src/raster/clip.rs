//! Clip a raster to a map extent
//!
//! The window is snapped outward to whole source cells, so the clipped
//! raster stays on the source lattice and later raster algebra against it
//! needs no resampling.

use ndarray::s;
use slumpdod_core::raster::Raster;
use slumpdod_core::{Error, Extent, Result};

/// How much of the requested extent the source raster covers
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coverage {
    /// Requested window lies entirely inside the raster
    Full,
    /// Only part of the requested window lies inside the raster;
    /// `fraction` is the covered share of requested cells
    Partial { fraction: f64 },
}

impl Coverage {
    pub fn fraction(&self) -> f64 {
        match self {
            Coverage::Full => 1.0,
            Coverage::Partial { fraction } => *fraction,
        }
    }
}

/// Result of [`clip_to_extent`]
#[derive(Debug, Clone)]
pub struct ClippedRaster {
    pub raster: Raster<f64>,
    pub coverage: Coverage,
}

/// Clip `raster` to the cells intersecting `extent`.
///
/// Extents reaching past the raster edge are clipped to the overlap and
/// reported as [`Coverage::Partial`]. No overlap at all is an
/// [`Error::EmptyExtent`].
///
/// # Errors
/// - `InvalidParameter` if the raster is rotated or south-up
/// - `EmptyExtent` if the extent is degenerate or misses the raster
pub fn clip_to_extent(raster: &Raster<f64>, extent: &Extent) -> Result<ClippedRaster> {
    let gt = raster.transform();
    if !gt.is_north_up() {
        return Err(Error::InvalidParameter {
            name: "raster",
            value: format!("{:?}", gt),
            reason: "clipping requires a north-up raster".into(),
        });
    }
    if extent.is_empty() {
        return Err(Error::EmptyExtent(format!("extent {} has no area", extent)));
    }

    // Tolerance keeps extents lying exactly on cell edges from grabbing a
    // neighbouring row or column through floating-point noise.
    const EDGE_EPS: f64 = 1e-9;

    let (c0, r0) = gt.geo_to_pixel(extent.min_x, extent.max_y);
    let (c1, r1) = gt.geo_to_pixel(extent.max_x, extent.min_y);

    let want_col_start = (c0 + EDGE_EPS).floor() as i64;
    let want_row_start = (r0 + EDGE_EPS).floor() as i64;
    let want_col_end = (c1 - EDGE_EPS).ceil() as i64;
    let want_row_end = (r1 - EDGE_EPS).ceil() as i64;

    let (rows, cols) = raster.shape();
    let col_start = want_col_start.clamp(0, cols as i64) as usize;
    let col_end = want_col_end.clamp(0, cols as i64) as usize;
    let row_start = want_row_start.clamp(0, rows as i64) as usize;
    let row_end = want_row_end.clamp(0, rows as i64) as usize;

    if col_end <= col_start || row_end <= row_start {
        return Err(Error::EmptyExtent(format!(
            "extent {} does not overlap raster extent {}",
            extent,
            raster.extent()
        )));
    }

    let wanted = ((want_col_end - want_col_start) * (want_row_end - want_row_start)) as f64;
    let got = ((col_end - col_start) * (row_end - row_start)) as f64;
    let coverage = if got >= wanted {
        Coverage::Full
    } else {
        Coverage::Partial {
            fraction: got / wanted,
        }
    };

    let window = raster
        .data()
        .slice(s![row_start..row_end, col_start..col_end])
        .to_owned();

    let mut clipped = Raster::from_array(window);
    clipped.set_transform(gt.window(col_start, row_start));
    clipped.set_crs(raster.crs().cloned());
    clipped.set_nodata(raster.nodata());

    Ok(ClippedRaster {
        raster: clipped,
        coverage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use slumpdod_core::GeoTransform;

    /// 10x10 DEM on [0, 10] x [0, 10] with value = row * 10 + col
    fn dem() -> Raster<f64> {
        let data: Vec<f64> = (0..100).map(|v| v as f64).collect();
        let mut r = Raster::from_vec(data, 10, 10).unwrap();
        r.set_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0));
        r.set_nodata(Some(-9999.0));
        r
    }

    #[test]
    fn test_clip_inside() {
        let clip = clip_to_extent(&dem(), &Extent::new(2.0, 3.0, 5.0, 7.0)).unwrap();

        assert_eq!(clip.coverage, Coverage::Full);
        assert_eq!(clip.raster.shape(), (4, 3));
        // Upper-left cell of the window is row 3, col 2 of the source
        assert_eq!(clip.raster.get(0, 0).unwrap(), 32.0);
        assert_relative_eq!(clip.raster.transform().origin_x, 2.0);
        assert_relative_eq!(clip.raster.transform().origin_y, 7.0);
        assert_eq!(clip.raster.nodata(), Some(-9999.0));
    }

    #[test]
    fn test_clip_snaps_outward() {
        let clip = clip_to_extent(&dem(), &Extent::new(2.5, 3.5, 4.2, 6.1)).unwrap();
        assert_eq!(clip.raster.shape(), (4, 3));
        assert_relative_eq!(clip.raster.transform().origin_x, 2.0);
        assert_relative_eq!(clip.raster.transform().origin_y, 7.0);
    }

    #[test]
    fn test_clip_partial_coverage() {
        let clip = clip_to_extent(&dem(), &Extent::new(8.0, 8.0, 12.0, 12.0)).unwrap();
        assert_eq!(clip.raster.shape(), (2, 2));
        match clip.coverage {
            Coverage::Partial { fraction } => assert_relative_eq!(fraction, 0.25),
            other => panic!("expected partial coverage, got {:?}", other),
        }
    }

    #[test]
    fn test_clip_outside_fails() {
        let err = clip_to_extent(&dem(), &Extent::new(20.0, 20.0, 30.0, 30.0)).unwrap_err();
        assert!(matches!(err, Error::EmptyExtent(_)));
    }

    #[test]
    fn test_clip_degenerate_extent_fails() {
        let err = clip_to_extent(&dem(), &Extent::new(2.0, 2.0, 2.0, 5.0)).unwrap_err();
        assert!(matches!(err, Error::EmptyExtent(_)));
    }
}
