//! Zonal statistics
//!
//! A zone is a `u8` raster on the same grid as the values: cells equal to 1
//! belong to the zone, 0 does not. [`footprint_zone`] builds one from a
//! polygon using the cell-centre rule (a cell belongs to the zone when its
//! centre intersects the polygon).

use crate::maybe_rayon::*;
use geo::{BoundingRect, Intersects, MultiPolygon, Point};
use ndarray::Array2;
use serde::Serialize;
use slumpdod_core::raster::Raster;
use slumpdod_core::{Error, Result};

/// Zone cell value
pub const IN_ZONE: u8 = 1;

/// Statistics of the valid cells inside one zone
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZonalResult {
    pub count: usize,
    /// `count` times the cell area
    pub area: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub median: f64,
    /// 90th percentile, nearest-rank
    pub pct90: f64,
    pub sum: f64,
    /// `sum` times the cell area
    pub volume: f64,
}

/// Mean of the valid cells inside one zone
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZonalMean {
    pub count: usize,
    pub area: f64,
    pub mean: f64,
}

impl ZonalMean {
    /// Square root of the mean; meaningful when the values are squared errors.
    pub fn rmse(&self) -> f64 {
        self.mean.max(0.0).sqrt()
    }
}

/// Rasterize `footprint` onto the grid of `template`.
pub fn footprint_zone(template: &Raster<f64>, footprint: &MultiPolygon<f64>) -> Result<Raster<u8>> {
    let (rows, cols) = template.shape();
    let transform = *template.transform();
    let bbox = footprint.bounding_rect();

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];
            let Some(bbox) = bbox else {
                return row_data;
            };
            for (col, out) in row_data.iter_mut().enumerate() {
                let (x, y) = transform.pixel_to_geo(col, row);
                if x < bbox.min().x || x > bbox.max().x || y < bbox.min().y || y > bbox.max().y {
                    continue;
                }
                if footprint.intersects(&Point::new(x, y)) {
                    *out = IN_ZONE;
                }
            }
            row_data
        })
        .collect();

    let array = Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| Error::Other(e.to_string()))?;
    template.with_same_grid(array)
}

/// Statistics of `values` inside `zone`.
///
/// No-data cells are ignored. Returns `Ok(None)` when the zone holds no
/// valid cell.
///
/// # Errors
/// `SizeMismatch` when the rasters differ in shape.
pub fn zonal_statistics(values: &Raster<f64>, zone: &Raster<u8>) -> Result<Option<ZonalResult>> {
    let mut vals = zone_values(values, zone)?;
    if vals.is_empty() {
        return Ok(None);
    }

    let count = vals.len();
    let n = count as f64;
    let cell_area = values.transform().cell_area();

    let sum: f64 = vals.iter().sum();
    let mean = sum / n;
    let variance = vals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    vals.sort_by(|a, b| a.total_cmp(b));
    let min = vals[0];
    let max = vals[count - 1];

    let median = if count % 2 == 0 {
        (vals[count / 2 - 1] + vals[count / 2]) / 2.0
    } else {
        vals[count / 2]
    };

    let rank = ((0.9 * n).ceil() as usize).clamp(1, count);
    let pct90 = vals[rank - 1];

    Ok(Some(ZonalResult {
        count,
        area: n * cell_area,
        min,
        max,
        range: max - min,
        mean,
        std_dev: variance.sqrt(),
        median,
        pct90,
        sum,
        volume: sum * cell_area,
    }))
}

/// Mean of `values` inside `zone`; `Ok(None)` when the zone is empty.
pub fn zonal_mean(values: &Raster<f64>, zone: &Raster<u8>) -> Result<Option<ZonalMean>> {
    let vals = zone_values(values, zone)?;
    if vals.is_empty() {
        return Ok(None);
    }
    let n = vals.len() as f64;
    Ok(Some(ZonalMean {
        count: vals.len(),
        area: n * values.transform().cell_area(),
        mean: vals.iter().sum::<f64>() / n,
    }))
}

fn zone_values(values: &Raster<f64>, zone: &Raster<u8>) -> Result<Vec<f64>> {
    let (rows_v, cols_v) = values.shape();
    let (rows_z, cols_z) = zone.shape();

    if rows_v != rows_z || cols_v != cols_z {
        return Err(Error::SizeMismatch {
            er: rows_v,
            ec: cols_v,
            ar: rows_z,
            ac: cols_z,
        });
    }

    Ok(values
        .data()
        .iter()
        .zip(zone.data().iter())
        .filter(|(v, z)| **z == IN_ZONE && !values.is_nodata(**v))
        .map(|(v, _)| *v)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::polygon;
    use slumpdod_core::GeoTransform;

    fn grid(rows: usize, cols: usize, value: f64, cell: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(0.0, rows as f64 * cell, cell, -cell));
        r
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: y0),
            (x: x1, y: y0),
            (x: x1, y: y1),
            (x: x0, y: y1),
            (x: x0, y: y0),
        ]])
    }

    #[test]
    fn test_cell_centre_rule() {
        let template = grid(10, 10, 0.0, 1.0);
        // Covers centres 2.5 and 3.5 in x, 5.5 in y; edge at x=2.2 is not a centre
        let zone = footprint_zone(&template, &rect(2.2, 5.1, 3.9, 5.9)).unwrap();

        let members: usize = zone.data().iter().filter(|&&z| z == IN_ZONE).count();
        assert_eq!(members, 2);
        // y = 5.5 is row 4 on a 10-row grid with origin y = 10
        assert_eq!(zone.get(4, 2).unwrap(), IN_ZONE);
        assert_eq!(zone.get(4, 3).unwrap(), IN_ZONE);
    }

    #[test]
    fn test_uniformly_lowered_zone_has_negative_sum() {
        let mut dod = grid(10, 10, 0.0, 1.0);
        for row in 3..6 {
            for col in 3..6 {
                dod.set(row, col, -2.0).unwrap();
            }
        }
        let zone = footprint_zone(&dod, &rect(3.0, 4.0, 6.0, 7.0)).unwrap();
        let stats = zonal_statistics(&dod, &zone).unwrap().unwrap();

        assert_eq!(stats.count, 9);
        assert_relative_eq!(stats.sum, -18.0);
        assert_relative_eq!(stats.mean, -2.0);
        assert_relative_eq!(stats.std_dev, 0.0);
        assert_relative_eq!(stats.range, 0.0);
    }

    #[test]
    fn test_order_statistics() {
        let mut values = grid(1, 10, 0.0, 1.0);
        for col in 0..10 {
            values.set(0, col, (col + 1) as f64).unwrap();
        }
        let zone = footprint_zone(&values, &rect(0.0, 0.0, 10.0, 1.0)).unwrap();
        let stats = zonal_statistics(&values, &zone).unwrap().unwrap();

        assert_eq!(stats.count, 10);
        assert_relative_eq!(stats.min, 1.0);
        assert_relative_eq!(stats.max, 10.0);
        assert_relative_eq!(stats.range, 9.0);
        assert_relative_eq!(stats.mean, 5.5);
        assert_relative_eq!(stats.median, 5.5);
        assert_relative_eq!(stats.pct90, 9.0);
        assert_relative_eq!(stats.sum, 55.0);
        // Population variance of 1..=10 is 8.25
        assert_relative_eq!(stats.std_dev, 8.25_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_area_and_volume_scale_with_cell_size() {
        let dod = grid(4, 4, -1.0, 2.0);
        let zone = footprint_zone(&dod, &rect(0.0, 0.0, 8.0, 8.0)).unwrap();
        let stats = zonal_statistics(&dod, &zone).unwrap().unwrap();

        assert_eq!(stats.count, 16);
        assert_relative_eq!(stats.area, 64.0);
        assert_relative_eq!(stats.sum, -16.0);
        assert_relative_eq!(stats.volume, -64.0);
    }

    #[test]
    fn test_nodata_cells_ignored() {
        let mut dod = grid(3, 3, 1.0, 1.0);
        dod.set_nodata(Some(f64::NAN));
        dod.set(1, 1, f64::NAN).unwrap();
        let zone = footprint_zone(&dod, &rect(0.0, 0.0, 3.0, 3.0)).unwrap();
        let stats = zonal_statistics(&dod, &zone).unwrap().unwrap();
        assert_eq!(stats.count, 8);
    }

    #[test]
    fn test_empty_zone() {
        let dod = grid(5, 5, 1.0, 1.0);
        let zone = footprint_zone(&dod, &rect(100.0, 100.0, 110.0, 110.0)).unwrap();
        assert!(zonal_statistics(&dod, &zone).unwrap().is_none());
        assert!(zonal_mean(&dod, &zone).unwrap().is_none());
    }

    #[test]
    fn test_zonal_mean_rmse() {
        let mut sq = grid(2, 2, 4.0, 1.0);
        sq.set(0, 0, 0.0).unwrap();
        let zone = footprint_zone(&sq, &rect(0.0, 0.0, 2.0, 2.0)).unwrap();
        let m = zonal_mean(&sq, &zone).unwrap().unwrap();
        assert_eq!(m.count, 4);
        assert_relative_eq!(m.mean, 3.0);
        assert_relative_eq!(m.rmse(), 3.0_f64.sqrt());
    }

    #[test]
    fn test_size_mismatch() {
        let values = grid(5, 5, 1.0, 1.0);
        let zone = footprint_zone(&grid(4, 4, 0.0, 1.0), &rect(0.0, 0.0, 4.0, 4.0)).unwrap();
        assert!(matches!(
            zonal_statistics(&values, &zone),
            Err(Error::SizeMismatch { .. })
        ));
    }
}
