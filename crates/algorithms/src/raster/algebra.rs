//! Raster algebra
//!
//! Cell-by-cell arithmetic on one raster or on two rasters that share the
//! same grid. Grids are never resampled: two rasters whose shape, origin or
//! cell size differ are rejected.

use crate::maybe_rayon::*;
use ndarray::Array2;
use slumpdod_core::raster::Raster;
use slumpdod_core::{Error, Result};

/// Allowed origin / cell size deviation between grids, as a fraction of the
/// cell size.
pub const GRID_TOLERANCE: f64 = 1e-6;

/// Apply a unary function to every valid cell of a raster.
///
/// No-data cells stay no-data (NaN) in the output.
pub fn band_math<F>(raster: &Raster<f64>, f: F) -> Result<Raster<f64>>
where
    F: Fn(f64) -> f64 + Sync + Send,
{
    let (rows, cols) = raster.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let val = raster.data()[(row, col)];
                if !raster.is_nodata(val) {
                    *out = f(val);
                }
            }
            row_data
        })
        .collect();

    finish(raster, data)
}

/// Apply a binary function to every cell pair of two aligned rasters.
///
/// No-data in either input produces no-data in the output.
///
/// # Errors
/// `GridMismatch` when shape, origin or cell size differ.
pub fn band_math_binary<F>(a: &Raster<f64>, b: &Raster<f64>, f: F) -> Result<Raster<f64>>
where
    F: Fn(f64, f64) -> f64 + Sync + Send,
{
    check_alignment(a, b)?;

    let (rows, cols) = a.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let va = a.data()[(row, col)];
                let vb = b.data()[(row, col)];

                if a.is_nodata(va) || b.is_nodata(vb) {
                    continue;
                }

                *out = f(va, vb);
            }
            row_data
        })
        .collect();

    finish(a, data)
}

/// DEM of Difference: `observed - reconstructed`, cell by cell.
///
/// Negative values mean the observed surface lies below the reconstructed
/// one (material loss).
pub fn difference(observed: &Raster<f64>, reconstructed: &Raster<f64>) -> Result<Raster<f64>> {
    band_math_binary(observed, reconstructed, |o, r| o - r)
}

/// Square every valid cell
pub fn square(raster: &Raster<f64>) -> Result<Raster<f64>> {
    band_math(raster, |v| v * v)
}

fn check_alignment(a: &Raster<f64>, b: &Raster<f64>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::GridMismatch(format!(
            "shape {:?} vs {:?}",
            a.shape(),
            b.shape()
        )));
    }

    let tolerance = GRID_TOLERANCE * a.cell_size().max(f64::MIN_POSITIVE);
    if !a.transform().same_grid(b.transform(), tolerance) {
        return Err(Error::GridMismatch(format!(
            "origin/cell size differ: {:?} vs {:?}",
            a.transform(),
            b.transform()
        )));
    }
    Ok(())
}

fn finish(template: &Raster<f64>, data: Vec<f64>) -> Result<Raster<f64>> {
    let array = Array2::from_shape_vec(template.shape(), data)
        .map_err(|e| Error::Other(e.to_string()))?;
    let mut output = template.with_same_grid(array)?;
    output.set_nodata(Some(f64::NAN));
    Ok(output)
}
