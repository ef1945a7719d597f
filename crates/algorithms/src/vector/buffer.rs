//! Buffer operations
//!
//! Expands polygon footprints outward by a fixed distance. Convex corners
//! are rounded (round joins), so the buffer of a valid polygon strictly
//! contains it.

use geo::{Area, Buffer, MultiPolygon, Validation};
use slumpdod_core::{Error, Result};

/// Buffer a (multi)polygon footprint by `distance` map units.
///
/// # Errors
/// - `InvalidParameter` if `distance` is not a positive finite number
/// - `InvalidGeometry` if the footprint is invalid or the buffer is empty
pub fn buffer_polygons(footprint: &MultiPolygon<f64>, distance: f64) -> Result<MultiPolygon<f64>> {
    if !distance.is_finite() || distance <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "distance",
            value: distance.to_string(),
            reason: "buffer distance must be positive".into(),
        });
    }
    if footprint.0.is_empty() {
        return Err(Error::InvalidGeometry("cannot buffer an empty footprint".into()));
    }
    if !footprint.is_valid() {
        return Err(Error::InvalidGeometry("footprint is not a valid polygon".into()));
    }

    let buffered = footprint.buffer(distance);
    if buffered.0.is_empty() || buffered.unsigned_area() <= footprint.unsigned_area() {
        return Err(Error::InvalidGeometry(format!(
            "buffer by {} produced no additional area",
            distance
        )));
    }

    Ok(buffered)
}
