//! Pipeline stages
//!
//! Each stage is a function over one dataset or one feature. Stages that can
//! fail for purely geometric reasons return the engine error untouched so
//! the driver can turn it into a skip.

use geo::Geometry;
use slumpdod_algorithms::interpolation::{
    reconstruct_surface, SamplePoint, SurfaceMethod, SurfaceParams, SurfaceResult,
};
use slumpdod_algorithms::raster::{
    clip_to_extent, difference, raster_to_points, square, ClippedRaster, Coverage,
};
use slumpdod_algorithms::statistics::{
    footprint_zone, zonal_mean, zonal_statistics, ZonalMean, ZonalResult,
};
use slumpdod_algorithms::vector::{any_within, buffer_polygons, remove_within};
use slumpdod_core::io::{write_feature_collection, write_geotiff};
use slumpdod_core::vector::{AttributeValue, Feature, FeatureCollection};
use slumpdod_core::Raster;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::dataset::{FeatureId, FeatureRecord, PolygonDataset};
use crate::error::{PipelineError, Result};
use crate::paths::OutputLayout;

/// Attribute recording the buffer radius on buffered features
pub const BUFFER_DISTANCE_FIELD: &str = "BUFF_DIST";

/// Buffer every footprint of `dataset` and persist the buffered layer.
///
/// Returns the buffered records (identifier order) and the layer's path.
pub fn buffer_dataset(
    dataset: &PolygonDataset,
    distance: f64,
    layout: &OutputLayout,
) -> Result<(Vec<FeatureRecord>, PathBuf)> {
    let start = Instant::now();

    let mut buffered = Vec::with_capacity(dataset.len());
    let mut layer = FeatureCollection::new();
    for record in dataset.records() {
        let polygons = buffer_polygons(&record.footprint, distance)?;

        let mut feature = Feature::new(Geometry::MultiPolygon(polygons.clone()));
        feature.set_property(dataset.id_field(), AttributeValue::Int(record.id.0));
        feature.set_property(BUFFER_DISTANCE_FIELD, AttributeValue::Float(distance));
        layer.push(feature);

        buffered.push(FeatureRecord::new(record.id, polygons)?);
    }

    let path = layout.buffer_path(dataset.name(), distance);
    write_feature_collection(&path, &layer)?;

    info!(
        "{}: buffered {} features by {} m in {:.2?}",
        dataset.name(),
        buffered.len(),
        distance,
        start.elapsed()
    );
    Ok((buffered, path))
}

/// Clip the DEM to a buffered feature's extent.
pub fn extract(
    dem: &Raster<f64>,
    buffered: &FeatureRecord,
) -> slumpdod_core::Result<ClippedRaster> {
    let start = Instant::now();
    let clip = clip_to_extent(dem, &buffered.extent)?;

    if let Coverage::Partial { fraction } = clip.coverage {
        warn!(
            "feature {}: DEM covers only {:.1}% of the buffered extent, clipping to the overlap",
            buffered.id,
            fraction * 100.0
        );
    }
    info!(
        "feature {}: clipped {} x {} cells in {:.2?}",
        buffered.id,
        clip.raster.cols(),
        clip.raster.rows(),
        start.elapsed()
    );
    Ok(clip)
}

/// Convert the clipped DEM to points and drop those on the footprint.
///
/// The donor set is verified: no retained point may touch the footprint.
pub fn mask(clip: &Raster<f64>, footprint: &FeatureRecord) -> Result<Vec<SamplePoint>> {
    let start = Instant::now();
    let points = raster_to_points(clip);
    let total = points.len();

    let donors = remove_within(points, &footprint.footprint);
    if any_within(&donors, &footprint.footprint) {
        return Err(PipelineError::Engine(slumpdod_core::Error::Algorithm(format!(
            "feature {}: masking left points inside the footprint",
            footprint.id
        ))));
    }

    info!(
        "feature {}: {} donor points ({} masked) in {:.2?}",
        footprint.id,
        donors.len(),
        total - donors.len(),
        start.elapsed()
    );
    Ok(donors)
}

/// Rebuild the pre-disturbance surface on the clip's grid.
pub fn reconstruct(
    id: FeatureId,
    donors: &[SamplePoint],
    template: &Raster<f64>,
    method: SurfaceMethod,
) -> slumpdod_core::Result<SurfaceResult> {
    let start = Instant::now();
    let result = reconstruct_surface(donors, SurfaceParams::like(template, method))?;

    if result.hull_gaps > 0 {
        warn!(
            "feature {}: {} cells outside the donor hull left as no-data",
            id, result.hull_gaps
        );
    }
    info!(
        "feature {}: {} surface from {} vertices / {} triangles in {:.2?}",
        id,
        method,
        result.vertices,
        result.triangles,
        start.elapsed()
    );
    Ok(result)
}

/// DEM of Difference: clipped DEM minus reconstructed surface.
pub fn dem_of_difference(
    id: FeatureId,
    observed: &Raster<f64>,
    reconstructed: &Raster<f64>,
) -> slumpdod_core::Result<Raster<f64>> {
    let dod = difference(observed, reconstructed)?;
    let stats = dod.statistics();
    info!(
        "feature {}: DoD min {:?} max {:?} mean {:?} std {:?} ({} valid cells)",
        id, stats.min, stats.max, stats.mean, stats.std_dev, stats.valid_count
    );
    Ok(dod)
}

/// Zonal aggregates of one feature
#[derive(Debug, Clone)]
pub struct Aggregates {
    pub zonal: ZonalResult,
    /// Squared DoD and its zonal mean, in RMSE mode
    pub squared: Option<(Raster<f64>, ZonalMean)>,
}

/// Statistics of the DoD inside the footprint, plus the squared-DoD mean
/// when `rmse` is set. `None` when the footprint holds no valid cell.
pub fn aggregate(
    dod: &Raster<f64>,
    footprint: &FeatureRecord,
    rmse: bool,
) -> Result<Option<Aggregates>> {
    let start = Instant::now();
    let zone = footprint_zone(dod, &footprint.footprint)?;

    let Some(zonal) = zonal_statistics(dod, &zone)? else {
        return Ok(None);
    };

    let squared = if rmse {
        let sq = square(dod)?;
        match zonal_mean(&sq, &zone)? {
            Some(mean) => Some((sq, mean)),
            None => return Ok(None),
        }
    } else {
        None
    };

    info!(
        "feature {}: {} cells, sum {:.4}, volume {:.4} in {:.2?}",
        footprint.id,
        zonal.count,
        zonal.sum,
        zonal.volume,
        start.elapsed()
    );
    Ok(Some(Aggregates { zonal, squared }))
}

/// Write a raster artifact.
pub fn write_raster(raster: &Raster<f64>, path: &Path) -> Result<()> {
    write_geotiff(raster, path)?;
    debug!("wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdField;
    use geo::{polygon, MultiPolygon};
    use slumpdod_core::GeoTransform;

    fn dem() -> Raster<f64> {
        let mut r = Raster::filled(20, 20, 100.0);
        r.set_transform(GeoTransform::new(0.0, 20.0, 1.0, -1.0));
        r
    }

    fn record(id: i64, x0: f64, y0: f64, size: f64) -> FeatureRecord {
        let mp = MultiPolygon::new(vec![polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ]]);
        FeatureRecord::new(FeatureId(id), mp).unwrap()
    }

    #[test]
    fn test_buffer_dataset_writes_layer() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        crate::paths::ensure_dir(layout.buffer_dir()).unwrap();

        let fc: FeatureCollection = [1, 2]
            .iter()
            .map(|&id| {
                let r = record(id, id as f64 * 30.0, 0.0, 10.0);
                let mut f = Feature::new(Geometry::MultiPolygon(r.footprint));
                f.set_property("UniqueID", AttributeValue::Int(id));
                f
            })
            .collect();
        let ds =
            PolygonDataset::from_collection("Peel", "Peel.geojson", fc, &IdField::default())
                .unwrap();

        let (buffered, path) = buffer_dataset(&ds, 5.0, &layout).unwrap();
        assert_eq!(buffered.len(), 2);
        assert!(path.ends_with("00_SlumpBuffers/Peel_5m_buf.geojson"));
        assert!(buffered[0].extent.min_x < 30.0 - 4.9);

        let layer = slumpdod_core::io::read_feature_collection(&path).unwrap();
        assert_eq!(layer.len(), 2);
        assert_eq!(
            layer.features[1].get_property("UniqueID").and_then(|v| v.as_integer()),
            Some(2)
        );
    }

    #[test]
    fn test_mask_leaves_ring_of_donors() {
        let dem = dem();
        let clip = extract(&dem, &record(1, 2.0, 2.0, 16.0)).unwrap();
        let donors = mask(&clip.raster, &record(1, 5.0, 5.0, 10.0)).unwrap();
        // 16 x 16 clip minus the 10 x 10 footprint
        assert_eq!(donors.len(), 256 - 100);
    }

    #[test]
    fn test_extract_outside_dem_is_empty_extent() {
        let err = extract(&dem(), &record(1, 100.0, 100.0, 5.0)).unwrap_err();
        assert!(matches!(err, slumpdod_core::Error::EmptyExtent(_)));
    }

    #[test]
    fn test_aggregate_flat_surface() {
        let dem = dem();
        let footprint = record(1, 5.0, 5.0, 4.0);
        let recon = dem.clone();
        let dod = dem_of_difference(footprint.id, &dem, &recon).unwrap();

        let agg = aggregate(&dod, &footprint, true).unwrap().unwrap();
        assert_eq!(agg.zonal.count, 16);
        assert_eq!(agg.zonal.sum, 0.0);
        let (_, mean) = agg.squared.unwrap();
        assert_eq!(mean.rmse(), 0.0);
    }

    #[test]
    fn test_aggregate_empty_zone() {
        let dem = dem();
        let dod = dem_of_difference(FeatureId(1), &dem, &dem).unwrap();
        let far = record(1, 500.0, 500.0, 4.0);
        assert!(aggregate(&dod, &far, false).unwrap().is_none());
    }
}
