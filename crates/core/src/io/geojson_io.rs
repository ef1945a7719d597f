//! GeoJSON FeatureCollection reading/writing

use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use geojson::GeoJson;
use std::fs;
use std::path::Path;

/// Read a GeoJSON file holding a FeatureCollection
///
/// Property order follows the document order of each feature's
/// `properties` object.
pub fn read_feature_collection<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let text = fs::read_to_string(path.as_ref())?;
    parse_feature_collection(&text)
}

pub(crate) fn parse_feature_collection(text: &str) -> Result<FeatureCollection> {
    let geojson: GeoJson = text.parse()?;
    let collection = geojson::FeatureCollection::try_from(geojson)?;

    collection
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| {
            let geometry = feature
                .geometry
                .map(geo_types::Geometry::<f64>::try_from)
                .transpose()
                .map_err(|e| Error::InvalidGeometry(format!("feature #{}: {}", index, e)))?;

            let properties = feature
                .properties
                .unwrap_or_default()
                .iter()
                .map(|(k, v)| (k.clone(), AttributeValue::from(v)))
                .collect();

            Ok(Feature {
                geometry,
                properties,
            })
        })
        .collect()
}

/// Write features as a GeoJSON FeatureCollection
pub fn write_feature_collection<P: AsRef<Path>>(
    path: P,
    collection: &FeatureCollection,
) -> Result<()> {
    fs::write(path.as_ref(), to_geojson_string(collection))?;
    Ok(())
}

pub(crate) fn to_geojson_string(collection: &FeatureCollection) -> String {
    let features = collection
        .iter()
        .map(|feature| {
            let properties: geojson::JsonObject = feature
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                .collect();

            geojson::Feature {
                bbox: None,
                geometry: feature
                    .geometry
                    .as_ref()
                    .map(|g| geojson::Geometry::new(geojson::Value::from(g))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    GeoJson::FeatureCollection(geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
    .to_string()
}
