//! Polygon datasets and their features
//!
//! A dataset is loaded and validated in full before any processing starts:
//! every feature needs a (multi)polygon geometry and a unique integer
//! identifier. Features are kept in ascending identifier order.

use geo::{MultiPolygon, Validation};
use serde::{Deserialize, Serialize};
use slumpdod_algorithms::vector::{extent_of, to_multi_polygon};
use slumpdod_core::io::read_feature_collection;
use slumpdod_core::vector::FeatureCollection;
use slumpdod_core::Extent;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::IdField;
use crate::error::{PipelineError, Result};
use crate::selection::FeatureFilter;

/// Integer identifier of a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(pub i64);

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One polygon of a dataset
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    pub id: FeatureId,
    pub footprint: MultiPolygon<f64>,
    pub extent: Extent,
}

impl FeatureRecord {
    /// Build a record, deriving its extent from the footprint.
    pub fn new(id: FeatureId, footprint: MultiPolygon<f64>) -> Result<Self> {
        let extent = extent_of(&footprint).ok_or_else(|| {
            PipelineError::config(format!("feature {} has an empty geometry", id))
        })?;
        Ok(Self {
            id,
            footprint,
            extent,
        })
    }
}

/// Named collection of polygon features
#[derive(Debug, Clone)]
pub struct PolygonDataset {
    name: String,
    path: PathBuf,
    id_field: String,
    records: Vec<FeatureRecord>,
}

impl PolygonDataset {
    /// Load a GeoJSON FeatureCollection; the dataset is named after the file stem.
    pub fn load(path: impl AsRef<Path>, id_field: &IdField) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                PipelineError::config(format!("bad dataset file name {}", path.display()))
            })?
            .to_string();

        let collection = read_feature_collection(path).map_err(|e| {
            PipelineError::config(format!("cannot read dataset {}: {}", path.display(), e))
        })?;

        Self::from_collection(name, path, collection, id_field)
    }

    /// Validate a feature collection and index it by identifier.
    pub fn from_collection(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        collection: FeatureCollection,
        id_field: &IdField,
    ) -> Result<Self> {
        let name = name.into();
        let field = resolve_id_field(&name, &collection, id_field)?;

        let mut by_id: BTreeMap<FeatureId, FeatureRecord> = BTreeMap::new();
        for (index, feature) in collection.into_iter().enumerate() {
            let id = feature
                .get_property(&field)
                .and_then(|v| v.as_integer())
                .map(FeatureId)
                .ok_or_else(|| {
                    PipelineError::config(format!(
                        "{}: feature #{} has no integer '{}' attribute",
                        name, index, field
                    ))
                })?;

            let geometry = feature.geometry.ok_or_else(|| {
                PipelineError::config(format!("{}: feature {} has no geometry", name, id))
            })?;
            let footprint = to_multi_polygon(geometry)
                .map_err(|e| PipelineError::config(format!("{}: feature {}: {}", name, id, e)))?;
            if !footprint.is_valid() {
                return Err(PipelineError::config(format!(
                    "{}: feature {} has an invalid polygon",
                    name, id
                )));
            }

            let record = FeatureRecord::new(id, footprint)?;
            if by_id.insert(id, record).is_some() {
                return Err(PipelineError::config(format!(
                    "{}: duplicate identifier {} in '{}'",
                    name, id, field
                )));
            }
        }

        Ok(Self {
            name,
            path: path.into(),
            id_field: field,
            records: by_id.into_values().collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolved identifier attribute name
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in ascending identifier order
    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }

    pub fn ids(&self) -> impl Iterator<Item = FeatureId> + '_ {
        self.records.iter().map(|r| r.id)
    }

    /// Records accepted by `filter`, in identifier order
    pub fn select(&self, filter: FeatureFilter) -> impl Iterator<Item = &FeatureRecord> + '_ {
        self.records.iter().filter(move |r| filter.matches(r.id))
    }
}

fn resolve_id_field(
    dataset: &str,
    collection: &FeatureCollection,
    id_field: &IdField,
) -> Result<String> {
    match id_field {
        IdField::Name(name) => Ok(name.clone()),
        IdField::Index(index) => {
            let first = collection.iter().next().ok_or_else(|| {
                PipelineError::config(format!(
                    "{}: cannot resolve attribute #{} in an empty dataset",
                    dataset, index
                ))
            })?;
            first
                .property_name(*index)
                .map(str::to_string)
                .ok_or_else(|| {
                    PipelineError::config(format!(
                        "{}: features have {} attributes, #{} requested",
                        dataset,
                        first.properties.len(),
                        index
                    ))
                })
        }
    }
}

/// GeoJSON datasets directly inside `workspace`, sorted by path.
pub fn discover_datasets(workspace: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let workspace = workspace.as_ref();
    let entries = fs::read_dir(workspace).map_err(|e| PipelineError::io(workspace, e))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| PipelineError::io(workspace, e))?.path();
        let is_geojson = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("geojson"));
        if is_geojson && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
