//! Vector features: geometry plus ordered, typed attributes

use geo_types::Geometry;
use serde::{Deserialize, Serialize};

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Integer view of the value; floats with no fractional part qualify
    /// (shapefile-derived exports often store identifiers as doubles) as
    /// long as they fit in an `i64`.
    pub fn as_integer(&self) -> Option<i64> {
        // i64::MAX as f64 rounds up to 2^63, which is itself out of range
        const I64_UPPER: f64 = i64::MAX as f64;
        const I64_LOWER: f64 = i64::MIN as f64;

        match self {
            AttributeValue::Int(v) => Some(*v),
            AttributeValue::Float(v)
                if v.fract() == 0.0 && *v >= I64_LOWER && *v < I64_UPPER =>
            {
                Some(*v as i64)
            }
            _ => None,
        }
    }
}

impl From<&serde_json::Value> for AttributeValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => AttributeValue::Null,
            serde_json::Value::Bool(b) => AttributeValue::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => AttributeValue::Int(i),
                None => AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => AttributeValue::String(s.clone()),
            other => AttributeValue::String(other.to_string()),
        }
    }
}

impl From<&AttributeValue> for serde_json::Value {
    fn from(value: &AttributeValue) -> Self {
        match value {
            AttributeValue::Null => serde_json::Value::Null,
            AttributeValue::Bool(b) => serde_json::Value::Bool(*b),
            AttributeValue::Int(i) => serde_json::Value::from(*i),
            AttributeValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            AttributeValue::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

/// A geographic feature with geometry and attributes.
///
/// Attributes keep their source order so that an attribute can be addressed
/// by column position as well as by name.
#[derive(Debug, Clone, Default)]
pub struct Feature {
    pub geometry: Option<Geometry<f64>>,
    pub properties: Vec<(String, AttributeValue)>,
}

impl Feature {
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: Vec::new(),
        }
    }

    /// Set an attribute, replacing an existing one of the same name in place
    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        let key = key.into();
        match self.properties.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.properties.push((key, value)),
        }
    }

    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Attribute name at column position `index`
    pub fn property_name(&self, index: usize) -> Option<&str> {
        self.properties.get(index).map(|(k, _)| k.as_str())
    }
}

/// Collection of features
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self {
            features: Vec::new(),
        }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}
