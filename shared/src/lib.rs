use std::fmt;

use serde::{Deserialize, Serialize};

pub mod geometry;
pub mod plot_file;

pub use geometry::{Bounds, Geometry, Position, Ring};
pub use plot_file::{
    decode_plot_file, encode_plot_file, geometry_parts, PlotFileData, PlotFileError, PlotRecord,
};

pub const FEATURE_TYPE: &str = "Feature";
pub const FEATURE_COLLECTION_TYPE: &str = "FeatureCollection";

fn feature_type() -> String {
    FEATURE_TYPE.to_string()
}

fn feature_collection_type() -> String {
    FEATURE_COLLECTION_TYPE.to_string()
}

/// Server-assigned plot identifier. This server hands out numbers, but
/// identifiers are always compared through their string form.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum PlotId {
    Number(u64),
    Text(String),
}

impl PlotId {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            PlotId::Number(number) => number.to_string() == value,
            PlotId::Text(text) => text == value,
        }
    }
}

impl fmt::Display for PlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlotId::Number(number) => write!(f, "{number}"),
            PlotId::Text(text) => f.write_str(text),
        }
    }
}

impl From<u64> for PlotId {
    fn from(value: u64) -> Self {
        PlotId::Number(value)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PlotProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Square meters. Computed by the server; ignored on input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub type_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PlotId>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: PlotProperties,
}

impl Feature {
    /// The create payload: `{type: "Feature", geometry, properties: {name}}`.
    pub fn new_plot(geometry: Geometry, name: impl Into<String>) -> Self {
        Self {
            type_field: feature_type(),
            id: None,
            geometry: Some(geometry),
            properties: PlotProperties {
                name: Some(name.into()),
                ..PlotProperties::default()
            },
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.properties.name.as_deref()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "feature_collection_type")]
    pub type_field: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            type_field: feature_collection_type(),
            features,
        }
    }
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
