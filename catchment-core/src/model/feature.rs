//! Single-part, two-dimensional features produced by the normalizer

use geo::{LineString, Point};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct LineFeature {
    pub geometry: LineString<f64>,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointFeature {
    /// `id` member of the source feature, if any
    pub id: Option<String>,
    pub geometry: Point<f64>,
    pub properties: Map<String, Value>,
}
