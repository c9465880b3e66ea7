//! Candidate point records matched against catchment polygons

use geo::Point;
use serde_json::{Map, Value};

use super::PointFeature;

/// A point of interest with its zonation classification
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRecord {
    /// Identity within the owning collection
    pub id: String,
    pub geometry: Point<f64>,
    pub properties: Map<String, Value>,
    /// Set at ingestion time, decides the output bucket of a match
    pub in_zone: bool,
}

/// Named group of candidate records sharing one classification
#[derive(Debug, Clone)]
pub struct RecordCollection {
    pub name: String,
    pub records: Vec<CandidateRecord>,
}

impl RecordCollection {
    /// Wraps `records`, stamping every one with the collection's flag
    pub fn tagged(name: &str, in_zone: bool, mut records: Vec<CandidateRecord>) -> Self {
        for record in &mut records {
            record.in_zone = in_zone;
        }
        Self {
            name: name.to_string(),
            records,
        }
    }

    /// Records from normalized point features, falling back to the 1-based
    /// position when a feature carries no id
    pub fn from_points(name: &str, in_zone: bool, points: Vec<PointFeature>) -> Self {
        let records = points
            .into_iter()
            .enumerate()
            .map(|(idx, point)| CandidateRecord {
                id: point.id.unwrap_or_else(|| (idx + 1).to_string()),
                geometry: point.geometry,
                properties: point.properties,
                in_zone,
            })
            .collect();
        Self {
            name: name.to_string(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
