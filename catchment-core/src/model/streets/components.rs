//! Road network components - vertices, edges and graph arcs

use geo::{LineString, Point};
use serde_json::{Map, Value};

use crate::{EdgeId, Minutes, VertexId};

/// Road graph vertex
#[derive(Debug, Clone, PartialEq)]
pub struct RoadVertex {
    /// Vertex id, unique within its network
    pub id: VertexId,
    /// Vertex coordinates
    pub geometry: Point<f64>,
}

/// Road segment as stored for a network
#[derive(Debug, Clone, PartialEq)]
pub struct RoadEdge {
    pub id: EdgeId,
    /// Vertex at the first coordinate, `None` until topology is built
    pub source: Option<VertexId>,
    /// Vertex at the last coordinate, `None` until topology is built
    pub target: Option<VertexId>,
    /// Traversal time source -> target in minutes
    pub cost: Minutes,
    /// Traversal time target -> source in minutes, negative means impassable
    pub reverse_cost: Minutes,
    pub geometry: LineString<f64>,
    /// Attributes carried over from the uploaded feature
    pub properties: Map<String, Value>,
}

impl RoadEdge {
    /// Fresh edge without topology
    pub fn new(id: EdgeId, geometry: LineString<f64>, properties: Map<String, Value>) -> Self {
        Self {
            id,
            source: None,
            target: None,
            cost: 0.0,
            reverse_cost: 0.0,
            geometry,
            properties,
        }
    }

    /// Edge has both endpoints resolved and a positive cost
    pub fn is_routable(&self) -> bool {
        self.source.is_some() && self.target.is_some() && self.cost > 0.0
    }
}

/// Directed arc of the in-memory routing graph
#[derive(Debug, Clone, Copy)]
pub struct RoadArc {
    /// Slot of the underlying edge in [`super::RoadGraph::road_edges`]
    pub edge: usize,
    pub cost: Minutes,
    /// Arc runs along the edge geometry (source -> target)
    pub forward: bool,
}
