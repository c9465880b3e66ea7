//! Driving-distance reachability from a coordinate

use geo::{LineString, Point};
use geojson::{Feature, FeatureCollection, Geometry, Value as GeoJsonValue};
use log::debug;
use serde_json::json;

use super::dijkstra::dijkstra_path_weights;
use crate::model::RoadGraph;
use crate::{EdgeId, Error, Minutes, VertexId};

/// Edge touched by a reachability search
#[derive(Debug, Clone, PartialEq)]
pub struct ReachedEdge {
    pub id: EdgeId,
    pub geometry: LineString<f64>,
    /// Cheapest cost at which one of the edge's endpoints was reached
    pub agg_cost: Minutes,
}

/// Result of a budgeted search, ephemeral per query
#[derive(Debug, Clone)]
pub struct Reachability {
    pub origin: Point<f64>,
    pub source: VertexId,
    pub budget: Minutes,
    /// Reached edges in ascending id order
    pub edges: Vec<ReachedEdge>,
    /// Visited vertices with their cheapest cost, ascending id order
    pub vertices: Vec<(VertexId, Minutes)>,
}

impl Reachability {
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edge_ids(&self) -> Vec<EdgeId> {
        self.edges.iter().map(|edge| edge.id).collect()
    }

    /// Reached edges as a `GeoJSON` `FeatureCollection`
    pub fn to_geojson(&self) -> Result<FeatureCollection, Error> {
        let features = self
            .edges
            .iter()
            .map(|edge| {
                let value = json!({
                    "type": "Feature",
                    "geometry": Geometry::new(GeoJsonValue::from(&edge.geometry)),
                    "properties": {
                        "edge": edge.id,
                        "agg_cost": edge.agg_cost,
                        "budget": self.budget,
                    }
                });
                serde_json::from_value::<Feature>(value).map_err(|e| Error::GeoJsonError(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FeatureCollection {
            features,
            bbox: None,
            foreign_members: None,
        })
    }
}

/// Every edge with at least one endpoint reachable from the vertex nearest
/// to `origin` within `budget` minutes.
///
/// Returns `Ok(None)` when the graph has no vertex to snap to. A disconnected
/// source yields only its own incident edges.
///
/// # Errors
///
/// Returns [`Error::InvalidData`] for a negative or non-finite budget.
pub fn find_reachability(
    graph: &RoadGraph,
    origin: Point<f64>,
    budget: Minutes,
) -> Result<Option<Reachability>, Error> {
    if !(budget.is_finite() && budget >= 0.0) {
        return Err(Error::InvalidData(format!(
            "cost budget must be a non-negative number, got {budget}"
        )));
    }

    let Some(start) = graph.nearest_vertex(&origin) else {
        debug!("No vertex near {origin:?}");
        return Ok(None);
    };

    let costs = dijkstra_path_weights(graph, start, budget);

    let reached_cost = |vertex: Option<VertexId>| {
        vertex
            .and_then(|id| graph.node_of(id))
            .and_then(|node| costs.get(&node).copied())
    };

    let edges: Vec<ReachedEdge> = graph
        .road_edges()
        .iter()
        .filter_map(|edge| {
            let agg_cost = match (reached_cost(edge.source), reached_cost(edge.target)) {
                (Some(a), Some(b)) => a.min(b),
                (Some(a), None) | (None, Some(a)) => a,
                (None, None) => return None,
            };
            Some(ReachedEdge {
                id: edge.id,
                geometry: edge.geometry.clone(),
                agg_cost,
            })
        })
        .collect();

    let mut vertices: Vec<(VertexId, Minutes)> = costs
        .iter()
        .map(|(&node, &cost)| (graph.vertex(node).id, cost))
        .collect();
    vertices.sort_by_key(|&(id, _)| id);

    debug!(
        "Reachability from vertex {} within {budget} min: {} vertices, {} edges",
        graph.vertex(start).id,
        vertices.len(),
        edges.len()
    );

    Ok(Some(Reachability {
        origin,
        source: graph.vertex(start).id,
        budget,
        edges,
        vertices,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RoadEdge, RoadVertex};
    use geo::line_string;
    use serde_json::Map;

    // 1 --3-- 2 --3-- 3 --3-- 4
    fn chain() -> RoadGraph {
        let vertices = (1..=4)
            .map(|id| RoadVertex {
                id,
                geometry: Point::new(id as f64, 0.0),
            })
            .collect();
        let edges = (1..=3)
            .map(|id: u64| RoadEdge {
                id,
                source: Some(id),
                target: Some(id + 1),
                cost: 3.0,
                reverse_cost: 3.0,
                geometry: line_string![(x: id as f64, y: 0.0), (x: (id + 1) as f64, y: 0.0)],
                properties: Map::new(),
            })
            .collect();
        RoadGraph::new(vertices, edges, false)
    }

    #[test]
    fn zero_budget_returns_incident_edges() {
        let graph = chain();
        let reach = find_reachability(&graph, Point::new(2.1, 0.0), 0.0)
            .unwrap()
            .unwrap();
        assert_eq!(reach.source, 2);
        assert_eq!(reach.edge_ids(), vec![1, 2]);
        assert!(reach.edges.iter().all(|edge| edge.agg_cost == 0.0));
    }

    #[test]
    fn budget_extends_to_edges_touching_visited_vertices() {
        let graph = chain();
        let reach = find_reachability(&graph, Point::new(1.0, 0.0), 3.0)
            .unwrap()
            .unwrap();
        assert_eq!(reach.edge_ids(), vec![1, 2]);
        assert_eq!(reach.vertices, vec![(1, 0.0), (2, 3.0)]);
    }

    #[test]
    fn negative_budget_is_rejected() {
        let graph = chain();
        assert!(matches!(
            find_reachability(&graph, Point::new(1.0, 0.0), -1.0),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn reachability_geojson_has_one_feature_per_edge() {
        let graph = chain();
        let reach = find_reachability(&graph, Point::new(1.0, 0.0), 10.0)
            .unwrap()
            .unwrap();
        assert_eq!(reach.to_geojson().unwrap().features.len(), 3);
    }
}
