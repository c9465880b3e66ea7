//! Point-to-point routing over a road graph

use geo::{Coord, LineString, Point};
use geojson::{Feature, FeatureCollection, Geometry, Value as GeoJsonValue};
use log::debug;
use serde_json::json;

use super::dijkstra::{PathTrace, dijkstra_path};
use crate::algo::measure::line_length_m;
use crate::model::RoadGraph;
use crate::{EdgeId, Error, Minutes, VertexId};

/// Shortest path between two coordinates
#[derive(Debug, Clone)]
pub struct Route {
    pub origin: Point<f64>,
    pub destination: Point<f64>,
    pub source: VertexId,
    pub target: VertexId,
    /// Traversed edges in travel order
    pub edges: Vec<EdgeId>,
    /// Edge geometries merged into one line, oriented from origin
    pub geometry: LineString<f64>,
    /// Sum of arc costs in minutes
    pub cost: Minutes,
    pub length_km: f64,
    /// `pace * length_km`, rounded to one decimal
    pub estimated_minutes: f64,
}

/// Shortest route between two arbitrary coordinates.
///
/// Both coordinates snap to their nearest vertex. Returns `Ok(None)` when no
/// vertex can be resolved or the vertices are not connected. Two coordinates
/// snapping to the same vertex give a zero-length route.
///
/// # Errors
///
/// Returns [`Error::InvalidData`] for a non-positive or non-finite pace.
pub fn find_route(
    graph: &RoadGraph,
    origin: Point<f64>,
    destination: Point<f64>,
    pace_min_per_km: f64,
) -> Result<Option<Route>, Error> {
    if !(pace_min_per_km.is_finite() && pace_min_per_km > 0.0) {
        return Err(Error::InvalidData(format!(
            "pace must be positive, got {pace_min_per_km}"
        )));
    }

    let (Some(start), Some(end)) = (
        graph.nearest_vertex(&origin),
        graph.nearest_vertex(&destination),
    ) else {
        debug!("No vertex near {origin:?} or {destination:?}");
        return Ok(None);
    };

    let Some(trace) = dijkstra_path(graph, start, end) else {
        debug!(
            "Vertices {} and {} are not connected",
            graph.vertex(start).id,
            graph.vertex(end).id
        );
        return Ok(None);
    };

    let geometry = merge_path_geometry(graph, &trace);
    let length_km = line_length_m(&geometry) / 1000.0;

    Ok(Some(Route {
        origin,
        destination,
        source: graph.vertex(start).id,
        target: graph.vertex(end).id,
        edges: trace
            .arcs
            .iter()
            .map(|&arc| graph.road_edge(graph.arc(arc).edge).id)
            .collect(),
        geometry,
        cost: trace.cost,
        length_km,
        estimated_minutes: (pace_min_per_km * length_km * 10.0).round() / 10.0,
    }))
}

/// Concatenates edge geometries along the path, reversing edges travelled
/// against their digitized direction and dropping repeated junction points.
fn merge_path_geometry(graph: &RoadGraph, trace: &PathTrace) -> LineString<f64> {
    let mut coords: Vec<Coord<f64>> = Vec::new();

    for &arc_idx in &trace.arcs {
        let arc = graph.arc(arc_idx);
        let line = &graph.road_edge(arc.edge).geometry;
        if arc.forward {
            coords.extend(line.0.iter().copied());
        } else {
            coords.extend(line.0.iter().rev().copied());
        }
    }
    coords.dedup();

    if coords.len() < 2 {
        // Zero-length route: degenerate line at the snapped vertex
        let at = coords
            .first()
            .copied()
            .unwrap_or_else(|| graph.vertex(trace.nodes[0]).geometry.into());
        coords = vec![at, at];
    }

    LineString::new(coords)
}

impl Route {
    /// Converts the route to a single-feature `GeoJSON` `FeatureCollection`
    pub fn to_geojson(&self) -> Result<FeatureCollection, Error> {
        Ok(FeatureCollection {
            features: vec![self.to_feature()?],
            bbox: None,
            foreign_members: None,
        })
    }

    pub fn to_feature(&self) -> Result<Feature, Error> {
        let geometry = Geometry::new(GeoJsonValue::from(&self.geometry));
        let value = json!({
            "type": "Feature",
            "geometry": geometry,
            "properties": {
                "start_lat": self.origin.y(),
                "start_lon": self.origin.x(),
                "end_lat": self.destination.y(),
                "end_lon": self.destination.x(),
                "name": "Route",
                "length": self.length_km,
                "time": self.estimated_minutes,
                "cost": self.cost,
                "edges": self.edges,
            }
        });

        serde_json::from_value::<Feature>(value).map_err(|e| Error::GeoJsonError(e.to_string()))
    }
}
