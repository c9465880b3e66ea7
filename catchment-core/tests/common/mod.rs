#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use catchment_core::loading::{
    IngestConfig, IngestQueue, TopologyConfig, await_deployment, build_topology, snap_edges,
};
use catchment_core::model::{DataStatus, LineFeature, RoadEdge, RoadGraph};
use catchment_core::routing::RoutingConfig;
use catchment_core::{MemoryStore, NetworkId, NetworkStore};
use geo::{Coord, LineString, Point};
use serde_json::{Map, json};

pub const ORIGIN: Coord<f64> = Coord { x: 106.80, y: -6.20 };
/// Grid spacing in degrees, roughly 550 m
pub const SPACING: f64 = 0.005;

/// Coordinate of grid vertex `(i, j)`
pub fn grid_point(i: usize, j: usize) -> Point<f64> {
    Point::new(
        ORIGIN.x + i as f64 * SPACING,
        ORIGIN.y + j as f64 * SPACING,
    )
}

/// Street lines of an `n` x `n` grid, one line per block side
pub fn grid_lines(n: usize) -> Vec<LineFeature> {
    let mut lines = Vec::new();
    for i in 0..n {
        for j in 0..n {
            let here = grid_point(i, j);
            let mut push = |there: Point<f64>| {
                let mut properties = Map::new();
                properties.insert("name".to_string(), json!(format!("street {i}-{j}")));
                lines.push(LineFeature {
                    geometry: LineString::from(vec![here.0, there.0]),
                    properties,
                });
            };
            if i + 1 < n {
                push(grid_point(i + 1, j));
            }
            if j + 1 < n {
                push(grid_point(i, j + 1));
            }
        }
    }
    lines
}

/// Built grid graph without going through storage
pub fn grid_graph(n: usize) -> RoadGraph {
    let mut edges: Vec<RoadEdge> = grid_lines(n)
        .into_iter()
        .enumerate()
        .map(|(idx, line)| RoadEdge::new(idx as u64 + 1, line.geometry, line.properties))
        .collect();
    let vertices = snap_edges(&mut edges, &TopologyConfig::default());
    RoadGraph::new(vertices, edges, false)
}

/// Uploads, ingests and builds an `n` x `n` grid network
pub fn deployed_grid(store: &Arc<dyn NetworkStore>, n: usize) -> NetworkId {
    let queue = IngestQueue::spawn(Arc::clone(store), IngestConfig { batch_size: 7 }).unwrap();
    let network = store.create_network("grid", "test grid", None).unwrap();
    queue.submit(network, grid_lines(n)).unwrap();
    let status = await_deployment(store.as_ref(), network, Duration::from_secs(10)).unwrap();
    assert_eq!(status, DataStatus::Deployed);

    build_topology(store.as_ref(), network, &TopologyConfig::default())
        .unwrap()
        .into_result()
        .unwrap();
    network
}

pub fn memory_store() -> Arc<dyn NetworkStore> {
    Arc::new(MemoryStore::new())
}

pub fn load_graph(store: &Arc<dyn NetworkStore>, network: NetworkId) -> RoadGraph {
    RoadGraph::from_store(store.as_ref(), network, &RoutingConfig::default()).unwrap()
}
