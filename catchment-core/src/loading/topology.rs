//! Topology building: snaps loose line endpoints into shared vertices and
//! costs every edge.

use geo::Point;
use log::{info, warn};
use rstar::{PointDistance, RTree, primitives::GeomWithData};
use serde::Serialize;

use super::config::TopologyConfig;
use crate::algo::measure::line_length_m;
use crate::model::{DataStatus, RoadEdge, RoadVertex, TopologyStatus};
use crate::{EdgeId, Error, NetworkId, NetworkStore, VertexId};

type SnapPoint = GeomWithData<Point<f64>, VertexId>;

/// Resolves endpoints to vertices, creating a vertex when none lies within
/// the snap tolerance.
///
/// Among several vertices in range the closest wins, then the smallest id,
/// so resolution only depends on insertion order.
#[derive(Debug)]
pub struct VertexSnapper {
    tolerance_2: f64,
    rtree: RTree<SnapPoint>,
    vertices: Vec<RoadVertex>,
}

impl VertexSnapper {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance_2: tolerance * tolerance,
            rtree: RTree::new(),
            vertices: Vec::new(),
        }
    }

    pub fn resolve(&mut self, point: Point<f64>) -> VertexId {
        let existing = self
            .rtree
            .locate_within_distance(point, self.tolerance_2)
            .min_by(|a, b| {
                a.geom()
                    .distance_2(&point)
                    .total_cmp(&b.geom().distance_2(&point))
                    .then(a.data.cmp(&b.data))
            });
        if let Some(vertex) = existing {
            return vertex.data;
        }

        let id = self.vertices.len() as VertexId + 1;
        self.rtree.insert(SnapPoint::new(point, id));
        self.vertices.push(RoadVertex {
            id,
            geometry: point,
        });
        id
    }

    pub fn into_vertices(self) -> Vec<RoadVertex> {
        self.vertices
    }
}

/// Assigns `source`/`target` and symmetric costs to `edges`, returning the
/// vertex table.
///
/// Edges are processed in ascending id order so the same edge set always
/// yields the same vertex ids and costs.
pub fn snap_edges(edges: &mut [RoadEdge], config: &TopologyConfig) -> Vec<RoadVertex> {
    edges.sort_by_key(|edge| edge.id);
    let mut snapper = VertexSnapper::new(config.snap_tolerance);

    for edge in edges.iter_mut() {
        let (Some(first), Some(last)) = (edge.geometry.0.first(), edge.geometry.0.last()) else {
            warn!("Edge {} has no coordinates, leaving it unconnected", edge.id);
            continue;
        };
        let (first, last) = (Point::from(*first), Point::from(*last));
        edge.source = Some(snapper.resolve(first));
        edge.target = Some(snapper.resolve(last));

        let cost = line_length_m(&edge.geometry) / 1000.0 * config.pace_min_per_km;
        edge.cost = cost;
        edge.reverse_cost = cost;
    }

    snapper.into_vertices()
}

/// Outcome of one topology build
#[derive(Debug, Clone, Serialize)]
pub struct TopologyReport {
    pub network: NetworkId,
    pub status: TopologyStatus,
    pub vertex_count: usize,
    pub edge_count: usize,
    /// Edges with both endpoints and a positive cost
    pub valid_edges: usize,
    /// Valid edges picked for the post-build check
    pub sample: Vec<EdgeId>,
    pub required: usize,
    pub sample_check: bool,
}

impl TopologyReport {
    /// Turns a failed build into [`Error::InsufficientTopology`]
    ///
    /// # Errors
    ///
    /// Fails when the sample check did not pass.
    pub fn into_result(self) -> Result<Self, Error> {
        if self.sample_check {
            Ok(self)
        } else {
            Err(Error::InsufficientTopology {
                valid: self.valid_edges,
                required: self.required,
            })
        }
    }
}

/// Builds the topology of a deployed network and records the outcome in its
/// topology status (CREATING, then CREATED or FAILED).
///
/// A build whose sample check fails is still `Ok`, with a FAILED report.
///
/// # Errors
///
/// Returns [`Error::NetworkNotReady`] unless ingestion has finished, an
/// invalid configuration error, or any storage failure. Storage failures
/// after the build started leave the topology status FAILED.
pub fn build_topology(
    store: &dyn NetworkStore,
    network: NetworkId,
    config: &TopologyConfig,
) -> Result<TopologyReport, Error> {
    config.validate()?;
    let meta = store.network(network)?;
    if meta.data_status != DataStatus::Deployed {
        return Err(Error::NetworkNotReady(
            network,
            format!("data status is {:?}", meta.data_status),
        ));
    }

    store.set_topology_status(network, TopologyStatus::Creating)?;
    info!("Building topology for {network} ({})", meta.name);

    let report = match snap_and_store(store, network, config) {
        Ok(report) => report,
        Err(e) => {
            warn!("Topology build for {network} failed: {e}");
            if let Err(status_error) = store.set_topology_status(network, TopologyStatus::Failed) {
                warn!("Could not mark {network} as failed: {status_error}");
            }
            return Err(e);
        }
    };

    store.set_topology_status(network, report.status)?;
    if report.sample_check {
        info!(
            "Topology for {network} created: {} vertices, {} edges",
            report.vertex_count, report.edge_count
        );
    } else {
        warn!(
            "Topology for {network} failed its check: {} valid edges, {} required",
            report.valid_edges, report.required
        );
    }
    Ok(report)
}

fn snap_and_store(
    store: &dyn NetworkStore,
    network: NetworkId,
    config: &TopologyConfig,
) -> Result<TopologyReport, Error> {
    let mut edges = store.edges(network)?;
    let vertices = snap_edges(&mut edges, config);

    let valid: Vec<EdgeId> = edges
        .iter()
        .filter(|edge| edge.is_routable())
        .map(|edge| edge.id)
        .collect();
    let sample = sample_ids(&valid, config.sample_size);
    let sample_check = !valid.is_empty() && sample.len() >= config.sample_size;

    let report = TopologyReport {
        network,
        status: if sample_check {
            TopologyStatus::Created
        } else {
            TopologyStatus::Failed
        },
        vertex_count: vertices.len(),
        edge_count: edges.len(),
        valid_edges: valid.len(),
        sample,
        required: config.sample_size,
        sample_check,
    };

    store.replace_topology(network, vertices, edges)?;
    Ok(report)
}

/// Evenly strided pick of up to `size` ids
fn sample_ids(ids: &[EdgeId], size: usize) -> Vec<EdgeId> {
    if size == 0 || ids.is_empty() {
        return Vec::new();
    }
    let stride = (ids.len() / size).max(1);
    ids.iter().step_by(stride).take(size).copied().collect()
}
