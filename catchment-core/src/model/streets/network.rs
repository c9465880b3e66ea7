//! In-memory routing graph for one network

use geo::Point;
use hashbrown::HashMap;
use log::{debug, warn};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use rstar::{PointDistance, RTree, primitives::GeomWithData};

use super::{RoadArc, RoadEdge, RoadVertex};
use crate::model::TopologyStatus;
use crate::routing::RoutingConfig;
use crate::{Error, NetworkId, NetworkStore, VertexId};

/// Vertex position in the spatial index, tagged with its graph node
pub type IndexedPoint = GeomWithData<Point<f64>, NodeIndex>;

/// Routable view over a built network.
///
/// Nodes are inserted in ascending vertex id order, so a lower `NodeIndex`
/// always means a lower vertex id.
#[derive(Debug, Clone)]
pub struct RoadGraph {
    pub graph: DiGraph<RoadVertex, RoadArc>,
    edges: Vec<RoadEdge>,
    rtree: RTree<IndexedPoint>,
    vertex_index: HashMap<VertexId, NodeIndex>,
}

impl RoadGraph {
    /// Builds the graph from vertex and edge tables.
    ///
    /// Undirected graphs get one arc per direction weighted with the cheaper
    /// of the two costs. Directed graphs weight the forward arc with `cost`
    /// and the backward arc with `reverse_cost`, dropping negative ones.
    pub fn new(mut vertices: Vec<RoadVertex>, edges: Vec<RoadEdge>, directed: bool) -> Self {
        vertices.sort_by_key(|v| v.id);
        vertices.dedup_by_key(|v| v.id);

        let mut graph = DiGraph::with_capacity(vertices.len(), edges.len() * 2);
        let mut vertex_index = HashMap::with_capacity(vertices.len());
        for vertex in vertices {
            let id = vertex.id;
            let node = graph.add_node(vertex);
            vertex_index.insert(id, node);
        }

        let mut kept = Vec::with_capacity(edges.len());
        for edge in edges {
            let (Some(source), Some(target)) = (edge.source, edge.target) else {
                warn!("Edge {} has no topology, leaving it out of the graph", edge.id);
                continue;
            };
            let (Some(&from), Some(&to)) = (vertex_index.get(&source), vertex_index.get(&target))
            else {
                warn!(
                    "Edge {} references unknown vertices {source} -> {target}",
                    edge.id
                );
                continue;
            };

            let slot = kept.len();
            let (forward_cost, backward_cost) = arc_costs(&edge, directed);
            if let Some(cost) = forward_cost {
                graph.add_edge(
                    from,
                    to,
                    RoadArc {
                        edge: slot,
                        cost,
                        forward: true,
                    },
                );
            }
            if let Some(cost) = backward_cost {
                graph.add_edge(
                    to,
                    from,
                    RoadArc {
                        edge: slot,
                        cost,
                        forward: false,
                    },
                );
            }
            kept.push(edge);
        }

        let rtree = RTree::bulk_load(
            graph
                .node_indices()
                .map(|node| GeomWithData::new(graph[node].geometry, node))
                .collect(),
        );

        debug!(
            "Road graph ready: {} vertices, {} edges, {} arcs",
            graph.node_count(),
            kept.len(),
            graph.edge_count()
        );

        Self {
            graph,
            edges: kept,
            rtree,
            vertex_index,
        }
    }

    /// Loads the tables of a network whose topology has been created
    ///
    /// # Errors
    ///
    /// Returns [`Error::NetworkNotReady`] unless the network is deployed with a
    /// created topology, or any storage error.
    pub fn from_store(
        store: &dyn NetworkStore,
        network: NetworkId,
        config: &RoutingConfig,
    ) -> Result<Self, Error> {
        let meta = store.network(network)?;
        if !meta.is_routable() {
            return Err(Error::NetworkNotReady(
                network,
                format!(
                    "data {:?}, topology {:?}",
                    meta.data_status,
                    meta.topology_status.unwrap_or(TopologyStatus::Failed)
                ),
            ));
        }
        let vertices = store.vertices(network)?;
        let edges = store.edges(network)?;
        Ok(Self::new(vertices, edges, config.directed))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Outgoing arcs of a node
    pub fn edges(
        &self,
        node: NodeIndex,
    ) -> impl Iterator<Item = petgraph::graph::EdgeReference<'_, RoadArc>> {
        self.graph.edges(node)
    }

    pub fn arc(&self, arc: EdgeIndex) -> &RoadArc {
        &self.graph[arc]
    }

    pub fn vertex(&self, node: NodeIndex) -> &RoadVertex {
        &self.graph[node]
    }

    pub fn node_of(&self, vertex: VertexId) -> Option<NodeIndex> {
        self.vertex_index.get(&vertex).copied()
    }

    /// Road edges that made it into the graph, in ascending id order
    pub fn road_edges(&self) -> &[RoadEdge] {
        &self.edges
    }

    pub fn road_edge(&self, slot: usize) -> &RoadEdge {
        &self.edges[slot]
    }

    /// Nearest vertex to `point`, ties going to the smallest vertex id
    pub fn nearest_vertex(&self, point: &Point<f64>) -> Option<NodeIndex> {
        let nearest = self.rtree.nearest_neighbor(point)?;
        let best_distance = nearest.geom().distance_2(point);

        self.rtree
            .locate_within_distance(*point, best_distance)
            .map(|candidate| candidate.data)
            .min()
            .or(Some(nearest.data))
    }

    /// Up to `count` vertices ordered by distance to `point`
    pub fn nearest_vertices(&self, point: &Point<f64>, count: usize) -> Vec<NodeIndex> {
        self.rtree
            .nearest_neighbor_iter(point)
            .take(count)
            .map(|candidate| candidate.data)
            .collect()
    }
}

fn arc_costs(edge: &RoadEdge, directed: bool) -> (Option<f64>, Option<f64>) {
    let forward = (edge.cost >= 0.0).then_some(edge.cost);
    let backward = (edge.reverse_cost >= 0.0).then_some(edge.reverse_cost);

    if directed {
        return (forward, backward);
    }

    let cheapest = match (forward, backward) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    (cheapest, cheapest)
}
