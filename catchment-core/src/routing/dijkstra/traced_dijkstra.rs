use std::collections::BinaryHeap;

use fixedbitset::FixedBitSet;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use super::state::State;
use crate::Minutes;
use crate::model::RoadGraph;

/// Nodes and arcs of a shortest path, in travel order
#[derive(Debug, Clone)]
pub(crate) struct PathTrace {
    pub(crate) nodes: Vec<NodeIndex>,
    pub(crate) arcs: Vec<EdgeIndex>,
    pub(crate) cost: Minutes,
}

/// Single-target Dijkstra with predecessor tracking.
///
/// The search stops on the first pop of `target`, which is optimal for
/// non-negative costs. Returns `None` when the frontier runs dry first.
pub(crate) fn dijkstra_path(
    graph: &RoadGraph,
    start: NodeIndex,
    target: NodeIndex,
) -> Option<PathTrace> {
    if start == target {
        return Some(PathTrace {
            nodes: vec![start],
            arcs: Vec::new(),
            cost: 0.0,
        });
    }

    let node_count = graph.node_count();
    let mut distances = vec![Minutes::INFINITY; node_count];
    let mut predecessors: Vec<Option<(NodeIndex, EdgeIndex)>> = vec![None; node_count];
    let mut settled = FixedBitSet::with_capacity(node_count);
    let mut heap = BinaryHeap::with_capacity(node_count.min(1000) / 4);

    // Start node has distance 0
    distances[start.index()] = 0.0;
    heap.push(State {
        cost: 0.0,
        node: start,
    });

    let mut reached = false;
    while let Some(State { cost, node }) = heap.pop() {
        if settled.contains(node.index()) {
            continue;
        }
        settled.insert(node.index());

        // Check if we've reached the target
        if node == target {
            reached = true;
            break;
        }

        for edge in graph.edges(node) {
            let next = edge.target();
            if settled.contains(next.index()) {
                continue;
            }
            let next_cost = cost + edge.weight().cost;
            if next_cost < distances[next.index()] {
                distances[next.index()] = next_cost;
                predecessors[next.index()] = Some((node, edge.id()));
                heap.push(State {
                    cost: next_cost,
                    node: next,
                });
            }
        }
    }

    if !reached {
        return None;
    }

    // Follow predecessors backward from target to start
    let mut nodes = vec![target];
    let mut arcs = Vec::new();
    let mut current = target;
    while current != start {
        let (prev, arc) = predecessors[current.index()]?;
        nodes.push(prev);
        arcs.push(arc);
        current = prev;
    }
    nodes.reverse();
    arcs.reverse();

    Some(PathTrace {
        nodes,
        arcs,
        cost: distances[target.index()],
    })
}
