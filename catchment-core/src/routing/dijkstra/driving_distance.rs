use std::collections::BinaryHeap;

use hashbrown::HashMap;
use petgraph::{graph::NodeIndex, visit::EdgeRef};

use super::state::State;
use crate::Minutes;
use crate::model::RoadGraph;

/// Dijkstra's algorithm bounded by a cost budget (driving distance).
/// Returns every node whose cheapest cost from `start` is within
/// `max_cost`, mapped to that cost in minutes.
pub fn dijkstra_path_weights(
    graph: &RoadGraph,
    start: NodeIndex,
    max_cost: Minutes,
) -> HashMap<NodeIndex, Minutes> {
    let mut distances: HashMap<NodeIndex, Minutes> = HashMap::new();
    let mut heap = BinaryHeap::new();

    // Start node has distance 0
    heap.push(State {
        cost: 0.0,
        node: start,
    });
    distances.insert(start, 0.0);

    while let Some(State { cost, node }) = heap.pop() {
        // Skip if we've found a better path
        if let Some(&best) = distances.get(&node) {
            if cost > best {
                continue;
            }
        }

        // Examine neighbors
        for edge in graph.edges(node) {
            let next = edge.target();
            let next_cost = cost + edge.weight().cost;

            // Never expand beyond the budget
            if next_cost > max_cost {
                continue;
            }

            // Add or update distance if better using Entry API
            match distances.entry(next) {
                hashbrown::hash_map::Entry::Vacant(entry) => {
                    entry.insert(next_cost);
                    heap.push(State {
                        cost: next_cost,
                        node: next,
                    });
                }
                hashbrown::hash_map::Entry::Occupied(mut entry) => {
                    if next_cost < *entry.get() {
                        *entry.get_mut() = next_cost;
                        heap.push(State {
                            cost: next_cost,
                            node: next,
                        });
                    }
                }
            }
        }
    }

    distances
}
