//! Graph engine: shortest paths and driving-distance reachability

use serde::{Deserialize, Serialize};

pub mod dijkstra;
pub mod reachability;
pub mod route;

pub use reachability::{Reachability, ReachedEdge, find_reachability};
pub use route::{Route, find_route};

/// How the routing graph is assembled from the edge table
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Honour `cost`/`reverse_cost` per direction instead of treating every
    /// edge as two-way at its cheaper cost
    pub directed: bool,
}
