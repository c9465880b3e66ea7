//! Road-network catchment analysis.
//!
//! Builds a routable graph out of loose line geometry, answers shortest-path
//! and driving-distance queries over it, turns reachability results into
//! concave isochrone polygons and matches point records against them.

pub mod algo;
mod error;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod routing;
pub mod store;

pub use error::Error;
pub use store::{MemoryStore, NetworkId, NetworkStore};

/// Identifier of a graph vertex inside one network, starting at 1
pub type VertexId = u64;
/// Identifier of a road edge inside one network, stable across topology rebuilds
pub type EdgeId = u64;
/// Travel cost in minutes
pub type Minutes = f64;

/// Assumed walking/driving pace used for edge costs, minutes per kilometre
pub const DEFAULT_PACE_MIN_PER_KM: f64 = 15.0;
/// Finer of the two snap tolerances, in degrees (~5.5 m)
pub const FINE_SNAP_TOLERANCE: f64 = 0.000_05;
/// Coarser snap tolerance, in degrees (~11 m)
pub const COARSE_SNAP_TOLERANCE: f64 = 0.000_1;
