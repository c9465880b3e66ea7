//! Road network model

pub mod components;
pub mod network;

pub use components::{RoadArc, RoadEdge, RoadVertex};
pub use network::{IndexedPoint, RoadGraph};
