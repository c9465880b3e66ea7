//! Data model for road networks and catchment analysis
//!
//! Contains network metadata, the routing graph and the point records that
//! are matched against isochrones.

pub mod feature;
pub mod metadata;
pub mod record;
pub mod streets;

pub use feature::{LineFeature, PointFeature};
pub use metadata::{DataStatus, Network, TopologyStatus};
pub use record::{CandidateRecord, RecordCollection};
pub use streets::{RoadArc, RoadEdge, RoadGraph, RoadVertex};
