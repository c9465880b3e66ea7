pub use crate::{COARSE_SNAP_TOLERANCE, DEFAULT_PACE_MIN_PER_KM, FINE_SNAP_TOLERANCE};

// Storage and metadata
pub use crate::model::{DataStatus, Network, TopologyStatus};
pub use crate::{Error, MemoryStore, NetworkId, NetworkStore};

// Loading
pub use crate::loading::{
    Crs, IngestConfig, IngestQueue, TopologyConfig, TopologyReport, build_topology,
    normalize_geojson, upload_network,
};
pub use crate::model::{CandidateRecord, RecordCollection};

// Queries
pub use crate::algo::{
    Isochrone, IsochroneLayers, IsochroneParams, ZonationConfig, ZonationResult, find_zonation,
    generate_isochrone,
};
pub use crate::model::RoadGraph;
pub use crate::routing::{Reachability, Route, RoutingConfig, find_reachability, find_route};

// Core scalar types
pub use crate::EdgeId;
pub use crate::Minutes;
pub use crate::VertexId;
