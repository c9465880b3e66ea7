//! Getting data in: `GeoJSON` normalization, background ingestion, topology
//! building and candidate record loading.

mod builder;
mod config;
mod ingest;
pub mod normalize;
mod records;
mod topology;

pub use builder::{UploadReport, upload_network};
pub use config::{IngestConfig, TopologyConfig};
pub use ingest::{IngestQueue, await_deployment};
pub use normalize::{Crs, NormalizedLayer, normalize_geojson};
pub use records::{CsvRecords, load_records_csv, read_records_csv, records_from_geojson};
pub use topology::{TopologyReport, VertexSnapper, build_topology, snap_edges};
