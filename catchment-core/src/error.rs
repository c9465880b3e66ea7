use thiserror::Error;

use crate::NetworkId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed geometry: {0}")]
    MalformedGeometry(String),
    #[error("Insufficient topology: {valid} valid edges, {required} required")]
    InsufficientTopology { valid: usize, required: usize },
    #[error("Unknown network {0}")]
    UnknownNetwork(NetworkId),
    #[error("Network {0} is not ready: {1}")]
    NetworkNotReady(NetworkId, String),
    #[error("Unsupported coordinate reference system: {0}")]
    UnsupportedCrs(String),
    #[error("Storage failure: {0}")]
    StorageFailure(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("GeoJSON error: {0}")]
    GeoJsonError(String),
}
