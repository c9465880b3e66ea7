//! Catchment service: road network upload, topology building, routing,
//! isochrones and zonation over in-memory network storage.

pub mod config;
pub mod isochrone;
pub mod model;
pub mod routing;
pub mod zonation;

pub use config::{AppConfig, LogConfig};
pub use model::Catchment;

pub use catchment_core::prelude;
