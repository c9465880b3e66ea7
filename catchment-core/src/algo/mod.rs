//! Geometry algorithms layered on top of the graph engine

pub mod alpha_shape;
pub mod isochrone;
pub mod measure;
pub mod projection;
pub mod zonation;

pub use isochrone::{
    Isochrone, IsochroneLayers, IsochroneParams, bulk_isochrones, calculate_isochrone,
    generate_isochrone,
};
pub use zonation::{RecordRoute, ZonationConfig, ZonationResult, ZoneMatch, find_zonation};
