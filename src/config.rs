//! Service configuration, read from TOML

use catchment_core::algo::{IsochroneParams, ZonationConfig};
use catchment_core::loading::{IngestConfig, TopologyConfig};
use catchment_core::routing::RoutingConfig;
use serde::{Deserialize, Serialize};

/// Every section is optional and falls back to its defaults.
///
/// ```toml
/// [log]
/// filter = "catchment=debug,info"
///
/// [topology]
/// snap_tolerance = 0.0001
/// sample_size = 5
///
/// [zonation]
/// max_time = 60
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log: LogConfig,
    pub topology: TopologyConfig,
    pub routing: RoutingConfig,
    pub isochrone: IsochroneParams,
    pub zonation: ZonationConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directives, used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// # Errors
    ///
    /// Returns the TOML error for malformed input or mistyped values.
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }
}
