use serde::{Deserialize, Serialize};

use crate::{DEFAULT_PACE_MIN_PER_KM, Error, FINE_SNAP_TOLERANCE};

/// Parameters of a topology build
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Endpoints closer than this share a vertex, in source coordinate units
    /// (degrees for WGS84 networks)
    pub snap_tolerance: f64,
    /// Minutes per kilometre used to turn edge length into cost
    pub pace_min_per_km: f64,
    /// Number of edges that must pass the post-build check
    pub sample_size: usize,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            snap_tolerance: FINE_SNAP_TOLERANCE,
            pace_min_per_km: DEFAULT_PACE_MIN_PER_KM,
            sample_size: 10,
        }
    }
}

impl TopologyConfig {
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] for a negative tolerance or a
    /// non-positive pace.
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.snap_tolerance.is_finite() && self.snap_tolerance >= 0.0) {
            return Err(Error::InvalidData(format!(
                "snap tolerance must be a non-negative number, got {}",
                self.snap_tolerance
            )));
        }
        if !(self.pace_min_per_km.is_finite() && self.pace_min_per_km > 0.0) {
            return Err(Error::InvalidData(format!(
                "pace must be positive, got {}",
                self.pace_min_per_km
            )));
        }
        Ok(())
    }
}

/// Parameters of background ingestion
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Features written to storage per batch
    pub batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { batch_size: 500 }
    }
}
