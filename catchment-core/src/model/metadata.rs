//! Network metadata and its two status machines

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::NetworkId;

/// Ingestion state of a network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataStatus {
    Uploaded,
    Deploying,
    Deployed,
    Failed,
}

/// Topology build state of a network, `None` on [`Network`] until first build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TopologyStatus {
    Creating,
    Created,
    Failed,
}

impl DataStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Deployed | Self::Failed)
    }
}

/// One uploaded road dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub id: NetworkId,
    pub name: String,
    pub description: String,
    /// `[min_x, min_y, max_x, max_y]` in WGS84
    pub bbox: Option<[f64; 4]>,
    pub data_status: DataStatus,
    pub topology_status: Option<TopologyStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Network {
    pub fn new(id: NetworkId, name: &str, description: &str, bbox: Option<[f64; 4]>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.to_string(),
            description: description.to_string(),
            bbox,
            data_status: DataStatus::Uploaded,
            topology_status: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Deployed with a created topology, i.e. safe to query
    pub fn is_routable(&self) -> bool {
        self.data_status == DataStatus::Deployed
            && self.topology_status == Some(TopologyStatus::Created)
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
