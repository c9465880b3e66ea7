//! Network storage partitioned by network id
//!
//! Every network owns its own edge and vertex tables. The tables of one
//! network sit behind their own lock, so ingesting one network never blocks
//! queries against another.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use hashbrown::HashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::model::{DataStatus, LineFeature, Network, RoadEdge, RoadVertex, TopologyStatus};
use crate::{EdgeId, Error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NetworkId(pub u64);

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "network-{}", self.0)
    }
}

/// Storage collaborator consumed by ingestion, topology and routing
pub trait NetworkStore: Send + Sync {
    /// Registers a network with status UPLOADED
    fn create_network(
        &self,
        name: &str,
        description: &str,
        bbox: Option<[f64; 4]>,
    ) -> Result<NetworkId, Error>;

    fn network(&self, id: NetworkId) -> Result<Network, Error>;

    fn networks(&self) -> Result<Vec<Network>, Error>;

    fn set_data_status(&self, id: NetworkId, status: DataStatus) -> Result<(), Error>;

    fn set_topology_status(&self, id: NetworkId, status: TopologyStatus) -> Result<(), Error>;

    /// Writes one ingestion batch, returning the ids assigned to the new edges
    fn append_edges(&self, id: NetworkId, features: Vec<LineFeature>)
    -> Result<Vec<EdgeId>, Error>;

    /// Snapshot of the edge table in ascending id order
    fn edges(&self, id: NetworkId) -> Result<Vec<RoadEdge>, Error>;

    /// Snapshot of the vertex table in ascending id order
    fn vertices(&self, id: NetworkId) -> Result<Vec<RoadVertex>, Error>;

    /// Swaps in a freshly built vertex table and the re-costed edges
    fn replace_topology(
        &self,
        id: NetworkId,
        vertices: Vec<RoadVertex>,
        edges: Vec<RoadEdge>,
    ) -> Result<(), Error>;

    /// Drops the network together with its tables
    fn remove_network(&self, id: NetworkId) -> Result<(), Error>;
}

#[derive(Debug)]
struct Partition {
    meta: Network,
    edges: Vec<RoadEdge>,
    vertices: Vec<RoadVertex>,
    next_edge_id: EdgeId,
}

/// In-process [`NetworkStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    next_id: AtomicU64,
    partitions: RwLock<HashMap<NetworkId, Arc<RwLock<Partition>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn partition(&self, id: NetworkId) -> Result<Arc<RwLock<Partition>>, Error> {
        self.partitions
            .read()
            .get(&id)
            .cloned()
            .ok_or(Error::UnknownNetwork(id))
    }
}

impl NetworkStore for MemoryStore {
    fn create_network(
        &self,
        name: &str,
        description: &str,
        bbox: Option<[f64; 4]>,
    ) -> Result<NetworkId, Error> {
        let id = NetworkId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let partition = Partition {
            meta: Network::new(id, name, description, bbox),
            edges: Vec::new(),
            vertices: Vec::new(),
            next_edge_id: 1,
        };
        self.partitions
            .write()
            .insert(id, Arc::new(RwLock::new(partition)));
        Ok(id)
    }

    fn network(&self, id: NetworkId) -> Result<Network, Error> {
        Ok(self.partition(id)?.read().meta.clone())
    }

    fn networks(&self) -> Result<Vec<Network>, Error> {
        let mut networks: Vec<Network> = self
            .partitions
            .read()
            .values()
            .map(|partition| partition.read().meta.clone())
            .collect();
        networks.sort_by_key(|network| network.created_at);
        Ok(networks)
    }

    fn set_data_status(&self, id: NetworkId, status: DataStatus) -> Result<(), Error> {
        let partition = self.partition(id)?;
        let mut partition = partition.write();
        partition.meta.data_status = status;
        partition.meta.touch();
        Ok(())
    }

    fn set_topology_status(&self, id: NetworkId, status: TopologyStatus) -> Result<(), Error> {
        let partition = self.partition(id)?;
        let mut partition = partition.write();
        partition.meta.topology_status = Some(status);
        partition.meta.touch();
        Ok(())
    }

    fn append_edges(
        &self,
        id: NetworkId,
        features: Vec<LineFeature>,
    ) -> Result<Vec<EdgeId>, Error> {
        let partition = self.partition(id)?;
        let mut partition = partition.write();

        let mut ids = Vec::with_capacity(features.len());
        for feature in features {
            let edge_id = partition.next_edge_id;
            partition.next_edge_id += 1;
            partition
                .edges
                .push(RoadEdge::new(edge_id, feature.geometry, feature.properties));
            ids.push(edge_id);
        }
        Ok(ids)
    }

    fn edges(&self, id: NetworkId) -> Result<Vec<RoadEdge>, Error> {
        Ok(self.partition(id)?.read().edges.clone())
    }

    fn vertices(&self, id: NetworkId) -> Result<Vec<RoadVertex>, Error> {
        Ok(self.partition(id)?.read().vertices.clone())
    }

    fn replace_topology(
        &self,
        id: NetworkId,
        mut vertices: Vec<RoadVertex>,
        mut edges: Vec<RoadEdge>,
    ) -> Result<(), Error> {
        let partition = self.partition(id)?;
        let mut partition = partition.write();

        edges.sort_by_key(|edge| edge.id);
        vertices.sort_by_key(|vertex| vertex.id);
        if edges.len() != partition.edges.len()
            || edges
                .iter()
                .zip(&partition.edges)
                .any(|(new, old)| new.id != old.id)
        {
            return Err(Error::StorageFailure(format!(
                "topology for {id} does not match its stored edges"
            )));
        }

        partition.edges = edges;
        partition.vertices = vertices;
        partition.meta.touch();
        Ok(())
    }

    fn remove_network(&self, id: NetworkId) -> Result<(), Error> {
        self.partitions
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(Error::UnknownNetwork(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::line_string;
    use serde_json::Map;

    fn line(x: f64) -> LineFeature {
        LineFeature {
            geometry: line_string![(x: x, y: 0.0), (x: x + 1.0, y: 0.0)],
            properties: Map::new(),
        }
    }

    #[test]
    fn new_network_starts_uploaded() {
        let store = MemoryStore::new();
        let id = store.create_network("roads", "", None).unwrap();
        let network = store.network(id).unwrap();
        assert_eq!(network.data_status, DataStatus::Uploaded);
        assert!(network.topology_status.is_none());
    }

    #[test]
    fn edge_ids_are_per_network() {
        let store = MemoryStore::new();
        let a = store.create_network("a", "", None).unwrap();
        let b = store.create_network("b", "", None).unwrap();

        assert_eq!(store.append_edges(a, vec![line(0.0), line(1.0)]).unwrap(), vec![1, 2]);
        assert_eq!(store.append_edges(b, vec![line(5.0)]).unwrap(), vec![1]);
        assert_eq!(store.append_edges(a, vec![line(2.0)]).unwrap(), vec![3]);

        assert_eq!(store.edges(a).unwrap().len(), 3);
        assert_eq!(store.edges(b).unwrap().len(), 1);
    }

    #[test]
    fn replace_topology_rejects_foreign_edges() {
        let store = MemoryStore::new();
        let id = store.create_network("a", "", None).unwrap();
        store.append_edges(id, vec![line(0.0)]).unwrap();

        let mut edges = store.edges(id).unwrap();
        edges[0].id = 42;
        assert!(matches!(
            store.replace_topology(id, vec![], edges),
            Err(Error::StorageFailure(_))
        ));
    }

    #[test]
    fn removed_network_is_unknown() {
        let store = MemoryStore::new();
        let id = store.create_network("a", "", None).unwrap();
        store.remove_network(id).unwrap();
        assert!(matches!(store.network(id), Err(Error::UnknownNetwork(_))));
    }
}
