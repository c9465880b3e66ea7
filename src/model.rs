use std::sync::Arc;
use std::time::Duration;

use catchment_core::loading::{
    self, Crs, IngestQueue, TopologyReport, UploadReport, await_deployment,
};
use catchment_core::model::{DataStatus, Network, RoadGraph};
use catchment_core::{Error, MemoryStore, NetworkId, NetworkStore};
use hashbrown::HashMap;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::AppConfig;

/// Catchment service
///
/// Owns the network store, the ingestion worker and a cache of routing
/// graphs. Every query operation resolves its network through the cache, so
/// concurrent queries against one network share a single graph.
///
/// Typical flow:
///
/// 1. [`Catchment::upload_network`] registers a layer and queues ingestion
/// 2. [`Catchment::await_deployment`] (or polling [`Catchment::network`])
///    until the data status is DEPLOYED
/// 3. [`Catchment::build_topology`]
/// 4. route, reachability, isochrone and zonation queries
pub struct Catchment {
    store: Arc<dyn NetworkStore>,
    queue: IngestQueue,
    config: AppConfig,
    graphs: RwLock<GraphCache>,
}

/// Loaded graphs plus a per-network generation, bumped on every change to a
/// network's topology. A graph is only cached under the generation it was
/// loaded in.
#[derive(Default)]
struct GraphCache {
    graphs: HashMap<NetworkId, Arc<RoadGraph>>,
    generations: HashMap<NetworkId, u64>,
}

impl GraphCache {
    fn generation(&self, network: NetworkId) -> u64 {
        self.generations.get(&network).copied().unwrap_or_default()
    }

    fn invalidate(&mut self, network: NetworkId) {
        self.graphs.remove(&network);
        *self.generations.entry(network).or_default() += 1;
    }
}

impl Catchment {
    /// Service backed by an in-memory store
    ///
    /// # Errors
    ///
    /// Fails when the ingestion worker cannot be started.
    pub fn new(config: AppConfig) -> Result<Self, Error> {
        Self::with_store(Arc::new(MemoryStore::new()), config)
    }

    /// # Errors
    ///
    /// Fails when the ingestion worker cannot be started.
    pub fn with_store(store: Arc<dyn NetworkStore>, config: AppConfig) -> Result<Self, Error> {
        let queue = IngestQueue::spawn(Arc::clone(&store), config.ingest)?;
        Ok(Self {
            store,
            queue,
            config,
            graphs: RwLock::new(GraphCache::default()),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn NetworkStore {
        self.store.as_ref()
    }

    /// Registers a road network from `GeoJSON` and starts ingesting it.
    /// `crs` names the input system (e.g. `EPSG:3857`) when the document
    /// does not.
    ///
    /// # Errors
    ///
    /// Fails for unreadable documents and unsupported coordinate systems.
    pub fn upload_network(
        &self,
        name: &str,
        description: &str,
        document: &Value,
        crs: Option<&str>,
    ) -> Result<UploadReport, Error> {
        let crs = crs.map(str::parse::<Crs>).transpose()?;
        let report =
            loading::upload_network(self.store(), &self.queue, name, description, document, crs)?;
        info!(
            network = %report.network,
            lines = report.lines,
            skipped = report.skipped,
            "network uploaded"
        );
        Ok(report)
    }

    /// # Errors
    ///
    /// Returns [`Error::UnknownNetwork`] for unknown ids.
    pub fn network(&self, network: NetworkId) -> Result<Network, Error> {
        self.store.network(network)
    }

    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn networks(&self) -> Result<Vec<Network>, Error> {
        self.store.networks()
    }

    /// Blocks until ingestion of `network` finished or `timeout` passed
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn await_deployment(
        &self,
        network: NetworkId,
        timeout: Duration,
    ) -> Result<DataStatus, Error> {
        await_deployment(self.store(), network, timeout)
    }

    /// Builds (or rebuilds) the topology of a deployed network
    ///
    /// # Errors
    ///
    /// See [`catchment_core::loading::build_topology`].
    pub fn build_topology(&self, network: NetworkId) -> Result<TopologyReport, Error> {
        self.graphs.write().invalidate(network);
        let report = loading::build_topology(self.store(), network, &self.config.topology);
        // Loads that started during the build must not be cached either
        self.graphs.write().invalidate(network);
        let report = report?;
        info!(
            network = %network,
            status = ?report.status,
            vertices = report.vertex_count,
            edges = report.edge_count,
            "topology built"
        );
        Ok(report)
    }

    /// Drops a network together with its cached graph
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownNetwork`] for unknown ids.
    pub fn delete_network(&self, network: NetworkId) -> Result<(), Error> {
        self.graphs.write().invalidate(network);
        self.store.remove_network(network)?;
        info!(network = %network, "network deleted");
        Ok(())
    }

    /// Routing graph of a network, loaded on first use
    ///
    /// # Errors
    ///
    /// Returns [`Error::NetworkNotReady`] until the network is deployed with a
    /// created topology.
    pub fn graph(&self, network: NetworkId) -> Result<Arc<RoadGraph>, Error> {
        let generation = {
            let cache = self.graphs.read();
            if let Some(graph) = cache.graphs.get(&network) {
                return Ok(Arc::clone(graph));
            }
            cache.generation(network)
        };

        let graph = Arc::new(RoadGraph::from_store(
            self.store(),
            network,
            &self.config.routing,
        )?);
        debug!(network = %network, nodes = graph.node_count(), "graph loaded");
        if !self.remember(network, generation, &graph) {
            debug!(network = %network, "topology changed while loading, graph not cached");
        }
        Ok(graph)
    }

    /// Caches `graph` unless the network changed since `generation`
    fn remember(&self, network: NetworkId, generation: u64, graph: &Arc<RoadGraph>) -> bool {
        let mut cache = self.graphs.write();
        if cache.generation(network) != generation {
            return false;
        }
        cache
            .graphs
            .entry(network)
            .or_insert_with(|| Arc::clone(graph));
        true
    }

    /// Minutes per kilometre shared by edge costs and route estimates
    pub(crate) fn pace(&self) -> f64 {
        self.config.topology.pace_min_per_km
    }
}
