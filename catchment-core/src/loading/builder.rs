use log::{info, warn};
use serde::Serialize;
use serde_json::Value;

use super::ingest::IngestQueue;
use super::normalize::{Crs, normalize_geojson};
use crate::{Error, NetworkId, NetworkStore};

/// What an upload handed over to ingestion
#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub network: NetworkId,
    /// Single-part lines queued for ingestion
    pub lines: usize,
    /// Features dropped by the normalizer, including non-line features
    pub skipped: usize,
    pub bbox: Option<[f64; 4]>,
}

/// Registers a road network from a `GeoJSON` document and queues its lines.
///
/// Returns as soon as the network is DEPLOYING; ingestion finishes in the
/// background. Point and polygon features are not part of a road network and
/// count as skipped.
///
/// # Errors
///
/// Fails when the document is not `GeoJSON`, uses an unsupported coordinate
/// system, or the network cannot be registered.
pub fn upload_network(
    store: &dyn NetworkStore,
    queue: &IngestQueue,
    name: &str,
    description: &str,
    document: &Value,
    crs: Option<Crs>,
) -> Result<UploadReport, Error> {
    let layer = normalize_geojson(document, crs)?;
    let skipped = layer.skipped + layer.points.len() + layer.polygons;
    if layer.lines.is_empty() {
        warn!("Layer {name} has no line features, its topology build will fail");
    }

    let network = store.create_network(name, description, layer.bbox)?;
    let lines = layer.lines.len();
    queue.submit(network, layer.lines)?;

    info!("Queued {lines} lines for {network} ({name}), {skipped} features skipped");
    Ok(UploadReport {
        network,
        lines,
        skipped,
        bbox: layer.bbox,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use crate::loading::{IngestConfig, await_deployment};
    use crate::model::DataStatus;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn upload_registers_and_deploys_lines() {
        let store: Arc<dyn NetworkStore> = Arc::new(MemoryStore::new());
        let queue = IngestQueue::spawn(Arc::clone(&store), IngestConfig::default()).unwrap();
        let document = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "name": "Jl. Thamrin" },
                  "geometry": { "type": "LineString",
                                "coordinates": [[106.82, -6.19], [106.82, -6.18]] } },
                { "type": "Feature", "properties": {},
                  "geometry": { "type": "Point", "coordinates": [106.82, -6.19] } }
            ]
        });

        let report =
            upload_network(store.as_ref(), &queue, "jakarta", "", &document, None).unwrap();
        assert_eq!(report.lines, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.bbox, Some([106.82, -6.19, 106.82, -6.18]));

        let status =
            await_deployment(store.as_ref(), report.network, Duration::from_secs(5)).unwrap();
        assert_eq!(status, DataStatus::Deployed);
        let edges = store.edges(report.network).unwrap();
        assert_eq!(edges[0].properties["name"], "Jl. Thamrin");
    }

    #[test]
    fn unsupported_crs_registers_nothing() {
        let store: Arc<dyn NetworkStore> = Arc::new(MemoryStore::new());
        let queue = IngestQueue::spawn(Arc::clone(&store), IngestConfig::default()).unwrap();
        let document = json!({
            "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "EPSG:32748" } },
            "features": []
        });

        let result = upload_network(store.as_ref(), &queue, "utm", "", &document, None);
        assert!(matches!(result, Err(Error::UnsupportedCrs(_))));
        assert!(store.networks().unwrap().is_empty());
    }
}
