use std::path::Path;

use catchment_core::algo::{self, ZonationConfig, ZonationResult};
use catchment_core::loading::{load_records_csv, records_from_geojson};
use catchment_core::model::RecordCollection;
use catchment_core::{Error, NetworkId};
use geo::Point;
use tracing::{info, warn};

use crate::model::Catchment;

impl Catchment {
    /// Matches candidate collections against isochrones of growing budget.
    /// `range` falls back to the configured time range.
    ///
    /// # Errors
    ///
    /// Fails when the network is not ready or the range is invalid.
    pub fn find_zonation(
        &self,
        network: NetworkId,
        origin: Point<f64>,
        collections: &[RecordCollection],
        range: Option<&ZonationConfig>,
    ) -> Result<Option<ZonationResult>, Error> {
        let graph = self.graph(network)?;
        let range = range.unwrap_or(&self.config().zonation);
        let result = algo::find_zonation(
            &graph,
            origin,
            collections,
            range,
            &self.config().isochrone,
            self.pace(),
        )?;

        if let Some(result) = &result {
            info!(
                network = %network,
                isochrones = result.isochrones.len(),
                in_zone = result.in_zone.len(),
                out_of_zone = result.out_of_zone.len(),
                "zonation done"
            );
        }
        Ok(result)
    }
}

/// Loads a candidate collection from a `.csv` or `GeoJSON` file, named after
/// the file stem
///
/// # Errors
///
/// Fails when the file cannot be read or parsed.
pub fn load_collection(path: &Path, in_zone: bool) -> Result<RecordCollection, Error> {
    let name = path
        .file_stem()
        .map_or_else(|| "records".to_string(), |stem| stem.to_string_lossy().into_owned());

    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        let loaded = load_records_csv(path, &name, in_zone)?;
        if loaded.skipped > 0 {
            warn!(file = %path.display(), skipped = loaded.skipped, "rows skipped");
        }
        return Ok(loaded.collection);
    }

    let document: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    records_from_geojson(&document, None, &name, in_zone)
}
