//! Catchment matching of point records against growing isochrones.
//!
//! The matcher walks the time range in fixed steps, generating one isochrone
//! per step and collecting every candidate record that falls inside it. A
//! record is reported once, tagged with the smallest budget that reached it.
//! Records flagged in-zone are additionally routed to from the origin.

use geo::Point;
use geojson::{Feature, FeatureCollection, Geometry, Value as GeoJsonValue};
use hashbrown::HashSet;
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::isochrone::{Isochrone, IsochroneParams, calculate_isochrone};
use super::measure::distance_m;
use crate::model::{CandidateRecord, RecordCollection, RoadGraph};
use crate::routing::{Route, find_reachability, find_route};
use crate::{Error, Minutes};

/// Most isochrones a single zonation run may generate
pub const MAX_TIME_STEPS: u32 = 1_000;

/// Time range walked by [`find_zonation`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ZonationConfig {
    pub min_time: Minutes,
    pub max_time: Minutes,
    pub step: Minutes,
    /// Iteration stops once more than this many in-zone records matched
    pub in_zone_threshold: usize,
}

impl Default for ZonationConfig {
    fn default() -> Self {
        Self {
            min_time: 5.0,
            max_time: 30.0,
            step: 5.0,
            in_zone_threshold: 3,
        }
    }
}

impl ZonationConfig {
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] for a negative start, an inverted range,
    /// a non-positive step or more than [`MAX_TIME_STEPS`] steps.
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.min_time.is_finite() && self.min_time >= 0.0) {
            return Err(Error::InvalidData(format!(
                "min_time must be a non-negative number, got {}",
                self.min_time
            )));
        }
        if !(self.max_time.is_finite() && self.max_time >= self.min_time) {
            return Err(Error::InvalidData(format!(
                "max_time {} must not be below min_time {}",
                self.max_time, self.min_time
            )));
        }
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(Error::InvalidData(format!(
                "step must be positive, got {}",
                self.step
            )));
        }
        let intervals = (self.max_time - self.min_time) / self.step;
        if intervals >= f64::from(MAX_TIME_STEPS) {
            return Err(Error::InvalidData(format!(
                "{} to {} min in steps of {} exceeds {MAX_TIME_STEPS} isochrones",
                self.min_time, self.max_time, self.step
            )));
        }
        Ok(())
    }

    /// `min_time, min_time + step, ...` up to and including `max_time`
    pub fn time_steps(&self) -> Vec<Minutes> {
        // Absorbs accumulated error so that e.g. 0.1 steps still hit max_time
        let epsilon = self.step * 1e-9;
        (0..MAX_TIME_STEPS)
            .map(|i| self.min_time + f64::from(i) * self.step)
            .take_while(|time| *time <= self.max_time + epsilon)
            .collect()
    }
}

/// Candidate record found inside an isochrone
#[derive(Debug, Clone)]
pub struct ZoneMatch {
    /// Name of the collection the record came from
    pub collection: String,
    pub record: CandidateRecord,
    /// Smallest budget whose isochrone contained the record
    pub time: Minutes,
    /// Great-circle distance from the origin, set for in-zone matches
    pub straight_line_m: Option<f64>,
    /// Estimated travel time of the routed path, set when a path exists
    pub route_minutes: Option<f64>,
}

/// Route from the origin to one in-zone record
#[derive(Debug, Clone)]
pub struct RecordRoute {
    pub collection: String,
    pub record_id: String,
    pub route: Route,
}

#[derive(Debug, Clone)]
pub struct ZonationResult {
    /// One isochrone per walked time step, in ascending budget order
    pub isochrones: Vec<Isochrone>,
    pub in_zone: Vec<ZoneMatch>,
    pub out_of_zone: Vec<ZoneMatch>,
    /// Routes for in-zone records; records without a path are left out
    pub routes: Vec<RecordRoute>,
}

/// Matches candidate records against isochrones of increasing budget around
/// `origin`.
///
/// Returns `Ok(None)` when the origin cannot be snapped to the graph. Empty
/// isochrones simply match nothing.
///
/// # Errors
///
/// Returns [`Error::InvalidData`] for an invalid time range, isochrone
/// parameters or pace.
pub fn find_zonation(
    graph: &RoadGraph,
    origin: Point<f64>,
    collections: &[RecordCollection],
    config: &ZonationConfig,
    params: &IsochroneParams,
    pace_min_per_km: f64,
) -> Result<Option<ZonationResult>, Error> {
    config.validate()?;
    params.validate()?;
    if !(pace_min_per_km.is_finite() && pace_min_per_km > 0.0) {
        return Err(Error::InvalidData(format!(
            "pace must be positive, got {pace_min_per_km}"
        )));
    }

    let mut isochrones = Vec::new();
    let mut in_zone: Vec<ZoneMatch> = Vec::new();
    let mut out_of_zone: Vec<ZoneMatch> = Vec::new();
    // (collection slot, record position); loader ids are not guaranteed unique
    let mut seen: HashSet<(usize, usize)> = HashSet::new();

    for time in config.time_steps() {
        let Some(reach) = find_reachability(graph, origin, time)? else {
            debug!("No vertex near {origin:?}, zonation not possible");
            return Ok(None);
        };
        let isochrone = calculate_isochrone(&reach, params);

        if !isochrone.is_empty() {
            for (slot, collection) in collections.iter().enumerate() {
                for (idx, record) in collection.records.iter().enumerate() {
                    if !isochrone.contains(&record.geometry) || !seen.insert((slot, idx))
                    {
                        continue;
                    }
                    let found = ZoneMatch {
                        collection: collection.name.clone(),
                        record: record.clone(),
                        time,
                        straight_line_m: None,
                        route_minutes: None,
                    };
                    if record.in_zone {
                        in_zone.push(found);
                    } else {
                        out_of_zone.push(found);
                    }
                }
            }
        }
        isochrones.push(isochrone);

        if in_zone.len() > config.in_zone_threshold {
            debug!(
                "{} in-zone matches at {time} min, stopping early",
                in_zone.len()
            );
            break;
        }
    }

    let routed: Vec<Option<Route>> = in_zone
        .par_iter()
        .map(|found| find_route(graph, origin, found.record.geometry, pace_min_per_km))
        .collect::<Result<_, _>>()?;

    let mut routes = Vec::new();
    for (found, route) in in_zone.iter_mut().zip(routed) {
        found.straight_line_m = Some(distance_m(origin, found.record.geometry));
        if let Some(route) = route {
            found.route_minutes = Some(route.estimated_minutes);
            routes.push(RecordRoute {
                collection: found.collection.clone(),
                record_id: found.record.id.clone(),
                route,
            });
        }
    }

    info!(
        "Zonation from {origin:?}: {} isochrones, {} in zone, {} out of zone, {} routes",
        isochrones.len(),
        in_zone.len(),
        out_of_zone.len(),
        routes.len()
    );

    Ok(Some(ZonationResult {
        isochrones,
        in_zone,
        out_of_zone,
        routes,
    }))
}

impl ZonationResult {
    /// JSON object with one `FeatureCollection` per output list under the
    /// keys `isochrones`, `in_zone`, `out_of_zone` and `routes`
    pub fn to_geojson(&self) -> Result<Value, Error> {
        let isochrones = self
            .isochrones
            .iter()
            .map(Isochrone::hull_feature)
            .collect::<Result<Vec<_>, _>>()?;
        let in_zone = self
            .in_zone
            .iter()
            .map(match_feature)
            .collect::<Result<Vec<_>, _>>()?;
        let out_of_zone = self
            .out_of_zone
            .iter()
            .map(match_feature)
            .collect::<Result<Vec<_>, _>>()?;
        let routes = self
            .routes
            .iter()
            .map(|entry| {
                let mut feature = entry.route.to_feature()?;
                feature.set_property("collection", entry.collection.clone());
                feature.set_property("record", entry.record_id.clone());
                Ok(feature)
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(json!({
            "isochrones": collection(isochrones),
            "in_zone": collection(in_zone),
            "out_of_zone": collection(out_of_zone),
            "routes": collection(routes),
        }))
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        features,
        bbox: None,
        foreign_members: None,
    }
}

fn match_feature(found: &ZoneMatch) -> Result<Feature, Error> {
    let mut properties = found.record.properties.clone();
    properties.insert("id".to_string(), json!(found.record.id));
    properties.insert("collection".to_string(), json!(found.collection));
    properties.insert("time".to_string(), json!(found.time));
    properties.insert("in_zone".to_string(), json!(found.record.in_zone));
    if let Some(distance) = found.straight_line_m {
        properties.insert("distance".to_string(), json!(distance));
    }
    if let Some(minutes) = found.route_minutes {
        properties.insert("route_time".to_string(), json!(minutes));
    }

    let value = json!({
        "type": "Feature",
        "geometry": Geometry::new(GeoJsonValue::from(&found.record.geometry)),
        "properties": properties,
    });
    serde_json::from_value::<Feature>(value).map_err(|e| Error::GeoJsonError(e.to_string()))
}
