use catchment_core::routing::{self, Reachability, Route};
use catchment_core::{Error, Minutes, NetworkId};
use geo::Point;
use tracing::debug;
use wkt::ToWkt;

use crate::model::Catchment;

impl Catchment {
    /// Shortest route between two lon/lat coordinates; `Ok(None)` when either
    /// coordinate cannot be snapped or the two are not connected
    ///
    /// # Errors
    ///
    /// Fails when the network is not ready for queries.
    pub fn find_route(
        &self,
        network: NetworkId,
        origin: Point<f64>,
        destination: Point<f64>,
    ) -> Result<Option<Route>, Error> {
        let graph = self.graph(network)?;
        let route = routing::find_route(&graph, origin, destination, self.pace())?;
        debug!(
            network = %network,
            found = route.is_some(),
            "route query"
        );
        Ok(route)
    }

    /// Edges reachable from `origin` within `budget` minutes
    ///
    /// # Errors
    ///
    /// Fails when the network is not ready or the budget is invalid.
    pub fn find_reachability(
        &self,
        network: NetworkId,
        origin: Point<f64>,
        budget: Minutes,
    ) -> Result<Option<Reachability>, Error> {
        let graph = self.graph(network)?;
        let reach = routing::find_reachability(&graph, origin, budget)?;
        debug!(
            network = %network,
            budget,
            edges = reach.as_ref().map_or(0, |r| r.edges.len()),
            "reachability query"
        );
        Ok(reach)
    }
}

/// Route geometry as a WKT `LINESTRING`
pub fn route_wkt(route: &Route) -> String {
    route.geometry.wkt_string()
}

/// Reached edges as a WKT `MULTILINESTRING`
pub fn reachability_wkt(reach: &Reachability) -> String {
    geo::MultiLineString::new(reach.edges.iter().map(|e| e.geometry.clone()).collect())
        .wkt_string()
}
