use catchment_core::algo::{self, Isochrone, IsochroneLayers, IsochroneParams};
use catchment_core::{Error, Minutes, NetworkId};
use geo::Point;
use geojson::FeatureCollection;
use tracing::debug;
use wkt::ToWkt;

use crate::model::Catchment;

/// Graph vertices reported as `PT` features
const NEAREST_POINTS: usize = 5;

impl Catchment {
    /// Isochrone around `origin` for `budget` minutes. `params` falls back to
    /// the configured isochrone parameters.
    ///
    /// # Errors
    ///
    /// Fails when the network is not ready or the parameters are invalid.
    pub fn generate_isochrone(
        &self,
        network: NetworkId,
        origin: Point<f64>,
        budget: Minutes,
        params: Option<&IsochroneParams>,
    ) -> Result<Option<Isochrone>, Error> {
        let graph = self.graph(network)?;
        let params = params.unwrap_or(&self.config().isochrone);
        let isochrone = algo::generate_isochrone(&graph, origin, budget, params)?;
        debug!(
            network = %network,
            budget,
            empty = isochrone.as_ref().is_none_or(Isochrone::is_empty),
            "isochrone query"
        );
        Ok(isochrone)
    }

    /// Isochrones for several budgets, in the order given
    ///
    /// # Errors
    ///
    /// Fails when the network is not ready or any budget is invalid.
    pub fn bulk_isochrones(
        &self,
        network: NetworkId,
        origin: Point<f64>,
        budgets: &[Minutes],
        params: Option<&IsochroneParams>,
    ) -> Result<Option<Vec<Isochrone>>, Error> {
        let graph = self.graph(network)?;
        let params = params.unwrap_or(&self.config().isochrone);
        algo::bulk_isochrones(&graph, origin, budgets, params)
    }

    /// [`Catchment::generate_isochrone`] rendered as `GeoJSON`, with the
    /// requested layers and the vertices nearest to `origin`
    ///
    /// # Errors
    ///
    /// Same as [`Catchment::generate_isochrone`].
    pub fn isochrone_geojson(
        &self,
        network: NetworkId,
        origin: Point<f64>,
        budget: Minutes,
        params: Option<&IsochroneParams>,
        layers: IsochroneLayers,
    ) -> Result<Option<FeatureCollection>, Error> {
        let Some(isochrone) = self.generate_isochrone(network, origin, budget, params)? else {
            return Ok(None);
        };
        let graph = self.graph(network)?;
        let nearest: Vec<Point<f64>> = graph
            .nearest_vertices(&origin, NEAREST_POINTS)
            .into_iter()
            .map(|node| graph.vertex(node).geometry)
            .collect();
        isochrone.to_geojson(layers, &nearest).map(Some)
    }
}

/// Hull polygon as WKT
pub fn isochrone_wkt(isochrone: &Isochrone) -> String {
    isochrone.hull.wkt_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::ready_service;

    #[test]
    fn isochrone_contains_origin() {
        let (service, network) = ready_service();
        let origin = Point::new(106.81, -6.19);
        let isochrone = service
            .generate_isochrone(network, origin, 10.0, None)
            .unwrap()
            .unwrap();

        assert!(isochrone.contains(&origin));
        assert!(!isochrone.contains(&Point::new(106.80, -6.20)));
        assert!(isochrone_wkt(&isochrone).starts_with("MULTIPOLYGON"));
    }

    #[test]
    fn geojson_carries_requested_layers() {
        let (service, network) = ready_service();
        let origin = Point::new(106.81, -6.19);

        let all = service
            .isochrone_geojson(network, origin, 10.0, None, IsochroneLayers::default())
            .unwrap()
            .unwrap();
        // Concave + Iso Buffer + five nearest vertices
        assert_eq!(all.features.len(), 7);

        let points = service
            .isochrone_geojson(network, origin, 10.0, None, IsochroneLayers::parse("point"))
            .unwrap()
            .unwrap();
        assert_eq!(points.features.len(), 5);
    }

    #[test]
    fn bulk_isochrones_keep_budget_order() {
        let (service, network) = ready_service();
        let isochrones = service
            .bulk_isochrones(network, Point::new(106.81, -6.19), &[20.0, 5.0, 10.0], None)
            .unwrap()
            .unwrap();
        let budgets: Vec<Minutes> = isochrones.iter().map(|iso| iso.budget).collect();
        assert_eq!(budgets, vec![20.0, 5.0, 10.0]);
    }
}
