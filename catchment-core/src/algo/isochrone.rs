//! Isochrones from driving-distance results.
//!
//! Reached edges are merged and buffered into a travel corridor. The
//! corridor's ring vertices are projected to Web Mercator, wrapped in an
//! alpha shape, optionally pushed outward a little, and projected back to
//! WGS84. The alpha shape follows the branching of the network much more
//! closely than the blocky corridor does.

use geo::{Buffer, Contains, Coord, MultiLineString, MultiPolygon, Point};
use geojson::{Feature, FeatureCollection, Geometry, Value as GeoJsonValue};
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::alpha_shape::alpha_shape;
use super::projection::{project, to_web_mercator, unproject};
use crate::model::RoadGraph;
use crate::routing::{Reachability, find_reachability};
use crate::{Error, Minutes};

/// Web Mercator metres per degree of longitude
const METRES_PER_DEGREE: f64 = 111_319.49;

/// Upper bound on the corridor points fed to the alpha shape
const MAX_RING_POINTS: usize = 20_000;

/// Geometric knobs of isochrone generation
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct IsochroneParams {
    /// Corridor buffer around reached edges, in degrees (0.0002 is ~22 m)
    pub buffer_distance: f64,
    /// Alpha shape parameter in 1/metres; triangles with a circumradius of
    /// `1 / alpha` metres or more are dropped
    pub alpha: f64,
    /// Outward buffer applied to the alpha shape, in metres; 0 disables it
    pub hull_buffer: f64,
}

impl Default for IsochroneParams {
    fn default() -> Self {
        Self {
            buffer_distance: 0.0002,
            alpha: 0.003,
            hull_buffer: 50.0,
        }
    }
}

impl IsochroneParams {
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] for negative or non-finite values.
    pub fn validate(&self) -> Result<(), Error> {
        for (name, value) in [
            ("buffer_distance", self.buffer_distance),
            ("alpha", self.alpha),
            ("hull_buffer", self.hull_buffer),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::InvalidData(format!(
                    "isochrone {name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Catchment polygon for one origin and budget
#[derive(Debug, Clone)]
pub struct Isochrone {
    pub origin: Point<f64>,
    pub budget: Minutes,
    /// Buffered union of the reached edges
    pub corridor: MultiPolygon<f64>,
    /// Alpha-shape refinement of the corridor
    pub hull: MultiPolygon<f64>,
}

impl Isochrone {
    fn empty(origin: Point<f64>, budget: Minutes) -> Self {
        Self {
            origin,
            budget,
            corridor: MultiPolygon::new(vec![]),
            hull: MultiPolygon::new(vec![]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hull.0.is_empty()
    }

    /// Strict containment: points on the boundary are outside
    pub fn contains(&self, point: &Point<f64>) -> bool {
        !self.is_empty() && self.hull.contains(point)
    }
}

/// Which layers [`Isochrone::to_geojson`] emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsochroneLayers {
    pub hull: bool,
    pub corridor: bool,
    pub points: bool,
}

impl Default for IsochroneLayers {
    fn default() -> Self {
        Self {
            hull: true,
            corridor: true,
            points: true,
        }
    }
}

impl IsochroneLayers {
    /// Parses a `isochrone|buffer|point` style selector
    pub fn parse(selector: &str) -> Self {
        let mut layers = Self {
            hull: false,
            corridor: false,
            points: false,
        };
        for part in selector.split('|').map(str::trim) {
            match part {
                "isochrone" => layers.hull = true,
                "buffer" => layers.corridor = true,
                "point" => layers.points = true,
                _ => {}
            }
        }
        layers
    }
}

/// Builds the isochrone polygon of a reachability result.
///
/// An empty result gives an empty isochrone. If the alpha shape comes out
/// empty (too few corridor vertices, or an alpha too strict for the
/// corridor width) the corridor itself is used as the hull.
pub fn calculate_isochrone(reach: &Reachability, params: &IsochroneParams) -> Isochrone {
    if reach.is_empty() {
        return Isochrone::empty(reach.origin, reach.budget);
    }

    let lines = MultiLineString::new(reach.edges.iter().map(|e| e.geometry.clone()).collect());
    let corridor = lines.buffer(params.buffer_distance);

    let ring_points = corridor_ring_points(&corridor, params);

    let mut hull = alpha_shape(&ring_points, params.alpha);
    if hull.0.is_empty() {
        debug!(
            "Alpha shape over {} points is empty, falling back to the corridor",
            ring_points.len()
        );
        hull = project(&corridor);
    }
    if params.hull_buffer > 0.0 {
        hull = hull.buffer(params.hull_buffer);
    }

    Isochrone {
        origin: reach.origin,
        budget: reach.budget,
        corridor,
        hull: unproject(&hull),
    }
}

/// Corridor ring vertices in Web Mercator.
///
/// Long straight corridor sides only carry their end vertices; they are
/// filled in so the radius filter can keep the triangles inside the
/// corridor. The spacing never drops below a quarter of the corridor width,
/// and densification is skipped when it would exceed [`MAX_RING_POINTS`].
fn corridor_ring_points(corridor: &MultiPolygon<f64>, params: &IsochroneParams) -> Vec<Coord<f64>> {
    let rings: Vec<Vec<Coord<f64>>> = corridor
        .iter()
        .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
        .map(|ring| ring.coords().map(|c| to_web_mercator(*c)).collect())
        .collect();

    let spacing = densify_spacing(params);
    let dense_count: usize = rings
        .iter()
        .map(|ring| densified_len(ring, spacing))
        .fold(0, usize::saturating_add);
    if dense_count > MAX_RING_POINTS {
        debug!(
            "Densifying at {spacing:.1} m would give {dense_count} points, using ring vertices only"
        );
        return rings.concat();
    }

    rings.iter().flat_map(|ring| densify(ring, spacing)).collect()
}

fn densify_spacing(params: &IsochroneParams) -> f64 {
    if params.alpha <= 0.0 {
        return f64::INFINITY;
    }
    let floor = (params.buffer_distance * METRES_PER_DEGREE / 4.0).max(1.0);
    (0.5 / params.alpha).max(floor)
}

/// Number of pieces `a -> b` is split into
fn segment_steps(a: Coord<f64>, b: Coord<f64>, spacing: f64) -> usize {
    let length = (b - a).x.hypot((b - a).y);
    if spacing.is_finite() && length > spacing {
        (length / spacing).ceil() as usize
    } else {
        1
    }
}

fn densified_len(coords: &[Coord<f64>], spacing: f64) -> usize {
    coords
        .windows(2)
        .map(|pair| segment_steps(pair[0], pair[1], spacing))
        .fold(usize::from(!coords.is_empty()), usize::saturating_add)
}

/// Inserts evenly spaced points so no segment is longer than `spacing`
fn densify(coords: &[Coord<f64>], spacing: f64) -> Vec<Coord<f64>> {
    let mut out = Vec::with_capacity(densified_len(coords, spacing));
    for pair in coords.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        out.push(a);
        let steps = segment_steps(a, b, spacing);
        for step in 1..steps {
            let t = step as f64 / steps as f64;
            out.push(a + (b - a) * t);
        }
    }
    out.extend(coords.last().copied());
    out
}

/// Reachability plus isochrone in one step. `Ok(None)` when the origin
/// cannot be snapped to the graph.
///
/// # Errors
///
/// Returns [`Error::InvalidData`] for an invalid budget or parameters.
pub fn generate_isochrone(
    graph: &RoadGraph,
    origin: Point<f64>,
    budget: Minutes,
    params: &IsochroneParams,
) -> Result<Option<Isochrone>, Error> {
    params.validate()?;
    Ok(find_reachability(graph, origin, budget)?
        .map(|reach| calculate_isochrone(&reach, params)))
}

/// Isochrones for several budgets around the same origin, computed in
/// parallel and returned in the order of `budgets`.
///
/// # Errors
///
/// Fails on the first invalid budget.
pub fn bulk_isochrones(
    graph: &RoadGraph,
    origin: Point<f64>,
    budgets: &[Minutes],
    params: &IsochroneParams,
) -> Result<Option<Vec<Isochrone>>, Error> {
    params.validate()?;
    if graph.nearest_vertex(&origin).is_none() {
        return Ok(None);
    }

    let result: Result<Vec<Isochrone>, Error> = budgets
        .par_iter()
        .map(|&budget| {
            let reach = find_reachability(graph, origin, budget)?.ok_or_else(|| {
                Error::InvalidData("graph lost its vertices mid-query".to_string())
            })?;
            Ok(calculate_isochrone(&reach, params))
        })
        .collect();

    result.map(Some)
}

impl Isochrone {
    /// Converts the isochrone to a `GeoJSON` `FeatureCollection`.
    ///
    /// `nearest` holds the graph vertices closest to the origin, emitted as
    /// `PT` features when point output is enabled.
    pub fn to_geojson(
        &self,
        layers: IsochroneLayers,
        nearest: &[Point<f64>],
    ) -> Result<FeatureCollection, Error> {
        let mut features = Vec::new();

        if layers.hull {
            features.push(self.polygon_feature(&self.hull, "Concave")?);
        }
        if layers.corridor {
            features.push(self.polygon_feature(&self.corridor, "Iso Buffer")?);
        }
        if layers.points {
            for (idx, point) in nearest.iter().enumerate() {
                let value = json!({
                    "type": "Feature",
                    "geometry": Geometry::new(GeoJsonValue::from(point)),
                    "properties": { "name": "PT", "idx": idx },
                });
                features.push(
                    serde_json::from_value::<Feature>(value)
                        .map_err(|e| Error::GeoJsonError(e.to_string()))?,
                );
            }
        }

        Ok(FeatureCollection {
            features,
            bbox: None,
            foreign_members: None,
        })
    }

    pub fn hull_feature(&self) -> Result<Feature, Error> {
        self.polygon_feature(&self.hull, "Concave")
    }

    fn polygon_feature(&self, polygon: &MultiPolygon<f64>, name: &str) -> Result<Feature, Error> {
        let value = json!({
            "type": "Feature",
            "geometry": Geometry::new(GeoJsonValue::from(polygon)),
            "properties": {
                "lat": self.origin.y(),
                "lon": self.origin.x(),
                "time": self.budget,
                "name": name,
            }
        });

        serde_json::from_value::<Feature>(value).map_err(|e| Error::GeoJsonError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::ReachedEdge;
    use geo::{Area, line_string};

    fn reach(edges: Vec<ReachedEdge>) -> Reachability {
        Reachability {
            origin: Point::new(106.8, -6.2),
            source: 1,
            budget: 10.0,
            edges,
            vertices: vec![(1, 0.0)],
        }
    }

    fn plus_shape() -> Vec<ReachedEdge> {
        [
            line_string![(x: 106.79, y: -6.2), (x: 106.80, y: -6.2)],
            line_string![(x: 106.80, y: -6.2), (x: 106.81, y: -6.2)],
            line_string![(x: 106.80, y: -6.21), (x: 106.80, y: -6.2)],
            line_string![(x: 106.80, y: -6.2), (x: 106.80, y: -6.19)],
        ]
        .into_iter()
        .enumerate()
        .map(|(idx, geometry)| ReachedEdge {
            id: idx as u64 + 1,
            geometry,
            agg_cost: 0.0,
        })
        .collect()
    }

    #[test]
    fn empty_reachability_gives_empty_isochrone() {
        let iso = calculate_isochrone(&reach(vec![]), &IsochroneParams::default());
        assert!(iso.is_empty());
        assert!(iso.corridor.0.is_empty());
        assert!(!iso.contains(&Point::new(106.8, -6.2)));
    }

    #[test]
    fn hull_covers_the_network_and_is_tagged() {
        let iso = calculate_isochrone(&reach(plus_shape()), &IsochroneParams::default());
        assert!(!iso.is_empty());
        assert_eq!(iso.budget, 10.0);
        assert!(iso.contains(&Point::new(106.8, -6.2)));
        assert!(iso.contains(&Point::new(106.805, -6.2)));
        assert!(!iso.contains(&Point::new(107.5, -6.2)));
    }

    #[test]
    fn concave_hull_is_tighter_than_convex() {
        let params = IsochroneParams {
            hull_buffer: 0.0,
            ..IsochroneParams::default()
        };
        let iso = calculate_isochrone(&reach(plus_shape()), &params);
        // Convex hull of the plus is a 0.02 x 0.02 diamond; the quadrant
        // corners between the arms must stay outside.
        assert!(!iso.contains(&Point::new(106.808, -6.192)));
        assert!(iso.hull.unsigned_area() < 0.0002);
    }

    #[test]
    fn densify_splits_long_segments() {
        let coords = [Coord { x: 0.0, y: 0.0 }, Coord { x: 100.0, y: 0.0 }];
        let dense = densify(&coords, 30.0);
        assert_eq!(dense.len(), 5);
        assert_eq!(dense[1], Coord { x: 25.0, y: 0.0 });
        assert_eq!(densify(&coords, f64::INFINITY).len(), 2);
        assert_eq!(densified_len(&coords, 30.0), 5);
    }

    #[test]
    fn default_params_soften_the_hull_by_fifty_metres() {
        let params = IsochroneParams::default();
        assert_eq!(params.alpha, 0.003);
        assert_eq!(params.hull_buffer, 50.0);
        params.validate().unwrap();
    }

    #[test]
    fn spacing_is_floored_at_corridor_width() {
        let strict = IsochroneParams {
            alpha: 20.0,
            ..IsochroneParams::default()
        };
        // 0.0002 deg corridor is ~22 m, a quarter of it ~5.6 m
        let spacing = densify_spacing(&strict);
        assert!((5.5..5.6).contains(&spacing), "{spacing}");
        assert_eq!(densify_spacing(&IsochroneParams::default()), 0.5 / 0.003);
    }

    #[test]
    fn strict_alpha_falls_back_to_corridor_quickly() {
        let params = IsochroneParams {
            alpha: 20.0,
            ..IsochroneParams::default()
        };
        let iso = calculate_isochrone(&reach(plus_shape()), &params);
        assert!(iso.contains(&Point::new(106.805, -6.2)));
        assert!(!iso.contains(&Point::new(106.808, -6.192)));
    }

    #[test]
    fn ring_points_are_capped_on_long_corridors() {
        let long = vec![ReachedEdge {
            id: 1,
            geometry: line_string![(x: 104.0, y: -6.2), (x: 108.0, y: -6.2)],
            agg_cost: 0.0,
        }];
        let params = IsochroneParams {
            alpha: 1.0,
            ..IsochroneParams::default()
        };
        let corridor = MultiLineString::new(vec![long[0].geometry.clone()])
            .buffer(params.buffer_distance);
        assert!(corridor_ring_points(&corridor, &params).len() <= MAX_RING_POINTS);

        let iso = calculate_isochrone(&reach(long), &params);
        assert!(iso.contains(&Point::new(106.0, -6.2)));
    }

    #[test]
    fn layer_selector_parses_known_names() {
        let layers = IsochroneLayers::parse("isochrone|point");
        assert!(layers.hull && layers.points && !layers.corridor);
    }

    #[test]
    fn geojson_emits_selected_layers() {
        let iso = calculate_isochrone(&reach(plus_shape()), &IsochroneParams::default());
        let nearest = [Point::new(106.8, -6.2)];
        let collection = iso.to_geojson(IsochroneLayers::default(), &nearest).unwrap();
        assert_eq!(collection.features.len(), 3);

        let only_hull = iso
            .to_geojson(IsochroneLayers::parse("isochrone"), &nearest)
            .unwrap();
        assert_eq!(only_hull.features.len(), 1);
    }
}
