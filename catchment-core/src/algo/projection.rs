//! Spherical Web Mercator (EPSG:3857) <-> WGS84 (EPSG:4326)

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use geo::{Coord, MapCoords};

const EARTH_RADIUS: f64 = 6_378_137.0;
const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Projects a lon/lat coordinate to metres, clamping latitude to the
/// Mercator limit
pub fn to_web_mercator(coord: Coord<f64>) -> Coord<f64> {
    let lat = coord.y.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    Coord {
        x: EARTH_RADIUS * coord.x.to_radians(),
        y: EARTH_RADIUS * (FRAC_PI_4 + lat / 2.0).tan().ln(),
    }
}

pub fn to_wgs84(coord: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (coord.x / EARTH_RADIUS).to_degrees(),
        y: (2.0 * (coord.y / EARTH_RADIUS).exp().atan() - FRAC_PI_2).to_degrees(),
    }
}

pub fn project<G>(geometry: &G) -> G::Output
where
    G: MapCoords<f64, f64>,
{
    geometry.map_coords(to_web_mercator)
}

pub fn unproject<G>(geometry: &G) -> G::Output
where
    G: MapCoords<f64, f64>,
{
    geometry.map_coords(to_wgs84)
}
