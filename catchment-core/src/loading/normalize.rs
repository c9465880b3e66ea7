//! `GeoJSON` normalization.
//!
//! Uploaded layers arrive as arbitrary `GeoJSON`: single or multi-part
//! geometries, optional Z values, WGS84 or Web Mercator coordinates. The
//! normalizer turns them into single-part, two-dimensional WGS84 features
//! grouped by kind. Features that cannot be read are skipped and counted,
//! they never abort the layer.

use std::fmt;
use std::str::FromStr;

use geo::{Coord, LineString, MapCoords, Point, Polygon};
use log::{debug, warn};
use serde_json::{Map, Value};

use crate::Error;
use crate::algo::projection::to_wgs84;
use crate::model::{LineFeature, PointFeature};

/// Coordinate reference systems accepted on input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Crs {
    /// EPSG:4326, longitude/latitude in degrees
    #[default]
    Wgs84,
    /// EPSG:3857, spherical Mercator metres
    WebMercator,
}

impl Crs {
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedCrs`] for any code other than 4326 or 3857.
    pub fn from_epsg(code: u32) -> Result<Self, Error> {
        match code {
            4326 => Ok(Self::Wgs84),
            3857 | 900_913 => Ok(Self::WebMercator),
            other => Err(Error::UnsupportedCrs(format!("EPSG:{other}"))),
        }
    }

    pub fn epsg(self) -> u32 {
        match self {
            Self::Wgs84 => 4326,
            Self::WebMercator => 3857,
        }
    }

    /// Reads the legacy `crs` member of a `GeoJSON` document, if present
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedCrs`] when the member names an unknown
    /// system.
    pub fn from_geojson(document: &Value) -> Result<Option<Self>, Error> {
        let Some(member) = document.get("crs") else {
            return Ok(None);
        };
        if member.is_null() {
            return Ok(None);
        }
        member
            .pointer("/properties/name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::UnsupportedCrs(member.to_string()))?
            .parse()
            .map(Some)
    }
}

impl FromStr for Crs {
    type Err = Error;

    /// Accepts `EPSG:4326`, `urn:ogc:def:crs:EPSG::3857`, the `CRS84` urn
    /// and bare codes
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let trimmed = name.trim();
        if trimmed.to_ascii_uppercase().ends_with("CRS84") {
            return Ok(Self::Wgs84);
        }
        let code = trimmed
            .rsplit(':')
            .next()
            .and_then(|code| code.parse::<u32>().ok())
            .ok_or_else(|| Error::UnsupportedCrs(trimmed.to_string()))?;
        Self::from_epsg(code)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// Normalized content of one uploaded layer
#[derive(Debug, Clone, Default)]
pub struct NormalizedLayer {
    pub lines: Vec<LineFeature>,
    pub points: Vec<PointFeature>,
    /// Polygon parts read but not kept, neither roads nor records use them
    pub polygons: usize,
    /// Features dropped because their geometry could not be read
    pub skipped: usize,
    /// `[min_x, min_y, max_x, max_y]` over every kept coordinate
    pub bbox: Option<[f64; 4]>,
}

impl NormalizedLayer {
    fn extend_bbox(&mut self, coord: Coord<f64>) {
        let bbox = self
            .bbox
            .get_or_insert([coord.x, coord.y, coord.x, coord.y]);
        bbox[0] = bbox[0].min(coord.x);
        bbox[1] = bbox[1].min(coord.y);
        bbox[2] = bbox[2].max(coord.x);
        bbox[3] = bbox[3].max(coord.y);
    }
}

/// Single-part geometry recovered from a `GeoJSON` geometry object
enum Part {
    Point(Point<f64>),
    Line(LineString<f64>),
    Polygon,
}

/// Normalizes a `FeatureCollection`, a single `Feature` or a bare geometry.
///
/// `crs` overrides the document's own `crs` member; without either the
/// input is taken as WGS84.
///
/// # Errors
///
/// Returns [`Error::MalformedGeometry`] when the document is not `GeoJSON`
/// at all and [`Error::UnsupportedCrs`] for coordinate systems other than
/// WGS84 and Web Mercator.
pub fn normalize_geojson(document: &Value, crs: Option<Crs>) -> Result<NormalizedLayer, Error> {
    let crs = match crs {
        Some(crs) => crs,
        None => Crs::from_geojson(document)?.unwrap_or_default(),
    };

    let mut layer = NormalizedLayer::default();

    let features: Vec<&Value> = match document.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => document
            .get("features")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                Error::MalformedGeometry("FeatureCollection without features".to_string())
            })?
            .iter()
            .collect(),
        Some("Feature") => vec![document],
        Some(kind) => {
            // Bare geometry object
            let mut parts = Vec::new();
            if !collect_parts(document, &mut parts) {
                return Err(Error::MalformedGeometry(format!(
                    "unreadable {kind} geometry"
                )));
            }
            push_parts(&mut layer, parts, None, &Map::new(), crs);
            return Ok(layer);
        }
        None => {
            return Err(Error::MalformedGeometry(
                "document has no GeoJSON type".to_string(),
            ));
        }
    };

    for (idx, feature) in features.into_iter().enumerate() {
        let properties = match feature.get("properties") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        let id = match feature.get("id") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        };

        let mut parts = Vec::new();
        let readable = feature
            .get("geometry")
            .is_some_and(|geometry| collect_parts(geometry, &mut parts));
        if !readable || parts.is_empty() {
            warn!("Skipping feature {idx}: missing or malformed geometry");
            layer.skipped += 1;
            continue;
        }
        push_parts(&mut layer, parts, id, &properties, crs);
    }

    debug!(
        "Normalized layer ({crs}): {} lines, {} points, {} polygons, {} skipped",
        layer.lines.len(),
        layer.points.len(),
        layer.polygons,
        layer.skipped
    );
    Ok(layer)
}

fn push_parts(
    layer: &mut NormalizedLayer,
    parts: Vec<Part>,
    id: Option<String>,
    properties: &Map<String, Value>,
    crs: Crs,
) {
    let multi = parts.len() > 1;
    let reproject = |coord: Coord<f64>| match crs {
        Crs::Wgs84 => coord,
        Crs::WebMercator => to_wgs84(coord),
    };

    for (n, part) in parts.into_iter().enumerate() {
        match part {
            Part::Point(point) => {
                let point = point.map_coords(reproject);
                layer.extend_bbox(point.0);
                let id = match (&id, multi) {
                    (Some(id), true) => Some(format!("{id}-{}", n + 1)),
                    (id, _) => id.clone(),
                };
                layer.points.push(PointFeature {
                    id,
                    geometry: point,
                    properties: properties.clone(),
                });
            }
            Part::Line(line) => {
                let line = line.map_coords(reproject);
                line.0.iter().for_each(|c| layer.extend_bbox(*c));
                layer.lines.push(LineFeature {
                    geometry: line,
                    properties: properties.clone(),
                });
            }
            Part::Polygon => layer.polygons += 1,
        }
    }
}

/// Explodes a geometry object into single parts. Returns `false` when the
/// object is malformed; `null` geometries read as malformed too.
fn collect_parts(geometry: &Value, parts: &mut Vec<Part>) -> bool {
    let coordinates = geometry.get("coordinates");
    match geometry.get("type").and_then(Value::as_str) {
        Some("Point") => coordinates.and_then(position).map(|c| parts.push(Part::Point(c.into()))),
        Some("MultiPoint") => coordinates.and_then(each(position)).map(|coords| {
            parts.extend(coords.into_iter().map(|c| Part::Point(c.into())));
        }),
        Some("LineString") => coordinates.and_then(line).map(|l| parts.push(Part::Line(l))),
        Some("MultiLineString") => coordinates
            .and_then(each(line))
            .map(|lines| parts.extend(lines.into_iter().map(Part::Line))),
        Some("Polygon") => coordinates
            .and_then(polygon)
            .map(|_| parts.push(Part::Polygon)),
        Some("MultiPolygon") => coordinates
            .and_then(each(polygon))
            .map(|polygons| parts.extend(polygons.iter().map(|_| Part::Polygon))),
        Some("GeometryCollection") => geometry
            .get("geometries")
            .and_then(Value::as_array)
            .filter(|members| members.iter().all(|member| collect_parts(member, parts)))
            .map(|_| ()),
        _ => None,
    }
    .is_some()
}

/// First two ordinates of a position; Z and M are dropped
fn position(value: &Value) -> Option<Coord<f64>> {
    let ordinates = value.as_array()?;
    let x = ordinates.first()?.as_f64()?;
    let y = ordinates.get(1)?.as_f64()?;
    (x.is_finite() && y.is_finite()).then_some(Coord { x, y })
}

fn line(value: &Value) -> Option<LineString<f64>> {
    let coords = each(position)(value)?;
    (coords.len() >= 2).then(|| LineString::new(coords))
}

fn polygon(value: &Value) -> Option<Polygon<f64>> {
    let mut rings = each(line)(value)?.into_iter();
    let exterior = rings.next().filter(|ring| ring.0.len() >= 3)?;
    Some(Polygon::new(exterior, rings.collect()))
}

/// Lifts a member parser to a JSON array, failing on the first bad member
fn each<T>(parse: impl Fn(&Value) -> Option<T>) -> impl Fn(&Value) -> Option<Vec<T>> {
    move |value| value.as_array()?.iter().map(&parse).collect()
}
