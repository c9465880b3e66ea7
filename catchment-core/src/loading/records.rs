//! Candidate record loading from CSV and `GeoJSON`

use std::fs::File;
use std::io::Read;
use std::path::Path;

use geo::Point;
use log::{debug, warn};
use serde_json::{Map, Value};

use super::normalize::{Crs, normalize_geojson};
use crate::Error;
use crate::model::{CandidateRecord, RecordCollection};

/// Records read from a CSV table
#[derive(Debug, Clone)]
pub struct CsvRecords {
    pub collection: RecordCollection,
    /// Rows without a usable coordinate
    pub skipped: usize,
    /// `[min_lon, min_lat, max_lon, max_lat]` over the kept rows
    pub bbox: Option<[f64; 4]>,
}

/// Coordinates are stored with six decimals (~0.1 m)
fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

/// Reads candidate records from CSV with `lat` and `lon` columns.
///
/// An `id` column, if present, names each record; otherwise the 1-based row
/// number does. All other columns end up in the attribute bag, empty cells as
/// `null`.
///
/// # Errors
///
/// Returns [`Error::InvalidData`] when the header lacks `lat` or `lon`, or a
/// CSV error when the header cannot be read.
pub fn read_records_csv<R: Read>(
    reader: R,
    name: &str,
    in_zone: bool,
) -> Result<CsvRecords, Error> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader.headers()?.clone();
    let column = |wanted: &str| {
        headers
            .iter()
            .position(|header| header.trim().eq_ignore_ascii_case(wanted))
    };

    let (Some(lat_col), Some(lon_col)) = (column("lat"), column("lon")) else {
        return Err(Error::InvalidData(format!(
            "{name}: CSV needs lat and lon columns"
        )));
    };
    let id_col = column("id");

    let mut records = Vec::new();
    let mut skipped = 0;
    let mut bbox: Option<[f64; 4]> = None;

    for (row, result) in reader.records().enumerate() {
        let line = row + 1;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("{name}: skipping row {line}: {e}");
                skipped += 1;
                continue;
            }
        };

        let coordinate = |col: usize| record.get(col).and_then(|v| v.trim().parse::<f64>().ok());
        let (Some(lat), Some(lon)) = (coordinate(lat_col), coordinate(lon_col)) else {
            warn!("{name}: skipping row {line}: unreadable coordinate");
            skipped += 1;
            continue;
        };
        if !((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)) {
            warn!("{name}: skipping row {line}: ({lat}, {lon}) is out of range");
            skipped += 1;
            continue;
        }
        let (lat, lon) = (round6(lat), round6(lon));

        let extent = bbox.get_or_insert([lon, lat, lon, lat]);
        extent[0] = extent[0].min(lon);
        extent[1] = extent[1].min(lat);
        extent[2] = extent[2].max(lon);
        extent[3] = extent[3].max(lat);

        let id = id_col
            .and_then(|col| record.get(col))
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map_or_else(|| line.to_string(), str::to_string);

        let properties: Map<String, Value> = headers
            .iter()
            .enumerate()
            .filter(|(col, _)| ![lat_col, lon_col].contains(col) && Some(*col) != id_col)
            .map(|(col, header)| {
                let value = match record.get(col).map(str::trim) {
                    Some("") | None => Value::Null,
                    Some(text) => Value::String(text.to_string()),
                };
                (header.trim().to_string(), value)
            })
            .collect();

        records.push(CandidateRecord {
            id,
            geometry: Point::new(lon, lat),
            properties,
            in_zone,
        });
    }

    debug!("{name}: read {} records, skipped {skipped}", records.len());
    Ok(CsvRecords {
        collection: RecordCollection::tagged(name, in_zone, records),
        skipped,
        bbox,
    })
}

/// # Errors
///
/// Fails when the file cannot be opened or read as CSV.
pub fn load_records_csv(path: &Path, name: &str, in_zone: bool) -> Result<CsvRecords, Error> {
    let file = File::open(path)?;
    read_records_csv(file, name, in_zone)
}

/// Candidate records from the point features of a `GeoJSON` document.
/// Non-point features are ignored.
///
/// # Errors
///
/// Propagates normalization errors.
pub fn records_from_geojson(
    document: &Value,
    crs: Option<Crs>,
    name: &str,
    in_zone: bool,
) -> Result<RecordCollection, Error> {
    let layer = normalize_geojson(document, crs)?;
    let ignored = layer.lines.len() + layer.polygons;
    if ignored > 0 {
        debug!("{name}: ignoring {ignored} non-point features");
    }
    Ok(RecordCollection::from_points(name, in_zone, layer.points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_rows_and_rounds_coordinates() {
        let csv = "id,name,lat,lon,grade\n\
                   s-1,SDN 01,-6.2000004,106.8000006,A\n\
                   s-2,SDN 02,-6.21,106.81,\n";
        let loaded = read_records_csv(csv.as_bytes(), "schools", true).unwrap();

        let records = &loaded.collection.records;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "s-1");
        assert_eq!(records[0].geometry, Point::new(106.800_001, -6.2));
        assert_eq!(records[0].properties["name"], "SDN 01");
        assert!(records[1].properties["grade"].is_null());
        assert!(!records[0].properties.contains_key("lat"));
        assert!(records.iter().all(|r| r.in_zone));
        assert_eq!(loaded.bbox, Some([106.800_001, -6.21, 106.81, -6.2]));
    }

    #[test]
    fn bad_rows_are_skipped_and_ids_fall_back_to_row_number() {
        let csv = "lat,lon,name\n-6.2,106.8,a\nnot-a-number,106.8,b\n95.0,106.8,c\n-6.3,106.9,d\n";
        let loaded = read_records_csv(csv.as_bytes(), "students", false).unwrap();

        assert_eq!(loaded.skipped, 2);
        let ids: Vec<&str> = loaded
            .collection
            .records
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "4"]);
    }

    #[test]
    fn missing_coordinate_columns_are_rejected() {
        let csv = "x,y\n1,2\n";
        assert!(matches!(
            read_records_csv(csv.as_bytes(), "bad", true),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn loads_csv_from_disk() {
        let path = std::env::temp_dir().join(format!("records-{}.csv", std::process::id()));
        std::fs::write(&path, "lat,lon\n-6.2,106.8\n").unwrap();
        let loaded = load_records_csv(&path, "disk", true).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.collection.len(), 1);
    }

    #[test]
    fn geojson_points_become_records() {
        let document = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "id": "a", "properties": { "kind": "school" },
                  "geometry": { "type": "Point", "coordinates": [106.8, -6.2] } },
                { "type": "Feature", "properties": {},
                  "geometry": { "type": "Point", "coordinates": [106.9, -6.3] } },
                { "type": "Feature", "properties": {},
                  "geometry": { "type": "LineString", "coordinates": [[0, 0], [1, 1]] } }
            ]
        });
        let collection = records_from_geojson(&document, None, "schools", false).unwrap();
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.records[0].id, "a");
        assert_eq!(collection.records[1].id, "2");
    }
}
