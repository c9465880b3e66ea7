use geo::{Distance, Haversine, LineString, Point};

/// Great-circle length of a line in metres
pub fn line_length_m(line: &LineString<f64>) -> f64 {
    line.lines()
        .map(|segment| Haversine.distance(Point::from(segment.start), Point::from(segment.end)))
        .sum()
}

/// Great-circle distance between two points in metres
pub fn distance_m(a: Point<f64>, b: Point<f64>) -> f64 {
    Haversine.distance(a, b)
}
