//! Alpha shape (concave hull) over a planar point set.
//!
//! The Delaunay triangulation of the points is filtered down to the
//! triangles whose circumradius is below `1 / alpha`; the union of the
//! survivors is the shape. Larger alpha values carve deeper concavities,
//! `alpha <= 0` keeps every triangle and yields the convex hull.

use delaunator::{Point as DPoint, triangulate};
use geo::{Coord, MultiPolygon, Polygon, Triangle, unary_union};

/// Computes the alpha shape of `points` (planar, e.g. metric coordinates).
///
/// Returns an empty multipolygon when fewer than three distinct points are
/// given, when all points are collinear, or when no triangle passes the
/// radius filter.
pub fn alpha_shape(points: &[Coord<f64>], alpha: f64) -> MultiPolygon<f64> {
    let mut unique: Vec<Coord<f64>> = points
        .iter()
        .copied()
        .filter(|c| c.x.is_finite() && c.y.is_finite())
        .collect();
    unique.sort_by(|a, b| a.x.total_cmp(&b.x).then_with(|| a.y.total_cmp(&b.y)));
    unique.dedup();

    if unique.len() < 3 {
        return MultiPolygon::new(vec![]);
    }

    let d_points: Vec<DPoint> = unique.iter().map(|c| DPoint { x: c.x, y: c.y }).collect();
    let triangulation = triangulate(&d_points);

    let max_radius = if alpha > 0.0 {
        alpha.recip()
    } else {
        f64::INFINITY
    };

    let kept: Vec<Polygon<f64>> = triangulation
        .triangles
        .chunks_exact(3)
        .map(|t| Triangle::new(unique[t[0]], unique[t[1]], unique[t[2]]))
        .filter(|triangle| circumradius(triangle) < max_radius)
        .map(|triangle| triangle.to_polygon())
        .collect();

    if kept.is_empty() {
        return MultiPolygon::new(vec![]);
    }

    unary_union(&kept)
}

fn circumradius(triangle: &Triangle<f64>) -> f64 {
    let (a, b, c) = (triangle.0, triangle.1, triangle.2);
    let ab = (b - a).x.hypot((b - a).y);
    let bc = (c - b).x.hypot((c - b).y);
    let ca = (a - c).x.hypot((a - c).y);
    let cross = ((b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)).abs();

    if cross == 0.0 {
        return f64::INFINITY;
    }
    // R = abc / (4 * area) and area = |cross| / 2
    ab * bc * ca / (2.0 * cross)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, Contains, Point};

    fn grid(n: usize, spacing: f64) -> Vec<Coord<f64>> {
        let mut points = Vec::new();
        for i in 0..n {
            for j in 0..n {
                points.push(Coord {
                    x: i as f64 * spacing,
                    y: j as f64 * spacing,
                });
            }
        }
        points
    }

    #[test]
    fn too_few_points_give_empty_shape() {
        let points = [Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 0.0 }];
        assert!(alpha_shape(&points, 0.1).0.is_empty());
    }

    #[test]
    fn collinear_points_give_empty_shape() {
        let points: Vec<Coord<f64>> = (0..10).map(|i| Coord { x: f64::from(i), y: 0.0 }).collect();
        assert!(alpha_shape(&points, 0.0).0.is_empty());
    }

    #[test]
    fn zero_alpha_is_convex_hull() {
        let shape = alpha_shape(&grid(5, 10.0), 0.0);
        assert!((shape.unsigned_area() - 1600.0).abs() < 1e-6);
    }

    #[test]
    fn radius_filter_removes_oversized_triangles() {
        // Two dense clusters 1000 m apart: a small radius cannot bridge them.
        let mut points = grid(4, 10.0);
        points.extend(grid(4, 10.0).into_iter().map(|c| Coord {
            x: c.x + 1000.0,
            y: c.y,
        }));

        let shape = alpha_shape(&points, 1.0 / 50.0);
        assert_eq!(shape.0.len(), 2);
        assert!(!shape.contains(&Point::new(500.0, 15.0)));
        assert!(shape.contains(&Point::new(15.0, 15.0)));
    }

    #[test]
    fn duplicate_points_are_ignored() {
        let mut points = grid(3, 10.0);
        points.extend(grid(3, 10.0));
        let shape = alpha_shape(&points, 0.0);
        assert!((shape.unsigned_area() - 400.0).abs() < 1e-6);
    }
}
