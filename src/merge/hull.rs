//! 2D convex hull via Andrew's monotone chain.
//!
//! Used to consolidate the combined boundary points of a plane cluster into
//! a single convex polygon.

use crate::core::Point2D;

/// Compute the convex hull of a point set.
///
/// Points are sorted by x then y; a lower and an upper chain are built with
/// the standard left-turn cross-product test and concatenated with the
/// duplicated endpoints dropped. Output is in counter-clockwise order.
///
/// Returns fewer than 3 points when the input is degenerate (collinear or
/// too small); callers treat that as a discarded cluster.
pub fn convex_hull(points: &[Point2D]) -> Vec<Point2D> {
    let mut sorted: Vec<Point2D> = points.to_vec();
    sorted.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
    });
    sorted.dedup_by(|a, b| (a.x - b.x).abs() < 1e-7 && (a.y - b.y).abs() < 1e-7);

    if sorted.len() < 3 {
        return sorted;
    }

    let mut lower: Vec<Point2D> = Vec::with_capacity(sorted.len());
    for &p in &sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Point2D> = Vec::with_capacity(sorted.len());
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    // Last point of each chain duplicates the first of the other
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Signed area of the shoelace polygon (positive for CCW winding).
pub fn signed_area(polygon: &[Point2D]) -> f32 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..polygon.len() {
        let a = polygon[i];
        let b = polygon[(i + 1) % polygon.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    sum * 0.5
}

/// Absolute polygon area in square meters.
#[inline]
pub fn polygon_area(polygon: &[Point2D]) -> f32 {
    signed_area(polygon).abs()
}

/// Cross product of (b - a) x (c - a); positive for a left turn.
#[inline]
fn cross(a: Point2D, b: Point2D, c: Point2D) -> f32 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_hull() {
        let points = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 0.0),
            Point2D::new(1.0, 1.0),
            Point2D::new(0.0, 1.0),
            Point2D::new(0.5, 0.5), // interior
        ];
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 4);
        assert!((polygon_area(&hull) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_collinear_degenerate() {
        let points = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 0.0),
            Point2D::new(2.0, 0.0),
        ];
        let hull = convex_hull(&points);
        assert!(hull.len() < 3 || polygon_area(&hull) < 1e-6);
    }

    #[test]
    fn test_duplicate_points_collapsed() {
        let points = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 0.0),
            Point2D::new(0.0, 1.0),
        ];
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 3);
        assert!((polygon_area(&hull) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_ccw_winding() {
        let points = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(2.0, 0.0),
            Point2D::new(2.0, 2.0),
            Point2D::new(0.0, 2.0),
        ];
        let hull = convex_hull(&points);
        assert!(signed_area(&hull) > 0.0);
    }
}
