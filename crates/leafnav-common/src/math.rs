//! Math utilities shared by the polygon and clipping code

use crate::{Vec2, Vec3, SAME_VERT_EPSILON};

/// Calculates the cross product of two 2D vectors [(x1,y1), (x2,y2)]
#[inline]
pub fn cross_2d(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    x1 * y2 - y1 * x2
}

/// Twice the signed area of the 2D triangle (a, b, c), positive when counter-clockwise
#[inline]
pub fn orient_2d(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    cross_2d(b.x - a.x, b.y - a.y, c.x - a.x, c.y - a.y)
}

/// Get the next power of 2 greater than or equal to x
#[inline]
pub fn next_pow2(x: u32) -> u32 {
    if x == 0 {
        return 1;
    }
    let mut n = x - 1;
    n |= n >> 1;
    n |= n >> 2;
    n |= n >> 4;
    n |= n >> 8;
    n |= n >> 16;
    n + 1
}

/// Checks if two points are the same vertex within [`SAME_VERT_EPSILON`]
#[inline]
pub fn same_vert(a: Vec3, b: Vec3) -> bool {
    (a - b).abs().max_element() < SAME_VERT_EPSILON
}

/// Checks if two 2D points are the same vertex within [`SAME_VERT_EPSILON`]
#[inline]
pub fn same_vert_2d(a: Vec2, b: Vec2) -> bool {
    (a - b).abs().max_element() < SAME_VERT_EPSILON
}

/// Signed area of a 2D polygon (shoelace), positive for counter-clockwise loops
pub fn polygon_area_2d(verts: &[Vec2]) -> f32 {
    let n = verts.len();
    if n < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    for i in 0..n {
        let a = verts[i];
        let b = verts[(i + 1) % n];
        area += cross_2d(a.x, a.y, b.x, b.y);
    }
    area * 0.5
}

/// Removes points closer than [`SAME_VERT_EPSILON`] to an earlier point
pub fn dedup_points_2d(points: &[Vec2]) -> Vec<Vec2> {
    let mut unique: Vec<Vec2> = Vec::with_capacity(points.len());
    for &p in points {
        if !unique.iter().any(|&u| same_vert_2d(u, p)) {
            unique.push(p);
        }
    }
    unique
}

/// Compute the 2D convex hull of a set of points using Graham's scan algorithm
///
/// Duplicate points are removed first. The hull is returned counter-clockwise
/// without colinear points; fewer than 3 unique points are returned as-is.
pub fn convex_hull_2d(points: &[Vec2]) -> Vec<Vec2> {
    let mut points = dedup_points_2d(points);
    let n = points.len();
    if n < 3 {
        return points;
    }

    // Find the bottom-most point (and left-most if tied)
    let mut bottom = 0;
    for i in 1..n {
        if points[i].y < points[bottom].y
            || (points[i].y == points[bottom].y && points[i].x < points[bottom].x)
        {
            bottom = i;
        }
    }
    points.swap(0, bottom);

    let pivot = points[0];

    // Sort points by polar angle with respect to pivot, nearer points first on ties
    points[1..].sort_by(|a, b| {
        let angle_a = (a.y - pivot.y).atan2(a.x - pivot.x);
        let angle_b = (b.y - pivot.y).atan2(b.x - pivot.x);
        angle_a
            .partial_cmp(&angle_b)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                a.distance_squared(pivot)
                    .partial_cmp(&b.distance_squared(pivot))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });

    let mut hull: Vec<Vec2> = Vec::with_capacity(n);
    hull.push(points[0]);
    hull.push(points[1]);

    for &point in &points[2..n] {
        // Remove points that make a clockwise (or straight) turn
        while hull.len() > 1 {
            let len = hull.len();
            if orient_2d(hull[len - 2], hull[len - 1], point) <= 1e-6 {
                hull.pop();
            } else {
                break;
            }
        }
        hull.push(point);
    }

    hull
}

/// Closest point to `p` on the segment (a, b)
pub fn closest_point_on_segment(p: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < f32::EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_pow2() {
        assert_eq!(next_pow2(0), 1);
        assert_eq!(next_pow2(1), 1);
        assert_eq!(next_pow2(3), 4);
        assert_eq!(next_pow2(4096), 4096);
        assert_eq!(next_pow2(4097), 8192);
    }

    #[test]
    fn test_convex_hull_square_with_interior_and_duplicates() {
        let points = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(0.5, 0.5),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.5, 0.0),
        ];

        let hull = convex_hull_2d(&points);
        assert_eq!(hull.len(), 4);
        assert!((polygon_area_2d(&hull) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_polygon_area_winding() {
        let ccw = [
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 3.0),
        ];
        let cw = [ccw[2], ccw[1], ccw[0]];
        assert!((polygon_area_2d(&ccw) - 3.0).abs() < 1e-6);
        assert!((polygon_area_2d(&cw) + 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_closest_point_on_segment() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(10.0, 0.0, 0.0);
        assert_eq!(
            closest_point_on_segment(Vec3::new(5.0, 3.0, 0.0), a, b),
            Vec3::new(5.0, 0.0, 0.0)
        );
        assert_eq!(closest_point_on_segment(Vec3::new(-5.0, 3.0, 0.0), a, b), a);
        assert_eq!(closest_point_on_segment(Vec3::new(15.0, 0.0, 0.0), a, b), b);
    }
}
