//! 2D lines in a polygon's local plane space

use crate::{cross_2d, Vec2};

/// A directed 2D line segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line2D {
    pub start: Vec2,
    pub end: Vec2,
    /// Unit direction from start to end (zero for degenerate lines)
    pub dir: Vec2,
    pub length: f32,
}

impl Line2D {
    /// Creates a line from two points
    pub fn new(start: Vec2, end: Vec2) -> Self {
        let delta = end - start;
        let length = delta.length();
        let dir = if length > 0.0 { delta / length } else { Vec2::ZERO };
        Self {
            start,
            end,
            dir,
            length,
        }
    }

    /// Checks if the line has no usable direction
    pub fn is_degenerate(&self) -> bool {
        self.length < f32::EPSILON
    }

    /// Signed perpendicular distance of a point; positive on the left side
    #[inline]
    pub fn distance(&self, p: Vec2) -> f32 {
        let rel = p - self.start;
        cross_2d(self.dir.x, self.dir.y, rel.x, rel.y)
    }

    /// Distance along the line direction from `start` to the projection of `p`
    #[inline]
    pub fn project(&self, p: Vec2) -> f32 {
        (p - self.start).dot(self.dir)
    }

    /// Closest point on the segment
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        let t = self.project(p).clamp(0.0, self.length);
        self.start + self.dir * t
    }

    /// Distance from a point to the segment
    pub fn distance_to_segment(&self, p: Vec2) -> f32 {
        p.distance(self.closest_point(p))
    }

    /// Checks if another segment lies on this infinite line within `eps`
    pub fn is_colinear_with(&self, other: &Line2D, eps: f32) -> bool {
        self.distance(other.start).abs() < eps && self.distance(other.end).abs() < eps
    }

    /// Intersection point of two segments, endpoints included
    ///
    /// Parallel segments never intersect, even when they overlap.
    pub fn intersect(&self, other: &Line2D) -> Option<Vec2> {
        let d1 = self.end - self.start;
        let d2 = other.end - other.start;
        let denom = cross_2d(d1.x, d1.y, d2.x, d2.y);

        let scale = (d1.length() * d2.length()).max(f32::EPSILON);
        if (denom / scale).abs() < 1e-6 {
            return None;
        }

        let rel = other.start - self.start;
        let t = cross_2d(rel.x, rel.y, d2.x, d2.y) / denom;
        let u = cross_2d(rel.x, rel.y, d1.x, d1.y) / denom;

        // Small slack so corners shared by both segments are found
        const T_EPS: f32 = 1e-4;
        if t < -T_EPS || t > 1.0 + T_EPS || u < -T_EPS || u > 1.0 + T_EPS {
            return None;
        }

        Some(self.start + d1 * t.clamp(0.0, 1.0))
    }
}
