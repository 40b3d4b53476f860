//! Half-space planes as consumed from the BSP collision hulls

use crate::{Aabb, Vec3};
use serde::{Deserialize, Serialize};

/// A half-space keeping every point with `normal · p >= dist`
///
/// Faces produced by clipping against a plane face the opposite way: their
/// normal is `-normal`, pointing out of the kept region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipPlane {
    /// Unit normal pointing into the kept region
    pub normal: Vec3,
    /// Plane distance from the origin along `normal`
    pub dist: f32,
}

impl ClipPlane {
    /// Creates a new plane, normalizing the normal
    pub fn new(normal: Vec3, dist: f32) -> Self {
        let len = normal.length();
        if len > 0.0 {
            Self {
                normal: normal / len,
                dist: dist / len,
            }
        } else {
            Self { normal, dist }
        }
    }

    /// Creates a plane through `point` keeping the side `normal` points to
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize_or_zero();
        Self {
            normal,
            dist: normal.dot(point),
        }
    }

    /// Signed distance of a point; positive inside the kept half-space
    #[inline]
    pub fn distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) - self.dist
    }

    /// The plane keeping the opposite half-space
    pub fn inverse(&self) -> Self {
        Self {
            normal: -self.normal,
            dist: -self.dist,
        }
    }

    /// The same plane moved by `offset`
    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            normal: self.normal,
            dist: self.dist + self.normal.dot(offset),
        }
    }

    /// The 6 planes enclosing an axis-aligned box
    pub fn box_planes(bounds: &Aabb) -> Vec<ClipPlane> {
        vec![
            ClipPlane::new(Vec3::X, bounds.mins.x),
            ClipPlane::new(Vec3::NEG_X, -bounds.maxs.x),
            ClipPlane::new(Vec3::Y, bounds.mins.y),
            ClipPlane::new(Vec3::NEG_Y, -bounds.maxs.y),
            ClipPlane::new(Vec3::Z, bounds.mins.z),
            ClipPlane::new(Vec3::NEG_Z, -bounds.maxs.z),
        ]
    }
}
