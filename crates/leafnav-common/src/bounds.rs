//! Axis-aligned bounding boxes

use crate::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum bounds
    pub mins: Vec3,
    /// Maximum bounds
    pub maxs: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    /// Creates a new Aabb from min and max points
    pub fn new(mins: Vec3, maxs: Vec3) -> Self {
        Self { mins, maxs }
    }

    /// Creates an empty Aabb (invalid bounds)
    pub fn empty() -> Self {
        Self {
            mins: Vec3::splat(f32::MAX),
            maxs: Vec3::splat(f32::MIN),
        }
    }

    /// Creates the bounds of a set of points
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let mut bounds = Self::empty();
        for p in points {
            bounds.expand_point(*p);
        }
        bounds
    }

    /// Checks if this Aabb is valid
    pub fn is_valid(&self) -> bool {
        self.mins.cmple(self.maxs).all()
    }

    /// Expands this Aabb to include another Aabb
    pub fn expand(&mut self, other: &Aabb) {
        self.mins = self.mins.min(other.mins);
        self.maxs = self.maxs.max(other.maxs);
    }

    /// Expands this Aabb to include a point
    pub fn expand_point(&mut self, point: Vec3) {
        self.mins = self.mins.min(point);
        self.maxs = self.maxs.max(point);
    }

    /// Returns a copy grown by `amount` on every side
    pub fn inflated(&self, amount: f32) -> Aabb {
        Aabb::new(self.mins - Vec3::splat(amount), self.maxs + Vec3::splat(amount))
    }

    /// Returns a copy moved by `offset`
    pub fn translated(&self, offset: Vec3) -> Aabb {
        Aabb::new(self.mins + offset, self.maxs + offset)
    }

    /// Checks if this Aabb overlaps with another Aabb (touching counts)
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.mins.cmple(other.maxs).all() && self.maxs.cmpge(other.mins).all()
    }

    /// Checks if a point lies inside or on the boundary
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.mins).all() && point.cmple(self.maxs).all()
    }

    /// Gets the center of the Aabb
    pub fn center(&self) -> Vec3 {
        (self.mins + self.maxs) * 0.5
    }

    /// Gets the size of the Aabb along each axis
    pub fn size(&self) -> Vec3 {
        self.maxs - self.mins
    }

    /// Length of the box diagonal
    pub fn diagonal(&self) -> f32 {
        self.size().length()
    }

    /// The 8 corners of the box
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.mins, self.maxs);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }
}
