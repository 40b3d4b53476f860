//! Interface to the BSP collision data the navigation mesh is built from
//!
//! The map itself (file loading, lumps, clipnode traversal) lives outside these
//! crates. Generation only needs the handful of queries in [`CollisionMap`].

use crate::{Aabb, ClipPlane, Vec3};
use serde::{Deserialize, Serialize};

/// Leaf contents: open space
pub const CONTENTS_EMPTY: i32 = -1;
/// Leaf contents: solid
pub const CONTENTS_SOLID: i32 = -2;
/// Leaf contents: water
pub const CONTENTS_WATER: i32 = -3;
/// Leaf contents: climbable ladder volume
pub const CONTENTS_LADDER: i32 = -16;

/// Collision hull size classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hull {
    /// Zero-size point hull
    Point,
    /// Standing player
    Human,
    /// Large monsters
    Large,
    /// Crouching player
    #[default]
    Head,
}

impl Hull {
    /// Index of the hull in the map's clipnode hull table
    pub fn index(self) -> usize {
        match self {
            Hull::Point => 0,
            Hull::Human => 1,
            Hull::Large => 2,
            Hull::Head => 3,
        }
    }
}

/// Bounding half-spaces of one collision leaf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafPlanes {
    /// Leaf index within the queried model and hull
    pub leaf: usize,
    /// Half-spaces whose intersection is the leaf volume
    pub planes: Vec<ClipPlane>,
}

/// Result of a straight-line hull trace
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trace {
    /// Fraction of the segment travelled before hitting something (1.0 = no hit)
    pub fraction: f32,
    /// Final position of the trace
    pub end_pos: Vec3,
    /// Normal of the surface that stopped the trace
    pub plane_normal: Vec3,
    /// The trace started inside solid
    pub start_solid: bool,
    /// The whole segment is inside solid
    pub all_solid: bool,
}

impl Trace {
    /// A trace that travelled the full segment
    pub fn clear(end: Vec3) -> Self {
        Self {
            fraction: 1.0,
            end_pos: end,
            plane_normal: Vec3::ZERO,
            start_solid: false,
            all_solid: false,
        }
    }

    /// Checks if the trace stopped before reaching its end
    pub fn hit(&self) -> bool {
        self.fraction < 1.0
    }
}

/// Queries the navigation mesh generator needs from the BSP collision data
pub trait CollisionMap {
    /// Bounds of the whole world
    fn world_bounds(&self) -> Aabb;

    /// Plane lists for every leaf of `model` in `hull` with the given contents
    fn leaf_clip_planes(&self, model: usize, hull: Hull, contents: i32) -> Vec<LeafPlanes>;

    /// Traces a hull from `start` towards `end` through model 0
    fn trace(&self, start: Vec3, end: Vec3, hull: Hull) -> Trace;

    /// Point-hull leaf containing `point`, if the point is inside the world
    fn point_leaf(&self, point: Vec3) -> Option<usize>;

    /// Centroid of every point-hull leaf in model 0, keyed by leaf index
    fn leaf_centroids(&self) -> Vec<(usize, Vec3)>;
}

impl<M: CollisionMap + ?Sized> CollisionMap for &M {
    fn world_bounds(&self) -> Aabb {
        (**self).world_bounds()
    }

    fn leaf_clip_planes(&self, model: usize, hull: Hull, contents: i32) -> Vec<LeafPlanes> {
        (**self).leaf_clip_planes(model, hull, contents)
    }

    fn trace(&self, start: Vec3, end: Vec3, hull: Hull) -> Trace {
        (**self).trace(start, end, hull)
    }

    fn point_leaf(&self, point: Vec3) -> Option<usize> {
        (**self).point_leaf(point)
    }

    fn leaf_centroids(&self) -> Vec<(usize, Vec3)> {
        (**self).leaf_centroids()
    }
}
