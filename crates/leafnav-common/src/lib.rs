//! Common geometry and collaborator interfaces used by the leaf navigation mesh crates
//!
//! This crate holds everything the generator, the mesh and the dynamic wrapper
//! share: the error type, planar polygon math, half-space planes, bounding boxes
//! and the [`CollisionMap`] trait through which the BSP collision data is consumed.

mod bounds;
mod collision;
mod line;
mod math;
mod plane;
mod polygon;

pub use bounds::Aabb;
pub use collision::{
    CollisionMap, Hull, LeafPlanes, Trace, CONTENTS_EMPTY, CONTENTS_LADDER, CONTENTS_SOLID,
    CONTENTS_WATER,
};
pub use line::Line2D;
pub use math::*;
pub use plane::ClipPlane;
pub use polygon::{point_in_polygon_2d, remove_colinear_verts, Polygon3D};

/// Represents a 3D position
pub type Vec3 = glam::Vec3;

/// Represents a position in a polygon's local 2D space
pub type Vec2 = glam::Vec2;

/// General tolerance for point-on-plane and coplanarity tests
pub const EPSILON: f32 = 0.01;

/// Distance to a polygon edge inside which a point is not considered inside
pub const INPOLY_EPSILON: f32 = 1.0 / 128.0;

/// Vertices closer than this are merged into one
pub const SAME_VERT_EPSILON: f32 = 1.0 / 32.0;

/// Middle vertices closer than this to their neighbours' line are dropped
pub const COLINEAR_EPSILON: f32 = 1.0 / 32.0;

/// A cut line this close to an existing edge does not split the polygon
pub const COLINEAR_CUT_EPSILON: f32 = 0.1;

/// Minimum 1D overlap required for two polygons to count as intersecting
pub const MIN_LINE_OVERLAP: f32 = 0.01;

/// Error types for the library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid world: {0}")]
    InvalidWorld(String),

    #[error("navigation mesh generation failed: {0}")]
    Generation(String),

    #[error("node handle {id} is stale (handle generation {handle}, mesh generation {current})")]
    StaleNodeHandle { id: u32, handle: u64, current: u64 },

    #[error("concurrency error: {0}")]
    Concurrency(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for leaf navigation mesh operations
pub type Result<T> = std::result::Result<T, Error>;
