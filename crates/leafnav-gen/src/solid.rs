//! Clipped volumes of brush entity models
//!
//! A brush entity can be made of several convex solid leaves. Each is kept as
//! its bounding planes (for splitting nav leaves) and its clipped faces (for
//! bounds and containment), in model-local coordinates.

use glam::Vec3;
use leafnav_common::{
    Aabb, ClipPlane, CollisionMap, Hull, Polygon3D, CONTENTS_LADDER, CONTENTS_SOLID, EPSILON,
};

use crate::clipper::Clipper;

/// One convex solid leaf of a brush model
#[derive(Debug, Clone)]
pub struct SolidPiece {
    pub planes: Vec<ClipPlane>,
    pub faces: Vec<Polygon3D>,
    pub bounds: Aabb,
}

impl SolidPiece {
    /// Bounding planes moved to an entity origin
    pub fn planes_at(&self, origin: Vec3) -> impl Iterator<Item = ClipPlane> + '_ {
        self.planes.iter().map(move |p| p.translated(origin))
    }
}

/// Every solid piece of one brush model
#[derive(Debug, Clone, Default)]
pub struct SolidEntityNode {
    pub model: usize,
    pub pieces: Vec<SolidPiece>,
    /// Union of the piece bounds
    pub bounds: Aabb,
}

impl SolidEntityNode {
    /// Clips the solid and ladder leaves of `model`
    pub fn build<M: CollisionMap + ?Sized>(
        map: &M,
        model: usize,
        hull: Hull,
        clipper: &Clipper,
    ) -> Self {
        let mut node = Self {
            model,
            pieces: Vec::new(),
            bounds: Aabb::empty(),
        };

        for contents in [CONTENTS_SOLID, CONTENTS_LADDER] {
            for leaf in map.leaf_clip_planes(model, hull, contents) {
                let faces = clipper.clip(&leaf.planes).face_polygons();
                if faces.len() < 4 {
                    log::debug!(
                        "model {} leaf {} clips to {} faces, skipping",
                        model,
                        leaf.leaf,
                        faces.len()
                    );
                    continue;
                }
                let mut bounds = Aabb::empty();
                for face in &faces {
                    bounds.expand(&face.bounds());
                }
                node.bounds.expand(&bounds);
                node.pieces.push(SolidPiece {
                    planes: leaf.planes,
                    faces,
                    bounds,
                });
            }
        }
        node
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Checks if a model-local point is inside any piece
    pub fn contains_point(&self, local: Vec3) -> bool {
        self.pieces.iter().any(|piece| {
            piece.bounds.inflated(EPSILON).contains_point(local)
                && piece.planes.iter().all(|p| p.distance(local) >= -EPSILON)
        })
    }
}
