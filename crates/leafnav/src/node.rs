//! Navigation nodes and the links between them

use crate::{NodeId, NAV_INVALID_IDX};
use glam::Vec3;
use leafnav_common::{Aabb, Polygon3D, EPSILON};

/// A directed, traversable connection to another node
#[derive(Debug, Clone)]
pub struct LeafLink {
    /// Destination node
    pub node: NodeId,
    /// Representative crossing point
    pub pos: Vec3,
    /// Region shared by the two nodes
    pub link_area: Polygon3D,
    /// Flat cost added to every traversal
    pub base_cost: f32,
    /// Scale applied to the distance between the node anchors
    pub cost_multiplier: f32,
}

impl LeafLink {
    /// Creates a free link crossing at the centre of `link_area`
    pub fn new(node: NodeId, link_area: Polygon3D) -> Self {
        Self {
            node,
            pos: link_area.center,
            link_area,
            base_cost: 0.0,
            cost_multiplier: 1.0,
        }
    }

    /// Creates a link with no contact area, crossing at `pos`
    pub fn with_point(node: NodeId, pos: Vec3) -> Self {
        Self {
            node,
            pos,
            link_area: Polygon3D::default(),
            base_cost: 0.0,
            cost_multiplier: 1.0,
        }
    }
}

/// An entity that split a node, and where it was at the time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitEntity {
    pub entidx: usize,
    pub origin: Vec3,
}

/// One convex navigable region
#[derive(Debug, Clone)]
pub struct LeafNode {
    /// Index of this node in the mesh
    pub id: NodeId,
    pub bounds: Aabb,
    /// Walkable anchor used for costs and as a trace origin
    pub origin: Vec3,
    /// Centroid of the boundary faces
    pub center: Vec3,
    /// Boundary faces, normals pointing out of the volume
    pub faces: Vec<Polygon3D>,
    pub links: Vec<LeafLink>,
    /// Node this one was split from
    pub parent_idx: NodeId,
    /// First child when this node has been split
    pub child_idx: NodeId,
    pub child_count: u32,
    /// Entity index (0 for world geometry)
    pub entidx: usize,
    /// Collision leaf this node was built from
    pub bsp_leaf: Option<usize>,
    /// Entities the current children were split around
    pub split_state: Vec<SplitEntity>,
    /// Set when the split left nothing walkable: split, but with no children
    pub blocked: bool,
}

impl LeafNode {
    /// Creates an unlinked node from its boundary faces
    pub fn new(faces: Vec<Polygon3D>) -> Self {
        let mut bounds = Aabb::empty();
        let mut weighted = Vec3::ZERO;
        let mut total_area = 0.0;
        for face in &faces {
            bounds.expand(&face.bounds());
            weighted += face.center * face.area;
            total_area += face.area;
        }

        let center = if total_area > 0.0 {
            weighted / total_area
        } else {
            bounds.center()
        };

        Self {
            id: NAV_INVALID_IDX,
            bounds,
            origin: center,
            center,
            faces,
            links: Vec::new(),
            parent_idx: NAV_INVALID_IDX,
            child_idx: NAV_INVALID_IDX,
            child_count: 0,
            entidx: 0,
            bsp_leaf: None,
            split_state: Vec::new(),
            blocked: false,
        }
    }

    /// Creates a box-shaped node
    pub fn from_bounds(bounds: &Aabb) -> Self {
        Self::new(Polygon3D::box_faces(bounds))
    }

    /// Checks if the node has been replaced by children, or blocked entirely
    #[inline]
    pub fn is_split(&self) -> bool {
        self.child_idx != NAV_INVALID_IDX || self.blocked
    }

    /// Checks if the node is a child of a split node
    #[inline]
    pub fn is_child(&self) -> bool {
        self.parent_idx != NAV_INVALID_IDX
    }

    /// Checks if the node belongs to an entity rather than world geometry
    #[inline]
    pub fn is_entity(&self) -> bool {
        self.entidx != 0
    }

    /// Range of child ids
    pub fn children(&self) -> std::ops::Range<NodeId> {
        if self.child_idx != NAV_INVALID_IDX {
            self.child_idx..self.child_idx + self.child_count
        } else {
            0..0
        }
    }

    /// Checks if a point is inside the volume, boundary included
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.bounds.inflated(EPSILON).contains_point(point)
            && self.faces.iter().all(|f| f.dist_to_plane(point) <= EPSILON)
    }

    /// The link to `target`, if any
    pub fn link_to(&self, target: NodeId) -> Option<&LeafLink> {
        self.links.iter().find(|l| l.node == target)
    }

    /// Mutable access to the link to `target`
    pub fn link_to_mut(&mut self, target: NodeId) -> Option<&mut LeafLink> {
        self.links.iter_mut().find(|l| l.node == target)
    }
}
