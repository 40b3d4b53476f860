//! Fixed-depth octree for "which nodes are near this box" queries
//!
//! The tree covers a power-of-two cube centred on the origin. Octants are
//! allocated lazily in a flat arena as ids are inserted, and ids are stored
//! only in the octants at the maximum depth. The tree does not own the nodes
//! it indexes; callers rebuild it when the indexed ids change.

use crate::NodeId;
use leafnav_common::{next_pow2, Aabb};

/// Default subdivision depth
pub const DEFAULT_OCTREE_DEPTH: u32 = 6;

/// Marker for an unallocated child octant
const NO_OCTANT: u32 = 0;

#[derive(Debug, Clone)]
struct Octant {
    bounds: Aabb,
    depth: u32,
    /// Child octant indices, [`NO_OCTANT`] when not allocated
    children: [u32; 8],
    /// Ids stored at maximum depth
    ids: Vec<NodeId>,
}

impl Octant {
    fn new(bounds: Aabb, depth: u32) -> Self {
        Self {
            bounds,
            depth,
            children: [NO_OCTANT; 8],
            ids: Vec::new(),
        }
    }

    fn child_bounds(&self, i: usize) -> Aabb {
        let half = self.bounds.size() * 0.5;
        let offset = glam::Vec3::new(
            (i & 1) as f32 * half.x,
            ((i >> 1) & 1) as f32 * half.y,
            ((i >> 2) & 1) as f32 * half.z,
        );
        let mins = self.bounds.mins + offset;
        Aabb::new(mins, mins + half)
    }
}

/// Spatial index of node ids by bounding box
#[derive(Debug, Clone)]
pub struct SpatialOctree {
    octants: Vec<Octant>,
    max_depth: u32,
    /// One past the largest inserted id
    id_limit: usize,
}

impl SpatialOctree {
    /// Creates an empty tree enclosing `world`
    pub fn new(world: &Aabb, max_depth: u32) -> Self {
        let extent = if world.is_valid() {
            world.mins.abs().max(world.maxs.abs()).max_element()
        } else {
            1.0
        };
        let half = next_pow2(extent.ceil().max(1.0) as u32) as f32;
        let cube = Aabb::new(glam::Vec3::splat(-half), glam::Vec3::splat(half));

        Self {
            octants: vec![Octant::new(cube, 0)],
            max_depth,
            id_limit: 0,
        }
    }

    /// Builds a tree and inserts every `(id, bounds)` pair
    pub fn build(
        world: &Aabb,
        max_depth: u32,
        items: impl IntoIterator<Item = (NodeId, Aabb)>,
    ) -> Self {
        let mut tree = Self::new(world, max_depth);
        for (id, bounds) in items {
            tree.insert(id, &bounds);
        }
        tree
    }

    /// The cube covered by the tree
    pub fn bounds(&self) -> Aabb {
        self.octants[0].bounds
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Number of allocated octants
    pub fn octant_count(&self) -> usize {
        self.octants.len()
    }

    /// Length of the presence vector filled by [`SpatialOctree::query`]
    pub fn id_limit(&self) -> usize {
        self.id_limit
    }

    /// Threads `id` into every octant its bounds overlap
    pub fn insert(&mut self, id: NodeId, bounds: &Aabb) {
        if !bounds.is_valid() {
            log::debug!("octree: skipping node {} with empty bounds", id);
            return;
        }
        self.id_limit = self.id_limit.max(id as usize + 1);

        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            if !self.octants[idx].bounds.overlaps(bounds) {
                continue;
            }
            if self.octants[idx].depth == self.max_depth {
                self.octants[idx].ids.push(id);
                continue;
            }

            for i in 0..8 {
                let child_bounds = self.octants[idx].child_bounds(i);
                if !child_bounds.overlaps(bounds) {
                    continue;
                }
                let mut child = self.octants[idx].children[i];
                if child == NO_OCTANT {
                    child = self.octants.len() as u32;
                    let depth = self.octants[idx].depth + 1;
                    self.octants.push(Octant::new(child_bounds, depth));
                    self.octants[idx].children[i] = child;
                }
                stack.push(child as usize);
            }
        }
    }

    /// Marks every id stored in octants overlapping `bounds`
    ///
    /// `presence` is resized to [`SpatialOctree::id_limit`] and cleared first,
    /// so one vector can be reused across queries.
    pub fn query(&self, bounds: &Aabb, presence: &mut Vec<bool>) {
        presence.clear();
        presence.resize(self.id_limit, false);

        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            let octant = &self.octants[idx];
            if !octant.bounds.overlaps(bounds) {
                continue;
            }
            for id in &octant.ids {
                presence[*id as usize] = true;
            }
            stack.extend(
                octant
                    .children
                    .iter()
                    .filter(|c| **c != NO_OCTANT)
                    .map(|c| *c as usize),
            );
        }
    }

    /// Ids stored in octants overlapping `bounds`, ascending
    pub fn query_ids(&self, bounds: &Aabb) -> Vec<NodeId> {
        let mut presence = Vec::new();
        self.query(bounds, &mut presence);
        presence
            .iter()
            .enumerate()
            .filter(|(_, present)| **present)
            .map(|(id, _)| id as NodeId)
            .collect()
    }
}
