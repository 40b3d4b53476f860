//! The navigation mesh arena
//!
//! Nodes live in a flat vector and reference each other by index. Adding
//! nodes never renumbers anything; removing a contiguous range shifts every id
//! above it, and that renumbering happens in exactly one place,
//! [`LeafNavMesh::remove_range`].

use crate::{LeafLink, LeafNode, NodeId, NAV_INVALID_IDX};
use glam::Vec3;
use leafnav_common::{Aabb, CollisionMap, Polygon3D};

/// Navigation graph of convex leaf volumes
#[derive(Debug, Clone, Default)]
pub struct LeafNavMesh {
    nodes: Vec<LeafNode>,
    /// Collision leaf index -> nodes containing that leaf's centroid
    leaf_map: Vec<Vec<NodeId>>,
    /// Number of leading nodes produced by full generation
    world_leaf_count: u32,
    /// Bumped on every structural edit
    generation: u64,
}

impl LeafNavMesh {
    /// Creates an empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[LeafNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&LeafNode> {
        self.nodes.get(id as usize)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut LeafNode> {
        self.nodes.get_mut(id as usize)
    }

    /// Number of nodes, split parents included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Checks if `id` addresses a node
    #[inline]
    pub fn is_valid_id(&self, id: NodeId) -> bool {
        (id as usize) < self.nodes.len()
    }

    /// Number of nodes that have not been split
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.is_split()).count()
    }

    /// Checks if the node has been replaced by children
    pub fn is_split(&self, id: NodeId) -> bool {
        self.node(id).map_or(false, |n| n.is_split())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn world_leaf_count(&self) -> u32 {
        self.world_leaf_count
    }

    /// Marks every current node as produced by full generation
    pub fn seal_world_leaves(&mut self) {
        self.world_leaf_count = self.nodes.len() as u32;
    }

    /// Appends a node and returns its id
    pub fn add_node(&mut self, mut node: LeafNode) -> NodeId {
        let id = self.nodes.len() as NodeId;
        node.id = id;
        self.nodes.push(node);
        self.generation += 1;
        id
    }

    /// Adds a directed link unless `from` already links to the same node
    pub fn add_link(&mut self, from: NodeId, link: LeafLink) -> bool {
        if !self.is_valid_id(link.node) || link.node == from {
            return false;
        }
        let Some(node) = self.node_mut(from) else {
            return false;
        };
        if node.link_to(link.node).is_some() {
            return false;
        }
        node.links.push(link);
        true
    }

    /// Links two nodes in both directions through a shared contact area
    pub fn link_nodes(&mut self, a: NodeId, b: NodeId, area: Polygon3D) -> bool {
        let forward = self.add_link(a, LeafLink::new(b, area.clone()));
        let backward = self.add_link(b, LeafLink::new(a, area));
        forward || backward
    }

    /// The link from `from` to `to`, if any
    pub fn link_to(&self, from: NodeId, to: NodeId) -> Option<&LeafLink> {
        self.node(from).and_then(|n| n.link_to(to))
    }

    /// Removes every link pointing at `target`
    pub fn unlink_node(&mut self, target: NodeId) {
        for node in &mut self.nodes {
            node.links.retain(|l| l.node != target);
        }
    }

    /// Records that `node` contains the centroid of collision leaf `bsp_leaf`
    pub fn add_leaf_mapping(&mut self, bsp_leaf: usize, node: NodeId) {
        if self.leaf_map.len() <= bsp_leaf {
            self.leaf_map.resize(bsp_leaf + 1, Vec::new());
        }
        if !self.leaf_map[bsp_leaf].contains(&node) {
            self.leaf_map[bsp_leaf].push(node);
        }
    }

    /// Nodes recorded for a collision leaf
    pub fn leaf_nodes(&self, bsp_leaf: usize) -> &[NodeId] {
        self.leaf_map
            .get(bsp_leaf)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Cost of traversing `link` out of node `from`
    pub fn edge_cost(&self, from: NodeId, link: &LeafLink) -> f32 {
        match (self.node(from), self.node(link.node)) {
            (Some(a), Some(b)) => {
                link.base_cost + link.cost_multiplier * a.origin.distance(b.origin)
            }
            _ => f32::INFINITY,
        }
    }

    /// Accumulated cost of a path; infinite when two consecutive ids are not linked
    pub fn path_cost(&self, path: &[NodeId]) -> f32 {
        path.windows(2)
            .map(|w| match self.link_to(w[0], w[1]) {
                Some(link) => self.edge_cost(w[0], link),
                None => f32::INFINITY,
            })
            .sum()
    }

    /// Deletes the contiguous id range `[start, start + count)`
    ///
    /// Links into the range are dropped and every id above it is shifted down,
    /// in links, parent/child indices and the leaf map. A node whose children
    /// are removed becomes an unsplit leaf again.
    pub fn remove_range(&mut self, start: NodeId, count: u32) {
        let end = start as usize + count as usize;
        if count == 0 || end > self.nodes.len() {
            log::warn!(
                "remove_range({}, {}) out of bounds for {} nodes",
                start,
                count,
                self.nodes.len()
            );
            return;
        }
        let end = end as NodeId;

        self.nodes.drain(start as usize..end as usize);

        let removed = |id: NodeId| id != NAV_INVALID_IDX && id >= start && id < end;
        let shift = |id: NodeId| {
            if id != NAV_INVALID_IDX && id >= end {
                id - count
            } else {
                id
            }
        };

        for node in &mut self.nodes {
            node.id = shift(node.id);

            node.links.retain(|l| !removed(l.node));
            for link in &mut node.links {
                link.node = shift(link.node);
            }

            node.parent_idx = if removed(node.parent_idx) {
                NAV_INVALID_IDX
            } else {
                shift(node.parent_idx)
            };

            if removed(node.child_idx) {
                node.child_idx = NAV_INVALID_IDX;
                node.child_count = 0;
                node.split_state.clear();
            } else {
                node.child_idx = shift(node.child_idx);
            }
        }

        for ids in &mut self.leaf_map {
            ids.retain(|id| !removed(*id));
            for id in ids.iter_mut() {
                *id = shift(*id);
            }
        }

        if start < self.world_leaf_count {
            let indexed_removed = self.world_leaf_count.min(end) - start;
            self.world_leaf_count -= indexed_removed;
        }

        self.generation += 1;
    }

    /// Drops every node and lookup
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.leaf_map.clear();
        self.world_leaf_count = 0;
        self.generation += 1;
    }

    /// Node containing `point`, searched through the collision leaf lookup
    ///
    /// Returns [`NAV_INVALID_IDX`] when no node claims the point, which can
    /// happen for points right on a split boundary.
    pub fn get_node_idx<M: CollisionMap + ?Sized>(&self, map: &M, point: Vec3) -> NodeId {
        let Some(bsp_leaf) = map.point_leaf(point) else {
            return NAV_INVALID_IDX;
        };

        for &id in self.leaf_nodes(bsp_leaf) {
            if let Some(found) = self.find_containing(id, point) {
                return found;
            }
        }
        NAV_INVALID_IDX
    }

    /// Descends into split nodes to find the leaf containing `point`
    fn find_containing(&self, id: NodeId, point: Vec3) -> Option<NodeId> {
        let node = self.node(id)?;
        if !node.is_split() {
            return node.contains_point(point).then_some(id);
        }
        node.children().find_map(|child| self.find_containing(child, point))
    }

    /// Node overlapping an entity box
    ///
    /// Tries the entity origin, the box centre and its corners first; when none
    /// of them lands in a node, falls back to testing the box faces against the
    /// faces of every leaf.
    pub fn get_node_idx_for_box<M: CollisionMap + ?Sized>(
        &self,
        map: &M,
        origin: Vec3,
        bounds: &Aabb,
    ) -> NodeId {
        let corners = bounds.corners();
        let samples = [origin, bounds.center()].into_iter().chain(corners);
        for point in samples {
            let id = self.get_node_idx(map, point);
            if id != NAV_INVALID_IDX {
                return id;
            }
        }

        let box_faces = Polygon3D::box_faces(bounds);
        for node in &self.nodes {
            if node.is_split() || !node.bounds.overlaps(bounds) {
                continue;
            }
            let hit = node.faces.iter().any(|face| {
                box_faces
                    .iter()
                    .any(|b| face.intersects(b) || b.intersects(face))
            });
            if hit {
                return node.id;
            }
        }
        NAV_INVALID_IDX
    }

    /// Checks the structural consistency of the arena
    ///
    /// Every problem found is logged; returns `true` when there were none.
    pub fn validate(&self) -> bool {
        let len = self.nodes.len() as NodeId;
        let mut ok = true;
        let mut fail = |msg: String| {
            log::error!("{}", msg);
            ok = false;
        };

        if self.world_leaf_count > len {
            fail(format!(
                "world leaf count {} exceeds node count {}",
                self.world_leaf_count, len
            ));
        }

        for (i, node) in self.nodes.iter().enumerate() {
            let i = i as NodeId;
            if node.id != i {
                fail(format!("node {} stores id {}", i, node.id));
            }

            if node.is_split() && node.is_child() {
                fail(format!("node {} is both a parent and a child", i));
            }

            if node.is_child() {
                match self.node(node.parent_idx) {
                    Some(parent) if parent.children().contains(&i) => {}
                    Some(_) => fail(format!(
                        "node {} is not in the child range of its parent {}",
                        i, node.parent_idx
                    )),
                    None => fail(format!("node {} has invalid parent {}", i, node.parent_idx)),
                }
            }

            if node.blocked {
                if node.child_idx != NAV_INVALID_IDX || node.child_count != 0 {
                    fail(format!("blocked node {} has children", i));
                }
            } else if node.is_split() {
                let range_end = node.child_idx as u64 + node.child_count as u64;
                if node.child_count == 0 || range_end > len as u64 {
                    fail(format!(
                        "node {} has invalid child range {}+{}",
                        i, node.child_idx, node.child_count
                    ));
                } else {
                    for child in node.children() {
                        if self.nodes[child as usize].parent_idx != i {
                            fail(format!("child {} of node {} does not point back", child, i));
                        }
                    }
                }
            }

            for link in &node.links {
                if link.node >= len {
                    fail(format!("node {} links to invalid node {}", i, link.node));
                } else if link.node == i {
                    fail(format!("node {} links to itself", i));
                }
                if !(link.base_cost >= 0.0) || !(link.cost_multiplier >= 1.0) {
                    fail(format!(
                        "link {} -> {} has invalid cost {} + {}x",
                        i, link.node, link.base_cost, link.cost_multiplier
                    ));
                }
            }
        }

        for (leaf, ids) in self.leaf_map.iter().enumerate() {
            for id in ids {
                if *id >= len {
                    fail(format!("leaf {} maps to invalid node {}", leaf, id));
                }
            }
        }

        ok
    }
}
