//! Splitting world leaves around solid brush entities
//!
//! A leaf overlapped by doors or walls is replaced, for routing purposes, by
//! child nodes covering the part of the leaf outside those entities. The leaf
//! itself stays in the mesh as the children's parent and keeps its links, so
//! undoing a split only has to drop the children. A leaf lying wholly inside
//! those entities gets no children and is marked blocked instead.
//!
//! Children are appended at the end of the arena and removed as one
//! contiguous range, which renumbers every node after them.

use std::collections::BTreeMap;

use glam::Vec3;
use leafnav::{LeafLink, LeafNavMesh, LeafNode, NodeId, SplitEntity};
use leafnav_common::{ClipPlane, CollisionMap, Error, Polygon3D, Result};

use crate::context::{BuildContext, TimerCategory};
use crate::generator::{overlap_center, try_face_link_leaves, volumes_touch};
use crate::solid::SolidEntityNode;
use crate::{LeafNavMeshGenerator, MapEntity};

impl LeafNavMeshGenerator {
    /// Brings every world leaf's split in line with the current entity positions
    ///
    /// Leaves whose overlapping entities are unchanged are left alone; leaves
    /// no entity overlaps any more are restored. Returns the number of leaves
    /// that were re-split or restored.
    pub fn split_entity_leaves<M: CollisionMap + ?Sized>(
        &mut self,
        map: &M,
        mesh: &mut LeafNavMesh,
        entities: &[MapEntity],
        ctx: &mut BuildContext,
    ) -> Result<usize> {
        if self.octree.is_none() {
            return Err(Error::Generation(
                "entity split requested before the mesh was generated".to_string(),
            ));
        }
        ctx.start_timer(TimerCategory::EntitySplit);

        let wanted = self.wanted_split_states(map, mesh, entities);
        let mut changed = 0;

        let stale: Vec<NodeId> = (0..mesh.world_leaf_count())
            .filter(|id| !mesh.nodes()[*id as usize].split_state.is_empty())
            .filter(|id| !wanted.contains_key(id))
            .collect();
        for id in stale {
            self.unsplit_node(map, mesh, id);
            changed += 1;
        }

        for (id, state) in &wanted {
            if mesh.nodes()[*id as usize].split_state == *state {
                continue;
            }
            if !mesh.nodes()[*id as usize].split_state.is_empty() {
                self.unsplit_node(map, mesh, *id);
            }
            let children = self.split_leaf_by_ents(map, mesh, *id, state, entities);
            ctx.add_count("split_children", children);
            changed += 1;
        }

        // Children sit above the indexed range, so this only fires if
        // indexed nodes were removed
        let stale_index = self
            .octree
            .as_ref()
            .is_some_and(|o| o.id_limit() > mesh.world_leaf_count() as usize);
        if stale_index {
            ctx.log_warning("indexed nodes were removed, rebuilding the octree");
            self.build_octree(map, mesh);
        }

        ctx.stop_timer(TimerCategory::EntitySplit);
        if changed > 0 {
            ctx.log_info(format!(
                "entity split: {} leaves changed, {} nodes now",
                changed,
                mesh.len()
            ));
        }
        Ok(changed)
    }

    /// For every world leaf, the splitting entities overlapping it
    fn wanted_split_states<M: CollisionMap + ?Sized>(
        &mut self,
        map: &M,
        mesh: &LeafNavMesh,
        entities: &[MapEntity],
    ) -> BTreeMap<NodeId, Vec<SplitEntity>> {
        let count = mesh.world_leaf_count();
        let mut wanted: BTreeMap<NodeId, Vec<SplitEntity>> = BTreeMap::new();

        for (entidx, entity) in entities.iter().enumerate().skip(1) {
            let Some(model) = self.splitting_model(entity) else {
                continue;
            };
            let solid = self.solid_entity_node(map, model);
            if solid.is_empty() {
                continue;
            }

            let bounds = solid.bounds.translated(entity.origin);
            for id in self.query_nodes(&bounds) {
                if id >= count {
                    continue;
                }
                let node = &mesh.nodes()[id as usize];
                if node.is_entity() || !node.bounds.overlaps(&bounds) {
                    continue;
                }
                if self.solid_overlaps(node, &solid, entity) {
                    wanted.entry(id).or_default().push(SplitEntity {
                        entidx,
                        origin: entity.origin,
                    });
                }
            }
        }
        wanted
    }

    /// Checks if any piece of an entity solid overlaps a node with non-zero volume
    fn solid_overlaps(&self, node: &LeafNode, solid: &SolidEntityNode, entity: &MapEntity) -> bool {
        let node_planes: Vec<ClipPlane> = node.faces.iter().map(Polygon3D::back_plane).collect();
        solid.pieces.iter().any(|piece| {
            if !piece.bounds.translated(entity.origin).overlaps(&node.bounds) {
                return false;
            }
            let mut planes = node_planes.clone();
            planes.extend(piece.planes_at(entity.origin));
            self.clipper.clip(&planes).face_polygons().len() >= 4
        })
    }

    /// Faces of a convex region, if it is a usable split piece
    fn piece_faces(&self, planes: &[ClipPlane], max_diagonal: f32) -> Option<Vec<Polygon3D>> {
        let faces = self.clipper.clip(planes).face_polygons();
        if faces.len() < 3 {
            return None;
        }
        let mut bounds = leafnav_common::Aabb::empty();
        for face in &faces {
            bounds.expand(&face.bounds());
        }
        if bounds.diagonal() > max_diagonal {
            log::debug!(
                "discarding split piece with diagonal {:.1} (limit {:.1})",
                bounds.diagonal(),
                max_diagonal
            );
            return None;
        }
        Some(faces)
    }

    /// Replaces a leaf by children covering it minus the given entities
    ///
    /// Each solid piece is subtracted from every remaining region by walking
    /// its planes: the region beyond each plane becomes a new region, and
    /// what is left once all planes are applied lies inside the solid. Inside
    /// parts only become children when `include_solid_node` is set. Returns
    /// the number of children created.
    pub fn split_leaf_by_ents<M: CollisionMap + ?Sized>(
        &mut self,
        map: &M,
        mesh: &mut LeafNavMesh,
        id: NodeId,
        state: &[SplitEntity],
        entities: &[MapEntity],
    ) -> usize {
        let Some(node) = mesh.node(id) else {
            return 0;
        };
        if node.is_split() || node.is_child() {
            log::warn!("split_leaf_by_ents: node {} is already split or a child", id);
            return 0;
        }
        let bounds = node.bounds;
        let max_diagonal = bounds.diagonal() + self.config.split_diagonal_tolerance;
        let bsp_leaf = node.bsp_leaf;

        // Regions still outside every solid, each as its bounding planes
        let mut remaining: Vec<Vec<ClipPlane>> =
            vec![node.faces.iter().map(Polygon3D::back_plane).collect()];
        let mut inside: Vec<Vec<Polygon3D>> = Vec::new();

        for split in state {
            let Some(model) = entities.get(split.entidx).and_then(|e| self.splitting_model(e))
            else {
                continue;
            };
            let solid = self.solid_entity_node(map, model);

            for piece in &solid.pieces {
                if !piece.bounds.translated(split.origin).overlaps(&bounds) {
                    continue;
                }
                let piece_planes: Vec<ClipPlane> = piece.planes_at(split.origin).collect();
                let mut next = Vec::with_capacity(remaining.len());

                for region in remaining {
                    let mut carved = region;
                    for plane in &piece_planes {
                        let mut beyond = carved.clone();
                        beyond.push(plane.inverse());
                        if self.piece_faces(&beyond, max_diagonal).is_some() {
                            next.push(beyond);
                        }
                        carved.push(*plane);
                    }
                    if let Some(faces) = self.piece_faces(&carved, max_diagonal) {
                        inside.push(faces);
                    }
                }
                remaining = next;
            }
        }

        let mut children: Vec<Vec<Polygon3D>> = remaining
            .iter()
            .filter_map(|planes| self.piece_faces(planes, max_diagonal))
            .collect();
        let carved_anything = !inside.is_empty();
        if self.config.include_solid_node {
            children.extend(inside);
        }

        let Some(node) = mesh.node_mut(id) else {
            return 0;
        };
        node.split_state = state.to_vec();
        if !carved_anything {
            log::debug!("node {}: entities carve nothing, not splitting", id);
            return 0;
        }
        if children.is_empty() {
            log::debug!("node {}: covered by entities, blocking it", id);
            node.blocked = true;
            return 0;
        }

        let first = mesh.len() as NodeId;
        let count = children.len() as u32;
        for faces in children {
            let mut child = LeafNode::new(faces);
            child.parent_idx = id;
            child.bsp_leaf = bsp_leaf;
            mesh.add_node(child);
        }
        if let Some(node) = mesh.node_mut(id) {
            node.child_idx = first;
            node.child_count = count;
        }

        self.link_nav_child_leaves(mesh, id);
        for child in first..first + count {
            self.set_leaf_origin(map, mesh, child);
        }
        for child in first..first + count {
            self.calc_node_costs(map, mesh, child);
            self.calc_costs_into(map, mesh, child);
        }
        count as usize
    }

    /// Links the children of `parent` to each other and to the parent's neighbours
    ///
    /// A neighbour that is itself split contributes its children instead.
    /// Entity neighbours are linked both ways to every child their volume
    /// touches. Nodes with a one-way link into the parent, such as teleports
    /// landing there, also get a link to the child holding the landing point.
    /// The parent keeps its own links. Returns the number of links added.
    pub fn link_nav_child_leaves(&self, mesh: &mut LeafNavMesh, parent: NodeId) -> usize {
        let Some(node) = mesh.node(parent) else {
            return 0;
        };
        let children = node.children();
        let mut neighbours = Vec::new();
        let mut entity_neighbours = Vec::new();
        for link in &node.links {
            match mesh.node(link.node) {
                Some(n) if n.is_entity() => entity_neighbours.push(link.node),
                Some(n) if n.is_split() => neighbours.extend(n.children()),
                Some(_) => neighbours.push(link.node),
                None => {}
            }
        }
        let arrivals: Vec<(NodeId, Vec3)> = mesh
            .nodes()
            .iter()
            .filter(|n| node.link_to(n.id).is_none())
            .filter_map(|n| n.link_to(parent).map(|l| (n.id, l.pos)))
            .collect();

        let mut linked = 0;
        for a in children.clone() {
            for b in a + 1..children.end {
                linked += usize::from(try_face_link_leaves(mesh, a, b));
            }
            for &n in &neighbours {
                linked += usize::from(try_face_link_leaves(mesh, a, n));
            }
            for &n in &entity_neighbours {
                let (child, entity) = (&mesh.nodes()[a as usize], &mesh.nodes()[n as usize]);
                if !volumes_touch(child, entity) {
                    continue;
                }
                let pos = overlap_center(&child.bounds, &entity.bounds);
                linked += usize::from(mesh.add_link(a, LeafLink::with_point(n, pos)));
                linked += usize::from(mesh.add_link(n, LeafLink::with_point(a, pos)));
            }
        }

        for (from, pos) in arrivals {
            let distance = |c: &NodeId| mesh.nodes()[*c as usize].center.distance(pos);
            let landing = children
                .clone()
                .find(|&c| mesh.nodes()[c as usize].contains_point(pos))
                .or_else(|| {
                    children
                        .clone()
                        .min_by(|a, b| distance(a).total_cmp(&distance(b)))
                });
            if let Some(child) = landing {
                linked += usize::from(mesh.add_link(from, LeafLink::with_point(child, pos)));
            }
        }
        linked
    }

    /// Drops the children of a split leaf, or lifts its block
    ///
    /// Every link into the children goes with them, and the parent's own
    /// links were never touched. Split neighbours whose children were linked
    /// to the removed children get those links back on the parent.
    pub fn unsplit_node<M: CollisionMap + ?Sized>(
        &self,
        map: &M,
        mesh: &mut LeafNavMesh,
        id: NodeId,
    ) {
        let Some(node) = mesh.node(id) else {
            return;
        };
        let (first, count) = (node.child_idx, node.child_count);
        let split_neighbours: Vec<NodeId> = node
            .links
            .iter()
            .map(|l| l.node)
            .filter(|&n| mesh.is_split(n))
            .collect();

        if count > 0 {
            mesh.remove_range(first, count);
        } else if let Some(node) = mesh.node_mut(id) {
            node.split_state.clear();
            node.blocked = false;
        }

        // Removal shifted ids above the children, but the parent and its
        // neighbours are world leaves, which sit below every child. A blocked
        // leaf was never linked to children split off after it was blocked.
        for neighbour in split_neighbours {
            let children = mesh.node(neighbour).map(|n| n.children());
            for child in children.into_iter().flatten() {
                if try_face_link_leaves(mesh, id, child) {
                    self.calc_node_costs(map, mesh, child);
                    self.calc_costs_into(map, mesh, child);
                }
            }
        }
    }
}
