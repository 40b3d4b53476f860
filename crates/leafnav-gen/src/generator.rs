//! Leaf navigation mesh generation
//!
//! A full build runs in fixed phases:
//!
//! 1. every open leaf of the world model is clipped into a convex node
//! 2. ladder and teleport entities get nodes of their own
//! 3. the nodes are indexed in a [`SpatialOctree`]
//! 4. nodes sharing a face are linked and the collision leaf lookup is filled
//! 5. entity nodes are linked to the world nodes they touch
//! 6. every node gets a walkable anchor and every link a cost
//!
//! The generator keeps the octree and the clipped brush entity volumes so
//! later entity splits can reuse them.

use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec3;
use leafnav::{LeafNavMesh, LeafNode, NodeId, SpatialOctree};
use leafnav_common::{
    Aabb, CollisionMap, Error, Polygon3D, Result, CONTENTS_EMPTY, EPSILON,
};

use crate::clipper::Clipper;
use crate::context::{BuildContext, TimerCategory};
use crate::solid::SolidEntityNode;
use crate::{GeneratorConfig, MapEntity};

/// Height above a floor sample that floor traces start from
pub(crate) const TRACE_LIFT: f32 = 1.0;

/// Phases reported through [`BuildContext::set_progress`]
const GENERATE_PHASES: usize = 8;

/// Drops within this of each other count as equal when placing anchors
const DROP_TIE_EPSILON: f32 = 0.01;

/// Builds [`LeafNavMesh`]es from a collision map
#[derive(Debug)]
pub struct LeafNavMeshGenerator {
    pub(crate) config: GeneratorConfig,
    pub(crate) clipper: Clipper,
    pub(crate) octree: Option<SpatialOctree>,
    solid_cache: HashMap<usize, Arc<SolidEntityNode>>,
    presence: Vec<bool>,
}

impl LeafNavMeshGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            clipper: Clipper::new(),
            octree: None,
            solid_cache: HashMap::new(),
            presence: Vec::new(),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Spatial index of the last generated mesh
    pub fn octree(&self) -> Option<&SpatialOctree> {
        self.octree.as_ref()
    }

    /// Builds a complete mesh for the world model of `map`
    ///
    /// `entities[0]` is the world; the rest are scanned for ladders, teleports
    /// and brush entities.
    pub fn generate<M: CollisionMap + ?Sized>(
        &mut self,
        map: &M,
        entities: &[MapEntity],
        ctx: &mut BuildContext,
    ) -> Result<LeafNavMesh> {
        self.config.validate()?;
        self.octree = None;
        self.solid_cache.clear();

        ctx.start_timer(TimerCategory::Total);
        let result = self.generate_phases(map, entities, ctx);
        ctx.stop_timer(TimerCategory::Total);
        result
    }

    fn generate_phases<M: CollisionMap + ?Sized>(
        &mut self,
        map: &M,
        entities: &[MapEntity],
        ctx: &mut BuildContext,
    ) -> Result<LeafNavMesh> {
        let mut mesh = LeafNavMesh::new();

        ctx.set_progress(1, GENERATE_PHASES, "clipping hull leaves");
        ctx.start_timer(TimerCategory::HullLeaves);
        for node in self.get_hull_leaves(map, 0, CONTENTS_EMPTY) {
            mesh.add_node(node);
        }
        ctx.stop_timer(TimerCategory::HullLeaves);
        if mesh.is_empty() {
            ctx.log_error("world model has no open leaves");
            return Err(Error::Generation(
                "world model has no open leaves".to_string(),
            ));
        }
        ctx.add_count("hull_leaves", mesh.len());

        ctx.set_progress(2, GENERATE_PHASES, "creating entity nodes");
        if self.config.link_entities {
            ctx.start_timer(TimerCategory::EntityLinks);
            let created = self.create_entity_nodes(map, &mut mesh, entities);
            ctx.stop_timer(TimerCategory::EntityLinks);
            ctx.add_count("entity_nodes", created);
        }
        mesh.seal_world_leaves();

        ctx.set_progress(3, GENERATE_PHASES, "indexing nodes");
        ctx.start_timer(TimerCategory::Octree);
        self.build_octree(map, &mesh);
        ctx.stop_timer(TimerCategory::Octree);

        ctx.set_progress(4, GENERATE_PHASES, "linking faces");
        ctx.start_timer(TimerCategory::Linking);
        let linked = self.link_nav_leaves(map, &mut mesh);
        ctx.stop_timer(TimerCategory::Linking);
        ctx.add_count("face_links", linked);

        ctx.set_progress(5, GENERATE_PHASES, "linking entities");
        if self.config.link_entities {
            ctx.start_timer(TimerCategory::EntityLinks);
            let linked = self.link_entity_leaves(map, &mut mesh, entities);
            ctx.stop_timer(TimerCategory::EntityLinks);
            ctx.add_count("entity_links", linked);
        }

        ctx.set_progress(6, GENERATE_PHASES, "placing anchors");
        ctx.start_timer(TimerCategory::Origins);
        for id in 0..mesh.len() as NodeId {
            self.set_leaf_origin(map, &mut mesh, id);
        }
        ctx.stop_timer(TimerCategory::Origins);

        ctx.set_progress(7, GENERATE_PHASES, "classifying links");
        ctx.start_timer(TimerCategory::PathCosts);
        for id in 0..mesh.len() as NodeId {
            self.calc_node_costs(map, &mut mesh, id);
        }
        ctx.stop_timer(TimerCategory::PathCosts);

        ctx.set_progress(8, GENERATE_PHASES, "clipping brush entities");
        ctx.start_timer(TimerCategory::SolidEntities);
        for entity in entities.iter().skip(1) {
            if let Some(model) = self.splitting_model(entity) {
                self.solid_entity_node(map, model);
            }
        }
        ctx.stop_timer(TimerCategory::SolidEntities);
        ctx.clear_progress();

        let link_count: usize = mesh.nodes().iter().map(|n| n.links.len()).sum();
        ctx.log_info(format!(
            "generated {} nodes with {} links",
            mesh.len(),
            link_count
        ));
        Ok(mesh)
    }

    /// Clips every leaf of `model` with the given contents into an unlinked node
    pub fn get_hull_leaves<M: CollisionMap + ?Sized>(
        &self,
        map: &M,
        model: usize,
        contents: i32,
    ) -> Vec<LeafNode> {
        let leaves = map.leaf_clip_planes(model, self.config.hull, contents);
        let mut nodes = Vec::with_capacity(leaves.len());
        for leaf in leaves {
            let faces = self.clipper.clip(&leaf.planes).face_polygons();
            if faces.len() < 4 {
                log::debug!(
                    "leaf {} of model {} clips to {} faces, skipping",
                    leaf.leaf,
                    model,
                    faces.len()
                );
                continue;
            }
            let mut node = LeafNode::new(faces);
            node.bsp_leaf = Some(leaf.leaf);
            nodes.push(node);
        }
        nodes
    }

    /// Indexes the world and entity nodes of `mesh`
    pub(crate) fn build_octree<M: CollisionMap + ?Sized>(&mut self, map: &M, mesh: &LeafNavMesh) {
        let indexed = mesh.nodes().iter().take(mesh.world_leaf_count() as usize);
        let mut world = map.world_bounds();
        for node in indexed.clone() {
            world.expand(&node.bounds);
        }
        let items = indexed.map(|n| (n.id, n.bounds));
        let octree = SpatialOctree::build(&world, self.config.octree_depth, items);
        log::debug!(
            "octree: {} octants over {:?}",
            octree.octant_count(),
            octree.bounds()
        );
        self.octree = Some(octree);
    }

    /// Indexed nodes whose octants overlap `bounds`, ascending
    pub(crate) fn query_nodes(&mut self, bounds: &Aabb) -> Vec<NodeId> {
        let Some(octree) = &self.octree else {
            return Vec::new();
        };
        octree.query(bounds, &mut self.presence);
        self.presence
            .iter()
            .enumerate()
            .filter(|(_, present)| **present)
            .map(|(id, _)| id as NodeId)
            .collect()
    }

    /// Links world nodes that share a face and fills the collision leaf lookup
    ///
    /// Returns the number of node pairs linked.
    pub fn link_nav_leaves<M: CollisionMap + ?Sized>(
        &mut self,
        map: &M,
        mesh: &mut LeafNavMesh,
    ) -> usize {
        let count = mesh.world_leaf_count();
        let mut linked = 0;

        for id in 0..count {
            let node = &mesh.nodes()[id as usize];
            if node.is_entity() {
                continue;
            }
            let bounds = node.bounds.inflated(EPSILON);
            for other in self.query_nodes(&bounds) {
                if other <= id || other >= count || mesh.nodes()[other as usize].is_entity() {
                    continue;
                }
                if try_face_link_leaves(mesh, id, other) {
                    linked += 1;
                }
            }
        }

        for (bsp_leaf, centroid) in map.leaf_centroids() {
            let point_box = Aabb::new(centroid, centroid).inflated(EPSILON);
            for id in self.query_nodes(&point_box) {
                let node = &mesh.nodes()[id as usize];
                if !node.is_entity() && !node.is_split() && node.contains_point(centroid) {
                    mesh.add_leaf_mapping(bsp_leaf, id);
                }
            }
        }

        linked
    }

    /// Places the walkable anchor of a node
    ///
    /// The anchor sits on the lowest floor-like face, at the point with the
    /// shortest drop below it, preferring points near the node centre. Nodes
    /// without a floor face and entity nodes use their centre.
    pub fn set_leaf_origin<M: CollisionMap + ?Sized>(
        &self,
        map: &M,
        mesh: &mut LeafNavMesh,
        id: NodeId,
    ) {
        let Some(node) = mesh.node(id) else {
            return;
        };
        let steep = self.config.cost.steep_slope_normal_z;
        let floor = node
            .faces
            .iter()
            .filter(|f| f.plane_z.z < -steep)
            .min_by(|a, b| a.center.z.total_cmp(&b.center.z));

        let origin = match floor {
            Some(face) if !node.is_entity() => self.floor_anchor(map, node, face),
            _ => node.center,
        };
        if let Some(node) = mesh.node_mut(id) {
            node.origin = origin;
        }
    }

    fn floor_anchor<M: CollisionMap + ?Sized>(
        &self,
        map: &M,
        node: &LeafNode,
        floor: &Polygon3D,
    ) -> Vec3 {
        let below_center = map.trace(
            node.center,
            node.center - Vec3::Z * self.config.cost.max_trace_distance,
            self.config.hull,
        );
        let horizontal = |p: Vec3| (p - node.center).truncate().length();

        let mut best = floor.nearest_point(below_center.end_pos);
        let mut best_drop = self.drop_below(map, best);
        let mut best_dist = horizontal(best);

        let size = floor.local_maxs - floor.local_mins;
        let mut step = self.config.origin_grid_step;
        let (nx, ny) = loop {
            let nx = ((size.x / step).ceil() as usize).max(1);
            let ny = ((size.y / step).ceil() as usize).max(1);
            if nx * ny <= self.config.max_origin_samples {
                break (nx, ny);
            }
            step *= 2.0;
        };

        for ix in 0..nx {
            for iy in 0..ny {
                let local = floor.local_mins
                    + glam::Vec2::new(
                        (ix as f32 + 0.5) * size.x / nx as f32,
                        (iy as f32 + 0.5) * size.y / ny as f32,
                    );
                if !floor.is_inside_local(local, false) {
                    continue;
                }
                let point = floor.unproject(local);
                let drop = self.drop_below(map, point);
                let dist = horizontal(point);
                let better = drop < best_drop - DROP_TIE_EPSILON
                    || ((drop - best_drop).abs() <= DROP_TIE_EPSILON && dist < best_dist);
                if better {
                    best = point;
                    best_drop = drop;
                    best_dist = dist;
                }
            }
        }
        best
    }

    /// Height of the straight drop below a point, infinite without a floor
    fn drop_below<M: CollisionMap + ?Sized>(&self, map: &M, point: Vec3) -> f32 {
        let start = point + Vec3::Z * TRACE_LIFT;
        let trace = map.trace(
            start,
            start - Vec3::Z * self.config.cost.max_trace_distance,
            self.config.hull,
        );
        if trace.start_solid || !trace.hit() {
            return f32::INFINITY;
        }
        (start.z - trace.end_pos.z - TRACE_LIFT).max(0.0)
    }

    /// Brush model of an entity that splits leaves, if it has one
    pub(crate) fn splitting_model(&self, entity: &MapEntity) -> Option<usize> {
        if !self.config.splits_on(&entity.class) {
            return None;
        }
        entity.model.filter(|&model| model != 0)
    }

    /// Clipped solid of a brush model, built once and cached
    pub fn solid_entity_node<M: CollisionMap + ?Sized>(
        &mut self,
        map: &M,
        model: usize,
    ) -> Arc<SolidEntityNode> {
        if let Some(node) = self.solid_cache.get(&model) {
            return Arc::clone(node);
        }
        let node = Arc::new(SolidEntityNode::build(
            map,
            model,
            self.config.hull,
            &self.clipper,
        ));
        self.solid_cache.insert(model, Arc::clone(&node));
        node
    }

    /// World-space bounds of an entity: its brush model, else its point box
    pub(crate) fn entity_bounds<M: CollisionMap + ?Sized>(
        &mut self,
        map: &M,
        entity: &MapEntity,
    ) -> Option<Aabb> {
        if let Some(model) = entity.model.filter(|&m| m != 0) {
            let solid = self.solid_entity_node(map, model);
            if solid.bounds.is_valid() {
                return Some(solid.bounds.translated(entity.origin));
            }
        }
        entity.default_bbox.map(|b| b.translated(entity.origin))
    }
}

/// Links two nodes through the first pair of faces that overlap back to back
///
/// Returns `true` when a new link was made.
pub(crate) fn try_face_link_leaves(mesh: &mut LeafNavMesh, a: NodeId, b: NodeId) -> bool {
    let (Some(na), Some(nb)) = (mesh.node(a), mesh.node(b)) else {
        return false;
    };
    if !na.bounds.inflated(EPSILON).overlaps(&nb.bounds) {
        return false;
    }

    let mut contact = None;
    'search: for fa in &na.faces {
        for fb in &nb.faces {
            let area = fa.coplanar_intersect_area(fb);
            if area.len() < 3 {
                continue;
            }
            let poly = Polygon3D::with_normal(area, fa.plane_z);
            if poly.is_valid {
                contact = Some(poly);
                break 'search;
            }
        }
    }

    match contact {
        Some(poly) => mesh.link_nodes(a, b, poly),
        None => false,
    }
}

/// Checks if two convex volumes overlap or touch
pub(crate) fn volumes_touch(a: &LeafNode, b: &LeafNode) -> bool {
    if !a.bounds.inflated(EPSILON).overlaps(&b.bounds) {
        return false;
    }
    let verts = |n: &LeafNode| {
        n.faces
            .iter()
            .flat_map(|f| f.verts.iter().copied())
            .collect::<Vec<_>>()
    };
    if verts(a).into_iter().any(|v| b.contains_point(v))
        || verts(b).into_iter().any(|v| a.contains_point(v))
        || a.contains_point(b.center)
        || b.contains_point(a.center)
    {
        return true;
    }
    a.faces
        .iter()
        .any(|fa| b.faces.iter().any(|fb| fa.intersects(fb) || fb.intersects(fa)))
}

/// Centre of the overlap of two boxes
pub(crate) fn overlap_center(a: &Aabb, b: &Aabb) -> Vec3 {
    let mins = a.mins.max(b.mins);
    let maxs = a.maxs.min(b.maxs);
    (mins + maxs) * 0.5
}
