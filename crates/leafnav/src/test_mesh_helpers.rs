//! Helper functions for creating test navigation meshes

use crate::{LeafLink, LeafNavMesh, LeafNode, NodeId};
use glam::Vec3;
use leafnav_common::{Aabb, CollisionMap, Hull, LeafPlanes, Polygon3D, Trace};

/// Bounds of grid cell (x, y)
pub fn cell_bounds(x: usize, y: usize, cell: f32) -> Aabb {
    let mins = Vec3::new(x as f32 * cell, y as f32 * cell, 0.0);
    Aabb::new(mins, mins + Vec3::splat(cell))
}

/// Contact polygon between two box nodes sharing a face
pub fn shared_face(a: &LeafNode, b: &LeafNode) -> Option<Polygon3D> {
    a.faces.iter().find_map(|fa| {
        b.faces.iter().find_map(|fb| {
            let area = fa.coplanar_intersect_area(fb);
            (!area.is_empty()).then(|| Polygon3D::new(area))
        })
    })
}

/// Creates a `w` x `h` grid of box nodes linked to their 4 neighbours
///
/// Node `(x, y)` gets id `y * w + x` and records collision leaf `y * w + x`.
pub fn create_grid_mesh(w: usize, h: usize, cell: f32) -> LeafNavMesh {
    let mut mesh = LeafNavMesh::new();
    for y in 0..h {
        for x in 0..w {
            let mut node = LeafNode::from_bounds(&cell_bounds(x, y, cell));
            node.bsp_leaf = Some(y * w + x);
            let id = mesh.add_node(node);
            mesh.add_leaf_mapping(y * w + x, id);
        }
    }

    for y in 0..h {
        for x in 0..w {
            let id = (y * w + x) as NodeId;
            if x + 1 < w {
                link_shared(&mut mesh, id, id + 1);
            }
            if y + 1 < h {
                link_shared(&mut mesh, id, id + w as NodeId);
            }
        }
    }
    mesh.seal_world_leaves();
    mesh
}

/// Links two nodes through their shared face
pub fn link_shared(mesh: &mut LeafNavMesh, a: NodeId, b: NodeId) {
    let area = match (mesh.node(a), mesh.node(b)) {
        (Some(na), Some(nb)) => shared_face(na, nb),
        _ => None,
    };
    if let Some(area) = area {
        mesh.link_nodes(a, b, area);
    }
}

/// Grid with random link costs and randomly removed links
pub fn create_random_grid_mesh(
    rng: &mut fastrand::Rng,
    w: usize,
    h: usize,
    wall_chance: f32,
) -> LeafNavMesh {
    let mut mesh = create_grid_mesh(w, h, 32.0);
    let len = mesh.len() as NodeId;
    for id in 0..len {
        if let Some(node) = mesh.node_mut(id) {
            node.links.retain(|_| rng.f32() >= wall_chance);
            for link in &mut node.links {
                link.base_cost = (rng.f32() * 50.0).floor();
                link.cost_multiplier = 1.0 + (rng.f32() * 4.0).floor();
            }
        }
    }
    mesh
}

/// Adds a one-way link with an explicit cost
pub fn add_costed_link(mesh: &mut LeafNavMesh, from: NodeId, to: NodeId, base: f32, mult: f32) {
    let pos = mesh.node(to).map(|n| n.origin).unwrap_or_default();
    let mut link = LeafLink::with_point(to, pos);
    link.base_cost = base;
    link.cost_multiplier = mult;
    mesh.add_link(from, link);
}

/// Collision map whose point-hull leaves are the cells of a grid
pub struct GridMap {
    pub w: usize,
    pub h: usize,
    pub cell: f32,
}

impl CollisionMap for GridMap {
    fn world_bounds(&self) -> Aabb {
        Aabb::new(
            Vec3::ZERO,
            Vec3::new(self.w as f32 * self.cell, self.h as f32 * self.cell, self.cell),
        )
    }

    fn leaf_clip_planes(&self, _model: usize, _hull: Hull, _contents: i32) -> Vec<LeafPlanes> {
        Vec::new()
    }

    fn trace(&self, _start: Vec3, end: Vec3, _hull: Hull) -> Trace {
        Trace::clear(end)
    }

    fn point_leaf(&self, point: Vec3) -> Option<usize> {
        if !self.world_bounds().contains_point(point) {
            return None;
        }
        let x = ((point.x / self.cell) as usize).min(self.w - 1);
        let y = ((point.y / self.cell) as usize).min(self.h - 1);
        Some(y * self.w + x)
    }

    fn leaf_centroids(&self) -> Vec<(usize, Vec3)> {
        (0..self.h)
            .flat_map(|y| (0..self.w).map(move |x| (x, y)))
            .map(|(x, y)| (y * self.w + x, cell_bounds(x, y, self.cell).center()))
            .collect()
    }
}
