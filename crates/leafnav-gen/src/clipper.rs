//! Convex polyhedron construction by half-space clipping
//!
//! A [`ConvexMesh`] starts as a large cube and is clipped against one plane at
//! a time. Each clip keeps the part of the mesh on the positive side of the
//! plane, cuts crossing edges, closes every cut face with a new edge and caps
//! the hole with one new face. Work is done in double precision; faces are
//! handed out as `f32` [`Polygon3D`]s.

use glam::DVec3;
use leafnav_common::{ClipPlane, Polygon3D};

/// Half size of the starting cube
pub const CLIP_CUBE_SIZE: f64 = 65536.0;

/// Vertices closer than this to a clip plane count as on it
const CLIP_EPSILON: f64 = 1e-4;

#[derive(Debug, Clone)]
pub struct ClipVertex {
    pub pos: DVec3,
    /// Signed distance to the plane of the current clip
    pub dist: f64,
    pub visible: bool,
    occurs: u32,
}

#[derive(Debug, Clone)]
pub struct ClipEdge {
    pub verts: [usize; 2],
    pub faces: [usize; 2],
    pub visible: bool,
}

#[derive(Debug, Clone)]
pub struct ClipFace {
    pub edges: Vec<usize>,
    /// Outward normal
    pub normal: DVec3,
    pub visible: bool,
}

/// Outcome of clipping a mesh against one plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipResult {
    /// Every vertex was on the kept side; nothing changed
    Unchanged,
    /// Nothing was on the kept side; the mesh is now empty
    Removed,
    /// The plane cut through the mesh
    Clipped,
}

/// Closed convex polyhedron as vertex/edge/face lists
#[derive(Debug, Clone, Default)]
pub struct ConvexMesh {
    pub verts: Vec<ClipVertex>,
    pub edges: Vec<ClipEdge>,
    pub faces: Vec<ClipFace>,
}

impl ConvexMesh {
    /// Axis-aligned cube spanning `[-size, size]` on every axis
    pub fn cube(size: f64) -> Self {
        let mut verts = Vec::with_capacity(8);
        for i in 0..8 {
            let sign = |bit: usize| if i & bit != 0 { size } else { -size };
            verts.push(ClipVertex {
                pos: DVec3::new(sign(1), sign(2), sign(4)),
                dist: 0.0,
                visible: true,
                occurs: 0,
            });
        }

        // Faces: -x, +x, -y, +y, -z, +z
        let normals = [
            DVec3::NEG_X,
            DVec3::X,
            DVec3::NEG_Y,
            DVec3::Y,
            DVec3::NEG_Z,
            DVec3::Z,
        ];
        let edge_list: [([usize; 2], [usize; 2]); 12] = [
            // along x
            ([0, 1], [2, 4]),
            ([2, 3], [3, 4]),
            ([4, 5], [2, 5]),
            ([6, 7], [3, 5]),
            // along y
            ([0, 2], [0, 4]),
            ([1, 3], [1, 4]),
            ([4, 6], [0, 5]),
            ([5, 7], [1, 5]),
            // along z
            ([0, 4], [0, 2]),
            ([1, 5], [1, 2]),
            ([2, 6], [0, 3]),
            ([3, 7], [1, 3]),
        ];

        let edges: Vec<ClipEdge> = edge_list
            .iter()
            .map(|(v, f)| ClipEdge {
                verts: *v,
                faces: *f,
                visible: true,
            })
            .collect();

        let faces = normals
            .iter()
            .enumerate()
            .map(|(fi, normal)| ClipFace {
                edges: edges
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.faces.contains(&fi))
                    .map(|(ei, _)| ei)
                    .collect(),
                normal: *normal,
                visible: true,
            })
            .collect();

        Self {
            verts,
            edges,
            faces,
        }
    }

    /// Checks if clipping removed everything
    pub fn is_empty(&self) -> bool {
        !self.faces.iter().any(|f| f.visible)
    }

    /// Number of visible faces
    pub fn face_count(&self) -> usize {
        self.faces.iter().filter(|f| f.visible).count()
    }

    /// Clips against one half-space, keeping `normal · p >= dist`
    pub fn clip(&mut self, normal: DVec3, dist: f64) -> ClipResult {
        let mut positive = 0;
        let mut negative = 0;
        for v in self.verts.iter_mut().filter(|v| v.visible) {
            v.dist = normal.dot(v.pos) - dist;
            if v.dist >= CLIP_EPSILON {
                positive += 1;
            } else if v.dist <= -CLIP_EPSILON {
                negative += 1;
                v.visible = false;
            } else {
                v.dist = 0.0;
            }
        }

        if negative == 0 {
            return ClipResult::Unchanged;
        }
        if positive == 0 {
            self.clear();
            return ClipResult::Removed;
        }

        self.clip_edges();
        self.close_faces(-normal);
        ClipResult::Clipped
    }

    /// Drops edges on the removed side and cuts the ones crossing the plane
    fn clip_edges(&mut self) {
        for ei in 0..self.edges.len() {
            if !self.edges[ei].visible {
                continue;
            }
            let [v0, v1] = self.edges[ei].verts;
            let d0 = self.verts[v0].dist;
            let d1 = self.verts[v1].dist;

            if d0 <= 0.0 && d1 <= 0.0 {
                for fi in self.edges[ei].faces {
                    let face = &mut self.faces[fi];
                    face.edges.retain(|e| *e != ei);
                    if face.edges.is_empty() {
                        face.visible = false;
                    }
                }
                self.edges[ei].visible = false;
                continue;
            }

            if d0 >= 0.0 && d1 >= 0.0 {
                continue;
            }

            // Crossing edge: replace the removed endpoint with the intersection
            let t = d0 / (d0 - d1);
            let pos = self.verts[v0].pos + (self.verts[v1].pos - self.verts[v0].pos) * t;
            let new_vert = self.verts.len();
            self.verts.push(ClipVertex {
                pos,
                dist: 0.0,
                visible: true,
                occurs: 0,
            });
            if d0 > 0.0 {
                self.edges[ei].verts[1] = new_vert;
            } else {
                self.edges[ei].verts[0] = new_vert;
            }
        }
    }

    /// Closes every opened face and caps the cut with a new face
    fn close_faces(&mut self, cap_normal: DVec3) {
        let cap = self.faces.len();
        self.faces.push(ClipFace {
            edges: Vec::new(),
            normal: cap_normal,
            visible: true,
        });

        for fi in 0..cap {
            if !self.faces[fi].visible {
                continue;
            }
            let Some((start, end)) = self.open_polyline(fi) else {
                continue;
            };

            let edge = self.edges.len();
            self.edges.push(ClipEdge {
                verts: [start, end],
                faces: [fi, cap],
                visible: true,
            });
            self.faces[fi].edges.push(edge);
            self.faces[cap].edges.push(edge);
        }

        if self.faces[cap].edges.len() < 3 {
            log::debug!(
                "clip cap has only {} edges, dropping it",
                self.faces[cap].edges.len()
            );
            self.faces[cap].visible = false;
        }
    }

    /// End points of a face's edge chain when it is not closed
    fn open_polyline(&mut self, fi: usize) -> Option<(usize, usize)> {
        for &ei in &self.faces[fi].edges {
            let [a, b] = self.edges[ei].verts;
            self.verts[a].occurs = 0;
            self.verts[b].occurs = 0;
        }
        for &ei in &self.faces[fi].edges {
            let [a, b] = self.edges[ei].verts;
            self.verts[a].occurs += 1;
            self.verts[b].occurs += 1;
        }

        let mut ends = self.faces[fi].edges.iter().flat_map(|&ei| self.edges[ei].verts);
        let start = ends.find(|&v| self.verts[v].occurs == 1)?;
        let end = ends.find(|&v| self.verts[v].occurs == 1 && v != start)?;
        Some((start, end))
    }

    fn clear(&mut self) {
        self.verts.clear();
        self.edges.clear();
        self.faces.clear();
    }

    /// Vertex loop of a visible face, in edge-walk order
    fn face_loop(&self, fi: usize) -> Option<Vec<DVec3>> {
        let face = &self.faces[fi];
        let first = *face.edges.first()?;
        let [start, mut current] = self.edges[first].verts;

        let mut loop_verts = vec![self.verts[start].pos];
        let mut used = vec![false; face.edges.len()];
        used[0] = true;

        while current != start {
            loop_verts.push(self.verts[current].pos);
            let next = face.edges.iter().enumerate().find_map(|(i, &ei)| {
                if used[i] {
                    return None;
                }
                let [a, b] = self.edges[ei].verts;
                if a == current {
                    Some((i, b))
                } else if b == current {
                    Some((i, a))
                } else {
                    None
                }
            });
            let (i, v) = next?;
            used[i] = true;
            current = v;
        }

        Some(loop_verts)
    }

    /// Every visible face as a polygon wound around its outward normal
    ///
    /// Faces that do not form a closed loop or collapse to fewer than 3
    /// distinct vertices are skipped.
    pub fn face_polygons(&self) -> Vec<Polygon3D> {
        let mut polys = Vec::with_capacity(self.faces.len());
        for (fi, face) in self.faces.iter().enumerate() {
            if !face.visible {
                continue;
            }
            let Some(verts) = self.face_loop(fi) else {
                log::debug!("clip face {} is not a closed loop", fi);
                continue;
            };
            let verts = verts.iter().map(|v| v.as_vec3()).collect();
            let poly = Polygon3D::cleaned(verts, face.normal.as_vec3());
            if !poly.is_valid || poly.verts.len() < 3 {
                continue;
            }
            polys.push(poly);
        }
        polys
    }

    /// Checks if a point is inside every visible face plane
    pub fn contains_point(&self, p: DVec3, tolerance: f64) -> bool {
        if self.is_empty() {
            return false;
        }
        self.faces
            .iter()
            .filter(|f| f.visible)
            .all(|face| match face.edges.first() {
                Some(&ei) => {
                    let on_face = self.verts[self.edges[ei].verts[0]].pos;
                    face.normal.dot(p - on_face) <= tolerance
                }
                None => true,
            })
    }
}

/// Builds convex meshes from ordered half-space lists
#[derive(Debug, Clone, Copy)]
pub struct Clipper {
    cube_size: f64,
}

impl Default for Clipper {
    fn default() -> Self {
        Self::new()
    }
}

impl Clipper {
    pub fn new() -> Self {
        Self {
            cube_size: CLIP_CUBE_SIZE,
        }
    }

    /// Clipper starting from a cube of half size `cube_size`
    pub fn with_cube_size(cube_size: f64) -> Self {
        Self { cube_size }
    }

    /// Intersection of the starting cube with every plane
    ///
    /// Returns an empty mesh as soon as one plane removes everything.
    pub fn clip(&self, planes: &[ClipPlane]) -> ConvexMesh {
        let mut mesh = ConvexMesh::cube(self.cube_size);
        for plane in planes {
            let result = mesh.clip(plane.normal.as_dvec3(), plane.dist as f64);
            if result == ClipResult::Removed {
                return mesh;
            }
        }
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use leafnav_common::Aabb;

    #[test]
    fn test_cube_faces() {
        let mesh = ConvexMesh::cube(10.0);
        let faces = mesh.face_polygons();
        assert_eq!(faces.len(), 6);
        for face in &faces {
            assert_eq!(face.verts.len(), 4);
            assert!((face.area - 400.0).abs() < 1e-2);
            assert!(face.dist_to_plane(Vec3::ZERO) < 0.0);
        }
    }

    #[test]
    fn test_clip_to_box() {
        let bounds = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 2.0, 3.0));
        let mesh = Clipper::new().clip(&ClipPlane::box_planes(&bounds));
        assert_eq!(mesh.face_count(), 6);

        let faces = mesh.face_polygons();
        assert_eq!(faces.len(), 6);
        let total: f32 = faces.iter().map(|f| f.area).sum();
        assert!((total - 2.0 * (2.0 + 6.0 + 3.0)).abs() < 1e-3);

        let mut hull = Aabb::empty();
        for face in &faces {
            hull.expand(&face.bounds());
        }
        assert!((hull.mins - bounds.mins).length() < 1e-4);
        assert!((hull.maxs - bounds.maxs).length() < 1e-4);
    }

    #[test]
    fn test_clip_results() {
        let mut mesh = ConvexMesh::cube(1.0);
        assert_eq!(mesh.clip(DVec3::X, -5.0), ClipResult::Unchanged);
        assert_eq!(mesh.clip(DVec3::X, 0.0), ClipResult::Clipped);
        assert_eq!(mesh.face_count(), 6);
        assert_eq!(mesh.clip(DVec3::NEG_X, 2.0), ClipResult::Removed);
        assert!(mesh.is_empty());
        assert!(mesh.face_polygons().is_empty());
    }

    #[test]
    fn test_disjoint_planes_give_empty_mesh() {
        let planes = [
            ClipPlane::new(Vec3::Z, 10.0),
            ClipPlane::new(Vec3::NEG_Z, 0.0),
        ];
        assert!(Clipper::new().clip(&planes).is_empty());
    }

    #[test]
    fn test_diagonal_cut_makes_triangular_cap() {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::splat(4.0));
        let mut planes = ClipPlane::box_planes(&bounds);
        // Cut off the (4,4,4) corner
        planes.push(ClipPlane::new(Vec3::new(-1.0, -1.0, -1.0), -10.0));

        let mesh = Clipper::new().clip(&planes);
        let faces = mesh.face_polygons();
        assert_eq!(faces.len(), 7);
        assert!(faces.iter().any(|f| f.verts.len() == 3));
        assert_eq!(faces.iter().filter(|f| f.verts.len() == 5).count(), 3);
    }

    #[test]
    fn test_clip_matches_half_space_intersection() {
        let mut rng = fastrand::Rng::with_seed(1234);
        let clipper = Clipper::new();

        for _ in 0..20 {
            let mut planes =
                ClipPlane::box_planes(&Aabb::new(Vec3::splat(-100.0), Vec3::splat(100.0)));
            for _ in 0..6 {
                let normal = Vec3::new(
                    rng.f32() * 2.0 - 1.0,
                    rng.f32() * 2.0 - 1.0,
                    rng.f32() * 2.0 - 1.0,
                );
                if normal.length() < 0.1 {
                    continue;
                }
                // Planes pass near the origin so the region is rarely empty
                planes.push(ClipPlane::new(normal, -(rng.f32() * 40.0)));
            }

            let mesh = clipper.clip(&planes);
            for _ in 0..500 {
                let p = Vec3::new(
                    rng.f32() * 240.0 - 120.0,
                    rng.f32() * 240.0 - 120.0,
                    rng.f32() * 240.0 - 120.0,
                );
                // Skip samples too close to a plane to classify reliably
                if planes.iter().any(|pl| pl.distance(p).abs() < 1e-2) {
                    continue;
                }
                let expected = planes.iter().all(|pl| pl.distance(p) >= 0.0);
                assert_eq!(
                    mesh.contains_point(p.as_dvec3(), 1e-6),
                    expected,
                    "point {:?} misclassified",
                    p
                );
            }
        }
    }
}
