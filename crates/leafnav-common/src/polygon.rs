//! Planar convex polygons in 3D space
//!
//! A [`Polygon3D`] keeps its world-space vertex loop together with an orthonormal
//! basis for its plane, so that containment, splitting, merging and coplanar
//! intersection can all be done in the polygon's local 2D space.

use crate::{
    convex_hull_2d, orient_2d, polygon_area_2d, same_vert, Aabb, ClipPlane, Line2D, Vec2, Vec3,
    COLINEAR_CUT_EPSILON, COLINEAR_EPSILON, EPSILON, INPOLY_EPSILON, MIN_LINE_OVERLAP,
};
use glam::Mat3;

/// Normal dot product above which two planes count as parallel
const COPLANAR_NORMAL_DOT: f32 = 0.99;

/// Maximum plane distance difference for two polygons to merge
const MERGE_PLANE_DIST: f32 = 1.0;

/// A planar, convex vertex loop with its local plane basis
#[derive(Debug, Clone, Default)]
pub struct Polygon3D {
    /// World-space vertices, wound counter-clockwise around `plane_z`
    pub verts: Vec<Vec3>,
    /// Vertices projected into the plane basis
    pub local_verts: Vec<Vec2>,
    pub plane_x: Vec3,
    pub plane_y: Vec3,
    /// Plane normal
    pub plane_z: Vec3,
    /// Distance of the plane from the origin along `plane_z`
    pub plane_dist: f32,
    pub world_mins: Vec3,
    pub world_maxs: Vec3,
    pub local_mins: Vec2,
    pub local_maxs: Vec2,
    /// Area-weighted centroid in world space
    pub center: Vec3,
    /// Signed area in the local basis (positive for a valid polygon)
    pub area: f32,
    pub is_valid: bool,
}

impl Polygon3D {
    /// Builds a polygon from a vertex loop, deriving the normal from the winding
    pub fn new(verts: Vec<Vec3>) -> Self {
        let verts = dedup_loop(verts);
        let mut poly = Polygon3D {
            verts,
            ..Default::default()
        };

        if poly.verts.len() < 3 {
            return poly;
        }

        // Newell's method gives an area-weighted normal that follows the winding
        let mut normal = Vec3::ZERO;
        let n = poly.verts.len();
        for i in 0..n {
            let a = poly.verts[i];
            let b = poly.verts[(i + 1) % n];
            normal.x += (a.y - b.y) * (a.z + b.z);
            normal.y += (a.z - b.z) * (a.x + b.x);
            normal.z += (a.x - b.x) * (a.y + b.y);
        }
        if normal.length_squared() < f32::EPSILON {
            return poly;
        }
        let plane_z = normal.normalize();

        let Some(edge) = poly
            .verts
            .iter()
            .skip(1)
            .map(|v| *v - poly.verts[0])
            .find(|e| e.length_squared() > f32::EPSILON)
        else {
            return poly;
        };
        let plane_x = (edge - plane_z * edge.dot(plane_z)).normalize_or_zero();
        let plane_y = plane_z.cross(plane_x);

        let basis = Mat3::from_cols(plane_x, plane_y, plane_z);
        let det = basis.determinant();
        if !det.is_finite() || det.abs() < 0.5 {
            log::debug!("polygon basis not invertible (det {})", det);
            return poly;
        }

        poly.plane_x = plane_x;
        poly.plane_y = plane_y;
        poly.plane_z = plane_z;
        poly.plane_dist = plane_z.dot(poly.verts[0]);
        poly.local_verts = poly.verts.iter().map(|v| poly.project(*v)).collect();
        poly.area = polygon_area_2d(&poly.local_verts);

        let bounds = Aabb::from_points(poly.verts.iter());
        poly.world_mins = bounds.mins;
        poly.world_maxs = bounds.maxs;

        poly.local_mins = Vec2::splat(f32::MAX);
        poly.local_maxs = Vec2::splat(f32::MIN);
        for v in &poly.local_verts {
            poly.local_mins = poly.local_mins.min(*v);
            poly.local_maxs = poly.local_maxs.max(*v);
        }

        poly.center = poly.unproject(local_centroid(&poly.local_verts, poly.area));
        poly.is_valid = poly.area > f32::EPSILON;
        poly
    }

    /// Builds a polygon whose normal is oriented to agree with `normal`
    pub fn with_normal(verts: Vec<Vec3>, normal: Vec3) -> Self {
        let poly = Self::new(verts);
        if poly.is_valid && poly.plane_z.dot(normal) < 0.0 {
            return poly.reversed();
        }
        poly
    }

    /// Builds the polygon from an already-oriented vertex loop and drops colinear points
    pub fn cleaned(verts: Vec<Vec3>, normal: Vec3) -> Self {
        Self::with_normal(remove_colinear_verts(verts), normal)
    }

    /// The same polygon wound the other way (normal flipped)
    pub fn reversed(&self) -> Self {
        let mut verts = self.verts.clone();
        verts.reverse();
        Self::new(verts)
    }

    /// The same polygon moved by `offset`
    pub fn translated(&self, offset: Vec3) -> Self {
        Self::new(self.verts.iter().map(|v| *v + offset).collect())
    }

    /// The 6 outward-facing faces of an axis-aligned box
    pub fn box_faces(bounds: &Aabb) -> Vec<Polygon3D> {
        let c = bounds.corners();
        let loops: [([usize; 4], Vec3); 6] = [
            ([0, 4, 6, 2], Vec3::NEG_X),
            ([1, 3, 7, 5], Vec3::X),
            ([0, 1, 5, 4], Vec3::NEG_Y),
            ([2, 6, 7, 3], Vec3::Y),
            ([0, 2, 3, 1], Vec3::NEG_Z),
            ([4, 5, 7, 6], Vec3::Z),
        ];
        loops
            .iter()
            .map(|(idx, normal)| {
                Polygon3D::with_normal(idx.iter().map(|&i| c[i]).collect(), *normal)
            })
            .collect()
    }

    /// Half-space whose boundary is this polygon's plane, keeping the side behind the normal
    pub fn back_plane(&self) -> ClipPlane {
        ClipPlane {
            normal: -self.plane_z,
            dist: -self.plane_dist,
        }
    }

    /// World bounds of the polygon
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.world_mins, self.world_maxs)
    }

    /// Projects a world point into the local plane basis
    #[inline]
    pub fn project(&self, p: Vec3) -> Vec2 {
        Vec2::new(p.dot(self.plane_x), p.dot(self.plane_y))
    }

    /// Converts a local point back onto the polygon plane in world space
    #[inline]
    pub fn unproject(&self, p: Vec2) -> Vec3 {
        self.plane_x * p.x + self.plane_y * p.y + self.plane_z * self.plane_dist
    }

    /// Signed distance of a world point to the polygon plane
    #[inline]
    pub fn dist_to_plane(&self, p: Vec3) -> f32 {
        self.plane_z.dot(p) - self.plane_dist
    }

    /// Checks if a local-space point is inside the polygon
    ///
    /// Points within [`INPOLY_EPSILON`] of an edge are outside unless `include_edge` is set.
    pub fn is_inside_local(&self, p: Vec2, include_edge: bool) -> bool {
        point_in_polygon_2d(p, &self.local_verts, include_edge)
    }

    /// Checks if a world point lies on the polygon plane and inside its boundary
    pub fn is_inside(&self, p: Vec3, include_edge: bool) -> bool {
        if !self.is_valid || self.dist_to_plane(p).abs() > EPSILON {
            return false;
        }
        self.is_inside_local(self.project(p), include_edge)
    }

    /// Checks if every corner turns the same way
    pub fn is_convex(&self) -> bool {
        let n = self.local_verts.len();
        if n < 3 {
            return false;
        }
        (0..n).all(|i| {
            let a = self.local_verts[(i + n - 1) % n];
            let b = self.local_verts[i];
            let c = self.local_verts[(i + 1) % n];
            orient_2d(a, b, c) > -1e-3
        })
    }

    /// The point of the polygon closest to a world point
    pub fn nearest_point(&self, p: Vec3) -> Vec3 {
        let local = self.project(p);
        if self.is_inside_local(local, true) {
            return self.unproject(local);
        }

        let n = self.local_verts.len();
        let mut best = self.center;
        let mut best_dist = f32::MAX;
        for i in 0..n {
            let edge = Line2D::new(self.local_verts[i], self.local_verts[(i + 1) % n]);
            let closest = edge.closest_point(local);
            let dist = closest.distance_squared(local);
            if dist < best_dist {
                best_dist = dist;
                best = self.unproject(closest);
            }
        }
        best
    }

    /// Splits this polygon along an edge of `cut` that lies in this polygon's plane
    ///
    /// Returns the two pieces, or an empty list when no coplanar edge of `cut`
    /// crosses the polygon. A cut line lying on one of this polygon's own edges
    /// never splits, so repeated cutting cannot re-cut along edges it created.
    pub fn split(&self, cut: &Polygon3D) -> Vec<Polygon3D> {
        if !self.is_valid || !cut.is_valid {
            return Vec::new();
        }

        let n = self.verts.len();
        let m = cut.verts.len();
        for e in 0..m {
            let a = cut.verts[e];
            let b = cut.verts[(e + 1) % m];
            if self.dist_to_plane(a).abs() > EPSILON || self.dist_to_plane(b).abs() > EPSILON {
                continue;
            }

            let line = Line2D::new(self.project(a), self.project(b));
            if line.is_degenerate() {
                continue;
            }

            let on_existing_edge = (0..n).any(|i| {
                let edge = Line2D::new(self.local_verts[i], self.local_verts[(i + 1) % n]);
                line.is_colinear_with(&edge, COLINEAR_CUT_EPSILON)
            });
            if on_existing_edge {
                continue;
            }

            if let Some(pieces) = self.split_by_line(&line) {
                return pieces;
            }
        }

        Vec::new()
    }

    /// Divides the polygon by an infinite local line into left and right pieces
    fn split_by_line(&self, line: &Line2D) -> Option<Vec<Polygon3D>> {
        let dists: Vec<f32> = self.local_verts.iter().map(|p| line.distance(*p)).collect();
        let sides: Vec<i32> = dists
            .iter()
            .map(|d| {
                if *d > EPSILON {
                    1
                } else if *d < -EPSILON {
                    -1
                } else {
                    0
                }
            })
            .collect();

        if !sides.contains(&1) || !sides.contains(&-1) {
            return None;
        }

        let n = self.verts.len();
        let mut front = Vec::with_capacity(n + 2);
        let mut back = Vec::with_capacity(n + 2);
        for i in 0..n {
            let j = (i + 1) % n;
            if sides[i] >= 0 {
                front.push(self.verts[i]);
            }
            if sides[i] <= 0 {
                back.push(self.verts[i]);
            }
            if sides[i] * sides[j] < 0 {
                let t = dists[i] / (dists[i] - dists[j]);
                let p = self.verts[i].lerp(self.verts[j], t);
                front.push(p);
                back.push(p);
            }
        }

        if front.len() < 3 || back.len() < 3 {
            return None;
        }

        let front = Polygon3D::with_normal(front, self.plane_z);
        let back = Polygon3D::with_normal(back, self.plane_z);
        if !front.is_valid || !back.is_valid {
            return None;
        }
        Some(vec![front, back])
    }

    /// Merges two coplanar polygons sharing exactly one edge into one convex polygon
    pub fn merge(&self, other: &Polygon3D) -> Option<Polygon3D> {
        if !self.is_valid || !other.is_valid {
            return None;
        }
        if self.plane_z.dot(other.plane_z) < COPLANAR_NORMAL_DOT
            || (self.plane_dist - other.plane_dist).abs() >= MERGE_PLANE_DIST
        {
            return None;
        }

        let n = self.verts.len();
        let m = other.verts.len();

        // Count shared edges in both winding directions
        let mut shared = None;
        let mut shared_count = 0;
        for i in 0..n {
            let a = self.verts[i];
            let b = self.verts[(i + 1) % n];
            for j in 0..m {
                let c = other.verts[j];
                let d = other.verts[(j + 1) % m];
                if same_vert(a, d) && same_vert(b, c) {
                    shared_count += 1;
                    shared = Some((i, false));
                } else if same_vert(a, c) && same_vert(b, d) {
                    shared_count += 1;
                    shared = Some((i, true));
                }
            }
        }

        if shared_count != 1 {
            return None;
        }
        let (i, same_direction) = shared?;

        let mut other_loop = other.verts.clone();
        if same_direction {
            other_loop.reverse();
        }

        let a = self.verts[i];
        let b = self.verts[(i + 1) % n];
        let j = (0..m).find(|&j| {
            same_vert(other_loop[j], b) && same_vert(other_loop[(j + 1) % m], a)
        })?;

        // Walk self from b around to a, then the rest of other after a
        let mut merged = Vec::with_capacity(n + m - 2);
        for k in 0..n {
            merged.push(self.verts[(i + 1 + k) % n]);
        }
        for k in 0..m - 2 {
            merged.push(other_loop[(j + 2 + k) % m]);
        }

        let poly = Polygon3D::cleaned(merged, self.plane_z);
        if !poly.is_valid || !poly.is_convex() {
            return None;
        }
        Some(poly)
    }

    /// The region where two coplanar, opposite-facing polygons touch
    ///
    /// Returns the world-space vertex loop of the contact region, wound around
    /// this polygon's normal, or an empty list when the polygons do not touch
    /// over a non-zero area.
    pub fn coplanar_intersect_area(&self, other: &Polygon3D) -> Vec<Vec3> {
        if !self.is_valid || !other.is_valid {
            return Vec::new();
        }
        if self.plane_z.dot(other.plane_z) > -COPLANAR_NORMAL_DOT
            || (self.plane_dist + other.plane_dist).abs() > EPSILON
        {
            return Vec::new();
        }
        if !self.bounds().inflated(EPSILON).overlaps(&other.bounds()) {
            return Vec::new();
        }

        let other_local: Vec<Vec2> = other.verts.iter().map(|v| self.project(*v)).collect();
        let mut points = Vec::new();

        for p in &self.local_verts {
            if point_in_polygon_2d(*p, &other_local, false) {
                points.push(*p);
            }
        }
        for p in &other_local {
            if self.is_inside_local(*p, false) {
                points.push(*p);
            }
        }

        let n = self.local_verts.len();
        let m = other_local.len();
        for i in 0..n {
            let e1 = Line2D::new(self.local_verts[i], self.local_verts[(i + 1) % n]);
            for j in 0..m {
                let e2 = Line2D::new(other_local[j], other_local[(j + 1) % m]);
                if let Some(p) = e1.intersect(&e2) {
                    points.push(p);
                }
            }
        }

        let hull = convex_hull_2d(&points);
        if hull.len() < 3 || polygon_area_2d(&hull).abs() < EPSILON {
            return Vec::new();
        }

        hull.into_iter().map(|p| self.unproject(p)).collect()
    }

    /// The line where this polygon's plane meets `other`'s plane
    ///
    /// Returns a point on the line and its unit direction, or `None` for parallel planes.
    pub fn plane_intersection_line(&self, other: &Polygon3D) -> Option<(Vec3, Vec3)> {
        let n1 = self.plane_z;
        let n2 = other.plane_z;
        let dir = n1.cross(n2);
        if dir.length_squared() < 1e-6 {
            return None;
        }

        let n1n2 = n1.dot(n2);
        let det = 1.0 - n1n2 * n1n2;
        let c1 = (self.plane_dist - other.plane_dist * n1n2) / det;
        let c2 = (other.plane_dist - self.plane_dist * n1n2) / det;
        Some((n1 * c1 + n2 * c2, dir.normalize()))
    }

    /// Parameter range along a line (in this polygon's plane) covered by the polygon
    fn line_interval(&self, origin: Vec3, dir: Vec3, plane: &Polygon3D) -> Option<(f32, f32)> {
        let n = self.verts.len();
        let mut range: Option<(f32, f32)> = None;
        let mut add = |p: Vec3| {
            let t = (p - origin).dot(dir);
            range = Some(match range {
                Some((lo, hi)) => (lo.min(t), hi.max(t)),
                None => (t, t),
            });
        };

        for i in 0..n {
            let a = self.verts[i];
            let b = self.verts[(i + 1) % n];
            let da = plane.dist_to_plane(a);
            let db = plane.dist_to_plane(b);
            if da.abs() <= EPSILON {
                add(a);
            }
            if (da > EPSILON && db < -EPSILON) || (da < -EPSILON && db > EPSILON) {
                add(a.lerp(b, da / (da - db)));
            }
        }
        range
    }

    /// Checks if `other` cuts through this polygon
    ///
    /// Both polygons are projected onto the line shared by their planes and must
    /// overlap there. A cutter that only touches this polygon's plane with one of
    /// its own edges counts only when that edge lies strictly inside this polygon.
    pub fn intersects(&self, other: &Polygon3D) -> bool {
        if !self.is_valid || !other.is_valid {
            return false;
        }
        if !self.bounds().inflated(EPSILON).overlaps(&other.bounds()) {
            return false;
        }

        let Some((origin, dir)) = self.plane_intersection_line(other) else {
            return false;
        };
        let Some((lo1, hi1)) = self.line_interval(origin, dir, other) else {
            return false;
        };
        let Some((lo2, hi2)) = other.line_interval(origin, dir, self) else {
            return false;
        };

        if hi1.min(hi2) - lo1.max(lo2) < MIN_LINE_OVERLAP {
            return false;
        }

        let dists: Vec<f32> = other.verts.iter().map(|v| self.dist_to_plane(*v)).collect();
        let crosses =
            dists.iter().any(|d| *d > EPSILON) && dists.iter().any(|d| *d < -EPSILON);
        if crosses {
            return true;
        }

        // Grazing contact: the touching vertices must all be interior
        other
            .verts
            .iter()
            .zip(&dists)
            .filter(|(_, d)| d.abs() <= EPSILON)
            .all(|(v, _)| self.is_inside(*v, false))
    }
}

/// Checks if a 2D point is inside a polygon using the winding number algorithm
///
/// Points within [`INPOLY_EPSILON`] of an edge return `include_edge`. Works for
/// either winding direction.
pub fn point_in_polygon_2d(p: Vec2, verts: &[Vec2], include_edge: bool) -> bool {
    let n = verts.len();
    if n < 3 {
        return false;
    }

    for i in 0..n {
        let edge = Line2D::new(verts[i], verts[(i + 1) % n]);
        if edge.distance_to_segment(p) < INPOLY_EPSILON {
            return include_edge;
        }
    }

    let mut winding = 0;
    for i in 0..n {
        let v1 = verts[i];
        let v2 = verts[(i + 1) % n];
        if v1.y <= p.y {
            if v2.y > p.y && orient_2d(v1, v2, p) > 0.0 {
                winding += 1;
            }
        } else if v2.y <= p.y && orient_2d(v1, v2, p) < 0.0 {
            winding -= 1;
        }
    }

    winding != 0
}

/// Drops repeated vertices, including a closing vertex equal to the first
fn dedup_loop(verts: Vec<Vec3>) -> Vec<Vec3> {
    let mut out: Vec<Vec3> = Vec::with_capacity(verts.len());
    for v in verts {
        if out.last().map_or(true, |last| !same_vert(*last, v)) {
            out.push(v);
        }
    }
    while out.len() > 1 && same_vert(out[0], out[out.len() - 1]) {
        out.pop();
    }
    out
}

/// Removes duplicate and colinear vertices from a loop
pub fn remove_colinear_verts(verts: Vec<Vec3>) -> Vec<Vec3> {
    let mut verts = dedup_loop(verts);
    let mut changed = true;
    while changed && verts.len() > 3 {
        changed = false;
        let n = verts.len();
        for i in 0..n {
            let prev = verts[(i + n - 1) % n];
            let cur = verts[i];
            let next = verts[(i + 1) % n];
            let closest = crate::closest_point_on_segment(cur, prev, next);
            if closest.distance(cur) < COLINEAR_EPSILON {
                verts.remove(i);
                changed = true;
                break;
            }
        }
    }
    verts
}

/// Area-weighted centroid of a local polygon, falling back to the vertex average
fn local_centroid(verts: &[Vec2], area: f32) -> Vec2 {
    let n = verts.len();
    if area.abs() > f32::EPSILON {
        let mut c = Vec2::ZERO;
        for i in 0..n {
            let a = verts[i];
            let b = verts[(i + 1) % n];
            let cross = a.x * b.y - b.x * a.y;
            c += (a + b) * cross;
        }
        return c / (6.0 * area);
    }
    verts.iter().copied().sum::<Vec2>() / n.max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f32, y0: f32, x1: f32, y1: f32, z: f32) -> Polygon3D {
        Polygon3D::new(vec![
            Vec3::new(x0, y0, z),
            Vec3::new(x1, y0, z),
            Vec3::new(x1, y1, z),
            Vec3::new(x0, y1, z),
        ])
    }

    #[test]
    fn test_basis_and_area() {
        let poly = square(0.0, 0.0, 2.0, 3.0, 5.0);
        assert!(poly.is_valid);
        assert!((poly.plane_z - Vec3::Z).length() < 1e-6);
        assert!((poly.plane_dist - 5.0).abs() < 1e-6);
        assert!((poly.area - 6.0).abs() < 1e-4);
        assert!((poly.center - Vec3::new(1.0, 1.5, 5.0)).length() < 1e-4);

        for v in &poly.verts {
            let back = poly.unproject(poly.project(*v));
            assert!((back - *v).length() < 1e-4);
        }
    }

    #[test]
    fn test_degenerate_polygons_are_invalid() {
        let two = Polygon3D::new(vec![Vec3::ZERO, Vec3::X]);
        assert!(!two.is_valid);

        let colinear = Polygon3D::new(vec![Vec3::ZERO, Vec3::X, Vec3::X * 2.0]);
        assert!(!colinear.is_valid);

        let duplicate = Polygon3D::new(vec![Vec3::ZERO, Vec3::X, Vec3::X, Vec3::ZERO]);
        assert!(!duplicate.is_valid);
    }

    #[test]
    fn test_with_normal_orients_winding() {
        let poly = square(0.0, 0.0, 1.0, 1.0, 0.0);
        let flipped = Polygon3D::with_normal(poly.verts.clone(), Vec3::NEG_Z);
        assert!(flipped.is_valid);
        assert!((flipped.plane_z - Vec3::NEG_Z).length() < 1e-6);
        assert!(flipped.area > 0.0);
    }

    #[test]
    fn test_is_inside_center_and_pushed_vertex() {
        let polys = [
            square(0.0, 0.0, 1.0, 1.0, 0.0),
            Polygon3D::new(vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(64.0, 0.0, 32.0),
                Vec3::new(64.0, 64.0, 32.0),
                Vec3::new(0.0, 64.0, 0.0),
            ]),
            Polygon3D::new(vec![
                Vec3::new(10.0, 0.0, 0.0),
                Vec3::new(10.0, 30.0, 0.0),
                Vec3::new(10.0, 15.0, 40.0),
            ]),
        ];

        for poly in &polys {
            assert!(poly.is_valid);
            assert!(poly.is_inside(poly.center, false));
            for v in &poly.verts {
                let pushed = *v + poly.plane_z * 1.0;
                assert!(!poly.is_inside(pushed, false));
                assert!(!poly.is_inside(pushed, true));
            }
        }
    }

    #[test]
    fn test_random_polygons_contain_center() {
        let mut rng = fastrand::Rng::with_seed(11);
        for _ in 0..100 {
            let normal = Vec3::new(rng.f32() - 0.5, rng.f32() - 0.5, rng.f32() - 0.5);
            if normal.length() < 0.1 {
                continue;
            }
            let (u, v) = normal.normalize().any_orthonormal_pair();
            let origin = Vec3::new(rng.f32(), rng.f32(), rng.f32()) * 1000.0;
            let radius = 4.0 + rng.f32() * 96.0;
            let sides = rng.usize(3..9);
            let phase = rng.f32() * std::f32::consts::TAU;

            let verts: Vec<Vec3> = (0..sides)
                .map(|i| {
                    let a = phase + i as f32 * std::f32::consts::TAU / sides as f32;
                    origin + (u * a.cos() + v * a.sin()) * radius
                })
                .collect();
            let poly = Polygon3D::new(verts);
            assert!(poly.is_valid);
            assert!(poly.is_convex());
            assert!(poly.is_inside(poly.center, false));

            for vert in &poly.verts {
                let pushed = *vert + (*vert - poly.center).normalize() * 1.0;
                assert!(!poly.is_inside(pushed, true));
            }
        }
    }

    #[test]
    fn test_edge_points_depend_on_include_edge() {
        let poly = square(0.0, 0.0, 4.0, 4.0, 0.0);
        let on_edge = Vec3::new(2.0, 0.0, 0.0);
        assert!(!poly.is_inside(on_edge, false));
        assert!(poly.is_inside(on_edge, true));
        assert!(!poly.is_inside(Vec3::new(5.0, 2.0, 0.0), true));
    }

    #[test]
    fn test_merge_then_split_preserves_area() {
        let a = square(0.0, 0.0, 1.0, 1.0, 0.0);
        let b = square(1.0, 0.0, 2.0, 1.0, 0.0);

        let merged = a.merge(&b).expect("squares sharing an edge merge");
        assert!(merged.is_valid);
        assert_eq!(merged.verts.len(), 4);
        assert!((merged.area - 2.0).abs() < 1e-4);

        let pieces = merged.split(&a);
        assert_eq!(pieces.len(), 2);
        let total: f32 = pieces.iter().map(|p| p.area).sum();
        assert!((total - merged.area).abs() < 1e-3);
        for piece in &pieces {
            assert!((piece.area - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_merge_rejects_non_adjacent_and_non_convex() {
        let a = square(0.0, 0.0, 1.0, 1.0, 0.0);
        let far = square(5.0, 0.0, 6.0, 1.0, 0.0);
        assert!(a.merge(&far).is_none());

        // Shares the edge x=1 only partially in height, so the union is not convex
        let tall = square(1.0, 0.0, 2.0, 3.0, 0.0);
        assert!(a.merge(&tall).is_none());

        let other_plane = square(1.0, 0.0, 2.0, 1.0, 4.0);
        assert!(a.merge(&other_plane).is_none());
    }

    #[test]
    fn test_split_ignores_colinear_cut() {
        let poly = square(0.0, 0.0, 2.0, 2.0, 0.0);
        // Every coplanar edge of the cutter lies on one of poly's own edges
        let cutter = square(0.0, 0.0, 2.0, 2.0, 0.0);
        assert!(poly.split(&cutter).is_empty());

        // Cutter off the plane does nothing
        let lifted = square(0.5, 0.5, 1.5, 1.5, 3.0);
        assert!(poly.split(&lifted).is_empty());
    }

    #[test]
    fn test_coplanar_intersect_identical_faces() {
        let a = square(0.0, 0.0, 1.0, 1.0, 1.0);
        let b = a.reversed();

        let area = a.coplanar_intersect_area(&b);
        assert_eq!(area.len(), 4);
        let contact = Polygon3D::new(area);
        assert!((contact.area - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_coplanar_intersect_requires_opposite_faces() {
        let a = square(0.0, 0.0, 1.0, 1.0, 0.0);
        let same_facing = square(0.0, 0.0, 1.0, 1.0, 0.0);
        assert!(a.coplanar_intersect_area(&same_facing).is_empty());

        let offset_plane = square(0.0, 0.0, 1.0, 1.0, 0.5).reversed();
        assert!(a.coplanar_intersect_area(&offset_plane).is_empty());
    }

    #[test]
    fn test_coplanar_intersect_contained_equals_smaller_area() {
        let big = square(0.0, 0.0, 10.0, 10.0, 0.0);
        let small = square(2.0, 3.0, 5.0, 7.0, 0.0).reversed();

        let area = Polygon3D::new(big.coplanar_intersect_area(&small));
        assert!((area.area - small.area.min(big.area)).abs() < 1e-3);

        let partial = square(8.0, 8.0, 12.0, 12.0, 0.0).reversed();
        let overlap = Polygon3D::new(big.coplanar_intersect_area(&partial));
        assert!((overlap.area - 4.0).abs() < 1e-3);
    }

    #[test]
    fn test_plane_intersection_line() {
        let floor = square(0.0, 0.0, 10.0, 10.0, 0.0);
        let wall = Polygon3D::new(vec![
            Vec3::new(5.0, 0.0, -5.0),
            Vec3::new(5.0, 10.0, -5.0),
            Vec3::new(5.0, 10.0, 5.0),
            Vec3::new(5.0, 0.0, 5.0),
        ]);

        let (point, dir) = floor.plane_intersection_line(&wall).unwrap();
        assert!(floor.dist_to_plane(point).abs() < 1e-4);
        assert!(wall.dist_to_plane(point).abs() < 1e-4);
        assert!(dir.x.abs() < 1e-6 && dir.z.abs() < 1e-6);

        assert!(floor.intersects(&wall));
        assert!(floor.plane_intersection_line(&square(0.0, 0.0, 1.0, 1.0, 3.0)).is_none());
    }

    #[test]
    fn test_intersects_rejects_grazing_edge() {
        let floor = square(0.0, 0.0, 10.0, 10.0, 0.0);

        // Wall standing on the floor's boundary edge only grazes it
        let boundary_wall = Polygon3D::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 10.0, 0.0),
            Vec3::new(0.0, 10.0, 5.0),
            Vec3::new(0.0, 0.0, 5.0),
        ]);
        assert!(!floor.intersects(&boundary_wall));

        // Wall resting inside the floor counts
        let interior_wall = Polygon3D::new(vec![
            Vec3::new(5.0, 2.0, 0.0),
            Vec3::new(5.0, 8.0, 0.0),
            Vec3::new(5.0, 8.0, 5.0),
            Vec3::new(5.0, 2.0, 5.0),
        ]);
        assert!(floor.intersects(&interior_wall));

        // Far away wall on a crossing plane does not overlap
        let distant = Polygon3D::new(vec![
            Vec3::new(5.0, 20.0, -5.0),
            Vec3::new(5.0, 30.0, -5.0),
            Vec3::new(5.0, 30.0, 5.0),
            Vec3::new(5.0, 20.0, 5.0),
        ]);
        assert!(!floor.intersects(&distant));
    }

    #[test]
    fn test_box_faces_point_outward() {
        let bounds = Aabb::new(Vec3::new(-1.0, -2.0, 0.0), Vec3::new(3.0, 2.0, 8.0));
        let faces = Polygon3D::box_faces(&bounds);
        assert_eq!(faces.len(), 6);

        let center = bounds.center();
        for face in &faces {
            assert!(face.is_valid);
            assert!(face.dist_to_plane(center) < 0.0);
        }
        let total: f32 = faces.iter().map(|f| f.area).sum();
        assert!((total - 2.0 * (16.0 + 32.0 + 32.0)).abs() < 1e-2);
    }

    #[test]
    fn test_nearest_point() {
        let poly = square(0.0, 0.0, 4.0, 4.0, 2.0);
        let above = poly.nearest_point(Vec3::new(1.0, 1.0, 9.0));
        assert!((above - Vec3::new(1.0, 1.0, 2.0)).length() < 1e-4);
        let beside = poly.nearest_point(Vec3::new(6.0, 2.0, 2.0));
        assert!((beside - Vec3::new(4.0, 2.0, 2.0)).length() < 1e-4);
    }
}
