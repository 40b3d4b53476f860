//! A collision world described directly as convex leaves
//!
//! [`LeafWorld`] implements [`CollisionMap`] for maps that are already split
//! into convex leaves, one list per brush model. Model 0 is the world: its
//! empty leaves are open space and everything outside them is solid. All
//! hulls share the same leaves; hull expansion is expected to be baked into
//! the planes by whoever produced the world.

use glam::Vec3;
use leafnav_common::{
    Aabb, ClipPlane, CollisionMap, Hull, LeafPlanes, Trace, CONTENTS_EMPTY, EPSILON,
};
use serde::{Deserialize, Serialize};

use crate::clipper::Clipper;
use crate::{GeneratorConfig, MapEntity};

/// Slack used when deciding whether a trace point is still inside a leaf
const TRACE_EPSILON: f32 = 1e-3;

/// One convex leaf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldLeaf {
    pub contents: i32,
    /// Half-spaces bounding the leaf; may be omitted when `bounds` is given
    #[serde(default)]
    pub planes: Vec<ClipPlane>,
    /// Box shorthand used when `planes` is empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Aabb>,
}

impl WorldLeaf {
    pub fn from_box(contents: i32, bounds: Aabb) -> Self {
        Self {
            contents,
            planes: ClipPlane::box_planes(&bounds),
            bounds: None,
        }
    }

    /// Half-spaces bounding the leaf
    pub fn clip_planes(&self) -> Vec<ClipPlane> {
        match (self.planes.is_empty(), self.bounds) {
            (true, Some(bounds)) => ClipPlane::box_planes(&bounds),
            _ => self.planes.clone(),
        }
    }

    fn contains_point(&self, point: Vec3) -> bool {
        let planes = self.clip_planes();
        !planes.is_empty() && planes.iter().all(|p| p.distance(point) >= -EPSILON)
    }
}

/// Leaves of one brush model, in model-local coordinates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldModel {
    pub leaves: Vec<WorldLeaf>,
}

/// Convex-leaf collision world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafWorld {
    pub models: Vec<WorldModel>,
}

impl Default for LeafWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl LeafWorld {
    /// A world with an empty model 0
    pub fn new() -> Self {
        Self {
            models: vec![WorldModel::default()],
        }
    }

    /// A world whose open space is the union of `boxes`
    pub fn from_boxes(boxes: &[Aabb]) -> Self {
        let mut world = Self::new();
        for bounds in boxes {
            world.add_box(0, CONTENTS_EMPTY, *bounds);
        }
        world
    }

    /// Appends an empty brush model and returns its index
    pub fn add_model(&mut self) -> usize {
        self.models.push(WorldModel::default());
        self.models.len() - 1
    }

    /// Appends a leaf to `model`, creating models up to it if needed
    pub fn add_leaf(&mut self, model: usize, leaf: WorldLeaf) -> usize {
        if self.models.len() <= model {
            self.models.resize_with(model + 1, WorldModel::default);
        }
        let leaves = &mut self.models[model].leaves;
        leaves.push(leaf);
        leaves.len() - 1
    }

    pub fn add_box(&mut self, model: usize, contents: i32, bounds: Aabb) -> usize {
        self.add_leaf(model, WorldLeaf::from_box(contents, bounds))
    }

    fn world_leaves(&self) -> &[WorldLeaf] {
        self.models.first().map_or(&[], |m| m.leaves.as_slice())
    }

    /// Open-space leaves of model 0 with their original indices
    fn empty_leaves(&self) -> impl Iterator<Item = (usize, &WorldLeaf)> {
        self.world_leaves()
            .iter()
            .enumerate()
            .filter(|(_, leaf)| leaf.contents == CONTENTS_EMPTY)
    }

    /// Bounds of one model's leaves of any contents
    pub fn model_bounds(&self, model: usize) -> Aabb {
        let clipper = Clipper::new();
        let mut bounds = Aabb::empty();
        if let Some(m) = self.models.get(model) {
            for leaf in &m.leaves {
                for face in clipper.clip(&leaf.clip_planes()).face_polygons() {
                    bounds.expand(&face.bounds());
                }
            }
        }
        bounds
    }
}

/// Parameter range of the segment `start + t * delta` inside a convex leaf
///
/// Returns the entry and exit parameters and the index of the plane that
/// limits the exit.
fn segment_interval(
    planes: &[ClipPlane],
    start: Vec3,
    delta: Vec3,
) -> Option<(f32, f32, Option<usize>)> {
    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut exit_plane = None;

    for (i, plane) in planes.iter().enumerate() {
        let dist = plane.distance(start) + TRACE_EPSILON;
        let denom = plane.normal.dot(delta);
        if denom.abs() < 1e-9 {
            if dist < 0.0 {
                return None;
            }
            continue;
        }
        let t = -dist / denom;
        if denom > 0.0 {
            t_enter = t_enter.max(t);
        } else if t < t_exit {
            t_exit = t;
            exit_plane = Some(i);
        }
    }

    (t_enter <= t_exit).then_some((t_enter, t_exit, exit_plane))
}

impl CollisionMap for LeafWorld {
    fn world_bounds(&self) -> Aabb {
        self.model_bounds(0)
    }

    fn leaf_clip_planes(&self, model: usize, _hull: Hull, contents: i32) -> Vec<LeafPlanes> {
        let Some(m) = self.models.get(model) else {
            return Vec::new();
        };
        m.leaves
            .iter()
            .enumerate()
            .filter(|(_, leaf)| leaf.contents == contents)
            .map(|(leaf, l)| LeafPlanes {
                leaf,
                planes: l.clip_planes(),
            })
            .collect()
    }

    /// Follows the segment from leaf to leaf through open space
    ///
    /// The trace stops where no empty leaf continues past the current point;
    /// the hit normal is the plane that bounded the last leaf there.
    fn trace(&self, start: Vec3, end: Vec3, _hull: Hull) -> Trace {
        let delta = end - start;
        let leaves: Vec<Vec<ClipPlane>> =
            self.empty_leaves().map(|(_, l)| l.clip_planes()).collect();

        let mut t = 0.0f32;
        let mut normal = Vec3::ZERO;
        let mut first = true;
        loop {
            let mut best: Option<(f32, Vec3)> = None;
            for planes in &leaves {
                let Some((t_enter, t_exit, exit_plane)) = segment_interval(planes, start, delta)
                else {
                    continue;
                };
                if t_enter > t + 1e-6 || t_exit < t - 1e-6 {
                    continue;
                }
                if best.map_or(true, |(bt, _)| t_exit > bt) {
                    let n = exit_plane.map_or(Vec3::ZERO, |i| planes[i].normal);
                    best = Some((t_exit, n));
                }
            }

            let Some((t_exit, exit_normal)) = best else {
                if first {
                    return Trace {
                        fraction: 0.0,
                        end_pos: start,
                        plane_normal: Vec3::ZERO,
                        start_solid: true,
                        all_solid: true,
                    };
                }
                break;
            };
            first = false;

            if t_exit >= 1.0 {
                return Trace::clear(end);
            }
            normal = exit_normal;
            if t_exit <= t + 1e-6 {
                break;
            }
            t = t_exit;
        }

        let fraction = t.clamp(0.0, 1.0);
        Trace {
            fraction,
            end_pos: start + delta * fraction,
            plane_normal: normal,
            start_solid: false,
            all_solid: false,
        }
    }

    fn point_leaf(&self, point: Vec3) -> Option<usize> {
        self.empty_leaves()
            .find(|(_, leaf)| leaf.contains_point(point))
            .map(|(i, _)| i)
            .or_else(|| {
                self.world_leaves()
                    .iter()
                    .position(|leaf| leaf.contains_point(point))
            })
    }

    fn leaf_centroids(&self) -> Vec<(usize, Vec3)> {
        let clipper = Clipper::new();
        self.world_leaves()
            .iter()
            .enumerate()
            .filter_map(|(i, leaf)| {
                let faces = clipper.clip(&leaf.clip_planes()).face_polygons();
                let total: f32 = faces.iter().map(|f| f.area).sum();
                if faces.is_empty() || total <= 0.0 {
                    return None;
                }
                let weighted: Vec3 = faces.iter().map(|f| f.center * f.area).sum();
                Some((i, weighted / total))
            })
            .collect()
    }
}

/// A world, its entities and optional generation settings, as stored on disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldDescription {
    pub world: LeafWorld,
    #[serde(default)]
    pub entities: Vec<MapEntity>,
    #[serde(default)]
    pub config: Option<GeneratorConfig>,
}

impl WorldDescription {
    /// Entities with `worldspawn` guaranteed at index 0
    pub fn entity_list(&self) -> Vec<MapEntity> {
        let has_world = self
            .entities
            .first()
            .is_some_and(|e| e.classname == "worldspawn");
        if has_world {
            self.entities.clone()
        } else {
            std::iter::once(MapEntity::world())
                .chain(self.entities.iter().cloned())
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leafnav_common::CONTENTS_SOLID;

    fn corridor() -> LeafWorld {
        // Two rooms side by side, joined through their shared wall at x = 64
        LeafWorld::from_boxes(&[
            Aabb::new(Vec3::ZERO, Vec3::new(64.0, 64.0, 64.0)),
            Aabb::new(Vec3::new(64.0, 0.0, 0.0), Vec3::new(128.0, 64.0, 96.0)),
        ])
    }

    #[test]
    fn test_trace_crosses_adjacent_leaves() {
        let world = corridor();
        let trace = world.trace(
            Vec3::new(10.0, 32.0, 32.0),
            Vec3::new(120.0, 32.0, 32.0),
            Hull::Head,
        );
        assert!(!trace.hit());
        assert!(!trace.start_solid);
    }

    #[test]
    fn test_trace_stops_at_wall_with_its_normal() {
        let world = corridor();
        let trace = world.trace(
            Vec3::new(32.0, 32.0, 32.0),
            Vec3::new(32.0, 32.0, -100.0),
            Hull::Head,
        );
        assert!(trace.hit());
        assert!(trace.end_pos.z.abs() < 0.01);
        assert!((trace.plane_normal - Vec3::Z).length() < 1e-4);

        // The second room is taller; a trace up through the step stops at its ceiling
        let trace = world.trace(
            Vec3::new(100.0, 32.0, 10.0),
            Vec3::new(100.0, 32.0, 500.0),
            Hull::Head,
        );
        assert!((trace.end_pos.z - 96.0).abs() < 0.01);
        assert!((trace.plane_normal + Vec3::Z).length() < 1e-4);
    }

    #[test]
    fn test_trace_from_solid() {
        let world = corridor();
        let trace = world.trace(Vec3::splat(-50.0), Vec3::splat(10.0), Hull::Head);
        assert!(trace.start_solid);
        assert_eq!(trace.fraction, 0.0);
    }

    #[test]
    fn test_point_leaf_and_centroids() {
        let mut world = corridor();
        let floor = Aabb::new(Vec3::new(0.0, 0.0, -16.0), Vec3::new(128.0, 64.0, 0.0));
        world.add_box(0, CONTENTS_SOLID, floor);

        assert_eq!(world.point_leaf(Vec3::new(100.0, 10.0, 10.0)), Some(1));
        assert_eq!(world.point_leaf(Vec3::new(100.0, 10.0, -8.0)), Some(2));
        assert_eq!(world.point_leaf(Vec3::splat(-500.0)), None);

        let centroids = world.leaf_centroids();
        assert_eq!(centroids.len(), 3);
        assert!((centroids[0].1 - Vec3::splat(32.0)).length() < 1e-2);

        let bounds = world.world_bounds();
        assert!((bounds.mins - Vec3::new(0.0, 0.0, -16.0)).length() < 1e-2);
        assert!((bounds.maxs - Vec3::new(128.0, 64.0, 96.0)).length() < 1e-2);
    }

    #[test]
    fn test_models_and_box_shorthand() -> Result<(), serde_json::Error> {
        let json = r#"{
            "models": [
                { "leaves": [
                    { "contents": -1, "bounds": { "mins": [0, 0, 0], "maxs": [64, 64, 64] } }
                ] },
                { "leaves": [
                    { "contents": -2, "bounds": { "mins": [-8, -8, 0], "maxs": [8, 8, 64] } }
                ] }
            ]
        }"#;
        let world: LeafWorld = serde_json::from_str(json)?;
        assert_eq!(world.leaf_clip_planes(1, Hull::Point, CONTENTS_SOLID).len(), 1);
        assert!(world.leaf_clip_planes(1, Hull::Point, CONTENTS_EMPTY).is_empty());
        assert!(world.leaf_clip_planes(5, Hull::Point, CONTENTS_SOLID).is_empty());
        assert_eq!(world.leaf_clip_planes(0, Hull::Head, CONTENTS_EMPTY)[0].planes.len(), 6);
        assert_eq!(world.point_leaf(Vec3::splat(32.0)), Some(0));
        Ok(())
    }

    #[test]
    fn test_description_prepends_worldspawn() {
        let desc = WorldDescription {
            world: corridor(),
            entities: vec![MapEntity::new("func_door").with_model(1)],
            config: None,
        };
        let entities = desc.entity_list();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].classname, "worldspawn");
    }
}
