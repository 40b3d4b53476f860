//! Link cost classification from floor samples
//!
//! A link is walked from the source anchor to the crossing point and on to
//! the destination anchor. Straight-down traces along that route give a floor
//! profile; the worst rise, the worst drop and any steep or missing floor
//! decide the link's base cost and distance multiplier.

use glam::Vec3;
use leafnav::{LeafNavMesh, NodeId};
use leafnav_common::CollisionMap;

use crate::config::PathCostConfig;
use crate::generator::TRACE_LIFT;
use crate::LeafNavMeshGenerator;

/// Floor heights seen along a link route
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloorProfile {
    /// Largest increase in floor height between consecutive samples
    pub max_rise: f32,
    /// Largest decrease in floor height between consecutive samples
    pub max_drop: f32,
    /// Some sample landed on a floor too steep to stand on
    pub steep: bool,
    /// Some sample found no floor within trace range
    pub no_floor: bool,
    /// Samples that produced a floor height
    pub samples: usize,
}

impl Default for FloorProfile {
    fn default() -> Self {
        Self {
            max_rise: 0.0,
            max_drop: 0.0,
            steep: false,
            no_floor: false,
            samples: 0,
        }
    }
}

impl FloorProfile {
    /// Base cost and multiplier for a link with this profile
    pub fn cost(&self, c: &PathCostConfig) -> (f32, f32) {
        let (base, mut multiplier) = if self.max_rise > c.max_stack_height {
            (c.flying_base_cost, c.flying_multiplier)
        } else if self.max_rise > c.max_jump_height {
            (c.stacking_base_cost, c.stacking_multiplier)
        } else if self.max_rise > c.max_step_height {
            (0.0, c.jump_multiplier)
        } else {
            (0.0, 1.0)
        };

        if self.no_floor || self.max_drop > c.lethal_fall_height {
            multiplier = multiplier.max(c.lethal_fall_multiplier);
        } else if self.max_drop > c.fall_damage_height {
            multiplier = multiplier.max(c.fall_damage_multiplier);
        }
        if self.steep {
            multiplier = multiplier.max(c.steep_slope_multiplier);
        }

        (base, multiplier)
    }
}

/// Evenly spaced points on `a..b`, `a` excluded when `skip_start` is set
fn segment_samples(a: Vec3, b: Vec3, spacing: f32, skip_start: bool) -> impl Iterator<Item = Vec3> {
    let steps = ((a.distance(b) / spacing).ceil() as usize).max(1);
    let first = usize::from(skip_start);
    (first..=steps).map(move |i| a.lerp(b, i as f32 / steps as f32))
}

impl LeafNavMeshGenerator {
    /// Samples the floor under the polyline through `route`
    pub fn floor_profile<M: CollisionMap + ?Sized>(&self, map: &M, route: &[Vec3]) -> FloorProfile {
        let c = &self.config.cost;
        let mut profile = FloorProfile::default();
        let mut last_floor: Option<f32> = None;

        let points = route.windows(2).enumerate().flat_map(|(i, seg)| {
            segment_samples(seg[0], seg[1], c.sample_spacing, i > 0)
        });

        for point in points {
            let start = point + Vec3::Z * TRACE_LIFT;
            let trace = map.trace(start, start - Vec3::Z * c.max_trace_distance, self.config.hull);
            if trace.start_solid {
                continue;
            }
            if !trace.hit() {
                profile.no_floor = true;
                continue;
            }

            let floor = trace.end_pos.z;
            if trace.plane_normal.z < c.steep_slope_normal_z {
                profile.steep = true;
            }
            if let Some(last) = last_floor {
                profile.max_rise = profile.max_rise.max(floor - last);
                profile.max_drop = profile.max_drop.max(last - floor);
            }
            last_floor = Some(floor);
            profile.samples += 1;
        }
        profile
    }

    /// Classifies link `link_idx` of node `from` and stores its cost
    ///
    /// Links touching an entity node are free.
    pub fn calc_path_cost<M: CollisionMap + ?Sized>(
        &self,
        map: &M,
        mesh: &mut LeafNavMesh,
        from: NodeId,
        link_idx: usize,
    ) {
        let Some(node) = mesh.node(from) else {
            return;
        };
        let Some(link) = node.links.get(link_idx) else {
            return;
        };
        let Some(target) = mesh.node(link.node) else {
            return;
        };

        let (base, multiplier) = if node.is_entity() || target.is_entity() {
            (0.0, 1.0)
        } else {
            self.floor_profile(map, &[node.origin, link.pos, target.origin])
                .cost(&self.config.cost)
        };

        if let Some(link) = mesh
            .node_mut(from)
            .and_then(|n| n.links.get_mut(link_idx))
        {
            link.base_cost = base;
            link.cost_multiplier = multiplier;
        }
    }

    /// Classifies every link leaving `id`
    pub(crate) fn calc_node_costs<M: CollisionMap + ?Sized>(
        &self,
        map: &M,
        mesh: &mut LeafNavMesh,
        id: NodeId,
    ) {
        let link_count = mesh.node(id).map_or(0, |n| n.links.len());
        for link_idx in 0..link_count {
            self.calc_path_cost(map, mesh, id, link_idx);
        }
    }

    /// Classifies the links from every neighbour of `id` back into it
    pub(crate) fn calc_costs_into<M: CollisionMap + ?Sized>(
        &self,
        map: &M,
        mesh: &mut LeafNavMesh,
        id: NodeId,
    ) {
        let neighbours: Vec<NodeId> = match mesh.node(id) {
            Some(node) => node.links.iter().map(|l| l.node).collect(),
            None => return,
        };
        for from in neighbours {
            let back = mesh
                .node(from)
                .and_then(|n| n.links.iter().position(|l| l.node == id));
            if let Some(link_idx) = back {
                self.calc_path_cost(map, mesh, from, link_idx);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(rise: f32, drop: f32) -> FloorProfile {
        FloorProfile {
            max_rise: rise,
            max_drop: drop,
            samples: 4,
            ..FloorProfile::default()
        }
    }

    #[test]
    fn test_rise_classes() {
        let c = PathCostConfig::default();
        assert_eq!(profile(10.0, 0.0).cost(&c), (0.0, 1.0));
        assert_eq!(profile(30.0, 0.0).cost(&c), (0.0, 2.0));
        assert_eq!(profile(50.0, 0.0).cost(&c), (8000.0, 100.0));
        assert_eq!(profile(100.0, 0.0).cost(&c), (64000.0, 100.0));
    }

    #[test]
    fn test_drops_raise_multiplier_only() {
        let c = PathCostConfig::default();
        assert_eq!(profile(0.0, 100.0).cost(&c), (0.0, 1.0));
        assert_eq!(profile(0.0, 200.0).cost(&c), (0.0, 10.0));
        assert_eq!(profile(0.0, 600.0).cost(&c), (0.0, 100.0));

        let mut gap = profile(0.0, 0.0);
        gap.no_floor = true;
        assert_eq!(gap.cost(&c), (0.0, 100.0));

        // A jump up followed by a damaging drop keeps the larger multiplier
        assert_eq!(profile(30.0, 200.0).cost(&c), (0.0, 10.0));
    }

    #[test]
    fn test_steep_floor() {
        let c = PathCostConfig::default();
        let mut slope = profile(0.0, 0.0);
        slope.steep = true;
        assert_eq!(slope.cost(&c), (0.0, 10.0));
    }

    #[test]
    fn test_segment_samples_cover_both_ends() {
        let a = Vec3::ZERO;
        let b = Vec3::new(40.0, 0.0, 0.0);
        let points: Vec<Vec3> = segment_samples(a, b, 16.0, false).collect();
        assert_eq!(points.len(), 4);
        assert_eq!(points[0], a);
        assert_eq!(points[3], b);

        let points: Vec<Vec3> = segment_samples(a, b, 16.0, true).collect();
        assert_eq!(points.len(), 3);

        // Degenerate segments still yield their end point
        assert_eq!(segment_samples(a, a, 16.0, true).count(), 1);
    }
}
