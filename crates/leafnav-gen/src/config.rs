//! Configuration for leaf mesh generation and link costs

use leafnav::{ASTAR_MAX_ITER, DEFAULT_OCTREE_DEPTH};
use leafnav_common::{Error, Hull, Result};
use serde::{Deserialize, Serialize};

use crate::EntityClass;

/// Heights and penalties used to classify how hard a link is to cross
///
/// Heights are in map units. A link whose worst rise is above
/// `max_stack_height` needs flight; above `max_jump_height` it needs a boost
/// from another player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathCostConfig {
    /// Tallest rise crossed by walking
    pub max_step_height: f32,
    /// Tallest rise crossed by a normal jump
    pub max_jump_height: f32,
    /// Tallest rise crossed by stacking on another player
    pub max_stack_height: f32,
    /// Drop that starts hurting
    pub fall_damage_height: f32,
    /// Drop that kills, and the penalty for links with no floor at all
    pub lethal_fall_height: f32,
    /// Floors with a normal z below this are too steep to stand on
    pub steep_slope_normal_z: f32,
    /// Distance between floor samples along a link
    pub sample_spacing: f32,
    /// Longest floor trace
    pub max_trace_distance: f32,

    pub jump_multiplier: f32,
    pub stacking_base_cost: f32,
    pub stacking_multiplier: f32,
    pub flying_base_cost: f32,
    pub flying_multiplier: f32,
    pub fall_damage_multiplier: f32,
    pub lethal_fall_multiplier: f32,
    pub steep_slope_multiplier: f32,
}

impl Default for PathCostConfig {
    fn default() -> Self {
        Self {
            max_step_height: 18.0,
            max_jump_height: 45.0,
            max_stack_height: 64.0,
            fall_damage_height: 160.0,
            lethal_fall_height: 500.0,
            steep_slope_normal_z: 0.7,
            sample_spacing: 16.0,
            max_trace_distance: 4096.0,
            jump_multiplier: 2.0,
            stacking_base_cost: 8000.0,
            stacking_multiplier: 100.0,
            flying_base_cost: 64000.0,
            flying_multiplier: 100.0,
            fall_damage_multiplier: 10.0,
            lethal_fall_multiplier: 100.0,
            steep_slope_multiplier: 10.0,
        }
    }
}

/// Everything [`crate::LeafNavMeshGenerator`] needs besides the map itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Collision hull the mesh is built for
    pub hull: Hull,
    /// Subdivision depth of the spatial index
    pub octree_depth: u32,
    /// Keep the part of a split leaf that lies inside the splitting entity
    pub include_solid_node: bool,
    /// Entity classes whose brushes split the leaves they overlap
    pub split_classes: Vec<EntityClass>,
    /// Build ladder and teleport nodes
    pub link_entities: bool,
    /// Extra height added above ladders so the top can be climbed off
    pub ladder_climb_height: f32,
    /// Spacing of the floor search grid used to place node anchors
    pub origin_grid_step: f32,
    /// Upper bound on floor samples per node anchor
    pub max_origin_samples: usize,
    /// Split pieces whose bounding diagonal exceeds the parent's by more than this are discarded
    pub split_diagonal_tolerance: f32,
    pub astar_max_iter: usize,
    pub cost: PathCostConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            hull: Hull::Head,
            octree_depth: DEFAULT_OCTREE_DEPTH,
            include_solid_node: false,
            split_classes: vec![EntityClass::Wall, EntityClass::Door, EntityClass::Breakable],
            link_entities: true,
            ladder_climb_height: 64.0,
            origin_grid_step: 8.0,
            max_origin_samples: 256,
            split_diagonal_tolerance: 1.0,
            astar_max_iter: ASTAR_MAX_ITER,
            cost: PathCostConfig::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hull(mut self, hull: Hull) -> Self {
        self.hull = hull;
        self
    }

    pub fn with_octree_depth(mut self, depth: u32) -> Self {
        self.octree_depth = depth;
        self
    }

    pub fn with_include_solid_node(mut self, include: bool) -> Self {
        self.include_solid_node = include;
        self
    }

    pub fn with_split_classes(mut self, classes: Vec<EntityClass>) -> Self {
        self.split_classes = classes;
        self
    }

    pub fn with_link_entities(mut self, link: bool) -> Self {
        self.link_entities = link;
        self
    }

    pub fn with_cost(mut self, cost: PathCostConfig) -> Self {
        self.cost = cost;
        self
    }

    /// Checks if entities of `class` split leaves
    pub fn splits_on(&self, class: &EntityClass) -> bool {
        self.split_classes.contains(class)
    }

    /// Validates the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.octree_depth == 0 || self.octree_depth > 12 {
            return Err(Error::InvalidConfig(format!(
                "octree depth {} outside 1..=12",
                self.octree_depth
            )));
        }
        if self.origin_grid_step <= 0.0 || self.max_origin_samples == 0 {
            return Err(Error::InvalidConfig(
                "anchor search needs a positive grid step and sample budget".to_string(),
            ));
        }
        if self.ladder_climb_height < 0.0 || self.split_diagonal_tolerance < 0.0 {
            return Err(Error::InvalidConfig(
                "ladder height and split tolerance must not be negative".to_string(),
            ));
        }
        if self.astar_max_iter == 0 {
            return Err(Error::InvalidConfig("A* needs at least one iteration".to_string()));
        }

        let c = &self.cost;
        if c.sample_spacing <= 0.0 || c.max_trace_distance <= 0.0 {
            return Err(Error::InvalidConfig(
                "cost sampling needs a positive spacing and trace distance".to_string(),
            ));
        }
        if !(c.max_step_height <= c.max_jump_height && c.max_jump_height <= c.max_stack_height) {
            return Err(Error::InvalidConfig(
                "step, jump and stack heights must be increasing".to_string(),
            ));
        }
        if c.fall_damage_height > c.lethal_fall_height {
            return Err(Error::InvalidConfig(
                "fall damage height is above the lethal fall height".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&c.steep_slope_normal_z) {
            return Err(Error::InvalidConfig(format!(
                "steep slope normal z {} outside 0..=1",
                c.steep_slope_normal_z
            )));
        }
        let multipliers = [
            c.jump_multiplier,
            c.stacking_multiplier,
            c.flying_multiplier,
            c.fall_damage_multiplier,
            c.lethal_fall_multiplier,
            c.steep_slope_multiplier,
        ];
        if multipliers.iter().any(|&m| m < 1.0) {
            return Err(Error::InvalidConfig(
                "cost multipliers must be at least 1".to_string(),
            ));
        }
        if c.stacking_base_cost < 0.0 || c.flying_base_cost < 0.0 {
            return Err(Error::InvalidConfig("base costs must not be negative".to_string()));
        }

        Ok(())
    }
}
