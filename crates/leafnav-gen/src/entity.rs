//! Map entities the generator reacts to

use std::collections::BTreeMap;

use glam::Vec3;
use leafnav_common::Aabb;
use serde::{Deserialize, Serialize};

/// `trigger_teleport` spawnflag: link to every matching destination instead of the first
pub const SF_TELEPORT_RANDOM_DESTINATION: u32 = 64;

/// What an entity does to navigation, resolved once from its classname
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityClass {
    Wall,
    Door,
    Breakable,
    Ladder,
    Teleport,
    TeleportDestination,
    Other(String),
}

impl EntityClass {
    pub fn from_classname(classname: &str) -> Self {
        match classname {
            "func_wall" | "func_wall_toggle" | "func_illusionary_solid" => EntityClass::Wall,
            "func_door" | "func_door_rotating" | "momentary_door" => EntityClass::Door,
            "func_breakable" | "func_pushable" => EntityClass::Breakable,
            "func_ladder" => EntityClass::Ladder,
            "trigger_teleport" => EntityClass::Teleport,
            "info_teleport_destination" => EntityClass::TeleportDestination,
            other => EntityClass::Other(other.to_string()),
        }
    }

    /// Brush classes that block movement and so split the leaves they overlap
    pub fn is_solid_brush(&self) -> bool {
        matches!(
            self,
            EntityClass::Wall | EntityClass::Door | EntityClass::Breakable
        )
    }
}

/// One entity of a loaded map
///
/// Index 0 of an entity list is always the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EntityDesc", into = "EntityDesc")]
pub struct MapEntity {
    pub classname: String,
    pub class: EntityClass,
    pub origin: Vec3,
    pub angles: Vec3,
    /// Brush model index, for brush entities
    pub model: Option<usize>,
    pub target: Option<String>,
    pub targetname: Option<String>,
    pub spawnflags: u32,
    /// Point entity size relative to `origin`
    pub default_bbox: Option<Aabb>,
    /// Keys not covered by the fields above
    pub keyvalues: BTreeMap<String, String>,
}

impl MapEntity {
    pub fn new(classname: impl Into<String>) -> Self {
        let classname = classname.into();
        Self {
            class: EntityClass::from_classname(&classname),
            classname,
            origin: Vec3::ZERO,
            angles: Vec3::ZERO,
            model: None,
            target: None,
            targetname: None,
            spawnflags: 0,
            default_bbox: None,
            keyvalues: BTreeMap::new(),
        }
    }

    /// The `worldspawn` entity
    pub fn world() -> Self {
        let mut world = Self::new("worldspawn");
        world.model = Some(0);
        world
    }

    pub fn with_origin(mut self, origin: Vec3) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_model(mut self, model: usize) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_targetname(mut self, targetname: impl Into<String>) -> Self {
        self.targetname = Some(targetname.into());
        self
    }

    pub fn with_spawnflags(mut self, spawnflags: u32) -> Self {
        self.spawnflags = spawnflags;
        self
    }

    pub fn with_bbox(mut self, bbox: Aabb) -> Self {
        self.default_bbox = Some(bbox);
        self
    }

    pub fn keyvalue(&self, key: &str) -> Option<&str> {
        self.keyvalues.get(key).map(String::as_str)
    }

    pub fn has_spawnflag(&self, flag: u32) -> bool {
        self.spawnflags & flag != 0
    }
}

/// Serialized form; the class is derived from the classname on load
#[derive(Serialize, Deserialize)]
struct EntityDesc {
    classname: String,
    #[serde(default)]
    origin: Vec3,
    #[serde(default)]
    angles: Vec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    targetname: Option<String>,
    #[serde(default)]
    spawnflags: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_bbox: Option<Aabb>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    keyvalues: BTreeMap<String, String>,
}

impl From<EntityDesc> for MapEntity {
    fn from(desc: EntityDesc) -> Self {
        Self {
            class: EntityClass::from_classname(&desc.classname),
            classname: desc.classname,
            origin: desc.origin,
            angles: desc.angles,
            model: desc.model,
            target: desc.target,
            targetname: desc.targetname,
            spawnflags: desc.spawnflags,
            default_bbox: desc.default_bbox,
            keyvalues: desc.keyvalues,
        }
    }
}

impl From<MapEntity> for EntityDesc {
    fn from(entity: MapEntity) -> Self {
        Self {
            classname: entity.classname,
            origin: entity.origin,
            angles: entity.angles,
            model: entity.model,
            target: entity.target,
            targetname: entity.targetname,
            spawnflags: entity.spawnflags,
            default_bbox: entity.default_bbox,
            keyvalues: entity.keyvalues,
        }
    }
}
