//! Leaf navigation mesh generation
//!
//! Turns the open leaves of a BSP collision hull into a [`LeafNavMesh`]:
//! leaves are clipped into convex volumes, linked through shared faces,
//! given walkable anchors and classified link costs, and later split around
//! doors and other solid brush entities as they move.

mod clipper;
mod config;
mod context;
mod cost;
mod entity;
mod entity_links;
mod entity_split;
mod generator;
mod solid;
mod world;


pub use clipper::{ClipEdge, ClipFace, ClipResult, ClipVertex, Clipper, ConvexMesh, CLIP_CUBE_SIZE};
pub use config::{GeneratorConfig, PathCostConfig};
pub use context::{BuildContext, LogEntry, LogLevel, ProgressInfo, TimerCategory, TimerEntry};
pub use cost::FloorProfile;
pub use entity::{EntityClass, MapEntity, SF_TELEPORT_RANDOM_DESTINATION};
pub use entity_links::teleport_destinations;
pub use generator::LeafNavMeshGenerator;
pub use solid::{SolidEntityNode, SolidPiece};
pub use world::{LeafWorld, WorldDescription, WorldLeaf, WorldModel};

pub use leafnav::{LeafNavMesh, NodeId, NAV_INVALID_IDX};
pub use leafnav_common::{Error, Result};
