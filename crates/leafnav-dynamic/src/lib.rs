//! Live leaf navigation meshes
//!
//! [`DynamicNavMesh`] owns a published navigation mesh together with the
//! generator state needed to keep it current. Full builds run on a worker
//! thread and replace the published mesh in one step, so readers only ever
//! see a finished mesh. Entity re-splits edit the published mesh in place
//! under an exclusive lock.
//!
//! Node ids are renumbered whenever a split is undone, so lookups hand out
//! [`NodeHandle`]s that remember the mesh generation they were taken from.
//! Routing with a handle from an older generation fails with
//! [`Error::StaleNodeHandle`] rather than silently naming a different node.
//!
//! # Example
//!
//! ```no_run
//! use glam::Vec3;
//! use leafnav_common::Aabb;
//! use leafnav_dynamic::{DynamicNavMesh, DynamicNavMeshConfig};
//! use leafnav_gen::{LeafWorld, MapEntity};
//!
//! let world = LeafWorld::from_boxes(&[Aabb::new(Vec3::ZERO, Vec3::splat(64.0))]);
//! let nav = DynamicNavMesh::new(world, DynamicNavMeshConfig::default())?;
//! nav.rebuild(vec![MapEntity::world()])?;
//!
//! let start = nav.node_at(Vec3::new(8.0, 8.0, 8.0))?;
//! let end = nav.node_at(Vec3::new(56.0, 56.0, 8.0))?;
//! if let (Some(start), Some(end)) = (start, end) {
//!     let path = nav.find_path(start, end)?;
//!     println!("{} nodes", path.len());
//! }
//! # Ok::<(), leafnav_common::Error>(())
//! ```

pub mod config;
pub mod dynamic_navmesh;
pub mod rebuild;

pub use config::DynamicNavMeshConfig;
pub use dynamic_navmesh::{DynamicNavMesh, DynamicNavMeshStatistics, NodeHandle};
pub use rebuild::{RebuildHandle, RebuildSummary};

pub use leafnav_common::{Error, Result};
