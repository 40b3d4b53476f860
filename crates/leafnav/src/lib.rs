//! Leaf navigation mesh
//!
//! The navigation graph is made of convex [`LeafNode`] volumes connected by
//! directed [`LeafLink`]s. Nodes are addressed by integer [`NodeId`]s into a
//! flat arena owned by [`LeafNavMesh`]; the only operation that renumbers ids
//! is [`LeafNavMesh::remove_range`].

mod mesh;
mod node;
mod octree;
mod search;

#[cfg(test)]
mod mesh_tests;
#[cfg(test)]
mod search_tests;
#[cfg(test)]
mod test_mesh_helpers;

pub use mesh::LeafNavMesh;
pub use node::{LeafLink, LeafNode, SplitEntity};
pub use octree::{SpatialOctree, DEFAULT_OCTREE_DEPTH};
pub use search::ASTAR_MAX_ITER;

pub use leafnav_common::{Error, Result};

/// Index of a node in the navigation mesh
pub type NodeId = u32;

/// Sentinel for "no node"
pub const NAV_INVALID_IDX: NodeId = NodeId::MAX;
