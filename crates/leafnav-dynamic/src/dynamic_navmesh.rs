//! Published navigation mesh with live entity updates

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard};

use glam::Vec3;
use leafnav::{LeafNavMesh, NodeId, NAV_INVALID_IDX};
use leafnav_common::{Aabb, CollisionMap, Error, Result};
use leafnav_gen::{BuildContext, LeafNavMeshGenerator, MapEntity};

use crate::config::DynamicNavMeshConfig;
use crate::rebuild::{self, RebuildHandle, RebuildSummary};

/// Everything a published mesh needs to be queried and re-split
#[derive(Debug)]
pub(crate) struct NavState {
    pub(crate) mesh: LeafNavMesh,
    /// Holds the octree and clipped entity models of `mesh`
    pub(crate) generator: LeafNavMeshGenerator,
    /// Entities the current split reflects
    pub(crate) entities: Vec<MapEntity>,
    pub(crate) base_generation: u64,
}

impl NavState {
    pub(crate) fn generation(&self) -> u64 {
        self.base_generation + self.mesh.generation()
    }

    fn handle(&self, id: NodeId) -> Option<NodeHandle> {
        (id != NAV_INVALID_IDX).then(|| NodeHandle {
            id,
            generation: self.generation(),
        })
    }

    fn resolve(&self, handle: NodeHandle) -> Result<NodeId> {
        let current = self.generation();
        if handle.generation != current || !self.mesh.is_valid_id(handle.id) {
            return Err(Error::StaleNodeHandle {
                id: handle.id,
                handle: handle.generation,
                current,
            });
        }
        Ok(handle.id)
    }
}

pub(crate) type SharedState = Arc<RwLock<Option<NavState>>>;

pub(crate) fn lock_poisoned() -> Error {
    Error::Concurrency("navigation mesh lock poisoned".to_string())
}

/// A node id tagged with the mesh generation it was looked up in
///
/// Any change to the node arena, including splits that only append nodes,
/// moves the mesh to a new generation and invalidates older handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    pub id: NodeId,
    pub generation: u64,
}

/// Counters describing the published mesh
#[derive(Debug, Clone, Default)]
pub struct DynamicNavMeshStatistics {
    pub node_count: usize,
    pub world_leaf_count: usize,
    /// World leaves currently replaced by children
    pub split_leaves: usize,
    pub child_nodes: usize,
    pub link_count: usize,
    pub generation: u64,
    /// Rebuilds started through this instance
    pub rebuilds: u64,
    /// Re-splits that changed the mesh
    pub resplits: u64,
}

/// A navigation mesh that can be rebuilt and re-split while it is queried
///
/// Queries share a read lock. Re-splits take the write lock for the duration
/// of the split; rebuilds only take it to publish.
pub struct DynamicNavMesh<M> {
    map: Arc<M>,
    config: DynamicNavMeshConfig,
    state: SharedState,
    rebuilds: AtomicU64,
    resplits: AtomicU64,
}

impl<M> DynamicNavMesh<M>
where
    M: CollisionMap + Send + Sync + 'static,
{
    /// Creates an empty instance; nothing can be queried until a rebuild publishes
    pub fn new(map: M, config: DynamicNavMeshConfig) -> Result<Self> {
        Self::from_shared(Arc::new(map), config)
    }

    pub fn from_shared(map: Arc<M>, config: DynamicNavMeshConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            map,
            config,
            state: Arc::new(RwLock::new(None)),
            rebuilds: AtomicU64::new(0),
            resplits: AtomicU64::new(0),
        })
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn config(&self) -> &DynamicNavMeshConfig {
        &self.config
    }

    /// Generates a new mesh on a worker thread and publishes it when done
    pub fn spawn_rebuild(&self, entities: Vec<MapEntity>) -> Result<RebuildHandle> {
        self.rebuilds.fetch_add(1, Ordering::Relaxed);
        rebuild::spawn(
            Arc::clone(&self.map),
            self.config.clone(),
            entities,
            Arc::clone(&self.state),
        )
    }

    /// Generates and publishes a new mesh, blocking until it is in place
    pub fn rebuild(&self, entities: Vec<MapEntity>) -> Result<RebuildSummary> {
        self.spawn_rebuild(entities)?.wait()
    }

    /// Checks if a mesh has been published
    pub fn is_ready(&self) -> Result<bool> {
        Ok(self.read()?.is_some())
    }

    /// Generation of the published mesh
    pub fn generation(&self) -> Result<u64> {
        let guard = self.read()?;
        Ok(published(&guard)?.generation())
    }

    /// Splits the published mesh around the given entity positions
    ///
    /// Returns the number of leaves re-split or restored.
    pub fn resplit(&self, entities: Vec<MapEntity>) -> Result<usize> {
        let mut guard = self.state.write().map_err(|_| lock_poisoned())?;
        let state = guard.as_mut().ok_or_else(not_published)?;
        let changed = self.split_locked(state, &entities)?;
        state.entities = entities;
        Ok(changed)
    }

    /// Moves one entity and re-splits the mesh around it
    ///
    /// The entity list is read and written under one write lock, so
    /// concurrent moves of different entities all land.
    pub fn move_entity(&self, entidx: usize, origin: Vec3) -> Result<usize> {
        let mut guard = self.state.write().map_err(|_| lock_poisoned())?;
        let state = guard.as_mut().ok_or_else(not_published)?;

        let mut entities = state.entities.clone();
        let entity = entities.get_mut(entidx).ok_or_else(|| {
            Error::InvalidWorld(format!("no entity with index {}", entidx))
        })?;
        entity.origin = origin;

        let changed = self.split_locked(state, &entities)?;
        state.entities = entities;
        Ok(changed)
    }

    /// Re-splits a state the caller holds the write lock on
    fn split_locked(&self, state: &mut NavState, entities: &[MapEntity]) -> Result<usize> {
        let mut ctx = BuildContext::new();
        ctx.set_log_level(self.config.log_level);
        ctx.set_timing_enabled(self.config.enable_timing);
        let changed =
            state
                .generator
                .split_entity_leaves(&*self.map, &mut state.mesh, entities, &mut ctx)?;

        if changed > 0 {
            self.resplits.fetch_add(1, Ordering::Relaxed);
            log::debug!(
                "re-split {} leaves, mesh generation now {}",
                changed,
                state.generation()
            );
        }
        Ok(changed)
    }

    /// Entities the published mesh was last split for
    pub fn entities(&self) -> Result<Vec<MapEntity>> {
        let guard = self.read()?;
        Ok(published(&guard)?.entities.clone())
    }

    /// Routable node containing `point`
    pub fn node_at(&self, point: Vec3) -> Result<Option<NodeHandle>> {
        let guard = self.read()?;
        let state = published(&guard)?;
        Ok(state.handle(state.mesh.get_node_idx(&*self.map, point)))
    }

    /// Routable node best covering a box placed at `origin`
    pub fn node_for_box(&self, origin: Vec3, bounds: &Aabb) -> Result<Option<NodeHandle>> {
        let guard = self.read()?;
        let state = published(&guard)?;
        Ok(state.handle(state.mesh.get_node_idx_for_box(&*self.map, origin, bounds)))
    }

    /// A* route between two nodes; empty when there is none
    pub fn find_path(&self, start: NodeHandle, end: NodeHandle) -> Result<Vec<NodeId>> {
        let guard = self.read()?;
        let state = published(&guard)?;
        let (start, end) = (state.resolve(start)?, state.resolve(end)?);
        Ok(state
            .mesh
            .astar_route_with_limit(start, end, self.config.generator.astar_max_iter))
    }

    /// Dijkstra route between two nodes; empty when there is none
    pub fn find_path_dijkstra(&self, start: NodeHandle, end: NodeHandle) -> Result<Vec<NodeId>> {
        let guard = self.read()?;
        let state = published(&guard)?;
        let (start, end) = (state.resolve(start)?, state.resolve(end)?);
        Ok(state.mesh.dijkstra_route(start, end))
    }

    /// A* route between the nodes containing two points
    ///
    /// Both lookups and the search run under one read lock, so no handle can
    /// go stale in between.
    pub fn find_path_between(&self, start: Vec3, end: Vec3) -> Result<Vec<NodeId>> {
        let guard = self.read()?;
        let state = published(&guard)?;
        let start = state.mesh.get_node_idx(&*self.map, start);
        let end = state.mesh.get_node_idx(&*self.map, end);
        if start == NAV_INVALID_IDX || end == NAV_INVALID_IDX {
            return Ok(Vec::new());
        }
        Ok(state
            .mesh
            .astar_route_with_limit(start, end, self.config.generator.astar_max_iter))
    }

    /// Runs `f` against the published mesh under the read lock
    pub fn with_mesh<R>(&self, f: impl FnOnce(&LeafNavMesh) -> R) -> Result<R> {
        let guard = self.read()?;
        Ok(f(&published(&guard)?.mesh))
    }

    pub fn statistics(&self) -> Result<DynamicNavMeshStatistics> {
        let guard = self.read()?;
        let mut stats = DynamicNavMeshStatistics {
            rebuilds: self.rebuilds.load(Ordering::Relaxed),
            resplits: self.resplits.load(Ordering::Relaxed),
            ..Default::default()
        };
        if let Some(state) = guard.as_ref() {
            let mesh = &state.mesh;
            stats.node_count = mesh.len();
            stats.world_leaf_count = mesh.world_leaf_count() as usize;
            stats.split_leaves = mesh.nodes().iter().filter(|n| n.is_split()).count();
            stats.child_nodes = mesh.nodes().iter().filter(|n| n.is_child()).count();
            stats.link_count = mesh.nodes().iter().map(|n| n.links.len()).sum();
            stats.generation = state.generation();
        }
        Ok(stats)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Option<NavState>>> {
        self.state.read().map_err(|_| lock_poisoned())
    }
}

fn not_published() -> Error {
    Error::Generation("no navigation mesh has been published yet".to_string())
}

fn published(state: &Option<NavState>) -> Result<&NavState> {
    state.as_ref().ok_or_else(not_published)
}
