//! Full rebuilds on a worker thread
//!
//! A rebuild generates a fresh mesh from scratch without holding any lock,
//! then takes the write lock once to swap it in. Readers keep using the old
//! mesh until that moment.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use leafnav_common::{CollisionMap, Error, Result};
use leafnav_gen::{BuildContext, LeafNavMeshGenerator, LogLevel, MapEntity, TimerCategory};

use crate::config::DynamicNavMeshConfig;
use crate::dynamic_navmesh::{lock_poisoned, NavState, SharedState};

/// What a finished rebuild published
#[derive(Debug, Clone)]
pub struct RebuildSummary {
    pub node_count: usize,
    pub link_count: usize,
    /// Leaves split around brush entities after generation
    pub split_changes: usize,
    /// Generation of the published mesh
    pub generation: u64,
    /// Time spent in `generate`, if timing was enabled
    pub build_time: Option<Duration>,
    /// Warnings and errors the build context recorded
    pub warnings: usize,
}

/// A rebuild running on its own thread
///
/// Dropping the handle does not stop the rebuild; the mesh is still
/// published when it finishes.
#[derive(Debug)]
pub struct RebuildHandle {
    receiver: Receiver<Result<RebuildSummary>>,
    worker: Option<JoinHandle<()>>,
}

impl RebuildHandle {
    /// Blocks until the rebuild has finished and been published
    pub fn wait(mut self) -> Result<RebuildSummary> {
        match self.receiver.recv() {
            Ok(result) => {
                self.join()?;
                result
            }
            Err(_) => {
                self.join()?;
                Err(Error::Concurrency(
                    "rebuild worker exited without reporting".to_string(),
                ))
            }
        }
    }

    /// Result of the rebuild, or `None` while it is still running
    pub fn try_wait(&mut self) -> Option<Result<RebuildSummary>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(self.join().and(result)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(self.join().and(Err(Error::Concurrency(
                "rebuild worker exited without reporting".to_string(),
            )))),
        }
    }

    fn join(&mut self) -> Result<()> {
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| Error::Concurrency("rebuild worker panicked".to_string()))?;
        }
        Ok(())
    }
}

/// Starts a rebuild of `map` that publishes into `state`
pub(crate) fn spawn<M>(
    map: Arc<M>,
    config: DynamicNavMeshConfig,
    entities: Vec<MapEntity>,
    state: SharedState,
) -> Result<RebuildHandle>
where
    M: CollisionMap + Send + Sync + 'static,
{
    let (sender, receiver) = mpsc::channel();
    let worker = thread::Builder::new()
        .name("leafnav-rebuild".to_string())
        .spawn(move || {
            let result = rebuild(&*map, &config, entities, &state);
            if let Err(err) = &result {
                log::error!("navigation mesh rebuild failed: {}", err);
            }
            // The handle may already be gone
            let _ = sender.send(result);
        })?;

    Ok(RebuildHandle {
        receiver,
        worker: Some(worker),
    })
}

fn rebuild<M: CollisionMap + ?Sized>(
    map: &M,
    config: &DynamicNavMeshConfig,
    entities: Vec<MapEntity>,
    state: &SharedState,
) -> Result<RebuildSummary> {
    let mut ctx = BuildContext::new();
    ctx.set_log_level(config.log_level);
    ctx.set_timing_enabled(config.enable_timing);

    let mut generator = LeafNavMeshGenerator::new(config.generator.clone());
    let mut mesh = generator.generate(map, &entities, &mut ctx)?;
    let split_changes = if config.split_on_rebuild {
        generator.split_entity_leaves(map, &mut mesh, &entities, &mut ctx)?
    } else {
        0
    };

    let node_count = mesh.len();
    let link_count = mesh.nodes().iter().map(|n| n.links.len()).sum();
    let build_time = ctx.get_timer_duration(&TimerCategory::Total);
    let warnings = ctx
        .get_logs()
        .iter()
        .filter(|entry| entry.level >= LogLevel::Warning)
        .count();

    let mut guard = state.write().map_err(|_| lock_poisoned())?;
    // Generations keep increasing across rebuilds so older handles never match
    let base_generation = guard.as_ref().map_or(0, |s| s.generation() + 1);
    let next = NavState {
        mesh,
        generator,
        entities,
        base_generation,
    };
    let generation = next.generation();
    *guard = Some(next);
    drop(guard);

    log::info!(
        "published navigation mesh generation {}: {} nodes, {} links",
        generation,
        node_count,
        link_count
    );
    Ok(RebuildSummary {
        node_count,
        link_count,
        split_changes,
        generation,
        build_time,
        warnings,
    })
}
