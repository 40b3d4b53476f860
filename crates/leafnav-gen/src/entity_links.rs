//! Nodes and links for ladders and teleporters
//!
//! Ladders become a volume extended upward so the top can be climbed off, and
//! are linked both ways to every world node they touch. A teleport trigger is
//! linked both ways to the world around it and one way to its destinations.
//! Entity links are always free.

use glam::Vec3;
use leafnav::{LeafLink, LeafNavMesh, LeafNode, NodeId, NAV_INVALID_IDX};
use leafnav_common::{Aabb, CollisionMap, EPSILON};

use crate::entity::SF_TELEPORT_RANDOM_DESTINATION;
use crate::generator::{overlap_center, volumes_touch};
use crate::{EntityClass, LeafNavMeshGenerator, MapEntity};

/// Half size of the node made for a teleport destination outside the world
const DESTINATION_HALF_SIZE: f32 = 1.0;

/// Entity indices a teleport sends to
///
/// A teleport with [`SF_TELEPORT_RANDOM_DESTINATION`] may pick any
/// `info_teleport_destination` named by its target; otherwise only the first
/// entity with that name is used.
pub fn teleport_destinations(entities: &[MapEntity], teleport: &MapEntity) -> Vec<usize> {
    let Some(target) = teleport.target.as_deref() else {
        return Vec::new();
    };
    let mut matches = entities
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, e)| e.targetname.as_deref() == Some(target));

    if teleport.has_spawnflag(SF_TELEPORT_RANDOM_DESTINATION) {
        matches
            .filter(|(_, e)| e.class == EntityClass::TeleportDestination)
            .map(|(i, _)| i)
            .collect()
    } else {
        matches.next().map(|(i, _)| i).into_iter().collect()
    }
}

impl LeafNavMeshGenerator {
    /// Adds ladder, teleport and stray destination nodes
    ///
    /// Runs before the world nodes are indexed so the new nodes are indexed
    /// with them. Returns the number of nodes added.
    pub(crate) fn create_entity_nodes<M: CollisionMap + ?Sized>(
        &mut self,
        map: &M,
        mesh: &mut LeafNavMesh,
        entities: &[MapEntity],
    ) -> usize {
        let before = mesh.len();
        let mut destinations = Vec::new();

        for (entidx, entity) in entities.iter().enumerate().skip(1) {
            let bounds = match entity.class {
                EntityClass::Ladder => self.entity_bounds(map, entity).map(|mut b| {
                    b.maxs.z += self.config.ladder_climb_height;
                    b
                }),
                EntityClass::Teleport => {
                    destinations.extend(teleport_destinations(entities, entity));
                    self.entity_bounds(map, entity)
                }
                _ => continue,
            };
            let Some(bounds) = bounds else {
                log::warn!(
                    "{} (entity {}) has no model or box, ignoring it",
                    entity.classname,
                    entidx
                );
                continue;
            };
            let mut node = LeafNode::from_bounds(&bounds);
            node.entidx = entidx;
            mesh.add_node(node);
        }

        destinations.sort_unstable();
        destinations.dedup();
        for entidx in destinations {
            let origin = entities[entidx].origin;
            let inside_world = mesh
                .nodes()
                .iter()
                .any(|n| !n.is_entity() && n.contains_point(origin));
            if inside_world {
                continue;
            }
            let bounds = Aabb::new(
                origin - Vec3::splat(DESTINATION_HALF_SIZE),
                origin + Vec3::splat(DESTINATION_HALF_SIZE),
            );
            let mut node = LeafNode::from_bounds(&bounds);
            node.entidx = entidx;
            mesh.add_node(node);
        }

        mesh.len() - before
    }

    /// World nodes touching an indexed node
    fn touching_world_nodes(&mut self, mesh: &LeafNavMesh, id: NodeId) -> Vec<NodeId> {
        let count = mesh.world_leaf_count();
        let node = &mesh.nodes()[id as usize];
        self.query_nodes(&node.bounds.inflated(EPSILON))
            .into_iter()
            .filter(|&other| other < count && other != id)
            .filter(|&other| {
                let candidate = &mesh.nodes()[other as usize];
                !candidate.is_entity() && volumes_touch(node, candidate)
            })
            .collect()
    }

    /// Unsplit world node containing `point`
    fn world_node_at(&mut self, mesh: &LeafNavMesh, point: Vec3) -> NodeId {
        let point_box = Aabb::new(point, point).inflated(EPSILON);
        self.query_nodes(&point_box)
            .into_iter()
            .find(|&id| {
                let node = &mesh.nodes()[id as usize];
                !node.is_entity() && !node.is_split() && node.contains_point(point)
            })
            .unwrap_or(NAV_INVALID_IDX)
    }

    /// Links entity nodes to the world; returns the number of links added
    pub(crate) fn link_entity_leaves<M: CollisionMap + ?Sized>(
        &mut self,
        _map: &M,
        mesh: &mut LeafNavMesh,
        entities: &[MapEntity],
    ) -> usize {
        let count = mesh.world_leaf_count();
        let mut added = 0;

        for id in 0..count {
            let entidx = mesh.nodes()[id as usize].entidx;
            if entidx == 0 {
                continue;
            }
            let Some(entity) = entities.get(entidx) else {
                log::warn!("node {} refers to missing entity {}", id, entidx);
                continue;
            };

            for other in self.touching_world_nodes(mesh, id) {
                let pos = overlap_center(
                    &mesh.nodes()[id as usize].bounds,
                    &mesh.nodes()[other as usize].bounds,
                );
                added += usize::from(mesh.add_link(id, LeafLink::with_point(other, pos)));
                added += usize::from(mesh.add_link(other, LeafLink::with_point(id, pos)));
            }

            if entity.class != EntityClass::Teleport {
                continue;
            }
            for dest in teleport_destinations(entities, entity) {
                let origin = entities[dest].origin;
                let mut target = self.world_node_at(mesh, origin);
                if target == NAV_INVALID_IDX {
                    target = (0..count)
                        .find(|&n| mesh.nodes()[n as usize].entidx == dest)
                        .unwrap_or(NAV_INVALID_IDX);
                }
                if target == NAV_INVALID_IDX {
                    log::warn!(
                        "teleport {} destination {} has no node",
                        entidx,
                        dest
                    );
                    continue;
                }
                added += usize::from(mesh.add_link(id, LeafLink::with_point(target, origin)));
            }
        }

        added
    }
}
