//! A* and Dijkstra route search over the leaf graph
//!
//! Both searches skip nodes that have been split (other than the start node),
//! since only their children take part in routing.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::{LeafNavMesh, NodeId, NAV_INVALID_IDX};

/// Maximum number of nodes A* expands before giving up
pub const ASTAR_MAX_ITER: usize = 8192;

/// Open list entry for the binary heap (priority queue)
#[derive(Debug, Clone, Copy)]
struct HeapNode {
    id: NodeId,
    /// Priority (f for A*, accumulated cost for Dijkstra)
    cost: f32,
}

impl PartialEq for HeapNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapNode {}

impl PartialOrd for HeapNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (lowest cost first), NaN sorts last
        let by_cost = match other.cost.partial_cmp(&self.cost) {
            Some(ordering) => ordering,
            None => {
                if other.cost.is_nan() && !self.cost.is_nan() {
                    Ordering::Greater
                } else if !other.cost.is_nan() && self.cost.is_nan() {
                    Ordering::Less
                } else {
                    Ordering::Equal
                }
            }
        };
        by_cost.then_with(|| other.id.cmp(&self.id))
    }
}

impl LeafNavMesh {
    /// Shortest route from `start` to `end` using A*
    ///
    /// The heuristic is the straight-line distance between node anchors, which
    /// never overestimates since every link costs at least that distance.
    /// Returns an empty path when there is no route or the iteration cap is hit.
    pub fn astar_route(&self, start: NodeId, end: NodeId) -> Vec<NodeId> {
        self.astar_route_with_limit(start, end, ASTAR_MAX_ITER)
    }

    /// [`LeafNavMesh::astar_route`] with a custom expansion cap
    pub fn astar_route_with_limit(
        &self,
        start: NodeId,
        end: NodeId,
        max_iter: usize,
    ) -> Vec<NodeId> {
        let Some(goal) = self.node(end) else {
            log::warn!("astar_route: invalid end node {}", end);
            return Vec::new();
        };
        if !self.is_valid_id(start) {
            log::warn!("astar_route: invalid start node {}", start);
            return Vec::new();
        }
        if start == end {
            return vec![start];
        }

        let goal_pos = goal.origin;
        let heuristic = |id: NodeId| self.nodes()[id as usize].origin.distance(goal_pos);

        let n = self.len();
        let mut g = vec![f32::INFINITY; n];
        let mut previous = vec![NAV_INVALID_IDX; n];
        let mut closed = vec![false; n];
        let mut open = BinaryHeap::new();

        g[start as usize] = 0.0;
        open.push(HeapNode {
            id: start,
            cost: heuristic(start),
        });

        let mut iterations = 0;
        while let Some(HeapNode { id, .. }) = open.pop() {
            let current = id as usize;
            if closed[current] {
                continue;
            }

            iterations += 1;
            if iterations > max_iter {
                log::warn!(
                    "astar_route: gave up after {} iterations ({} -> {})",
                    max_iter,
                    start,
                    end
                );
                return Vec::new();
            }

            if id == end {
                return reconstruct(&previous, start, end);
            }
            closed[current] = true;

            let node = &self.nodes()[current];
            for link in &node.links {
                let next = link.node as usize;
                if next >= n || closed[next] || self.nodes()[next].is_split() {
                    continue;
                }
                let tentative = g[current] + self.edge_cost(id, link);
                if tentative < g[next] {
                    g[next] = tentative;
                    previous[next] = id;
                    open.push(HeapNode {
                        id: link.node,
                        cost: tentative + heuristic(link.node),
                    });
                }
            }
        }

        log::debug!("astar_route: no route from {} to {}", start, end);
        Vec::new()
    }

    /// Shortest route from `start` to `end` using Dijkstra's algorithm
    pub fn dijkstra_route(&self, start: NodeId, end: NodeId) -> Vec<NodeId> {
        if !self.is_valid_id(start) || !self.is_valid_id(end) {
            log::warn!("dijkstra_route: invalid node ids {} -> {}", start, end);
            return Vec::new();
        }
        if start == end {
            return vec![start];
        }

        let n = self.len();
        let mut dist = vec![f32::INFINITY; n];
        let mut previous = vec![NAV_INVALID_IDX; n];
        let mut queue = BinaryHeap::new();

        dist[start as usize] = 0.0;
        queue.push(HeapNode { id: start, cost: 0.0 });

        while let Some(HeapNode { id, cost }) = queue.pop() {
            let current = id as usize;
            if cost > dist[current] {
                continue;
            }
            if id == end {
                return reconstruct(&previous, start, end);
            }

            for link in &self.nodes()[current].links {
                let next = link.node as usize;
                if next >= n || self.nodes()[next].is_split() {
                    continue;
                }
                let alt = cost + self.edge_cost(id, link);
                if alt < dist[next] {
                    dist[next] = alt;
                    previous[next] = id;
                    queue.push(HeapNode {
                        id: link.node,
                        cost: alt,
                    });
                }
            }
        }

        log::debug!("dijkstra_route: {} is unreachable from {}", end, start);
        Vec::new()
    }
}

/// Walks the predecessor array back from `end`
fn reconstruct(previous: &[NodeId], start: NodeId, end: NodeId) -> Vec<NodeId> {
    let mut path = vec![end];
    let mut current = end;
    while current != start {
        current = previous[current as usize];
        if current == NAV_INVALID_IDX || path.len() > previous.len() {
            log::error!("route reconstruction broke at node {}", path[path.len() - 1]);
            return Vec::new();
        }
        path.push(current);
    }
    path.reverse();
    path
}
