//! Route search tests
//!
//! Checks A* against Dijkstra on randomised grids and covers the degenerate
//! inputs both searches must reject.

#[cfg(test)]
mod tests {
    use crate::test_mesh_helpers::*;
    use crate::{LeafNavMesh, LeafNode, NodeId, NAV_INVALID_IDX};
    use leafnav_common::Aabb;

    fn assert_contiguous(mesh: &LeafNavMesh, path: &[NodeId]) {
        for pair in path.windows(2) {
            assert!(
                mesh.link_to(pair[0], pair[1]).is_some(),
                "path step {} -> {} has no link",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_route_to_self() {
        let mesh = create_grid_mesh(3, 3, 32.0);
        assert_eq!(mesh.astar_route(4, 4), vec![4]);
        assert_eq!(mesh.dijkstra_route(4, 4), vec![4]);
    }

    #[test]
    fn test_invalid_ids_return_empty() {
        let mesh = create_grid_mesh(2, 2, 32.0);
        assert!(mesh.astar_route(0, 99).is_empty());
        assert!(mesh.astar_route(NAV_INVALID_IDX, 0).is_empty());
        assert!(mesh.dijkstra_route(99, 0).is_empty());

        let empty = LeafNavMesh::new();
        assert!(empty.astar_route(0, 0).is_empty());
    }

    #[test]
    fn test_unreachable_pair_returns_empty() {
        let mut mesh = create_grid_mesh(2, 1, 32.0);
        // A third node far away with no links
        mesh.add_node(LeafNode::from_bounds(&cell_bounds(10, 10, 32.0)));

        assert!(mesh.astar_route(0, 2).is_empty());
        assert!(mesh.dijkstra_route(0, 2).is_empty());
        assert_eq!(mesh.astar_route(0, 1), vec![0, 1]);
    }

    #[test]
    fn test_straight_corridor() {
        let mesh = create_grid_mesh(6, 1, 32.0);
        let path = mesh.astar_route(0, 5);
        assert_eq!(path, vec![0, 1, 2, 3, 4, 5]);
        assert!((mesh.path_cost(&path) - 5.0 * 32.0).abs() < 1e-3);
        assert_eq!(mesh.dijkstra_route(0, 5), path);
    }

    #[test]
    fn test_iteration_cap_gives_empty_path() {
        let mesh = create_grid_mesh(20, 1, 32.0);
        assert!(mesh.astar_route_with_limit(0, 19, 5).is_empty());
        assert_eq!(mesh.astar_route_with_limit(0, 19, 100).len(), 20);
    }

    #[test]
    fn test_expensive_link_is_avoided() {
        // 0 - 1
        // |   |
        // 2 - 3
        let mut mesh = create_grid_mesh(2, 2, 32.0);
        if let Some(node) = mesh.node_mut(0) {
            for link in &mut node.links {
                if link.node == 1 {
                    link.base_cost = 1000.0;
                }
            }
        }

        let path = mesh.astar_route(0, 1);
        assert_eq!(path, vec![0, 2, 3, 1]);
        assert_eq!(mesh.dijkstra_route(0, 1), path);
    }

    #[test]
    fn test_split_parents_are_skipped() {
        let mut mesh = create_grid_mesh(3, 1, 32.0);

        // Split the middle node: give it a child that is not linked to anything
        let child = mesh.add_node(LeafNode::from_bounds(&cell_bounds(1, 0, 32.0)));
        if let Some(node) = mesh.node_mut(child) {
            node.parent_idx = 1;
        }
        if let Some(node) = mesh.node_mut(1) {
            node.child_idx = child;
            node.child_count = 1;
        }
        assert!(mesh.validate());

        assert!(mesh.astar_route(0, 2).is_empty());
        assert!(mesh.dijkstra_route(0, 2).is_empty());

        // Linking the child restores the route through it
        link_shared(&mut mesh, 0, child);
        link_shared(&mut mesh, child, 2);
        assert_eq!(mesh.astar_route(0, 2), vec![0, child, 2]);
        assert_eq!(mesh.dijkstra_route(0, 2), vec![0, child, 2]);
    }

    #[test]
    fn test_blocked_nodes_are_skipped() {
        let mut mesh = create_grid_mesh(3, 1, 32.0);
        if let Some(node) = mesh.node_mut(1) {
            node.blocked = true;
        }
        assert!(mesh.validate());
        assert!(mesh.astar_route(0, 2).is_empty());
        assert!(mesh.dijkstra_route(0, 2).is_empty());
        assert!(mesh.astar_route(0, 1).is_empty());

        // A blocked node with children is malformed
        if let Some(node) = mesh.node_mut(1) {
            node.child_idx = 2;
            node.child_count = 1;
        }
        assert!(!mesh.validate());
    }

    #[test]
    fn test_astar_matches_dijkstra_on_random_grids() {
        let mut rng = fastrand::Rng::with_seed(7);
        let mesh = create_random_grid_mesh(&mut rng, 12, 12, 0.15);
        let len = mesh.len() as NodeId;

        let mut checked = 0;
        let mut attempts = 0;
        while checked < 100 && attempts < 10_000 {
            attempts += 1;
            let start = rng.u32(0..len);
            let end = rng.u32(0..len);

            let dijkstra = mesh.dijkstra_route(start, end);
            let astar = mesh.astar_route(start, end);
            if dijkstra.is_empty() {
                assert!(astar.is_empty(), "A* found a route Dijkstra missed");
                continue;
            }

            assert_eq!(astar.first(), Some(&start));
            assert_eq!(astar.last(), Some(&end));
            assert_contiguous(&mesh, &astar);
            assert_contiguous(&mesh, &dijkstra);

            let a = mesh.path_cost(&astar);
            let d = mesh.path_cost(&dijkstra);
            assert!(
                (a - d).abs() <= 1e-3 * d.max(1.0),
                "A* cost {} differs from Dijkstra cost {} for {} -> {}",
                a,
                d,
                start,
                end
            );
            checked += 1;
        }
        assert_eq!(checked, 100);
    }

    #[test]
    fn test_path_cost_of_unlinked_steps_is_infinite() {
        let mut mesh = create_grid_mesh(3, 1, 32.0);
        mesh.add_node(LeafNode::from_bounds(&Aabb::new(
            glam::Vec3::splat(500.0),
            glam::Vec3::splat(510.0),
        )));
        assert!(mesh.path_cost(&[0, 3]).is_infinite());
        assert_eq!(mesh.path_cost(&[1]), 0.0);

        add_costed_link(&mut mesh, 2, 3, 10.0, 2.0);
        let expected = 10.0 + 2.0 * mesh.nodes()[2].origin.distance(mesh.nodes()[3].origin);
        assert!((mesh.path_cost(&[2, 3]) - expected).abs() < 1e-3);
        assert_eq!(mesh.astar_route(0, 3), vec![0, 1, 2, 3]);
    }
}
