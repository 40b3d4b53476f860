//! Arena bookkeeping and point lookup tests

#[cfg(test)]
mod tests {
    use crate::test_mesh_helpers::*;
    use crate::{LeafNavMesh, LeafNode, NodeId, SplitEntity, NAV_INVALID_IDX};
    use glam::Vec3;
    use leafnav_common::{Aabb, CollisionMap};

    /// Splits `parent` into two halves along x and links them like the generator would
    fn split_in_half(mesh: &mut LeafNavMesh, parent: NodeId) -> (NodeId, NodeId) {
        let bounds = mesh.nodes()[parent as usize].bounds;
        let mid = bounds.center().x;
        let left = Aabb::new(bounds.mins, Vec3::new(mid, bounds.maxs.y, bounds.maxs.z));
        let right = Aabb::new(Vec3::new(mid, bounds.mins.y, bounds.mins.z), bounds.maxs);

        let mut a = LeafNode::from_bounds(&left);
        a.parent_idx = parent;
        let mut b = LeafNode::from_bounds(&right);
        b.parent_idx = parent;
        let a = mesh.add_node(a);
        let b = mesh.add_node(b);

        if let Some(node) = mesh.node_mut(parent) {
            node.child_idx = a;
            node.child_count = 2;
            node.split_state = vec![SplitEntity {
                entidx: 1,
                origin: Vec3::ZERO,
            }];
        }
        link_shared(mesh, a, b);
        let neighbours: Vec<NodeId> = mesh.nodes()[parent as usize]
            .links
            .iter()
            .map(|l| l.node)
            .collect();
        for n in neighbours {
            link_shared(mesh, a, n);
            link_shared(mesh, b, n);
        }
        (a, b)
    }

    #[test]
    fn test_add_link_rejects_duplicates_and_self_links() {
        let mut mesh = create_grid_mesh(2, 1, 32.0);
        assert_eq!(mesh.nodes()[0].links.len(), 1);

        link_shared(&mut mesh, 0, 1);
        assert_eq!(mesh.nodes()[0].links.len(), 1);
        assert!(!mesh.add_link(0, crate::LeafLink::with_point(0, Vec3::ZERO)));
        assert!(!mesh.add_link(0, crate::LeafLink::with_point(7, Vec3::ZERO)));
    }

    #[test]
    fn test_grid_links_carry_shared_face() {
        let mesh = create_grid_mesh(2, 1, 32.0);
        let link = mesh.link_to(0, 1).expect("neighbours are linked");
        assert!((link.link_area.area - 32.0 * 32.0).abs() < 1e-2);
        assert!((link.pos - Vec3::new(32.0, 16.0, 16.0)).length() < 1e-3);
        assert_eq!(link.base_cost, 0.0);
        assert!(mesh.validate());
    }

    #[test]
    fn test_remove_range_shifts_ids() {
        let mut mesh = create_grid_mesh(5, 1, 32.0);
        let generation = mesh.generation();

        mesh.remove_range(1, 2);
        assert_eq!(mesh.len(), 3);
        assert!(mesh.generation() > generation);
        assert_eq!(mesh.world_leaf_count(), 3);

        // Old 3 and 4 are now 1 and 2, and old 0 lost its only link
        assert!(mesh.nodes()[0].links.is_empty());
        assert!(mesh.link_to(1, 2).is_some());
        assert!(mesh.link_to(2, 1).is_some());
        assert_eq!(mesh.nodes()[1].links.len(), 1);
        for (i, node) in mesh.nodes().iter().enumerate() {
            assert_eq!(node.id as usize, i);
        }
        assert_eq!(mesh.leaf_nodes(3), &[1]);
        assert!(mesh.leaf_nodes(1).is_empty());
        assert!(mesh.validate());
    }

    #[test]
    fn test_remove_range_out_of_bounds_is_ignored() {
        let mut mesh = create_grid_mesh(2, 1, 32.0);
        let generation = mesh.generation();
        mesh.remove_range(1, 5);
        mesh.remove_range(0, 0);
        assert_eq!(mesh.len(), 2);
        assert_eq!(mesh.generation(), generation);
    }

    #[test]
    fn test_removing_children_restores_parent() {
        let mut mesh = create_grid_mesh(3, 1, 32.0);
        let before: Vec<Vec<NodeId>> = mesh
            .nodes()
            .iter()
            .map(|n| n.links.iter().map(|l| l.node).collect())
            .collect();

        let (a, b) = split_in_half(&mut mesh, 1);
        assert_eq!((a, b), (3, 4));
        assert!(mesh.validate());
        assert!(mesh.is_split(1));
        assert_eq!(mesh.leaf_count(), 4);
        assert_eq!(mesh.astar_route(0, 2), vec![0, 3, 4, 2]);

        mesh.remove_range(a, 2);
        assert!(!mesh.is_split(1));
        assert!(mesh.nodes()[1].split_state.is_empty());
        let after: Vec<Vec<NodeId>> = mesh
            .nodes()
            .iter()
            .map(|n| n.links.iter().map(|l| l.node).collect())
            .collect();
        assert_eq!(before, after);
        assert!(mesh.validate());
        assert_eq!(mesh.astar_route(0, 2), vec![0, 1, 2]);
    }

    #[test]
    fn test_validate_reports_broken_structure() {
        let mut mesh = create_grid_mesh(2, 1, 32.0);
        assert!(mesh.validate());

        if let Some(node) = mesh.node_mut(0) {
            node.parent_idx = 1;
            node.child_idx = 1;
            node.child_count = 1;
        }
        assert!(!mesh.validate());

        let mut mesh = create_grid_mesh(2, 1, 32.0);
        if let Some(node) = mesh.node_mut(1) {
            node.links[0].node = 40;
        }
        assert!(!mesh.validate());

        let mut mesh = create_grid_mesh(2, 1, 32.0);
        if let Some(node) = mesh.node_mut(0) {
            node.links[0].cost_multiplier = 0.5;
        }
        assert!(!mesh.validate());
    }

    #[test]
    fn test_point_lookup_through_leaf_map() {
        let map = GridMap {
            w: 3,
            h: 2,
            cell: 32.0,
        };
        let mut mesh = create_grid_mesh(3, 2, 32.0);

        assert_eq!(mesh.get_node_idx(&map, Vec3::new(40.0, 10.0, 5.0)), 1);
        assert_eq!(mesh.get_node_idx(&map, Vec3::new(90.0, 50.0, 5.0)), 5);
        assert_eq!(
            mesh.get_node_idx(&map, Vec3::new(-10.0, 10.0, 5.0)),
            NAV_INVALID_IDX
        );

        // Lookups descend into children once a node is split
        let (a, b) = split_in_half(&mut mesh, 1);
        assert_eq!(mesh.get_node_idx(&map, Vec3::new(40.0, 10.0, 5.0)), a);
        assert_eq!(mesh.get_node_idx(&map, Vec3::new(60.0, 10.0, 5.0)), b);
        assert!(map.point_leaf(Vec3::new(60.0, 10.0, 5.0)).is_some());
    }

    #[test]
    fn test_box_lookup() {
        let map = GridMap {
            w: 2,
            h: 1,
            cell: 32.0,
        };
        let mesh = create_grid_mesh(2, 1, 32.0);

        let inside = Aabb::new(Vec3::new(40.0, 4.0, 4.0), Vec3::new(50.0, 10.0, 10.0));
        assert_eq!(
            mesh.get_node_idx_for_box(&map, inside.center(), &inside),
            1
        );

        // Origin, centre and every corner outside the world, but the box still cuts node 0
        let straddling = Aabb::new(Vec3::new(10.0, -40.0, -8.0), Vec3::new(20.0, 20.0, 40.0));
        let origin = Vec3::new(15.0, -40.0, -8.0);
        assert_eq!(
            mesh.get_node_idx_for_box(&map, origin, &straddling),
            0
        );

        let far = Aabb::new(Vec3::splat(500.0), Vec3::splat(510.0));
        assert_eq!(
            mesh.get_node_idx_for_box(&map, far.center(), &far),
            NAV_INVALID_IDX
        );
    }
}
