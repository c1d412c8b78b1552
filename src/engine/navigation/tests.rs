//! Tests for grid mutation, cluster growth and two-level route search.

use super::*;
use crate::engine::error::NavError;
use crate::engine::fixed_math::{diagonal_step, FixedNum};
use crate::engine::region::RegionRegistry;
use bevy::math::IVec2;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn cell(x: i32, y: i32) -> GridPoint {
    GridPoint::new(x, y)
}

fn close_to(value: FixedNum, expected: f64) -> bool {
    (value - FixedNum::from_num(expected)).abs() < FixedNum::from_num(0.01)
}

/// Registry with a single region built from an ASCII layout.
fn single_region(layout: &str, connectivity: Connectivity) -> (RegionRegistry, RegionId) {
    let grid = NavigationGrid::from_ascii(layout, connectivity).expect("valid layout");
    let mut registry = RegionRegistry::new();
    let id = registry.create_region(grid);
    (registry, id)
}

// ============================================================================
// NavigationGrid
// ============================================================================

#[test]
fn test_grid_bounds_and_costs() {
    let mut grid = NavigationGrid::new(3, 2, Connectivity::Eight);
    assert!(grid.at(2, 1).is_ok());
    assert!(matches!(grid.at(3, 0), Err(NavError::OutOfBounds { x: 3, y: 0, .. })));
    assert!(matches!(grid.at(0, -1), Err(NavError::OutOfBounds { .. })));

    grid.set_cost(1, 1, FixedNum::from_num(4)).expect("in bounds");
    assert_eq!(grid.at(1, 1).expect("in bounds").weight, FixedNum::from_num(4));

    let err = grid.set_cost(1, 1, FixedNum::from_num(-1)).unwrap_err();
    assert!(matches!(err, NavError::InvalidCost(_)));
    assert_eq!(grid.at(1, 1).expect("in bounds").weight, FixedNum::from_num(4));

    grid.set_traversable(0, 0, false).expect("in bounds");
    assert!(!grid.is_traversable(cell(0, 0)));
    assert!(!grid.is_traversable(cell(-1, 0)));

    grid.set_cost(2, 0, FixedNum::from_num(BLOCKED_WEIGHT)).expect("in bounds");
    assert!(!grid.is_traversable(cell(2, 0)), "blocked sentinel weight");
}

#[test]
fn test_from_weights_checks_length() {
    let err = NavigationGrid::from_weights(2, 2, Connectivity::Four, &[1, 1, 1]).unwrap_err();
    assert!(matches!(err, NavError::MismatchedSizes { expected: 4, found: 3 }));

    let grid = NavigationGrid::from_weights(2, 2, Connectivity::Four, &[1, 10_000, 3, 1]).expect("sizes match");
    assert!(!grid.is_traversable(cell(1, 0)));
    assert_eq!(grid.weight(cell(0, 1)), FixedNum::from_num(3));
    assert_eq!(grid.traversable_count(), 3);
}

#[test]
fn test_constructed_grids_are_well_formed() {
    assert!(NavigationGrid::new(5, 3, Connectivity::Eight).is_well_formed());
    assert!(NavigationGrid::new(0, 0, Connectivity::Four).is_well_formed());
    let grid = NavigationGrid::from_ascii("#.\n..", Connectivity::Eight).expect("rectangular");
    assert!(grid.is_well_formed());
}

#[test]
fn test_diagonal_moves_never_cut_corners() {
    let grid = NavigationGrid::from_ascii(
        "..\n\
         #.",
        Connectivity::Eight,
    )
    .expect("valid layout");

    let from_origin = grid.neighbors(cell(0, 0));
    assert!(!from_origin.contains(&cell(1, 1)), "(0,1) is blocked so the diagonal is illegal");
    assert!(from_origin.contains(&cell(1, 0)));

    let four = NavigationGrid::new(3, 3, Connectivity::Four);
    assert_eq!(four.neighbors(cell(1, 1)).len(), 4);
    let eight = NavigationGrid::new(3, 3, Connectivity::Eight);
    assert_eq!(eight.neighbors(cell(1, 1)).len(), 8);
}

#[test]
fn test_step_cost_averages_weights() {
    let grid = NavigationGrid::from_weights(2, 2, Connectivity::Eight, &[1, 3, 5, 1]).expect("sizes match");
    assert_eq!(grid.step_cost(cell(0, 0), cell(1, 0)), FixedNum::from_num(2));
    assert_eq!(grid.step_cost(cell(0, 0), cell(1, 1)), diagonal_step());
    assert_eq!(grid.min_traversable_weight(), FixedNum::ONE);
}

#[test]
fn test_blocker_distances() {
    let mut grid = NavigationGrid::from_ascii(
        "#....\n\
         .....",
        Connectivity::Eight,
    )
    .expect("valid layout");
    grid.recompute_blocker_distances();

    assert_eq!(grid.at(0, 0).expect("in bounds").blocker_dist, 0);
    assert_eq!(grid.at(1, 1).expect("in bounds").blocker_dist, 1);
    assert_eq!(grid.at(4, 0).expect("in bounds").blocker_dist, 4);

    let mut open = NavigationGrid::new(2, 2, Connectivity::Eight);
    open.recompute_blocker_distances();
    assert!(open.cells().iter().all(|c| c.blocker_dist == u32::MAX));
}

// ============================================================================
// ClusterGreenhouse
// ============================================================================

#[test]
fn test_open_grid_clusters_cover_every_cell() {
    let grid = NavigationGrid::new(20, 20, Connectivity::Eight);
    let set = ClusterGreenhouse::new(&grid).build();

    assert_eq!(set.clustered_cell_count(), 400);
    assert!(set.clusters().iter().all(|c| c.len() <= DEFAULT_MAX_CLUSTER_SIZE));
    assert_eq!(set.clusters()[0].seed(), cell(0, 0));

    // Every cell maps back to the cluster listing it.
    for cluster in set.clusters() {
        for &c in cluster.cells() {
            assert_eq!(set.cluster_of(c), Some(cluster.id()));
        }
    }
}

#[test]
fn test_open_eight_connected_first_cluster_is_a_square() {
    let grid = NavigationGrid::new(10, 10, Connectivity::Eight);
    let set = ClusterGreenhouse::new(&grid).build();
    let first = &set.clusters()[0];

    assert_eq!(first.len(), 64);
    assert!(first.cells().iter().all(|c| c.x < 8 && c.y < 8));
    assert_eq!(first.centroid().x, FixedNum::from_num(3.5));
    assert!(first.cells().contains(&first.representative()));
}

#[test]
fn test_isolated_cells_stay_unclustered() {
    let grid = NavigationGrid::from_ascii(
        ".#..\n\
         ##..",
        Connectivity::Eight,
    )
    .expect("valid layout");
    let set = ClusterGreenhouse::new(&grid).build();

    assert_eq!(set.cluster_of(cell(0, 0)), None);
    assert_eq!(set.cluster_of(cell(1, 0)), None, "blocked");
    assert!(set.cluster_of(cell(2, 0)).is_some());
    assert_eq!(set.len(), 1);
}

#[test]
fn test_anchored_isolated_cell_becomes_singleton() {
    let grid = NavigationGrid::from_ascii(
        ".#..\n\
         ##..",
        Connectivity::Eight,
    )
    .expect("valid layout");
    let set = ClusterGreenhouse::new(&grid)
        .with_anchors([cell(0, 0), cell(1, 0), cell(9, 9)])
        .build();

    let lone = set.cluster_of(cell(0, 0)).expect("anchored cell is clustered");
    assert_eq!(set.get(lone).map(|c| c.len()), Some(1));
    assert!(set.neighbors(lone).is_empty());
    assert_eq!(set.cluster_of(cell(1, 0)), None, "blocked anchors are ignored");
    assert_eq!(set.len(), 2);
    assert_eq!(set.clustered_cell_count(), 5);
}

#[test]
fn test_no_traversable_cells_gives_empty_set() {
    let grid = NavigationGrid::filled(4, 4, Connectivity::Eight, NavigationGridData::blocked());
    let set = ClusterGreenhouse::new(&grid).build();
    assert!(set.is_empty());
    assert_eq!(set.clustered_cell_count(), 0);
}

#[test]
fn test_cluster_size_cap_and_adjacency() {
    let grid = NavigationGrid::new(6, 1, Connectivity::Four);
    let set = ClusterGreenhouse::new(&grid).with_max_cluster_size(Some(2)).build();

    assert_eq!(set.len(), 3);
    assert_eq!(set.clusters()[1].cells(), &[cell(2, 0), cell(3, 0)]);
    assert_eq!(set.neighbors(ClusterId(1)), &[ClusterId(0), ClusterId(2)]);
    assert!(set.are_adjacent(ClusterId(0), ClusterId(1)));
    assert!(!set.are_adjacent(ClusterId(0), ClusterId(2)));

    let whole = ClusterGreenhouse::new(&grid).with_max_cluster_size(None).build();
    assert_eq!(whole.len(), 1);
}

#[test]
fn test_walls_split_clusters() {
    let grid = NavigationGrid::from_ascii(
        "..#..\n\
         ..#..",
        Connectivity::Eight,
    )
    .expect("valid layout");
    let set = ClusterGreenhouse::new(&grid).build();

    assert_eq!(set.len(), 2);
    assert!(set.neighbors(ClusterId(0)).is_empty());
    assert_ne!(set.cluster_of(cell(0, 0)), set.cluster_of(cell(4, 0)));
}

#[test]
fn test_weighted_growth_is_disjoint_and_seeded() {
    let grid = NavigationGrid::new(30, 30, Connectivity::Eight);
    let greenhouse = ClusterGreenhouse::new(&grid);

    let mut rng = StdRng::seed_from_u64(7);
    let sets = greenhouse.grow_weighted(&[0.2, 0.1, 0.04], &mut rng);
    assert_eq!(sets.len(), 3);

    let total: usize = sets.iter().map(|s| s.len()).sum();
    let mut all: std::collections::BTreeSet<GridPoint> = std::collections::BTreeSet::new();
    for set in &sets {
        assert!(!set.is_empty());
        all.extend(set.iter().copied());
    }
    assert_eq!(all.len(), total, "clusters must not share points");
    assert!(all.iter().all(|p| grid.in_bounds(*p)));

    let mut again = StdRng::seed_from_u64(7);
    assert_eq!(greenhouse.grow_weighted(&[0.2, 0.1, 0.04], &mut again), sets);
}

#[test]
fn test_weighted_growth_invents_frequencies() {
    let grid = NavigationGrid::new(16, 16, Connectivity::Eight);
    let mut rng = StdRng::seed_from_u64(99);
    let sets = ClusterGreenhouse::new(&grid).grow_weighted(&[], &mut rng);
    assert!((4..8).contains(&sets.len()));
}

// ============================================================================
// Pathfinder, single region
// ============================================================================

#[test]
fn test_open_grid_diagonal_route() {
    let (registry, id) = single_region("...\n...\n...", Connectivity::Eight);
    let route = Pathfinder::default()
        .find_path(&registry, &PathRequest::within(id, cell(0, 0), cell(2, 2)))
        .expect("open grid");

    let cells: Vec<GridPoint> = route.waypoints.iter().map(|w| w.cell).collect();
    assert_eq!(cells, vec![cell(0, 0), cell(1, 1), cell(2, 2)]);
    assert!(close_to(route.cost, 2.0 * std::f64::consts::SQRT_2));
}

#[test]
fn test_blocked_centre_forces_detour() {
    let (registry, id) = single_region("...\n.#.\n...", Connectivity::Eight);
    let route = Pathfinder::default()
        .find_path(&registry, &PathRequest::within(id, cell(0, 0), cell(2, 2)))
        .expect("detour exists");

    assert!(route.len() > 3);
    assert!(route.waypoints.iter().all(|w| w.cell != cell(1, 1)));
    assert_eq!(route.first().map(|w| w.cell), Some(cell(0, 0)));
    assert_eq!(route.last().map(|w| w.cell), Some(cell(2, 2)));
    assert!(close_to(route.cost, 4.0));
}

#[test]
fn test_route_steps_are_legal_moves() {
    let layout = "\
        ..........\n\
        .########.\n\
        .#......#.\n\
        .#.####.#.\n\
        .#.#..#.#.\n\
        .#.#..#.#.\n\
        .#....#...\n\
        .######.#.\n\
        ........#.\n\
        ..........";
    let (registry, id) = single_region(layout, Connectivity::Eight);
    let region = registry.get(id).expect("registered");
    let route = Pathfinder::default()
        .find_path(&registry, &PathRequest::within(id, cell(0, 0), cell(4, 4)))
        .expect("maze is solvable");

    for pair in route.waypoints.windows(2) {
        assert!(region.grid().neighbors(pair[0].cell).contains(&pair[1].cell));
    }
    assert_eq!(route.last().map(|w| w.cell), Some(cell(4, 4)));
}

#[test]
fn test_invalid_endpoints_rejected() {
    let (registry, id) = single_region("..#\n...", Connectivity::Eight);
    let finder = Pathfinder::default();

    let blocked_goal = finder.find_path(&registry, &PathRequest::within(id, cell(0, 0), cell(2, 0)));
    assert!(matches!(blocked_goal, Err(NavError::InvalidRequest(_))));

    let outside = finder.find_path(&registry, &PathRequest::within(id, cell(-1, 0), cell(1, 1)));
    assert!(matches!(outside, Err(NavError::InvalidRequest(_))));

    let unknown = finder.find_path(&registry, &PathRequest::within(RegionId(42), cell(0, 0), cell(1, 1)));
    assert!(matches!(unknown, Err(NavError::InvalidRequest(_))));
}

#[test]
fn test_walled_off_goal_is_unreachable() {
    let (registry, id) = single_region("..#..\n..#..", Connectivity::Eight);
    let err = Pathfinder::default()
        .find_path(&registry, &PathRequest::within(id, cell(0, 0), cell(4, 1)))
        .unwrap_err();
    assert!(err.is_unreachable());
}

#[test]
fn test_start_equals_goal_single_waypoint() {
    // (0,0) is isolated but a zero-length request still succeeds.
    let (registry, id) = single_region(".#\n##", Connectivity::Eight);
    let route = Pathfinder::default()
        .find_path(&registry, &PathRequest::within(id, cell(0, 0), cell(0, 0)))
        .expect("trivial route");
    assert_eq!(route.len(), 1);
    assert_eq!(route.cost, FixedNum::ZERO);
}

#[test]
fn test_route_spanning_many_clusters() {
    let grid = NavigationGrid::new(40, 40, Connectivity::Eight);
    let mut registry = RegionRegistry::new();
    let id = registry.create_region(grid);

    let route = Pathfinder::default()
        .find_path(&registry, &PathRequest::within(id, cell(0, 0), cell(39, 0)))
        .expect("open grid");
    assert!(registry.get(id).expect("registered").clusters().len() > 10);
    assert_eq!(route.len(), 40);
    assert!(close_to(route.cost, 39.0));
}

#[test]
fn test_batch_results_are_index_aligned() {
    let (registry, id) = single_region("...\n.#.\n...", Connectivity::Eight);
    let requests = [
        PathRequest::within(id, cell(0, 0), cell(2, 0)),
        PathRequest::within(id, cell(0, 0), cell(1, 1)),
        PathRequest::within(id, cell(2, 2), cell(0, 2)),
    ];
    let results = Pathfinder::default().find_paths(&registry, &requests);

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(NavError::InvalidRequest(_))));
    assert_eq!(results[2].as_ref().ok().and_then(|r| r.last()).map(|w| w.cell), Some(cell(0, 2)));
}

#[test]
fn test_waypoint_globals_use_converter() {
    let (registry, id) = single_region("...\n...", Connectivity::Four);
    let route = Pathfinder::default()
        .find_path(&registry, &PathRequest::within(id, cell(0, 0), cell(2, 0)))
        .expect("open row");

    let xs: Vec<f32> = route.global_path().iter().map(|p| p.x).collect();
    assert_eq!(xs, vec![25.0, 75.0, 125.0]);
    assert!(route.waypoints.iter().all(|w| w.global.y == 25.0));
    assert_eq!(route.regions(), vec![id]);
}

// ============================================================================
// Pathfinder, across regions
// ============================================================================

#[test]
fn test_crossing_into_neighbour_region() {
    let mut registry = RegionRegistry::new();
    let a = registry.create_region(NavigationGrid::new(10, 10, Connectivity::Eight));
    let b = registry.create_region(NavigationGrid::new(10, 10, Connectivity::Eight));
    registry.link_regions(a, b, IVec2::new(10, 0)).expect("regions exist");

    let route = Pathfinder::default()
        .find_path(&registry, &PathRequest::across(a, cell(9, 5), b, cell(1, 5)))
        .expect("regions are linked");

    let steps: Vec<(RegionId, GridPoint)> = route.waypoints.iter().map(|w| (w.region, w.cell)).collect();
    assert_eq!(steps, vec![(a, cell(9, 5)), (b, cell(0, 5)), (b, cell(1, 5))]);
    assert!(close_to(route.cost, 2.0));

    let converter = *registry.get(a).expect("registered").converter();
    let crossing = route.waypoints[1];
    assert_eq!(converter.global_to_grid(crossing.global), cell(10, 5));
    assert_eq!(route.regions(), vec![a, b]);
}

#[test]
fn test_unlinked_regions_are_unreachable() {
    let mut registry = RegionRegistry::new();
    let a = registry.create_region(NavigationGrid::new(4, 4, Connectivity::Eight));
    let b = registry.create_region(NavigationGrid::new(4, 4, Connectivity::Eight));

    let err = Pathfinder::default()
        .find_path(&registry, &PathRequest::across(a, cell(0, 0), b, cell(1, 1)))
        .unwrap_err();
    assert!(matches!(err, NavError::Unreachable { from, to } if from == a && to == b));
}

#[test]
fn test_route_through_intermediate_region() {
    let mut registry = RegionRegistry::new();
    let a = registry.create_region(NavigationGrid::new(5, 5, Connectivity::Eight));
    let b = registry.create_region(NavigationGrid::new(5, 5, Connectivity::Eight));
    let c = registry.create_region(NavigationGrid::new(5, 5, Connectivity::Eight));
    registry.link_regions(a, b, IVec2::new(5, 0)).expect("regions exist");
    registry.link_regions(b, c, IVec2::new(0, 5)).expect("regions exist");

    let route = Pathfinder::default()
        .find_path(&registry, &PathRequest::across(a, cell(2, 2), c, cell(2, 2)))
        .expect("a-b-c chain");

    assert_eq!(route.regions(), vec![a, b, c]);
    let converter = *registry.get(a).expect("registered").converter();
    let last = route.last().expect("non-empty");
    assert_eq!(converter.global_to_grid(last.global), cell(7, 7));
}

#[test]
fn test_removed_link_breaks_route() {
    let mut registry = RegionRegistry::new();
    let a = registry.create_region(NavigationGrid::new(4, 4, Connectivity::Eight));
    let b = registry.create_region(NavigationGrid::new(4, 4, Connectivity::Eight));
    registry.link_regions(a, b, IVec2::new(4, 0)).expect("regions exist");

    let request = PathRequest::across(a, cell(0, 0), b, cell(3, 3));
    assert!(Pathfinder::default().find_path(&registry, &request).is_ok());

    registry.remove_neighbor(a, b).expect("linked");
    assert!(Pathfinder::default().find_path(&registry, &request).unwrap_err().is_unreachable());
}
