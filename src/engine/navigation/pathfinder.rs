use bevy::prelude::*;
use fixedbitset::FixedBitSet;
use kestrel_macros::profile;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use tracing::{debug, error};
use crate::engine::error::{NavError, NavResult};
use crate::engine::fixed_math::{diagonal_step, FixedNum, FixedVec2};
use crate::engine::region::{BoundaryLink, GameRegion, RegionRegistry};
use super::astar::{find_cell_path, CellPath};
use super::grid::NavigationGrid;
use super::types::{ClusterId, GridPoint, PathRequest, RegionId, Route, Waypoint};

/// Default cap on expanded nodes per search level.
pub const DEFAULT_MAX_SEARCH_ITERATIONS: usize = 100_000;

/// A node of the coarse graph: one cluster of one region.
type CoarseNode = (RegionId, ClusterId);

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
struct CoarseState {
    f: FixedNum,
    g: FixedNum,
    node: CoarseNode,
}

impl Ord for CoarseState {
    fn cmp(&self, other: &Self) -> Ordering {
        other.f.cmp(&self.f).then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for CoarseState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// How a coarse node was reached: from which node, and across which seam
/// link if the step changed region.
#[derive(Copy, Clone, Debug)]
struct Step {
    from: CoarseNode,
    crossing: Option<(BoundaryLink, FixedNum)>,
}

/// The part of a route that stays inside one region.
#[derive(Debug)]
struct Segment {
    region: RegionId,
    clusters: Vec<ClusterId>,
    entry: GridPoint,
    exit: GridPoint,
    /// Cost of the seam step into `entry`, zero for the first segment.
    entry_cost: FixedNum,
}

/// Two-level route search over a [`RegionRegistry`].
///
/// The coarse level runs A* over clusters of every reachable region, the fine
/// level refines each region's share of the coarse route cell by cell inside
/// the corridor of clusters the coarse route picked. The finder keeps no
/// state between requests and only reads the registry.
#[derive(Clone, Copy, Debug)]
pub struct Pathfinder {
    max_iterations: usize,
}

impl Default for Pathfinder {
    fn default() -> Self {
        Self { max_iterations: DEFAULT_MAX_SEARCH_ITERATIONS }
    }
}

impl Pathfinder {
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations: max_iterations.max(1) }
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Route for one request.
    ///
    /// Fails with `InvalidRequest` when an endpoint is unknown, out of bounds
    /// or blocked, and with `Unreachable` when the endpoints are not
    /// connected.
    #[profile(threshold = 2, target = "PATHFINDING")]
    pub fn find_path(&self, registry: &RegionRegistry, request: &PathRequest) -> NavResult<Route> {
        let (origin, goal_region) = validate(registry, request)?;
        let origin_id = origin.id();
        let goal_id = goal_region.id();
        let converter = *origin.converter();

        if origin_id == goal_id && request.start == request.goal {
            return Ok(Route {
                waypoints: vec![Waypoint {
                    region: origin_id,
                    cell: request.start,
                    global: converter.grid_to_global(request.start),
                }],
                cost: FixedNum::ZERO,
            });
        }

        let unreachable = NavError::Unreachable { from: origin_id, to: goal_id };

        let offsets = region_offsets(registry, origin_id);
        if !offsets.contains_key(&goal_id) {
            debug!("[PATHFINDING] Region {:?} is not connected to {:?}", goal_id, origin_id);
            return Err(unreachable);
        }

        let Some(start_cluster) = origin.clusters().cluster_of(request.start) else {
            debug!("[PATHFINDING] Start {:?} is isolated", request.start);
            return Err(unreachable);
        };
        let Some(goal_cluster) = goal_region.clusters().cluster_of(request.goal) else {
            debug!("[PATHFINDING] Goal {:?} is isolated", request.goal);
            return Err(unreachable);
        };

        let coarse = self
            .coarse_search(
                registry,
                &offsets,
                (origin_id, start_cluster),
                (goal_id, goal_cluster),
                request.start,
                request.goal,
            )
            .ok_or(unreachable)?;

        let segments = segments_from(&coarse, request);

        let mut waypoints = Vec::new();
        let mut cost = FixedNum::ZERO;
        for segment in &segments {
            let region = registry.region(segment.region)?;
            let cells = self
                .refine(region, segment)
                .ok_or(NavError::Unreachable { from: origin_id, to: goal_id })?;

            cost += segment.entry_cost + cells.cost;
            let offset = offset_of(&offsets, segment.region);
            waypoints.extend(cells.cells.into_iter().map(|cell| Waypoint {
                region: segment.region,
                cell,
                global: converter.grid_to_global(cell.offset(offset)),
            }));
        }

        debug!(
            "[PATHFINDING] {:?} {:?} -> {:?} {:?}: {} waypoints across {} region(s), cost {}",
            origin_id,
            request.start,
            goal_id,
            request.goal,
            waypoints.len(),
            segments.len(),
            cost
        );

        Ok(Route { waypoints, cost })
    }

    /// One result per request, in request order.
    pub fn find_paths(&self, registry: &RegionRegistry, requests: &[PathRequest]) -> Vec<NavResult<Route>> {
        requests.iter().map(|request| self.find_path(registry, request)).collect()
    }

    /// A* over `(region, cluster)` nodes. Returns the visited nodes from start
    /// to goal with the step that entered each.
    fn coarse_search(
        &self,
        registry: &RegionRegistry,
        offsets: &FxHashMap<RegionId, IVec2>,
        start: CoarseNode,
        goal: CoarseNode,
        start_cell: GridPoint,
        goal_cell: GridPoint,
    ) -> Option<Vec<(CoarseNode, Option<Step>)>> {
        let goal_pos = point_in_frame(goal_cell, offset_of(offsets, goal.0));

        // Region-local position of a node: the request endpoints for the start
        // and goal nodes, the cluster centroid otherwise.
        let local_position = |node: CoarseNode| -> Option<FixedVec2> {
            if node == start {
                return Some(FixedVec2::from_ints(start_cell.x, start_cell.y));
            }
            if node == goal {
                return Some(FixedVec2::from_ints(goal_cell.x, goal_cell.y));
            }
            let region = registry.get(node.0)?;
            region.clusters().get(node.1).map(|c| c.centroid())
        };
        let heuristic = |node: CoarseNode| {
            let offset = offset_of(offsets, node.0);
            local_position(node).map_or(FixedNum::ZERO, |p| {
                (p + FixedVec2::from_ints(offset.x, offset.y)).distance(goal_pos)
            })
        };

        let mut open_set = BinaryHeap::new();
        let mut g_score: FxHashMap<CoarseNode, FixedNum> = FxHashMap::default();
        let mut came_from: FxHashMap<CoarseNode, Step> = FxHashMap::default();
        let mut closed: FxHashSet<CoarseNode> = FxHashSet::default();

        g_score.insert(start, FixedNum::ZERO);
        open_set.push(CoarseState { f: heuristic(start), g: FixedNum::ZERO, node: start });

        let mut iterations = 0;
        while let Some(CoarseState { g, node: current, .. }) = open_set.pop() {
            if !closed.insert(current) {
                continue;
            }

            iterations += 1;
            if iterations > self.max_iterations {
                error!(
                    "[PATHFINDING] Cluster search exceeded max iterations ({}) from {:?} to {:?}",
                    self.max_iterations, start, goal
                );
                return None;
            }

            if current == goal {
                return Some(reconstruct(&came_from, goal));
            }

            let Some(region) = registry.get(current.0) else {
                continue;
            };
            let clusters = region.clusters();
            let Some(here) = local_position(current) else {
                continue;
            };

            let mut relax = |next: CoarseNode, step_cost: FixedNum, crossing: Option<(BoundaryLink, FixedNum)>| {
                if closed.contains(&next) {
                    return;
                }
                let tentative = g + step_cost;
                if tentative < g_score.get(&next).copied().unwrap_or(FixedNum::MAX) {
                    g_score.insert(next, tentative);
                    came_from.insert(next, Step { from: current, crossing });
                    open_set.push(CoarseState { f: tentative + heuristic(next), g: tentative, node: next });
                }
            };

            for &neighbor in clusters.neighbors(current.1) {
                let next = (current.0, neighbor);
                let Some(there) = local_position(next) else {
                    continue;
                };
                relax(next, here.distance(there), None);
            }

            for (other_id, descriptor) in region.neighbors() {
                let Some(other) = registry.get(other_id) else {
                    continue;
                };
                let other_clusters = other.clusters();
                for &link in descriptor.links() {
                    if clusters.cluster_of(link.local) != Some(current.1) {
                        continue;
                    }
                    if !region.grid().is_traversable(link.local) || !other.grid().is_traversable(link.remote) {
                        continue;
                    }
                    let Some(other_cluster) = other_clusters.cluster_of(link.remote) else {
                        continue;
                    };
                    let next = (other_id, other_cluster);
                    let Some(there) = local_position(next) else {
                        continue;
                    };
                    // Approach the seam, cross it, then continue to the next
                    // node, each leg measured in its own region's frame.
                    let crossing = crossing_cost(region.grid(), other.grid(), link, descriptor.offset());
                    let approach = here.distance(FixedVec2::from_ints(link.local.x, link.local.y));
                    let onward = FixedVec2::from_ints(link.remote.x, link.remote.y).distance(there);
                    relax(next, approach + crossing + onward, Some((link, crossing)));
                }
            }
        }

        None
    }

    /// Cell route through one segment, inside its corridor when possible.
    fn refine(&self, region: &GameRegion, segment: &Segment) -> Option<CellPath> {
        let grid = region.grid();
        let clusters = region.clusters();

        let mut corridor = FixedBitSet::with_capacity(grid.cell_count());
        for id in &segment.clusters {
            if let Some(cluster) = clusters.get(*id) {
                for &cell in cluster.cells() {
                    corridor.insert(grid.index_unchecked(cell));
                }
            }
        }

        find_cell_path(grid, segment.entry, segment.exit, Some(&corridor), self.max_iterations).or_else(|| {
            debug!(
                "[PATHFINDING] Corridor search failed in region {:?}, retrying over the whole grid",
                segment.region
            );
            find_cell_path(grid, segment.entry, segment.exit, None, self.max_iterations)
        })
    }
}

fn validate<'r>(registry: &'r RegionRegistry, request: &PathRequest) -> NavResult<(&'r GameRegion, &'r GameRegion)> {
    let origin = registry
        .get(request.origin_region)
        .ok_or_else(|| NavError::InvalidRequest(format!("origin region {:?} is not registered", request.origin_region)))?;
    let goal_id = request.target_region();
    let goal = registry
        .get(goal_id)
        .ok_or_else(|| NavError::InvalidRequest(format!("goal region {:?} is not registered", goal_id)))?;

    check_endpoint(origin.grid(), request.start, "start")?;
    check_endpoint(goal.grid(), request.goal, "goal")?;
    Ok((origin, goal))
}

fn check_endpoint(grid: &NavigationGrid, cell: GridPoint, which: &str) -> NavResult<()> {
    if !grid.in_bounds(cell) {
        return Err(NavError::InvalidRequest(format!(
            "{} {:?} is outside the {}x{} grid",
            which,
            cell,
            grid.width(),
            grid.height()
        )));
    }
    if !grid.is_traversable(cell) {
        return Err(NavError::InvalidRequest(format!("{} {:?} is not traversable", which, cell)));
    }
    Ok(())
}

/// Offset of every region reachable from `origin`, in `origin`'s frame.
///
/// Breadth-first over neighbour edges; the first path to a region fixes its
/// offset.
fn region_offsets(registry: &RegionRegistry, origin: RegionId) -> FxHashMap<RegionId, IVec2> {
    let mut offsets = FxHashMap::default();
    let mut queue = VecDeque::new();
    offsets.insert(origin, IVec2::ZERO);
    queue.push_back(origin);

    while let Some(id) = queue.pop_front() {
        let Some(region) = registry.get(id) else {
            continue;
        };
        let base = offset_of(&offsets, id);
        for (other, descriptor) in region.neighbors() {
            if !offsets.contains_key(&other) && registry.contains(other) {
                offsets.insert(other, base + descriptor.offset());
                queue.push_back(other);
            }
        }
    }

    offsets
}

#[inline]
fn offset_of(offsets: &FxHashMap<RegionId, IVec2>, region: RegionId) -> IVec2 {
    offsets.get(&region).copied().unwrap_or(IVec2::ZERO)
}

fn point_in_frame(cell: GridPoint, offset: IVec2) -> FixedVec2 {
    let p = cell.offset(offset);
    FixedVec2::from_ints(p.x, p.y)
}

/// Step cost across a seam link, measured like an in-grid step.
fn crossing_cost(local: &NavigationGrid, remote: &NavigationGrid, link: BoundaryLink, offset: IVec2) -> FixedNum {
    let mean = (local.weight(link.local) + remote.weight(link.remote)) / FixedNum::from_num(2);
    if link.is_diagonal(offset) {
        mean * diagonal_step()
    } else {
        mean
    }
}

fn reconstruct(came_from: &FxHashMap<CoarseNode, Step>, goal: CoarseNode) -> Vec<(CoarseNode, Option<Step>)> {
    let mut nodes = Vec::new();
    let mut current = goal;
    loop {
        let step = came_from.get(&current).copied();
        nodes.push((current, step));
        match step {
            Some(step) => current = step.from,
            None => break,
        }
    }
    nodes.reverse();
    nodes
}

fn segments_from(coarse: &[(CoarseNode, Option<Step>)], request: &PathRequest) -> Vec<Segment> {
    let mut segments = Vec::new();
    let Some(((first_region, first_cluster), _)) = coarse.first().copied() else {
        return segments;
    };

    let mut current = Segment {
        region: first_region,
        clusters: vec![first_cluster],
        entry: request.start,
        exit: request.start,
        entry_cost: FixedNum::ZERO,
    };

    for &((region, cluster), step) in &coarse[1..] {
        match step.and_then(|s| s.crossing) {
            Some((link, crossing)) => {
                current.exit = link.local;
                let finished = std::mem::replace(
                    &mut current,
                    Segment {
                        region,
                        clusters: vec![cluster],
                        entry: link.remote,
                        exit: link.remote,
                        entry_cost: crossing,
                    },
                );
                segments.push(finished);
            }
            None => current.clusters.push(cluster),
        }
    }

    current.exit = request.goal;
    segments.push(current);
    segments
}
