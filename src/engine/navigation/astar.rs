use fixedbitset::FixedBitSet;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::{error, warn};
use crate::engine::fixed_math::{grid_distance, FixedNum};
use super::grid::NavigationGrid;
use super::types::GridPoint;

/// Open-set entry. Ordered so that `BinaryHeap` pops the lowest `f` first,
/// then the lowest `x`, then the lowest `y`.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
struct State {
    f: FixedNum,
    g: FixedNum,
    cell: GridPoint,
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.cell.x.cmp(&self.cell.x))
            .then_with(|| other.cell.y.cmp(&self.cell.y))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Cells of a fine search from start to goal, both included, with the summed
/// step cost.
#[derive(Clone, Debug, PartialEq)]
pub(super) struct CellPath {
    pub cells: Vec<GridPoint>,
    pub cost: FixedNum,
}

/// Cell-level A* over one grid.
///
/// `corridor`, when given, holds the row-major indices the search may enter;
/// start and goal must be inside it. Returns `None` when the goal cannot be
/// reached or the iteration cap is hit.
pub(super) fn find_cell_path(
    grid: &NavigationGrid,
    start: GridPoint,
    goal: GridPoint,
    corridor: Option<&FixedBitSet>,
    max_iterations: usize,
) -> Option<CellPath> {
    if start == goal {
        return Some(CellPath { cells: vec![start], cost: FixedNum::ZERO });
    }

    let allowed = |idx: usize| corridor.map_or(true, |c| c.contains(idx));
    let start_idx = grid.index_unchecked(start);
    let goal_idx = grid.index_unchecked(goal);
    if !allowed(start_idx) || !allowed(goal_idx) {
        return None;
    }

    let h_scale = grid.min_traversable_weight();
    let heuristic = |p: GridPoint| grid_distance(p.x, p.y, goal.x, goal.y) * h_scale;

    let cells = grid.cell_count();
    let mut g_score = vec![FixedNum::MAX; cells];
    let mut came_from: Vec<Option<usize>> = vec![None; cells];
    let mut closed = FixedBitSet::with_capacity(cells);
    let mut open_set = BinaryHeap::new();

    g_score[start_idx] = FixedNum::ZERO;
    open_set.push(State { f: heuristic(start), g: FixedNum::ZERO, cell: start });

    let mut iterations = 0;
    while let Some(State { g, cell: current, .. }) = open_set.pop() {
        let current_idx = grid.index_unchecked(current);
        if closed.contains(current_idx) || g > g_score[current_idx] {
            continue;
        }
        closed.insert(current_idx);

        iterations += 1;
        if iterations > max_iterations {
            error!(
                "[PATHFINDING] Cell search exceeded max iterations ({}) from {:?} to {:?}",
                max_iterations, start, goal
            );
            return None;
        }

        if current_idx == goal_idx {
            if iterations > max_iterations / 2 {
                warn!("[PATHFINDING] Cell search used {} iterations (high!)", iterations);
            }
            return Some(CellPath { cells: reconstruct(grid, &came_from, goal_idx), cost: g });
        }

        for next in grid.neighbors(current) {
            let next_idx = grid.index_unchecked(next);
            if closed.contains(next_idx) || !allowed(next_idx) {
                continue;
            }
            let tentative = g + grid.step_cost(current, next);
            if tentative < g_score[next_idx] {
                g_score[next_idx] = tentative;
                came_from[next_idx] = Some(current_idx);
                open_set.push(State { f: tentative + heuristic(next), g: tentative, cell: next });
            }
        }
    }

    None
}

fn reconstruct(grid: &NavigationGrid, came_from: &[Option<usize>], goal_idx: usize) -> Vec<GridPoint> {
    let mut path = vec![grid.point_at_index(goal_idx)];
    let mut current = goal_idx;
    while let Some(prev) = came_from[current] {
        path.push(grid.point_at_index(prev));
        current = prev;
    }
    path.reverse();
    path
}
