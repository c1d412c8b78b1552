use serde::{Serialize, Deserialize};
use smallvec::SmallVec;
use std::collections::VecDeque;
use crate::engine::error::{NavError, NavResult};
use crate::engine::fixed_math::{diagonal_step, FixedNum};
use super::types::{Connectivity, GridPoint, BLOCKED_WEIGHT};

/// Information stored in each navigation grid square.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationGridData {
    pub traversable: bool,
    /// Movement weight. Values at or above [`BLOCKED_WEIGHT`] block the cell.
    pub weight: FixedNum,
    /// Chebyshev distance to the nearest blocked cell, see
    /// [`NavigationGrid::recompute_blocker_distances`].
    pub blocker_dist: u32,
}

impl NavigationGridData {
    pub fn open(weight: FixedNum) -> Self {
        Self { traversable: true, weight, blocker_dist: u32::MAX }
    }

    pub fn blocked() -> Self {
        Self { traversable: false, weight: FixedNum::from_num(BLOCKED_WEIGHT), blocker_dist: 0 }
    }

    #[inline]
    pub fn is_traversable(&self) -> bool {
        self.traversable && self.weight < FixedNum::from_num(BLOCKED_WEIGHT)
    }
}

impl Default for NavigationGridData {
    fn default() -> Self {
        Self::open(FixedNum::ONE)
    }
}

/// Dense traversability grid of one region.
///
/// Cells are stored row-major (`y * width + x`) so every lookup is a single
/// index computation. The shape is fixed at construction; only cell values
/// change afterwards.
///
/// The grid does not know about clusters. Mutations go through
/// [`GameRegion`](crate::engine::region::GameRegion), which drops its cluster
/// cache whenever a cell changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NavigationGrid {
    width: u32,
    height: u32,
    connectivity: Connectivity,
    cells: Vec<NavigationGridData>,
}

impl NavigationGrid {
    /// Grid with every cell open at weight 1.
    pub fn new(width: u32, height: u32, connectivity: Connectivity) -> Self {
        Self::filled(width, height, connectivity, NavigationGridData::default())
    }

    pub fn filled(width: u32, height: u32, connectivity: Connectivity, data: NavigationGridData) -> Self {
        Self {
            width,
            height,
            connectivity,
            cells: vec![data; width as usize * height as usize],
        }
    }

    /// Build from row-major integer weights. Weights at or above
    /// [`BLOCKED_WEIGHT`] become blocked cells.
    pub fn from_weights(width: u32, height: u32, connectivity: Connectivity, weights: &[i32]) -> NavResult<Self> {
        let expected = width as usize * height as usize;
        if weights.len() != expected {
            return Err(NavError::MismatchedSizes { expected, found: weights.len() });
        }

        let mut cells = Vec::with_capacity(expected);
        for &w in weights {
            if w < 0 {
                return Err(NavError::InvalidCost(FixedNum::from_num(w)));
            }
            if w >= BLOCKED_WEIGHT {
                cells.push(NavigationGridData::blocked());
            } else {
                cells.push(NavigationGridData::open(FixedNum::from_num(w)));
            }
        }

        Ok(Self { width, height, connectivity, cells })
    }

    /// Parse an ASCII layout, one row per line: `#` blocked, `.` weight 1,
    /// digits `1`-`9` that weight.
    pub fn from_ascii(layout: &str, connectivity: Connectivity) -> NavResult<Self> {
        let rows: Vec<&str> = layout.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        let height = rows.len();
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0);

        let mut weights = Vec::with_capacity(width * height);
        for row in &rows {
            let row_len = row.chars().count();
            if row_len != width {
                return Err(NavError::MismatchedSizes { expected: width, found: row_len });
            }
            for ch in row.chars() {
                let weight = match ch {
                    '#' => BLOCKED_WEIGHT,
                    '.' => 1,
                    d if d.is_ascii_digit() && d != '0' => d as i32 - '0' as i32,
                    other => {
                        return Err(NavError::Config(format!("unknown grid glyph {:?}", other)));
                    }
                };
                weights.push(weight);
            }
        }

        Self::from_weights(width as u32, height as u32, connectivity, &weights)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// True when the cell storage matches `width * height` and every weight
    /// is non-negative. Grids built through the constructors always are;
    /// decoded ones have to be checked.
    pub fn is_well_formed(&self) -> bool {
        let expected = (self.width as usize).checked_mul(self.height as usize);
        expected == Some(self.cells.len()) && self.cells.iter().all(|c| c.weight >= FixedNum::ZERO)
    }

    #[inline]
    pub fn in_bounds(&self, p: GridPoint) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as u32) < self.width && (p.y as u32) < self.height
    }

    /// Row-major index of `p`. Callers must check bounds first.
    #[inline]
    pub fn index_unchecked(&self, p: GridPoint) -> usize {
        p.y as usize * self.width as usize + p.x as usize
    }

    #[inline]
    pub fn point_at_index(&self, index: usize) -> GridPoint {
        let w = self.width as usize;
        GridPoint::new((index % w) as i32, (index / w) as i32)
    }

    pub fn index(&self, p: GridPoint) -> NavResult<usize> {
        if self.in_bounds(p) {
            Ok(self.index_unchecked(p))
        } else {
            Err(self.out_of_bounds(p))
        }
    }

    fn out_of_bounds(&self, p: GridPoint) -> NavError {
        NavError::OutOfBounds { x: p.x, y: p.y, width: self.width, height: self.height }
    }

    pub fn at(&self, x: i32, y: i32) -> NavResult<&NavigationGridData> {
        let idx = self.index(GridPoint::new(x, y))?;
        Ok(&self.cells[idx])
    }

    pub fn set_traversable(&mut self, x: i32, y: i32, traversable: bool) -> NavResult<()> {
        let idx = self.index(GridPoint::new(x, y))?;
        self.cells[idx].traversable = traversable;
        Ok(())
    }

    pub fn set_cost(&mut self, x: i32, y: i32, cost: FixedNum) -> NavResult<()> {
        if cost < FixedNum::ZERO {
            return Err(NavError::InvalidCost(cost));
        }
        let idx = self.index(GridPoint::new(x, y))?;
        self.cells[idx].weight = cost;
        Ok(())
    }

    /// False for out-of-bounds points.
    #[inline]
    pub fn is_traversable(&self, p: GridPoint) -> bool {
        self.in_bounds(p) && self.cells[self.index_unchecked(p)].is_traversable()
    }

    #[inline]
    pub fn weight(&self, p: GridPoint) -> FixedNum {
        self.cells[self.index_unchecked(p)].weight
    }

    pub fn cells(&self) -> &[NavigationGridData] {
        &self.cells
    }

    pub fn traversable_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_traversable()).count()
    }

    /// Legal moves out of `p` under the grid's movement rule.
    ///
    /// Targets must be in bounds and traversable. A diagonal step additionally
    /// needs both orthogonal cells it passes to be traversable.
    pub fn neighbors(&self, p: GridPoint) -> SmallVec<[GridPoint; 8]> {
        let mut out = SmallVec::new();
        for (dx, dy) in self.connectivity.offsets() {
            let n = GridPoint::new(p.x + dx, p.y + dy);
            if !self.is_traversable(n) {
                continue;
            }
            if dx != 0 && dy != 0 {
                let side_a = GridPoint::new(p.x + dx, p.y);
                let side_b = GridPoint::new(p.x, p.y + dy);
                if !self.is_traversable(side_a) || !self.is_traversable(side_b) {
                    continue;
                }
            }
            out.push(n);
        }
        out
    }

    /// Cost of stepping from `a` to the adjacent cell `b`: step length times
    /// the mean of both weights.
    pub fn step_cost(&self, a: GridPoint, b: GridPoint) -> FixedNum {
        let mean = (self.weight(a) + self.weight(b)) / FixedNum::from_num(2);
        if a.x != b.x && a.y != b.y {
            mean * diagonal_step()
        } else {
            mean
        }
    }

    /// Smallest weight among traversable cells, zero for a fully blocked grid.
    ///
    /// Scales the straight-line heuristic so it never overestimates.
    pub fn min_traversable_weight(&self) -> FixedNum {
        self.cells
            .iter()
            .filter(|c| c.is_traversable())
            .map(|c| c.weight)
            .min()
            .unwrap_or(FixedNum::ZERO)
    }

    /// Recompute every cell's Chebyshev distance to the nearest blocked cell.
    ///
    /// Multi-source BFS from all blocked cells. In a grid with no blocked cell
    /// every distance stays `u32::MAX`.
    pub fn recompute_blocker_distances(&mut self) {
        let mut queue = VecDeque::new();
        for (idx, cell) in self.cells.iter_mut().enumerate() {
            if cell.is_traversable() {
                cell.blocker_dist = u32::MAX;
            } else {
                cell.blocker_dist = 0;
                queue.push_back(idx);
            }
        }

        while let Some(idx) = queue.pop_front() {
            let p = self.point_at_index(idx);
            let next = self.cells[idx].blocker_dist + 1;
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let n = GridPoint::new(p.x + dx, p.y + dy);
                    if (dx == 0 && dy == 0) || !self.in_bounds(n) {
                        continue;
                    }
                    let n_idx = self.index_unchecked(n);
                    if next < self.cells[n_idx].blocker_dist {
                        self.cells[n_idx].blocker_dist = next;
                        queue.push_back(n_idx);
                    }
                }
            }
        }
    }
}
