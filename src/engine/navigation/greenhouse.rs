use fixedbitset::FixedBitSet;
use rand::Rng;
use smallvec::SmallVec;
use std::collections::{BTreeSet, VecDeque};
use tracing::debug;
use super::cluster::{Cluster, ClusterSet};
use super::grid::NavigationGrid;
use super::types::{ClusterId, GridPoint, DEFAULT_MAX_CLUSTER_SIZE};

/// Share of the unit interval handed out when weighted growth has to invent
/// its own frequencies.
const GENERATED_FREQUENCY_BUDGET: f64 = 0.15;

/// Transient builder that grows clusters over one grid snapshot.
///
/// The worklist holds every seed candidate in row-major order: traversable
/// cells with at least one legal move. Growth is a breadth-first flood over
/// legal moves into unclaimed cells, capped at `max_cluster_size`. Cells with
/// no traversable neighbour never become seeds and stay unclustered, unless
/// they are anchored (see [`with_anchors`](Self::with_anchors)).
pub struct ClusterGreenhouse<'a> {
    grid: &'a NavigationGrid,
    max_cluster_size: Option<usize>,
    seeds: VecDeque<GridPoint>,
}

impl<'a> ClusterGreenhouse<'a> {
    pub fn new(grid: &'a NavigationGrid) -> Self {
        Self {
            grid,
            max_cluster_size: Some(DEFAULT_MAX_CLUSTER_SIZE),
            seeds: Self::seed_cells(grid, &FixedBitSet::new()),
        }
    }

    /// Cells that must be clustered even without a legal move inside the
    /// grid, such as the local ends of boundary links. An anchored cell with
    /// no in-grid neighbour becomes a cluster of its own. Blocked and
    /// out-of-bounds anchors are ignored.
    pub fn with_anchors(mut self, anchors: impl IntoIterator<Item = GridPoint>) -> Self {
        let grid = self.grid;
        let mut anchored = FixedBitSet::with_capacity(grid.cell_count());
        for cell in anchors {
            if grid.in_bounds(cell) {
                anchored.insert(grid.index_unchecked(cell));
            }
        }
        self.seeds = Self::seed_cells(grid, &anchored);
        self
    }

    fn seed_cells(grid: &NavigationGrid, anchored: &FixedBitSet) -> VecDeque<GridPoint> {
        let mut seeds = VecDeque::new();
        for y in 0..grid.height() as i32 {
            for x in 0..grid.width() as i32 {
                let p = GridPoint::new(x, y);
                if !grid.is_traversable(p) {
                    continue;
                }
                if anchored.contains(grid.index_unchecked(p)) || !grid.neighbors(p).is_empty() {
                    seeds.push_back(p);
                }
            }
        }
        seeds
    }

    /// Cap on cells per cluster. `None` grows each cluster over its whole
    /// connected area. A cap of zero is treated as one.
    pub fn with_max_cluster_size(mut self, max: Option<usize>) -> Self {
        self.max_cluster_size = max.map(|m| m.max(1));
        self
    }

    pub fn build(mut self) -> ClusterSet {
        let grid = self.grid;
        let limit = self.max_cluster_size.unwrap_or(usize::MAX);
        let mut claimed: Vec<Option<ClusterId>> = vec![None; grid.cell_count()];
        let mut clusters: Vec<Cluster> = Vec::new();
        let mut frontier = VecDeque::new();

        while let Some(seed) = self.seeds.pop_front() {
            let seed_idx = grid.index_unchecked(seed);
            if claimed[seed_idx].is_some() {
                continue;
            }

            let id = ClusterId(clusters.len() as u32);
            let mut cells = Vec::new();
            claimed[seed_idx] = Some(id);
            cells.push(seed);
            frontier.clear();
            frontier.push_back(seed);

            'grow: while let Some(current) = frontier.pop_front() {
                for next in grid.neighbors(current) {
                    if cells.len() >= limit {
                        break 'grow;
                    }
                    let idx = grid.index_unchecked(next);
                    if claimed[idx].is_none() {
                        claimed[idx] = Some(id);
                        cells.push(next);
                        frontier.push_back(next);
                    }
                }
            }

            clusters.push(Cluster::from_cells(id, cells));
        }

        let adjacency = Self::adjacency(grid, &clusters, &claimed);

        debug!(
            "[CLUSTERS] Grew {} clusters over {}x{} grid ({} of {} traversable cells clustered)",
            clusters.len(),
            grid.width(),
            grid.height(),
            claimed.iter().filter(|c| c.is_some()).count(),
            grid.traversable_count()
        );

        ClusterSet::new(grid.width(), grid.height(), clusters, claimed, adjacency)
    }

    fn adjacency(grid: &NavigationGrid, clusters: &[Cluster], claimed: &[Option<ClusterId>]) -> Vec<Vec<ClusterId>> {
        clusters
            .iter()
            .map(|cluster| {
                let mut adjacent = BTreeSet::new();
                for &cell in cluster.cells() {
                    for next in grid.neighbors(cell) {
                        if let Some(other) = claimed[grid.index_unchecked(next)] {
                            if other != cluster.id() {
                                adjacent.insert(other);
                            }
                        }
                    }
                }
                adjacent.into_iter().collect()
            })
            .collect()
    }

    /// Randomised layered growth for map generation.
    ///
    /// Each frequency is one cluster's share of the unit interval. Shares are
    /// cumulated and whatever is left over is the sparsity, the chance that a
    /// step grows nothing. Every cluster starts at a distinct random cell;
    /// each of `width * height` steps rolls a die, picks a cluster and lets
    /// it claim one unclaimed border cell. Traversability is ignored.
    ///
    /// An empty slice generates between four and seven shares summing to at
    /// most 0.15. Returns one point set per cluster, pairwise disjoint.
    pub fn grow_weighted<R: Rng>(&self, frequencies: &[f64], rng: &mut R) -> Vec<BTreeSet<GridPoint>> {
        let width = self.grid.width() as i32;
        let height = self.grid.height() as i32;
        let area = (width as usize) * (height as usize);
        if area == 0 {
            return Vec::new();
        }

        let mut shares: Vec<f64> = if frequencies.is_empty() {
            generate_frequencies(rng)
        } else {
            frequencies.to_vec()
        };
        shares.truncate(area);

        let mut cumulative = Vec::with_capacity(shares.len());
        let mut running = 0.0;
        for share in &shares {
            running += share.max(0.0);
            cumulative.push(running);
        }
        let sparsity = 1.0 - cumulative.last().copied().unwrap_or(0.0);

        let in_bounds = |p: GridPoint| p.x >= 0 && p.y >= 0 && p.x < width && p.y < height;
        let index = |p: GridPoint| p.y as usize * width as usize + p.x as usize;

        let mut claimed = FixedBitSet::with_capacity(area);
        let mut members: Vec<BTreeSet<GridPoint>> = Vec::with_capacity(shares.len());
        let mut borders: Vec<BTreeSet<GridPoint>> = Vec::with_capacity(shares.len());

        for _ in 0..shares.len() {
            let mut origin = GridPoint::new(rng.random_range(0..width), rng.random_range(0..height));
            while claimed.contains(index(origin)) {
                origin = GridPoint::new(rng.random_range(0..width), rng.random_range(0..height));
            }
            claimed.insert(index(origin));
            members.push(BTreeSet::from([origin]));
            borders.push(border_of(origin, in_bounds).into_iter().collect());
        }

        for _ in 0..area {
            let roll: f64 = rng.random();
            if roll > 1.0 - sparsity {
                continue;
            }
            let Some(chosen) = cumulative.iter().position(|&c| roll < c) else {
                continue;
            };

            let border = &borders[chosen];
            if border.is_empty() {
                continue;
            }
            let start = rng.random_range(0..border.len());
            let pick = border
                .iter()
                .cycle()
                .skip(start)
                .take(border.len())
                .find(|p| !claimed.contains(index(**p)))
                .copied();

            let Some(point) = pick else {
                continue;
            };
            claimed.insert(index(point));
            members[chosen].insert(point);
            borders[chosen].remove(&point);
            for next in border_of(point, in_bounds) {
                if !members[chosen].contains(&next) {
                    borders[chosen].insert(next);
                }
            }
        }

        members
    }
}

fn border_of(p: GridPoint, in_bounds: impl Fn(GridPoint) -> bool) -> SmallVec<[GridPoint; 4]> {
    [(1, 0), (-1, 0), (0, 1), (0, -1)]
        .into_iter()
        .map(|(dx, dy)| GridPoint::new(p.x + dx, p.y + dy))
        .filter(|n| in_bounds(*n))
        .collect()
}

fn generate_frequencies<R: Rng>(rng: &mut R) -> Vec<f64> {
    let count = rng.random_range(4..8);
    let mut available = GENERATED_FREQUENCY_BUDGET;
    let mut shares = Vec::with_capacity(count);
    for _ in 0..count {
        let share = if available > 0.0 { rng.random_range(0.0..available) } else { 0.0 };
        available -= share;
        shares.push(share);
    }
    shares
}
