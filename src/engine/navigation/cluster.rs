use serde::{Serialize, Deserialize};
use crate::engine::fixed_math::{FixedNum, FixedVec2};
use super::types::{ClusterId, GridPoint};

/// A connected group of traversable cells, used as one coarse search node.
///
/// Cells are kept in growth order; the first cell is the seed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    id: ClusterId,
    cells: Vec<GridPoint>,
    centroid: FixedVec2,
    representative: GridPoint,
}

impl Cluster {
    /// `cells` must be non-empty.
    pub(super) fn from_cells(id: ClusterId, cells: Vec<GridPoint>) -> Self {
        let count = FixedNum::from_num(cells.len().max(1) as u32);
        let sum = cells
            .iter()
            .fold(FixedVec2::ZERO, |acc, c| acc + FixedVec2::from_ints(c.x, c.y));
        let centroid = sum / count;

        // Member nearest the mean, earliest-grown on ties.
        let mut representative = cells.first().copied().unwrap_or_default();
        let mut best = FixedNum::MAX;
        for &cell in &cells {
            let d = (FixedVec2::from_ints(cell.x, cell.y) - centroid).length_squared();
            if d < best {
                best = d;
                representative = cell;
            }
        }

        Self { id, cells, centroid, representative }
    }

    pub fn id(&self) -> ClusterId {
        self.id
    }

    pub fn cells(&self) -> &[GridPoint] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// First cell grown into the cluster.
    pub fn seed(&self) -> GridPoint {
        self.cells.first().copied().unwrap_or(self.representative)
    }

    /// Mean of the member cell coordinates.
    pub fn centroid(&self) -> FixedVec2 {
        self.centroid
    }

    /// Member cell standing in for the whole cluster on the coarse graph.
    pub fn representative(&self) -> GridPoint {
        self.representative
    }
}

/// Clusters of one grid snapshot with the cell lookup and cluster adjacency.
///
/// Built by [`ClusterGreenhouse`](super::ClusterGreenhouse). Identical grids
/// produce identical sets, down to the serialized bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSet {
    width: u32,
    height: u32,
    clusters: Vec<Cluster>,
    cell_to_cluster: Vec<Option<ClusterId>>,
    adjacency: Vec<Vec<ClusterId>>,
}

impl ClusterSet {
    pub(super) fn new(
        width: u32,
        height: u32,
        clusters: Vec<Cluster>,
        cell_to_cluster: Vec<Option<ClusterId>>,
        adjacency: Vec<Vec<ClusterId>>,
    ) -> Self {
        Self { width, height, clusters, cell_to_cluster, adjacency }
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn get(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Cluster containing `cell`; `None` for blocked, isolated or
    /// out-of-bounds cells.
    pub fn cluster_of(&self, cell: GridPoint) -> Option<ClusterId> {
        if cell.x < 0 || cell.y < 0 || cell.x as u32 >= self.width || cell.y as u32 >= self.height {
            return None;
        }
        let idx = cell.y as usize * self.width as usize + cell.x as usize;
        self.cell_to_cluster.get(idx).copied().flatten()
    }

    /// Sorted ids of clusters reachable from `id` in one legal move.
    pub fn neighbors(&self, id: ClusterId) -> &[ClusterId] {
        self.adjacency.get(id.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn are_adjacent(&self, a: ClusterId, b: ClusterId) -> bool {
        self.neighbors(a).binary_search(&b).is_ok()
    }

    pub fn clustered_cell_count(&self) -> usize {
        self.cell_to_cluster.iter().filter(|c| c.is_some()).count()
    }
}
