use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;
use crate::engine::coordinates::CoordinateConverter;
use crate::engine::error::{NavError, NavResult};
use crate::engine::fixed_math::FixedNum;
use crate::engine::navigation::{
    ClusterGreenhouse, ClusterSet, GridPoint, NavigationGrid, RegionId, DEFAULT_MAX_CLUSTER_SIZE,
};
use super::boundary::BoundaryDescriptor;
use super::drawables::{DrawableHandle, PriorityDrawables, Updatable};

/// One bounded area of the world: a navigation grid plus everything drawn
/// and ticked while it is active.
///
/// Neighbour and hierarchy links are ids into the owning
/// [`RegionRegistry`](super::RegionRegistry) and are only edited through it,
/// which keeps every edge symmetric.
pub struct GameRegion {
    id: RegionId,
    grid: NavigationGrid,
    initial_grid: NavigationGrid,
    clusters: OnceLock<ClusterSet>,
    max_cluster_size: Option<usize>,
    pub(super) neighbors: BTreeMap<RegionId, BoundaryDescriptor>,
    pub(super) parent: Option<RegionId>,
    pub(super) children: BTreeSet<RegionId>,
    drawables: PriorityDrawables,
    updatables: Vec<Box<dyn Updatable>>,
    converter: CoordinateConverter,
    next_region: Option<RegionId>,
}

impl GameRegion {
    pub fn new(id: RegionId, grid: NavigationGrid) -> Self {
        Self {
            id,
            initial_grid: grid.clone(),
            grid,
            clusters: OnceLock::new(),
            max_cluster_size: Some(DEFAULT_MAX_CLUSTER_SIZE),
            neighbors: BTreeMap::new(),
            parent: None,
            children: BTreeSet::new(),
            drawables: PriorityDrawables::default(),
            updatables: Vec::new(),
            converter: CoordinateConverter::default(),
            next_region: None,
        }
    }

    pub fn with_converter(mut self, converter: CoordinateConverter) -> Self {
        self.converter = converter;
        self
    }

    pub fn with_max_cluster_size(mut self, max: Option<usize>) -> Self {
        self.max_cluster_size = max;
        self.invalidate_clusters();
        self
    }

    /// Rebuild the region around a grid captured earlier, keeping `initial`
    /// as the state [`reset`](Self::reset) returns to.
    pub(crate) fn restore(id: RegionId, grid: NavigationGrid, initial: NavigationGrid) -> Self {
        let mut region = Self::new(id, initial);
        region.grid = grid;
        region
    }

    pub fn id(&self) -> RegionId {
        self.id
    }

    pub fn max_cluster_size(&self) -> Option<usize> {
        self.max_cluster_size
    }

    // ------------------------------------------------------------------------
    // Grid
    // ------------------------------------------------------------------------

    pub fn grid(&self) -> &NavigationGrid {
        &self.grid
    }

    pub fn initial_grid(&self) -> &NavigationGrid {
        &self.initial_grid
    }

    pub fn set_traversable(&mut self, cell: GridPoint, traversable: bool) -> NavResult<()> {
        self.grid.set_traversable(cell.x, cell.y, traversable)?;
        self.invalidate_clusters();
        Ok(())
    }

    pub fn set_cost(&mut self, cell: GridPoint, cost: FixedNum) -> NavResult<()> {
        self.grid.set_cost(cell.x, cell.y, cost)?;
        self.invalidate_clusters();
        Ok(())
    }

    /// Replace the working grid. The shape must match the region's grid.
    pub fn replace_grid(&mut self, grid: NavigationGrid) -> NavResult<()> {
        if grid.width() != self.grid.width() || grid.height() != self.grid.height() {
            return Err(NavError::MismatchedSizes {
                expected: self.grid.cell_count(),
                found: grid.cell_count(),
            });
        }
        self.grid = grid;
        self.invalidate_clusters();
        Ok(())
    }

    /// Clusters of the current grid, grown on first use after a change to the
    /// grid or to the region's boundaries. The local end of every boundary
    /// link is clustered, so a cell reachable only across a seam still gets a
    /// coarse node.
    pub fn clusters(&self) -> &ClusterSet {
        self.clusters.get_or_init(|| {
            debug!("[CLUSTERS] Rebuilding cluster cache for region {:?}", self.id);
            let anchors = self.neighbors.values().flat_map(|d| d.links().iter().map(|link| link.local));
            ClusterGreenhouse::new(&self.grid)
                .with_max_cluster_size(self.max_cluster_size)
                .with_anchors(anchors)
                .build()
        })
    }

    pub fn has_cached_clusters(&self) -> bool {
        self.clusters.get().is_some()
    }

    pub(super) fn invalidate_clusters(&mut self) {
        self.clusters.take();
    }

    /// Restore the grid the region was created with.
    pub fn reset(&mut self) {
        self.grid = self.initial_grid.clone();
        self.invalidate_clusters();
    }

    // ------------------------------------------------------------------------
    // Region graph (read side)
    // ------------------------------------------------------------------------

    pub fn neighbors(&self) -> impl Iterator<Item = (RegionId, &BoundaryDescriptor)> {
        self.neighbors.iter().map(|(id, d)| (*id, d))
    }

    pub fn neighbor(&self, other: RegionId) -> Option<&BoundaryDescriptor> {
        self.neighbors.get(&other)
    }

    pub fn is_neighbor(&self, other: RegionId) -> bool {
        self.neighbors.contains_key(&other)
    }

    pub fn neighbor_count(&self) -> usize {
        self.neighbors.len()
    }

    pub fn parent(&self) -> Option<RegionId> {
        self.parent
    }

    pub fn children(&self) -> impl Iterator<Item = RegionId> + '_ {
        self.children.iter().copied()
    }

    pub fn is_child(&self, other: RegionId) -> bool {
        self.children.contains(&other)
    }

    // ------------------------------------------------------------------------
    // Drawables
    // ------------------------------------------------------------------------

    pub fn add_drawable(&mut self, priority: i32, drawable: DrawableHandle) {
        self.drawables.add(priority, drawable);
    }

    /// Pairwise add; both slices must have the same length.
    pub fn add_drawables(&mut self, priorities: &[i32], drawables: &[DrawableHandle]) -> NavResult<()> {
        if priorities.len() != drawables.len() {
            return Err(NavError::MismatchedSizes { expected: priorities.len(), found: drawables.len() });
        }
        for (priority, drawable) in priorities.iter().zip(drawables) {
            self.drawables.add(*priority, drawable.clone());
        }
        Ok(())
    }

    pub fn remove_drawable(&mut self, drawable: &DrawableHandle) -> bool {
        self.drawables.remove(drawable)
    }

    pub fn clear_drawables(&mut self) {
        self.drawables.clear();
    }

    pub fn clear_drawables_at(&mut self, priority: i32) {
        self.drawables.clear_priority(priority);
    }

    pub fn drawable_count(&self) -> usize {
        self.drawables.len()
    }

    pub fn drawable_count_at(&self, priority: i32) -> usize {
        self.drawables.count_at(priority)
    }

    pub fn drawables(&self) -> &PriorityDrawables {
        &self.drawables
    }

    // ------------------------------------------------------------------------
    // Updatables
    // ------------------------------------------------------------------------

    pub fn add_updatable(&mut self, updatable: Box<dyn Updatable>) {
        self.updatables.push(updatable);
    }

    pub fn clear_updatables(&mut self) {
        self.updatables.clear();
    }

    pub fn updatables(&self) -> &[Box<dyn Updatable>] {
        &self.updatables
    }

    pub fn updatable_count(&self) -> usize {
        self.updatables.len()
    }

    /// Tick every updatable once.
    pub fn update(&mut self, elapsed: Duration) {
        for updatable in &mut self.updatables {
            updatable.update(elapsed);
        }
    }

    // ------------------------------------------------------------------------
    // Placement and swaps
    // ------------------------------------------------------------------------

    pub fn converter(&self) -> &CoordinateConverter {
        &self.converter
    }

    pub fn converter_mut(&mut self) -> &mut CoordinateConverter {
        &mut self.converter
    }

    /// Ask the controller to switch to `next` at the end of the frame.
    pub fn request_next_region(&mut self, next: RegionId) {
        self.next_region = Some(next);
    }

    pub fn next_region(&self) -> Option<RegionId> {
        self.next_region
    }

    pub(crate) fn take_next_region(&mut self) -> Option<RegionId> {
        self.next_region.take()
    }
}

impl std::fmt::Debug for GameRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameRegion")
            .field("id", &self.id)
            .field("width", &self.grid.width())
            .field("height", &self.grid.height())
            .field("neighbors", &self.neighbors.keys().collect::<Vec<_>>())
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("drawables", &self.drawables.len())
            .field("updatables", &self.updatables.len())
            .finish()
    }
}
