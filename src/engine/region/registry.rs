use bevy::prelude::*;
use std::collections::BTreeMap;
use tracing::{info, warn};
use crate::engine::error::{NavError, NavResult};
use crate::engine::navigation::{NavigationGrid, RegionId, DEFAULT_MAX_CLUSTER_SIZE};
use super::boundary::BoundaryDescriptor;
use super::game_region::GameRegion;

/// Arena owning every region, keyed by id.
///
/// All edits to the region graph go through here so both endpoints of an
/// edge change together: a failed edit leaves both regions untouched.
#[derive(Resource, Debug)]
pub struct RegionRegistry {
    regions: BTreeMap<RegionId, GameRegion>,
    next_id: u32,
    /// Cluster size cap handed to regions made by [`Self::create_region`].
    region_cluster_size: Option<usize>,
}

impl Default for RegionRegistry {
    fn default() -> Self {
        Self { regions: BTreeMap::new(), next_id: 0, region_cluster_size: Some(DEFAULT_MAX_CLUSTER_SIZE) }
    }
}

impl RegionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Regions created afterwards cap their clusters at `max` cells
    /// (`None` lets a cluster fill its whole connected component).
    pub fn with_max_cluster_size(mut self, max: Option<usize>) -> Self {
        self.region_cluster_size = max;
        self
    }

    pub fn max_cluster_size(&self) -> Option<usize> {
        self.region_cluster_size
    }

    /// Register a new region around `grid` and return its id.
    pub fn create_region(&mut self, grid: NavigationGrid) -> RegionId {
        let id = RegionId(self.next_id);
        self.next_id += 1;
        let region = GameRegion::new(id, grid).with_max_cluster_size(self.region_cluster_size);
        self.regions.insert(id, region);
        id
    }

    /// Register a region built by the caller. Its id must be unused.
    pub fn insert_region(&mut self, region: GameRegion) -> NavResult<RegionId> {
        let id = region.id();
        if self.regions.contains_key(&id) {
            return Err(NavError::BadAssociation(format!("region {:?} is already registered", id)));
        }
        let Some(after) = id.0.checked_add(1) else {
            return Err(NavError::BadAssociation(format!("region id {} is reserved", id.0)));
        };
        self.next_id = self.next_id.max(after);
        self.regions.insert(id, region);
        Ok(id)
    }

    /// Remove a region together with every edge and hierarchy link touching it.
    pub fn remove_region(&mut self, id: RegionId) -> NavResult<GameRegion> {
        let mut region = self.regions.remove(&id).ok_or(NavError::UnknownRegion(id))?;

        for other in region.neighbors.keys() {
            if let Some(neighbor) = self.regions.get_mut(other) {
                if neighbor.neighbors.remove(&id).is_some() {
                    neighbor.invalidate_clusters();
                }
            }
        }
        region.neighbors.clear();
        region.invalidate_clusters();

        if let Some(parent) = region.parent.take() {
            if let Some(parent) = self.regions.get_mut(&parent) {
                parent.children.remove(&id);
            }
        }
        for child in std::mem::take(&mut region.children) {
            if let Some(child) = self.regions.get_mut(&child) {
                child.parent = None;
            }
        }

        info!("[REGIONS] Removed region {:?}", id);
        Ok(region)
    }

    pub fn get(&self, id: RegionId) -> Option<&GameRegion> {
        self.regions.get(&id)
    }

    pub fn get_mut(&mut self, id: RegionId) -> Option<&mut GameRegion> {
        self.regions.get_mut(&id)
    }

    pub fn region(&self, id: RegionId) -> NavResult<&GameRegion> {
        self.regions.get(&id).ok_or(NavError::UnknownRegion(id))
    }

    pub fn region_mut(&mut self, id: RegionId) -> NavResult<&mut GameRegion> {
        self.regions.get_mut(&id).ok_or(NavError::UnknownRegion(id))
    }

    pub fn contains(&self, id: RegionId) -> bool {
        self.regions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = RegionId> + '_ {
        self.regions.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameRegion> {
        self.regions.values()
    }

    // ------------------------------------------------------------------------
    // Neighbour edges
    // ------------------------------------------------------------------------

    /// Link `region` and `other`. `descriptor` is the seam as seen from
    /// `region`; `other` receives its inverse.
    ///
    /// Re-adding the descriptor already stored is a no-op.
    pub fn add_neighbor(&mut self, region: RegionId, other: RegionId, descriptor: BoundaryDescriptor) -> NavResult<()> {
        if region == other {
            return Err(NavError::BadAssociation(format!("region {:?} cannot neighbour itself", region)));
        }
        let (Some(a), Some(b)) = (self.regions.get(&region), self.regions.get(&other)) else {
            return Err(NavError::BadAssociation(format!(
                "cannot link {:?} and {:?}: region not registered",
                region, other
            )));
        };

        for link in descriptor.links() {
            if !a.grid().in_bounds(link.local) || !b.grid().in_bounds(link.remote) {
                return Err(NavError::BadAssociation(format!(
                    "boundary link {:?} -> {:?} leaves the grids of {:?} and {:?}",
                    link.local, link.remote, region, other
                )));
            }
        }

        if let Some(existing) = a.neighbor(other) {
            if *existing == descriptor {
                return Ok(());
            }
            return Err(NavError::BadAssociation(format!(
                "regions {:?} and {:?} are already linked through a different boundary",
                region, other
            )));
        }

        if descriptor.is_empty() {
            warn!("[REGIONS] Linking {:?} and {:?} through a boundary with no links", region, other);
        }

        let inverse = descriptor.inverse();
        let link_count = descriptor.links().len();
        if let Some(a) = self.regions.get_mut(&region) {
            a.neighbors.insert(other, descriptor);
            a.invalidate_clusters();
        }
        if let Some(b) = self.regions.get_mut(&other) {
            b.neighbors.insert(region, inverse);
            b.invalidate_clusters();
        }

        info!("[REGIONS] Linked {:?} <-> {:?} ({} boundary links)", region, other, link_count);
        Ok(())
    }

    /// Link two regions placed `offset` apart, deriving the seam from their
    /// grids. `other`'s local origin sits at `offset` in `region`'s frame.
    pub fn link_regions(&mut self, region: RegionId, other: RegionId, offset: IVec2) -> NavResult<()> {
        let (Some(a), Some(b)) = (self.regions.get(&region), self.regions.get(&other)) else {
            return Err(NavError::BadAssociation(format!(
                "cannot link {:?} and {:?}: region not registered",
                region, other
            )));
        };
        let descriptor = BoundaryDescriptor::from_offset(offset, a.grid(), b.grid());
        self.add_neighbor(region, other, descriptor)
    }

    pub fn remove_neighbor(&mut self, region: RegionId, other: RegionId) -> NavResult<()> {
        let linked = self.regions.get(&region).is_some_and(|r| r.is_neighbor(other));
        if !linked {
            return Err(NavError::BadDissociation(format!(
                "regions {:?} and {:?} are not neighbours",
                region, other
            )));
        }

        if let Some(a) = self.regions.get_mut(&region) {
            a.neighbors.remove(&other);
            a.invalidate_clusters();
        }
        if let Some(b) = self.regions.get_mut(&other) {
            b.neighbors.remove(&region);
            b.invalidate_clusters();
        }

        info!("[REGIONS] Unlinked {:?} <-> {:?}", region, other);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Hierarchy
    // ------------------------------------------------------------------------

    /// Make `child` a child of `parent`, detaching it from any previous parent.
    pub fn set_parent(&mut self, child: RegionId, parent: RegionId) -> NavResult<()> {
        if child == parent {
            return Err(NavError::BadAssociation(format!("region {:?} cannot parent itself", child)));
        }
        if !self.contains(child) || !self.contains(parent) {
            return Err(NavError::BadAssociation(format!(
                "cannot parent {:?} under {:?}: region not registered",
                child, parent
            )));
        }

        // Walking up from the new parent must not reach the child.
        let mut ancestor = Some(parent);
        while let Some(id) = ancestor {
            if id == child {
                return Err(NavError::BadAssociation(format!(
                    "parenting {:?} under {:?} would create a cycle",
                    child, parent
                )));
            }
            ancestor = self.regions.get(&id).and_then(|r| r.parent);
        }

        let previous = self.regions.get(&child).and_then(|r| r.parent);
        if previous == Some(parent) {
            return Ok(());
        }
        if let Some(previous) = previous.and_then(|p| self.regions.get_mut(&p)) {
            previous.children.remove(&child);
        }
        if let Some(c) = self.regions.get_mut(&child) {
            c.parent = Some(parent);
        }
        if let Some(p) = self.regions.get_mut(&parent) {
            p.children.insert(child);
        }
        Ok(())
    }

    pub fn remove_child(&mut self, parent: RegionId, child: RegionId) -> NavResult<()> {
        let is_child = self.regions.get(&parent).is_some_and(|p| p.is_child(child));
        if !is_child {
            return Err(NavError::BadDissociation(format!(
                "region {:?} is not a child of {:?}",
                child, parent
            )));
        }

        if let Some(p) = self.regions.get_mut(&parent) {
            p.children.remove(&child);
        }
        if let Some(c) = self.regions.get_mut(&child) {
            c.parent = None;
        }
        Ok(())
    }
}
