use bevy::prelude::*;
use serde::{Serialize, Deserialize};
use crate::engine::navigation::{GridPoint, NavigationGrid};

/// A pair of cells, one on each side of a region seam, that a unit may step
/// between.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoundaryLink {
    /// Cell in the region holding the descriptor.
    pub local: GridPoint,
    /// Cell in the neighbouring region.
    pub remote: GridPoint,
}

impl BoundaryLink {
    pub fn new(local: GridPoint, remote: GridPoint) -> Self {
        Self { local, remote }
    }

    pub fn flipped(self) -> Self {
        Self { local: self.remote, remote: self.local }
    }

    /// True when the step across the seam is diagonal once the remote cell
    /// is moved into the local frame.
    pub fn is_diagonal(self, offset: IVec2) -> bool {
        let remote = self.remote.offset(offset);
        remote.x != self.local.x && remote.y != self.local.y
    }
}

/// Aligns a neighbouring region's coordinate space with this one.
///
/// A remote cell `r` sits at `r + offset` in the local frame. Links are kept
/// sorted so two descriptors describing the same seam compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryDescriptor {
    offset: IVec2,
    links: Vec<BoundaryLink>,
}

impl BoundaryDescriptor {
    pub fn new(offset: IVec2, mut links: Vec<BoundaryLink>) -> Self {
        links.sort();
        links.dedup();
        Self { offset, links }
    }

    /// Derive the seam links from the two grids.
    ///
    /// A link joins a traversable local cell to the traversable remote cell
    /// one orthogonal step beyond the local grid's edge.
    pub fn from_offset(offset: IVec2, local: &NavigationGrid, remote: &NavigationGrid) -> Self {
        const STEPS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

        let mut links = Vec::new();
        for y in 0..local.height() as i32 {
            for x in 0..local.width() as i32 {
                let cell = GridPoint::new(x, y);
                if !local.is_traversable(cell) {
                    continue;
                }
                for (dx, dy) in STEPS {
                    let beyond = GridPoint::new(x + dx, y + dy);
                    if local.in_bounds(beyond) {
                        continue;
                    }
                    let remote_cell = beyond.offset(-offset);
                    if remote.is_traversable(remote_cell) {
                        links.push(BoundaryLink::new(cell, remote_cell));
                    }
                }
            }
        }

        Self::new(offset, links)
    }

    /// The same seam seen from the neighbouring region.
    pub fn inverse(&self) -> Self {
        Self::new(-self.offset, self.links.iter().map(|l| l.flipped()).collect())
    }

    pub fn offset(&self) -> IVec2 {
        self.offset
    }

    pub fn links(&self) -> &[BoundaryLink] {
        &self.links
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Remote cell expressed in the local frame.
    pub fn to_local(&self, remote: GridPoint) -> GridPoint {
        remote.offset(self.offset)
    }

    /// Local cell expressed in the remote frame.
    pub fn to_remote(&self, local: GridPoint) -> GridPoint {
        local.offset(-self.offset)
    }
}
