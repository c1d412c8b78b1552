use bevy::prelude::*;
use serde::{Serialize, Deserialize};
use std::cmp::Ordering;
use crate::engine::fixed_math::FixedNum;

/// Weight at or above which a cell counts as blocked regardless of its flag.
pub const BLOCKED_WEIGHT: i32 = 10_000;

/// Default upper bound on cells per cluster.
///
/// Keeps intra-cluster searches short. 64 cells is an 8×8 patch of open floor.
pub const DEFAULT_MAX_CLUSTER_SIZE: usize = 64;

/// Identifier of a region in the [`RegionRegistry`](crate::engine::region::RegionRegistry) arena.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub u32);

/// Index of a cluster inside one region's [`ClusterSet`](super::ClusterSet).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterId(pub u32);

impl ClusterId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Integer cell coordinate in a region's local grid.
///
/// Ordering is row-major: lower `y` first, then lower `x`. This is the seed
/// order used by the greenhouse.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

impl GridPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, by: IVec2) -> Self {
        Self { x: self.x + by.x, y: self.y + by.y }
    }

    pub fn as_ivec2(self) -> IVec2 {
        IVec2::new(self.x, self.y)
    }

    /// True when `other` is one orthogonal or diagonal step away.
    pub fn is_adjacent(self, other: GridPoint) -> bool {
        let dx = (self.x - other.x).abs();
        let dy = (self.y - other.y).abs();
        dx <= 1 && dy <= 1 && (dx + dy) > 0
    }
}

impl Ord for GridPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.y.cmp(&other.y).then_with(|| self.x.cmp(&other.x))
    }
}

impl PartialOrd for GridPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<(i32, i32)> for GridPoint {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Movement rule shared by clustering and cell-level search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Connectivity {
    /// Orthogonal steps only.
    Four,
    /// Orthogonal and diagonal steps. Diagonals never cut a blocked corner.
    #[default]
    Eight,
}

impl Connectivity {
    const ORTHOGONAL: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
    const DIAGONAL: [(i32, i32); 4] = [(1, 1), (-1, 1), (1, -1), (-1, -1)];

    /// Candidate step offsets, orthogonal first.
    pub fn offsets(self) -> impl Iterator<Item = (i32, i32)> {
        let diagonals: &'static [(i32, i32)] = match self {
            Connectivity::Four => &[],
            Connectivity::Eight => &Self::DIAGONAL,
        };
        Self::ORTHOGONAL.into_iter().chain(diagonals.iter().copied())
    }
}

/// A request to route from `start` to `goal`.
///
/// `start` is a cell of `origin_region`. `goal` is a cell of `goal_region`,
/// or of the origin region when no goal region is given.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRequest {
    pub start: GridPoint,
    pub goal: GridPoint,
    pub origin_region: RegionId,
    pub goal_region: Option<RegionId>,
}

impl PathRequest {
    pub fn within(region: RegionId, start: GridPoint, goal: GridPoint) -> Self {
        Self { start, goal, origin_region: region, goal_region: None }
    }

    pub fn across(origin: RegionId, start: GridPoint, goal_region: RegionId, goal: GridPoint) -> Self {
        Self { start, goal, origin_region: origin, goal_region: Some(goal_region) }
    }

    pub fn target_region(&self) -> RegionId {
        self.goal_region.unwrap_or(self.origin_region)
    }
}

/// One point of a returned route.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub region: RegionId,
    /// Cell in the waypoint's own region.
    pub cell: GridPoint,
    /// Cell centre in world space, expressed through the origin region's
    /// converter with boundary offsets chained along the route.
    pub global: Vec2,
}

/// Ordered waypoints from the request's start to its goal, start included.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub waypoints: Vec<Waypoint>,
    pub cost: FixedNum,
}

impl Route {
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn first(&self) -> Option<&Waypoint> {
        self.waypoints.first()
    }

    pub fn last(&self) -> Option<&Waypoint> {
        self.waypoints.last()
    }

    /// World positions in travel order, ready for path following.
    pub fn global_path(&self) -> std::collections::VecDeque<Vec2> {
        self.waypoints.iter().map(|w| w.global).collect()
    }

    /// Regions visited, in order, without repeats.
    pub fn regions(&self) -> Vec<RegionId> {
        let mut regions: Vec<RegionId> = Vec::new();
        for waypoint in &self.waypoints {
            if regions.last() != Some(&waypoint.region) {
                regions.push(waypoint.region);
            }
        }
        regions
    }
}
