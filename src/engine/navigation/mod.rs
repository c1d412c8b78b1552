mod types;
mod grid;
mod cluster;
mod greenhouse;
mod astar;
mod pathfinder;
pub mod tools;

#[cfg(test)]
mod tests;

// ============================================================================
// PUBLIC API
// ============================================================================

pub use types::{
    ClusterId, Connectivity, GridPoint, PathRequest, RegionId, Route, Waypoint, BLOCKED_WEIGHT,
    DEFAULT_MAX_CLUSTER_SIZE,
};
pub use grid::{NavigationGrid, NavigationGridData};
pub use cluster::{Cluster, ClusterSet};
pub use greenhouse::ClusterGreenhouse;
pub use pathfinder::{Pathfinder, DEFAULT_MAX_SEARCH_ITERATIONS};
