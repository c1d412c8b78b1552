use thiserror::Error;

use crate::engine::fixed_math::FixedNum;
use crate::engine::navigation::RegionId;

#[derive(Error, Debug)]
pub enum NavError {
    // Grid errors
    #[error("Cell ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds { x: i32, y: i32, width: u32, height: u32 },

    #[error("Movement cost must be non-negative, got {0}")]
    InvalidCost(FixedNum),

    // Pathfinding errors
    #[error("Invalid path request: {0}")]
    InvalidRequest(String),

    #[error("No route from region {from:?} to region {to:?}")]
    Unreachable { from: RegionId, to: RegionId },

    // Region graph errors
    #[error("Region {0:?} is not registered")]
    UnknownRegion(RegionId),

    #[error("Bad region association: {0}")]
    BadAssociation(String),

    #[error("Attempting to remove a non-associated region is not allowed: {0}")]
    BadDissociation(String),

    // Collaborator errors, surfaced unchanged
    #[error("Cannot run an empty animation")]
    EmptyAnimation,

    #[error("Mismatched sizes: expected {expected}, found {found}")]
    MismatchedSizes { expected: usize, found: usize },

    // Persistence and configuration
    #[error("Cannot read the file: {0}")]
    BadFile(String),

    #[error("Lookup key is empty")]
    EmptyKey,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NavError {
    /// True when no route exists, as opposed to a malformed request.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, NavError::Unreachable { .. })
    }
}

/// Result type alias for all navigation operations
pub type NavResult<T> = Result<T, NavError>;
