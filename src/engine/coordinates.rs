use bevy::prelude::*;
use serde::{Serialize, Deserialize};
use std::collections::VecDeque;
use crate::engine::navigation::GridPoint;

/// Default width of one grid square in world units.
pub const DEFAULT_GRID_SQUARE_WIDTH: f32 = 50.0;

/// Placement of a region's local space in the world: offset of the local
/// origin, rotation in radians and uniform scale.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldAnchor {
    pub origin: Vec2,
    pub rotation: f32,
    pub scale: f32,
}

impl WorldAnchor {
    pub const IDENTITY: Self = Self { origin: Vec2::ZERO, rotation: 0.0, scale: 1.0 };

    pub fn at(origin: Vec2) -> Self {
        Self { origin, ..Self::IDENTITY }
    }
}

impl Default for WorldAnchor {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// `origin + R(rotation) * (scale * local)`.
pub fn to_global(local: Vec2, anchor: &WorldAnchor) -> Vec2 {
    anchor.origin + Vec2::from_angle(anchor.rotation).rotate(local * anchor.scale)
}

/// Inverse of [`to_global`]. A zero scale collapses every point onto the
/// origin, so the local position is reported as zero.
pub fn to_local(global: Vec2, anchor: &WorldAnchor) -> Vec2 {
    if anchor.scale == 0.0 {
        return Vec2::ZERO;
    }
    Vec2::from_angle(-anchor.rotation).rotate(global - anchor.origin) / anchor.scale
}

/// Maps grid cells of one region to world positions and back.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoordinateConverter {
    grid_square_width: f32,
    anchor: WorldAnchor,
}

impl Default for CoordinateConverter {
    fn default() -> Self {
        Self { grid_square_width: DEFAULT_GRID_SQUARE_WIDTH, anchor: WorldAnchor::IDENTITY }
    }
}

impl CoordinateConverter {
    pub fn new(grid_square_width: f32, anchor: WorldAnchor) -> Self {
        Self { grid_square_width, anchor }
    }

    pub fn grid_square_width(&self) -> f32 {
        self.grid_square_width
    }

    pub fn anchor(&self) -> &WorldAnchor {
        &self.anchor
    }

    pub fn set_grid_square_width(&mut self, width: f32) {
        self.grid_square_width = width;
    }

    pub fn set_anchor(&mut self, anchor: WorldAnchor) {
        self.anchor = anchor;
    }

    pub fn set_origin(&mut self, origin: Vec2) {
        self.anchor.origin = origin;
    }

    /// World position of the centre of `cell`.
    pub fn grid_to_global(&self, cell: GridPoint) -> Vec2 {
        let local = (cell.as_ivec2().as_vec2() + Vec2::splat(0.5)) * self.grid_square_width;
        to_global(local, &self.anchor)
    }

    /// Cell containing `point`. Cell edges belong to the cell to their right
    /// and below.
    pub fn global_to_grid(&self, point: Vec2) -> GridPoint {
        if self.grid_square_width == 0.0 {
            return GridPoint::default();
        }
        let cell = (to_local(point, &self.anchor) / self.grid_square_width).floor();
        GridPoint::new(cell.x as i32, cell.y as i32)
    }

    /// Region-local position, in grid units, to world space.
    pub fn local_to_global(&self, local: Vec2) -> Vec2 {
        to_global(local * self.grid_square_width, &self.anchor)
    }

    pub fn path_to_global<'a>(&self, path: impl IntoIterator<Item = &'a GridPoint>) -> VecDeque<Vec2> {
        path.into_iter().map(|c| self.grid_to_global(*c)).collect()
    }

    pub fn path_to_grid<'a>(&self, path: impl IntoIterator<Item = &'a Vec2>) -> VecDeque<GridPoint> {
        path.into_iter().map(|p| self.global_to_grid(*p)).collect()
    }
}
