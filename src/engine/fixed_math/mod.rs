//! Deterministic fixed-point arithmetic for path costs.
//!
//! Route costs and cluster centroids are accumulated in fixed point so that the
//! same grid produces bit-identical search results on every platform. World
//! placement (rendering, anchors with rotation) stays in `f32` through
//! [`bevy::math::Vec2`].

use fixed::types::I48F16;

pub use vec2::FixedVec2;

mod vec2;

/// Fixed-point number type used for movement weights and accumulated costs.
///
/// I48F16: 48 integer bits, 16 fractional bits (precision ~0.000015).
pub type FixedNum = I48F16;

/// Length of a diagonal grid step.
#[inline]
pub fn diagonal_step() -> FixedNum {
    FixedNum::from_num(std::f64::consts::SQRT_2)
}

/// Straight-line distance between two integer grid coordinates.
pub fn grid_distance(x1: i32, y1: i32, x2: i32, y2: i32) -> FixedNum {
    let dx = FixedNum::from_num(x1 - x2);
    let dy = FixedNum::from_num(y1 - y2);
    FixedVec2::new(dx, dy).length()
}
