//! Helpers for moving an object along a route in world space.

use bevy::prelude::*;
use std::collections::VecDeque;
use std::time::Duration;

/// Result of one movement step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Step {
    pub position: Vec2,
    /// Distance left to the destination after the step.
    pub remaining: f32,
    /// Heading from the old position to the destination, in radians.
    /// Zero when already at the destination.
    pub heading: f32,
}

/// Move from `position` at most `max_step` towards `destination`.
///
/// Lands exactly on the destination when it is within reach.
pub fn step_towards_point(position: Vec2, destination: Vec2, max_step: f32) -> Step {
    let delta = destination - position;
    let distance = delta.length();
    if distance == 0.0 {
        return Step { position: destination, remaining: 0.0, heading: 0.0 };
    }

    let heading = delta.y.atan2(delta.x);
    if distance <= max_step {
        Step { position: destination, remaining: 0.0, heading }
    } else {
        let step = delta / distance * max_step.max(0.0);
        Step { position: position + step, remaining: distance - max_step.max(0.0), heading }
    }
}

/// Advance towards the front of `path` at `speed` world units per second.
///
/// The front waypoint is popped once it is reached. An empty path leaves the
/// position unchanged and returns `None`.
pub fn advance_along_path(position: Vec2, path: &mut VecDeque<Vec2>, elapsed: Duration, speed: f32) -> Option<Step> {
    let destination = *path.front()?;
    let step = step_towards_point(position, destination, elapsed.as_secs_f32() * speed);
    if step.position == destination {
        path.pop_front();
    }
    Some(step)
}
