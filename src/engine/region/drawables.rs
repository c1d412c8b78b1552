use bevy::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use crate::engine::error::{NavError, NavResult};

/// Something ticked once per frame with the elapsed time.
pub trait Updatable: Send + Sync {
    fn update(&mut self, elapsed: Duration);
}

/// Something a renderer can place in the world.
///
/// Positions are region-local grid units; the controller maps them to world
/// space through the region's converter.
pub trait Drawable: Send + Sync {
    fn local_position(&self) -> Vec2;

    /// Child drawables with their local positions. Leaf drawables have none.
    fn components(&self) -> Vec<(Vec2, DrawableHandle)> {
        Vec::new()
    }
}

/// Shared handle to a drawable. Identity is the allocation, not the value.
pub type DrawableHandle = Arc<dyn Drawable>;

/// Receives each drawable of the active region in priority order.
pub trait RenderTarget {
    fn submit(&mut self, priority: i32, drawable: &DrawableHandle, world_position: Vec2);
}

#[inline]
pub(crate) fn same_handle(a: &DrawableHandle, b: &DrawableHandle) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Drawables ordered by ascending priority, insertion order within a priority.
#[derive(Default, Clone)]
pub struct PriorityDrawables {
    entries: Vec<(i32, DrawableHandle)>,
}

impl PriorityDrawables {
    /// Insert `drawable` at `priority`. A handle that is already present is
    /// moved; it never appears twice.
    pub fn add(&mut self, priority: i32, drawable: DrawableHandle) {
        self.remove(&drawable);
        let at = self.entries.partition_point(|(p, _)| *p <= priority);
        self.entries.insert(at, (priority, drawable));
    }

    /// Returns whether the handle was present.
    pub fn remove(&mut self, drawable: &DrawableHandle) -> bool {
        match self.entries.iter().position(|(_, d)| same_handle(d, drawable)) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn clear_priority(&mut self, priority: i32) {
        self.entries.retain(|(p, _)| *p != priority);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_at(&self, priority: i32) -> usize {
        self.entries.iter().filter(|(p, _)| *p == priority).count()
    }

    pub fn contains(&self, drawable: &DrawableHandle) -> bool {
        self.entries.iter().any(|(_, d)| same_handle(d, drawable))
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &DrawableHandle)> {
        self.entries.iter().map(|(p, d)| (*p, d))
    }
}

/// A drawable made of child drawables placed at fixed offsets from its own
/// position.
pub struct CompoundDrawable {
    position: Vec2,
    components: Vec<DrawableHandle>,
    offsets: Vec<Vec2>,
}

impl CompoundDrawable {
    pub fn new(position: Vec2, components: Vec<DrawableHandle>, offsets: Vec<Vec2>) -> NavResult<Self> {
        if components.len() != offsets.len() {
            return Err(NavError::MismatchedSizes { expected: components.len(), found: offsets.len() });
        }
        Ok(Self { position, components, offsets })
    }

    pub fn add_component(&mut self, component: DrawableHandle, offset: Vec2) {
        self.components.push(component);
        self.offsets.push(offset);
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl Drawable for CompoundDrawable {
    fn local_position(&self) -> Vec2 {
        self.position
    }

    fn components(&self) -> Vec<(Vec2, DrawableHandle)> {
        self.components
            .iter()
            .zip(&self.offsets)
            .map(|(c, offset)| (self.position + *offset, c.clone()))
            .collect()
    }
}

/// A plain positioned marker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointDrawable {
    pub position: Vec2,
}

impl Drawable for PointDrawable {
    fn local_position(&self) -> Vec2 {
        self.position
    }
}

/// Cycles through frame indices at a fixed rate.
#[derive(Clone, Debug)]
pub struct FrameAnimation {
    frames: Vec<u32>,
    frame_time: Duration,
    elapsed: Duration,
    current: usize,
}

impl FrameAnimation {
    pub fn new(frames: Vec<u32>, frame_time: Duration) -> NavResult<Self> {
        if frames.is_empty() {
            return Err(NavError::EmptyAnimation);
        }
        Ok(Self { frames, frame_time, elapsed: Duration::ZERO, current: 0 })
    }

    pub fn current_frame(&self) -> u32 {
        self.frames[self.current]
    }
}

impl Updatable for FrameAnimation {
    fn update(&mut self, elapsed: Duration) {
        if self.frame_time.is_zero() {
            return;
        }
        self.elapsed += elapsed;
        while self.elapsed >= self.frame_time {
            self.elapsed -= self.frame_time;
            self.current = (self.current + 1) % self.frames.len();
        }
    }
}
