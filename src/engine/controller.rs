use bevy::prelude::*;
use std::time::Duration;
use tracing::{info, warn};
use crate::engine::error::{NavError, NavResult};
use crate::engine::navigation::RegionId;
use crate::engine::region::{DrawableHandle, RegionRegistry, RenderTarget};
use crate::profile_log;

/// Called with the new region id whenever the active region changes.
pub type ActiveRegionCallback = Box<dyn Fn(RegionId) + Send + Sync>;

/// Owns the notion of the active region and drives it once per frame.
///
/// `set_active_region` switches immediately. `swap_region` queues a switch
/// that is applied at the end of the frame, after the active region has been
/// updated; a region may also queue its own successor through
/// [`GameRegion::request_next_region`](crate::engine::region::GameRegion::request_next_region).
#[derive(Resource, Default)]
pub struct CoreEventController {
    active: Option<RegionId>,
    pending_swap: Option<RegionId>,
    callbacks: Vec<ActiveRegionCallback>,
    frame: u64,
}

impl CoreEventController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_region(&self) -> Option<RegionId> {
        self.active
    }

    pub fn pending_swap(&self) -> Option<RegionId> {
        self.pending_swap
    }

    /// Frames driven so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn register_set_active_region_cb(&mut self, callback: ActiveRegionCallback) {
        self.callbacks.push(callback);
    }

    pub fn set_active_region(&mut self, registry: &RegionRegistry, region: RegionId) -> NavResult<()> {
        if !registry.contains(region) {
            return Err(NavError::UnknownRegion(region));
        }
        let previous = self.active.replace(region);
        if previous != Some(region) {
            info!("[REGIONS] Active region {:?} -> {:?}", previous, region);
        }
        for callback in &self.callbacks {
            callback(region);
        }
        Ok(())
    }

    /// Queue a switch to `region` for the end of the frame.
    pub fn swap_region(&mut self, region: RegionId) {
        self.pending_swap = Some(region);
    }

    /// Apply a queued switch, from [`swap_region`](Self::swap_region) first and
    /// otherwise from the active region's own request. Returns the new active
    /// region when a switch happened.
    pub fn apply_swap(&mut self, registry: &mut RegionRegistry) -> NavResult<Option<RegionId>> {
        let requested = self.active.and_then(|id| registry.get_mut(id)).and_then(|r| r.take_next_region());
        let Some(next) = self.pending_swap.take().or(requested) else {
            return Ok(None);
        };
        if self.active == Some(next) {
            return Ok(None);
        }
        self.set_active_region(registry, next)?;
        Ok(Some(next))
    }

    /// Tick every updatable of the active region once.
    pub fn update(&mut self, registry: &mut RegionRegistry, elapsed: Duration) {
        self.frame += 1;
        let Some(region) = self.active.and_then(|id| registry.get_mut(id)) else {
            return;
        };
        region.update(elapsed);
        profile_log!(
            self.frame,
            "[REGIONS] Frame {}: {} updatables ticked in {:?}",
            self.frame,
            region.updatable_count(),
            region.id()
        );
    }

    /// Submit the active region's drawables in priority order, placed in
    /// world space. Compound drawables submit their leaves instead of
    /// themselves, however deeply they nest. Returns how many handles were
    /// submitted.
    pub fn draw(&self, registry: &RegionRegistry, target: &mut dyn RenderTarget) -> usize {
        let Some(region) = self.active.and_then(|id| registry.get(id)) else {
            return 0;
        };
        let converter = region.converter();

        let mut submitted = 0;
        for (priority, drawable) in region.drawables().iter() {
            let mut place = |handle: &DrawableHandle, local: Vec2| {
                target.submit(priority, handle, converter.local_to_global(local));
                submitted += 1;
            };
            submit_leaves(drawable, drawable.local_position(), 0, &mut place);
        }
        submitted
    }
}

/// Nesting deeper than this is treated as a cycle and cut off.
const MAX_COMPOUND_DEPTH: usize = 32;

/// Walk `drawable` placed at `at`, handing every leaf to `place`. A nested
/// compound's components move with the position its parent gave it.
fn submit_leaves(
    drawable: &DrawableHandle,
    at: Vec2,
    depth: usize,
    place: &mut dyn FnMut(&DrawableHandle, Vec2),
) {
    let components = drawable.components();
    if components.is_empty() {
        place(drawable, at);
        return;
    }
    if depth >= MAX_COMPOUND_DEPTH {
        warn!("[REGIONS] Compound drawable nested past {} levels, skipping", MAX_COMPOUND_DEPTH);
        return;
    }
    let shift = at - drawable.local_position();
    for (position, component) in &components {
        submit_leaves(component, *position + shift, depth + 1, place);
    }
}

/// Registers the region arena and the controller, and drives the active
/// region from Bevy's `Update` schedule.
pub struct CoreEventControllerPlugin;

impl Plugin for CoreEventControllerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RegionRegistry>();
        app.init_resource::<CoreEventController>();
        app.add_systems(Update, drive_active_region);
    }
}

/// Update the active region with the frame delta, then apply pending swaps.
pub fn drive_active_region(
    time: Res<Time>,
    mut controller: ResMut<CoreEventController>,
    mut registry: ResMut<RegionRegistry>,
) {
    controller.update(&mut registry, time.delta());
    if let Err(err) = controller.apply_swap(&mut registry) {
        warn!("[REGIONS] Region swap failed: {}", err);
    }
}
