use bevy::prelude::*;

pub mod config;
pub mod controller;
pub mod coordinates;
pub mod error;
pub mod fixed_math;
pub mod logging;
pub mod navigation;
pub mod persistence;
pub mod region;

use config::NavConfigPlugin;
use controller::CoreEventControllerPlugin;

pub use error::{NavError, NavResult};

/// Bundles the configuration loader and the frame driver.
///
/// Headless hosts add this next to `MinimalPlugins`; the region and controller
/// resources are available from the first `Startup` run.
pub struct EnginePlugin;

impl Plugin for EnginePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((NavConfigPlugin, CoreEventControllerPlugin));
    }
}
