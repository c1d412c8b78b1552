use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};
use crate::engine::coordinates::DEFAULT_GRID_SQUARE_WIDTH;
use crate::engine::error::{NavError, NavResult};
use crate::engine::navigation::{Connectivity, Pathfinder, DEFAULT_MAX_CLUSTER_SIZE, DEFAULT_MAX_SEARCH_ITERATIONS};
use crate::engine::region::RegionRegistry;

/// Default location of the navigation config, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "assets/nav_config.ron";

/// Log output settings, read by [`setup_file_logging`](crate::engine::logging::setup_file_logging).
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub directory: String,
    /// Number of old log files kept when a new one is created.
    pub keep_files: usize,
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            keep_files: 25,
            filter: "kestrel=info".to_string(),
        }
    }
}

/// Navigation parameters loaded once at startup.
///
/// Changing these after regions exist does not touch cached clusters; new
/// regions pick up the values at creation.
#[derive(Resource, Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct NavConfig {
    pub connectivity: Connectivity,
    /// `None` grows clusters over whole connected areas.
    pub max_cluster_size: Option<usize>,
    pub grid_square_width: f32,
    /// Weight given to open cells of newly generated grids.
    pub default_weight: i32,
    pub max_search_iterations: usize,
    pub log: LogConfig,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            connectivity: Connectivity::Eight,
            max_cluster_size: Some(DEFAULT_MAX_CLUSTER_SIZE),
            grid_square_width: DEFAULT_GRID_SQUARE_WIDTH,
            default_weight: 1,
            max_search_iterations: DEFAULT_MAX_SEARCH_ITERATIONS,
            log: LogConfig::default(),
        }
    }
}

impl NavConfig {
    pub fn from_ron(text: &str) -> NavResult<Self> {
        let config: Self = ron::from_str(text).map_err(|e| NavError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> NavResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_ron(&text)
    }

    /// Load `path`, falling back to defaults (with a warning) when the file is
    /// missing or invalid.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => {
                info!("[CONFIG] Loaded navigation config from {}", path.display());
                config
            }
            Err(err) => {
                warn!("[CONFIG] Using default navigation config, {} unusable: {}", path.display(), err);
                Self::default()
            }
        }
    }

    pub fn to_ron(&self) -> NavResult<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).map_err(|e| NavError::Config(e.to_string()))
    }

    pub fn validate(&self) -> NavResult<()> {
        if !(self.grid_square_width > 0.0) {
            return Err(NavError::Config(format!(
                "grid_square_width must be positive, got {}",
                self.grid_square_width
            )));
        }
        if self.default_weight < 0 {
            return Err(NavError::Config(format!("default_weight must be non-negative, got {}", self.default_weight)));
        }
        if self.max_cluster_size == Some(0) {
            return Err(NavError::Config("max_cluster_size must be at least 1".to_string()));
        }
        if self.max_search_iterations == 0 {
            return Err(NavError::Config("max_search_iterations must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn pathfinder(&self) -> Pathfinder {
        Pathfinder::new(self.max_search_iterations)
    }

    /// Empty registry whose new regions use the configured cluster size.
    pub fn region_registry(&self) -> RegionRegistry {
        RegionRegistry::new().with_max_cluster_size(self.max_cluster_size)
    }
}

/// Inserts [`NavConfig`] from [`DEFAULT_CONFIG_PATH`] unless the app already
/// has one.
pub struct NavConfigPlugin;

impl Plugin for NavConfigPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, load_nav_config);
    }
}

fn load_nav_config(mut commands: Commands, existing: Option<Res<NavConfig>>) {
    if existing.is_none() {
        commands.insert_resource(NavConfig::load_or_default(DEFAULT_CONFIG_PATH));
    }
}
