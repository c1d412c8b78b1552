use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use tracing::{info, warn};

use kestrel::engine::config::{NavConfig, DEFAULT_CONFIG_PATH};
use kestrel::engine::controller::CoreEventController;
use kestrel::engine::coordinates::{CoordinateConverter, WorldAnchor};
use kestrel::engine::fixed_math::FixedNum;
use kestrel::engine::logging::setup_file_logging;
use kestrel::engine::navigation::{
    ClusterGreenhouse, GridPoint, NavigationGrid, NavigationGridData, PathRequest, RegionId,
};
use kestrel::engine::region::RegionRegistry;
use kestrel::engine::{EnginePlugin, NavResult};

const REGION_SIZE: u32 = 32;
const DEMO_SEED: u64 = 0x6b65_7374;
const DEMO_FRAMES: usize = 3;

/// Open grid with a few blobs of rough and blocked terrain grown over it.
fn scatter_terrain(config: &NavConfig, rng: &mut StdRng) -> NavResult<NavigationGrid> {
    let open = NavigationGridData::open(FixedNum::from_num(config.default_weight));
    let mut grid = NavigationGrid::filled(REGION_SIZE, REGION_SIZE, config.connectivity, open);

    let blobs = ClusterGreenhouse::new(&grid).grow_weighted(&[0.06, 0.04], rng);
    for (index, blob) in blobs.iter().enumerate() {
        for cell in blob {
            if index % 2 == 0 {
                grid.set_traversable(cell.x, cell.y, false)?;
            } else {
                grid.set_cost(cell.x, cell.y, FixedNum::from_num(4))?;
            }
        }
    }
    // Keep the demo endpoints open.
    for corner in [GridPoint::new(1, 1), GridPoint::new(REGION_SIZE as i32 - 2, REGION_SIZE as i32 - 2)] {
        grid.set_traversable(corner.x, corner.y, true)?;
    }
    grid.recompute_blocker_distances();
    Ok(grid)
}

fn build_world(config: &NavConfig) -> NavResult<(RegionRegistry, RegionId, RegionId)> {
    let mut rng = StdRng::seed_from_u64(DEMO_SEED);
    let mut registry = config.region_registry();

    let west = registry.create_region(scatter_terrain(config, &mut rng)?);
    let east = registry.create_region(scatter_terrain(config, &mut rng)?);

    let width = config.grid_square_width;
    for (id, origin_x) in [(west, 0.0), (east, REGION_SIZE as f32 * width)] {
        let region = registry.region_mut(id)?;
        *region.converter_mut() = CoordinateConverter::new(width, WorldAnchor::at(Vec2::new(origin_x, 0.0)));
    }
    registry.link_regions(west, east, IVec2::new(REGION_SIZE as i32, 0))?;

    Ok((registry, west, east))
}

fn main() -> NavResult<()> {
    let config = NavConfig::load_or_default(DEFAULT_CONFIG_PATH);
    let log_file = setup_file_logging(&config.log)?;

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║  Kestrel navigation demo - Logging to file               ║");
    println!("╠══════════════════════════════════════════════════════════╣");
    println!("║  Log file: {:<42} ║", log_file.display());
    println!("╚══════════════════════════════════════════════════════════╝");

    let (registry, west, east) = build_world(&config)?;
    for region in registry.iter() {
        info!(
            "Region {:?}: {} cells open, {} clusters",
            region.id(),
            region.grid().traversable_count(),
            region.clusters().len()
        );
    }

    let far = REGION_SIZE as i32 - 2;
    let request = PathRequest::across(west, GridPoint::new(1, 1), east, GridPoint::new(far, far));
    match config.pathfinder().find_path(&registry, &request) {
        Ok(route) => info!(
            "Route through {:?}: {} waypoints, cost {}",
            route.regions(),
            route.len(),
            route.cost
        ),
        Err(err) => warn!("No demo route: {}", err),
    }

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(EnginePlugin)
        .insert_resource(config)
        .insert_resource(registry);
    app.update();

    {
        let world = app.world_mut();
        let registry = world.resource::<RegionRegistry>();
        let mut controller = CoreEventController::new();
        controller.set_active_region(registry, west)?;
        controller.swap_region(east);
        world.insert_resource(controller);
    }

    for _ in 0..DEMO_FRAMES {
        app.update();
        std::thread::sleep(Duration::from_millis(16));
    }

    let controller = app.world().resource::<CoreEventController>();
    info!(
        "Ran {} frames, active region {:?}",
        controller.frame(),
        controller.active_region()
    );
    Ok(())
}
