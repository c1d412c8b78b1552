use bevy::math::{IVec2, Vec2};
use kestrel::engine::coordinates::{CoordinateConverter, WorldAnchor};
use kestrel::engine::navigation::{
    Connectivity, GridPoint, NavigationGrid, NavigationGridData, PathRequest, Pathfinder, RegionId,
};
use kestrel::engine::persistence::{
    encode, load_world, save_world, CipherStore, DirectoryStore, FileStore, MemoryStore, WorldSnapshot,
    SNAPSHOT_VERSION,
};
use kestrel::engine::region::{BoundaryDescriptor, RegionRegistry};
use kestrel::engine::NavError;
use serde::Serialize;

/// Same wire layout as `NavigationGrid`, without its construction checks.
#[derive(Serialize)]
struct RawGrid {
    width: u32,
    height: u32,
    connectivity: Connectivity,
    cells: Vec<NavigationGridData>,
}

/// Same wire layout as `RegionSnapshot`.
#[derive(Serialize)]
struct RawRegion {
    id: RegionId,
    grid: RawGrid,
    initial_grid: RawGrid,
    converter: CoordinateConverter,
    max_cluster_size: Option<usize>,
    neighbors: Vec<(RegionId, BoundaryDescriptor)>,
    parent: Option<RegionId>,
}

/// Same wire layout as `WorldSnapshot`.
#[derive(Serialize)]
struct RawWorld {
    version: u32,
    regions: Vec<RawRegion>,
}

fn raw_grid(width: u32, height: u32, cells: usize) -> RawGrid {
    RawGrid { width, height, connectivity: Connectivity::Eight, cells: vec![NavigationGridData::default(); cells] }
}

fn raw_region(id: u32, grid: RawGrid) -> RawRegion {
    RawRegion {
        id: RegionId(id),
        initial_grid: raw_grid(grid.width, grid.height, grid.cells.len()),
        grid,
        converter: CoordinateConverter::default(),
        max_cluster_size: Some(64),
        neighbors: Vec::new(),
        parent: None,
    }
}

fn store_with(world: &RawWorld) -> MemoryStore {
    let mut store = MemoryStore::new();
    store.write("world", &encode(world).expect("serializable")).expect("writable");
    store
}

/// Three regions in an L: a child hanging off the first, and a wall cut
/// into the second.
fn build_world() -> RegionRegistry {
    let mut registry = RegionRegistry::new();
    let a = registry.create_region(NavigationGrid::new(6, 6, Connectivity::Eight));
    let b = registry.create_region(NavigationGrid::new(6, 6, Connectivity::Eight));
    let c = registry.create_region(NavigationGrid::new(4, 4, Connectivity::Four));

    registry.link_regions(a, b, IVec2::new(6, 0)).expect("regions exist");
    registry.set_parent(c, a).expect("no cycle");
    let region_b = registry.get_mut(b).expect("registered");
    region_b.set_traversable(GridPoint::new(2, 2), false).expect("in bounds");
    *region_b.converter_mut() = CoordinateConverter::new(25.0, WorldAnchor::at(Vec2::new(150.0, 0.0)));
    registry
}

#[test]
fn test_world_survives_directory_round_trip() {
    let dir = std::env::temp_dir().join(format!("kestrel_persistence_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);

    let world = build_world();
    let mut store = DirectoryStore::new(&dir);
    save_world(&mut store, "saves/world.bin", &world).expect("writable");
    let loaded = load_world(&store, "saves/world.bin").expect("readable");

    assert_eq!(WorldSnapshot::capture(&loaded), WorldSnapshot::capture(&world));

    let ids: Vec<_> = loaded.ids().collect();
    assert!(loaded.get(ids[0]).expect("registered").is_neighbor(ids[1]));
    assert_eq!(loaded.get(ids[2]).and_then(|r| r.parent()), Some(ids[0]));
    assert!(!loaded.get(ids[1]).expect("registered").grid().is_traversable(GridPoint::new(2, 2)));

    // Routes across the restored seam are the same as before saving.
    let request = PathRequest::across(ids[0], GridPoint::new(0, 0), ids[1], GridPoint::new(5, 5));
    let pathfinder = Pathfinder::default();
    assert_eq!(
        pathfinder.find_path(&loaded, &request).expect("connected"),
        pathfinder.find_path(&world, &request).expect("connected")
    );

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_ciphered_store_round_trip() {
    let world = build_world();
    let mut store = CipherStore::new(MemoryStore::new(), b"kestrel".to_vec()).expect("non-empty key");
    save_world(&mut store, "world", &world).expect("writable");

    // The raw bytes are not a readable snapshot.
    assert!(matches!(load_world(store.inner(), "world"), Err(NavError::BadFile(_))));
    assert_eq!(
        WorldSnapshot::capture(&load_world(&store, "world").expect("readable")),
        WorldSnapshot::capture(&world)
    );
}

#[test]
fn test_one_sided_edge_is_rejected() {
    let mut snapshot = WorldSnapshot::capture(&build_world());
    snapshot.regions[1].neighbors.clear();

    let mut store = MemoryStore::new();
    store.write("world", &encode(&snapshot).expect("serializable")).expect("writable");
    assert!(matches!(load_world(&store, "world"), Err(NavError::BadAssociation(_))));
}

#[test]
fn test_missing_and_empty_keys() {
    let store = DirectoryStore::new(std::env::temp_dir().join("kestrel_no_such_dir"));
    assert!(matches!(load_world(&store, "nothing.bin"), Err(NavError::BadFile(_))));
    assert!(matches!(load_world(&store, ""), Err(NavError::EmptyKey)));
}

#[test]
fn test_version_mismatch_is_bad_file() {
    let mut snapshot = WorldSnapshot::capture(&build_world());
    snapshot.version += 1;

    let mut store = MemoryStore::new();
    store.write("world", &encode(&snapshot).expect("serializable")).expect("writable");
    assert!(matches!(load_world(&store, "world"), Err(NavError::BadFile(_))));
}

#[test]
fn test_raw_layout_matches_snapshot() {
    let world = RawWorld { version: SNAPSHOT_VERSION, regions: vec![raw_region(0, raw_grid(4, 4, 16))] };
    let loaded = load_world(&store_with(&world), "world").expect("well-formed snapshot");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded.get(RegionId(0)).expect("registered").grid().cell_count(), 16);
}

#[test]
fn test_grid_with_missing_cells_is_bad_file() {
    let world = RawWorld { version: SNAPSHOT_VERSION, regions: vec![raw_region(0, raw_grid(4, 4, 0))] };
    assert!(matches!(load_world(&store_with(&world), "world"), Err(NavError::BadFile(_))));

    let mut region = raw_region(0, raw_grid(4, 4, 16));
    region.initial_grid = raw_grid(4, 4, 15);
    let world = RawWorld { version: SNAPSHOT_VERSION, regions: vec![region] };
    assert!(matches!(load_world(&store_with(&world), "world"), Err(NavError::BadFile(_))));
}

#[test]
fn test_grid_with_negative_weight_is_bad_file() {
    let mut grid = raw_grid(2, 2, 4);
    grid.cells[3].weight = kestrel::engine::fixed_math::FixedNum::from_num(-2);
    let world = RawWorld { version: SNAPSHOT_VERSION, regions: vec![raw_region(0, grid)] };
    assert!(matches!(load_world(&store_with(&world), "world"), Err(NavError::BadFile(_))));
}

#[test]
fn test_largest_region_id_is_bad_file() {
    let world = RawWorld { version: SNAPSHOT_VERSION, regions: vec![raw_region(u32::MAX, raw_grid(2, 2, 4))] };
    assert!(matches!(load_world(&store_with(&world), "world"), Err(NavError::BadFile(_))));
}
