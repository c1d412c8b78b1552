use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use crate::engine::coordinates::CoordinateConverter;
use crate::engine::error::{NavError, NavResult};
use crate::engine::navigation::{NavigationGrid, RegionId};
use crate::engine::region::{BoundaryDescriptor, GameRegion, RegionRegistry};

pub const SNAPSHOT_VERSION: u32 = 1;

// ============================================================================
// File stores
// ============================================================================

/// Byte storage addressed by string keys.
pub trait FileStore {
    fn read(&self, key: &str) -> NavResult<Vec<u8>>;
    fn write(&mut self, key: &str, bytes: &[u8]) -> NavResult<()>;
}

/// Files under a root directory; keys are paths relative to it.
#[derive(Clone, Debug)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> NavResult<PathBuf> {
        if key.is_empty() {
            return Err(NavError::EmptyKey);
        }
        Ok(self.root.join(key))
    }
}

impl FileStore for DirectoryStore {
    fn read(&self, key: &str) -> NavResult<Vec<u8>> {
        let path = self.path_for(key)?;
        fs::read(&path).map_err(|e| NavError::BadFile(format!("{}: {}", path.display(), e)))
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> NavResult<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(fs::File::create(&path)?);
        writer.write_all(bytes)?;
        writer.flush()?;
        Ok(())
    }
}

/// In-memory store, mostly for tests and tooling.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.files.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileStore for MemoryStore {
    fn read(&self, key: &str) -> NavResult<Vec<u8>> {
        if key.is_empty() {
            return Err(NavError::EmptyKey);
        }
        self.files
            .get(key)
            .cloned()
            .ok_or_else(|| NavError::BadFile(format!("{}: no such entry", key)))
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> NavResult<()> {
        if key.is_empty() {
            return Err(NavError::EmptyKey);
        }
        self.files.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// XOR every byte of `data` with the repeating `key`. Applying it twice
/// with the same key restores the input.
pub fn xor_cipher(data: &[u8], key: &[u8]) -> NavResult<Vec<u8>> {
    if key.is_empty() {
        return Err(NavError::EmptyKey);
    }
    Ok(data.iter().zip(key.iter().cycle()).map(|(b, k)| b ^ k).collect())
}

/// Wraps another store, ciphering bytes on the way in and out.
#[derive(Clone, Debug)]
pub struct CipherStore<S> {
    inner: S,
    key: Vec<u8>,
}

impl<S: FileStore> CipherStore<S> {
    pub fn new(inner: S, key: impl Into<Vec<u8>>) -> NavResult<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(NavError::EmptyKey);
        }
        Ok(Self { inner, key })
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: FileStore> FileStore for CipherStore<S> {
    fn read(&self, key: &str) -> NavResult<Vec<u8>> {
        xor_cipher(&self.inner.read(key)?, &self.key)
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> NavResult<()> {
        let ciphered = xor_cipher(bytes, &self.key)?;
        self.inner.write(key, &ciphered)
    }
}

// ============================================================================
// Snapshots
// ============================================================================

/// Everything needed to rebuild one region, minus its collaborators
/// (drawables and updatables are runtime objects and are not captured).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RegionSnapshot {
    pub id: RegionId,
    pub grid: NavigationGrid,
    pub initial_grid: NavigationGrid,
    pub converter: CoordinateConverter,
    pub max_cluster_size: Option<usize>,
    pub neighbors: Vec<(RegionId, BoundaryDescriptor)>,
    pub parent: Option<RegionId>,
}

impl RegionSnapshot {
    pub fn capture(region: &GameRegion) -> Self {
        Self {
            id: region.id(),
            grid: region.grid().clone(),
            initial_grid: region.initial_grid().clone(),
            converter: *region.converter(),
            max_cluster_size: region.max_cluster_size(),
            neighbors: region.neighbors().map(|(id, d)| (id, d.clone())).collect(),
            parent: region.parent(),
        }
    }

    /// Region without graph links; [`WorldSnapshot::restore`] re-adds them.
    pub fn to_region(&self) -> NavResult<GameRegion> {
        for (name, grid) in [("grid", &self.grid), ("initial grid", &self.initial_grid)] {
            if !grid.is_well_formed() {
                return Err(NavError::BadFile(format!(
                    "region {:?}: {} {}x{} holds {} cells",
                    self.id,
                    name,
                    grid.width(),
                    grid.height(),
                    grid.cell_count()
                )));
            }
        }
        if self.id.0 == u32::MAX {
            return Err(NavError::BadFile(format!("region id {} is out of range", self.id.0)));
        }
        if self.grid.width() != self.initial_grid.width() || self.grid.height() != self.initial_grid.height() {
            return Err(NavError::BadFile(format!("region {:?}: grid and initial grid differ in shape", self.id)));
        }
        Ok(GameRegion::restore(self.id, self.grid.clone(), self.initial_grid.clone())
            .with_converter(self.converter)
            .with_max_cluster_size(self.max_cluster_size))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WorldSnapshot {
    pub version: u32,
    pub regions: Vec<RegionSnapshot>,
}

impl WorldSnapshot {
    pub fn capture(registry: &RegionRegistry) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            regions: registry.iter().map(RegionSnapshot::capture).collect(),
        }
    }

    /// Rebuild a registry. Every stored edge must appear on both of its
    /// regions as exact inverses.
    pub fn restore(&self) -> NavResult<RegionRegistry> {
        let by_id: BTreeMap<RegionId, &RegionSnapshot> = self.regions.iter().map(|r| (r.id, r)).collect();

        for snapshot in &self.regions {
            for (other, descriptor) in &snapshot.neighbors {
                let mirrored = by_id
                    .get(other)
                    .and_then(|o| o.neighbors.iter().find(|(id, _)| *id == snapshot.id))
                    .map(|(_, d)| d);
                if mirrored != Some(&descriptor.inverse()) {
                    return Err(NavError::BadAssociation(format!(
                        "edge {:?} -> {:?} has no matching inverse",
                        snapshot.id, other
                    )));
                }
            }
        }

        let mut registry = RegionRegistry::new();
        for snapshot in &self.regions {
            registry.insert_region(snapshot.to_region()?)?;
        }
        for snapshot in &self.regions {
            for (other, descriptor) in &snapshot.neighbors {
                if snapshot.id < *other {
                    registry.add_neighbor(snapshot.id, *other, descriptor.clone())?;
                }
            }
        }
        for snapshot in &self.regions {
            if let Some(parent) = snapshot.parent {
                registry.set_parent(snapshot.id, parent)?;
            }
        }
        Ok(registry)
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// bincode inside a zlib stream.
pub fn encode<T: Serialize>(value: &T) -> NavResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    bincode::serialize_into(&mut encoder, value).map_err(|e| NavError::BadFile(e.to_string()))?;
    Ok(encoder.finish()?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> NavResult<T> {
    let mut decoder = ZlibDecoder::new(bytes);
    bincode::deserialize_from(&mut decoder).map_err(|e| NavError::BadFile(e.to_string()))
}

pub fn save_world(store: &mut dyn FileStore, key: &str, registry: &RegionRegistry) -> NavResult<()> {
    let snapshot = WorldSnapshot::capture(registry);
    store.write(key, &encode(&snapshot)?)?;
    info!("[PERSISTENCE] Saved {} regions to {}", snapshot.regions.len(), key);
    Ok(())
}

pub fn load_world(store: &dyn FileStore, key: &str) -> NavResult<RegionRegistry> {
    let snapshot: WorldSnapshot = decode(&store.read(key)?)?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(NavError::BadFile(format!(
            "{}: snapshot version {} (expected {})",
            key, snapshot.version, SNAPSHOT_VERSION
        )));
    }
    let registry = snapshot.restore()?;
    info!("[PERSISTENCE] Loaded {} regions from {}", registry.len(), key);
    Ok(registry)
}

pub fn save_region(store: &mut dyn FileStore, key: &str, region: &GameRegion) -> NavResult<()> {
    store.write(key, &encode(&RegionSnapshot::capture(region))?)
}

pub fn load_region(store: &dyn FileStore, key: &str) -> NavResult<RegionSnapshot> {
    decode(&store.read(key)?)
}
