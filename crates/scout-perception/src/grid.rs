//! Chunked, disk-backed spatial grid.
//!
//! Tiles are grouped into square [`GridChunk`]s of `chunk_size × chunk_size`
//! tiles (all floors of a column share one chunk). Chunks are materialised
//! lazily, from disk when a file exists and blank otherwise, and are the unit
//! of persistence and of cache eviction:
//!
//! * a chunk is written to `<data_dir>/chunk_<cx>_<cy>.json` whenever it is
//!   dirty and is either evicted, flushed, or included in a snapshot export;
//! * a chunk not visited for `chunk_ttl_ms` is dropped from the cache by
//!   [`GridSystem::maintenance`].
//!
//! Eviction only affects residency. Tile knowledge never expires: an evicted
//! chunk is reloaded transparently the next time one of its tiles is read.
//!
//! # Concurrency
//!
//! All state sits behind one [`Mutex`]. Ingestion and the periodic snapshot
//! exporter may run on different threads; each operation holds the lock for
//! a single short critical section.
//!
//! # Example
//!
//! ```rust
//! use scout_perception::grid::{GridConfig, GridSystem};
//! use scout_types::TileObservation;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let grid = GridSystem::open(dir.path(), GridConfig::default()).unwrap();
//!
//! grid.update(&[TileObservation::new(3, 4, 0, true)], 1_000);
//! assert!(grid.get_tile(3, 4, 0).unwrap().walkable);
//! assert!(grid.get_tile(9, 9, 0).is_none()); // never sighted
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use scout_types::{TileObservation, TilePos, now_ms};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::pathfinder::WalkabilityMap;

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised by grid persistence.
#[derive(Error, Debug)]
pub enum GridError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed chunk file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Snapshot write to {} failed after {attempts} attempts: {source}", path.display())]
    SnapshotWrite {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: io::Error,
    },
    #[error("JSON encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Tunables for chunk residency and snapshot export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Edge length of a chunk, in tiles.
    pub chunk_size: i32,
    /// A chunk not visited for this long is evicted from memory.
    pub chunk_ttl_ms: i64,
    /// Attempts made to write a snapshot before the cycle is dropped.
    pub snapshot_retries: u32,
    pub snapshot_retry_delay_ms: u64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            chunk_size: 10,
            chunk_ttl_ms: 300_000,
            snapshot_retries: 3,
            snapshot_retry_delay_ms: 100,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

/// Persistent knowledge about one tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileRecord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub walkable: bool,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub layer: Option<String>,
    /// Epoch milliseconds of the most recent sighting.
    pub last_seen: i64,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl TileRecord {
    fn from_observation(obs: &TileObservation, timestamp: i64) -> Self {
        Self {
            x: obs.x,
            y: obs.y,
            z: obs.z,
            walkable: obs.walkable,
            room: obs.room.clone(),
            layer: obs.layer.clone(),
            last_seen: timestamp,
            meta: obs.meta.clone(),
        }
    }

    pub fn pos(&self) -> TilePos {
        TilePos::new(self.x, self.y, self.z)
    }
}

fn tile_key(x: i32, y: i32, z: i32) -> String {
    format!("{x}_{y}_{z}")
}

/// Chunk coordinate: tile coordinates floor-divided by the chunk size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cy: i32,
}

impl ChunkCoord {
    pub fn of(x: i32, y: i32, chunk_size: i32) -> Self {
        Self {
            cx: x.div_euclid(chunk_size),
            cy: y.div_euclid(chunk_size),
        }
    }

    fn file_name(&self) -> String {
        format!("chunk_{}_{}.json", self.cx, self.cy)
    }
}

/// A batch of tiles persisted and evicted together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridChunk {
    pub chunk_x: i32,
    pub chunk_y: i32,
    /// Tiles keyed by `"x_y_z"`.
    #[serde(default)]
    pub tiles: BTreeMap<String, TileRecord>,
    pub last_visited: i64,
    #[serde(skip)]
    pub dirty: bool,
}

impl GridChunk {
    fn blank(coord: ChunkCoord, now: i64) -> Self {
        Self {
            chunk_x: coord.cx,
            chunk_y: coord.cy,
            tiles: BTreeMap::new(),
            last_visited: now,
            dirty: false,
        }
    }

    pub fn tile(&self, x: i32, y: i32, z: i32) -> Option<&TileRecord> {
        self.tiles.get(&tile_key(x, y, z))
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridStats {
    pub loaded_chunks: usize,
    pub total_tiles: usize,
    pub dirty_chunks: usize,
    /// Chunk coordinates read before and found to have no usable file.
    pub absent_chunks: usize,
}

/// Result of a successful snapshot export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub tiles: usize,
    pub attempts: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// GridSystem
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct GridState {
    chunks: HashMap<ChunkCoord, GridChunk>,
    /// Missing or unreadable on disk; reads skip these until `update`
    /// creates the chunk.
    absent: HashSet<ChunkCoord>,
}

/// Owner of the chunk cache and its on-disk backing store.
pub struct GridSystem {
    config: GridConfig,
    data_dir: PathBuf,
    state: Mutex<GridState>,
}

impl GridSystem {
    /// Open a grid persisting chunks under `data_dir`, creating the directory
    /// if needed.
    pub fn open(data_dir: impl AsRef<Path>, config: GridConfig) -> Result<Self, GridError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir).map_err(|source| GridError::Io {
            path: data_dir.clone(),
            source,
        })?;
        let config = GridConfig {
            chunk_size: config.chunk_size.max(1),
            ..config
        };
        Ok(Self {
            config,
            data_dir,
            state: Mutex::new(GridState::default()),
        })
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn lock(&self) -> MutexGuard<'_, GridState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn coord_of(&self, x: i32, y: i32) -> ChunkCoord {
        ChunkCoord::of(x, y, self.config.chunk_size)
    }

    fn chunk_path(&self, coord: ChunkCoord) -> PathBuf {
        self.data_dir.join(coord.file_name())
    }

    // -------------------------------------------------------------------------
    // Ingestion
    // -------------------------------------------------------------------------

    /// Fold a batch of visible tiles into the grid.
    ///
    /// The batch may span any number of chunks. Every touched chunk is
    /// materialised if necessary, marked dirty, and has its visit time set to
    /// `timestamp`.
    pub fn update(&self, tiles: &[TileObservation], timestamp: i64) {
        if tiles.is_empty() {
            return;
        }

        let mut batches: BTreeMap<ChunkCoord, Vec<&TileObservation>> = BTreeMap::new();
        for t in tiles {
            batches.entry(self.coord_of(t.x, t.y)).or_default().push(t);
        }

        let mut state = self.lock();
        for (coord, batch) in batches {
            state.absent.remove(&coord);
            let chunk = state
                .chunks
                .entry(coord)
                .or_insert_with(|| self.load_or_blank(coord, timestamp));
            for obs in batch {
                chunk.tiles.insert(
                    tile_key(obs.x, obs.y, obs.z),
                    TileRecord::from_observation(obs, timestamp),
                );
            }
            chunk.last_visited = timestamp;
            chunk.dirty = true;
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Look up a tile.
    ///
    /// `None` means the tile was never sighted; a sighted wall comes back as
    /// `Some` with `walkable == false`. An evicted chunk is reloaded from disk.
    pub fn get_tile(&self, x: i32, y: i32, z: i32) -> Option<TileRecord> {
        let coord = self.coord_of(x, y);
        let mut state = self.lock();
        let chunk = self.resident_chunk(&mut state, coord)?;
        chunk.tile(x, y, z).cloned()
    }

    /// `Some(walkable)` for sighted tiles, `None` for unknown ones.
    pub fn walkability(&self, pos: TilePos) -> Option<bool> {
        let coord = self.coord_of(pos.x, pos.y);
        let mut state = self.lock();
        let chunk = self.resident_chunk(&mut state, coord)?;
        chunk.tile(pos.x, pos.y, pos.z).map(|t| t.walkable)
    }

    /// Walkable 8-neighbours of `pos` on the same floor.
    pub fn neighbors(&self, pos: TilePos) -> Vec<TilePos> {
        crate::pathfinder::NEIGHBOR_OFFSETS
            .iter()
            .map(|&(dx, dy)| pos.offset(dx, dy))
            .filter(|n| self.walkability(*n) == Some(true))
            .collect()
    }

    pub fn stats(&self) -> GridStats {
        let state = self.lock();
        GridStats {
            loaded_chunks: state.chunks.len(),
            total_tiles: state.chunks.values().map(|c| c.tiles.len()).sum(),
            dirty_chunks: state.chunks.values().filter(|c| c.dirty).count(),
            absent_chunks: state.absent.len(),
        }
    }

    /// Return the cached chunk, pulling it back from disk if it was evicted.
    /// Chunks with no file are not materialised by reads, and the miss is
    /// remembered so the disk is consulted once per coordinate.
    fn resident_chunk<'s>(
        &self,
        state: &'s mut GridState,
        coord: ChunkCoord,
    ) -> Option<&'s GridChunk> {
        if !state.chunks.contains_key(&coord) {
            if state.absent.contains(&coord) {
                return None;
            }
            match self.load_chunk(coord) {
                Ok(Some(chunk)) => {
                    debug!(cx = coord.cx, cy = coord.cy, "reloaded evicted chunk");
                    state.chunks.insert(coord, chunk);
                }
                Ok(None) => {
                    state.absent.insert(coord);
                    return None;
                }
                Err(e) => {
                    warn!(cx = coord.cx, cy = coord.cy, error = %e, "chunk unreadable; treating as unexplored");
                    state.absent.insert(coord);
                    return None;
                }
            }
        }
        state.chunks.get(&coord)
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    fn load_chunk(&self, coord: ChunkCoord) -> Result<Option<GridChunk>, GridError> {
        let path = self.chunk_path(coord);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).map_err(|source| GridError::Io {
            path: path.clone(),
            source,
        })?;
        let chunk: GridChunk =
            serde_json::from_str(&raw).map_err(|source| GridError::Parse { path, source })?;
        Ok(Some(chunk))
    }

    /// Disk load, else a blank chunk. Read or parse failures are logged and
    /// the chunk starts fresh.
    fn load_or_blank(&self, coord: ChunkCoord, now: i64) -> GridChunk {
        match self.load_chunk(coord) {
            Ok(Some(chunk)) => chunk,
            Ok(None) => GridChunk::blank(coord, now),
            Err(e) => {
                error!(cx = coord.cx, cy = coord.cy, error = %e, "failed to load chunk; starting fresh");
                GridChunk::blank(coord, now)
            }
        }
    }

    fn save_chunk(&self, chunk: &mut GridChunk) -> Result<(), GridError> {
        let path = self.chunk_path(ChunkCoord {
            cx: chunk.chunk_x,
            cy: chunk.chunk_y,
        });
        let raw = serde_json::to_string(chunk)?;
        write_atomic(&path, raw.as_bytes()).map_err(|source| GridError::Io { path, source })?;
        chunk.dirty = false;
        Ok(())
    }

    /// Persist every dirty chunk. Returns the number written.
    pub fn flush(&self) -> Result<usize, GridError> {
        let mut state = self.lock();
        let mut written = 0;
        for chunk in state.chunks.values_mut().filter(|c| c.dirty) {
            self.save_chunk(chunk)?;
            written += 1;
        }
        Ok(written)
    }

    /// Evict chunks whose last visit is older than the residency TTL,
    /// flushing dirty ones first. Returns the number evicted.
    ///
    /// A dirty chunk that cannot be written stays resident so that its data
    /// is not lost; the write is retried on the next pass.
    pub fn maintenance(&self, now: i64) -> usize {
        let ttl = self.config.chunk_ttl_ms;
        let mut state = self.lock();
        let expired: Vec<ChunkCoord> = state
            .chunks
            .iter()
            .filter(|(_, c)| now - c.last_visited > ttl)
            .map(|(k, _)| *k)
            .collect();

        let mut evicted = 0;
        for coord in expired {
            let Some(chunk) = state.chunks.get_mut(&coord) else {
                continue;
            };
            if chunk.dirty {
                if let Err(e) = self.save_chunk(chunk) {
                    error!(cx = coord.cx, cy = coord.cy, error = %e, "failed to persist chunk; keeping it resident");
                    continue;
                }
            }
            state.chunks.remove(&coord);
            evicted += 1;
        }
        if evicted > 0 {
            debug!(evicted, "evicted idle chunks");
        }
        evicted
    }

    // -------------------------------------------------------------------------
    // Snapshot export
    // -------------------------------------------------------------------------

    /// Write a flattened JSON view of every resident tile plus its bounding
    /// box to `path`, merged with the `extra` top-level fields.
    ///
    /// Dirty chunks are persisted first. The document is written to
    /// `<path>.tmp` and renamed into place; failed attempts are retried up to
    /// `snapshot_retries` times before the cycle is abandoned.
    pub fn save_snapshot(
        &self,
        path: impl AsRef<Path>,
        extra: Map<String, Value>,
    ) -> Result<SnapshotSummary, GridError> {
        let path = path.as_ref();
        let tiles: Vec<TileRecord> = {
            let mut state = self.lock();
            for chunk in state.chunks.values_mut().filter(|c| c.dirty) {
                if let Err(e) = self.save_chunk(chunk) {
                    warn!(error = %e, "chunk flush failed during snapshot");
                }
            }
            let mut tiles: Vec<TileRecord> = state
                .chunks
                .values()
                .flat_map(|c| c.tiles.values().cloned())
                .collect();
            tiles.sort_by_key(|t| (t.z, t.y, t.x));
            tiles
        };

        let bounds = if tiles.is_empty() {
            json!({ "min_x": 0, "max_x": 0, "min_y": 0, "max_y": 0 })
        } else {
            json!({
                "min_x": tiles.iter().map(|t| t.x).min(),
                "max_x": tiles.iter().map(|t| t.x).max(),
                "min_y": tiles.iter().map(|t| t.y).min(),
                "max_y": tiles.iter().map(|t| t.y).max(),
            })
        };

        let mut doc = Map::new();
        doc.insert("timestamp".to_string(), json!(now_ms()));
        doc.insert("tiles".to_string(), serde_json::to_value(&tiles)?);
        doc.insert("bounds".to_string(), bounds);
        doc.extend(extra);
        let raw = serde_json::to_vec(&Value::Object(doc))?;

        let attempts = self.config.snapshot_retries.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match write_atomic(path, &raw) {
                Ok(()) => {
                    debug!(tiles = tiles.len(), path = %path.display(), "saved grid snapshot");
                    return Ok(SnapshotSummary {
                        tiles: tiles.len(),
                        attempts: attempt,
                    });
                }
                Err(source) if attempt >= attempts => {
                    return Err(GridError::SnapshotWrite {
                        path: path.to_path_buf(),
                        attempts: attempt,
                        source,
                    });
                }
                Err(e) => {
                    debug!(attempt, error = %e, "snapshot write failed; retrying");
                    thread::sleep(Duration::from_millis(self.config.snapshot_retry_delay_ms));
                }
            }
        }
    }
}

impl WalkabilityMap for GridSystem {
    fn is_walkable(&self, pos: TilePos) -> bool {
        self.walkability(pos) == Some(true)
    }
}

/// Write `bytes` to `<path>.tmp`, then rename it over `path`, so readers
/// never see a partial file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn open(dir: &Path) -> GridSystem {
        GridSystem::open(dir, GridConfig::default()).unwrap()
    }

    fn tile(x: i32, y: i32, walkable: bool) -> TileObservation {
        TileObservation::new(x, y, 0, walkable)
    }

    #[test]
    fn chunk_coord_floor_divides_negative_tiles() {
        assert_eq!(ChunkCoord::of(-1, -10, 10), ChunkCoord { cx: -1, cy: -1 });
        assert_eq!(ChunkCoord::of(-11, 9, 10), ChunkCoord { cx: -2, cy: 0 });
        assert_eq!(ChunkCoord::of(10, 0, 10), ChunkCoord { cx: 1, cy: 0 });
    }

    #[test]
    fn absent_tile_differs_from_sighted_wall() {
        let dir = tempfile::tempdir().unwrap();
        let grid = open(dir.path());
        grid.update(&[tile(1, 1, false)], 10);

        let wall = grid.get_tile(1, 1, 0).unwrap();
        assert!(!wall.walkable);
        assert!(grid.get_tile(2, 2, 0).is_none());
        assert_eq!(grid.walkability(TilePos::new(1, 1, 0)), Some(false));
        assert_eq!(grid.walkability(TilePos::new(2, 2, 0)), None);
    }

    #[test]
    fn batch_spanning_chunks_creates_each_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let grid = open(dir.path());
        grid.update(&[tile(0, 0, true), tile(15, 3, true), tile(-4, -4, true)], 10);

        let stats = grid.stats();
        assert_eq!(stats.loaded_chunks, 3);
        assert_eq!(stats.total_tiles, 3);
        assert_eq!(stats.dirty_chunks, 3);
        assert!(grid.get_tile(-4, -4, 0).is_some());
    }

    #[test]
    fn revisit_refreshes_walkability_and_room() {
        let dir = tempfile::tempdir().unwrap();
        let grid = open(dir.path());
        grid.update(&[tile(5, 5, true)], 10);
        grid.update(&[tile(5, 5, false).with_room("kitchen")], 20);

        let t = grid.get_tile(5, 5, 0).unwrap();
        assert!(!t.walkable);
        assert_eq!(t.room.as_deref(), Some("kitchen"));
        assert_eq!(t.last_seen, 20);
    }

    #[test]
    fn maintenance_evicts_only_idle_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let grid = open(dir.path());
        grid.update(&[tile(0, 0, true)], 0);
        grid.update(&[tile(50, 50, true)], 250_000);

        let evicted = grid.maintenance(300_001);
        assert_eq!(evicted, 1);
        assert_eq!(grid.stats().loaded_chunks, 1);
        assert!(dir.path().join("chunk_0_0.json").exists());
    }

    #[test]
    fn evicted_tiles_remain_retrievable() {
        let dir = tempfile::tempdir().unwrap();
        let grid = open(dir.path());
        grid.update(&[tile(3, 3, false), tile(4, 3, true)], 0);
        assert_eq!(grid.maintenance(1_000_000), 1);
        assert_eq!(grid.stats().loaded_chunks, 0);

        assert!(!grid.get_tile(3, 3, 0).unwrap().walkable);
        assert!(grid.get_tile(4, 3, 0).unwrap().walkable);
        assert_eq!(grid.stats().loaded_chunks, 1);
    }

    #[test]
    fn persisted_chunk_reloads_tile_for_tile() {
        let dir = tempfile::tempdir().unwrap();
        let obs = vec![
            tile(1, 2, true).with_room("hall"),
            tile(2, 2, false),
            TileObservation::new(1, 2, 1, true),
        ];
        let before = {
            let grid = open(dir.path());
            grid.update(&obs, 77);
            let state = grid.lock();
            state.chunks[&ChunkCoord { cx: 0, cy: 0 }].clone()
        };
        {
            let grid = open(dir.path());
            grid.update(&obs, 77);
            assert_eq!(grid.flush().unwrap(), 1);
        }

        let grid = open(dir.path());
        let reloaded = grid.load_chunk(ChunkCoord { cx: 0, cy: 0 }).unwrap().unwrap();
        assert_eq!(reloaded.tiles, before.tiles);
        assert_eq!(reloaded.last_visited, before.last_visited);
    }

    #[test]
    fn corrupt_chunk_file_is_treated_as_fresh() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("chunk_0_0.json"), "{ not json").unwrap();
        let grid = open(dir.path());

        assert!(grid.get_tile(1, 1, 0).is_none());
        grid.update(&[tile(1, 1, true)], 5);
        assert!(grid.get_tile(1, 1, 0).unwrap().walkable);
    }

    #[test]
    fn unreadable_chunk_is_read_from_disk_once() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("chunk_0_0.json"), "{ not json").unwrap();
        let grid = open(dir.path());

        for _ in 0..3 {
            assert!(grid.get_tile(1, 1, 0).is_none());
            assert_eq!(grid.walkability(TilePos::new(2, 2, 0)), None);
        }
        assert!(grid.get_tile(55, 55, 0).is_none());
        assert_eq!(grid.stats().absent_chunks, 2);

        // A valid file appearing later is not picked up by reads.
        let other = tempfile::tempdir().unwrap();
        let writer = open(other.path());
        writer.update(&[tile(1, 1, true)], 1);
        writer.flush().unwrap();
        fs::copy(other.path().join("chunk_0_0.json"), dir.path().join("chunk_0_0.json")).unwrap();
        assert!(grid.get_tile(1, 1, 0).is_none());

        grid.update(&[tile(3, 3, false)], 5);
        assert_eq!(grid.stats().absent_chunks, 1);
        assert!(!grid.get_tile(3, 3, 0).unwrap().walkable);
    }

    #[test]
    fn write_atomic_replaces_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        assert!(!dir.path().join("doc.json.tmp").exists());
    }

    #[test]
    fn neighbors_lists_walkable_tiles_only() {
        let dir = tempfile::tempdir().unwrap();
        let grid = open(dir.path());
        grid.update(&[tile(0, 0, true), tile(1, 0, true), tile(0, 1, false), tile(1, 1, true)], 1);

        let mut n = grid.neighbors(TilePos::new(0, 0, 0));
        n.sort();
        assert_eq!(n, vec![TilePos::new(1, 0, 0), TilePos::new(1, 1, 0)]);
    }

    #[test]
    fn snapshot_contains_tiles_bounds_and_extra() {
        let dir = tempfile::tempdir().unwrap();
        let grid = open(&dir.path().join("chunks"));
        grid.update(&[tile(-3, 2, true), tile(12, 7, false)], 1);

        let mut extra = Map::new();
        extra.insert("entities".to_string(), json!([{"id": "z1"}]));
        let out = dir.path().join("grid_snapshot.json");
        let summary = grid.save_snapshot(&out, extra).unwrap();
        assert_eq!(summary.tiles, 2);
        assert_eq!(summary.attempts, 1);

        let doc: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(doc["tiles"].as_array().unwrap().len(), 2);
        assert_eq!(doc["bounds"]["min_x"], -3);
        assert_eq!(doc["bounds"]["max_x"], 12);
        assert_eq!(doc["entities"][0]["id"], "z1");
        assert!(!dir.path().join("grid_snapshot.json.tmp").exists());
        assert_eq!(grid.stats().dirty_chunks, 0);
    }

    #[test]
    fn snapshot_of_empty_grid_has_zero_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let grid = open(dir.path());
        let out = dir.path().join("snap.json");
        grid.save_snapshot(&out, Map::new()).unwrap();
        let doc: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(doc["bounds"]["max_y"], 0);
        assert!(doc["tiles"].as_array().unwrap().is_empty());
    }

    #[test]
    fn snapshot_write_gives_up_after_bounded_retries() {
        let dir = tempfile::tempdir().unwrap();
        let config = GridConfig {
            snapshot_retries: 2,
            snapshot_retry_delay_ms: 0,
            ..GridConfig::default()
        };
        let grid = GridSystem::open(dir.path(), config).unwrap();
        let unreachable = dir.path().join("missing_dir").join("snap.json");

        let err = grid.save_snapshot(&unreachable, Map::new()).unwrap_err();
        match err {
            GridError::SnapshotWrite { attempts, .. } => assert_eq!(attempts, 2),
            other => panic!("unexpected error: {other}"),
        }
    }
}
