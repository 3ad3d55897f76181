//! `scout-types` – shared vocabulary of the Scout agent.
//!
//! Every other crate in the workspace speaks in these types: integer tile
//! coordinates, continuous world positions, the per-tick [`WorldSnapshot`]
//! delivered by the ingestion collaborator, and the [`Action`] records
//! handed to the external dispatch sink.
//!
//! # Modules
//!
//! - [`snapshot`] – immutable per-tick observation records.
//! - [`action`] – atomic action requests and their feedback channel.

pub mod action;
pub mod snapshot;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use action::{Action, ActionKind, Stance};
pub use snapshot::{
    ActionState, ContainerSighting, InventoryItem, ItemSighting, ObjectSighting, PlayerActivity,
    PlayerState, SignalSighting, SoundEvent, TileObservation, WorldSnapshot,
};

/// Wall-clock milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

// ─────────────────────────────────────────────────────────────────────────────
// Coordinates
// ─────────────────────────────────────────────────────────────────────────────

/// Integer key of a single map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl TilePos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance between two tile centres.
    pub fn distance(&self, other: &TilePos) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        let dz = f64::from(self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Tile offset by `(dx, dy)` on the same floor.
    pub fn offset(&self, dx: i32, dy: i32) -> TilePos {
        TilePos::new(self.x + dx, self.y + dy, self.z)
    }

    pub fn to_position(self) -> Position {
        Position::new(f64::from(self.x), f64::from(self.y), f64::from(self.z))
    }
}

/// Continuous world position as reported by the game.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Planar (x/y) distance; floors are compared separately by callers.
    pub fn distance_2d(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// The tile this position falls in.
    pub fn tile(&self) -> TilePos {
        TilePos::new(
            self.x.floor() as i32,
            self.y.floor() as i32,
            self.z.floor() as i32,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entity kinds
// ─────────────────────────────────────────────────────────────────────────────

/// Closed set of remembered object kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Zombie,
    Player,
    Animal,
    Vehicle,
    Container,
    WorldItem,
}

impl EntityKind {
    /// Map a sensed object type tag onto a kind.
    ///
    /// Anything not explicitly recognised is treated as a generic dynamic
    /// entity and receives the zombie decay policy.
    pub fn classify(object_type: &str) -> EntityKind {
        match object_type {
            "Player" => EntityKind::Player,
            "Animal" => EntityKind::Animal,
            "Vehicle" | "BaseVehicle" => EntityKind::Vehicle,
            "Container" => EntityKind::Container,
            "WorldItem" | "Item" | "InventoryItem" => EntityKind::WorldItem,
            _ => EntityKind::Zombie,
        }
    }

    /// Lower-case tag used when synthesising ids.
    pub fn tag(&self) -> &'static str {
        match self {
            EntityKind::Zombie => "zombie",
            EntityKind::Player => "player",
            EntityKind::Animal => "animal",
            EntityKind::Vehicle => "vehicle",
            EntityKind::Container => "container",
            EntityKind::WorldItem => "item",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Global error type spanning ingestion, persistence, and dispatch.
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum ScoutError {
    #[error("Snapshot rejected: {0}")]
    InvalidSnapshot(String),

    #[error("Persistence failure at {path}: {details}")]
    Persistence { path: String, details: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Action dispatch failed: {0}")]
    Dispatch(String),
}
