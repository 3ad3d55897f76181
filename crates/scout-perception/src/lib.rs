//! `scout-perception` – spatial knowledge layer.
//!
//! Turns the stream of visible-tile batches into a durable map of the world
//! and answers routing questions over it.
//!
//! # Modules
//!
//! - [`grid`] – [`GridSystem`][grid::GridSystem]: chunked tile store with lazy
//!   load, residency eviction, per-chunk JSON persistence, and atomic
//!   snapshot export for visualisers.
//! - [`pathfinder`] – [`find_path`][pathfinder::find_path]: deterministic
//!   8-connected A\* over any [`WalkabilityMap`][pathfinder::WalkabilityMap].

pub mod grid;
pub mod pathfinder;

pub use grid::{GridConfig, GridError, GridSystem, TileRecord, write_atomic};
pub use pathfinder::{Pathfinder, WalkabilityMap, find_path};
