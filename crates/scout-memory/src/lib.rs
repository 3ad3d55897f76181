//! `scout-memory` – The Belief Store.
//!
//! Keeps a confidence-weighted picture of everything the agent has seen, so
//! that objects survive brief occlusion and are eventually forgotten.
//!
//! # Modules
//!
//! - [`objects`] – [`MemoryObject`][objects::MemoryObject]: closed set of
//!   remembered kinds (entity, container, vehicle, floor aggregate), each with
//!   its own decay and confidence policy from
//!   [`MemoryConfig`][objects::MemoryConfig].
//! - [`system`] – [`MemorySystem`][system::MemorySystem]: routes per-tick
//!   sightings into per-kind collections, runs decay, and serves the read side
//!   for planning and snapshot export.

pub mod objects;
pub mod system;

pub use objects::{
    ContainerRecord, EntityRecord, FloorAggregate, FloorItem, GLOBAL_FLOOR_ID, ItemRecord,
    MemoryConfig, MemoryObject,
};
pub use system::{
    IngestReport, ItemLocation, ItemSource, MemorySystem, SignalRecord, synthetic_container_id,
};
