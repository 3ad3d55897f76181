//! Ingestion router and owner of every remembered object.
//!
//! [`MemorySystem::update`] folds one [`WorldSnapshot`] into per-kind
//! collections; [`MemorySystem::decay`] ages them once per outer tick whether
//! or not anything new was seen. All state sits behind one mutex so the
//! snapshot exporter can read while the tick loop writes; each public method
//! is one critical section, so a read never observes half an update.
//!
//! Routing rules:
//!
//! * live objects (zombies, players, animals) are merged by id; fixtures such
//!   as doors and stairs are map geometry and are not remembered;
//! * object sightings tagged as containers, items or vehicles join those
//!   collections, so each follows its own decay policy;
//! * containers lacking an id get `container_<x>_<y>_<z>` from their truncated
//!   coordinates; containers carried by a character are ignored;
//! * items inside `"Floor"` pseudo-containers, and loose world items, are
//!   merged into the single floor aggregate;
//! * signals are keyed by `<name>_<channel>` and kept for `signal_ttl_ms`;
//! * sounds are transient and replaced wholesale every tick.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use scout_types::{
    ContainerSighting, EntityKind, ItemSighting, ObjectSighting, Position, SoundEvent,
    WorldSnapshot,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, trace, warn};

use crate::objects::{
    ContainerRecord, EntityRecord, FloorAggregate, FloorItem, GLOBAL_FLOOR_ID, ItemRecord,
    MemoryConfig, MemoryObject,
};

/// A remembered radio or TV broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub name: String,
    pub channel: i64,
    pub message: Option<String>,
    pub last_seen: i64,
}

/// Where a remembered item can be picked up from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemSource {
    Container(String),
    Floor,
}

impl ItemSource {
    /// Id the transfer action addresses: the container id, or `"floor"`.
    pub fn target_id(&self) -> &str {
        match self {
            ItemSource::Container(id) => id,
            ItemSource::Floor => "floor",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemLocation {
    pub source: ItemSource,
    pub item: ItemRecord,
}

/// Counts from one ingestion pass, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub entities: usize,
    pub containers: usize,
    pub floor_items: usize,
    pub vehicles: usize,
    pub skipped: usize,
}

#[derive(Default)]
struct MemoryState {
    entities: HashMap<String, MemoryObject>,
    containers: HashMap<String, MemoryObject>,
    vehicles: HashMap<String, MemoryObject>,
    signals: BTreeMap<String, SignalRecord>,
    sounds: Vec<SoundEvent>,
}

pub struct MemorySystem {
    config: MemoryConfig,
    state: Mutex<MemoryState>,
}

impl Default for MemorySystem {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

impl MemorySystem {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            state: Mutex::new(MemoryState::default()),
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ingestion
    // ─────────────────────────────────────────────────────────────────────────

    /// Merge one tick's sightings, stamped with `snapshot.timestamp_ms`.
    pub fn update(&self, snapshot: &WorldSnapshot) -> IngestReport {
        let ts = snapshot.timestamp_ms;
        let mut report = IngestReport::default();
        let mut guard = self.lock();
        let state = &mut *guard;

        let mut loose: Vec<ItemRecord> = Vec::new();
        for obj in &snapshot.objects {
            if obj.is_fixture() {
                continue;
            }
            let Some(id) = sighting_id(obj) else {
                report.skipped += 1;
                continue;
            };
            match EntityKind::classify(&obj.object_type) {
                EntityKind::Container => {
                    // No contents in an object sighting; keep what was inspected.
                    match state.containers.get_mut(&id) {
                        Some(MemoryObject::Container(existing)) => existing.entity.refresh(obj, ts),
                        _ => {
                            let record = ContainerRecord {
                                entity: EntityRecord::from_sighting(id.clone(), obj, ts),
                                items: Vec::new(),
                            };
                            state.containers.insert(id, MemoryObject::Container(record));
                        }
                    }
                    report.containers += 1;
                }
                EntityKind::WorldItem => {
                    let mut item = ItemSighting::new(id, obj.object_type.clone()).at(obj.x, obj.y);
                    item.z = Some(obj.z);
                    loose.push(ItemRecord::from_sighting(&item, obj.position()));
                }
                EntityKind::Vehicle => {
                    upsert_entity(&mut state.vehicles, id, obj, ts, true);
                    report.vehicles += 1;
                }
                _ => {
                    upsert_entity(&mut state.entities, id, obj, ts, false);
                    report.entities += 1;
                }
            }
        }

        for c in &snapshot.containers {
            if c.parent_type.as_deref() == Some("Entity") {
                continue;
            }
            if !c.position().is_finite() {
                debug!(object_type = %c.object_type, "skipping container with invalid position");
                report.skipped += 1;
                continue;
            }
            if c.is_floor() {
                let at = c.position();
                loose.extend(c.items.iter().map(|i| ItemRecord::from_sighting(i, at)));
                continue;
            }
            let id = container_id(c);
            match state.containers.get_mut(&id) {
                Some(MemoryObject::Container(existing)) => existing.refresh(c, ts),
                _ => {
                    state.containers.insert(
                        id.clone(),
                        MemoryObject::Container(ContainerRecord::from_sighting(id, c, ts)),
                    );
                }
            }
            report.containers += 1;
        }

        let player_at = snapshot.player.position;
        loose.extend(
            snapshot
                .world_items
                .iter()
                .map(|i| ItemRecord::from_sighting(i, player_at)),
        );
        if !loose.is_empty() {
            report.floor_items = loose.len();
            let floor = state
                .containers
                .entry(GLOBAL_FLOOR_ID.to_string())
                .or_insert_with(|| MemoryObject::Floor(FloorAggregate::new(ts)));
            if let MemoryObject::Floor(agg) = floor {
                agg.merge(loose, ts);
            }
        }

        for v in &snapshot.vehicles {
            match sighting_id(v) {
                Some(id) => {
                    upsert_entity(&mut state.vehicles, id, v, ts, true);
                    report.vehicles += 1;
                }
                None => report.skipped += 1,
            }
        }

        for s in &snapshot.signals {
            state.signals.insert(
                format!("{}_{}", s.name, s.channel),
                SignalRecord {
                    name: s.name.clone(),
                    channel: s.channel,
                    message: s.message.clone(),
                    last_seen: ts,
                },
            );
        }

        state.sounds = snapshot.sounds.clone();

        trace!(?report, "memory ingest");
        report
    }

    /// Age every collection to `now` and drop what has expired. Returns the
    /// number of objects removed.
    pub fn decay(&self, now: i64) -> usize {
        let config = &self.config;
        let mut guard = self.lock();
        let state = &mut *guard;
        let mut removed = 0;
        for collection in [
            &mut state.entities,
            &mut state.containers,
            &mut state.vehicles,
        ] {
            let before = collection.len();
            collection.retain(|_, obj| obj.decay(now, config));
            removed += before - collection.len();
        }
        let ttl = config.signal_ttl_ms;
        state.signals.retain(|_, s| now - s.last_seen <= ttl);
        if removed > 0 {
            debug!(removed, "forgot expired objects");
        }
        removed
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn entity(&self, id: &str) -> Option<EntityRecord> {
        match self.lock().entities.get(id) {
            Some(MemoryObject::Entity(e)) => Some(e.clone()),
            _ => None,
        }
    }

    /// Remembered live entities, ordered by id.
    pub fn entities(&self) -> Vec<EntityRecord> {
        let state = self.lock();
        let mut out: Vec<EntityRecord> = state
            .entities
            .values()
            .filter_map(|o| match o {
                MemoryObject::Entity(e) => Some(e.clone()),
                _ => None,
            })
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    pub fn entities_of(&self, kind: EntityKind) -> Vec<EntityRecord> {
        let mut out = self.entities();
        out.retain(|e| e.kind == kind);
        out
    }

    pub fn container(&self, id: &str) -> Option<ContainerRecord> {
        match self.lock().containers.get(id) {
            Some(MemoryObject::Container(c)) => Some(c.clone()),
            _ => None,
        }
    }

    /// Static containers, ordered by id. The floor aggregate is excluded.
    pub fn containers(&self) -> Vec<ContainerRecord> {
        let state = self.lock();
        let mut out: Vec<ContainerRecord> = state
            .containers
            .values()
            .filter_map(|o| match o {
                MemoryObject::Container(c) => Some(c.clone()),
                _ => None,
            })
            .collect();
        out.sort_by(|a, b| a.entity.id.cmp(&b.entity.id));
        out
    }

    pub fn floor_items(&self) -> Vec<FloorItem> {
        match self.lock().containers.get(GLOBAL_FLOOR_ID) {
            Some(MemoryObject::Floor(f)) => f.items.values().cloned().collect(),
            _ => Vec::new(),
        }
    }

    pub fn vehicles(&self) -> Vec<EntityRecord> {
        let state = self.lock();
        let mut out: Vec<EntityRecord> = state
            .vehicles
            .values()
            .filter_map(|o| match o {
                MemoryObject::Vehicle(v) => Some(v.clone()),
                _ => None,
            })
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    pub fn signals(&self) -> Vec<SignalRecord> {
        self.lock().signals.values().cloned().collect()
    }

    pub fn sounds(&self) -> Vec<SoundEvent> {
        self.lock().sounds.clone()
    }

    /// Find a remembered item by id, in a static container first and then on
    /// the floor.
    pub fn locate_item(&self, item_id: &str) -> Option<ItemLocation> {
        let state = self.lock();
        let mut containers: Vec<&ContainerRecord> = state
            .containers
            .values()
            .filter_map(|o| match o {
                MemoryObject::Container(c) => Some(c),
                _ => None,
            })
            .collect();
        containers.sort_by(|a, b| a.entity.id.cmp(&b.entity.id));
        for c in containers {
            if let Some(item) = c.item(item_id) {
                return Some(ItemLocation {
                    source: ItemSource::Container(c.entity.id.clone()),
                    item: item.clone(),
                });
            }
        }
        match state.containers.get(GLOBAL_FLOOR_ID) {
            Some(MemoryObject::Floor(f)) => f.items.get(item_id).map(|fi| ItemLocation {
                source: ItemSource::Floor,
                item: fi.item.clone(),
            }),
            _ => None,
        }
    }

    /// Serialisable view of everything remembered, for the snapshot exporter.
    pub fn export(&self, now: i64) -> Value {
        let config = &self.config;
        let state = self.lock();
        let dump = |m: &HashMap<String, MemoryObject>| -> Vec<Value> {
            let mut objs: Vec<&MemoryObject> = m.values().collect();
            objs.sort_by(|a, b| a.id().cmp(b.id()));
            objs.into_iter().map(|o| o.export(now, config)).collect()
        };
        let signals: Vec<Value> = state
            .signals
            .values()
            .map(|s| {
                json!({
                    "name": s.name,
                    "channel": s.channel,
                    "message": s.message,
                    "ttl_remaining_ms": (config.signal_ttl_ms - (now - s.last_seen)).max(0),
                })
            })
            .collect();
        json!({
            "entities": dump(&state.entities),
            "containers": dump(&state.containers),
            "vehicles": dump(&state.vehicles),
            "signals": signals,
            "sounds": state.sounds,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Routing helpers
// ─────────────────────────────────────────────────────────────────────────────

/// The sighting's id, or `None` when the record is unusable.
fn sighting_id(obj: &ObjectSighting) -> Option<String> {
    if !obj.position().is_finite() {
        warn!(object_type = %obj.object_type, "skipping sighting with non-finite position");
        return None;
    }
    match obj.id.as_deref() {
        Some(id) if !id.is_empty() => Some(id.to_string()),
        _ => {
            debug!(object_type = %obj.object_type, "skipping sighting without id");
            None
        }
    }
}

fn container_id(c: &ContainerSighting) -> String {
    match c.id.as_deref() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => synthetic_container_id(c.position()),
    }
}

/// Deterministic id for an anonymous container. Distinct containers on the
/// same tile share it.
pub fn synthetic_container_id(at: Position) -> String {
    format!(
        "{}_{}_{}_{}",
        EntityKind::Container.tag(),
        at.x.trunc() as i64,
        at.y.trunc() as i64,
        at.z.trunc() as i64
    )
}

fn upsert_entity(
    collection: &mut HashMap<String, MemoryObject>,
    id: String,
    sighting: &ObjectSighting,
    ts: i64,
    vehicle: bool,
) {
    match collection.get_mut(&id) {
        Some(MemoryObject::Entity(e)) | Some(MemoryObject::Vehicle(e)) => e.refresh(sighting, ts),
        _ => {
            let record = EntityRecord::from_sighting(id.clone(), sighting, ts);
            let obj = if vehicle {
                MemoryObject::Vehicle(record)
            } else {
                MemoryObject::Entity(record)
            };
            collection.insert(id, obj);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
