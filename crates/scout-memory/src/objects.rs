//! Remembered objects and their per-kind forgetting policy.
//!
//! Everything the agent has seen and may no longer see is held as a
//! [`MemoryObject`], a closed set of variants that share one capability:
//! each one decays, reports a confidence in `[0, 1]`, and exports itself as
//! JSON for visualisers.
//!
//! | variant                      | lifetime                           | confidence                              |
//! |------------------------------|------------------------------------|-----------------------------------------|
//! | [`MemoryObject::Entity`]     | per-kind TTL (zombie/player/animal) | linear `1 − age/ttl`                    |
//! | [`MemoryObject::Container`]  | session, or `container_ttl_ms`      | stays `1.0`                             |
//! | [`MemoryObject::Vehicle`]    | `vehicle_ttl_ms`                    | linear, clamped to the confidence floor |
//! | [`MemoryObject::Floor`]      | never expires                       | `1.0`; items prune individually         |
//!
//! Ages are measured against the caller-supplied `now`, so decay is a pure
//! function of timestamps and needs no wall clock.

use std::collections::BTreeMap;

use scout_types::{ContainerSighting, EntityKind, ItemSighting, ObjectSighting, Position};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Id of the singleton aggregate that collects every loose item.
pub const GLOBAL_FLOOR_ID: &str = "Global_Floor";

// ─────────────────────────────────────────────────────────────────────────────
// Policy
// ─────────────────────────────────────────────────────────────────────────────

/// Per-kind retention settings. All durations are milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub zombie_ttl_ms: i64,
    pub player_ttl_ms: i64,
    pub animal_ttl_ms: i64,
    /// `None` keeps containers for the whole session.
    pub container_ttl_ms: Option<i64>,
    pub vehicle_ttl_ms: i64,
    /// Lowest confidence a vehicle reports while still inside its TTL.
    pub vehicle_confidence_floor: f64,
    pub floor_item_ttl_ms: i64,
    pub signal_ttl_ms: i64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            zombie_ttl_ms: 10_000,
            player_ttl_ms: 30_000,
            animal_ttl_ms: 20_000,
            container_ttl_ms: None,
            vehicle_ttl_ms: 300_000,
            vehicle_confidence_floor: 0.2,
            floor_item_ttl_ms: 60_000,
            signal_ttl_ms: 30_000,
        }
    }
}

impl MemoryConfig {
    /// Retention window for `kind`, or `None` for session lifetime.
    pub fn ttl_for(&self, kind: EntityKind) -> Option<i64> {
        match kind {
            EntityKind::Zombie => Some(self.zombie_ttl_ms),
            EntityKind::Player => Some(self.player_ttl_ms),
            EntityKind::Animal => Some(self.animal_ttl_ms),
            EntityKind::Vehicle => Some(self.vehicle_ttl_ms),
            EntityKind::Container => self.container_ttl_ms,
            EntityKind::WorldItem => Some(self.floor_item_ttl_ms),
        }
    }
}

/// Linear freshness: `1.0` when just seen, `0.0` at the end of the window.
fn linear_confidence(age: i64, ttl: i64) -> f64 {
    if ttl <= 0 {
        return 0.0;
    }
    (1.0 - age.max(0) as f64 / ttl as f64).clamp(0.0, 1.0)
}

fn ttl_remaining(ttl: Option<i64>, last_seen: i64, now: i64) -> Option<i64> {
    ttl.map(|ttl| (ttl - (now - last_seen)).max(0))
}

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

/// Last known state of an identified object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: String,
    pub kind: EntityKind,
    /// Raw type tag from the sensor (e.g. `"Zombie"`, `"IsoCrate"`).
    pub object_type: String,
    pub position: Position,
    pub last_seen: i64,
    pub confidence: f64,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl EntityRecord {
    pub fn from_sighting(id: String, sighting: &ObjectSighting, timestamp: i64) -> Self {
        Self {
            id,
            kind: EntityKind::classify(&sighting.object_type),
            object_type: sighting.object_type.clone(),
            position: sighting.position(),
            last_seen: timestamp,
            confidence: 1.0,
            properties: sighting.meta.clone(),
        }
    }

    /// Fold a fresh sighting in: new position, full confidence.
    pub fn refresh(&mut self, sighting: &ObjectSighting, timestamp: i64) {
        self.object_type = sighting.object_type.clone();
        self.kind = EntityKind::classify(&sighting.object_type);
        self.position = sighting.position();
        self.last_seen = timestamp;
        self.confidence = 1.0;
        self.properties.extend(sighting.meta.clone());
    }
}

/// An item as last seen inside a container or on the ground.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "one")]
    pub count: u32,
    pub position: Position,
}

fn one() -> u32 {
    1
}

impl ItemRecord {
    /// Build from a sighting, inheriting `fallback` for missing coordinates.
    ///
    /// Items without an id get `unknown_<x>_<y>_<type>` from their truncated
    /// coordinates, so repeated sightings on one tile collapse into a single
    /// entry.
    pub fn from_sighting(item: &ItemSighting, fallback: Position) -> Self {
        let position = Position::new(
            item.x.unwrap_or(fallback.x),
            item.y.unwrap_or(fallback.y),
            item.z.unwrap_or(fallback.z),
        );
        let item_type = if item.item_type.is_empty() {
            "Item".to_string()
        } else {
            item.item_type.clone()
        };
        let id = match item.id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!(
                "unknown_{}_{}_{}",
                position.x.trunc() as i64,
                position.y.trunc() as i64,
                item_type
            ),
        };
        Self {
            id,
            item_type,
            name: item.name.clone(),
            category: item.category.clone(),
            count: item.count.unwrap_or(1),
            position,
        }
    }
}

/// A static container and its last inspected contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub entity: EntityRecord,
    pub items: Vec<ItemRecord>,
}

impl ContainerRecord {
    /// `id` is the sighting's own id or the synthesised
    /// `container_<x>_<y>_<z>` key.
    pub fn from_sighting(id: String, sighting: &ContainerSighting, timestamp: i64) -> Self {
        let position = sighting.position();
        Self {
            entity: EntityRecord {
                id,
                kind: EntityKind::Container,
                object_type: sighting.object_type.clone(),
                position,
                last_seen: timestamp,
                confidence: 1.0,
                properties: Map::new(),
            },
            items: sighting
                .items
                .iter()
                .map(|i| ItemRecord::from_sighting(i, position))
                .collect(),
        }
    }

    /// The latest inspection overwrites the remembered contents.
    pub fn refresh(&mut self, sighting: &ContainerSighting, timestamp: i64) {
        let fresh = Self::from_sighting(self.entity.id.clone(), sighting, timestamp);
        *self = fresh;
    }

    pub fn item(&self, item_id: &str) -> Option<&ItemRecord> {
        self.items.iter().find(|i| i.id == item_id)
    }
}

/// One floor item and when it was last seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorItem {
    pub item: ItemRecord,
    pub last_seen: i64,
}

/// Merged view of every loose item the agent has noticed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorAggregate {
    pub items: BTreeMap<String, FloorItem>,
    pub last_seen: i64,
}

impl FloorAggregate {
    pub fn new(timestamp: i64) -> Self {
        Self {
            items: BTreeMap::new(),
            last_seen: timestamp,
        }
    }

    pub fn merge(&mut self, items: impl IntoIterator<Item = ItemRecord>, timestamp: i64) {
        for item in items {
            self.items.insert(
                item.id.clone(),
                FloorItem {
                    item,
                    last_seen: timestamp,
                },
            );
        }
        self.last_seen = timestamp;
    }

    /// Drop items older than `ttl`. Returns the number pruned.
    pub fn prune(&mut self, now: i64, ttl: i64) -> usize {
        let before = self.items.len();
        self.items.retain(|_, f| now - f.last_seen <= ttl);
        before - self.items.len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MemoryObject
// ─────────────────────────────────────────────────────────────────────────────

/// A remembered object of one of the supported kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant")]
pub enum MemoryObject {
    Entity(EntityRecord),
    Container(ContainerRecord),
    Vehicle(EntityRecord),
    Floor(FloorAggregate),
}

impl MemoryObject {
    pub fn id(&self) -> &str {
        match self {
            MemoryObject::Entity(e) | MemoryObject::Vehicle(e) => &e.id,
            MemoryObject::Container(c) => &c.entity.id,
            MemoryObject::Floor(_) => GLOBAL_FLOOR_ID,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            MemoryObject::Entity(e) => e.kind,
            MemoryObject::Vehicle(_) => EntityKind::Vehicle,
            MemoryObject::Container(_) | MemoryObject::Floor(_) => EntityKind::Container,
        }
    }

    pub fn last_seen(&self) -> i64 {
        match self {
            MemoryObject::Entity(e) | MemoryObject::Vehicle(e) => e.last_seen,
            MemoryObject::Container(c) => c.entity.last_seen,
            MemoryObject::Floor(f) => f.last_seen,
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            MemoryObject::Entity(e) | MemoryObject::Vehicle(e) => e.confidence,
            MemoryObject::Container(c) => c.entity.confidence,
            MemoryObject::Floor(_) => 1.0,
        }
    }

    /// Last known position. The floor aggregate sits at the origin.
    pub fn position(&self) -> Position {
        match self {
            MemoryObject::Entity(e) | MemoryObject::Vehicle(e) => e.position,
            MemoryObject::Container(c) => c.entity.position,
            MemoryObject::Floor(_) => Position::default(),
        }
    }

    /// Retention window under `config`; `None` never expires.
    pub fn ttl_ms(&self, config: &MemoryConfig) -> Option<i64> {
        match self {
            MemoryObject::Entity(e) => config.ttl_for(e.kind),
            MemoryObject::Vehicle(_) => Some(config.vehicle_ttl_ms),
            MemoryObject::Container(_) => config.container_ttl_ms,
            MemoryObject::Floor(_) => None,
        }
    }

    /// Advance this object's confidence to `now`.
    ///
    /// Returns `false` when the object has expired and must be removed.
    pub fn decay(&mut self, now: i64, config: &MemoryConfig) -> bool {
        let ttl = self.ttl_ms(config);
        match self {
            MemoryObject::Entity(e) => {
                let Some(ttl) = ttl else { return true };
                let age = now - e.last_seen;
                if age > ttl {
                    e.confidence = 0.0;
                    return false;
                }
                e.confidence = linear_confidence(age, ttl);
                true
            }
            MemoryObject::Vehicle(v) => {
                let Some(ttl) = ttl else { return true };
                let age = now - v.last_seen;
                if age > ttl {
                    v.confidence = 0.0;
                    return false;
                }
                v.confidence = linear_confidence(age, ttl).max(config.vehicle_confidence_floor);
                true
            }
            MemoryObject::Container(c) => match ttl {
                Some(ttl) if now - c.entity.last_seen > ttl => {
                    c.entity.confidence = 0.0;
                    false
                }
                _ => true,
            },
            MemoryObject::Floor(f) => {
                f.prune(now, config.floor_item_ttl_ms);
                true
            }
        }
    }

    /// JSON view for the visualisation snapshot, annotated with
    /// `ttl_remaining_ms` (omitted for session-lifetime objects).
    pub fn export(&self, now: i64, config: &MemoryConfig) -> Value {
        let remaining = ttl_remaining(self.ttl_ms(config), self.last_seen(), now);
        match self {
            MemoryObject::Entity(e) | MemoryObject::Vehicle(e) => json!({
                "id": e.id,
                "kind": e.kind,
                "type": e.object_type,
                "x": e.position.x,
                "y": e.position.y,
                "z": e.position.z,
                "confidence": e.confidence,
                "last_seen": e.last_seen,
                "ttl_remaining_ms": remaining,
                "meta": e.properties,
            }),
            MemoryObject::Container(c) => json!({
                "id": c.entity.id,
                "type": "Container",
                "object_type": c.entity.object_type,
                "x": c.entity.position.x,
                "y": c.entity.position.y,
                "z": c.entity.position.z,
                "confidence": c.entity.confidence,
                "last_seen": c.entity.last_seen,
                "ttl_remaining_ms": remaining,
                "items": c.items,
            }),
            MemoryObject::Floor(f) => {
                let items: Vec<Value> = f
                    .items
                    .values()
                    .map(|fi| {
                        let mut v = json!(fi.item);
                        if let Value::Object(map) = &mut v {
                            map.insert(
                                "ttl_remaining_ms".to_string(),
                                json!((config.floor_item_ttl_ms - (now - fi.last_seen)).max(0)),
                            );
                        }
                        v
                    })
                    .collect();
                json!({
                    "id": GLOBAL_FLOOR_ID,
                    "type": "Container",
                    "object_type": "Floor",
                    "x": 0, "y": 0, "z": 0,
                    "ttl_remaining_ms": Value::Null,
                    "items": items,
                })
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn zombie(ts: i64) -> MemoryObject {
        MemoryObject::Entity(EntityRecord::from_sighting(
            "z1".to_string(),
            &ObjectSighting::new("z1", "Zombie", 2.0, 3.0),
            ts,
        ))
    }

    // ── Entity ────────────────────────────────────────────────────────────────

    #[test]
    fn entity_confidence_falls_linearly() {
        let cfg = MemoryConfig::default();
        let mut z = zombie(0);
        assert!(z.decay(5_000, &cfg));
        assert!((z.confidence() - 0.5).abs() < 1e-9);
        assert!(z.decay(10_000, &cfg));
        assert!(z.confidence().abs() < 1e-9);
        assert!(!z.decay(10_001, &cfg));
    }

    #[test]
    fn player_outlives_zombie() {
        let cfg = MemoryConfig::default();
        let mut p = MemoryObject::Entity(EntityRecord::from_sighting(
            "p1".to_string(),
            &ObjectSighting::new("p1", "Player", 0.0, 0.0),
            0,
        ));
        assert!(p.decay(25_000, &cfg));
        assert!(!zombie(0).decay(25_000, &cfg));
    }

    #[test]
    fn refresh_resets_confidence_and_moves() {
        let cfg = MemoryConfig::default();
        let mut z = zombie(0);
        z.decay(8_000, &cfg);
        if let MemoryObject::Entity(e) = &mut z {
            e.refresh(&ObjectSighting::new("z1", "Zombie", 9.0, 9.0), 8_000);
        }
        assert_eq!(z.confidence(), 1.0);
        assert_eq!(z.position(), Position::new(9.0, 9.0, 0.0));
        assert!(z.decay(17_000, &cfg));
    }

    // ── Vehicle ───────────────────────────────────────────────────────────────

    #[test]
    fn vehicle_confidence_is_floored() {
        let cfg = MemoryConfig::default();
        let mut v = MemoryObject::Vehicle(EntityRecord::from_sighting(
            "car".to_string(),
            &ObjectSighting::new("car", "Vehicle", 0.0, 0.0),
            0,
        ));
        assert!(v.decay(290_000, &cfg));
        assert!((v.confidence() - 0.2).abs() < 1e-9);
        assert!(!v.decay(300_001, &cfg));
    }

    // ── Container ─────────────────────────────────────────────────────────────

    #[test]
    fn container_survives_for_session_by_default() {
        let cfg = MemoryConfig::default();
        let sighting = ContainerSighting::new(None, "crate", 1.0, 1.0);
        let mut c = MemoryObject::Container(ContainerRecord::from_sighting(
            "container_1_1_0".to_string(),
            &sighting,
            0,
        ));
        assert!(c.decay(i64::MAX / 2, &cfg));
        assert_eq!(c.confidence(), 1.0);
        assert!(c.export(10, &cfg)["ttl_remaining_ms"].is_null());
    }

    #[test]
    fn container_ttl_applies_when_configured() {
        let cfg = MemoryConfig {
            container_ttl_ms: Some(1_000),
            ..MemoryConfig::default()
        };
        let sighting = ContainerSighting::new(Some("c".to_string()), "crate", 0.0, 0.0);
        let mut c = MemoryObject::Container(ContainerRecord::from_sighting("c".to_string(), &sighting, 0));
        assert!(c.decay(1_000, &cfg));
        assert!(!c.decay(1_001, &cfg));
    }

    // ── Floor ─────────────────────────────────────────────────────────────────

    #[test]
    fn idless_items_collapse_on_same_tile() {
        let a = ItemRecord::from_sighting(&ItemSighting::default(), Position::new(4.2, 7.9, 0.0));
        let b = ItemRecord::from_sighting(&ItemSighting::default(), Position::new(4.7, 7.1, 0.0));
        assert_eq!(a.id, "unknown_4_7_Item");
        assert_eq!(a.id, b.id);

        let mut floor = FloorAggregate::new(0);
        floor.merge([a], 0);
        floor.merge([b], 100);
        assert_eq!(floor.items.len(), 1);
    }

    #[test]
    fn floor_items_prune_but_aggregate_lives() {
        let cfg = MemoryConfig::default();
        let mut floor = FloorAggregate::new(0);
        floor.merge(
            [ItemRecord::from_sighting(&ItemSighting::new("old", "Base.Nails"), Position::default())],
            0,
        );
        floor.merge(
            [ItemRecord::from_sighting(&ItemSighting::new("new", "Base.Axe"), Position::default())],
            50_000,
        );
        let mut obj = MemoryObject::Floor(floor);

        assert!(obj.decay(70_000, &cfg));
        let MemoryObject::Floor(f) = &obj else { unreachable!() };
        assert!(f.items.contains_key("new"));
        assert!(!f.items.contains_key("old"));

        assert!(obj.decay(1_000_000, &cfg));
        assert_eq!(obj.id(), GLOBAL_FLOOR_ID);
    }

    #[test]
    fn export_reports_remaining_ttl() {
        let cfg = MemoryConfig::default();
        let z = zombie(1_000);
        let v = z.export(4_000, &cfg);
        assert_eq!(v["ttl_remaining_ms"], 7_000);
        assert_eq!(v["type"], "Zombie");
    }
}
