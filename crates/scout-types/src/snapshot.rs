//! Per-tick observation records.
//!
//! A [`WorldSnapshot`] is what the ingestion collaborator hands the core once
//! per tick. It is immutable from the core's point of view; the memory and
//! grid subsystems fold it into their persistent state.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Position, TilePos};

/// One tick's full set of observations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSnapshot {
    /// Capture time in epoch milliseconds.
    pub timestamp_ms: i64,
    pub player: PlayerState,
    /// Tiles currently in view.
    pub tiles: Vec<TileObservation>,
    /// Visible dynamic objects and fixtures (zombies, players, doors, stairs).
    pub objects: Vec<ObjectSighting>,
    /// Loose items lying in the world.
    pub world_items: Vec<ItemSighting>,
    /// Nearby containers, possibly `"Floor"` pseudo-containers.
    pub containers: Vec<ContainerSighting>,
    pub vehicles: Vec<ObjectSighting>,
    pub signals: Vec<SignalSighting>,
    pub sounds: Vec<SoundEvent>,
}

impl WorldSnapshot {
    /// The visible tile at `pos`, if any.
    pub fn tile_at(&self, pos: TilePos) -> Option<&TileObservation> {
        self.tiles.iter().find(|t| t.pos() == pos)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Player
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerState {
    pub position: Position,
    pub inventory: Vec<InventoryItem>,
    pub action_state: ActionState,
}

impl PlayerState {
    /// True when an inventory entry matches `target` by id or by type.
    pub fn holds(&self, target: &str) -> bool {
        self.inventory
            .iter()
            .any(|i| i.id == target || i.item_type == target)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerActivity {
    #[default]
    Idle,
    Busy,
}

/// Execution-feedback record for the action channel.
///
/// Supports both feedback shapes the executor may produce: a single
/// `last_completed_id`, or a burst set of `completed_ids`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionState {
    pub status: PlayerActivity,
    pub current_action_id: Option<String>,
    pub queue_busy: bool,
    pub last_completed_id: Option<String>,
    pub completed_ids: Vec<String>,
}

impl ActionState {
    pub fn is_idle(&self) -> bool {
        self.status == PlayerActivity::Idle
    }

    pub fn is_executing(&self, action_id: &str) -> bool {
        self.current_action_id.as_deref() == Some(action_id)
    }

    pub fn has_completed(&self, action_id: &str) -> bool {
        self.last_completed_id.as_deref() == Some(action_id)
            || self.completed_ids.iter().any(|c| c == action_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default)]
    pub name: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Sightings
// ─────────────────────────────────────────────────────────────────────────────

fn walkable_default() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileObservation {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub z: i32,
    #[serde(default = "walkable_default")]
    pub walkable: bool,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub layer: Option<String>,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl TileObservation {
    pub fn new(x: i32, y: i32, z: i32, walkable: bool) -> Self {
        Self {
            x,
            y,
            z,
            walkable,
            room: None,
            layer: None,
            meta: Map::new(),
        }
    }

    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    pub fn pos(&self) -> TilePos {
        TilePos::new(self.x, self.y, self.z)
    }
}

/// A visible object: zombie, player, animal, or a fixture such as a door.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectSighting {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub object_type: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl ObjectSighting {
    pub fn new(id: impl Into<String>, object_type: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: Some(id.into()),
            object_type: object_type.into(),
            x,
            y,
            z: 0.0,
            meta: Map::new(),
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y, self.z)
    }

    /// Doors and windows report `meta.open`; anything else counts as closed.
    pub fn is_open(&self) -> bool {
        self.meta.get("open").and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn is_door_or_window(&self) -> bool {
        self.object_type.contains("Door") || self.object_type.contains("Window")
    }

    pub fn is_staircase(&self) -> bool {
        self.object_type.contains("Stair")
    }

    /// Static map geometry reported alongside live entities.
    pub fn is_fixture(&self) -> bool {
        self.is_door_or_window() || self.is_staircase()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemSighting {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub z: Option<f64>,
}

impl ItemSighting {
    pub fn new(id: impl Into<String>, item_type: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            item_type: item_type.into(),
            ..Self::default()
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSighting {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub object_type: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub items: Vec<ItemSighting>,
    /// `"Entity"` for containers carried by a character (equipped bags).
    #[serde(default)]
    pub parent_type: Option<String>,
}

impl ContainerSighting {
    pub fn new(id: Option<String>, object_type: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id,
            object_type: object_type.into(),
            x,
            y,
            z: 0.0,
            items: Vec::new(),
            parent_type: None,
        }
    }

    pub fn with_items(mut self, items: Vec<ItemSighting>) -> Self {
        self.items = items;
        self
    }

    pub fn is_floor(&self) -> bool {
        self.object_type == "Floor"
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalSighting {
    pub name: String,
    pub channel: i64,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundEvent {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub radius: f64,
    #[serde(default)]
    pub source: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_snapshot_deserializes_with_defaults() {
        let json = r#"{"timestamp_ms": 42, "player": {"position": {"x": 1.5, "y": 2.0}}}"#;
        let snap: WorldSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.timestamp_ms, 42);
        assert!(snap.tiles.is_empty());
        assert!(snap.player.action_state.is_idle());
        assert_eq!(snap.player.position.z, 0.0);
    }

    #[test]
    fn tile_walkable_defaults_to_true() {
        let t: TileObservation = serde_json::from_str(r#"{"x": 1, "y": 2}"#).unwrap();
        assert!(t.walkable);
        assert_eq!(t.pos(), TilePos::new(1, 2, 0));
    }

    #[test]
    fn action_state_recognises_both_feedback_shapes() {
        let single = ActionState {
            last_completed_id: Some("a".to_string()),
            ..ActionState::default()
        };
        assert!(single.has_completed("a"));

        let burst = ActionState {
            completed_ids: vec!["x".to_string(), "b".to_string()],
            ..ActionState::default()
        };
        assert!(burst.has_completed("b"));
        assert!(!burst.has_completed("a"));
    }

    #[test]
    fn player_holds_matches_id_or_type() {
        let player = PlayerState {
            inventory: vec![InventoryItem {
                id: "77".to_string(),
                item_type: "Base.Axe".to_string(),
                name: None,
            }],
            ..PlayerState::default()
        };
        assert!(player.holds("77"));
        assert!(player.holds("Base.Axe"));
        assert!(!player.holds("Base.Hammer"));
    }

    #[test]
    fn object_open_flag_reads_meta() {
        let mut door = ObjectSighting::new("d1", "IsoDoor", 3.0, 3.0);
        assert!(!door.is_open());
        door.meta.insert("open".to_string(), Value::Bool(true));
        assert!(door.is_open());
    }

    #[test]
    fn fixtures_are_recognised_by_type() {
        assert!(ObjectSighting::new("w", "IsoWindow", 0.0, 0.0).is_door_or_window());
        assert!(ObjectSighting::new("s", "IsoStairsTop", 0.0, 0.0).is_staircase());
        assert!(!ObjectSighting::new("z", "Zombie", 0.0, 0.0).is_fixture());
    }
}
