//! Atomic action requests.
//!
//! An [`Action`] is the only thing the core emits. It carries a type tag, a
//! free-form parameter map, and a unique id the executor echoes back through
//! [`ActionState`][crate::ActionState] so the planner can reconcile feedback.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::{Position, TilePos};

/// Action type tags understood by the dispatch sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Navigation request; the executor performs the actual motion.
    MoveTo,
    /// Turn to face a point.
    LookTo,
    /// Transfer an item from a source container into the inventory.
    Loot,
    Wait,
    /// Toggle a door, window, or similar fixture.
    Interact,
}

/// Movement gait requested alongside a [`ActionKind::MoveTo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stance {
    Auto,
    Run,
}

/// A single atomic action with a unique id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActionKind,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl Action {
    /// Build an action with a freshly generated UUID.
    pub fn new(kind: ActionKind, params: Map<String, Value>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            params,
        }
    }

    pub fn move_to(target: TilePos, stance: Stance) -> Self {
        Self::new(
            ActionKind::MoveTo,
            object(json!({
                "x": target.x,
                "y": target.y,
                "z": target.z,
                "stance": stance,
            })),
        )
    }

    pub fn look_to(target: Position) -> Self {
        Self::new(
            ActionKind::LookTo,
            object(json!({ "x": target.x, "y": target.y })),
        )
    }

    /// Transfer `item_id` out of `source_id` (a container id or `"floor"`).
    pub fn loot(source_id: &str, item_id: &str) -> Self {
        Self::new(
            ActionKind::Loot,
            object(json!({
                "targetId": source_id,
                "itemId": item_id,
                "destContainerId": "inventory",
            })),
        )
    }

    pub fn wait(duration_ms: u64) -> Self {
        Self::new(ActionKind::Wait, object(json!({ "duration": duration_ms })))
    }

    pub fn interact(target_id: &str) -> Self {
        Self::new(ActionKind::Interact, object(json!({ "targetId": target_id })))
    }

    /// Numeric parameter lookup.
    pub fn param_f64(&self, key: &str) -> Option<f64> {
        self.params.get(key).and_then(Value::as_f64)
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_ids_are_unique() {
        let a = Action::wait(100);
        let b = Action::wait(100);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn move_to_carries_coordinates_and_stance() {
        let action = Action::move_to(TilePos::new(4, -2, 1), Stance::Run);
        assert_eq!(action.kind, ActionKind::MoveTo);
        assert_eq!(action.param_f64("x"), Some(4.0));
        assert_eq!(action.param_f64("y"), Some(-2.0));
        assert_eq!(action.param_str("stance"), Some("Run"));
    }

    #[test]
    fn serialized_action_uses_type_tag() {
        let action = Action::loot("crate_1", "item_9");
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "Loot");
        assert_eq!(json["params"]["itemId"], "item_9");
        assert_eq!(json["params"]["destContainerId"], "inventory");
    }
}
