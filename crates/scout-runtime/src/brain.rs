//! Situation synthesis.
//!
//! [`Brain::assess`] condenses one tick of perception and memory into a
//! [`BrainState`] that strategies score and act on: where the player is,
//! which remembered items are worth fetching, and how dangerous the
//! surroundings are.
//!
//! Threat scoring: every remembered zombie within [`THREAT_RADIUS`] tiles
//! contributes `100 / max(d², 1) × confidence`. The total is capped at 100.

use std::collections::BTreeMap;

use scout_memory::{ItemRecord, ItemSource, MemorySystem};
use scout_types::{EntityKind, PlayerState, Position, WorldSnapshot};
use serde::{Deserialize, Serialize};

use crate::plan::{PlanKind, PlanSummary};
use crate::planner::{ActionPlanner, PlanOutcome};

pub const THREAT_RADIUS: f64 = 10.0;
pub const MAX_THREAT_LEVEL: f64 = 100.0;

// ─────────────────────────────────────────────────────────────────────────────
// Loot valuation
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LootConfig {
    /// Value per full item type, e.g. `"Base.Axe"`.
    pub item_values: BTreeMap<String, f64>,
    /// Fallback value per item category, e.g. `"Weapon"`.
    pub category_values: BTreeMap<String, f64>,
    /// Items worth at least this much become loot targets.
    pub interest_threshold: f64,
}

impl Default for LootConfig {
    fn default() -> Self {
        let item_values = [
            ("Base.Axe", 80.0),
            ("Base.Crowbar", 70.0),
            ("Base.Hammer", 60.0),
            ("Base.Bandage", 50.0),
            ("Base.WaterBottleFull", 45.0),
            ("Base.TinnedBeans", 40.0),
            ("Base.Nails", 20.0),
        ];
        let category_values = [
            ("Weapon", 50.0),
            ("Food", 35.0),
            ("Medical", 40.0),
            ("Tool", 30.0),
            ("Clothing", 10.0),
        ];
        Self {
            item_values: item_values
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            category_values: category_values
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            interest_threshold: 30.0,
        }
    }
}

impl LootConfig {
    /// Item-type value, else category value, else zero.
    pub fn value_of(&self, item: &ItemRecord) -> f64 {
        self.item_values
            .get(&item.item_type)
            .or_else(|| {
                item.category
                    .as_ref()
                    .and_then(|c| self.category_values.get(c))
            })
            .copied()
            .unwrap_or(0.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LootTarget {
    pub item_id: String,
    pub item_type: String,
    pub name: Option<String>,
    pub value: f64,
    pub position: Position,
    /// `None` for floor items.
    pub container_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Threat {
    pub source_id: String,
    pub position: Position,
    pub score: f64,
}

/// Everything strategies need to score and act on one tick.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BrainState {
    pub timestamp_ms: i64,
    pub player: PlayerState,
    /// Room id of the tile under the player, if it has one.
    pub current_room: Option<String>,
    /// Best first.
    pub loot_targets: Vec<LootTarget>,
    /// Highest score first.
    pub threats: Vec<Threat>,
    pub threat_level: f64,
    pub active_plan: Option<PlanSummary>,
    pub last_outcome: Option<PlanOutcome>,
}

impl BrainState {
    pub fn best_loot(&self) -> Option<&LootTarget> {
        self.loot_targets.first()
    }

    /// The active plan, if any, then the last cleared one.
    pub fn recent_plans(&self) -> impl Iterator<Item = &PlanSummary> {
        self.active_plan
            .iter()
            .chain(self.last_outcome.iter().map(|o| &o.summary))
    }

    /// Whether a plan of `kind` is installed and still in progress.
    pub fn is_running(&self, kind: PlanKind) -> bool {
        self.active_plan
            .as_ref()
            .is_some_and(|p| p.kind == kind && !p.status.is_terminal())
    }

    /// No plan, or only one that has already finished.
    pub fn planner_idle(&self) -> bool {
        self.active_plan
            .as_ref()
            .is_none_or(|p| p.status.is_terminal())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Brain
// ─────────────────────────────────────────────────────────────────────────────

pub struct Brain {
    loot: LootConfig,
}

impl Brain {
    pub fn new(loot: LootConfig) -> Self {
        Self { loot }
    }

    pub fn loot_config(&self) -> &LootConfig {
        &self.loot
    }

    /// Must run after `memory` has ingested `snapshot`.
    pub fn assess(
        &self,
        snapshot: &WorldSnapshot,
        memory: &MemorySystem,
        planner: &ActionPlanner,
    ) -> BrainState {
        let player = &snapshot.player;
        let current_room = snapshot
            .tile_at(player.position.tile())
            .and_then(|t| t.room.clone());

        let (threats, threat_level) = self.threats(player.position, memory);

        BrainState {
            timestamp_ms: snapshot.timestamp_ms,
            player: player.clone(),
            current_room,
            loot_targets: self.loot_targets(player, memory),
            threats,
            threat_level,
            active_plan: planner.active_summary(),
            last_outcome: planner.last_outcome().cloned(),
        }
    }

    fn loot_targets(&self, player: &PlayerState, memory: &MemorySystem) -> Vec<LootTarget> {
        let mut best: BTreeMap<String, LootTarget> = BTreeMap::new();
        let mut offer = |item: &ItemRecord, source: ItemSource, position: Position| {
            if player.holds(&item.id) {
                return;
            }
            let value = self.loot.value_of(item);
            if value < self.loot.interest_threshold {
                return;
            }
            let container_id = match source {
                ItemSource::Container(id) => Some(id),
                ItemSource::Floor => None,
            };
            let candidate = LootTarget {
                item_id: item.id.clone(),
                item_type: item.item_type.clone(),
                name: item.name.clone(),
                value,
                position,
                container_id,
            };
            match best.get(&item.id) {
                Some(existing) if existing.value >= value => {}
                _ => {
                    best.insert(item.id.clone(), candidate);
                }
            }
        };

        for container in memory.containers() {
            for item in &container.items {
                offer(
                    item,
                    ItemSource::Container(container.entity.id.clone()),
                    container.entity.position,
                );
            }
        }
        for floor in memory.floor_items() {
            offer(&floor.item, ItemSource::Floor, floor.item.position);
        }

        let mut targets: Vec<LootTarget> = best.into_values().collect();
        targets.sort_by(|a, b| {
            b.value
                .total_cmp(&a.value)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        targets
    }

    fn threats(&self, origin: Position, memory: &MemorySystem) -> (Vec<Threat>, f64) {
        let mut threats: Vec<Threat> = memory
            .entities_of(EntityKind::Zombie)
            .into_iter()
            .filter_map(|z| {
                let d = origin.distance_2d(&z.position);
                (d <= THREAT_RADIUS).then(|| Threat {
                    score: 100.0 / (d * d).max(1.0) * z.confidence,
                    source_id: z.id,
                    position: z.position,
                })
            })
            .collect();
        threats.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.source_id.cmp(&b.source_id))
        });
        let level = threats
            .iter()
            .map(|t| t.score)
            .sum::<f64>()
            .min(MAX_THREAT_LEVEL);
        (threats, level)
    }
}

impl Default for Brain {
    fn default() -> Self {
        Self::new(LootConfig::default())
    }
}
