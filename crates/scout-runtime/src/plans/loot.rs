//! Fetch one item into the inventory.
//!
//! Steps, one per tick unless feedback is still pending:
//!
//! 1. locate the item (visible containers, visible floor items, fixtures by
//!    container id, then memory);
//! 2. if farther than [`INTERACT_RANGE`], request a move to the walkable tile
//!    next to the target that is closest to the player; standing on that
//!    tile counts as in reach;
//! 3. face the target;
//! 4. request the transfer into `"inventory"`;
//! 5. poll the inventory for up to `max_wait_ticks`, then fail.

use scout_memory::{ItemSource, synthetic_container_id};
use scout_perception::pathfinder::NEIGHBOR_OFFSETS;
use scout_types::{Action, Position, TilePos};
use tracing::{debug, info, warn};

use super::stance_for;
use crate::plan::{Plan, PlanCore, PlanError, PlanKind, TickContext};

/// Reach for looting, in tiles.
pub const INTERACT_RANGE: f64 = 1.3;

/// Ticks to wait for the item to show up after the transfer request.
pub const DEFAULT_TRANSFER_WAIT_TICKS: u32 = 40;

pub struct LootPlan {
    core: PlanCore,
    item_id: String,
    container_id: Option<String>,
    move_requested: bool,
    face_requested: bool,
    loot_requested: bool,
    max_wait_ticks: u32,
    wait_ticks: u32,
}

struct Located {
    position: Position,
    source: ItemSource,
}

impl LootPlan {
    /// `container_id` narrows the search to one container; `None` lets the
    /// plan find the item wherever it is.
    pub fn new(item_id: impl Into<String>, container_id: Option<String>) -> Self {
        let item_id = item_id.into();
        Self {
            core: PlanCore::new(format!("Loot({item_id})")),
            item_id,
            container_id,
            move_requested: false,
            face_requested: false,
            loot_requested: false,
            max_wait_ticks: DEFAULT_TRANSFER_WAIT_TICKS,
            wait_ticks: 0,
        }
    }

    pub fn with_wait_ticks(mut self, ticks: u32) -> Self {
        self.max_wait_ticks = ticks.max(1);
        self
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    fn locate(&self, ctx: &TickContext<'_>) -> Option<Located> {
        let snap = ctx.snapshot;
        let wanted = self.item_id.as_str();
        let container = self.container_id.as_deref();

        for c in &snap.containers {
            let id = c
                .id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| synthetic_container_id(c.position()));
            let holds = c.items.iter().any(|i| i.id.as_deref() == Some(wanted));
            if Some(id.as_str()) == container || id == wanted || holds {
                if c.is_floor() {
                    let item = c.items.iter().find(|i| i.id.as_deref() == Some(wanted));
                    let position = Position::new(
                        item.and_then(|i| i.x).unwrap_or(c.x),
                        item.and_then(|i| i.y).unwrap_or(c.y),
                        c.z,
                    );
                    return Some(Located {
                        position,
                        source: ItemSource::Floor,
                    });
                }
                return Some(Located {
                    position: c.position(),
                    source: ItemSource::Container(id),
                });
            }
        }

        if let Some(item) = snap
            .world_items
            .iter()
            .find(|i| i.id.as_deref() == Some(wanted))
        {
            if let (Some(x), Some(y)) = (item.x, item.y) {
                return Some(Located {
                    position: Position::new(x, y, item.z.unwrap_or(0.0)),
                    source: ItemSource::Floor,
                });
            }
        }

        if let Some(cid) = container {
            if let Some(obj) = snap.objects.iter().find(|o| o.id.as_deref() == Some(cid)) {
                return Some(Located {
                    position: obj.position(),
                    source: ItemSource::Container(cid.to_string()),
                });
            }
            if let Some(c) = ctx.memory.container(cid) {
                return Some(Located {
                    position: c.entity.position,
                    source: ItemSource::Container(cid.to_string()),
                });
            }
        }

        ctx.memory.locate_item(wanted).map(|loc| Located {
            position: match &loc.source {
                ItemSource::Container(cid) => ctx
                    .memory
                    .container(cid)
                    .map_or(loc.item.position, |c| c.entity.position),
                ItemSource::Floor => loc.item.position,
            },
            source: loc.source,
        })
    }
}

/// The walkable 8-neighbour of `target` closest to `player`, or `target`
/// itself when none is known to be walkable.
pub fn approach_tile(ctx: &TickContext<'_>, target: TilePos, player: Position) -> TilePos {
    NEIGHBOR_OFFSETS
        .iter()
        .map(|&(dx, dy)| target.offset(dx, dy))
        .filter(|t| ctx.map.is_walkable(*t))
        .map(|t| {
            let d = (f64::from(t.x) - player.x).hypot(f64::from(t.y) - player.y);
            (t, d)
        })
        .fold(None, |best: Option<(TilePos, f64)>, (t, d)| match best {
            Some((_, bd)) if bd <= d => best,
            _ => Some((t, d)),
        })
        .map_or(target, |(t, _)| t)
}

impl Plan for LootPlan {
    fn core(&self) -> &PlanCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PlanCore {
        &mut self.core
    }

    fn kind(&self) -> PlanKind {
        PlanKind::Loot
    }

    fn target(&self) -> Option<String> {
        Some(self.item_id.clone())
    }

    fn execute(&mut self, ctx: &mut TickContext<'_>) -> Result<Vec<Action>, PlanError> {
        let player = &ctx.snapshot.player;

        if self.loot_requested {
            if player.holds(&self.item_id) {
                info!(item = %self.item_id, "item arrived in inventory");
                self.core.complete();
                return Ok(Vec::new());
            }
            self.wait_ticks = self.wait_ticks.saturating_sub(1);
            if self.wait_ticks == 0 {
                warn!(item = %self.item_id, "timed out waiting for transfer");
                self.core.fail(PlanError::TransferTimeout {
                    item: self.item_id.clone(),
                    ticks: self.max_wait_ticks,
                });
            }
            return Ok(Vec::new());
        }

        let Some(target) = self.locate(ctx) else {
            let missing = self
                .container_id
                .clone()
                .unwrap_or_else(|| self.item_id.clone());
            self.core.fail(PlanError::TargetLost(missing));
            return Ok(Vec::new());
        };

        let dist = player.position.distance_2d(&target.position);
        if dist > INTERACT_RANGE {
            let dest = approach_tile(ctx, target.position.tile(), player.position);
            // A diagonal approach tile sits just outside the reach radius.
            if player.position.tile() != dest {
                if !self.move_requested || player.action_state.is_idle() {
                    info!(item = %self.item_id, dist, ?dest, "requesting approach");
                    self.move_requested = true;
                    return Ok(vec![Action::move_to(dest, stance_for(dist))]);
                }
                return Ok(Vec::new());
            }
            debug!(item = %self.item_id, dist, "standing on approach tile");
        }

        if !self.face_requested {
            self.face_requested = true;
            return Ok(vec![Action::look_to(target.position)]);
        }

        info!(item = %self.item_id, source = target.source.target_id(), "requesting transfer");
        self.loot_requested = true;
        self.wait_ticks = self.max_wait_ticks;
        Ok(vec![Action::loot(target.source.target_id(), &self.item_id)])
    }
}
