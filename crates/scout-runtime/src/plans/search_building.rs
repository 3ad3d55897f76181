//! Room-by-room exploration of whatever building the player is in.
//!
//! Each tick the room under the player is marked visited in
//! [`SessionMemory`]. Targets are chosen in this order:
//!
//! 1. nearest visible walkable tile of an unvisited room;
//! 2. nearest staircase not used before;
//! 3. nothing left: complete if any room was visited this session;
//! 4. otherwise wander to a random tile within ±5, failing after five legs.
//!
//! A target whose distance does not shrink over a short window is
//! blacklisted for the rest of the session and a new one is chosen.

use std::collections::HashSet;

use rand::Rng;
use scout_types::{Action, Position, TilePos};
use tracing::{debug, info, warn};

use super::{obstacle_on_route, stance_for};
use crate::plan::{Plan, PlanCore, PlanError, PlanKind, TickContext};
use crate::progress::ProgressGuard;

const ARRIVAL_RADIUS: f64 = 1.1;
const WANDER_RADIUS: i32 = 5;
const MAX_WANDER_LEGS: u32 = 5;
const STUCK_WINDOW: usize = 5;
const STUCK_MIN_IMPROVEMENT: f64 = 0.5;

enum Next {
    Room(TilePos, String),
    Stairs(TilePos, String),
    Done,
    Wander(TilePos),
    Exhausted,
}

pub struct SearchBuildingPlan {
    core: PlanCore,
    nav_target: Option<TilePos>,
    target_room: Option<String>,
    move_requested: bool,
    progress: ProgressGuard,
    wander_legs: u32,
    opened: HashSet<String>,
}

impl SearchBuildingPlan {
    pub fn new() -> Self {
        Self {
            core: PlanCore::new("SearchBuilding"),
            nav_target: None,
            target_room: None,
            move_requested: false,
            progress: ProgressGuard::new(STUCK_WINDOW, STUCK_MIN_IMPROVEMENT),
            wander_legs: 0,
            opened: HashSet::new(),
        }
    }

    pub fn nav_target(&self) -> Option<TilePos> {
        self.nav_target
    }

    fn clear_target(&mut self) {
        self.nav_target = None;
        self.target_room = None;
        self.move_requested = false;
        self.progress.reset();
    }

    fn set_target(&mut self, tile: TilePos, room: Option<String>) {
        self.nav_target = Some(tile);
        self.target_room = room;
        self.move_requested = false;
        self.progress.reset();
    }

    fn choose(&mut self, ctx: &mut TickContext<'_>) -> Next {
        let snap = ctx.snapshot;
        let player = snap.player.position;
        let floor = player.tile().z;
        let session = &mut *ctx.session;
        let dist = |t: &TilePos| player.distance_2d(&t.to_position());

        let room = snap
            .tiles
            .iter()
            .filter(|t| t.walkable && t.z == floor)
            .filter(|t| !session.blacklisted.contains(&t.pos()))
            .filter_map(|t| match t.room.as_deref() {
                Some(r) if !session.visited_rooms.contains(r) => Some((t.pos(), r)),
                _ => None,
            })
            .min_by(|(a, _), (b, _)| dist(a).total_cmp(&dist(b)).then(a.cmp(b)));
        if let Some((tile, room)) = room {
            return Next::Room(tile, room.to_string());
        }

        let stairs = snap
            .objects
            .iter()
            .filter(|o| o.is_staircase())
            .filter_map(|o| o.id.as_deref().map(|id| (o.position().tile(), id)))
            .filter(|(tile, id)| {
                !session.used_stairs.contains(*id) && !session.blacklisted.contains(tile)
            })
            .min_by(|(a, _), (b, _)| dist(a).total_cmp(&dist(b)).then(a.cmp(b)));
        if let Some((tile, id)) = stairs {
            session.used_stairs.insert(id.to_string());
            return Next::Stairs(tile, id.to_string());
        }

        if !session.visited_rooms.is_empty() {
            return Next::Done;
        }

        if self.wander_legs >= MAX_WANDER_LEGS {
            return Next::Exhausted;
        }
        self.wander_legs += 1;
        let here = player.tile();
        let dx = session.rng.random_range(-WANDER_RADIUS..=WANDER_RADIUS);
        let dy = session.rng.random_range(-WANDER_RADIUS..=WANDER_RADIUS);
        Next::Wander(here.offset(dx, dy))
    }
}

impl Default for SearchBuildingPlan {
    fn default() -> Self {
        Self::new()
    }
}

impl Plan for SearchBuildingPlan {
    fn core(&self) -> &PlanCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PlanCore {
        &mut self.core
    }

    fn kind(&self) -> PlanKind {
        PlanKind::SearchBuilding
    }

    fn execute(&mut self, ctx: &mut TickContext<'_>) -> Result<Vec<Action>, PlanError> {
        let snap = ctx.snapshot;
        let player = snap.player.position;

        if let Some(room) = snap.tile_at(player.tile()).and_then(|t| t.room.as_deref()) {
            if ctx.session.visited_rooms.insert(room.to_string()) {
                info!(room, "room visited");
                self.wander_legs = 0;
            }
        }

        if let Some(room) = &self.target_room {
            if ctx.session.visited_rooms.contains(room) {
                debug!(room = %room, "target room already visited");
                self.clear_target();
            }
        }

        if let Some(target) = self.nav_target {
            let d = player.distance_2d(&target.to_position());
            if d < ARRIVAL_RADIUS {
                self.clear_target();
            } else if self.progress.record(d) {
                warn!(?target, distance = d, "no progress toward target, blacklisting");
                ctx.session.blacklisted.insert(target);
                self.clear_target();
            }
        }

        if self.nav_target.is_none() {
            match self.choose(ctx) {
                Next::Room(tile, room) => {
                    info!(room = %room, ?tile, "heading to unvisited room");
                    self.set_target(tile, Some(room));
                }
                Next::Stairs(tile, id) => {
                    info!(stairs = %id, ?tile, "heading to staircase");
                    self.set_target(tile, None);
                }
                Next::Wander(tile) => {
                    debug!(?tile, leg = self.wander_legs, "wandering");
                    self.set_target(tile, None);
                }
                Next::Done => {
                    info!(rooms = ctx.session.visited_rooms.len(), "building searched");
                    self.core.complete();
                    return Ok(Vec::new());
                }
                Next::Exhausted => {
                    self.core.fail(PlanError::Exhausted(format!(
                        "no rooms or stairs found after {MAX_WANDER_LEGS} wander legs"
                    )));
                    return Ok(Vec::new());
                }
            }
        }

        let Some(target) = self.nav_target else {
            return Ok(Vec::new());
        };
        let goal: Position = target.to_position();

        if self.move_requested {
            if let Some(obstacle) = obstacle_on_route(snap, goal, &self.opened) {
                if let Some(id) = obstacle.id.clone() {
                    self.opened.insert(id.clone());
                    return Ok(vec![Action::interact(&id)]);
                }
            }
        }

        if !self.move_requested || snap.player.action_state.is_idle() {
            self.move_requested = true;
            let stance = stance_for(player.distance_2d(&goal));
            return Ok(vec![Action::move_to(target, stance)]);
        }
        Ok(Vec::new())
    }
}
