//! Walk to a point and optionally linger there.
//!
//! One plan type covers three uses:
//!
//! | constructor                     | arrival radius | on arrival                        |
//! |---------------------------------|----------------|-----------------------------------|
//! | [`NavigatePlan::new`]           | 1.5            | complete                          |
//! | [`NavigatePlan::investigate`]   | 1.5            | `Wait`, count down ticks, complete |
//! | [`NavigatePlan::flee`]          | 1.5            | complete; always runs             |

use std::collections::HashSet;

use scout_types::{Action, Position, Stance};
use tracing::info;

use super::{obstacle_on_route, stance_for};
use crate::plan::{Plan, PlanCore, PlanError, PlanKind, TickContext};

const ARRIVAL_RADIUS: f64 = 1.5;

/// Milliseconds a pause tick is assumed to last when sizing the `Wait`.
const TICK_MS: u64 = 100;

pub struct NavigatePlan {
    core: PlanCore,
    kind: PlanKind,
    target: Position,
    /// Ticks to linger on arrival.
    pause_ticks: u32,
    stance: Option<Stance>,
    move_requested: bool,
    arrived: bool,
    remaining: u32,
    opened: HashSet<String>,
}

impl NavigatePlan {
    pub fn new(target: Position) -> Self {
        Self::build(
            format!("Navigate({:.0},{:.0})", target.x, target.y),
            PlanKind::Navigate,
            target,
            0,
            None,
        )
    }

    /// Walk to `target`, then pause for `duration_ticks` so perception can
    /// catch up.
    pub fn investigate(target: Position, description: &str, duration_ticks: u32) -> Self {
        Self::build(
            format!("Investigate({description})"),
            PlanKind::Investigate,
            target,
            duration_ticks,
            None,
        )
    }

    pub fn flee(target: Position) -> Self {
        Self::build(
            format!("Flee({:.0},{:.0})", target.x, target.y),
            PlanKind::Flee,
            target,
            0,
            Some(Stance::Run),
        )
    }

    fn build(
        name: String,
        kind: PlanKind,
        target: Position,
        pause_ticks: u32,
        stance: Option<Stance>,
    ) -> Self {
        Self {
            core: PlanCore::new(name),
            kind,
            target,
            pause_ticks,
            stance,
            move_requested: false,
            arrived: false,
            remaining: 0,
            opened: HashSet::new(),
        }
    }

    pub fn destination(&self) -> Position {
        self.target
    }
}

impl Plan for NavigatePlan {
    fn core(&self) -> &PlanCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PlanCore {
        &mut self.core
    }

    fn kind(&self) -> PlanKind {
        self.kind
    }

    fn execute(&mut self, ctx: &mut TickContext<'_>) -> Result<Vec<Action>, PlanError> {
        let player = &ctx.snapshot.player;
        let dist = player.position.distance_2d(&self.target);

        if self.arrived || dist < ARRIVAL_RADIUS {
            if !self.arrived {
                self.arrived = true;
                info!(plan = %self.core.name, "arrived");
                if self.pause_ticks == 0 {
                    self.core.complete();
                    return Ok(Vec::new());
                }
                self.remaining = self.pause_ticks;
                return Ok(vec![Action::wait(u64::from(self.pause_ticks) * TICK_MS)]);
            }
            self.remaining = self.remaining.saturating_sub(1);
            if self.remaining == 0 {
                self.core.complete();
            }
            return Ok(Vec::new());
        }

        if self.move_requested {
            if let Some(obstacle) = obstacle_on_route(ctx.snapshot, self.target, &self.opened) {
                if let Some(id) = obstacle.id.clone() {
                    self.opened.insert(id.clone());
                    return Ok(vec![Action::interact(&id)]);
                }
            }
        }

        if !self.move_requested || player.action_state.is_idle() {
            self.move_requested = true;
            let stance = self.stance.unwrap_or_else(|| stance_for(dist));
            return Ok(vec![Action::move_to(self.target.tile(), stance)]);
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{PlanStatus, SessionMemory};
    use scout_memory::MemorySystem;
    use scout_types::{ActionKind, PlayerActivity, TilePos, WorldSnapshot};
    use std::collections::HashSet;

    struct Harness {
        memory: MemorySystem,
        map: HashSet<TilePos>,
        session: SessionMemory,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                memory: MemorySystem::default(),
                map: HashSet::new(),
                session: SessionMemory::seeded(1),
            }
        }

        fn run(&mut self, plan: &mut dyn Plan, snapshot: &WorldSnapshot) -> Vec<Action> {
            let mut ctx = TickContext {
                snapshot,
                memory: &self.memory,
                map: &self.map,
                session: &mut self.session,
            };
            plan.execute(&mut ctx).unwrap()
        }
    }

    fn at(x: f64, y: f64, busy: bool) -> WorldSnapshot {
        let mut s = WorldSnapshot::default();
        s.player.position = Position::new(x, y, 0.0);
        if busy {
            s.player.action_state.status = PlayerActivity::Busy;
        }
        s
    }

    #[test]
    fn requests_move_once_while_busy() {
        let mut h = Harness::new();
        let mut plan = NavigatePlan::new(Position::new(20.0, 0.0, 0.0));

        let first = h.run(&mut plan, &at(0.0, 0.0, false));
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].kind, ActionKind::MoveTo);
        assert_eq!(first[0].param_str("stance"), Some("Run"));

        assert!(h.run(&mut plan, &at(3.0, 0.0, true)).is_empty());
        // Idle again before arriving: the move is re-requested.
        assert_eq!(h.run(&mut plan, &at(5.0, 0.0, false)).len(), 1);
    }

    #[test]
    fn investigate_waits_then_completes() {
        let mut h = Harness::new();
        let mut plan = NavigatePlan::investigate(Position::new(2.0, 0.0, 0.0), "crate", 2);

        let out = h.run(&mut plan, &at(1.0, 0.0, false));
        assert_eq!(out[0].kind, ActionKind::Wait);
        assert_eq!(out[0].param_f64("duration"), Some(200.0));
        assert_eq!(plan.status(), PlanStatus::Pending);

        assert!(h.run(&mut plan, &at(1.0, 0.0, false)).is_empty());
        assert_eq!(plan.status(), PlanStatus::Pending);
        h.run(&mut plan, &at(1.0, 0.0, false));
        assert_eq!(plan.status(), PlanStatus::Complete);
    }

    #[test]
    fn flee_completes_on_arrival() {
        let mut h = Harness::new();
        let mut plan = NavigatePlan::flee(Position::new(3.0, 3.0, 0.0));
        let out = h.run(&mut plan, &at(0.0, 0.0, false));
        assert_eq!(out[0].param_str("stance"), Some("Run"));
        h.run(&mut plan, &at(3.2, 3.1, false));
        assert_eq!(plan.status(), PlanStatus::Complete);
    }

    #[test]
    fn closed_door_is_opened_once_before_moving_on() {
        let mut h = Harness::new();
        let mut plan = NavigatePlan::new(Position::new(6.0, 0.0, 0.0));
        h.run(&mut plan, &at(0.0, 0.0, false));

        let mut s = at(0.5, 0.0, false);
        s.objects
            .push(scout_types::ObjectSighting::new("door", "IsoDoor", 2.0, 0.0));
        let out = h.run(&mut plan, &s);
        assert_eq!(out[0].kind, ActionKind::Interact);
        assert_eq!(out[0].param_str("targetId"), Some("door"));

        let out = h.run(&mut plan, &s);
        assert_eq!(out[0].kind, ActionKind::MoveTo);
    }
}
