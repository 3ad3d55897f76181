//! [`ActionPlanner`] – runs at most one [`Plan`] against a slow, asynchronous
//! execution channel.
//!
//! Actions leave the agent long before they finish. The planner remembers the
//! id of the last action it emitted and, on each [`update`][ActionPlanner::update],
//! reconciles it against the feedback carried in the snapshot before letting
//! the plan advance:
//!
//! | feedback for the pending id               | planner does                       |
//! |-------------------------------------------|------------------------------------|
//! | currently executing                       | wait, emit nothing                 |
//! | reported completed                        | clear it, let the plan advance     |
//! | not seen, but the game queue is busy      | wait, emit nothing                 |
//! | not executing, not completed, queue empty | treat as vanished, clear, advance  |
//!
//! Independently of the plan's own logic, a [`StationaryWatch`] fails the
//! active plan when the player has not moved for `stationary_timeout_ms`.
//!
//! Faults inside [`Plan::execute`], whether an `Err` or a panic, are logged
//! and turned into a FAILED plan. Nothing escapes to the caller.
//!
//! [`set_goal`][ActionPlanner::set_goal] replaces the active plan
//! unconditionally. Callers that install a new plan every tick will restart
//! it every tick.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use scout_types::{Action, ActionState, Position};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::plan::{Plan, PlanError, PlanStatus, PlanSummary, TickContext};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// A plan whose player has not moved for this long is failed.
    pub stationary_timeout_ms: i64,
    /// Displacement below which the player counts as stationary.
    pub movement_epsilon: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            stationary_timeout_ms: 10_000,
            movement_epsilon: 0.05,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stationary watch
// ─────────────────────────────────────────────────────────────────────────────

/// Deadline on player movement, re-armed whenever the player moves.
#[derive(Debug, Clone)]
pub struct StationaryWatch {
    timeout_ms: i64,
    epsilon: f64,
    anchor: Option<(Position, i64)>,
}

impl StationaryWatch {
    pub fn new(timeout_ms: i64, epsilon: f64) -> Self {
        Self {
            timeout_ms,
            epsilon,
            anchor: None,
        }
    }

    /// Feed the current position. Returns how long the player has been still
    /// once that exceeds the timeout.
    pub fn observe(&mut self, position: Position, now: i64) -> Option<i64> {
        match self.anchor {
            Some((anchor, since)) if anchor.distance_2d(&position) <= self.epsilon => {
                let elapsed = now - since;
                (elapsed > self.timeout_ms).then_some(elapsed)
            }
            _ => {
                self.anchor = Some((position, now));
                None
            }
        }
    }

    pub fn reset(&mut self) {
        self.anchor = None;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Feedback reconciliation
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Feedback {
    Wait,
    Proceed,
}

fn reconcile(pending: &mut Option<String>, state: &ActionState) -> Feedback {
    let Some(id) = pending.as_deref() else {
        return Feedback::Proceed;
    };
    if state.is_executing(id) {
        return Feedback::Wait;
    }
    if state.has_completed(id) {
        debug!(action_id = id, "action completed");
        *pending = None;
        return Feedback::Proceed;
    }
    if state.queue_busy {
        return Feedback::Wait;
    }
    warn!(action_id = id, "action vanished from the execution queue, retrying");
    *pending = None;
    Feedback::Proceed
}

// ─────────────────────────────────────────────────────────────────────────────
// ActionPlanner
// ─────────────────────────────────────────────────────────────────────────────

/// How the most recently cleared plan ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanOutcome {
    pub summary: PlanSummary,
    pub failure: Option<String>,
}

pub struct ActionPlanner {
    plan: Option<Box<dyn Plan>>,
    pending_action: Option<String>,
    watch: StationaryWatch,
    last_outcome: Option<PlanOutcome>,
}

impl ActionPlanner {
    pub fn new(config: &PlannerConfig) -> Self {
        Self {
            plan: None,
            pending_action: None,
            watch: StationaryWatch::new(config.stationary_timeout_ms, config.movement_epsilon),
            last_outcome: None,
        }
    }

    /// Install `plan`, dropping whatever was active and its feedback tracking.
    pub fn set_goal(&mut self, plan: Box<dyn Plan>) {
        if let Some(old) = &self.plan {
            debug!(replaced = old.name(), status = %old.status(), "replacing active plan");
        }
        info!(plan = plan.name(), id = plan.id(), "plan installed");
        self.plan = Some(plan);
        self.pending_action = None;
        self.watch.reset();
    }

    /// Drop the active plan without recording an outcome.
    pub fn clear(&mut self) {
        self.plan = None;
        self.pending_action = None;
        self.watch.reset();
    }

    pub fn is_idle(&self) -> bool {
        self.plan.is_none()
    }

    pub fn active_plan(&self) -> Option<&dyn Plan> {
        self.plan.as_deref()
    }

    pub fn active_summary(&self) -> Option<PlanSummary> {
        self.plan.as_ref().map(|p| p.summary())
    }

    /// Id of the emitted action the planner is waiting on.
    pub fn pending_action(&self) -> Option<&str> {
        self.pending_action.as_deref()
    }

    pub fn last_outcome(&self) -> Option<&PlanOutcome> {
        self.last_outcome.as_ref()
    }

    /// Advance the active plan by one tick and return the actions to
    /// dispatch.
    pub fn update(&mut self, ctx: &mut TickContext<'_>) -> Vec<Action> {
        let Some(plan) = self.plan.as_mut() else {
            return Vec::new();
        };
        let snapshot = ctx.snapshot;

        if !plan.status().is_terminal() {
            let now = snapshot.timestamp_ms;
            if let Some(elapsed_ms) = self.watch.observe(snapshot.player.position, now) {
                warn!(plan = plan.name(), elapsed_ms, "player stationary too long, failing plan");
                plan.core_mut().fail(PlanError::Stationary { elapsed_ms });
            }
        }

        if !plan.status().is_terminal()
            && reconcile(&mut self.pending_action, &snapshot.player.action_state)
                == Feedback::Wait
        {
            return Vec::new();
        }

        if plan.status().is_terminal() {
            let outcome = PlanOutcome {
                summary: plan.summary(),
                failure: plan.core().failure.as_ref().map(ToString::to_string),
            };
            match &outcome.failure {
                Some(reason) => warn!(plan = %outcome.summary.name, %reason, "plan failed"),
                None => info!(plan = %outcome.summary.name, "plan complete"),
            }
            self.last_outcome = Some(outcome);
            self.clear();
            return Vec::new();
        }

        if plan.status() == PlanStatus::Pending {
            plan.core_mut().status = PlanStatus::Running;
            debug!(plan = plan.name(), "plan running");
        }

        match panic::catch_unwind(AssertUnwindSafe(|| plan.execute(ctx))) {
            Ok(Ok(actions)) => {
                if let Some(last) = actions.last() {
                    self.pending_action = Some(last.id.clone());
                }
                actions
            }
            Ok(Err(err)) => {
                error!(plan = plan.name(), error = %err, "plan execution failed");
                plan.core_mut().fail(err);
                Vec::new()
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(plan = plan.name(), %message, "plan panicked");
                plan.core_mut().fail(PlanError::Panicked(message));
                Vec::new()
            }
        }
    }
}

impl Default for ActionPlanner {
    fn default() -> Self {
        Self::new(&PlannerConfig::default())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
