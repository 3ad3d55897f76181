//! Multi-tick goals.
//!
//! A [`Plan`] is a small finite-state machine created by a strategy, installed
//! on the [`ActionPlanner`][crate::planner::ActionPlanner], and advanced once
//! per tick. Each call to [`Plan::execute`] looks at the current snapshot and
//! returns zero or more actions to dispatch (a batch is assumed to run in
//! order), updating the plan's own [`PlanStatus`] as it goes.
//!
//! ```text
//!   PENDING ──first tick──▶ RUNNING ──▶ COMPLETE
//!                              │
//!                              └──────▶ FAILED
//! ```
//!
//! Planning faults such as a vanished target or a transfer that never shows
//! up in the inventory are ordinary transitions to FAILED, carried as a
//! [`PlanError`]. An `Err` returned from `execute` is reserved for internal
//! faults; the planner converts it into FAILED as well.

use std::collections::HashSet;
use std::fmt;

use rand::SeedableRng;
use rand::rngs::StdRng;
use scout_memory::MemorySystem;
use scout_perception::WalkabilityMap;
use scout_types::{Action, TilePos, WorldSnapshot};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Status & errors
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanStatus {
    Pending,
    Running,
    Complete,
    Failed,
}

impl PlanStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PlanStatus::Complete | PlanStatus::Failed)
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlanStatus::Pending => "PENDING",
            PlanStatus::Running => "RUNNING",
            PlanStatus::Complete => "COMPLETE",
            PlanStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Why a plan failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("target {0} not found in vision or memory")]
    TargetLost(String),

    #[error("item {item} did not reach the inventory within {ticks} ticks")]
    TransferTimeout { item: String, ticks: u32 },

    #[error("player stationary for {elapsed_ms} ms")]
    Stationary { elapsed_ms: i64 },

    #[error("nothing left to explore: {0}")]
    Exhausted(String),

    #[error("internal fault: {0}")]
    Internal(String),

    #[error("plan panicked: {0}")]
    Panicked(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared plan state
// ─────────────────────────────────────────────────────────────────────────────

/// Identity and lifecycle fields every plan carries.
#[derive(Debug, Clone)]
pub struct PlanCore {
    pub id: String,
    pub name: String,
    pub status: PlanStatus,
    pub failure: Option<PlanError>,
}

impl PlanCore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            status: PlanStatus::Pending,
            failure: None,
        }
    }

    pub fn fail(&mut self, reason: PlanError) {
        self.status = PlanStatus::Failed;
        self.failure = Some(reason);
    }

    pub fn complete(&mut self) {
        self.status = PlanStatus::Complete;
    }
}

/// Closed set of plan families, for strategies inspecting the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanKind {
    Navigate,
    Investigate,
    Flee,
    Loot,
    SearchBuilding,
}

/// Read-only view of a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSummary {
    pub id: String,
    pub name: String,
    pub kind: PlanKind,
    pub target: Option<String>,
    pub status: PlanStatus,
}

// ─────────────────────────────────────────────────────────────────────────────
// Session memory & tick context
// ─────────────────────────────────────────────────────────────────────────────

/// Exploration state that outlives individual plans.
pub struct SessionMemory {
    pub visited_rooms: HashSet<String>,
    /// Navigation targets abandoned after making no progress.
    pub blacklisted: HashSet<TilePos>,
    /// Staircases already used to change floors.
    pub used_stairs: HashSet<String>,
    pub rng: StdRng,
}

impl SessionMemory {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Reproducible wandering for tests and replays.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            visited_rooms: HashSet::new(),
            blacklisted: HashSet::new(),
            used_stairs: HashSet::new(),
            rng,
        }
    }
}

impl Default for SessionMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a plan may consult on one tick.
pub struct TickContext<'a> {
    pub snapshot: &'a WorldSnapshot,
    pub memory: &'a MemorySystem,
    pub map: &'a dyn WalkabilityMap,
    pub session: &'a mut SessionMemory,
}

// ─────────────────────────────────────────────────────────────────────────────
// Plan trait
// ─────────────────────────────────────────────────────────────────────────────

pub trait Plan: Send {
    fn core(&self) -> &PlanCore;

    fn core_mut(&mut self) -> &mut PlanCore;

    fn kind(&self) -> PlanKind;

    /// Id of the object the plan is after, if any.
    fn target(&self) -> Option<String> {
        None
    }

    /// Advance one tick and return the actions to dispatch, in order.
    fn execute(&mut self, ctx: &mut TickContext<'_>) -> Result<Vec<Action>, PlanError>;

    fn id(&self) -> &str {
        &self.core().id
    }

    fn name(&self) -> &str {
        &self.core().name
    }

    fn status(&self) -> PlanStatus {
        self.core().status
    }

    fn summary(&self) -> PlanSummary {
        PlanSummary {
            id: self.id().to_string(),
            name: self.name().to_string(),
            kind: self.kind(),
            target: self.target(),
            status: self.status(),
        }
    }
}
