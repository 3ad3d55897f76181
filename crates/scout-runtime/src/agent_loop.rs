//! [`AgentLoop`] – the per-snapshot cognitive cycle.
//!
//! Each call to [`AgentLoop::tick`] runs one strictly ordered pass:
//!
//! 1. **Ingest** – fold the snapshot into [`MemorySystem`] and [`GridSystem`].
//! 2. **Forget** – decay memory and evict idle grid chunks.
//! 3. **Assess** – condense perception into a [`BrainState`].
//! 4. **Decide** – the [`DecisionEngine`] runs the winning strategy, which may
//!    queue actions or install a plan.
//! 5. **Plan** – the [`ActionPlanner`] reconciles feedback and advances the
//!    active plan.
//! 6. **Emit** – queued actions first, then plan actions.
//!
//! Nothing is read from memory or the grid before this tick's update has
//! landed, so no stage sees stale state.
//!
//! The grid and memory are shared behind [`Arc`] so a [`SnapshotExporter`]
//! can serialise them from another task while the loop keeps ticking.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scout_memory::MemorySystem;
//! use scout_perception::{GridConfig, GridSystem};
//! use scout_runtime::agent_loop::AgentLoop;
//! use scout_runtime::brain::LootConfig;
//! use scout_runtime::planner::PlannerConfig;
//! use scout_types::WorldSnapshot;
//!
//! let grid = Arc::new(GridSystem::open("./chunks", GridConfig::default()).unwrap());
//! let memory = Arc::new(MemorySystem::default());
//! let mut agent = AgentLoop::new(grid, memory, &PlannerConfig::default(), LootConfig::default());
//! let actions = agent.tick(&WorldSnapshot::default());
//! ```

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use scout_memory::MemorySystem;
use scout_perception::grid::SnapshotSummary;
use scout_perception::{GridError, GridSystem};
use scout_types::{Action, ScoutError, WorldSnapshot};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info_span};

use crate::brain::{Brain, BrainState, LootConfig};
use crate::decision_engine::{Decision, DecisionEngine};
use crate::plan::{PlanSummary, SessionMemory, TickContext};
use crate::planner::{ActionPlanner, PlannerConfig};
use crate::queue::ActionQueue;
use crate::strategies::default_strategies;

// ─────────────────────────────────────────────────────────────────────────────
// Dispatch
// ─────────────────────────────────────────────────────────────────────────────

/// Where emitted actions go. Delivery may be asynchronous; completion is
/// observed later through snapshot feedback.
pub trait ActionSink {
    fn dispatch(&mut self, actions: &[Action]) -> Result<(), ScoutError>;
}

impl ActionSink for Vec<Action> {
    fn dispatch(&mut self, actions: &[Action]) -> Result<(), ScoutError> {
        self.extend_from_slice(actions);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Status
// ─────────────────────────────────────────────────────────────────────────────

/// Read-side summary of the loop, shared with the exporter.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoopStatus {
    pub ticks: u64,
    /// Timestamp of the last snapshot ticked.
    pub snapshot_ms: i64,
    pub active_strategy: Option<String>,
    pub last_decision: Option<Decision>,
    pub active_plan: Option<PlanSummary>,
    pub threat_level: f64,
    pub updated_at: Option<DateTime<Utc>>,
}

pub type StatusHandle = Arc<Mutex<LoopStatus>>;

// ─────────────────────────────────────────────────────────────────────────────
// AgentLoop
// ─────────────────────────────────────────────────────────────────────────────

pub struct AgentLoop {
    grid: Arc<GridSystem>,
    memory: Arc<MemorySystem>,
    brain: Brain,
    engine: DecisionEngine,
    planner: ActionPlanner,
    queue: ActionQueue,
    session: SessionMemory,
    status: StatusHandle,
}

impl AgentLoop {
    /// Loop with the default strategy set and an OS-seeded session.
    pub fn new(
        grid: Arc<GridSystem>,
        memory: Arc<MemorySystem>,
        planner: &PlannerConfig,
        loot: LootConfig,
    ) -> Self {
        Self {
            grid,
            memory,
            brain: Brain::new(loot),
            engine: DecisionEngine::with_strategies(default_strategies()),
            planner: ActionPlanner::new(planner),
            queue: ActionQueue::new(),
            session: SessionMemory::new(),
            status: Arc::new(Mutex::new(LoopStatus::default())),
        }
    }

    pub fn with_engine(mut self, engine: DecisionEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_session(mut self, session: SessionMemory) -> Self {
        self.session = session;
        self
    }

    pub fn grid(&self) -> &Arc<GridSystem> {
        &self.grid
    }

    pub fn memory(&self) -> &Arc<MemorySystem> {
        &self.memory
    }

    pub fn planner(&self) -> &ActionPlanner {
        &self.planner
    }

    pub fn planner_mut(&mut self) -> &mut ActionPlanner {
        &mut self.planner
    }

    pub fn session(&self) -> &SessionMemory {
        &self.session
    }

    pub fn status_handle(&self) -> StatusHandle {
        Arc::clone(&self.status)
    }

    pub fn status(&self) -> LoopStatus {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn exporter(&self) -> SnapshotExporter {
        SnapshotExporter::new(
            Arc::clone(&self.grid),
            Arc::clone(&self.memory),
            self.status_handle(),
        )
    }

    /// Run one cycle and return the actions to dispatch, in order.
    pub fn tick(&mut self, snapshot: &WorldSnapshot) -> Vec<Action> {
        let ts = snapshot.timestamp_ms;
        let span = info_span!("tick", ts);
        let _enter = span.enter();

        // ── 1. Ingest ────────────────────────────────────────────────────────
        let ingested = self.memory.update(snapshot);
        self.grid.update(&snapshot.tiles, ts);

        // ── 2. Forget ────────────────────────────────────────────────────────
        let forgotten = self.memory.decay(ts);
        let evicted = self.grid.maintenance(ts);
        debug!(?ingested, forgotten, evicted, "world model updated");

        // ── 3. Assess ────────────────────────────────────────────────────────
        let state = self.brain.assess(snapshot, &self.memory, &self.planner);

        // ── 4. Decide ────────────────────────────────────────────────────────
        let decision = self
            .engine
            .decide(&state, &mut self.queue, &mut self.planner);

        // ── 5. Plan ──────────────────────────────────────────────────────────
        let mut ctx = TickContext {
            snapshot,
            memory: &self.memory,
            map: &*self.grid,
            session: &mut self.session,
        };
        let plan_actions = self.planner.update(&mut ctx);

        // ── 6. Emit ──────────────────────────────────────────────────────────
        let mut actions = self.queue.drain();
        actions.extend(plan_actions);
        if !actions.is_empty() {
            debug!(count = actions.len(), "actions emitted");
        }

        self.record_status(&state, decision);
        actions
    }

    /// [`tick`][Self::tick], then hand the actions to `sink`.
    pub fn tick_into(
        &mut self,
        snapshot: &WorldSnapshot,
        sink: &mut dyn ActionSink,
    ) -> Result<usize, ScoutError> {
        let actions = self.tick(snapshot);
        if !actions.is_empty() {
            sink.dispatch(&actions)?;
        }
        Ok(actions.len())
    }

    fn record_status(&self, state: &BrainState, decision: Option<Decision>) {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        status.ticks += 1;
        status.snapshot_ms = state.timestamp_ms;
        status.active_strategy = self.engine.active_strategy().map(str::to_string);
        status.last_decision = decision;
        status.active_plan = self.planner.active_summary();
        status.threat_level = state.threat_level;
        status.updated_at = Some(Utc::now());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Snapshot export
// ─────────────────────────────────────────────────────────────────────────────

/// Writes the visualisation snapshot: grid tiles plus remembered objects and
/// loop status.
#[derive(Clone)]
pub struct SnapshotExporter {
    grid: Arc<GridSystem>,
    memory: Arc<MemorySystem>,
    status: StatusHandle,
}

impl SnapshotExporter {
    pub fn new(grid: Arc<GridSystem>, memory: Arc<MemorySystem>, status: StatusHandle) -> Self {
        Self {
            grid,
            memory,
            status,
        }
    }

    pub fn export(&self, path: impl AsRef<Path>, now: i64) -> Result<SnapshotSummary, GridError> {
        let mut extra = match self.memory.export(now) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let status = self
            .status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        extra.insert("active_strategy".to_string(), json!(status.active_strategy));
        extra.insert("status".to_string(), serde_json::to_value(&status)?);
        self.grid.save_snapshot(path, extra)
    }

    /// [`export`][Self::export] aged against the last ticked snapshot.
    pub fn export_current(&self, path: impl AsRef<Path>) -> Result<SnapshotSummary, GridError> {
        let now = self
            .status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot_ms;
        self.export(path, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_perception::GridConfig;
    use scout_types::{ActionKind, ObjectSighting, Position, TileObservation};

    fn agent(dir: &Path) -> AgentLoop {
        let grid = Arc::new(GridSystem::open(dir, GridConfig::default()).unwrap());
        AgentLoop::new(
            grid,
            Arc::new(MemorySystem::default()),
            &PlannerConfig::default(),
            LootConfig::default(),
        )
        .with_session(SessionMemory::seeded(11))
    }

    #[test]
    fn quiet_world_idles() {
        let dir = tempfile::tempdir().unwrap();
        let mut agent = agent(dir.path());
        let out = agent.tick(&WorldSnapshot::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, ActionKind::Wait);
        assert_eq!(agent.status().active_strategy.as_deref(), Some("Idle"));
        assert_eq!(agent.status().ticks, 1);
    }

    #[test]
    fn tick_updates_grid_and_memory_before_deciding() {
        let dir = tempfile::tempdir().unwrap();
        let mut agent = agent(dir.path());
        let mut s = WorldSnapshot::default();
        s.timestamp_ms = 1_000;
        s.tiles.push(TileObservation::new(0, 0, 0, true));
        s.objects.push(ObjectSighting::new("z1", "Zombie", 0.5, 0.0));

        let out = agent.tick(&s);
        assert_eq!(agent.grid().walkability(scout_types::TilePos::new(0, 0, 0)), Some(true));
        assert!(agent.memory().entity("z1").is_some());
        assert_eq!(agent.status().active_strategy.as_deref(), Some("Survival"));
        assert_eq!(out[0].kind, ActionKind::MoveTo);
        assert_eq!(out[0].param_str("stance"), Some("Run"));
    }

    #[test]
    fn exporter_merges_memory_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut agent = agent(dir.path());
        let mut s = WorldSnapshot::default();
        s.player.position = Position::new(1.0, 1.0, 0.0);
        s.tiles.push(TileObservation::new(1, 1, 0, true));
        s.objects.push(ObjectSighting::new("z1", "Zombie", 9.0, 9.0));
        agent.tick(&s);

        let out = dir.path().join("snapshot.json");
        let summary = agent.exporter().export(&out, 0).unwrap();
        assert_eq!(summary.tiles, 1);

        let doc: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(doc["entities"][0]["id"], "z1");
        assert_eq!(doc["active_strategy"], "Idle");
        assert_eq!(doc["status"]["ticks"], 1);
    }

    #[test]
    fn export_current_uses_last_snapshot_time() {
        let dir = tempfile::tempdir().unwrap();
        let mut agent = agent(dir.path());
        let mut s = WorldSnapshot::default();
        s.timestamp_ms = 4_000;
        s.objects.push(ObjectSighting::new("z1", "Zombie", 9.0, 9.0));
        agent.tick(&s);
        assert_eq!(agent.status().snapshot_ms, 4_000);

        let out = dir.path().join("snapshot.json");
        agent.exporter().export_current(&out).unwrap();
        let doc: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(doc["entities"][0]["id"], "z1");
        assert_eq!(doc["status"]["snapshot_ms"], 4_000);
    }

    #[test]
    fn sink_receives_emitted_actions() {
        let dir = tempfile::tempdir().unwrap();
        let mut agent = agent(dir.path());
        let mut sink: Vec<Action> = Vec::new();
        let n = agent.tick_into(&WorldSnapshot::default(), &mut sink).unwrap();
        assert_eq!(n, 1);
        assert_eq!(sink.len(), 1);
    }
}
