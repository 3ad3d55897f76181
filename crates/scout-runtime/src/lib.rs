//! `scout-runtime` – The Cognitive Core
//!
//! Turns per-tick snapshots into actions. Strategies compete for control,
//! plans carry goals across many ticks, and the planner keeps the plan in
//! step with an execution channel that answers late or not at all.
//!
//! # Modules
//!
//! - [`agent_loop`] – [`AgentLoop`][agent_loop::AgentLoop]: the ordered
//!   ingest → forget → assess → decide → plan → emit cycle, plus the
//!   [`ActionSink`][agent_loop::ActionSink] seam and the
//!   [`SnapshotExporter`][agent_loop::SnapshotExporter].
//! - [`brain`] – [`Brain`][brain::Brain]: loot valuation and threat scoring
//!   into a [`BrainState`][brain::BrainState].
//! - [`strategy`] / [`strategies`] – the [`Strategy`][strategy::Strategy]
//!   trait and the built-in Survival, Loot, SearchBuilding and Idle
//!   strategies.
//! - [`decision_engine`] – [`DecisionEngine`][decision_engine::DecisionEngine]:
//!   strict-maximum arbitration between strategies.
//! - [`plan`] / [`plans`] – the [`Plan`][plan::Plan] state machine contract
//!   and the Navigate, Loot and SearchBuilding plans.
//! - [`planner`] – [`ActionPlanner`][planner::ActionPlanner]: feedback
//!   reconciliation, stationary watch, and fault containment around the
//!   active plan.
//! - [`progress`] – [`ProgressGuard`][progress::ProgressGuard]: rolling-window
//!   "are we getting closer" detector used for stuck targets.
//! - [`queue`] – [`ActionQueue`][queue::ActionQueue]: immediate actions from
//!   strategies.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: `tracing`
//!   subscriber with optional OTLP span export.

pub mod agent_loop;
pub mod brain;
pub mod decision_engine;
pub mod plan;
pub mod planner;
pub mod plans;
pub mod progress;
pub mod queue;
pub mod strategies;
pub mod strategy;
pub mod telemetry;

pub use agent_loop::{ActionSink, AgentLoop, LoopStatus, SnapshotExporter};
pub use brain::{Brain, BrainState, LootConfig};
pub use decision_engine::{Decision, DecisionEngine};
pub use plan::{Plan, PlanError, PlanKind, PlanStatus, PlanSummary, SessionMemory, TickContext};
pub use planner::{ActionPlanner, PlanOutcome, PlannerConfig};
pub use queue::ActionQueue;
pub use strategy::Strategy;
pub use telemetry::{LogFormat, LogSettings, TracerProviderGuard, init_tracing};
