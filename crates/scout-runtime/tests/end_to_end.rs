//! Whole-loop scenarios driven by scripted snapshots.

use std::path::Path;
use std::sync::Arc;

use scout_memory::MemorySystem;
use scout_perception::{GridConfig, GridSystem};
use scout_runtime::{AgentLoop, LootConfig, PlanKind, PlanStatus, PlannerConfig, SessionMemory};
use scout_types::{
    Action, ActionKind, ContainerSighting, InventoryItem, ItemSighting, Position, TileObservation,
    WorldSnapshot,
};

fn agent(dir: &Path) -> AgentLoop {
    let grid = Arc::new(GridSystem::open(dir, GridConfig::default()).unwrap());
    AgentLoop::new(
        grid,
        Arc::new(MemorySystem::default()),
        &PlannerConfig::default(),
        LootConfig::default(),
    )
    .with_session(SessionMemory::seeded(42))
}

/// Open floor around a crate at (5, 0) holding an axe.
fn scene(ts: i64, player_x: f64) -> WorldSnapshot {
    let mut s = WorldSnapshot::default();
    s.timestamp_ms = ts;
    s.player.position = Position::new(player_x, 0.0, 0.0);
    for x in -1..=7 {
        for y in -1..=1 {
            s.tiles.push(TileObservation::new(x, y, 0, true));
        }
    }
    s.containers.push(
        ContainerSighting::new(Some("crate_1".to_string()), "IsoCrate", 5.0, 0.0)
            .with_items(vec![ItemSighting::new("axe_1", "Base.Axe")]),
    );
    s
}

fn only(actions: &[Action], kind: ActionKind) -> &Action {
    let found: Vec<&Action> = actions.iter().filter(|a| a.kind == kind).collect();
    assert_eq!(found.len(), 1, "expected one {kind:?} in {actions:?}");
    found[0]
}

#[test]
fn loot_scenario_runs_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let mut agent = agent(dir.path());

    // Tick 1: container remembered, loot plan installed, approach requested.
    let out = agent.tick(&scene(0, 0.0));
    assert!(agent.memory().container("crate_1").is_some());
    let active = agent.planner().active_summary().unwrap();
    assert_eq!(active.kind, PlanKind::Loot);
    assert_eq!(active.target.as_deref(), Some("axe_1"));
    let mv = only(&out, ActionKind::MoveTo);
    assert_eq!(mv.param_f64("x"), Some(4.0));
    assert_eq!(mv.param_f64("y"), Some(0.0));
    let move_id = mv.id.clone();

    // Tick 2: still walking.
    let mut s = scene(500, 2.0);
    s.player.action_state.current_action_id = Some(move_id.clone());
    assert!(agent.tick(&s).is_empty());

    // Tick 3: arrived, move reported done → face the crate.
    let mut s = scene(1_000, 4.0);
    s.player.action_state.completed_ids = vec![move_id];
    let out = agent.tick(&s);
    let look_id = only(&out, ActionKind::LookTo).id.clone();

    // Tick 4: facing done → transfer.
    let mut s = scene(1_500, 4.0);
    s.player.action_state.last_completed_id = Some(look_id);
    let out = agent.tick(&s);
    let loot = only(&out, ActionKind::Loot);
    assert_eq!(loot.param_str("targetId"), Some("crate_1"));
    assert_eq!(loot.param_str("itemId"), Some("axe_1"));
    assert_eq!(loot.param_str("destContainerId"), Some("inventory"));
    let loot_id = loot.id.clone();

    // Tick 5: the axe is in the inventory.
    let mut s = scene(2_000, 4.0);
    s.containers[0].items.clear();
    s.player.action_state.last_completed_id = Some(loot_id);
    s.player.inventory.push(InventoryItem {
        id: "axe_1".to_string(),
        item_type: "Base.Axe".to_string(),
        name: None,
    });
    let out = agent.tick(&s);
    assert!(out.iter().all(|a| a.kind != ActionKind::Loot));
    assert_eq!(
        agent.planner().active_summary().map(|p| p.status),
        Some(PlanStatus::Complete)
    );

    // Tick 6: the finished plan is cleared.
    agent.tick(&s);
    assert!(agent.planner().is_idle());
    let outcome = agent.planner().last_outcome().unwrap();
    assert_eq!(outcome.summary.status, PlanStatus::Complete);
}

#[test]
fn vanished_move_is_requested_again() {
    let dir = tempfile::tempdir().unwrap();
    let mut agent = agent(dir.path());

    let first = only(&agent.tick(&scene(0, 0.0)), ActionKind::MoveTo).id.clone();

    // No feedback at all and an empty queue: the move never happened.
    let out = agent.tick(&scene(500, 0.5));
    let retry = only(&out, ActionKind::MoveTo);
    assert_ne!(retry.id, first);
    assert_eq!(agent.planner().pending_action(), Some(retry.id.as_str()));
}

#[test]
fn stationary_player_fails_the_plan_and_target_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let mut agent = agent(dir.path());

    let mut ts = 0;
    while ts <= 10_000 {
        let mut s = scene(ts, 0.0);
        s.player.action_state.queue_busy = true;
        agent.tick(&s);
        ts += 500;
    }
    assert_eq!(
        agent.planner().active_summary().map(|p| p.status),
        Some(PlanStatus::Running)
    );

    let mut s = scene(10_500, 0.0);
    s.player.action_state.queue_busy = true;
    agent.tick(&s);
    assert!(agent.planner().is_idle());
    let outcome = agent.planner().last_outcome().unwrap();
    assert_eq!(outcome.summary.kind, PlanKind::Loot);
    assert!(
        outcome
            .failure
            .as_deref()
            .is_some_and(|f| f.starts_with("player stationary"))
    );

    // The failed target is abandoned rather than retried forever.
    agent.tick(&scene(11_000, 0.0));
    agent.tick(&scene(11_500, 0.0));
    assert!(agent.planner().is_idle());
    assert_eq!(agent.status().active_strategy.as_deref(), Some("Idle"));
}
