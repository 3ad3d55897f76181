//! Fetch the most valuable remembered item.
//!
//! Targets whose loot plan failed are abandoned for the rest of the session
//! so a locked or phantom container cannot capture the agent.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::brain::{BrainState, LootTarget};
use crate::plan::{PlanKind, PlanStatus};
use crate::planner::ActionPlanner;
use crate::plans::LootPlan;
use crate::queue::ActionQueue;
use crate::strategy::Strategy;

pub const LOOT_SCORE: f64 = 50.0;

#[derive(Debug, Default)]
pub struct LootStrategy {
    abandoned: HashSet<String>,
}

impl LootStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_abandoned(&self, item_id: &str) -> bool {
        self.abandoned.contains(item_id)
    }

    fn best<'s>(&self, state: &'s BrainState) -> Option<&'s LootTarget> {
        state
            .loot_targets
            .iter()
            .find(|t| !self.abandoned.contains(&t.item_id))
    }
}

impl Strategy for LootStrategy {
    fn name(&self) -> &str {
        "Loot"
    }

    fn evaluate(&self, state: &BrainState) -> f64 {
        if self.best(state).is_some() {
            LOOT_SCORE
        } else {
            0.0
        }
    }

    fn execute(&mut self, state: &BrainState, _queue: &mut ActionQueue, planner: &mut ActionPlanner) {
        for plan in state.recent_plans() {
            if plan.kind == PlanKind::Loot && plan.status == PlanStatus::Failed {
                if let Some(item) = &plan.target {
                    if self.abandoned.insert(item.clone()) {
                        warn!(item = %item, "abandoning loot target");
                    }
                }
            }
        }

        let Some(target) = self.best(state) else {
            return;
        };

        let already = planner.active_summary().is_some_and(|p| {
            p.kind == PlanKind::Loot
                && !p.status.is_terminal()
                && p.target.as_deref() == Some(target.item_id.as_str())
        });
        if already {
            return;
        }

        info!(
            item = %target.item_id,
            item_type = %target.item_type,
            value = target.value,
            "going for loot"
        );
        planner.set_goal(Box::new(LootPlan::new(
            target.item_id.clone(),
            target.container_id.clone(),
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanSummary;
    use scout_types::Position;

    fn target(id: &str, value: f64) -> LootTarget {
        LootTarget {
            item_id: id.to_string(),
            item_type: "Base.Axe".to_string(),
            name: None,
            value,
            position: Position::new(5.0, 0.0, 0.0),
            container_id: Some("crate_1".to_string()),
        }
    }

    fn loot_summary(item: &str, status: PlanStatus) -> PlanSummary {
        PlanSummary {
            id: "p1".to_string(),
            name: format!("Loot({item})"),
            kind: PlanKind::Loot,
            target: Some(item.to_string()),
            status,
        }
    }

    #[test]
    fn scores_only_with_targets() {
        let strategy = LootStrategy::new();
        assert_eq!(strategy.evaluate(&BrainState::default()), 0.0);
        let state = BrainState {
            loot_targets: vec![target("axe_1", 80.0)],
            ..BrainState::default()
        };
        assert_eq!(strategy.evaluate(&state), LOOT_SCORE);
    }

    #[test]
    fn installs_plan_once_per_target() {
        let mut strategy = LootStrategy::new();
        let mut planner = ActionPlanner::default();
        let mut queue = ActionQueue::new();
        let state = BrainState {
            loot_targets: vec![target("axe_1", 80.0)],
            ..BrainState::default()
        };

        strategy.execute(&state, &mut queue, &mut planner);
        let first = planner.active_summary().unwrap();
        assert_eq!(first.target.as_deref(), Some("axe_1"));

        strategy.execute(&state, &mut queue, &mut planner);
        assert_eq!(planner.active_summary().unwrap().id, first.id);
    }

    #[test]
    fn failed_target_is_abandoned_for_the_next_best() {
        let mut strategy = LootStrategy::new();
        let mut planner = ActionPlanner::default();
        let state = BrainState {
            loot_targets: vec![target("axe_1", 80.0), target("hammer_1", 60.0)],
            active_plan: Some(loot_summary("axe_1", PlanStatus::Failed)),
            ..BrainState::default()
        };

        strategy.execute(&state, &mut ActionQueue::new(), &mut planner);
        assert!(strategy.is_abandoned("axe_1"));
        assert_eq!(
            planner.active_summary().and_then(|p| p.target),
            Some("hammer_1".to_string())
        );

        let only_axe = BrainState {
            loot_targets: vec![target("axe_1", 80.0)],
            ..BrainState::default()
        };
        assert_eq!(strategy.evaluate(&only_axe), 0.0);
    }
}
