//! Explore the building the player is standing in.

use std::collections::HashSet;

use tracing::info;

use crate::brain::BrainState;
use crate::plan::{PlanKind, PlanStatus};
use crate::planner::ActionPlanner;
use crate::plans::SearchBuildingPlan;
use crate::queue::ActionQueue;
use crate::strategy::Strategy;

pub const SEARCH_SCORE: f64 = 30.0;

#[derive(Debug, Default)]
pub struct SearchBuildingStrategy {
    /// Rooms in which a search ran to completion.
    completed_rooms: HashSet<String>,
    /// Plan ids whose completion has already been recorded.
    recorded: HashSet<String>,
}

impl SearchBuildingStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_completed(&self, room: &str) -> bool {
        self.completed_rooms.contains(room)
    }
}

impl Strategy for SearchBuildingStrategy {
    fn name(&self) -> &str {
        "SearchBuilding"
    }

    fn evaluate(&self, state: &BrainState) -> f64 {
        let Some(room) = state.current_room.as_deref() else {
            return 0.0;
        };
        if self.completed_rooms.contains(room) {
            return 0.0;
        }
        if state.planner_idle() || state.is_running(PlanKind::SearchBuilding) {
            SEARCH_SCORE
        } else {
            0.0
        }
    }

    fn execute(&mut self, state: &BrainState, _queue: &mut ActionQueue, planner: &mut ActionPlanner) {
        for plan in state.recent_plans() {
            if plan.kind == PlanKind::SearchBuilding
                && plan.status == PlanStatus::Complete
                && self.recorded.insert(plan.id.clone())
            {
                if let Some(room) = &state.current_room {
                    info!(room = %room, "building search finished here");
                    self.completed_rooms.insert(room.clone());
                }
            }
        }

        if state.is_running(PlanKind::SearchBuilding) {
            return;
        }
        if let Some(room) = &state.current_room {
            if self.completed_rooms.contains(room) {
                return;
            }
        }
        planner.set_goal(Box::new(SearchBuildingPlan::new()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanSummary;

    fn in_room(active: Option<PlanSummary>) -> BrainState {
        BrainState {
            current_room: Some("kitchen".to_string()),
            active_plan: active,
            ..BrainState::default()
        }
    }

    fn search(status: PlanStatus) -> PlanSummary {
        PlanSummary {
            id: "s1".to_string(),
            name: "SearchBuilding".to_string(),
            kind: PlanKind::SearchBuilding,
            target: None,
            status,
        }
    }

    #[test]
    fn scores_inside_rooms_when_planner_is_free() {
        let strategy = SearchBuildingStrategy::new();
        assert_eq!(strategy.evaluate(&BrainState::default()), 0.0);
        assert_eq!(strategy.evaluate(&in_room(None)), SEARCH_SCORE);
        assert_eq!(
            strategy.evaluate(&in_room(Some(search(PlanStatus::Running)))),
            SEARCH_SCORE
        );

        let busy = PlanSummary {
            kind: PlanKind::Loot,
            ..search(PlanStatus::Running)
        };
        assert_eq!(strategy.evaluate(&in_room(Some(busy))), 0.0);
    }

    #[test]
    fn completed_search_retires_the_room() {
        let mut strategy = SearchBuildingStrategy::new();
        let mut planner = ActionPlanner::default();

        strategy.execute(&in_room(None), &mut ActionQueue::new(), &mut planner);
        assert_eq!(
            planner.active_summary().map(|p| p.kind),
            Some(PlanKind::SearchBuilding)
        );

        planner.clear();
        let done = in_room(Some(search(PlanStatus::Complete)));
        strategy.execute(&done, &mut ActionQueue::new(), &mut planner);
        assert!(strategy.is_completed("kitchen"));
        assert!(planner.is_idle());
        assert_eq!(strategy.evaluate(&in_room(None)), 0.0);
    }
}
