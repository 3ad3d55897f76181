//! Run from nearby zombies.
//!
//! The flee point lies [`FLEE_DISTANCE`] tiles from the player, directly
//! away from the score-weighted centroid of current threats.

use scout_types::Position;
use tracing::warn;

use crate::brain::{BrainState, Threat};
use crate::plan::PlanKind;
use crate::planner::ActionPlanner;
use crate::plans::NavigatePlan;
use crate::queue::ActionQueue;
use crate::strategy::Strategy;

pub const SURVIVAL_SCORE: f64 = 100.0;
pub const DANGER_THRESHOLD: f64 = 50.0;
pub const FLEE_DISTANCE: f64 = 8.0;

#[derive(Debug, Default)]
pub struct SurvivalStrategy;

impl SurvivalStrategy {
    pub fn new() -> Self {
        Self
    }
}

/// Point `distance` tiles from `from`, away from the weighted threat centroid.
pub fn flee_point(from: Position, threats: &[Threat], distance: f64) -> Position {
    let total: f64 = threats.iter().map(|t| t.score).sum();
    let (mut dx, mut dy) = (1.0, 0.0);
    if total > 0.0 {
        let cx = threats.iter().map(|t| t.score * t.position.x).sum::<f64>() / total;
        let cy = threats.iter().map(|t| t.score * t.position.y).sum::<f64>() / total;
        let (ax, ay) = (from.x - cx, from.y - cy);
        let len = ax.hypot(ay);
        if len > 1e-6 {
            (dx, dy) = (ax / len, ay / len);
        }
    }
    Position::new(from.x + dx * distance, from.y + dy * distance, from.z)
}

impl Strategy for SurvivalStrategy {
    fn name(&self) -> &str {
        "Survival"
    }

    fn evaluate(&self, state: &BrainState) -> f64 {
        if state.threat_level > DANGER_THRESHOLD {
            SURVIVAL_SCORE
        } else {
            0.0
        }
    }

    fn execute(&mut self, state: &BrainState, _queue: &mut ActionQueue, planner: &mut ActionPlanner) {
        if state.is_running(PlanKind::Flee) {
            return;
        }
        let target = flee_point(state.player.position, &state.threats, FLEE_DISTANCE);
        warn!(
            threat_level = state.threat_level,
            threats = state.threats.len(),
            x = target.x,
            y = target.y,
            "fleeing"
        );
        planner.set_goal(Box::new(NavigatePlan::flee(target)));
    }
}
