//! Fallback that keeps the action channel warm.

use scout_types::Action;

use crate::brain::BrainState;
use crate::planner::ActionPlanner;
use crate::queue::ActionQueue;
use crate::strategy::Strategy;

pub const IDLE_SCORE: f64 = 1.0;
const IDLE_WAIT_MS: u64 = 1_000;

pub struct IdleStrategy;

impl Strategy for IdleStrategy {
    fn name(&self) -> &str {
        "Idle"
    }

    fn evaluate(&self, _state: &BrainState) -> f64 {
        IDLE_SCORE
    }

    fn execute(&mut self, _state: &BrainState, queue: &mut ActionQueue, _planner: &mut ActionPlanner) {
        if queue.is_empty() {
            queue.push(Action::wait(IDLE_WAIT_MS));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_types::ActionKind;

    #[test]
    fn waits_only_on_an_empty_queue() {
        let mut queue = ActionQueue::new();
        let mut planner = ActionPlanner::default();
        let state = BrainState::default();

        IdleStrategy.execute(&state, &mut queue, &mut planner);
        IdleStrategy.execute(&state, &mut queue, &mut planner);
        let out = queue.drain();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, ActionKind::Wait);
        assert_eq!(out[0].param_f64("duration"), Some(1000.0));
    }
}
