//! The [`Strategy`] seam between scoring and acting.
//!
//! Each tick the [`DecisionEngine`][crate::decision_engine::DecisionEngine]
//! asks every registered strategy how much it wants control
//! ([`evaluate`][Strategy::evaluate]) and hands the tick to the single
//! highest scorer ([`execute`][Strategy::execute]). A strategy that keeps
//! winning is not reset between ticks, so it can keep driving whatever plan
//! it installed.
//!
//! Strategies act through two channels: immediate actions go into the
//! [`ActionQueue`], multi-tick goals go to the [`ActionPlanner`] via
//! [`set_goal`][ActionPlanner::set_goal].

use crate::brain::BrainState;
use crate::planner::ActionPlanner;
use crate::queue::ActionQueue;

pub trait Strategy: Send {
    fn name(&self) -> &str;

    /// Desire for control this tick. Higher wins; 0 means "not applicable".
    fn evaluate(&self, state: &BrainState) -> f64;

    /// Act on a tick this strategy won.
    fn execute(&mut self, state: &BrainState, queue: &mut ActionQueue, planner: &mut ActionPlanner);
}
