//! Winner-takes-all strategy arbitration.
//!
//! [`DecisionEngine::decide`] scores every registered [`Strategy`] and runs
//! only the strict maximum. Ties go to the earlier registration. Non-finite
//! scores never win.

use serde::Serialize;
use tracing::{debug, info};

use crate::brain::BrainState;
use crate::planner::ActionPlanner;
use crate::queue::ActionQueue;
use crate::strategy::Strategy;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The strategy chosen on one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub strategy: String,
    pub score: f64,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct DecisionEngine {
    strategies: Vec<Box<dyn Strategy>>,
    active: Option<String>,
}

impl DecisionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `strategy`; earlier registrations win ties.
    pub fn register(&mut self, strategy: Box<dyn Strategy>) {
        debug!(strategy = strategy.name(), "strategy registered");
        self.strategies.push(strategy);
    }

    pub fn with_strategies(strategies: Vec<Box<dyn Strategy>>) -> Self {
        let mut engine = Self::new();
        for s in strategies {
            engine.register(s);
        }
        engine
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Name of the strategy that won the most recent tick.
    pub fn active_strategy(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Score every strategy and execute the winner.
    ///
    /// Returns `None` when no strategy produced a finite score.
    pub fn decide(
        &mut self,
        state: &BrainState,
        queue: &mut ActionQueue,
        planner: &mut ActionPlanner,
    ) -> Option<Decision> {
        let mut best: Option<(usize, f64)> = None;
        for (i, strategy) in self.strategies.iter().enumerate() {
            let score = strategy.evaluate(state);
            if !score.is_finite() {
                debug!(strategy = strategy.name(), score, "ignoring non-finite score");
                continue;
            }
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((i, score)),
            }
        }

        let (idx, score) = best?;
        let winner = &mut self.strategies[idx];
        let name = winner.name().to_string();
        if self.active.as_deref() != Some(name.as_str()) {
            info!(
                from = self.active.as_deref().unwrap_or("none"),
                to = %name,
                score,
                "strategy switch"
            );
        }
        winner.execute(state, queue, planner);
        self.active = Some(name.clone());
        Some(Decision {
            strategy: name,
            score,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
