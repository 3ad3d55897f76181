//! FIFO buffer strategies push immediate actions into.
//!
//! The agent loop drains it once per tick and dispatches its contents ahead
//! of whatever the active plan emits.

use std::collections::VecDeque;

use scout_types::Action;

#[derive(Debug, Default)]
pub struct ActionQueue {
    actions: VecDeque<Action>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: Action) {
        self.actions.push_back(action);
    }

    pub fn has_actions(&self) -> bool {
        !self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Remove and return everything queued, oldest first.
    pub fn drain(&mut self) -> Vec<Action> {
        self.actions.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }
}
