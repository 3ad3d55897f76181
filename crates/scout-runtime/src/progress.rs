//! [`ProgressGuard`] – rolling-window progress detector.
//!
//! Detects when a plan keeps chasing a target without getting any closer,
//! and signals that the target should be abandoned before the agent wastes
//! further ticks on it.
//!
//! # Algorithm
//!
//! The guard keeps the last *N* distance-to-target samples. After each
//! [`ProgressGuard::record`] call it compares the oldest and newest samples
//! in a full window. If the distance shrank by less than `min_improvement`,
//! [`record`][ProgressGuard::record] returns `true` and the caller should
//! blacklist the target and pick another.
//!
//! # Example
//!
//! ```rust
//! use scout_runtime::progress::ProgressGuard;
//!
//! let mut guard = ProgressGuard::new(3, 0.5);
//!
//! assert!(!guard.record(8.0));
//! assert!(!guard.record(8.0));
//! assert!(guard.record(7.9)); // three samples, barely closer → stuck
//!
//! guard.reset();
//! assert!(!guard.record(7.9));
//! ```

use std::collections::VecDeque;

/// Flags a target whose distance is not improving.
#[derive(Debug, Clone)]
pub struct ProgressGuard {
    /// Number of samples that make up a full window.
    window: usize,
    /// Minimum distance the window must cover to count as progress.
    min_improvement: f64,
    history: VecDeque<f64>,
}

impl ProgressGuard {
    /// `window` is clamped to at least 2 samples.
    pub fn new(window: usize, min_improvement: f64) -> Self {
        let window = window.max(2);
        Self {
            window,
            min_improvement,
            history: VecDeque::with_capacity(window),
        }
    }

    /// Record the current distance to the target.
    ///
    /// Returns `true` once a full window shows less than `min_improvement`
    /// of progress.
    pub fn record(&mut self, distance: f64) -> bool {
        self.history.push_back(distance);
        while self.history.len() > self.window {
            self.history.pop_front();
        }
        self.is_stuck()
    }

    pub fn is_stuck(&self) -> bool {
        if self.history.len() < self.window {
            return false;
        }
        match (self.history.front(), self.history.back()) {
            (Some(first), Some(last)) => first - last < self.min_improvement,
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_approach_is_not_stuck() {
        let mut guard = ProgressGuard::new(3, 0.5);
        assert!(!guard.record(10.0));
        assert!(!guard.record(9.0));
        assert!(!guard.record(8.0));
        assert!(!guard.record(7.0));
    }

    #[test]
    fn flat_distance_triggers_at_full_window() {
        let mut guard = ProgressGuard::new(4, 0.5);
        assert!(!guard.record(5.0));
        assert!(!guard.record(5.0));
        assert!(!guard.record(5.0));
        assert!(guard.record(5.0));
    }

    #[test]
    fn moving_away_is_stuck() {
        let mut guard = ProgressGuard::new(3, 0.5);
        guard.record(4.0);
        guard.record(5.0);
        assert!(guard.record(6.0));
    }

    #[test]
    fn window_slides_past_old_progress() {
        let mut guard = ProgressGuard::new(3, 0.5);
        guard.record(10.0);
        guard.record(6.0);
        assert!(!guard.record(6.0)); // 10 → 6 counts
        assert!(guard.record(6.0)); // window now [6, 6, 6]
    }

    #[test]
    fn reset_clears_history() {
        let mut guard = ProgressGuard::new(2, 1.0);
        guard.record(3.0);
        assert!(guard.record(3.0));
        guard.reset();
        assert!(!guard.is_stuck());
        assert!(!guard.record(3.0));
    }
}
