//! Single versus double select on table cells.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Click {
    row: usize,
    col: usize,
    at: Instant,
}

/// Detects a second select of the same cell within a time window.
///
/// Time is passed in by the caller so the gesture can be replayed in tests.
#[derive(Debug, Clone)]
pub struct ClickTracker {
    window: Duration,
    last: Option<Click>,
}

impl ClickTracker {
    /// Create a tracker with the double-select window.
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Record a select of `(row, col)` at `now`; returns whether it completes a double select.
    pub fn register(&mut self, row: usize, col: usize, now: Instant) -> bool {
        let double = matches!(
            self.last,
            Some(last) if last.row == row
                && last.col == col
                && now.saturating_duration_since(last.at) <= self.window
        );
        self.last = if double {
            None
        } else {
            Some(Click { row, col, at: now })
        };
        double
    }

    /// Forget the pending first select.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

impl Default for ClickTracker {
    fn default() -> Self {
        Self::new(Duration::from_millis(300))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_select_inside_window_is_double() {
        let mut clicks = ClickTracker::default();
        let t0 = Instant::now();
        assert!(!clicks.register(1, 2, t0));
        assert!(clicks.register(1, 2, t0 + Duration::from_millis(200)));
        // A third select starts over.
        assert!(!clicks.register(1, 2, t0 + Duration::from_millis(250)));
    }

    #[test]
    fn slow_or_different_cells_are_single() {
        let mut clicks = ClickTracker::new(Duration::from_millis(300));
        let t0 = Instant::now();
        clicks.register(0, 0, t0);
        assert!(!clicks.register(0, 0, t0 + Duration::from_millis(400)));
        assert!(!clicks.register(0, 1, t0 + Duration::from_millis(450)));
    }
}
