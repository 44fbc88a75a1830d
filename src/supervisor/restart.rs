use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Counts abnormal worker exits inside a sliding window.
pub struct RestartTracker {
    restarts: VecDeque<Instant>,
    max_restarts: u32,
    window: Duration,
}

impl RestartTracker {
    pub fn new(max_restarts: u32, window: Duration) -> Self {
        Self {
            restarts: VecDeque::new(),
            max_restarts,
            window,
        }
    }

    /// Record a restart; true once the limit is exceeded.
    pub fn record_restart(&mut self) -> bool {
        self.record_restart_at(Instant::now())
    }

    pub(crate) fn record_restart_at(&mut self, now: Instant) -> bool {
        while let Some(front) = self.restarts.front() {
            if now.saturating_duration_since(*front) > self.window {
                self.restarts.pop_front();
            } else {
                break;
            }
        }

        self.restarts.push_back(now);
        self.restarts.len() as u32 > self.max_restarts
    }

    pub fn count(&self) -> u32 {
        self.restarts.len() as u32
    }
}
