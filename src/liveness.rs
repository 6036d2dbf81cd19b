//! Detection of a silent bus.

use std::time::{Duration, Instant};

/// Tracks the time of the last valid frame.
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    timeout: Duration,
    last_frame: Instant,
    lost: bool,
}

impl LivenessMonitor {
    /// Start monitoring at `now`, as if a frame had just been received.
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            last_frame: now,
            lost: false,
        }
    }

    /// Record a valid frame. Returns true if this ended a communication loss.
    pub fn frame_received(&mut self, now: Instant) -> bool {
        self.last_frame = now;
        core::mem::replace(&mut self.lost, false)
    }

    /// Returns true if no valid frame arrived within the timeout.
    pub fn check(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_frame) > self.timeout {
            self.lost = true;
        }
        self.lost
    }

    pub fn is_lost(&self) -> bool {
        self.lost
    }

    /// Time since the last valid frame.
    pub fn silence(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_frame)
    }
}
