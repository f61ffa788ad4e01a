//! Two-step delete gesture: arm, then confirm inside the window.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// First invocation; nothing deleted yet
    Armed,
    /// Second invocation inside the window; caller issues the delete
    Confirmed,
}

#[derive(Debug, Clone)]
pub struct DeleteConfirmation {
    window: Duration,
    armed_at: Option<Instant>,
}

impl DeleteConfirmation {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            armed_at: None,
        }
    }

    pub fn is_confirming(&self) -> bool {
        self.armed_at.is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.armed_at.map(|t| t + self.window)
    }

    pub fn invoke(&mut self, now: Instant) -> ConfirmOutcome {
        self.poll(now);
        if self.armed_at.take().is_some() {
            ConfirmOutcome::Confirmed
        } else {
            self.armed_at = Some(now);
            ConfirmOutcome::Armed
        }
    }

    /// Auto-revert once the window has passed. Returns true when it reverted.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.armed_at {
            Some(at) if now.saturating_duration_since(at) >= self.window => {
                self.armed_at = None;
                true
            }
            _ => false,
        }
    }
}
