//! Single-slot "copied" indicator for the whole collection.

use crate::GifId;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Marked {
    id: GifId,
    ticket: u64,
    until: Instant,
}

#[derive(Debug, Clone)]
pub struct CopyFeedback {
    hold: Duration,
    marked: Option<Marked>,
}

impl CopyFeedback {
    pub fn new(hold: Duration) -> Self {
        Self { hold, marked: None }
    }

    /// Record a successful copy. `ticket` is the request sequence number; a
    /// success for an older request than the one currently shown is dropped,
    /// so the most recently requested successful copy always wins.
    pub fn mark(&mut self, id: &str, ticket: u64, now: Instant) -> bool {
        if let Some(m) = &self.marked {
            if ticket < m.ticket {
                return false;
            }
        }
        self.marked = Some(Marked {
            id: id.to_string(),
            ticket,
            until: now + self.hold,
        });
        true
    }

    pub fn copied_id(&self) -> Option<&str> {
        self.marked.as_ref().map(|m| m.id.as_str())
    }

    pub fn is_copied(&self, id: &str) -> bool {
        self.copied_id() == Some(id)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.marked.as_ref().map(|m| m.until)
    }

    /// Clears an expired indicator; returns the id that stopped showing.
    pub fn poll(&mut self, now: Instant) -> Option<GifId> {
        match &self.marked {
            Some(m) if now >= m.until => self.marked.take().map(|m| m.id),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.marked = None;
    }
}
