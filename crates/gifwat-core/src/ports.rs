//! Event-source ports injected into the host loop.
//!
//! A host acquires each source with `subscribe()` and holds the returned
//! [`Subscription`] for as long as it wants events; dropping the guard
//! releases the source.

use std::time::Duration;

#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new<F: FnOnce() + 'static>(release: F) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription with nothing to release.
    pub fn noop() -> Self {
        Self { release: None }
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(f) = self.release.take() {
            f();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

/// A pollable source of host events (keys, focus changes, ...).
pub trait EventPort {
    type Event;

    fn subscribe(&mut self) -> crate::Result<Subscription>;
    fn poll(&mut self, timeout: Duration) -> crate::Result<Option<Self::Event>>;
}

/// Window-level actions the controller may request from the host.
pub trait WindowPort {
    fn hide(&mut self) -> crate::Result<()>;
    fn focus_search(&mut self) -> crate::Result<()>;
}
