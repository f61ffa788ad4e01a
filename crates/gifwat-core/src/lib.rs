//! gifwat-core: gif model, backend port, and the client-side interaction core

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

pub mod app;
pub mod backend;
pub mod clipboard;
pub mod confirm;
pub mod copy_feedback;
pub mod error;
pub mod filter;
pub mod image_load;
pub mod nav;
pub mod ports;
pub mod store;

pub use app::{App, Effect};
pub use backend::{Backend, MemBackend};
pub use error::{Error, Result};
pub use filter::{filter_gifs, parse_tags};
pub use nav::{KeyboardNavigator, NavKey};
pub use store::{Command, GifCollectionStore, Reply, Request};

pub type GifId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Gif {
    pub id: GifId,
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created_at: u64,
}

impl Gif {
    pub fn new<S: Into<String>>(id: GifId, url: S, tags: Vec<String>) -> Self {
        Self {
            id,
            url: url.into(),
            tags,
            created_at: time::OffsetDateTime::now_utc().unix_timestamp().max(0) as u64,
        }
    }
}

/// Tunables for the interaction core. Every timer in the core derives from these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Cards per grid row
    pub columns: usize,
    /// Delete confirmation window
    pub confirm_ms: u64,
    /// How long a copied card keeps its "copied" indicator
    pub copied_ms: u64,
    /// Linear backoff unit for image retries
    pub retry_base_ms: u64,
    pub max_retries: u32,
    /// Rows beyond the viewport that still count as near-visible
    pub proximity_rows: usize,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            columns: 2,
            confirm_ms: 3000,
            copied_ms: 1500,
            retry_base_ms: 1000,
            max_retries: image_load::MAX_RETRIES,
            proximity_rows: 1,
        }
    }
}

impl InteractionConfig {
    pub fn confirm_window(&self) -> Duration {
        Duration::from_millis(self.confirm_ms)
    }

    pub fn copied_hold(&self) -> Duration {
        Duration::from_millis(self.copied_ms)
    }

    pub fn retry_policy(&self) -> image_load::RetryPolicy {
        image_load::RetryPolicy {
            max_retries: self.max_retries,
            backoff_base: Duration::from_millis(self.retry_base_ms),
        }
    }
}

static ID_SEQ: AtomicU16 = AtomicU16::new(0);

/// Hex epoch nanos plus a wrapping sequence so ids minted in the same tick stay distinct.
pub fn gen_id() -> GifId {
    let ns = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
    let seq = ID_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{:x}{:04x}", ns, seq)
}
