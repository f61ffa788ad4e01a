//! Per-card image loading: visibility gate, bounded linear-backoff retry, terminal failure.
//!
//! The controller never fetches anything itself. It hands out [`LoadAttempt`]s
//! for the host's media pipeline and reacts to the loaded/failed signals that
//! come back. Each attempt carries a fresh sequence number so the host can
//! bypass any cached failure, and so late signals from superseded attempts
//! are ignored.

use std::time::{Duration, Instant};

pub const MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            backoff_base: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry_count + 1`: 1x, 2x, 3x the base.
    pub fn delay(&self, retry_count: u32) -> Duration {
        self.backoff_base * (retry_count + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Not near the viewport yet; placeholder only
    Unobserved,
    Loading,
    Loaded,
    /// Waiting out a backoff delay before the next attempt
    Retrying,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadAttempt {
    pub url: String,
    pub seq: u32,
}

impl LoadAttempt {
    /// Url with a cache-busting marker for every attempt after the first.
    pub fn fetch_url(&self) -> String {
        if self.seq == 0 {
            return self.url.clone();
        }
        let sep = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}retry={}", self.url, sep, self.seq)
    }
}

/// Rewrite a leading `http://` (any case) to `https://`.
pub fn secure_url(url: &str) -> String {
    const INSECURE: &str = "http://";
    match url.get(..INSECURE.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(INSECURE) => {
            format!("https://{}", &url[INSECURE.len()..])
        }
        _ => url.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct ImageLoadController {
    url: String,
    policy: RetryPolicy,
    status: LoadStatus,
    retry_count: u32,
    retry_at: Option<Instant>,
    seq: u32,
}

impl ImageLoadController {
    pub fn new(url: &str, policy: RetryPolicy) -> Self {
        Self {
            url: secure_url(url),
            policy,
            status: LoadStatus::Unobserved,
            retry_count: 0,
            retry_at: None,
            seq: 0,
        }
    }

    pub fn status(&self) -> LoadStatus {
        self.status
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.retry_at
    }

    /// Visibility gate. Entering proximity arms the first attempt; leaving it
    /// drops everything (pending retry included) so re-entry starts over.
    pub fn set_visible(&mut self, visible: bool) -> Option<LoadAttempt> {
        match (visible, self.status) {
            (true, LoadStatus::Unobserved) => {
                self.retry_count = 0;
                Some(self.begin_attempt())
            }
            (false, LoadStatus::Unobserved) | (true, _) => None,
            (false, _) => {
                self.status = LoadStatus::Unobserved;
                self.retry_at = None;
                None
            }
        }
    }

    pub fn on_loaded(&mut self, seq: u32) {
        if self.is_current(seq) {
            self.status = LoadStatus::Loaded;
        }
    }

    pub fn on_failed(&mut self, seq: u32, now: Instant) {
        if !self.is_current(seq) {
            return;
        }
        if self.retry_count < self.policy.max_retries {
            self.status = LoadStatus::Retrying;
            self.retry_at = Some(now + self.policy.delay(self.retry_count));
        } else {
            self.status = LoadStatus::Failed;
            tracing::debug!(url = %self.url, retries = self.retry_count, "image failed permanently");
        }
    }

    /// Fires a due retry.
    pub fn poll(&mut self, now: Instant) -> Option<LoadAttempt> {
        match self.retry_at {
            Some(at) if now >= at && self.status == LoadStatus::Retrying => {
                self.retry_at = None;
                self.retry_count += 1;
                Some(self.begin_attempt())
            }
            _ => None,
        }
    }

    fn begin_attempt(&mut self) -> LoadAttempt {
        self.status = LoadStatus::Loading;
        self.seq += 1;
        LoadAttempt {
            url: self.url.clone(),
            seq: self.seq - 1,
        }
    }

    fn is_current(&self, seq: u32) -> bool {
        self.status == LoadStatus::Loading && self.seq.checked_sub(1) == Some(seq)
    }
}
