//! Fixed-window login rate limiting backed by the key-value store.
//!
//! One counter per client identity under `rate_limit:<identity>`, window of
//! 60 seconds, five attempts. The store is best-effort: when it is
//! unreachable the limiter degrades open so a storage outage never blocks
//! all logins. That weakens the brute-force defense during outages and is a
//! deliberate availability tradeoff.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

use crate::store::KvStore;

use super::utils::now_unix;

pub const MAX_ATTEMPTS: u32 = 5;
pub const WINDOW_SECONDS: i64 = 60;
const RATE_LIMIT_PREFIX: &str = "rate_limit:";

/// Counter document as persisted in the store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttemptWindow {
    count: u32,
    window_start: i64,
}

impl AttemptWindow {
    const fn fresh(now: i64) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }

    const fn expired(&self, now: i64, window_seconds: i64) -> bool {
        now - self.window_start > window_seconds
    }
}

/// Outcome of a rate-limit check; `reset_at` is the unix second the current
/// window ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateStatus {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: i64,
}

pub struct RateLimiter {
    store: Arc<dyn KvStore>,
    max_attempts: u32,
    window_seconds: i64,
}

impl RateLimiter {
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_limits(store, MAX_ATTEMPTS, WINDOW_SECONDS)
    }

    #[must_use]
    pub fn with_limits(store: Arc<dyn KvStore>, max_attempts: u32, window_seconds: i64) -> Self {
        Self {
            store,
            max_attempts,
            window_seconds,
        }
    }

    /// Inspect the counter for `identity` without mutating it.
    pub async fn check(&self, identity: &str) -> RateStatus {
        let now = now_unix();
        let mut window = self.load(identity, now).await;
        if window.expired(now, self.window_seconds) {
            window = AttemptWindow::fresh(now);
        }

        RateStatus {
            allowed: window.count < self.max_attempts,
            remaining: self.max_attempts.saturating_sub(window.count),
            reset_at: window.window_start + self.window_seconds,
        }
    }

    /// Record one attempt for `identity`. The counter is persisted with a
    /// TTL equal to the window so stale entries self-expire. A racing
    /// increment can under-count; acceptable for a coarse anti-brute-force
    /// control.
    pub async fn increment(&self, identity: &str) {
        let now = now_unix();
        let mut window = self.load(identity, now).await;
        if window.expired(now, self.window_seconds) {
            window = AttemptWindow {
                count: 1,
                window_start: now,
            };
        } else {
            window.count = window.count.saturating_add(1);
        }

        let value = match serde_json::to_string(&window) {
            Ok(value) => value,
            Err(err) => {
                error!("Failed to encode rate-limit counter: {err}");
                return;
            }
        };

        let key = counter_key(identity);
        let ttl = Duration::from_secs(self.window_seconds.unsigned_abs());
        if let Err(err) = self.store.put(&key, value, Some(ttl)).await {
            // Degrade open: losing an increment weakens the limit, it must
            // not fail the request.
            error!("Failed to persist rate-limit counter: {err}");
        }
    }

    async fn load(&self, identity: &str, now: i64) -> AttemptWindow {
        let key = counter_key(identity);
        match self.store.get(&key).await {
            Ok(Some(value)) => serde_json::from_str(&value).unwrap_or_else(|err| {
                error!("Discarding corrupt rate-limit counter: {err}");
                AttemptWindow::fresh(now)
            }),
            Ok(None) => AttemptWindow::fresh(now),
            Err(err) => {
                error!("Rate-limit store unavailable, allowing by default: {err}");
                AttemptWindow::fresh(now)
            }
        }
    }
}

fn counter_key(identity: &str) -> String {
    format!("{RATE_LIMIT_PREFIX}{identity}")
}
