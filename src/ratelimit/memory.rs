use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{RateLimitDecision, RateLimitError, RateLimiter, SlidingWindow, now_ms};
use crate::constants::MEMORY_LIMITER_MAX_KEYS;

/// Sliding window over counters held in this process.
///
/// Counts aren't shared between instances and are lost on restart.
///
/// Client keys come from forwarding headers, so a caller can mint a new one per
/// request. The map is capped at `max_keys` counters: once it's full, counters from
/// the previous bucket are dropped to make room, and if that isn't enough, clients
/// without a counter are refused until the bucket rolls over.
#[derive(Debug)]
pub struct MemoryRateLimiter {
    window: SlidingWindow,
    max_keys: usize,
    counters: Mutex<HashMap<String, u64>>,
}

impl Default for MemoryRateLimiter {
    fn default() -> Self {
        Self::new(SlidingWindow::default())
    }
}

fn key_bucket(key: &str) -> Option<u64> {
    key.rsplit_once(':')
        .and_then(|(_, bucket)| bucket.parse::<u64>().ok())
}

impl MemoryRateLimiter {
    /// Creates an empty limiter holding at most [MEMORY_LIMITER_MAX_KEYS] counters.
    pub fn new(window: SlidingWindow) -> Self {
        Self::with_max_keys(window, MEMORY_LIMITER_MAX_KEYS)
    }

    /// Creates an empty limiter holding at most `max_keys` counters.
    pub fn with_max_keys(window: SlidingWindow, max_keys: usize) -> Self {
        Self {
            window,
            max_keys,
            counters: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) async fn check_at(&self, client_key: &str, now_ms: u64) -> RateLimitDecision {
        let bucket = self.window.bucket(now_ms);
        let current_key = SlidingWindow::key(client_key, bucket);
        let previous_key = SlidingWindow::key(client_key, bucket.saturating_sub(1));

        let mut counters = self.counters.lock().await;
        // Anything older than the previous bucket no longer counts.
        counters.retain(|key, _| key_bucket(key).is_some_and(|kept| kept + 1 >= bucket));

        if !counters.contains_key(&current_key) && counters.len() >= self.max_keys {
            counters.retain(|key, _| key_bucket(key) == Some(bucket));
            if counters.len() >= self.max_keys {
                warn!(
                    "In-memory rate limiter is full ({} counters), refusing {}",
                    counters.len(),
                    client_key
                );
                return RateLimitDecision {
                    allowed: false,
                    remaining: 0,
                    reset: self.window.reset_at(now_ms),
                };
            }
        }

        let current = counters.get(&current_key).copied().unwrap_or_default();
        let previous = if bucket == 0 {
            0
        } else {
            counters.get(&previous_key).copied().unwrap_or_default()
        };
        let decision = self.window.evaluate(now_ms, previous, current);
        if decision.allowed {
            *counters.entry(current_key).or_default() += 1;
        }
        debug!(
            "In-memory quota for {}: allowed={} remaining={}",
            client_key, decision.allowed, decision.remaining
        );
        decision
    }
}

#[async_trait]
impl RateLimiter for MemoryRateLimiter {
    async fn check(&self, client_key: &str) -> Result<RateLimitDecision, RateLimitError> {
        Ok(self.check_at(client_key, now_ms()).await)
    }
}
