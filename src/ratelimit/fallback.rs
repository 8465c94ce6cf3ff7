use async_trait::async_trait;

use super::{RateLimitDecision, RateLimitError, RateLimiter, SlidingWindow, now_ms};

/// Allows everything and reports a full quota. Only for deployments without abuse
/// protection, such as local development.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailOpenRateLimiter {
    window: SlidingWindow,
}

impl FailOpenRateLimiter {
    /// Creates the limiter.
    pub fn new(window: SlidingWindow) -> Self {
        Self { window }
    }
}

#[async_trait]
impl RateLimiter for FailOpenRateLimiter {
    async fn check(&self, _client_key: &str) -> Result<RateLimitDecision, RateLimitError> {
        Ok(RateLimitDecision {
            allowed: true,
            remaining: self.window.limit,
            reset: now_ms().saturating_add(self.window.window_ms),
        })
    }
}

/// Refuses everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailClosedRateLimiter {
    window: SlidingWindow,
}

impl FailClosedRateLimiter {
    /// Creates the limiter.
    pub fn new(window: SlidingWindow) -> Self {
        Self { window }
    }
}

#[async_trait]
impl RateLimiter for FailClosedRateLimiter {
    async fn check(&self, _client_key: &str) -> Result<RateLimitDecision, RateLimitError> {
        Ok(RateLimitDecision {
            allowed: false,
            remaining: 0,
            reset: now_ms().saturating_add(self.window.window_ms),
        })
    }
}
