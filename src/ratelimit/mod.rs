//! Per-client quota on image generations.
//!
//! Every limiter applies the same sliding window: requests are counted in fixed buckets
//! one window long, and the previous bucket's count is weighted by how much of it still
//! overlaps the trailing window. Where the counts live is up to the implementation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::{CliOptions, RateLimitFallback};
use crate::config::is_unset;
use crate::constants::{DAILY_LIMIT, RATE_LIMIT_PREFIX, RATE_LIMIT_WINDOW_MS};

mod fallback;
mod memory;
mod upstash;

pub use fallback::{FailClosedRateLimiter, FailOpenRateLimiter};
pub use memory::MemoryRateLimiter;
pub use upstash::UpstashRateLimiter;

/// Outcome of a quota check.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RateLimitDecision {
    /// Whether the request may go ahead.
    pub allowed: bool,
    /// Requests left in the window after this one.
    pub remaining: u64,
    /// Epoch milliseconds when the current bucket ends.
    pub reset: u64,
}

/// Errors from the counter store.
#[derive(Debug)]
pub enum RateLimitError {
    /// The store URL couldn't be parsed.
    InvalidUrl(url::ParseError),
    /// The request didn't complete.
    Request(reqwest::Error),
    /// The store answered with a non-success status.
    Status(u16),
    /// The store reported an error, or answered with something unexpected.
    Store(String),
}

impl std::fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUrl(err) => write!(f, "Invalid counter store URL: {err}"),
            Self::Request(err) => write!(f, "Counter store request failed: {err}"),
            Self::Status(status) => write!(f, "Counter store returned HTTP {status}"),
            Self::Store(message) => write!(f, "Counter store error: {message}"),
        }
    }
}

impl std::error::Error for RateLimitError {}

impl From<reqwest::Error> for RateLimitError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err)
    }
}

/// Counts requests per client key.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Records a request for `client_key` if it fits in the quota, and reports the
    /// decision.
    async fn check(&self, client_key: &str) -> Result<RateLimitDecision, RateLimitError>;
}

/// Quota and window length.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SlidingWindow {
    /// Requests allowed per window.
    pub limit: u64,
    /// Window length in milliseconds.
    pub window_ms: u64,
}

impl Default for SlidingWindow {
    fn default() -> Self {
        Self {
            limit: DAILY_LIMIT,
            window_ms: RATE_LIMIT_WINDOW_MS,
        }
    }
}

impl SlidingWindow {
    /// Index of the bucket `now_ms` falls in.
    pub fn bucket(&self, now_ms: u64) -> u64 {
        now_ms / self.window_ms.max(1)
    }

    /// Epoch milliseconds when the bucket holding `now_ms` ends.
    pub fn reset_at(&self, now_ms: u64) -> u64 {
        (self.bucket(now_ms) + 1).saturating_mul(self.window_ms)
    }

    /// The previous bucket's count, scaled by the part of it still inside the window.
    pub fn weighted_previous(&self, now_ms: u64, previous: u64) -> u64 {
        let window = self.window_ms.max(1);
        let left = window - now_ms % window;
        let scaled = u128::from(previous) * u128::from(left) / u128::from(window);
        u64::try_from(scaled).unwrap_or(previous)
    }

    /// Applies the window to the stored counts. An allowed decision means the caller
    /// increments the current bucket.
    pub fn evaluate(&self, now_ms: u64, previous: u64, current: u64) -> RateLimitDecision {
        let weighted = self.weighted_previous(now_ms, previous);
        let reset = self.reset_at(now_ms);
        if weighted.saturating_add(current) >= self.limit {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset,
            };
        }
        RateLimitDecision {
            allowed: true,
            remaining: self.limit.saturating_sub(current + 1 + weighted),
            reset,
        }
    }

    /// Counter key for `client_key` in `bucket`.
    pub fn key(client_key: &str, bucket: u64) -> String {
        format!("{RATE_LIMIT_PREFIX}:{client_key}:{bucket}")
    }
}

pub(crate) fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}

/// Picks the limiter for this deployment: Upstash when both its URL and token are set,
/// otherwise the configured fallback.
pub fn build_rate_limiter(
    options: &CliOptions,
    http: reqwest::Client,
) -> Result<Arc<dyn RateLimiter>, RateLimitError> {
    let window = SlidingWindow::default();
    match (
        options.upstash_redis_rest_url.as_deref(),
        options.upstash_redis_rest_token.as_deref(),
    ) {
        (Some(url), Some(token)) if !is_unset(Some(url)) && !is_unset(Some(token)) => {
            let limiter = UpstashRateLimiter::new(url, token, window, http)?;
            info!("Rate limiting with Upstash at {}", limiter.endpoint_host());
            Ok(Arc::new(limiter))
        }
        _ => Ok(match options.rate_limit_fallback {
            RateLimitFallback::Open => {
                warn!("Upstash not configured, rate limiting is disabled (fail open)");
                Arc::new(FailOpenRateLimiter::new(window))
            }
            RateLimitFallback::Closed => {
                warn!("Upstash not configured, refusing all image generations (fail closed)");
                Arc::new(FailClosedRateLimiter::new(window))
            }
            RateLimitFallback::Memory => {
                warn!("Upstash not configured, counting requests in process memory");
                Arc::new(MemoryRateLimiter::new(window))
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    const DAY: u64 = RATE_LIMIT_WINDOW_MS;

    #[test]
    fn fresh_client_gets_the_full_quota_less_one() {
        let window = SlidingWindow::default();
        let decision = window.evaluate(5 * DAY, 0, 0);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, DAILY_LIMIT - 1);
        assert_eq!(decision.reset, 6 * DAY);
    }

    #[test]
    fn full_current_bucket_denies() {
        let window = SlidingWindow::default();
        let decision = window.evaluate(5 * DAY + 10, 0, DAILY_LIMIT);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn previous_bucket_fades_out_over_the_window() {
        let window = SlidingWindow::default();
        // Start of the bucket: all of yesterday still counts.
        assert_eq!(window.weighted_previous(5 * DAY, 10), 10);
        // Half way: half of it does.
        assert_eq!(window.weighted_previous(5 * DAY + DAY / 2, 10), 5);
        // Floor, never round up.
        assert_eq!(window.weighted_previous(5 * DAY + DAY / 2, 3), 1);

        assert!(!window.evaluate(5 * DAY, 10, 0).allowed);
        assert!(window.evaluate(5 * DAY + 1, 10, 0).allowed);
        let later = window.evaluate(5 * DAY + DAY / 2, 10, 2);
        assert!(later.allowed);
        assert_eq!(later.remaining, 2);
    }

    #[test]
    fn keys_carry_prefix_client_and_bucket() {
        assert_eq!(
            SlidingWindow::key("203.0.113.9", 20000),
            "ascii-banner:203.0.113.9:20000"
        );
    }

    fn options(args: &[&str]) -> CliOptions {
        let mut argv = vec!["bannerart"];
        argv.extend_from_slice(args);
        CliOptions::try_parse_from(argv).expect("parse options")
    }

    #[tokio::test]
    async fn fallback_follows_configuration() {
        let http = crate::test_support::client();

        let closed = build_rate_limiter(&options(&["--rate-limit-fallback", "closed"]), http.clone())
            .expect("closed limiter");
        assert!(!closed.check("a").await.expect("check").allowed);

        let open = build_rate_limiter(&options(&["--rate-limit-fallback", "open"]), http.clone())
            .expect("open limiter");
        let decision = open.check("a").await.expect("check");
        assert!(decision.allowed);
        assert_eq!(decision.remaining, DAILY_LIMIT);

        // Only a URL isn't enough to use the store.
        let memory = build_rate_limiter(
            &options(&["--upstash-redis-rest-url", "https://example.upstash.io"]),
            http,
        )
        .expect("memory limiter");
        assert_eq!(
            memory.check("a").await.expect("check").remaining,
            DAILY_LIMIT - 1
        );
    }
}
