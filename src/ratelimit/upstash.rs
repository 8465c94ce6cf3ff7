use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use super::{RateLimitDecision, RateLimitError, RateLimiter, SlidingWindow, now_ms};

/// Runs the whole window check inside Redis so concurrent requests can't race.
/// Returns the remaining quota, or -1 when the request is refused.
const SLIDING_WINDOW_SCRIPT: &str = r#"
local currentKey = KEYS[1]
local previousKey = KEYS[2]
local tokens = tonumber(ARGV[1])
local now = tonumber(ARGV[2])
local window = tonumber(ARGV[3])
local incrementBy = tonumber(ARGV[4])

local requestsInCurrentWindow = redis.call("GET", currentKey)
if requestsInCurrentWindow == false then
  requestsInCurrentWindow = 0
end
local requestsInPreviousWindow = redis.call("GET", previousKey)
if requestsInPreviousWindow == false then
  requestsInPreviousWindow = 0
end

local percentageInCurrent = (now % window) / window
requestsInPreviousWindow = math.floor((1 - percentageInCurrent) * requestsInPreviousWindow)
if requestsInPreviousWindow + requestsInCurrentWindow >= tokens then
  return -1
end

local newValue = redis.call("INCRBY", currentKey, incrementBy)
if newValue == incrementBy then
  redis.call("PEXPIRE", currentKey, window * 2 + 1000)
end
return tokens - (newValue + requestsInPreviousWindow)
"#;

#[derive(Deserialize)]
struct RestResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Sliding window backed by Upstash Redis over its REST API.
#[derive(Clone)]
pub struct UpstashRateLimiter {
    endpoint: Url,
    token: String,
    window: SlidingWindow,
    http: reqwest::Client,
}

impl std::fmt::Debug for UpstashRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstashRateLimiter")
            .field("endpoint", &self.endpoint.as_str())
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl UpstashRateLimiter {
    /// Creates a limiter talking to the REST endpoint at `url`.
    pub fn new(
        url: &str,
        token: &str,
        window: SlidingWindow,
        http: reqwest::Client,
    ) -> Result<Self, RateLimitError> {
        let endpoint = Url::parse(url.trim()).map_err(RateLimitError::InvalidUrl)?;
        Ok(Self {
            endpoint,
            token: token.trim().to_string(),
            window,
            http,
        })
    }

    /// Host of the REST endpoint, for logging.
    pub fn endpoint_host(&self) -> &str {
        self.endpoint.host_str().unwrap_or("unknown")
    }

    pub(crate) async fn check_at(
        &self,
        client_key: &str,
        now_ms: u64,
    ) -> Result<RateLimitDecision, RateLimitError> {
        let bucket = self.window.bucket(now_ms);
        let command = json!([
            "EVAL",
            SLIDING_WINDOW_SCRIPT,
            "2",
            SlidingWindow::key(client_key, bucket),
            SlidingWindow::key(client_key, bucket.saturating_sub(1)),
            self.window.limit.to_string(),
            now_ms.to_string(),
            self.window.window_ms.to_string(),
            "1",
        ]);

        debug!("Checking quota for {} in bucket {}", client_key, bucket);
        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.token)
            .json(&command)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        let parsed: Option<RestResponse> = serde_json::from_slice(&bytes).ok();
        if !status.is_success() {
            let message = parsed.and_then(|body| body.error).unwrap_or_default();
            warn!("Upstash returned {}: {}", status, message);
            return Err(RateLimitError::Status(status.as_u16()));
        }
        let parsed = parsed.ok_or_else(|| {
            RateLimitError::Store(format!(
                "unreadable response: {}",
                String::from_utf8_lossy(&bytes)
            ))
        })?;
        if let Some(error) = parsed.error {
            return Err(RateLimitError::Store(error));
        }
        let remaining = parsed
            .result
            .as_ref()
            .and_then(Value::as_i64)
            .ok_or_else(|| RateLimitError::Store("script returned no integer".to_string()))?;

        let reset = self.window.reset_at(now_ms);
        Ok(match u64::try_from(remaining) {
            Ok(remaining) => RateLimitDecision {
                allowed: true,
                remaining,
                reset,
            },
            Err(_) => RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset,
            },
        })
    }
}

#[async_trait]
impl RateLimiter for UpstashRateLimiter {
    async fn check(&self, client_key: &str) -> Result<RateLimitDecision, RateLimitError> {
        self.check_at(client_key, now_ms()).await
    }
}
