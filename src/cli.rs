//! CLI parser
use clap::{Parser, ValueEnum};
use std::num::NonZeroU16;
use std::time::Duration;

use crate::constants::{
    DEFAULT_GEMINI_API_BASE, DEFAULT_GEMINI_MODEL, DEFAULT_HCAPTCHA_VERIFY_URL,
    HCAPTCHA_TEST_SITE_KEY,
};

/// What the rate limiter does when no counter store is configured.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum RateLimitFallback {
    /// Allow every request and report a full quota. Disables abuse protection.
    Open,
    /// Refuse every request.
    Closed,
    /// Count requests in process memory. Not shared between instances.
    #[default]
    Memory,
}

impl std::fmt::Display for RateLimitFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Parser, Debug, Clone)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "BANNERART_DEBUG")]
    /// Enable debug logging. Env: BANNERART_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "9000", env = "BANNERART_PORT")]
    /// http listener, defaults to `9000`.
    /// Env: BANNERART_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "BANNERART_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: BANNERART_LISTEN_ADDRESS
    pub listen_address: String,

    #[clap(long, env = "GOOGLE_AI_API_KEY", hide_env_values = true)]
    /// Google AI API key used for image generation.
    /// Env: GOOGLE_AI_API_KEY
    pub google_ai_api_key: Option<String>,
    #[clap(long, default_value = DEFAULT_GEMINI_MODEL, env = "BANNERART_GEMINI_MODEL")]
    /// Image-capable Gemini model.
    /// Env: BANNERART_GEMINI_MODEL
    pub gemini_model: String,
    #[clap(long, default_value = DEFAULT_GEMINI_API_BASE, env = "BANNERART_GEMINI_API_BASE")]
    /// Base URL of the Generative Language API.
    /// Env: BANNERART_GEMINI_API_BASE
    pub gemini_api_base: String,

    #[clap(long, env = "UPSTASH_REDIS_REST_URL")]
    /// Upstash Redis REST endpoint for the rate limit counters.
    /// Env: UPSTASH_REDIS_REST_URL
    pub upstash_redis_rest_url: Option<String>,
    #[clap(long, env = "UPSTASH_REDIS_REST_TOKEN", hide_env_values = true)]
    /// Upstash Redis REST token.
    /// Env: UPSTASH_REDIS_REST_TOKEN
    pub upstash_redis_rest_token: Option<String>,
    #[clap(
        long,
        value_enum,
        default_value_t = RateLimitFallback::Memory,
        env = "BANNERART_RATE_LIMIT_FALLBACK"
    )]
    /// Rate limit policy when Upstash is not configured.
    /// Env: BANNERART_RATE_LIMIT_FALLBACK
    pub rate_limit_fallback: RateLimitFallback,

    #[clap(long, env = "HCAPTCHA_SECRET_KEY", hide_env_values = true)]
    /// hCaptcha secret. Without it every captcha token is accepted.
    /// Env: HCAPTCHA_SECRET_KEY
    pub hcaptcha_secret_key: Option<String>,
    #[clap(long, default_value = HCAPTCHA_TEST_SITE_KEY, env = "HCAPTCHA_SITE_KEY")]
    /// hCaptcha site key handed to the browser.
    /// Env: HCAPTCHA_SITE_KEY
    pub hcaptcha_site_key: String,
    #[clap(
        long,
        default_value = DEFAULT_HCAPTCHA_VERIFY_URL,
        env = "BANNERART_HCAPTCHA_VERIFY_URL"
    )]
    /// hCaptcha siteverify endpoint.
    /// Env: BANNERART_HCAPTCHA_VERIFY_URL
    pub hcaptcha_verify_url: String,

    #[clap(long, default_value = "60", env = "BANNERART_UPSTREAM_TIMEOUT_SECS")]
    /// Timeout for captcha, counter store and image generation calls.
    /// Env: BANNERART_UPSTREAM_TIMEOUT_SECS
    pub upstream_timeout_secs: u64,
}

impl CliOptions {
    /// The upstream timeout as a [Duration].
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs.max(1))
    }
}
