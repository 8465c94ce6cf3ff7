//! Shared constants for limits, defaults and upstream endpoints
//!

/// Longest banner text accepted, in characters.
pub const MAX_TEXT_LENGTH: usize = 50;

/// Longest ASCII art accepted for image generation, in characters.
pub const MAX_ASCII_LENGTH: usize = 5000;

/// Font used when a banner request doesn't name one.
pub const DEFAULT_FONT: &str = "Standard";

/// Image generations allowed per client per window.
pub const DAILY_LIMIT: u64 = 10;

/// Rate limit window in milliseconds (24 hours).
pub const RATE_LIMIT_WINDOW_MS: u64 = 24 * 60 * 60 * 1000;

/// Key prefix for the rate limit counters.
pub const RATE_LIMIT_PREFIX: &str = "ascii-banner";

/// Most counters the in-memory rate limiter holds at once.
pub const MEMORY_LIMITER_MAX_KEYS: usize = 100_000;

/// Client key used when the request carries no forwarding headers.
pub const LOOPBACK_CLIENT_KEY: &str = "127.0.0.1";

/// Forwarded client address header.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Real client address header set by some proxies.
pub const X_REAL_IP: &str = "x-real-ip";

/// Cap on request bodies, in bytes.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Default image-capable Gemini model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp-image-generation";

/// Default Generative Language API base URL.
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default hCaptcha verification endpoint.
pub const DEFAULT_HCAPTCHA_VERIFY_URL: &str = "https://api.hcaptcha.com/siteverify";

/// hCaptcha's published test site key, which always passes in the widget.
pub const HCAPTCHA_TEST_SITE_KEY: &str = "10000000-ffff-ffff-ffff-000000000001";

/// Mime type assumed when the image service doesn't report one and sniffing fails.
pub const FALLBACK_IMAGE_MIME: &str = "image/png";
