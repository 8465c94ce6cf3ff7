//! Config handling

use std::time::Duration;

use tracing::log::LevelFilter;
use tracing::warn;

use crate::cli::CliOptions;
use crate::constants::HCAPTCHA_TEST_SITE_KEY;

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        logger = logger
            .with_module_level("tracing", LevelFilter::Warn)
            .with_module_level("rustls", LevelFilter::Info)
            .with_module_level("hyper_util", LevelFilter::Info)
            .with_module_level("reqwest", LevelFilter::Info)
            .with_module_level("h2", LevelFilter::Info);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

/// Builds the shared HTTP client for upstream calls, bounded by `timeout`.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// A production setting that isn't configured.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MissingSetting {
    /// Environment variable that supplies it.
    pub env: &'static str,
    /// What the service does without it.
    pub consequence: String,
}

/// Lists the production settings that are absent, with what happens instead.
pub fn missing_settings(cli: &CliOptions) -> Vec<MissingSetting> {
    let mut missing = Vec::new();
    if is_unset(cli.google_ai_api_key.as_deref()) {
        missing.push(MissingSetting {
            env: "GOOGLE_AI_API_KEY",
            consequence: "image generation requests will fail".to_string(),
        });
    }
    for (env, value) in [
        ("UPSTASH_REDIS_REST_URL", cli.upstash_redis_rest_url.as_deref()),
        ("UPSTASH_REDIS_REST_TOKEN", cli.upstash_redis_rest_token.as_deref()),
    ] {
        if is_unset(value) {
            missing.push(MissingSetting {
                env,
                consequence: format!(
                    "rate limiting falls back to the '{}' policy",
                    cli.rate_limit_fallback
                ),
            });
        }
    }
    if is_unset(cli.hcaptcha_secret_key.as_deref()) {
        missing.push(MissingSetting {
            env: "HCAPTCHA_SECRET_KEY",
            consequence: "captcha verification is skipped".to_string(),
        });
    }
    if cli.hcaptcha_site_key == HCAPTCHA_TEST_SITE_KEY {
        missing.push(MissingSetting {
            env: "HCAPTCHA_SITE_KEY",
            consequence: "the page uses the hCaptcha test site key".to_string(),
        });
    }
    missing
}

/// Logs a warning for every missing production setting. Never fails.
pub fn audit_settings(cli: &CliOptions) {
    for setting in missing_settings(cli) {
        warn!("{} is not set: {}", setting.env, setting.consequence);
    }
}

pub(crate) fn is_unset(value: Option<&str>) -> bool {
    value.map(str::trim).is_none_or(str::is_empty)
}
