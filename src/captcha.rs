//! Captcha token verification.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::is_unset;

/// Errors from talking to the captcha service.
#[derive(Debug)]
pub enum CaptchaError {
    /// The verification URL couldn't be parsed.
    InvalidUrl(url::ParseError),
    /// The request didn't complete.
    Request(reqwest::Error),
    /// The service answered with a non-success status.
    Status(u16),
    /// The service answered with something that isn't a verification result.
    InvalidResponse(String),
}

impl std::fmt::Display for CaptchaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUrl(err) => write!(f, "Invalid captcha verification URL: {err}"),
            Self::Request(err) => write!(f, "Captcha verification request failed: {err}"),
            Self::Status(status) => write!(f, "Captcha service returned HTTP {status}"),
            Self::InvalidResponse(err) => write!(f, "Unreadable captcha response: {err}"),
        }
    }
}

impl std::error::Error for CaptchaError {}

impl From<reqwest::Error> for CaptchaError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err)
    }
}

/// Checks a captcha token handed over by the browser.
///
/// `Ok(false)` means the service rejected the token. An `Err` means no verdict could be
/// reached, and callers must not treat that as a pass.
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    /// Verifies `token`.
    async fn verify(&self, token: &str) -> Result<bool, CaptchaError>;
}

#[derive(Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// hCaptcha `siteverify` client.
#[derive(Clone, Debug)]
pub struct HCaptchaVerifier {
    secret: Option<String>,
    verify_url: Url,
    http: reqwest::Client,
}

impl HCaptchaVerifier {
    /// Creates a verifier. A missing or blank `secret` puts it in development mode, where
    /// every token passes.
    pub fn new(
        secret: Option<String>,
        verify_url: &str,
        http: reqwest::Client,
    ) -> Result<Self, CaptchaError> {
        let verify_url = Url::parse(verify_url).map_err(CaptchaError::InvalidUrl)?;
        let secret = secret.filter(|secret| !is_unset(Some(secret.as_str())));
        Ok(Self {
            secret,
            verify_url,
            http,
        })
    }

    /// True when tokens are actually checked.
    pub fn is_enforcing(&self) -> bool {
        self.secret.is_some()
    }
}

#[async_trait]
impl CaptchaVerifier for HCaptchaVerifier {
    async fn verify(&self, token: &str) -> Result<bool, CaptchaError> {
        let Some(secret) = self.secret.as_deref() else {
            warn!("HCAPTCHA_SECRET_KEY not configured, skipping captcha verification");
            return Ok(true);
        };

        debug!(
            "Verifying captcha token ({} bytes) with {}",
            token.len(),
            self.verify_url
        );
        let response = self
            .http
            .post(self.verify_url.clone())
            .form(&[("secret", secret), ("response", token)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Captcha service returned {}", status);
            return Err(CaptchaError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        let parsed: SiteVerifyResponse = serde_json::from_slice(&bytes)
            .map_err(|err| CaptchaError::InvalidResponse(err.to_string()))?;
        if !parsed.success {
            log_rejection(&parsed.error_codes);
        }
        Ok(parsed.success)
    }
}

fn log_rejection(error_codes: &[String]) {
    if error_codes.is_empty() {
        debug!("Captcha token rejected");
    } else {
        debug!("Captcha token rejected: {}", error_codes.join(", "));
    }
}
