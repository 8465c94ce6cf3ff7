//! Scripted collaborators and a request harness for the router tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header::CONTENT_TYPE};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use super::AppState;
use crate::captcha::{CaptchaError, CaptchaVerifier};
use crate::constants::{DAILY_LIMIT, HCAPTCHA_TEST_SITE_KEY};
use crate::fonts::{AVAILABLE_FONTS, BannerRenderer, FontError, GlyphRenderer};
use crate::imagegen::{ImageGenError, ImageGenerator, ImageResult};
use crate::ratelimit::{RateLimitDecision, RateLimitError, RateLimiter};

#[derive(Clone, Copy)]
enum Verdict {
    Pass,
    Reject,
    Error,
}

pub(crate) struct ScriptedCaptcha {
    verdict: Verdict,
    calls: AtomicUsize,
}

impl ScriptedCaptcha {
    fn with(verdict: Verdict) -> Self {
        Self {
            verdict,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn pass() -> Self {
        Self::with(Verdict::Pass)
    }

    pub(crate) fn reject() -> Self {
        Self::with(Verdict::Reject)
    }

    pub(crate) fn error() -> Self {
        Self::with(Verdict::Error)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptchaVerifier for ScriptedCaptcha {
    async fn verify(&self, _token: &str) -> Result<bool, CaptchaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.verdict {
            Verdict::Pass => Ok(true),
            Verdict::Reject => Ok(false),
            Verdict::Error => Err(CaptchaError::Status(503)),
        }
    }
}

pub(crate) struct ScriptedLimiter {
    decision: Option<RateLimitDecision>,
    calls: AtomicUsize,
    last_key: Mutex<Option<String>>,
}

impl ScriptedLimiter {
    pub(crate) fn decide(decision: RateLimitDecision) -> Self {
        Self {
            decision: Some(decision),
            calls: AtomicUsize::new(0),
            last_key: Mutex::new(None),
        }
    }

    pub(crate) fn allow(remaining: u64) -> Self {
        Self::decide(RateLimitDecision {
            allowed: true,
            remaining,
            reset: 1_700_000_000_000,
        })
    }

    pub(crate) fn error() -> Self {
        Self {
            decision: None,
            calls: AtomicUsize::new(0),
            last_key: Mutex::new(None),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_key(&self) -> Option<String> {
        self.last_key.lock().expect("last key lock").clone()
    }
}

#[async_trait]
impl RateLimiter for ScriptedLimiter {
    async fn check(&self, client_key: &str) -> Result<RateLimitDecision, RateLimitError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_key.lock().expect("last key lock") = Some(client_key.to_string());
        self.decision
            .ok_or_else(|| RateLimitError::Store("scripted failure".to_string()))
    }
}

pub(crate) struct CountingGenerator {
    failure: Option<fn() -> ImageGenError>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl CountingGenerator {
    pub(crate) fn succeeding() -> Self {
        Self {
            failure: None,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub(crate) fn failing(failure: fn() -> ImageGenError) -> Self {
        Self {
            failure: Some(failure),
            ..Self::succeeding()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().expect("last prompt lock").clone()
    }
}

#[async_trait]
impl ImageGenerator for CountingGenerator {
    async fn generate(&self, prompt: &str) -> Result<ImageResult, ImageGenError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().expect("last prompt lock") = Some(prompt.to_string());
        match self.failure {
            Some(failure) => Err(failure()),
            None => Ok(ImageResult {
                image_data: "aW1hZ2U=".to_string(),
                mime_type: "image/png".to_string(),
            }),
        }
    }
}

/// Lists the real fonts but can't render any of them.
pub(crate) struct BrokenRenderer;

impl BannerRenderer for BrokenRenderer {
    fn available_fonts(&self) -> &[&'static str] {
        &AVAILABLE_FONTS
    }

    fn render(&self, _text: &str, font: &str) -> Result<String, FontError> {
        Err(FontError::UnknownFont(font.to_string()))
    }
}

pub(crate) struct Harness {
    pub(crate) renderer: Arc<dyn BannerRenderer>,
    pub(crate) captcha: Arc<ScriptedCaptcha>,
    pub(crate) limiter: Arc<ScriptedLimiter>,
    pub(crate) generator: Arc<CountingGenerator>,
}

impl Default for Harness {
    fn default() -> Self {
        Self {
            renderer: Arc::new(GlyphRenderer),
            captcha: Arc::new(ScriptedCaptcha::pass()),
            limiter: Arc::new(ScriptedLimiter::allow(DAILY_LIMIT)),
            generator: Arc::new(CountingGenerator::succeeding()),
        }
    }
}

impl Harness {
    pub(crate) fn with_captcha(self, captcha: ScriptedCaptcha) -> Self {
        Self {
            captcha: Arc::new(captcha),
            ..self
        }
    }

    pub(crate) fn with_limiter(self, limiter: ScriptedLimiter) -> Self {
        Self {
            limiter: Arc::new(limiter),
            ..self
        }
    }

    pub(crate) fn state(&self) -> AppState {
        AppState::new(
            self.renderer.clone(),
            self.captcha.clone(),
            self.limiter.clone(),
            self.generator.clone(),
            HCAPTCHA_TEST_SITE_KEY,
        )
    }

    pub(crate) async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = super::app(self.state())
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    pub(crate) async fn get(&self, uri: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .expect("build request");
        self.send(request).await
    }

    async fn post_request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = self.send(request).await;
        let json = serde_json::from_str(&body).unwrap_or(Value::Null);
        (status, json)
    }

    pub(crate) async fn post_raw(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("build request");
        self.post_request(request).await
    }

    pub(crate) async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.post_raw(uri, &body.to_string()).await
    }

    pub(crate) async fn post_with_header(
        &self,
        uri: &str,
        body: Value,
        (name, value): (&str, &str),
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .header(name, value)
            .body(Body::from(body.to_string()))
            .expect("build request");
        self.post_request(request).await
    }
}
