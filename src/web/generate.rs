use super::middleware::ClientKey;
use super::prelude::*;
use crate::constants::MAX_ASCII_LENGTH;
use crate::imagegen::GENERIC_FAILURE_MESSAGE;
use crate::prompt::{ArtStyle, build_prompt, style_keys};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateRequest {
    #[serde(default)]
    ascii: Option<String>,
    #[serde(default)]
    style: Option<String>,
    #[serde(default)]
    captcha_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateResponse {
    image_url: String,
    remaining: u64,
}

/// Non-empty after trimming, or None.
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

/// handles POST /api/generate
///
/// Every check runs in a fixed order and the first one that fails decides the
/// response. Nothing external is called until the input is known to be valid.
pub(crate) async fn generate_handler(
    State(state): State<AppState>,
    client: ClientKey,
    body: Bytes,
) -> Result<Json<GenerateResponse>, ApiError> {
    let request: GenerateRequest = serde_json::from_slice(&body).map_err(|err| {
        debug!("Unparseable generate request: {}", err);
        ApiError::InvalidJson
    })?;

    let ascii = present(request.ascii.as_deref()).ok_or(ApiError::AsciiRequired)?;
    if ascii.chars().count() > MAX_ASCII_LENGTH {
        return Err(ApiError::AsciiTooLong);
    }

    let style_key = request
        .style
        .as_deref()
        .filter(|style| !style.is_empty())
        .ok_or(ApiError::StyleRequired)?;
    let style: ArtStyle = style_key.parse().map_err(|_| {
        ApiError::InvalidStyle(style_keys().into_iter().map(str::to_string).collect())
    })?;

    let token = present(request.captcha_token.as_deref()).ok_or(ApiError::CaptchaRequired)?;
    match state.captcha.verify(token).await {
        Ok(true) => {}
        Ok(false) => return Err(ApiError::CaptchaFailed),
        Err(err) => {
            warn!("Captcha verification errored, treating as failed: {}", err);
            return Err(ApiError::CaptchaFailed);
        }
    }

    let decision = state.limiter.check(&client.0).await.map_err(|err| {
        error!("Rate limit check failed for {}: {}", client.0, err);
        ApiError::GenerationFailed(GENERIC_FAILURE_MESSAGE.to_string())
    })?;
    info!(
        "Rate limit for {}: allowed={} remaining={}",
        client.0, decision.allowed, decision.remaining
    );
    if !decision.allowed {
        return Err(ApiError::RateLimited {
            reset: decision.reset,
        });
    }

    let prompt = build_prompt(ascii, style);
    info!(
        "Generating {} image for {} chars of ascii, prompt is {} chars",
        style,
        ascii.chars().count(),
        prompt.chars().count()
    );
    let image = state.generator.generate(&prompt).await.map_err(|err| {
        error!("Image generation failed: {}", err);
        ApiError::GenerationFailed(err.client_message())
    })?;

    Ok(Json(GenerateResponse {
        image_url: image.data_uri(),
        remaining: decision.remaining.saturating_sub(1),
    }))
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use crate::imagegen::ImageGenError;
    use crate::prompt::{LEGIBILITY_REQUIREMENT, available_styles};
    use crate::ratelimit::RateLimitDecision;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::Arc;

    fn valid_body() -> serde_json::Value {
        json!({"ascii": "HELLO", "style": "watercolor", "captchaToken": "token"})
    }

    #[tokio::test]
    async fn success_returns_a_data_uri_and_decrements_remaining() {
        let harness = Harness::default().with_limiter(ScriptedLimiter::allow(7));
        let (status, body) = harness.post("/api/generate", valid_body()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["imageUrl"], "data:image/png;base64,aW1hZ2U=");
        assert_eq!(body["remaining"], 6);
        assert_eq!(harness.generator.calls(), 1);
    }

    #[tokio::test]
    async fn remaining_never_goes_negative() {
        let harness = Harness::default().with_limiter(ScriptedLimiter::allow(0));
        let (status, body) = harness.post("/api/generate", valid_body()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["remaining"], 0);
    }

    #[tokio::test]
    async fn prompt_carries_the_ascii_and_style() {
        let harness = Harness::default();
        for info in available_styles() {
            let ascii = "  _  _\n | || |\n |_||_|";
            let body = json!({"ascii": ascii, "style": info.key, "captchaToken": "t"});
            let (status, _) = harness.post("/api/generate", body).await;
            assert_eq!(status, StatusCode::OK);
            let prompt = harness.generator.last_prompt().expect("prompt recorded");
            assert!(prompt.contains(ascii));
            assert!(prompt.contains(info.prompt_fragment));
            assert!(prompt.contains(LEGIBILITY_REQUIREMENT));
        }
    }

    #[tokio::test]
    async fn empty_ascii_is_required() {
        let harness = Harness::default();
        for body in [
            json!({"ascii": "", "style": "watercolor", "captchaToken": "x"}),
            json!({"ascii": " \n ", "style": "watercolor", "captchaToken": "x"}),
            json!({"style": "watercolor", "captchaToken": "x"}),
        ] {
            let (status, body) = harness.post("/api/generate", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "ascii_required");
        }
        assert_eq!(harness.generator.calls(), 0);
    }

    #[tokio::test]
    async fn ascii_over_the_limit_is_too_long() {
        let harness = Harness::default();
        let body = json!({"ascii": "#".repeat(5001), "style": "nope"});
        let (status, body) = harness.post("/api/generate", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "ascii_too_long");

        let body = json!({"ascii": "#".repeat(5000), "style": "neon", "captchaToken": "x"});
        let (status, _) = harness.post("/api/generate", body).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn style_must_be_given_and_known() {
        let harness = Harness::default();
        for body in [
            json!({"ascii": "HI", "captchaToken": "x"}),
            json!({"ascii": "HI", "style": "", "captchaToken": "x"}),
        ] {
            let (status, body) = harness.post("/api/generate", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "style_required");
        }

        let body = json!({"ascii": "HI", "style": "Watercolor", "captchaToken": "x"});
        let (status, body) = harness.post("/api/generate", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_style");
        assert_eq!(
            body["message"],
            "Invalid style. Valid styles are: watercolor, oil, pixel, neon, graffiti, cyberpunk, chrome, glitch, flame"
        );
    }

    #[tokio::test]
    async fn captcha_token_is_required() {
        let harness = Harness::default();
        for body in [
            json!({"ascii": "HI", "style": "oil"}),
            json!({"ascii": "HI", "style": "oil", "captchaToken": ""}),
        ] {
            let (status, body) = harness.post("/api/generate", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "captcha_required");
        }
        assert_eq!(harness.captcha.calls(), 0);
    }

    #[tokio::test]
    async fn rejected_or_broken_captcha_fails() {
        for captcha in [ScriptedCaptcha::reject(), ScriptedCaptcha::error()] {
            let harness = Harness::default().with_captcha(captcha);
            let (status, body) = harness.post("/api/generate", valid_body()).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "captcha_failed");
            assert_eq!(harness.limiter.calls(), 0);
            assert_eq!(harness.generator.calls(), 0);
        }
    }

    #[tokio::test]
    async fn exhausted_quota_is_429_without_generating() {
        let limiter = ScriptedLimiter::decide(RateLimitDecision {
            allowed: false,
            remaining: 0,
            reset: 1_700_000_000_000,
        });
        let harness = Harness::default().with_limiter(limiter);
        let (status, body) = harness.post("/api/generate", valid_body()).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "rate_limit");
        assert_eq!(body["remaining"], 0);
        assert_eq!(body["reset"], 1_700_000_000_000u64);
        assert_eq!(harness.generator.calls(), 0);
    }

    #[tokio::test]
    async fn counter_store_failure_is_generation_failed() {
        let harness = Harness::default().with_limiter(ScriptedLimiter::error());
        let (status, body) = harness.post("/api/generate", valid_body()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "generation_failed");
        assert_eq!(harness.generator.calls(), 0);
    }

    #[tokio::test]
    async fn rate_limit_uses_the_forwarded_client() {
        let harness = Harness::default();
        let (status, _) = harness
            .post_with_header(
                "/api/generate",
                valid_body(),
                ("x-forwarded-for", "203.0.113.5, 10.0.0.1"),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(harness.limiter.last_key().as_deref(), Some("203.0.113.5"));

        harness.post("/api/generate", valid_body()).await;
        assert_eq!(harness.limiter.last_key().as_deref(), Some("127.0.0.1"));
    }

    #[tokio::test]
    async fn generator_errors_are_sanitized() {
        let cases = [
            (
                CountingGenerator::failing(|| ImageGenError::NoImageData),
                "No image data in response",
            ),
            (
                CountingGenerator::failing(|| ImageGenError::Api {
                    status: 400,
                    message: "internal provider detail".into(),
                }),
                "Failed to generate image",
            ),
        ];
        for (generator, message) in cases {
            let harness = Harness {
                generator: Arc::new(generator),
                ..Harness::default()
            };
            let (status, body) = harness.post("/api/generate", valid_body()).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body["error"], "generation_failed");
            assert_eq!(body["message"], message);
        }
    }

    #[tokio::test]
    async fn malformed_bodies_are_invalid_json() {
        let harness = Harness::default();
        for raw in ["{", "null", r#"{"ascii": ["not", "a", "string"]}"#] {
            let (status, body) = harness.post_raw("/api/generate", raw).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "invalid_json");
        }
        assert_eq!(harness.captcha.calls(), 0);
    }
}
