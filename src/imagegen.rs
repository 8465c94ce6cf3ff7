//! Image generation through the Gemini `generateContent` API.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info};
use url::Url;

use crate::config::is_unset;
use crate::constants::FALLBACK_IMAGE_MIME;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Shown to clients for failures whose details stay server-side.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to generate image";

/// An image returned by the generator.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ImageResult {
    /// Base64 encoded image bytes
    pub image_data: String,
    /// Mime type of the image
    pub mime_type: String,
}

impl ImageResult {
    /// The image as a `data:` URI.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.image_data)
    }
}

/// Errors from image generation.
#[derive(Debug)]
pub enum ImageGenError {
    /// No API key is configured.
    NotConfigured,
    /// The API base URL couldn't be used.
    InvalidUrl(url::ParseError),
    /// The request didn't complete.
    Request(reqwest::Error),
    /// The API answered with an error status.
    Api {
        /// HTTP status
        status: u16,
        /// Error message from the API, if it sent one
        message: String,
    },
    /// The API answered with something that isn't a generateContent response.
    InvalidResponse(String),
    /// The response had no candidate content.
    NoCandidates,
    /// No part of the candidate carried an image.
    NoImageData,
    /// The image payload wasn't valid base64.
    InvalidImageData(base64::DecodeError),
}

impl std::fmt::Display for ImageGenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConfigured => write!(
                f,
                "GOOGLE_AI_API_KEY is not configured. Please add it to your environment variables."
            ),
            Self::InvalidUrl(err) => write!(f, "Invalid image API URL: {err}"),
            Self::Request(err) => write!(f, "Image API request failed: {err}"),
            Self::Api { status, message } => write!(f, "Image API returned {status}: {message}"),
            Self::InvalidResponse(err) => write!(f, "Unreadable image API response: {err}"),
            Self::NoCandidates => write!(f, "No image generated - empty response from API"),
            Self::NoImageData => write!(f, "No image data in response"),
            Self::InvalidImageData(err) => write!(f, "Image data is not valid base64: {err}"),
        }
    }
}

impl std::error::Error for ImageGenError {}

impl From<reqwest::Error> for ImageGenError {
    fn from(err: reqwest::Error) -> Self {
        // Request URLs can carry credentials, keep them out of logs.
        Self::Request(err.without_url())
    }
}

impl ImageGenError {
    /// Message that's safe to hand to clients. Provider and transport details are
    /// replaced with [GENERIC_FAILURE_MESSAGE].
    pub fn client_message(&self) -> String {
        match self {
            Self::NotConfigured | Self::NoCandidates | Self::NoImageData => self.to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// Turns a prompt into an image.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generates one image for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<ImageResult, ImageGenError>;
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Option<Vec<Part>>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default, rename = "inlineData", alias = "inline_data")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    #[serde(default)]
    data: String,
    #[serde(default, rename = "mimeType", alias = "mime_type")]
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

/// Gemini client.
///
/// The API key is checked on every call, so a missing key fails that request with
/// [ImageGenError::NotConfigured] rather than stopping the server. The HTTP client is
/// shared by all calls.
#[derive(Clone)]
pub struct GeminiImageClient {
    api_key: Option<String>,
    model: String,
    api_base: Url,
    http: reqwest::Client,
}

impl std::fmt::Debug for GeminiImageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiImageClient")
            .field("configured", &self.api_key.is_some())
            .field("model", &self.model)
            .field("api_base", &self.api_base.as_str())
            .finish_non_exhaustive()
    }
}

impl GeminiImageClient {
    /// Creates the client. `api_base` is validated now, the key on each call.
    pub fn new(
        api_key: Option<String>,
        model: &str,
        api_base: &str,
        http: reqwest::Client,
    ) -> Result<Self, ImageGenError> {
        let api_base = Url::parse(api_base.trim()).map_err(ImageGenError::InvalidUrl)?;
        Ok(Self {
            api_key: api_key.filter(|key| !is_unset(Some(key.as_str()))),
            model: model.trim().to_string(),
            api_base,
            http,
        })
    }

    fn endpoint(&self) -> Result<Url, ImageGenError> {
        let model_path = if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        };
        let url = format!(
            "{}/{}:generateContent",
            self.api_base.as_str().trim_end_matches('/'),
            model_path
        );
        Url::parse(&url).map_err(ImageGenError::InvalidUrl)
    }
}

#[async_trait]
impl ImageGenerator for GeminiImageClient {
    async fn generate(&self, prompt: &str) -> Result<ImageResult, ImageGenError> {
        let Some(api_key) = self.api_key.as_deref() else {
            error!("Image generation requested but GOOGLE_AI_API_KEY is not set");
            return Err(ImageGenError::NotConfigured);
        };

        let body = json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
            "generationConfig": {"responseModalities": ["IMAGE", "TEXT"]},
        });

        debug!(
            "Calling {} with a {} byte prompt",
            self.model,
            prompt.len()
        );
        let response = self
            .http
            .post(self.endpoint()?)
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            let message = serde_json::from_slice::<ApiErrorBody>(&bytes)
                .map(|body| body.error.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
            error!("Image API returned {}: {}", status, message);
            return Err(ImageGenError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_slice(&bytes)
            .map_err(|err| ImageGenError::InvalidResponse(err.to_string()))?;
        let image = extract_image(parsed)?;
        info!(
            "Image generated: {} ({} base64 bytes)",
            image.mime_type,
            image.image_data.len()
        );
        Ok(image)
    }
}

/// Pulls the first inline image out of the first candidate.
fn extract_image(response: GenerateContentResponse) -> Result<ImageResult, ImageGenError> {
    let parts = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts)
        .ok_or(ImageGenError::NoCandidates)?;
    debug!("Found {} parts in response", parts.len());

    let inline = parts
        .into_iter()
        .filter_map(|part| part.inline_data)
        .find(|inline| !inline.data.is_empty())
        .ok_or(ImageGenError::NoImageData)?;

    let decoded = general_purpose::STANDARD
        .decode(inline.data.as_bytes())
        .map_err(ImageGenError::InvalidImageData)?;
    let mime_type = inline
        .mime_type
        .filter(|mime| !mime.trim().is_empty())
        .unwrap_or_else(|| sniff_mime(&decoded));

    Ok(ImageResult {
        image_data: inline.data,
        mime_type,
    })
}

fn sniff_mime(bytes: &[u8]) -> String {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or(FALLBACK_IMAGE_MIME)
        .to_string()
}
