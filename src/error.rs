//! Error handling

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, info};

use crate::constants::{MAX_ASCII_LENGTH, MAX_TEXT_LENGTH};

/// Errors returned by the HTTP API, one variant per error code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The body isn't the expected JSON shape
    InvalidJson,
    /// Banner text is missing or blank
    TextRequired,
    /// Banner text is over the length limit
    TextTooLong,
    /// Unknown font, carries the valid names
    InvalidFont(Vec<String>),
    /// ASCII art is missing or blank
    AsciiRequired,
    /// ASCII art is over the length limit
    AsciiTooLong,
    /// No style was given
    StyleRequired,
    /// Unknown style, carries the valid keys
    InvalidStyle(Vec<String>),
    /// No captcha token was given
    CaptchaRequired,
    /// The captcha token was rejected, or couldn't be checked
    CaptchaFailed,
    /// The client used up its quota
    RateLimited {
        /// Epoch milliseconds when the quota frees up
        reset: u64,
    },
    /// Anything that went wrong after validation. The message is shown to the client.
    GenerationFailed(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    remaining: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reset: Option<u64>,
}

impl ApiError {
    /// Machine readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidJson => "invalid_json",
            Self::TextRequired => "text_required",
            Self::TextTooLong => "text_too_long",
            Self::InvalidFont(_) => "invalid_font",
            Self::AsciiRequired => "ascii_required",
            Self::AsciiTooLong => "ascii_too_long",
            Self::StyleRequired => "style_required",
            Self::InvalidStyle(_) => "invalid_style",
            Self::CaptchaRequired => "captcha_required",
            Self::CaptchaFailed => "captcha_failed",
            Self::RateLimited { .. } => "rate_limit",
            Self::GenerationFailed(_) => "generation_failed",
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::GenerationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Human readable message.
    pub fn message(&self) -> String {
        match self {
            Self::InvalidJson => "Invalid JSON in request body".to_string(),
            Self::TextRequired => "Text is required".to_string(),
            Self::TextTooLong => {
                format!("Text must be {MAX_TEXT_LENGTH} characters or less")
            }
            Self::InvalidFont(fonts) => {
                format!("Invalid font. Available fonts: {}", fonts.join(", "))
            }
            Self::AsciiRequired => "ASCII art is required".to_string(),
            Self::AsciiTooLong => {
                format!("ASCII art must be {MAX_ASCII_LENGTH} characters or less")
            }
            Self::StyleRequired => "Art style is required".to_string(),
            Self::InvalidStyle(styles) => {
                format!("Invalid style. Valid styles are: {}", styles.join(", "))
            }
            Self::CaptchaRequired => "Please complete the captcha".to_string(),
            Self::CaptchaFailed => "Captcha verification failed".to_string(),
            Self::RateLimited { .. } => {
                "Daily limit reached. Please try again tomorrow.".to_string()
            }
            Self::GenerationFailed(message) => message.clone(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            info!("Request rejected: {}", self.code());
        }
        let (remaining, reset) = match &self {
            Self::RateLimited { reset } => (Some(0), Some(*reset)),
            _ => (None, None),
        };
        let body = ErrorBody {
            error: self.code(),
            message: self.message(),
            remaining,
            reset,
        };
        (status, Json(body)).into_response()
    }
}
