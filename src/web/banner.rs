use super::prelude::*;
use crate::constants::{DEFAULT_FONT, MAX_TEXT_LENGTH};
use crate::fonts::FontError;

#[derive(Debug, Deserialize)]
pub(crate) struct BannerRequest {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    font: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct BannerResponse {
    ascii: String,
}

/// handles POST /api/banner
pub(crate) async fn banner_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<BannerResponse>, ApiError> {
    let request: BannerRequest = serde_json::from_slice(&body).map_err(|err| {
        debug!("Unparseable banner request: {}", err);
        ApiError::InvalidJson
    })?;

    let text = request.text.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ApiError::TextRequired);
    }
    if text.chars().count() > MAX_TEXT_LENGTH {
        return Err(ApiError::TextTooLong);
    }

    let fonts = state.renderer.available_fonts();
    let font = request.font.as_deref().unwrap_or(DEFAULT_FONT);
    if !fonts.contains(&font) {
        return Err(ApiError::InvalidFont(
            fonts.iter().map(|name| name.to_string()).collect(),
        ));
    }

    let ascii = state.renderer.render(&text, font).map_err(|err| {
        error!("Banner rendering failed for font {}: {}", font, err);
        match err {
            FontError::EmptyText => ApiError::TextRequired,
            FontError::UnknownFont(_) => {
                ApiError::GenerationFailed("Failed to generate banner".to_string())
            }
        }
    })?;
    Ok(Json(BannerResponse { ascii }))
}
