use askama::Template;
use askama_web::WebTemplate;

use super::prelude::*;
use crate::constants::{DEFAULT_FONT, MAX_ASCII_LENGTH, MAX_TEXT_LENGTH};
use crate::prompt::{ArtStyleInfo, available_styles};

#[derive(Clone, Debug)]
pub(crate) struct FontOption {
    pub(crate) name: &'static str,
    pub(crate) selected: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub(crate) struct IndexTemplate {
    pub(crate) fonts: Vec<FontOption>,
    pub(crate) styles: &'static [ArtStyleInfo],
    pub(crate) site_key: String,
    pub(crate) max_text_length: usize,
    pub(crate) max_ascii_length: usize,
}

/// handles the / GET
pub(crate) async fn root_handler(State(state): State<AppState>) -> IndexTemplate {
    let fonts = state
        .renderer
        .available_fonts()
        .iter()
        .map(|&name| FontOption {
            name,
            selected: name == DEFAULT_FONT,
        })
        .collect();
    IndexTemplate {
        fonts,
        styles: available_styles(),
        site_key: state.site_key.to_string(),
        max_text_length: MAX_TEXT_LENGTH,
        max_ascii_length: MAX_ASCII_LENGTH,
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct FontList {
    fonts: Vec<&'static str>,
    default: &'static str,
}

/// handles GET /api/fonts
pub(crate) async fn fonts_handler(State(state): State<AppState>) -> Json<FontList> {
    Json(FontList {
        fonts: state.renderer.available_fonts().to_vec(),
        default: DEFAULT_FONT,
    })
}

/// handles GET /api/styles
pub(crate) async fn style_catalog_handler() -> Json<&'static [ArtStyleInfo]> {
    Json(available_styles())
}
