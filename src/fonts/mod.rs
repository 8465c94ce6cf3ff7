//! Text to ASCII banner rendering.
//!
//! Fonts are FIGlet `.flf` files bundled with the binary. They're parsed into a
//! process-wide map the first time any font is looked up, and shared read-only
//! after that, so rendering is idempotent and has no side effects for callers.

use std::collections::HashMap;
use std::sync::LazyLock;

use tracing::{debug, error};

mod figlet;

use figlet::FigletFont;

/// Font names accepted by the banner endpoint, in display order.
///
/// This list decides validity. A font that isn't listed here is rejected even if a
/// table for it exists.
pub const AVAILABLE_FONTS: [&str; 13] = [
    "Standard", "Banner", "Big", "Block", "Bubble", "Digital", "Ivrit", "Lean", "Mini",
    "Script", "Shadow", "Slant", "Small",
];

/// Errors returned when rendering a banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontError {
    /// The text was empty or only whitespace.
    EmptyText,
    /// No font is registered under this name.
    UnknownFont(String),
}

impl std::fmt::Display for FontError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "Text is required"),
            Self::UnknownFont(name) => write!(f, "Font {name} not available"),
        }
    }
}

impl std::error::Error for FontError {}

/// Renders text into an ASCII banner.
pub trait BannerRenderer: Send + Sync {
    /// Names of the fonts this renderer accepts.
    fn available_fonts(&self) -> &[&'static str];

    /// Renders `text` in the named font.
    fn render(&self, text: &str, font: &str) -> Result<String, FontError>;
}

macro_rules! bundled_font {
    ($name:literal, $file:literal) => {
        (
            $name,
            include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/fonts/", $file)),
        )
    };
}

const BUNDLED: [(&str, &str); 13] = [
    bundled_font!("Standard", "standard.flf"),
    bundled_font!("Banner", "banner.flf"),
    bundled_font!("Big", "big.flf"),
    bundled_font!("Block", "block.flf"),
    bundled_font!("Bubble", "bubble.flf"),
    bundled_font!("Digital", "digital.flf"),
    bundled_font!("Ivrit", "ivrit.flf"),
    bundled_font!("Lean", "lean.flf"),
    bundled_font!("Mini", "mini.flf"),
    bundled_font!("Script", "script.flf"),
    bundled_font!("Shadow", "shadow.flf"),
    bundled_font!("Slant", "slant.flf"),
    bundled_font!("Small", "small.flf"),
];

static REGISTRY: LazyLock<HashMap<&'static str, FigletFont>> = LazyLock::new(|| {
    debug!("Registering {} bundled fonts", BUNDLED.len());
    BUNDLED
        .iter()
        .filter_map(|&(name, source)| match FigletFont::parse(source) {
            Ok(font) => Some((name, font)),
            Err(err) => {
                error!("Bundled font {} failed to load: {}", name, err);
                None
            }
        })
        .collect()
});

/// Renders `text` with the named bundled font.
pub fn generate_ascii(text: &str, font: &str) -> Result<String, FontError> {
    if text.trim().is_empty() {
        return Err(FontError::EmptyText);
    }
    if !AVAILABLE_FONTS.contains(&font) {
        return Err(FontError::UnknownFont(font.to_string()));
    }
    let registered = REGISTRY
        .get(font)
        .ok_or_else(|| FontError::UnknownFont(font.to_string()))?;
    let ascii = registered.render(text);
    debug!(
        "Rendered {} chars with font {} into {} bytes",
        text.chars().count(),
        font,
        ascii.len()
    );
    Ok(ascii)
}

/// [BannerRenderer] backed by the bundled FIGlet fonts.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlyphRenderer;

impl BannerRenderer for GlyphRenderer {
    fn available_fonts(&self) -> &[&'static str] {
        &AVAILABLE_FONTS
    }

    fn render(&self, text: &str, font: &str) -> Result<String, FontError> {
        generate_ascii(text, font)
    }
}
