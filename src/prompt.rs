//! Image prompt composition.
//!
//! A prompt is the banner text verbatim, a fixed legibility brief, the style's
//! descriptive fragment, and a handful of scene descriptors sampled at random so two
//! calls with the same input rarely produce the same scene.

use std::str::FromStr;

use rand::seq::IndexedRandom;
use rand::{Rng, RngExt};
use serde::{Deserialize, Serialize};

/// Art styles the image generator can be asked for.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtStyle {
    /// Soft watercolor washes
    Watercolor,
    /// Impasto oil painting
    Oil,
    /// 16-bit pixel art
    Pixel,
    /// Glowing neon tubes
    Neon,
    /// Spray painted street art
    Graffiti,
    /// Rain-slicked dystopian city
    Cyberpunk,
    /// Polished 3D chrome
    Chrome,
    /// Corrupted digital glitch
    Glitch,
    /// Fire and embers
    Flame,
}

/// Catalog entry for an [ArtStyle].
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtStyleInfo {
    /// Style key
    pub key: ArtStyle,
    /// Name shown to people
    pub display_name: &'static str,
    /// Short description shown to people
    pub description: &'static str,
    /// Fragment inserted into the image prompt
    #[serde(skip)]
    pub prompt_fragment: &'static str,
}

/// Errors from prompt composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    /// The style key isn't in the catalog.
    UnknownStyle(String),
}

impl std::fmt::Display for PromptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownStyle(key) => write!(f, "Unknown art style: {key}"),
        }
    }
}

impl std::error::Error for PromptError {}

static STYLES: [ArtStyleInfo; 9] = [
    ArtStyleInfo {
        key: ArtStyle::Watercolor,
        display_name: "Watercolor",
        description: "Soft, flowing, delicate",
        prompt_fragment: "watercolor painting masterpiece, soft wet-on-wet technique, flowing pigments bleeding into paper, delicate color washes with subtle gradients, loose expressive brushwork, luminous transparency, dreamy ethereal atmosphere, artistic splatter effects",
    },
    ArtStyleInfo {
        key: ArtStyle::Oil,
        display_name: "Oil painting",
        description: "Heavy texture, visible brushstrokes",
        prompt_fragment: "oil painting masterpiece in the style of impressionist masters, thick impasto brushstrokes with visible texture, rich saturated colors, dramatic chiaroscuro lighting, canvas texture visible, museum quality artwork, painterly depth and dimension",
    },
    ArtStyleInfo {
        key: ArtStyle::Pixel,
        display_name: "Pixel art",
        description: "Retro video game feel",
        prompt_fragment: "pixel art masterpiece, 16-bit retro game aesthetic with dithering techniques, carefully placed pixels, limited color palette with maximum impact, nostalgic arcade vibes, crisp pixel-perfect details, iconic video game atmosphere",
    },
    ArtStyleInfo {
        key: ArtStyle::Neon,
        display_name: "Neon",
        description: "Glowing light, electric night",
        prompt_fragment: "neon art masterpiece, brilliant glowing tubes against deep darkness, electric pink and cyan light bleeding into atmosphere, light reflections on wet surfaces, humming fluorescent energy, retro-futuristic noir mood, vibrant light trails",
    },
    ArtStyleInfo {
        key: ArtStyle::Graffiti,
        display_name: "Graffiti",
        description: "Street art, spray paint texture",
        prompt_fragment: "street art graffiti masterpiece, bold spray paint strokes with dripping effects, urban concrete texture, vibrant wildstyle lettering influence, stencil art elements, raw street culture energy, weathered wall aesthetic",
    },
    ArtStyleInfo {
        key: ArtStyle::Cyberpunk,
        display_name: "Cyberpunk",
        description: "Neon colors, future city, high tech",
        prompt_fragment: "cyberpunk masterpiece, neon-soaked dystopian atmosphere, holographic advertisements flickering, rain-slicked streets with light reflections, flying vehicles in distance, tech noir cinematography, Blade Runner inspired aesthetic, atmospheric fog and haze",
    },
    ArtStyleInfo {
        key: ArtStyle::Chrome,
        display_name: "Chrome",
        description: "Reflective metal, 3D lettering",
        prompt_fragment: "3D chrome masterpiece, liquid mercury reflections, mirror-polished metallic surfaces catching dramatic studio lighting, environmental reflections in metal, sculptural depth and dimension, high-end product photography quality, pristine finish",
    },
    ArtStyleInfo {
        key: ArtStyle::Glitch,
        display_name: "Glitch art",
        description: "Digital corruption, RGB shift",
        prompt_fragment: "glitch art masterpiece, corrupted digital aesthetics, RGB channel separation with chromatic aberration, scan line distortions, data moshing effects, vaporwave color palette, CRT monitor artifacts, broken pixel patterns, surreal digital decay",
    },
    ArtStyleInfo {
        key: ArtStyle::Flame,
        display_name: "Flame",
        description: "Burning energy, glowing embers",
        prompt_fragment: "fire and flame masterpiece, blazing inferno with dancing flames, glowing embers floating upward, intense orange and red gradients, dramatic rim lighting, smoke wisps curling, molten energy core, phoenix-like radiance against darkness",
    },
];

const FOREGROUND: [&str; 14] = [
    "silhouettes of people walking with long shadows",
    "a lone figure gazing upward in contemplation",
    "children chasing butterflies through wildflowers",
    "a couple sharing an umbrella in soft rain",
    "a vintage bicycle leaning against a lamp post",
    "a graceful cat perched on a windowsill",
    "birds taking flight from tall grass",
    "scattered autumn leaves dancing in wind",
    "blooming cherry blossom petals drifting",
    "a street musician playing violin",
    "lanterns glowing warmly at dusk",
    "a red phone booth covered in ivy",
    "cobblestone path winding through flowers",
    "dewdrops glistening on spider webs",
];

const BACKGROUND: [&str; 14] = [
    "majestic snow-capped mountain peaks",
    "rolling lavender fields stretching to horizon",
    "a cascading waterfall catching rainbow light",
    "ancient forest with sunbeams through canopy",
    "mirror-still lake reflecting the sky",
    "dramatic cloudscape with silver linings",
    "a winding river through autumn valley",
    "mysterious ancient temple ruins overgrown with vines",
    "windmills silhouetted against sunset",
    "colorful hot air balloons dotting the sky",
    "northern lights dancing in polar sky",
    "a lighthouse on rocky cliff by sea",
    "terraced rice paddies in golden hour",
    "floating islands among clouds",
];

const LIGHTING: [&str; 8] = [
    "golden hour sunlight casting warm glow",
    "dramatic sunset with orange and purple sky",
    "soft diffused light through morning mist",
    "blue hour twilight with first stars appearing",
    "dappled sunlight filtering through leaves",
    "moonlit scene with silver highlights",
    "rays of light breaking through storm clouds",
    "warm candlelit ambiance",
];

const ATMOSPHERE: [&str; 8] = [
    "gentle morning fog rolling across the scene",
    "dust particles floating in sunbeams",
    "light rain creating ripples and reflections",
    "autumn haze with warm golden tones",
    "crisp winter air with breath visible",
    "magical fireflies twinkling at dusk",
    "petals and leaves swirling in breeze",
    "soft bokeh lights in background",
];

/// Sentence every prompt carries so the banner dominates the image.
pub const LEGIBILITY_REQUIREMENT: &str =
    "The text on the banner MUST be the main focal point, taking up at least 40% of the image";

impl ArtStyle {
    /// Every style, in catalog order.
    pub const ALL: [ArtStyle; 9] = [
        ArtStyle::Watercolor,
        ArtStyle::Oil,
        ArtStyle::Pixel,
        ArtStyle::Neon,
        ArtStyle::Graffiti,
        ArtStyle::Cyberpunk,
        ArtStyle::Chrome,
        ArtStyle::Glitch,
        ArtStyle::Flame,
    ];

    /// The wire key, eg `watercolor`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Watercolor => "watercolor",
            Self::Oil => "oil",
            Self::Pixel => "pixel",
            Self::Neon => "neon",
            Self::Graffiti => "graffiti",
            Self::Cyberpunk => "cyberpunk",
            Self::Chrome => "chrome",
            Self::Glitch => "glitch",
            Self::Flame => "flame",
        }
    }

    /// Catalog entry for this style.
    pub fn info(self) -> &'static ArtStyleInfo {
        // STYLES is in the same order as ALL.
        &STYLES[self as usize]
    }
}

impl std::fmt::Display for ArtStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtStyle {
    type Err = PromptError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        ArtStyle::ALL
            .into_iter()
            .find(|style| style.as_str() == key)
            .ok_or_else(|| PromptError::UnknownStyle(key.to_string()))
    }
}

/// The style catalog.
pub fn available_styles() -> &'static [ArtStyleInfo] {
    &STYLES
}

/// Style keys, in catalog order.
pub fn style_keys() -> Vec<&'static str> {
    ArtStyle::ALL.into_iter().map(ArtStyle::as_str).collect()
}

/// Looks up a catalog entry by key.
pub fn style_info(key: &str) -> Result<&'static ArtStyleInfo, PromptError> {
    key.parse::<ArtStyle>().map(|style| style.info())
}

fn pick<R: Rng + ?Sized>(rng: &mut R, pool: &[&'static str], count: usize) -> Vec<&'static str> {
    pool.sample(rng, count).copied().collect()
}

/// Builds the image prompt using the thread-local RNG.
pub fn build_prompt(ascii: &str, style: ArtStyle) -> String {
    build_prompt_with_rng(ascii, style, &mut rand::rng())
}

/// Builds the image prompt for a style given by key.
pub fn build_prompt_for_key(ascii: &str, key: &str) -> Result<String, PromptError> {
    let style = key.parse::<ArtStyle>()?;
    Ok(build_prompt(ascii, style))
}

/// Builds the image prompt, drawing scene elements from `rng`.
pub fn build_prompt_with_rng<R: Rng + ?Sized>(ascii: &str, style: ArtStyle, rng: &mut R) -> String {
    let info = style.info();

    let foreground_count = rng.random_range(1..=2);
    let foreground = pick(rng, &FOREGROUND, foreground_count);
    let background_count = rng.random_range(1..=2);
    let background = pick(rng, &BACKGROUND, background_count);
    let lighting = pick(rng, &LIGHTING, 1).join("");
    let atmosphere = pick(rng, &ATMOSPHERE, 1).join("");

    format!(
        "Create a breathtaking artistic masterpiece featuring a monumental banner as the centerpiece.

The banner proudly displays this text in LARGE, BOLD, CLEAR letters:
{ascii}

CINEMATIC COMPOSITION:
- FOCAL POINT: A grand, elegant banner or billboard majestically positioned in the mid-ground, displaying the text above
- FOREGROUND (intimate detail): {foreground}
- BACKGROUND (epic vista): {background}
- LIGHTING: {lighting}
- ATMOSPHERE: {atmosphere}

ARTISTIC STYLE: {fragment}

CRITICAL TEXT REQUIREMENTS:
- {LEGIBILITY_REQUIREMENT}
- Text must be LARGE, BOLD, and CRYSTAL CLEAR with high contrast against the banner background
- Each letter must be perfectly legible and sharp, not blurry or artistic distortion
- Use solid, thick lettering style - no thin strokes or decorative fonts that reduce readability
- The banner background should be a solid contrasting color to make text pop

ARTISTIC EXCELLENCE:
- Apply cinematic depth of field with sharp mid-ground and artistically blurred fore/background
- Use rule of thirds composition for maximum visual impact
- Create rich visual storytelling through layered elements
- Employ dramatic {name} style rendering for the environment
- Aim for award-winning photography/illustration quality
- Include subtle details that reward closer viewing
- Balance complexity with elegant simplicity",
        foreground = foreground.join(", "),
        background = background.join(", "),
        fragment = info.prompt_fragment,
        name = info.display_name,
    )
}
