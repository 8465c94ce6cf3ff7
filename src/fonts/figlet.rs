//! Loader for FIGlet `.flf` font files.
//!
//! Only the parts of the format the renderer uses are read: the header, the
//! comment block and the required glyphs for printable ASCII (32 to 126). Code
//! tagged glyphs after those are ignored. Layout is always full width.

use std::collections::HashMap;

/// Drawn in place of characters a font doesn't define.
const PLACEHOLDER: char = '?';

const FIRST_REQUIRED: u8 = b' ';
const LAST_REQUIRED: u8 = b'~';

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FigletError {
    MissingHeader,
    BadSignature,
    BadHeader(&'static str),
    MissingGlyph(char),
}

impl std::fmt::Display for FigletError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingHeader => write!(f, "font file is empty"),
            Self::BadSignature => write!(f, "not a flf2a font"),
            Self::BadHeader(field) => write!(f, "header field {field} is missing or invalid"),
            Self::MissingGlyph(ch) => write!(f, "font ends before the glyph for {ch:?}"),
        }
    }
}

impl std::error::Error for FigletError {}

#[derive(Debug)]
pub(crate) struct FigletFont {
    height: usize,
    right_to_left: bool,
    glyphs: HashMap<char, Vec<String>>,
}

impl FigletFont {
    pub(crate) fn parse(source: &str) -> Result<Self, FigletError> {
        let mut lines = source.lines();
        let header = lines.next().ok_or(FigletError::MissingHeader)?;
        let mut signature = header
            .strip_prefix("flf2a")
            .ok_or(FigletError::BadSignature)?
            .chars();
        let hardblank = signature.next().ok_or(FigletError::BadSignature)?;
        let fields: Vec<&str> = signature.as_str().split_whitespace().collect();
        let field = |index: usize, name: &'static str| -> Result<i64, FigletError> {
            fields
                .get(index)
                .and_then(|value| value.parse().ok())
                .ok_or(FigletError::BadHeader(name))
        };

        let height = usize::try_from(field(0, "height")?)
            .ok()
            .filter(|height| *height > 0)
            .ok_or(FigletError::BadHeader("height"))?;
        let comment_lines = usize::try_from(field(4, "comment_lines")?)
            .map_err(|_| FigletError::BadHeader("comment_lines"))?;
        // print_direction is optional and defaults to left to right
        let right_to_left = match fields.get(5) {
            Some(_) => field(5, "print_direction")? == 1,
            None => false,
        };

        for _ in 0..comment_lines {
            lines
                .next()
                .ok_or(FigletError::MissingGlyph(char::from(FIRST_REQUIRED)))?;
        }

        let mut glyphs = HashMap::new();
        for code in FIRST_REQUIRED..=LAST_REQUIRED {
            let ch = char::from(code);
            let mut rows = Vec::with_capacity(height);
            for _ in 0..height {
                let line = lines.next().ok_or(FigletError::MissingGlyph(ch))?;
                rows.push(glyph_row(line, hardblank));
            }
            glyphs.insert(ch, rows);
        }

        Ok(Self {
            height,
            right_to_left,
            glyphs,
        })
    }

    fn glyph(&self, ch: char) -> &[String] {
        self.glyphs
            .get(&ch)
            .or_else(|| self.glyphs.get(&PLACEHOLDER))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Lays glyphs side by side, padding each to its widest row.
    pub(crate) fn render(&self, text: &str) -> String {
        let mut chars: Vec<char> = text.chars().collect();
        if self.right_to_left {
            chars.reverse();
        }
        let mut lines = vec![String::new(); self.height];
        for ch in chars {
            let glyph = self.glyph(ch);
            let width = glyph.iter().map(|row| row.chars().count()).max().unwrap_or(0);
            for (index, line) in lines.iter_mut().enumerate() {
                let row = glyph.get(index).map(String::as_str).unwrap_or("");
                line.push_str(row);
                let pad = width.saturating_sub(row.chars().count());
                line.extend(std::iter::repeat_n(' ', pad));
            }
        }
        lines
            .iter()
            .map(|line| line.trim_end())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Strips the endmark (the line's last character, possibly doubled) and turns
/// hardblanks into spaces.
fn glyph_row(line: &str, hardblank: char) -> String {
    let row = match line.chars().last() {
        Some(endmark) => line.trim_end_matches(endmark),
        None => line,
    };
    row.replace(hardblank, " ")
}
