//! Font loading and text measurement using `ttf-parser`.
//!
//! Real font files can be registered per family; otherwise the manager falls
//! back to synthetic Helvetica-like metrics so that the height estimator is
//! deterministic on machines without any fonts installed.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

/// Failure to register a font face.
#[derive(Debug, Error)]
pub enum FontError {
    #[error("failed to read font file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse font: {0}")]
    Parse(String),
}

/// A loaded font face with metrics.
#[derive(Clone)]
pub struct FontData {
    /// Raw font bytes (kept alive for ttf-parser's zero-copy API).
    pub bytes: Vec<u8>,
    pub units_per_em: f32,
    pub ascender: f32,
    pub descender: f32,
    pub line_gap: f32,
}

impl FontData {
    fn synthetic() -> Self {
        Self {
            bytes: Vec::new(),
            units_per_em: 1000.0,
            ascender: 750.0,
            descender: -250.0,
            line_gap: 0.0,
        }
    }
}

/// Manages loaded fonts.
pub struct FontManager {
    fonts: HashMap<FontKey, FontData>,
    /// Key used when a requested face is not registered.
    default_key: FontKey,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct FontKey {
    pub family: String,
    pub bold: bool,
    pub italic: bool,
}

impl FontKey {
    pub fn new(family: &str, bold: bool, italic: bool) -> Self {
        Self {
            family: normalize_family(family),
            bold,
            italic,
        }
    }
}

/// First family of a CSS `font-family` list, unquoted and lower-cased.
pub fn normalize_family(family: &str) -> String {
    family
        .split(',')
        .next()
        .unwrap_or("")
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_ascii_lowercase()
}

/// Whether a CSS `font-family` list asks for a fixed-pitch face.
pub fn is_monospace_family(family: &str) -> bool {
    let f = family.to_ascii_lowercase();
    f.contains("mono") || f.contains("courier") || f.contains("consol") || f.contains("code")
}

impl FontManager {
    /// An empty manager. Measuring with it is impossible until a font is
    /// loaded or [`ensure_default`](Self::ensure_default) is called.
    pub fn new() -> Self {
        Self {
            fonts: HashMap::new(),
            default_key: FontKey::new("Helvetica", false, false),
        }
    }

    /// Load a TTF/OTF font from bytes.
    pub fn load_font(
        &mut self,
        family: &str,
        bold: bool,
        italic: bool,
        bytes: Vec<u8>,
    ) -> Result<(), FontError> {
        let face = ttf_parser::Face::parse(&bytes, 0).map_err(|e| FontError::Parse(e.to_string()))?;

        let data = FontData {
            units_per_em: face.units_per_em() as f32,
            ascender: face.ascender() as f32,
            descender: face.descender() as f32,
            line_gap: face.line_gap() as f32,
            bytes,
        };

        let key = FontKey::new(family, bold, italic);
        if self.fonts.is_empty() {
            self.default_key = key.clone();
        }
        log::debug!("registered font face {key:?}");
        self.fonts.insert(key, data);
        Ok(())
    }

    /// Load a font file, registering it under the family named by its file
    /// stem (`JetBrainsMono-Bold.ttf` → family `jetbrainsmono`, bold).
    pub fn load_font_file(&mut self, path: &Path) -> Result<(), FontError> {
        let bytes = std::fs::read(path).map_err(|source| FontError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("font")
            .to_string();
        let (family, style) = stem.split_once('-').unwrap_or((&stem, "Regular"));
        let style = style.to_ascii_lowercase();
        let bold = style.contains("bold");
        let italic = style.contains("italic") || style.contains("oblique");
        self.load_font(family, bold, italic, bytes)
    }

    /// Register a builtin font with synthetic metrics (for when no TTF is
    /// available). Uses Helvetica-like metrics.
    pub fn ensure_default(&mut self) {
        if self.fonts.is_empty() {
            let key = FontKey::new("Helvetica", false, false);
            self.fonts.insert(key.clone(), FontData::synthetic());
            self.default_key = key;
            self.fonts
                .insert(FontKey::new("Helvetica", true, false), FontData::synthetic());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Get font data for a key, falling back to the same family in regular
    /// weight, then to the default face.
    pub fn get(&self, key: &FontKey) -> Option<&FontData> {
        self.fonts
            .get(key)
            .or_else(|| self.fonts.get(&FontKey::new(&key.family, false, false)))
            .or_else(|| self.fonts.get(&self.default_key))
    }

    /// Measure the width of a string at a given font size (in px).
    /// If we have actual font bytes, we parse glyph advances. Otherwise we
    /// use an average character width heuristic (0.5 × font_size per char,
    /// 0.6 for fixed-pitch families).
    pub fn measure_text_width(
        &self,
        text: &str,
        font_size: f32,
        bold: bool,
        italic: bool,
        family: &str,
    ) -> f32 {
        let key = FontKey::new(family, bold, italic);
        let heuristic = |avg: f32| text.chars().count() as f32 * font_size * avg;
        let avg = if is_monospace_family(family) {
            0.6
        } else if bold {
            0.55
        } else {
            0.5
        };

        let data = match self.get(&key) {
            Some(d) if !d.bytes.is_empty() => d,
            _ => return heuristic(avg),
        };

        // Parse the font and sum horizontal advances
        match ttf_parser::Face::parse(&data.bytes, 0) {
            Ok(face) => {
                let scale = font_size / data.units_per_em;
                text.chars()
                    .map(|ch| match face.glyph_index(ch) {
                        Some(gid) => face.glyph_hor_advance(gid).unwrap_or(0) as f32 * scale,
                        None => font_size * avg,
                    })
                    .sum()
            }
            Err(_) => heuristic(avg),
        }
    }

    /// Measure the line height in px.
    pub fn line_height_px(&self, font_size: f32, line_height_factor: f32) -> f32 {
        font_size * line_height_factor
    }

    /// Check if real font bytes are loaded for the default font.
    pub fn has_real_fonts(&self) -> bool {
        self.fonts
            .get(&self.default_key)
            .map(|d| !d.bytes.is_empty())
            .unwrap_or(false)
    }
}

impl Default for FontManager {
    fn default() -> Self {
        let mut mgr = Self::new();
        mgr.ensure_default();
        mgr
    }
}

/// Text measurement parameters shared by every line of one text run.
#[derive(Debug, Clone, Copy)]
pub struct TextRun<'a> {
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub family: &'a str,
}

/// Word-wrap text to fit within `max_width` pixels. Returns a vec of lines.
///
/// Existing newlines always start a new line. A single word wider than
/// `max_width` stays on its own line rather than being broken.
pub fn wrap_text(text: &str, run: TextRun<'_>, max_width: f32, fonts: &FontManager) -> Vec<String> {
    if max_width <= 0.0 || text.is_empty() {
        return vec![text.to_string()];
    }

    let mut lines: Vec<String> = Vec::new();
    // Split on existing newlines first
    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current_line = String::new();
        for word in &words {
            let candidate = if current_line.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current_line, word)
            };
            let w = fonts.measure_text_width(&candidate, run.font_size, run.bold, run.italic, run.family);
            if w > max_width && !current_line.is_empty() {
                lines.push(current_line);
                current_line = word.to_string();
            } else {
                current_line = candidate;
            }
        }
        if !current_line.is_empty() {
            lines.push(current_line);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
