// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Lettering font loading and text measurement.
//!
//! A single font face backs both the layout engine's measurements and the
//! export compositor's glyph outlines. When no face can be loaded the
//! editor falls back to per-character width estimation so layout still
//! behaves deterministically.

use crate::util::text_layout::TextMeasure;
use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::sync::Arc;
use ttf_parser::Face;

/// Environment variable naming the lettering font file.
pub const FONT_ENV_VAR: &str = "COLT_FONT";

/// System font files probed when `COLT_FONT` is unset.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Comic Sans MS.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\comic.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// A parsed font face with the metrics needed for advance-width measurement.
#[derive(Clone)]
pub struct FontMetrics {
    data: Arc<Vec<u8>>,
    units_per_em: u16,
    space_advance: u16,
    family: Option<String>,
    face_index: u32,
}

impl FontMetrics {
    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// Parse the underlying face again (cheap; `ttf-parser` is zero-copy).
    pub fn face(&self) -> Result<Face<'_>> {
        Face::parse(&self.data, self.face_index).map_err(|e| anyhow!("failed to parse face: {e}"))
    }
}

/// Load font metrics from a font file on disk.
pub fn load_font_metrics(path: &Path) -> Result<FontMetrics> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    load_font_metrics_from_data(&data)
        .map_err(|err| anyhow!("failed to parse font: {} ({})", path.display(), err))
}

fn load_font_metrics_from_data(data: &[u8]) -> Result<FontMetrics> {
    let count = ttf_parser::fonts_in_collection(data).unwrap_or(1);
    for index in 0..count {
        if let Ok(face) = Face::parse(data, index) {
            let units_per_em = face.units_per_em().max(1);
            let space_advance = face
                .glyph_index(' ')
                .and_then(|id| face.glyph_hor_advance(id))
                .unwrap_or(units_per_em / 2);
            let family = extract_family_name(&face);
            return Ok(FontMetrics {
                data: Arc::new(data.to_vec()),
                units_per_em,
                space_advance,
                family,
                face_index: index,
            });
        }
    }
    Err(anyhow!("failed to parse font data"))
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    use ttf_parser::name_id;
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

/// Find the lettering font: `COLT_FONT` first, then common system paths.
pub fn discover_font() -> Option<FontMetrics> {
    if let Ok(path) = std::env::var(FONT_ENV_VAR) {
        match load_font_metrics(Path::new(&path)) {
            Ok(metrics) => {
                log::info!(
                    "Loaded lettering font from {FONT_ENV_VAR}: {}",
                    metrics.family().unwrap_or("unnamed")
                );
                return Some(metrics);
            }
            Err(e) => log::warn!("Ignoring {FONT_ENV_VAR}: {e}"),
        }
    }
    for candidate in FONT_CANDIDATES {
        if let Ok(metrics) = load_font_metrics(Path::new(candidate)) {
            log::info!(
                "Loaded lettering font {} ({})",
                candidate,
                metrics.family().unwrap_or("unnamed")
            );
            return Some(metrics);
        }
    }
    log::warn!("No lettering font found; falling back to width estimation");
    None
}

impl TextMeasure for FontMetrics {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let Ok(face) = Face::parse(&self.data, self.face_index) else {
            return EstimateMeasure.text_width(text, font_size);
        };
        let mut advance = 0u32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            if ch == ' ' {
                advance = advance.saturating_add(self.space_advance as u32);
                continue;
            }
            if let Some(glyph) = face.glyph_index(ch) {
                let glyph_advance = face.glyph_hor_advance(glyph).unwrap_or(self.space_advance);
                advance = advance.saturating_add(glyph_advance as u32);
            } else {
                advance = advance.saturating_add(self.space_advance as u32);
            }
        }
        advance as f32 * (font_size / self.units_per_em as f32)
    }
}

/// Width estimation by character class, used when no font face is available.
pub struct EstimateMeasure;

fn estimate_char_units(ch: char) -> f32 {
    if ch.is_whitespace() {
        0.25
    } else if ch.is_ascii_alphanumeric() {
        0.55
    } else if ch.is_ascii() {
        0.35
    } else if matches!(
        ch as u32,
        0x4E00..=0x9FFF | 0x3040..=0x30FF | 0x31F0..=0x31FF
    ) {
        1.0
    } else {
        0.9
    }
}

impl TextMeasure for EstimateMeasure {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars().map(estimate_char_units).sum::<f32>() * font_size
    }
}

/// The measurer the app actually uses: a loaded face, or the estimator.
pub enum Measurer {
    Font(FontMetrics),
    Estimate(EstimateMeasure),
}

impl Measurer {
    pub fn discover() -> Self {
        match discover_font() {
            Some(metrics) => Measurer::Font(metrics),
            None => Measurer::Estimate(EstimateMeasure),
        }
    }

    pub fn font(&self) -> Option<&FontMetrics> {
        match self {
            Measurer::Font(metrics) => Some(metrics),
            Measurer::Estimate(_) => None,
        }
    }
}

impl TextMeasure for Measurer {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        match self {
            Measurer::Font(metrics) => metrics.text_width(text, font_size),
            Measurer::Estimate(estimate) => estimate.text_width(text, font_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_scales_linearly_with_size() {
        let narrow = EstimateMeasure.text_width("hello world", 10.0);
        let wide = EstimateMeasure.text_width("hello world", 20.0);
        assert!((wide - narrow * 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_estimate_cjk_wider_than_ascii() {
        let ascii = EstimateMeasure.text_width("ab", 16.0);
        let cjk = EstimateMeasure.text_width("漫画", 16.0);
        assert!(cjk > ascii);
    }

    #[test]
    fn test_estimate_is_additive() {
        let a = EstimateMeasure.text_width("foo", 12.0);
        let b = EstimateMeasure.text_width("bar", 12.0);
        let joined = EstimateMeasure.text_width("foobar", 12.0);
        assert!((joined - (a + b)).abs() < 1e-3);
    }

    #[test]
    fn test_garbage_font_data_is_rejected() {
        assert!(load_font_metrics_from_data(&[0u8; 16]).is_err());
    }
}
