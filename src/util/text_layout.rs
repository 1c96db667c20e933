// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Text wrapping and font fitting for bubble lettering.
//!
//! Fitting is a discrete search over font sizes, re-wrapping at each
//! candidate, not continuous layout. Measurement goes through the
//! [`TextMeasure`] trait so the algorithm stays deterministic and
//! testable without a GUI or a loaded font.

use crate::models::bubble::BubbleShape;

/// Inner padding between the box edge and the text area, per side.
pub const TEXT_PADDING: f32 = 8.0;

/// Extra shrink factor keeping text inscribed within an ellipse.
pub const ELLIPSE_TEXT_SCALE: f32 = 0.85;

/// Floor of the automatic font-size search.
pub const MIN_FONT_SIZE: f32 = 10.0;

/// Cap of the automatic starting font size.
pub const MAX_AUTO_FONT_SIZE: f32 = 120.0;

/// Slack allowed on measured line width, in pixels.
pub const WIDTH_TOLERANCE: f32 = 2.0;

/// Width measurement of a single line of text at a font size.
pub trait TextMeasure {
    fn text_width(&self, text: &str, font_size: f32) -> f32;
}

/// Result of laying out a bubble's text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub lines: Vec<String>,
    pub font_size: f32,
    pub line_height: f32,
}

impl TextLayout {
    pub fn block_height(&self) -> f32 {
        self.lines.len() as f32 * self.line_height
    }
}

/// Split text into wrap atoms: whitespace-separated words, with words
/// containing hyphens split further so the hyphen stays attached to the
/// end of every piece except the last.
fn split_atoms(text: &str) -> Vec<String> {
    let mut atoms = Vec::new();
    for word in text.split_whitespace() {
        if word.contains('-') {
            let parts: Vec<&str> = word.split('-').collect();
            let last = parts.len() - 1;
            for (i, part) in parts.iter().enumerate() {
                if i < last {
                    atoms.push(format!("{part}-"));
                } else if !part.is_empty() {
                    atoms.push(part.to_string());
                }
            }
        } else {
            atoms.push(word.to_string());
        }
    }
    atoms
}

/// Greedily wrap text to the available width at a fixed font size.
///
/// Atoms accumulate into the current line, joined by a space unless the
/// previous atom ends in a hyphen; an atom that would overflow starts a
/// new line.
pub fn wrap_text(measure: &dyn TextMeasure, text: &str, max_width: f32, font_size: f32) -> Vec<String> {
    let atoms = split_atoms(text);
    let Some(first) = atoms.first() else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    let mut current = first.clone();
    for atom in &atoms[1..] {
        let separator = if current.ends_with('-') { "" } else { " " };
        let candidate = format!("{current}{separator}{atom}");
        if measure.text_width(&candidate, font_size) > max_width {
            lines.push(current);
            current = atom.clone();
        } else {
            current = candidate;
        }
    }
    lines.push(current);
    lines
}

/// Wrap and size text for a bubble's box.
///
/// With an explicit font size the text is wrapped once and never shrunk.
/// Otherwise the size search starts at `floor(box_h * 0.6)` (capped) and
/// decreases in steps of 2 down to [`MIN_FONT_SIZE`], accepting the first
/// size where every line fits the available width (plus tolerance) and the
/// block fits the available height; if none does, the floor size is used
/// regardless.
pub fn layout_text(
    measure: &dyn TextMeasure,
    text: &str,
    box_w: f32,
    box_h: f32,
    shape: BubbleShape,
    explicit_size: Option<f32>,
    line_height_mult: f32,
) -> TextLayout {
    let (inner_w, inner_h) = match shape {
        BubbleShape::Ellipse => (box_w * ELLIPSE_TEXT_SCALE, box_h * ELLIPSE_TEXT_SCALE),
        BubbleShape::Rectangle => (box_w, box_h),
    };
    let avail_w = (inner_w - TEXT_PADDING * 2.0).max(10.0);
    let avail_h = (inner_h - TEXT_PADDING * 2.0).max(10.0);

    if let Some(size) = explicit_size {
        let lines = wrap_text(measure, text, avail_w, size);
        return TextLayout {
            lines,
            font_size: size,
            line_height: size * line_height_mult,
        };
    }

    let mut font_size = (box_h * 0.6).floor().min(MAX_AUTO_FONT_SIZE);
    while font_size >= MIN_FONT_SIZE {
        let lines = wrap_text(measure, text, avail_w, font_size);
        let fits_width = lines
            .iter()
            .all(|line| measure.text_width(line, font_size) <= avail_w + WIDTH_TOLERANCE);
        let fits_height = lines.len() as f32 * font_size * line_height_mult <= avail_h;
        if fits_width && fits_height {
            return TextLayout {
                lines,
                font_size,
                line_height: font_size * line_height_mult,
            };
        }
        font_size -= 2.0;
    }

    let lines = wrap_text(measure, text, avail_w, MIN_FONT_SIZE);
    TextLayout {
        lines,
        font_size: MIN_FONT_SIZE,
        line_height: MIN_FONT_SIZE * line_height_mult,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixed-advance measurer: every char is half the font size wide.
    struct FixedMeasure;

    impl TextMeasure for FixedMeasure {
        fn text_width(&self, text: &str, font_size: f32) -> f32 {
            text.chars().count() as f32 * font_size * 0.5
        }
    }

    #[test]
    fn test_atoms_split_on_hyphens() {
        assert_eq!(split_atoms("well-known fact"), vec!["well-", "known", "fact"]);
        assert_eq!(split_atoms("a--b"), vec!["a-", "-", "b"]);
        assert_eq!(split_atoms("trailing- x"), vec!["trailing-", "x"]);
        assert!(split_atoms("   ").is_empty());
    }

    #[test]
    fn test_wrap_breaks_on_overflow() {
        // Width 60 at size 10 fits 12 chars per line
        let lines = wrap_text(&FixedMeasure, "one two three four", 60.0, 10.0);
        assert_eq!(lines, vec!["one two", "three four"]);
    }

    #[test]
    fn test_hyphen_join_has_no_space() {
        let lines = wrap_text(&FixedMeasure, "semi-transparent", 200.0, 10.0);
        assert_eq!(lines, vec!["semi-transparent"]);
    }

    #[test]
    fn test_wrapping_is_idempotent() {
        let a = wrap_text(&FixedMeasure, "the quick brown-ish fox jumps", 55.0, 12.0);
        let b = wrap_text(&FixedMeasure, "the quick brown-ish fox jumps", 55.0, 12.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_explicit_size_never_shrinks() {
        let layout = layout_text(
            &FixedMeasure,
            "far too much text for this tiny box to ever hold",
            60.0,
            40.0,
            BubbleShape::Rectangle,
            Some(40.0),
            1.1,
        );
        assert_eq!(layout.font_size, 40.0);
        assert!((layout.line_height - 44.0).abs() < 1e-4);
    }

    #[test]
    fn test_auto_fit_respects_both_axes() {
        let layout = layout_text(
            &FixedMeasure,
            "hello there friend",
            200.0,
            100.0,
            BubbleShape::Rectangle,
            None,
            1.1,
        );
        let avail_w = 200.0 - TEXT_PADDING * 2.0;
        let avail_h = 100.0 - TEXT_PADDING * 2.0;
        for line in &layout.lines {
            assert!(FixedMeasure.text_width(line, layout.font_size) <= avail_w + WIDTH_TOLERANCE);
        }
        assert!(layout.block_height() <= avail_h);
        assert!(layout.font_size >= MIN_FONT_SIZE);
    }

    #[test]
    fn test_fit_is_monotonic_in_box_size() {
        let text = "a moderately long piece of dialogue";
        let large = layout_text(&FixedMeasure, text, 400.0, 200.0, BubbleShape::Rectangle, None, 1.1);
        let small = layout_text(&FixedMeasure, text, 280.0, 140.0, BubbleShape::Rectangle, None, 1.1);
        assert!(small.font_size <= large.font_size);
    }

    #[test]
    fn test_unfittable_text_uses_floor_size() {
        let layout = layout_text(
            &FixedMeasure,
            "this text cannot possibly fit in such a small region at any legal size",
            40.0,
            30.0,
            BubbleShape::Ellipse,
            None,
            1.1,
        );
        assert_eq!(layout.font_size, MIN_FONT_SIZE);
        assert!(!layout.lines.is_empty());
    }

    #[test]
    fn test_ellipse_insets_available_area() {
        let text = "some words that wrap";
        let rect = layout_text(&FixedMeasure, text, 200.0, 120.0, BubbleShape::Rectangle, None, 1.1);
        let ellipse = layout_text(&FixedMeasure, text, 200.0, 120.0, BubbleShape::Ellipse, None, 1.1);
        assert!(ellipse.font_size <= rect.font_size);
    }

    #[test]
    fn test_empty_text_lays_out_empty() {
        let layout = layout_text(&FixedMeasure, "", 100.0, 100.0, BubbleShape::Rectangle, None, 1.1);
        assert!(layout.lines.is_empty());
    }
}
