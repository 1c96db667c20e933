// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Color analysis utilities.
//!
//! This module extracts a representative fill color for a page region
//! (ignoring comic ink lines and the bubble outline itself) and picks a
//! contrasting text color. Sampling failures always collapse to white so
//! callers never observe an error.

use crate::models::bubble::{Bubble, BubbleShape};
use crate::util::geometry::norm_box_to_natural_rect;
use image::RgbaImage;
use std::collections::HashMap;

/// Channel threshold below which a pixel counts as ink lineart.
const INK_THRESHOLD: u8 = 65;

/// Quantization step used to merge screentone/halftone shades.
const QUANT_STEP: u32 = 20;

/// Channel threshold above which the dominant color snaps to pure white.
const NEAR_WHITE: u32 = 230;

/// Parse a `#rrggbb` hex string.
pub fn parse_hex(hex: &str) -> Option<[u8; 3]> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some([r, g, b])
}

/// Format an RGB triple as a `#rrggbb` hex string.
pub fn format_hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

/// Best contrasting text color (black or white) for a background color,
/// using YIQ luminance. Unparseable input gets black.
pub fn contrast_color(hex: &str) -> &'static str {
    let Some([r, g, b]) = parse_hex(hex) else {
        return "#000000";
    };
    let yiq = (299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000;
    if yiq >= 145 {
        "#000000"
    } else {
        "#ffffff"
    }
}

/// Detect the dominant color in a region of the page, as a hex string.
///
/// The region is clamped to the image; degenerate regions return white.
/// Pixels are sampled at a 1-in-4 stride, masked to the central 80% of
/// the shape (so the bubble's own outline is excluded), ink-dark pixels
/// are skipped, and the remaining samples are quantized into a histogram
/// whose mode wins. Near-white winners snap to pure white.
pub fn dominant_color(image: &RgbaImage, x: f32, y: f32, w: f32, h: f32, shape: BubbleShape) -> String {
    if w <= 0.0 || h <= 0.0 {
        return "#ffffff".to_string();
    }

    let safe_x = x.floor().max(0.0) as u32;
    let safe_y = y.floor().max(0.0) as u32;
    if safe_x >= image.width() || safe_y >= image.height() {
        return "#ffffff".to_string();
    }
    let safe_w = (w.floor() as u32).min(image.width() - safe_x);
    let safe_h = (h.floor() as u32).min(image.height() - safe_y);
    if safe_w == 0 || safe_h == 0 {
        return "#ffffff".to_string();
    }

    let cx = safe_w as f32 / 2.0;
    let cy = safe_h as f32 / 2.0;
    let rx_sq = cx * cx;
    let ry_sq = cy * cy;

    let mut counts: HashMap<(u32, u32, u32), u32> = HashMap::new();

    // Sample every 4th pixel of the region
    let total = safe_w as u64 * safe_h as u64;
    let mut index = 0u64;
    while index < total {
        let px = (index % safe_w as u64) as u32;
        let py = (index / safe_w as u64) as u32;
        index += 4;

        let dx = px as f32 - cx;
        let dy = py as f32 - cy;

        // Keep samples inside the central 80% of the shape, away from the outline
        match shape {
            BubbleShape::Ellipse => {
                if rx_sq <= 0.0 || ry_sq <= 0.0 {
                    continue;
                }
                let dist = (dx * dx) / rx_sq + (dy * dy) / ry_sq;
                if dist > 0.8 {
                    continue;
                }
            }
            BubbleShape::Rectangle => {
                if dx.abs() > safe_w as f32 * 0.4 || dy.abs() > safe_h as f32 * 0.4 {
                    continue;
                }
            }
        }

        let pixel = image.get_pixel(safe_x + px, safe_y + py).0;
        let (r, g, b) = (pixel[0], pixel[1], pixel[2]);

        // Ignore very dark pixels, typical for comic lineart
        if r < INK_THRESHOLD && g < INK_THRESHOLD && b < INK_THRESHOLD {
            continue;
        }

        let quantize = |c: u8| (c as f32 / QUANT_STEP as f32).round() as u32 * QUANT_STEP;
        *counts.entry((quantize(r), quantize(g), quantize(b))).or_insert(0) += 1;
    }

    let mut dominant = (255u32, 255u32, 255u32);
    let mut max_count = 0u32;
    for (key, count) in counts {
        if count > max_count {
            max_count = count;
            dominant = key;
        }
    }

    // Force nearly white colors to pure white
    if dominant.0 > NEAR_WHITE && dominant.1 > NEAR_WHITE && dominant.2 > NEAR_WHITE {
        return "#ffffff".to_string();
    }

    format_hex([
        dominant.0.min(255) as u8,
        dominant.1.min(255) as u8,
        dominant.2.min(255) as u8,
    ])
}

/// Assign each bubble a sampled background color and a contrasting text
/// color, in place. Used when ingesting detection results.
pub fn detect_bubble_colors(image: &RgbaImage, bubbles: &mut [Bubble]) {
    let natural = (image.width(), image.height());
    for bubble in bubbles {
        let rect = norm_box_to_natural_rect(&bubble.bounds, natural);
        let color = dominant_color(
            image,
            rect.min.x,
            rect.min.y,
            rect.width(),
            rect.height(),
            bubble.shape,
        );
        bubble.text_color = contrast_color(&color).to_string();
        bubble.background_color = color;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn uniform_image(w: u32, h: u32, rgb: [u8; 3]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([rgb[0], rgb[1], rgb[2], 255]))
    }

    #[test]
    fn test_hex_roundtrip() {
        assert_eq!(parse_hex("#1a2b3c"), Some([0x1a, 0x2b, 0x3c]));
        assert_eq!(format_hex([0x1a, 0x2b, 0x3c]), "#1a2b3c");
        assert_eq!(parse_hex("1a2b3c"), None);
        assert_eq!(parse_hex("#12345"), None);
        assert_eq!(parse_hex("#zzzzzz"), None);
    }

    #[test]
    fn test_contrast_color_thresholds() {
        assert_eq!(contrast_color("#ffffff"), "#000000");
        assert_eq!(contrast_color("#050505"), "#ffffff");
        assert_eq!(contrast_color("not-a-color"), "#000000");
    }

    #[test]
    fn test_uniform_region_returns_its_color() {
        // Channels are multiples of the quantization step and inside the
        // ink/white guard bands, so the color survives exactly
        let image = uniform_image(120, 120, [120, 80, 200]);
        let color = dominant_color(&image, 0.0, 0.0, 120.0, 120.0, BubbleShape::Rectangle);
        assert_eq!(color, "#7850c8");

        let color = dominant_color(&image, 0.0, 0.0, 120.0, 120.0, BubbleShape::Ellipse);
        assert_eq!(color, "#7850c8");
    }

    #[test]
    fn test_ink_lines_are_ignored() {
        // A beige region criss-crossed by black lineart rows
        let mut image = uniform_image(100, 100, [220, 200, 160]);
        for y in (0..100).step_by(5) {
            for x in 0..100 {
                image.put_pixel(x, y, Rgba([10, 10, 10, 255]));
            }
        }
        let color = dominant_color(&image, 0.0, 0.0, 100.0, 100.0, BubbleShape::Rectangle);
        assert_eq!(color, "#dcc8a0");
    }

    #[test]
    fn test_near_white_snaps_to_pure_white() {
        let image = uniform_image(80, 80, [247, 243, 239]);
        let color = dominant_color(&image, 0.0, 0.0, 80.0, 80.0, BubbleShape::Ellipse);
        assert_eq!(color, "#ffffff");
    }

    #[test]
    fn test_degenerate_region_returns_white() {
        let image = uniform_image(50, 50, [120, 80, 200]);
        assert_eq!(
            dominant_color(&image, 0.0, 0.0, 0.0, 10.0, BubbleShape::Rectangle),
            "#ffffff"
        );
        assert_eq!(
            dominant_color(&image, 500.0, 500.0, 10.0, 10.0, BubbleShape::Rectangle),
            "#ffffff"
        );
        assert_eq!(
            dominant_color(&image, 0.0, 0.0, -5.0, 10.0, BubbleShape::Ellipse),
            "#ffffff"
        );
    }

    #[test]
    fn test_detect_bubble_colors_sets_contrast_pair() {
        use crate::models::bubble::{Bubble, NormBox};

        let image = uniform_image(100, 100, [40, 60, 100]);
        // Not ink-dark (green channel >= 65 would fail; use a mid blue)
        let image = {
            let mut img = image;
            for p in img.pixels_mut() {
                *p = Rgba([40, 80, 160, 255]);
            }
            img
        };
        let mut bubbles = vec![Bubble::new(
            1,
            NormBox::new(0.0, 0.0, 1000.0, 1000.0),
            BubbleShape::Rectangle,
        )];
        detect_bubble_colors(&image, &mut bubbles);
        assert_eq!(bubbles[0].background_color, "#2850a0");
        // Dark background gets white text
        assert_eq!(bubbles[0].text_color, "#ffffff");
    }
}
