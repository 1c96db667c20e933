// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Final page compositing.
//!
//! Renders the base image plus all bubbles (fills, opacity, laid-out
//! lettering) into an RGBA buffer at the image's natural resolution.
//! This is the readable artifact a host consumes for downstream export;
//! file encoding happens here, archival packaging does not.

use crate::models::bubble::{Bubble, BubbleShape};
use crate::util::color::parse_hex;
use crate::util::font::FontMetrics;
use crate::util::geometry::norm_box_to_natural_rect;
use crate::util::text_layout::{layout_text, TextMeasure};
use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use std::path::Path;
use tiny_skia::{FillRule, IntSize, Paint, Path as SkiaPath, PathBuilder, Pixmap, Transform};
use ttf_parser::{Face, OutlineBuilder};

/// Corner radius of rectangular bubble fills, in natural pixels.
const RECT_CORNER_RADIUS: f32 = 4.0;

/// Composite the page at natural resolution.
///
/// Bubbles without translated text get the same translucent white
/// placeholder the editor shows. Lettering requires a font face; without
/// one, fills are still composited and glyphs are skipped with a warning.
pub fn compose_page(
    image: &RgbaImage,
    bubbles: &[Bubble],
    measure: &dyn TextMeasure,
    font: Option<&FontMetrics>,
) -> Result<RgbaImage> {
    let (width, height) = (image.width(), image.height());
    let size = IntSize::from_wh(width, height).ok_or_else(|| anyhow!("empty image"))?;
    // Base pixels are fully opaque, so straight RGBA is already premultiplied
    let mut pixmap = Pixmap::from_vec(image.as_raw().clone(), size)
        .ok_or_else(|| anyhow!("pixel buffer size mismatch"))?;

    let natural = (width, height);
    let mut missing_font_logged = false;

    for bubble in bubbles {
        let rect = norm_box_to_natural_rect(&bubble.bounds, natural);
        let (x, y, w, h) = (rect.min.x, rect.min.y, rect.width(), rect.height());
        if w <= 0.0 || h <= 0.0 {
            continue;
        }

        let Some(path) = shape_path(bubble.shape, x, y, w, h) else {
            continue;
        };

        let mut paint = Paint::default();
        paint.anti_alias = true;
        if bubble.has_text() {
            let [r, g, b] = parse_hex(&bubble.background_color).unwrap_or([255, 255, 255]);
            let alpha = (bubble.opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
            paint.set_color_rgba8(r, g, b, alpha);
        } else {
            // Unfilled region placeholder, as in the editor
            paint.set_color_rgba8(255, 255, 255, 77);
        }
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);

        if !bubble.has_text() {
            continue;
        }
        let Some(metrics) = font else {
            if !missing_font_logged {
                log::warn!("No font face loaded; composited page has fills but no lettering");
                missing_font_logged = true;
            }
            continue;
        };

        let layout = layout_text(
            measure,
            &bubble.translated_text,
            w,
            h,
            bubble.shape,
            bubble.font_size,
            bubble.line_height_or_default(),
        );
        let [tr, tg, tb] = parse_hex(&bubble.text_color).unwrap_or([0, 0, 0]);
        let mut text_paint = Paint::default();
        text_paint.anti_alias = true;
        text_paint.set_color_rgba8(tr, tg, tb, 255);

        let face = metrics.face()?;
        let center_x = x + w / 2.0;
        let center_y = y + h / 2.0;
        let block_top = center_y - layout.block_height() / 2.0;

        for (index, line) in layout.lines.iter().enumerate() {
            let line_center_y = block_top + index as f32 * layout.line_height + layout.line_height / 2.0;
            let line_width = measure.text_width(line, layout.font_size);
            let pen_x = center_x - line_width / 2.0;
            draw_line(
                &mut pixmap,
                &face,
                line,
                layout.font_size,
                pen_x,
                line_center_y,
                &text_paint,
            );
        }
    }

    RgbaImage::from_raw(width, height, pixmap.take())
        .ok_or_else(|| anyhow!("composited buffer size mismatch"))
}

/// Encode and save a composited page; format follows the file extension.
pub fn save_image(image: &RgbaImage, path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase());
    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => {
            let rgb = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            rgb.save(path)
                .with_context(|| format!("failed to save image: {}", path.display()))?;
        }
        _ => {
            image
                .save(path)
                .with_context(|| format!("failed to save image: {}", path.display()))?;
        }
    }
    Ok(())
}

/// Build the fill path for a bubble shape in natural pixels.
fn shape_path(shape: BubbleShape, x: f32, y: f32, w: f32, h: f32) -> Option<SkiaPath> {
    let mut pb = PathBuilder::new();
    match shape {
        BubbleShape::Ellipse => {
            pb.push_oval(tiny_skia::Rect::from_xywh(x, y, w, h)?);
        }
        BubbleShape::Rectangle => {
            let r = RECT_CORNER_RADIUS.min(w / 2.0).min(h / 2.0);
            pb.move_to(x + r, y);
            pb.line_to(x + w - r, y);
            pb.quad_to(x + w, y, x + w, y + r);
            pb.line_to(x + w, y + h - r);
            pb.quad_to(x + w, y + h, x + w - r, y + h);
            pb.line_to(x + r, y + h);
            pb.quad_to(x, y + h, x, y + h - r);
            pb.line_to(x, y + r);
            pb.quad_to(x, y, x + r, y);
            pb.close();
        }
    }
    pb.finish()
}

/// Translates font-unit glyph outlines (y-up) into a pixel-space path.
struct GlyphOutline {
    pb: PathBuilder,
    scale: f32,
    origin_x: f32,
    baseline_y: f32,
}

impl OutlineBuilder for GlyphOutline {
    fn move_to(&mut self, x: f32, y: f32) {
        self.pb
            .move_to(self.origin_x + x * self.scale, self.baseline_y - y * self.scale);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.pb
            .line_to(self.origin_x + x * self.scale, self.baseline_y - y * self.scale);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.pb.quad_to(
            self.origin_x + x1 * self.scale,
            self.baseline_y - y1 * self.scale,
            self.origin_x + x * self.scale,
            self.baseline_y - y * self.scale,
        );
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.pb.cubic_to(
            self.origin_x + x1 * self.scale,
            self.baseline_y - y1 * self.scale,
            self.origin_x + x2 * self.scale,
            self.baseline_y - y2 * self.scale,
            self.origin_x + x * self.scale,
            self.baseline_y - y * self.scale,
        );
    }

    fn close(&mut self) {
        self.pb.close();
    }
}

/// Rasterize one laid-out line, vertically centered on `line_center_y`.
fn draw_line(
    pixmap: &mut Pixmap,
    face: &Face<'_>,
    line: &str,
    font_size: f32,
    start_x: f32,
    line_center_y: f32,
    paint: &Paint<'_>,
) {
    let units_per_em = face.units_per_em().max(1) as f32;
    let scale = font_size / units_per_em;
    let space_advance = face
        .glyph_index(' ')
        .and_then(|id| face.glyph_hor_advance(id))
        .unwrap_or((units_per_em / 2.0) as u16);
    // Center the em box on the line: the baseline sits below the visual
    // middle by half of (ascender + descender)
    let baseline_y =
        line_center_y + (face.ascender() as f32 + face.descender() as f32) * 0.5 * scale;

    let mut pen_x = start_x;
    for ch in line.chars() {
        if ch == ' ' {
            pen_x += space_advance as f32 * scale;
            continue;
        }
        let Some(glyph) = face.glyph_index(ch) else {
            pen_x += space_advance as f32 * scale;
            continue;
        };
        let mut outline = GlyphOutline {
            pb: PathBuilder::new(),
            scale,
            origin_x: pen_x,
            baseline_y,
        };
        if face.outline_glyph(glyph, &mut outline).is_some() {
            if let Some(path) = outline.pb.finish() {
                pixmap.fill_path(&path, paint, FillRule::Winding, Transform::identity(), None);
            }
        }
        pen_x += face.glyph_hor_advance(glyph).unwrap_or(space_advance) as f32 * scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bubble::{Bubble, NormBox};
    use crate::util::font::EstimateMeasure;
    use image::Rgba;

    fn white_page(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]))
    }

    #[test]
    fn test_filled_bubble_paints_its_region() {
        let page = white_page(60, 60);
        let mut bubble = Bubble::new(
            1,
            NormBox::new(250.0, 250.0, 750.0, 750.0),
            BubbleShape::Rectangle,
        );
        bubble.translated_text = "x".into();
        bubble.background_color = "#c80000".into();

        // No font: fill only, no lettering
        let out = compose_page(&page, &[bubble], &EstimateMeasure, None).unwrap();
        assert_eq!(out.get_pixel(30, 30).0, [200, 0, 0, 255]);
        // Outside the box the base survives
        assert_eq!(out.get_pixel(2, 2).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_empty_bubble_gets_translucent_placeholder() {
        let page = RgbaImage::from_pixel(40, 40, Rgba([0, 0, 0, 255]));
        let bubble = Bubble::new(
            1,
            NormBox::new(0.0, 0.0, 1000.0, 1000.0),
            BubbleShape::Rectangle,
        );
        let out = compose_page(&page, &[bubble], &EstimateMeasure, None).unwrap();
        let p = out.get_pixel(20, 20).0;
        // 30% white over black
        assert!(p[0] > 60 && p[0] < 95, "got {:?}", p);
        assert_eq!(p[3], 255);
    }

    #[test]
    fn test_opacity_blends_with_base() {
        let page = white_page(40, 40);
        let mut bubble = Bubble::new(
            1,
            NormBox::new(0.0, 0.0, 1000.0, 1000.0),
            BubbleShape::Rectangle,
        );
        bubble.translated_text = "x".into();
        bubble.background_color = "#000000".into();
        bubble.opacity = 0.5;
        let out = compose_page(&page, &[bubble], &EstimateMeasure, None).unwrap();
        let p = out.get_pixel(20, 20).0;
        assert!(p[0] > 110 && p[0] < 145, "got {:?}", p);
    }

    #[test]
    fn test_ellipse_leaves_corners_untouched() {
        let page = white_page(100, 100);
        let mut bubble = Bubble::new(
            1,
            NormBox::new(0.0, 0.0, 1000.0, 1000.0),
            BubbleShape::Ellipse,
        );
        bubble.translated_text = "x".into();
        bubble.background_color = "#0000c8".into();
        let out = compose_page(&page, &[bubble], &EstimateMeasure, None).unwrap();
        // Center is inside the ellipse, the extreme corner is outside it
        assert_eq!(out.get_pixel(50, 50).0, [0, 0, 200, 255]);
        assert_eq!(out.get_pixel(1, 1).0, [255, 255, 255, 255]);
    }
}
