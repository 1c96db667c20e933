// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! This module provides the coordinate mapping between the three spaces
//! the editor works in: on-screen device pixels, natural image pixels,
//! and the 0..1000 normalized box scale.

use crate::models::bubble::{NormBox, NORM_SCALE};
use egui::{pos2, Pos2, Rect, Vec2};

/// Zoom factor bounds.
pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 5.0;

/// Visual padding subtracted from the viewport when computing the fit scale.
pub const FIT_PADDING: f32 = 40.0;

/// The mapping from natural image pixels to on-screen device pixels.
///
/// The displayed scale is `fit_scale * zoom_level`; `scroll` is the offset
/// of the viewport into the scaled content. Not part of the persisted
/// document state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    /// Scale that fits the full image in the viewport at zoom 1 (capped at 1.0).
    pub fit_scale: f32,
    /// User zoom factor, clamped to [`MIN_ZOOM`]..[`MAX_ZOOM`].
    pub zoom_level: f32,
    /// Scroll offset of the viewport into the scaled content, in device pixels.
    pub scroll: Vec2,
}

impl ViewTransform {
    pub fn new() -> Self {
        Self {
            fit_scale: 1.0,
            zoom_level: 1.0,
            scroll: Vec2::ZERO,
        }
    }

    pub fn display_scale(&self) -> f32 {
        self.fit_scale * self.zoom_level
    }

    /// Recompute the fit scale for the given viewport and image size.
    ///
    /// Called whenever either changes; leaves zoom and scroll untouched.
    pub fn fit_to_viewport(&mut self, viewport: Vec2, natural: (u32, u32)) {
        let avail_w = (viewport.x - FIT_PADDING).max(0.0);
        let avail_h = (viewport.y - FIT_PADDING).max(0.0);
        let scale_x = avail_w / natural.0.max(1) as f32;
        let scale_y = avail_h / natural.1.max(1) as f32;
        // Fit within the viewport, never upscale past 100% at zoom 1
        self.fit_scale = scale_x.min(scale_y).min(1.0);
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom_level = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Zoom centered on a viewport point, keeping the content under the
    /// pointer visually stationary.
    ///
    /// The content coordinate under the pointer is computed before the zoom
    /// change, then the scroll offset is re-solved so the same coordinate
    /// renders under the pointer again.
    pub fn zoom_at(&mut self, pointer: Vec2, new_zoom: f32) {
        let old_scale = self.display_scale();
        if old_scale <= 0.0 {
            self.set_zoom(new_zoom);
            return;
        }
        let content = (self.scroll + pointer) / old_scale;
        self.set_zoom(new_zoom);
        self.scroll = content * self.display_scale() - pointer;
    }

    /// Reset zoom and scroll to their defaults.
    pub fn reset(&mut self) {
        self.zoom_level = 1.0;
        self.scroll = Vec2::ZERO;
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a point in screen space to natural image pixels by dividing out
/// the on-screen rectangle's scale factors.
///
/// Returns `None` when the rectangle is degenerate (image not laid out yet).
pub fn screen_to_natural(pos: Pos2, image_rect: Rect, natural: (u32, u32)) -> Option<Pos2> {
    if image_rect.width() <= 0.0 || image_rect.height() <= 0.0 {
        return None;
    }
    let scale_x = natural.0 as f32 / image_rect.width();
    let scale_y = natural.1 as f32 / image_rect.height();
    Some(pos2(
        (pos.x - image_rect.min.x) * scale_x,
        (pos.y - image_rect.min.y) * scale_y,
    ))
}

/// Convert natural image pixels back to screen space.
pub fn natural_to_screen(pos: Pos2, image_rect: Rect, natural: (u32, u32)) -> Pos2 {
    let scale_x = image_rect.width() / natural.0.max(1) as f32;
    let scale_y = image_rect.height() / natural.1.max(1) as f32;
    pos2(
        image_rect.min.x + pos.x * scale_x,
        image_rect.min.y + pos.y * scale_y,
    )
}

/// Convert natural pixels to the 0..1000 normalized scale.
pub fn natural_to_norm(pos: Pos2, natural: (u32, u32)) -> (f32, f32) {
    (
        pos.x / natural.0.max(1) as f32 * NORM_SCALE,
        pos.y / natural.1.max(1) as f32 * NORM_SCALE,
    )
}

/// Convert a normalized coordinate pair to natural pixels.
pub fn norm_to_natural(nx: f32, ny: f32, natural: (u32, u32)) -> Pos2 {
    pos2(
        nx / NORM_SCALE * natural.0 as f32,
        ny / NORM_SCALE * natural.1 as f32,
    )
}

/// Natural-pixel rectangle of a normalized box.
pub fn norm_box_to_natural_rect(bounds: &NormBox, natural: (u32, u32)) -> Rect {
    Rect::from_min_max(
        norm_to_natural(bounds.xmin, bounds.ymin, natural),
        norm_to_natural(bounds.xmax, bounds.ymax, natural),
    )
}

/// Build a normalized box from two natural-pixel corners, rounding to the
/// integer wire scale.
pub fn norm_box_from_natural(a: Pos2, b: Pos2, natural: (u32, u32)) -> NormBox {
    let (ax, ay) = natural_to_norm(a, natural);
    let (bx, by) = natural_to_norm(b, natural);
    NormBox::new(
        ax.min(bx).round(),
        ay.min(by).round(),
        ax.max(bx).round(),
        ay.max(by).round(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::vec2;

    #[test]
    fn test_screen_natural_norm_roundtrip() {
        // Image shown at display scale 0.5 with an offset origin
        let natural = (1920, 1080);
        let image_rect = Rect::from_min_size(pos2(33.0, 57.0), vec2(960.0, 540.0));
        let device = pos2(400.0, 300.0);

        let nat = screen_to_natural(device, image_rect, natural).unwrap();
        let (nx, ny) = natural_to_norm(nat, natural);
        let nat_back = norm_to_natural(nx, ny, natural);
        let device_back = natural_to_screen(nat_back, image_rect, natural);

        assert!((device_back.x - device.x).abs() < 1.0);
        assert!((device_back.y - device.y).abs() < 1.0);
    }

    #[test]
    fn test_degenerate_rect_maps_to_none() {
        let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(0.0, 100.0));
        assert!(screen_to_natural(pos2(5.0, 5.0), rect, (100, 100)).is_none());
    }

    #[test]
    fn test_fit_scale_is_capped_at_one() {
        let mut view = ViewTransform::new();
        view.fit_to_viewport(vec2(4000.0, 4000.0), (100, 100));
        assert_eq!(view.fit_scale, 1.0);

        view.fit_to_viewport(vec2(540.0, 1040.0), (1000, 2000));
        assert!((view.fit_scale - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut view = ViewTransform::new();
        view.set_zoom(99.0);
        assert_eq!(view.zoom_level, MAX_ZOOM);
        view.set_zoom(0.0);
        assert_eq!(view.zoom_level, MIN_ZOOM);
    }

    #[test]
    fn test_zoom_at_keeps_cursor_point_stationary() {
        let mut view = ViewTransform {
            fit_scale: 0.8,
            zoom_level: 1.0,
            scroll: vec2(120.0, 80.0),
        };
        let pointer = vec2(250.0, 180.0);

        let before = (view.scroll + pointer) / view.display_scale();
        view.zoom_at(pointer, 2.5);
        let after = (view.scroll + pointer) / view.display_scale();

        // Same content coordinate renders under the pointer (within a pixel
        // once mapped back to device space)
        assert!((before.x - after.x).abs() * view.display_scale() < 1.0);
        assert!((before.y - after.y).abs() * view.display_scale() < 1.0);
    }

    #[test]
    fn test_drawn_region_maps_to_expected_box() {
        // Drawing from device (100,100) to (300,220) over a 1000x1000 image
        // shown at display scale 0.5
        let natural = (1000, 1000);
        let image_rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(500.0, 500.0));

        let a = screen_to_natural(pos2(100.0, 100.0), image_rect, natural).unwrap();
        let b = screen_to_natural(pos2(300.0, 220.0), image_rect, natural).unwrap();
        let bounds = norm_box_from_natural(a, b, natural);

        assert_eq!(bounds.xmin, 200.0);
        assert_eq!(bounds.ymin, 200.0);
        assert_eq!(bounds.xmax, 600.0);
        assert_eq!(bounds.ymax, 440.0);
    }

    #[test]
    fn test_norm_box_natural_rect() {
        let bounds = NormBox::new(100.0, 200.0, 600.0, 800.0);
        let rect = norm_box_to_natural_rect(&bounds, (2000, 1000));
        assert_eq!(rect.min, pos2(200.0, 200.0));
        assert_eq!(rect.max, pos2(1200.0, 800.0));
    }
}
