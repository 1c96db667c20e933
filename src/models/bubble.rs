// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Bubble data structures.
//!
//! This module defines the core data structures for representing
//! text bubbles and their normalized bounding boxes.

use serde::{Deserialize, Serialize};

/// Normalized coordinate scale: boxes are expressed as 0..1000 fractions
/// of the image dimensions, independent of actual resolution.
pub const NORM_SCALE: f32 = 1000.0;

/// Minimum span of a box on either axis, in normalized units.
pub const MIN_SPAN: f32 = 10.0;

/// Default line-height multiplier when a bubble has no explicit one.
pub const DEFAULT_LINE_HEIGHT: f32 = 1.1;

/// A corner resize handle of a bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    Nw,
    Ne,
    Sw,
    Se,
}

/// An axis-aligned bounding box on the 0..1000 normalized scale.
///
/// Invariant: `xmin < xmax` and `ymin < ymax`, with a span of at least
/// [`MIN_SPAN`] units on each axis. Mutations that would violate this
/// are clamped rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormBox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

impl NormBox {
    pub fn new(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Self {
        Self { xmin, ymin, xmax, ymax }
    }

    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }

    /// Check the box ordering invariant.
    pub fn is_valid(&self) -> bool {
        self.xmin < self.xmax && self.ymin < self.ymax
    }

    /// Point-in-box test in normalized coordinates (edges inclusive).
    pub fn contains(&self, nx: f32, ny: f32) -> bool {
        nx >= self.xmin && nx <= self.xmax && ny >= self.ymin && ny <= self.ymax
    }

    /// Rigid translation of all four corners by a normalized delta.
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self {
            xmin: self.xmin + dx,
            ymin: self.ymin + dy,
            xmax: self.xmax + dx,
            ymax: self.ymax + dy,
        }
    }

    /// Recompute the grabbed corner from a pointer position in normalized
    /// coordinates. The two edges adjacent to the corner move, the opposite
    /// edges stay fixed, and each moving edge is clamped so the span never
    /// drops below [`MIN_SPAN`].
    pub fn resized(&self, handle: Handle, nx: f32, ny: f32) -> Self {
        let mut out = *self;
        match handle {
            Handle::Nw => {
                out.xmin = nx.min(self.xmax - MIN_SPAN);
                out.ymin = ny.min(self.ymax - MIN_SPAN);
            }
            Handle::Ne => {
                out.xmax = nx.max(self.xmin + MIN_SPAN);
                out.ymin = ny.min(self.ymax - MIN_SPAN);
            }
            Handle::Sw => {
                out.xmin = nx.min(self.xmax - MIN_SPAN);
                out.ymax = ny.max(self.ymin + MIN_SPAN);
            }
            Handle::Se => {
                out.xmax = nx.max(self.xmin + MIN_SPAN);
                out.ymax = ny.max(self.ymin + MIN_SPAN);
            }
        }
        out
    }
}

/// Shape of a bubble fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BubbleShape {
    Ellipse,
    Rectangle,
}

/// Semantic kind of a bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BubbleType {
    Dialogue,
    Caption,
}

fn default_opacity() -> f32 {
    1.0
}

fn default_background() -> String {
    "#ffffff".to_string()
}

fn default_text_color() -> String {
    "#000000".to_string()
}

fn default_shape() -> BubbleShape {
    BubbleShape::Ellipse
}

fn default_type() -> BubbleType {
    BubbleType::Dialogue
}

/// A positioned, styled text region overlaid on the page.
///
/// Field names serialize in camelCase to match the wire format used by
/// external detection producers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bubble {
    pub id: u64,
    #[serde(default)]
    pub original_text: String,
    #[serde(default)]
    pub translated_text: String,
    #[serde(rename = "box")]
    pub bounds: NormBox,
    #[serde(default = "default_shape")]
    pub shape: BubbleShape,
    #[serde(rename = "type", default = "default_type")]
    pub kind: BubbleType,
    #[serde(default = "default_background")]
    pub background_color: String,
    #[serde(default = "default_text_color")]
    pub text_color: String,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f32>,
}

impl Bubble {
    /// Create a bubble for a manually drawn region.
    pub fn new(id: u64, bounds: NormBox, shape: BubbleShape) -> Self {
        Self {
            id,
            original_text: String::new(),
            translated_text: String::new(),
            bounds,
            shape,
            kind: BubbleType::Dialogue,
            background_color: default_background(),
            text_color: default_text_color(),
            opacity: 1.0,
            font_size: None,
            line_height: None,
        }
    }

    pub fn has_text(&self) -> bool {
        !self.translated_text.is_empty()
    }

    pub fn line_height_or_default(&self) -> f32 {
        self.line_height.unwrap_or(DEFAULT_LINE_HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_box() -> NormBox {
        NormBox::new(100.0, 100.0, 300.0, 200.0)
    }

    #[test]
    fn test_translation_is_rigid() {
        let b = sample_box().translated(50.0, -20.0);
        assert_eq!(b.xmin, 150.0);
        assert_eq!(b.ymin, 80.0);
        assert_eq!(b.width(), 200.0);
        assert_eq!(b.height(), 100.0);
    }

    #[test]
    fn test_resize_moves_adjacent_edges_only() {
        let b = sample_box().resized(Handle::Se, 400.0, 350.0);
        assert_eq!(b.xmin, 100.0);
        assert_eq!(b.ymin, 100.0);
        assert_eq!(b.xmax, 400.0);
        assert_eq!(b.ymax, 350.0);
    }

    #[test]
    fn test_resize_clamps_instead_of_inverting() {
        // Drag the se handle far past the nw corner
        let b = sample_box().resized(Handle::Se, 0.0, 0.0);
        assert_eq!(b.xmax, 100.0 + MIN_SPAN);
        assert_eq!(b.ymax, 100.0 + MIN_SPAN);
        assert!(b.is_valid());

        let b = sample_box().resized(Handle::Nw, 900.0, 900.0);
        assert_eq!(b.xmin, 300.0 - MIN_SPAN);
        assert_eq!(b.ymin, 200.0 - MIN_SPAN);
        assert!(b.is_valid());
    }

    #[test]
    fn test_contains_is_edge_inclusive() {
        let b = sample_box();
        assert!(b.contains(100.0, 100.0));
        assert!(b.contains(300.0, 200.0));
        assert!(b.contains(200.0, 150.0));
        assert!(!b.contains(99.0, 150.0));
        assert!(!b.contains(200.0, 201.0));
    }

    #[test]
    fn test_wire_format_uses_camel_case() {
        let bubble = Bubble {
            translated_text: "HI!".to_string(),
            font_size: Some(24.0),
            ..Bubble::new(7, sample_box(), BubbleShape::Rectangle)
        };
        let json = serde_json::to_string(&bubble).unwrap();
        assert!(json.contains("\"translatedText\""));
        assert!(json.contains("\"backgroundColor\""));
        assert!(json.contains("\"fontSize\""));
        assert!(json.contains("\"box\""));
        assert!(json.contains("\"type\":\"dialogue\""));
        assert!(json.contains("\"shape\":\"rectangle\""));

        let back: Bubble = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bubble);
    }

    #[test]
    fn test_wire_format_defaults_for_sparse_records() {
        // Detection producers send only text, box and type.
        let json = r#"{
            "id": 1,
            "originalText": "...!",
            "translatedText": "...!",
            "box": { "xmin": 10, "ymin": 20, "xmax": 110, "ymax": 90 },
            "type": "caption"
        }"#;
        let bubble: Bubble = serde_json::from_str(json).unwrap();
        assert_eq!(bubble.kind, BubbleType::Caption);
        assert_eq!(bubble.shape, BubbleShape::Ellipse);
        assert_eq!(bubble.opacity, 1.0);
        assert_eq!(bubble.background_color, "#ffffff");
        assert!(bubble.font_size.is_none());
    }
}
