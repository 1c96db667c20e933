// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Media file loading.
//!
//! This module handles loading comic page images and converting them to
//! the RGBA form used by the canvas, the color sampler and the export
//! compositor.

use anyhow::{Context, Result};
use image::RgbaImage;
use std::path::Path;

/// A decoded page image at natural resolution.
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: RgbaImage,
}

impl LoadedImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            width: pixels.width(),
            height: pixels.height(),
            pixels,
        }
    }

    /// Natural dimensions as a pair.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Raw RGBA bytes, row-major.
    pub fn rgba_bytes(&self) -> &[u8] {
        self.pixels.as_raw()
    }
}

/// Load an image file and decode it to RGBA.
pub fn load_image(path: &Path) -> Result<LoadedImage> {
    let decoded = image::open(path)
        .with_context(|| format!("failed to open image: {}", path.display()))?;
    Ok(LoadedImage::new(decoded.to_rgba8()))
}
