// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Page document state.
//!
//! This module manages the editable document for a single comic page:
//! the source media reference, its natural dimensions, and the bubbles
//! overlaid on it.

use super::bubble::Bubble;
use serde::{Deserialize, Serialize};

/// Complete page data for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageData {
    pub media_file: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub bubbles: Vec<Bubble>,
}

impl PageData {
    /// Create a new page document for the given media file and dimensions.
    pub fn new(media_file: String, width: u32, height: u32) -> Self {
        Self {
            media_file,
            width,
            height,
            bubbles: Vec::new(),
        }
    }

    /// Look up a bubble by id, mutably.
    pub fn bubble_mut(&mut self, id: u64) -> Option<&mut Bubble> {
        self.bubbles.iter_mut().find(|b| b.id == id)
    }
}
