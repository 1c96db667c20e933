// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! History system for undo/redo functionality.
//!
//! Snapshots are plain value copies of the editable document state, taken
//! immediately before a mutating action. The history has no knowledge of
//! how snapshots are rendered.

use super::bubble::Bubble;
use crate::io::media::LoadedImage;
use std::sync::Arc;

/// An immutable capture of everything needed to restore the editable state.
///
/// Bubbles and selection are deep copies; the base image is shared by
/// reference since it is immutable once loaded.
#[derive(Clone)]
pub struct Snapshot {
    pub bubbles: Vec<Bubble>,
    pub image: Option<Arc<LoadedImage>>,
    pub selection: Vec<u64>,
}

/// Undo/redo stacks over [`Snapshot`] values.
pub struct History {
    /// Undo stack (past states)
    past: Vec<Snapshot>,
    /// Redo stack (future states after undo)
    future: Vec<Snapshot>,
    /// Maximum history size
    max_size: usize,
}

impl History {
    pub fn new() -> Self {
        Self {
            past: Vec::new(),
            future: Vec::new(),
            max_size: 50, // Keep last 50 states
        }
    }

    /// Save the current state before making a change.
    ///
    /// Must be called before the mutation, not after; any recorded action
    /// invalidates the redo stack.
    pub fn record(&mut self, current: Snapshot) {
        self.past.push(current);
        // Limit history size
        if self.past.len() > self.max_size {
            self.past.remove(0);
        }
        // Clear redo stack when new action is performed
        self.future.clear();
    }

    /// Undo: restore the previous state, handing back the snapshot to apply.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let previous = self.past.pop()?;
        self.future.push(current);
        Some(previous)
    }

    /// Redo: restore the next state, handing back the snapshot to apply.
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.future.pop()?;
        self.past.push(current);
        Some(next)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bubble::{Bubble, BubbleShape, NormBox};

    fn snapshot(text: &str, selection: &[u64]) -> Snapshot {
        let mut bubble = Bubble::new(1, NormBox::new(0.0, 0.0, 100.0, 100.0), BubbleShape::Ellipse);
        bubble.translated_text = text.to_string();
        Snapshot {
            bubbles: vec![bubble],
            image: None,
            selection: selection.to_vec(),
        }
    }

    #[test]
    fn test_undo_restores_recorded_state() {
        let mut history = History::new();
        let initial = snapshot("before", &[1]);

        history.record(initial.clone());
        // ... state mutates to "after" ...
        let restored = history.undo(snapshot("after", &[])).unwrap();
        assert_eq!(restored.bubbles, initial.bubbles);
        assert_eq!(restored.selection, initial.selection);
    }

    #[test]
    fn test_redo_restores_mutated_state() {
        let mut history = History::new();
        history.record(snapshot("before", &[]));
        let mutated = snapshot("after", &[1]);

        let previous = history.undo(mutated.clone()).unwrap();
        let forward = history.redo(previous).unwrap();
        assert_eq!(forward.bubbles, mutated.bubbles);
        assert_eq!(forward.selection, mutated.selection);
    }

    #[test]
    fn test_record_invalidates_future() {
        let mut history = History::new();
        history.record(snapshot("a", &[]));
        history.undo(snapshot("b", &[])).unwrap();
        assert!(history.can_redo());

        history.record(snapshot("c", &[]));
        assert!(!history.can_redo());
        assert!(history.can_undo());
    }

    #[test]
    fn test_history_depth_is_bounded() {
        let mut history = History::new();
        for i in 0..200 {
            history.record(snapshot(&format!("state {i}"), &[]));
        }
        let mut depth = 0;
        while history.undo(snapshot("current", &[])).is_some() {
            depth += 1;
        }
        assert_eq!(depth, 50);
    }

    #[test]
    fn test_empty_stacks_are_no_ops() {
        let mut history = History::new();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(history.undo(snapshot("x", &[])).is_none());
        assert!(history.redo(snapshot("x", &[])).is_none());
        // A failed undo must not have pushed onto future
        assert!(!history.can_redo());
    }
}
