// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Bubble properties panel.
//!
//! This module provides the side panel for viewing and editing bubble
//! text and styling: translated text, font size override, opacity, line
//! height, shape, fill color, plus batch operations over the selection.

use crate::models::bubble::{Bubble, BubbleShape, BubbleType, DEFAULT_LINE_HEIGHT};
use crate::util::color::{format_hex, parse_hex};

/// Result of properties panel interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertiesAction {
    SelectBubbles(Vec<u64>),
    UpdateText { id: u64, text: String },
    SetFontSize { id: u64, size: Option<f32> },
    SetColor { id: u64, color: String },
    SetOpacity { id: u64, opacity: f32 },
    SetLineHeight { id: u64, line_height: f32 },
    SetShape { id: u64, shape: BubbleShape },
    SetTypeForSelection(BubbleType),
    BatchFontSize(f32),
    ToggleCase,
    Duplicate(u64),
    Delete(u64),
}

/// Display the properties panel and collect edits.
pub fn show(ui: &mut egui::Ui, bubbles: &[Bubble], selection: &[u64]) -> Vec<PropertiesAction> {
    let mut actions = Vec::new();

    ui.heading("Bubbles");
    ui.separator();

    if bubbles.is_empty() {
        ui.label(
            egui::RichText::new("No bubbles yet. Draw one, or import detections.")
                .italics()
                .weak(),
        );
        return actions;
    }

    // Batch operations over the selection (or all bubbles for font size)
    ui.horizontal(|ui| {
        ui.label("Type:");
        if ui
            .add_enabled(!selection.is_empty(), egui::Button::new("Dialogue"))
            .clicked()
        {
            actions.push(PropertiesAction::SetTypeForSelection(BubbleType::Dialogue));
        }
        if ui
            .add_enabled(!selection.is_empty(), egui::Button::new("Caption"))
            .clicked()
        {
            actions.push(PropertiesAction::SetTypeForSelection(BubbleType::Caption));
        }
        if ui
            .button("Aa")
            .on_hover_text("Toggle between ALL CAPS and sentence case")
            .clicked()
        {
            actions.push(PropertiesAction::ToggleCase);
        }
    });

    ui.horizontal(|ui| {
        ui.label("Batch size:");
        let mut batch_size = batch_font_size(bubbles, selection);
        if ui
            .add(egui::Slider::new(&mut batch_size, 8.0..=120.0).integer())
            .changed()
        {
            actions.push(PropertiesAction::BatchFontSize(batch_size));
        }
    });

    ui.separator();

    egui::ScrollArea::vertical().show(ui, |ui| {
        for bubble in bubbles {
            let is_selected = selection.contains(&bubble.id);
            let title = list_label(bubble);
            if ui.selectable_label(is_selected, title).clicked() {
                actions.push(PropertiesAction::SelectBubbles(vec![bubble.id]));
            }
            if is_selected {
                show_bubble_editor(ui, bubble, &mut actions);
            }
        }
    });

    actions
}

/// Slider position for the batch font size: the primary selection's
/// override if it has one, else a sensible default.
fn batch_font_size(bubbles: &[Bubble], selection: &[u64]) -> f32 {
    selection
        .first()
        .and_then(|id| bubbles.iter().find(|b| b.id == *id))
        .and_then(|b| b.font_size)
        .unwrap_or(24.0)
}

fn list_label(bubble: &Bubble) -> String {
    let text = if bubble.has_text() {
        &bubble.translated_text
    } else if !bubble.original_text.is_empty() {
        &bubble.original_text
    } else {
        "(empty)"
    };
    let preview: String = text.chars().take(24).collect();
    let ellipsis = if text.chars().count() > 24 { "…" } else { "" };
    format!("#{} {preview}{ellipsis}", bubble.id)
}

fn show_bubble_editor(ui: &mut egui::Ui, bubble: &Bubble, actions: &mut Vec<PropertiesAction>) {
    let id = bubble.id;

    ui.indent(id, |ui| {
        if !bubble.original_text.is_empty() {
            ui.label(
                egui::RichText::new(&bubble.original_text)
                    .small()
                    .weak(),
            );
        }

        let mut text = bubble.translated_text.clone();
        if ui
            .add(egui::TextEdit::multiline(&mut text).desired_rows(2))
            .changed()
        {
            actions.push(PropertiesAction::UpdateText { id, text });
        }

        // Font size: automatic fitting, or an explicit override
        ui.horizontal(|ui| {
            let mut auto = bubble.font_size.is_none();
            if ui.checkbox(&mut auto, "Auto size").changed() {
                let size = if auto { None } else { Some(24.0) };
                actions.push(PropertiesAction::SetFontSize { id, size });
            }
            if let Some(size) = bubble.font_size {
                let mut size = size;
                if ui
                    .add(egui::Slider::new(&mut size, 8.0..=120.0).integer())
                    .changed()
                {
                    actions.push(PropertiesAction::SetFontSize { id, size: Some(size) });
                }
            }
        });

        ui.horizontal(|ui| {
            ui.label("Opacity:");
            let mut opacity = bubble.opacity;
            if ui
                .add(egui::Slider::new(&mut opacity, 0.0..=1.0))
                .changed()
            {
                actions.push(PropertiesAction::SetOpacity { id, opacity });
            }
        });

        ui.horizontal(|ui| {
            ui.label("Line height:");
            let mut line_height = bubble.line_height.unwrap_or(DEFAULT_LINE_HEIGHT);
            if ui
                .add(egui::Slider::new(&mut line_height, 0.8..=2.0))
                .changed()
            {
                actions.push(PropertiesAction::SetLineHeight { id, line_height });
            }
        });

        ui.horizontal(|ui| {
            ui.label("Shape:");
            let mut shape = bubble.shape;
            if ui
                .selectable_label(shape == BubbleShape::Ellipse, "Ellipse")
                .clicked()
            {
                shape = BubbleShape::Ellipse;
            }
            if ui
                .selectable_label(shape == BubbleShape::Rectangle, "Rectangle")
                .clicked()
            {
                shape = BubbleShape::Rectangle;
            }
            if shape != bubble.shape {
                actions.push(PropertiesAction::SetShape { id, shape });
            }
        });

        ui.horizontal(|ui| {
            ui.label("Fill:");
            let mut rgb = parse_hex(&bubble.background_color).unwrap_or([255, 255, 255]);
            if ui.color_edit_button_srgb(&mut rgb).changed() {
                actions.push(PropertiesAction::SetColor {
                    id,
                    color: format_hex(rgb),
                });
            }
            if ui.button("Duplicate").clicked() {
                actions.push(PropertiesAction::Duplicate(id));
            }
            if ui.button("🗑 Delete").clicked() {
                actions.push(PropertiesAction::Delete(id));
            }
        });
    });

    ui.separator();
}
