// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Toolbar and mode selection UI.
//!
//! This module provides the toolbar interface for selecting the
//! interaction mode, the bubble shape for new regions, the preview
//! toggle, zoom controls and the crop actions.

use crate::app::Mode;
use crate::models::bubble::BubbleShape;
use crate::util::geometry::{MAX_ZOOM, MIN_ZOOM};

/// Result of toolbar interaction.
pub enum ToolbarAction {
    None,
    ApplyCrop,
    ClearCrop,
}

/// Display the toolbar with mode and shape selection.
pub fn show(
    ui: &mut egui::Ui,
    mode: &mut Mode,
    shape: &mut BubbleShape,
    preview_mode: &mut bool,
    zoom: &mut f32,
    has_crop_box: bool,
) -> ToolbarAction {
    let mut action = ToolbarAction::None;

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        ui.label("Mode:");

        ui.separator();

        // Select/pan mode
        if ui.selectable_label(*mode == Mode::View, "⬆ Select").clicked() {
            *mode = Mode::View;
        }

        // Draw mode
        if ui.selectable_label(*mode == Mode::Draw, "▭ Draw").clicked() {
            *mode = Mode::Draw;
        }

        // Color picker mode
        if ui.selectable_label(*mode == Mode::Picker, "💧 Picker").clicked() {
            *mode = Mode::Picker;
        }

        // Crop mode
        if ui.selectable_label(*mode == Mode::Crop, "✂ Crop").clicked() {
            *mode = Mode::Crop;
        }

        ui.separator();

        // Shape for newly drawn bubbles
        if ui
            .selectable_label(*shape == BubbleShape::Ellipse, "⬭ Ellipse")
            .clicked()
        {
            *shape = BubbleShape::Ellipse;
        }
        if ui
            .selectable_label(*shape == BubbleShape::Rectangle, "□ Rectangle")
            .clicked()
        {
            *shape = BubbleShape::Rectangle;
        }

        ui.separator();

        if ui.selectable_label(*preview_mode, "👁 Preview").clicked() {
            *preview_mode = !*preview_mode;
        }

        if *mode == Mode::Crop {
            ui.separator();
            if ui
                .add_enabled(has_crop_box, egui::Button::new("Apply Crop"))
                .clicked()
            {
                action = ToolbarAction::ApplyCrop;
            }
            if ui
                .add_enabled(has_crop_box, egui::Button::new("Clear"))
                .clicked()
            {
                action = ToolbarAction::ClearCrop;
            }
        }

        ui.separator();

        // Zoom controls
        if ui.button("−").clicked() {
            *zoom = (*zoom - 0.1).max(MIN_ZOOM);
        }
        ui.add(
            egui::Slider::new(zoom, MIN_ZOOM..=MAX_ZOOM)
                .show_value(false)
                .logarithmic(true),
        );
        if ui.button("+").clicked() {
            *zoom = (*zoom + 0.1).min(MAX_ZOOM);
        }
        ui.label(format!("{:.0}%", *zoom * 100.0));

        ui.separator();

        // Mode description
        let mode_text = match mode {
            Mode::View => "Click bubbles to select, drag to move, drag corners to resize",
            Mode::Draw => "Drag to draw a new bubble region",
            Mode::Picker => "Click to sample a color (applies to selected bubbles)",
            Mode::Crop => "Drag to mark the crop region, then Apply Crop",
        };
        ui.label(egui::RichText::new(mode_text).italics().weak());
    });

    action
}
