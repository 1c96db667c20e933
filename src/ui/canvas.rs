// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Drawing canvas for page display and bubble editing.
//!
//! This module owns the two halves of the editing surface: the per-frame
//! renderer (base image, bubble fills and lettering, selection
//! affordances, crop mask, draw preview) and the pointer interaction
//! state machine (select/move/resize, freehand draw, color pick, crop,
//! pan) that mutates bubbles through [`CanvasAction`] values.

use crate::app::Mode;
use crate::io::media::LoadedImage;
use crate::models::bubble::{Bubble, BubbleShape, Handle, NormBox};
use crate::util::color::{dominant_color, format_hex, parse_hex};
use crate::util::geometry::{
    natural_to_norm, natural_to_screen, norm_box_from_natural, norm_box_to_natural_rect,
    screen_to_natural, ViewTransform, MAX_ZOOM, MIN_ZOOM,
};
use crate::util::text_layout::{layout_text, TextMeasure};
use egui::{pos2, vec2, Align2, Color32, FontId, Pos2, Rect, Sense, Shape, Stroke, Vec2};
use std::sync::Arc;

/// On-screen size of a corner resize handle, in device pixels.
const HANDLE_SIZE: f32 = 10.0;

/// Hit radius around a handle corner, in device pixels.
const HANDLE_HIT_RADIUS: f32 = 15.0;

/// Minimum drawn-region extent on each axis, in device pixels.
const MIN_REGION_DEVICE_PX: f32 = 5.0;

/// Selection outline color (indigo) and drag accent (cyan).
const SELECTION_COLOR: Color32 = Color32::from_rgb(99, 102, 241);
const DRAG_COLOR: Color32 = Color32::from_rgb(34, 211, 238);
const HANDLE_ACTIVE_COLOR: Color32 = Color32::from_rgb(239, 68, 68);

/// Result of canvas interaction.
///
/// The canvas never mutates the document itself; it reports what the
/// host should do, in the order events occurred this frame.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasAction {
    /// Selection changed to exactly this id list
    SelectBubbles(Vec<u64>),
    /// A mutating gesture is starting; snapshot history now
    RecordHistory,
    /// A bubble's box moved or resized
    UpdateBubbleBox { id: u64, bounds: NormBox },
    /// A new region was drawn in draw mode
    AddBubble {
        bounds: NormBox,
        shape: BubbleShape,
        sampled_color: Option<String>,
    },
    /// The picker sampled a color
    ColorPicked(String),
    /// A new crop region was drawn in crop mode
    SetCropBox(NormBox),
}

/// Pointer gesture sub-state. Exactly one is active at a time; every
/// gesture ends on pointer release (or on losing the pointer mid-drag).
#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Idle,
    Panning {
        last: Pos2,
    },
    /// Start and current corner of the rubber-band, in natural pixels
    DrawingRegion {
        start: Pos2,
        current: Pos2,
    },
    /// Rigid translation of a bubble from its grab point, in normalized units
    DraggingBubble {
        id: u64,
        grab: (f32, f32),
        initial: NormBox,
    },
    /// One corner follows the pointer, the opposite edges stay fixed
    ResizingHandle {
        id: u64,
        handle: Handle,
        initial: NormBox,
    },
}

/// Everything the canvas reads for one frame.
pub struct CanvasContext<'a> {
    pub image: Option<&'a Arc<LoadedImage>>,
    pub texture: Option<&'a egui::TextureHandle>,
    pub bubbles: &'a [Bubble],
    pub selection: &'a [u64],
    pub mode: Mode,
    pub current_shape: BubbleShape,
    pub preview_mode: bool,
    pub crop_box: Option<NormBox>,
    pub measure: &'a dyn TextMeasure,
    pub font_family: egui::FontFamily,
}

/// Persistent canvas state: view transform plus in-flight gesture.
pub struct CanvasState {
    pub view: ViewTransform,
    gesture: Gesture,
    hover_handle: Option<Handle>,
    hovering_selected: bool,
}

impl CanvasState {
    pub fn new() -> Self {
        Self {
            view: ViewTransform::new(),
            gesture: Gesture::Idle,
            hover_handle: None,
            hovering_selected: false,
        }
    }

    /// Abandon any in-flight gesture (mode switches, document swaps).
    pub fn cancel_gesture(&mut self) {
        self.gesture = Gesture::Idle;
        self.hover_handle = None;
        self.hovering_selected = false;
    }
}

impl Default for CanvasState {
    fn default() -> Self {
        Self::new()
    }
}

/// Hit-test the bubble collection top-to-bottom (last drawn wins).
pub fn hit_test_bubbles(bubbles: &[Bubble], nx: f32, ny: f32) -> Option<&Bubble> {
    bubbles.iter().rev().find(|b| b.bounds.contains(nx, ny))
}

/// Which handle of the box, if any, is under a natural-pixel position.
///
/// The hit radius shrinks in natural pixels as the display scale grows so
/// it stays a constant size on screen.
pub fn handle_at(
    bounds: &NormBox,
    natural: (u32, u32),
    pos: Pos2,
    display_scale: f32,
) -> Option<Handle> {
    let radius = if display_scale > 0.0 {
        HANDLE_HIT_RADIUS / display_scale
    } else {
        HANDLE_HIT_RADIUS
    };
    let rect = norm_box_to_natural_rect(bounds, natural);
    let corners = [
        (Handle::Nw, rect.left_top()),
        (Handle::Ne, rect.right_top()),
        (Handle::Sw, rect.left_bottom()),
        (Handle::Se, rect.right_bottom()),
    ];
    for (handle, corner) in corners {
        if (pos.x - corner.x).abs() <= radius && (pos.y - corner.y).abs() <= radius {
            return Some(handle);
        }
    }
    None
}

fn is_multi_select_modifier(modifiers: &egui::Modifiers) -> bool {
    modifiers.shift || modifiers.ctrl || modifiers.command
}

/// Sample what the picker would see at a normalized point: the topmost
/// bubble's fill if one covers it, otherwise the base image pixel.
fn sample_composited(
    image: &LoadedImage,
    bubbles: &[Bubble],
    nx: f32,
    ny: f32,
    nat: Pos2,
) -> String {
    if let Some(bubble) = hit_test_bubbles(bubbles, nx, ny) {
        return bubble.background_color.clone();
    }
    let x = (nat.x.max(0.0) as u32).min(image.width.saturating_sub(1));
    let y = (nat.y.max(0.0) as u32).min(image.height.saturating_sub(1));
    let p = image.pixels.get_pixel(x, y).0;
    format_hex([p[0], p[1], p[2]])
}

/// Selection-pulse factor for this frame.
///
/// The animation is driven by re-requesting a repaint only while active,
/// so there is no idle work when nothing is selected.
fn selection_pulse(ui: &egui::Ui, active: bool) -> f32 {
    if !active {
        return 0.0;
    }
    ui.ctx().request_repaint();
    let t = ui.input(|i| i.time);
    ((t * 1000.0 / 150.0).sin() as f32 + 1.0) / 2.0
}

fn hex_to_color(hex: &str, alpha: f32) -> Color32 {
    let [r, g, b] = parse_hex(hex).unwrap_or([255, 255, 255]);
    Color32::from_rgba_unmultiplied(r, g, b, (alpha.clamp(0.0, 1.0) * 255.0).round() as u8)
}

/// Sampled outline of an ellipse inscribed in a rect, in screen space.
fn ellipse_points(rect: Rect, segments: usize) -> Vec<Pos2> {
    let center = rect.center();
    let rx = rect.width() / 2.0;
    let ry = rect.height() / 2.0;
    (0..segments)
        .map(|i| {
            let angle = i as f32 / segments as f32 * std::f32::consts::TAU;
            pos2(center.x + rx * angle.cos(), center.y + ry * angle.sin())
        })
        .collect()
}

/// Display the canvas area and handle pointer interactions.
pub fn show(ui: &mut egui::Ui, state: &mut CanvasState, ctx: &CanvasContext<'_>) -> Vec<CanvasAction> {
    let mut actions = Vec::new();

    // Set background color
    ui.style_mut().visuals.extreme_bg_color = Color32::from_gray(40);

    // Leave room for the status line under the canvas
    let available_size = (ui.available_size() - vec2(0.0, 26.0)).max(vec2(50.0, 50.0));

    egui::Frame::canvas(ui.style()).show(ui, |ui| {
        let (viewport, response) = ui.allocate_exact_size(available_size, Sense::click_and_drag());
        let painter = ui.painter_at(viewport);

        let (Some(image), Some(texture)) = (ctx.image, ctx.texture) else {
            draw_welcome(&painter, viewport);
            return;
        };

        let natural = image.size();
        state.view.fit_to_viewport(viewport.size(), natural);

        // Wheel zoom keeps the content under the cursor stationary
        if !ctx.preview_mode && response.hovered() {
            let scroll_y = ui.input(|i| i.raw_scroll_delta.y);
            if scroll_y != 0.0 {
                if let Some(pos) = response.hover_pos() {
                    let factor = 1.1f32.powf(scroll_y / 150.0);
                    let new_zoom = (state.view.zoom_level * factor).clamp(MIN_ZOOM, MAX_ZOOM);
                    let centering = centering_offset(viewport, natural, &state.view);
                    state
                        .view
                        .zoom_at(pos - viewport.min - centering, new_zoom);
                }
            }
        }

        // Lay the scaled content out in the viewport, centered when smaller
        let scale = state.view.display_scale();
        let content = vec2(natural.0 as f32 * scale, natural.1 as f32 * scale);
        let max_scroll = (content - viewport.size()).max(Vec2::ZERO);
        state.view.scroll = state.view.scroll.clamp(Vec2::ZERO, max_scroll);
        let centering = ((viewport.size() - content) * 0.5).max(Vec2::ZERO);
        let image_rect = Rect::from_min_size(viewport.min + centering - state.view.scroll, content);

        if !ctx.preview_mode {
            handle_pointer(ui, state, ctx, &response, image_rect, natural, scale, &mut actions);
        }

        draw_scene(ui, state, ctx, &painter, image_rect, natural, scale, texture);
        update_cursor(ui, state, ctx);
    });

    // Display current mode info at the bottom
    ui.separator();
    ui.horizontal(|ui| {
        ui.label(format!("Mode: {:?}", ctx.mode));
        ui.separator();
        if ctx.image.is_some() {
            ui.label(format!("{} bubbles", ctx.bubbles.len()));
            ui.separator();
            ui.label(format!("{:.0}%", state.view.zoom_level * 100.0));
        } else {
            ui.label("No page loaded");
        }
    });

    actions
}

fn centering_offset(viewport: Rect, natural: (u32, u32), view: &ViewTransform) -> Vec2 {
    let scale = view.display_scale();
    let content = vec2(natural.0 as f32 * scale, natural.1 as f32 * scale);
    ((viewport.size() - content) * 0.5).max(Vec2::ZERO)
}

/// Welcome message when no page is loaded.
fn draw_welcome(painter: &egui::Painter, viewport: Rect) {
    let center = viewport.center();
    painter.text(
        center - vec2(0.0, 30.0),
        Align2::CENTER_CENTER,
        "COLT",
        FontId::proportional(32.0),
        Color32::from_gray(200),
    );
    painter.text(
        center,
        Align2::CENTER_CENTER,
        "Comic Overlay Lettering Tool",
        FontId::proportional(14.0),
        Color32::from_gray(150),
    );
    painter.text(
        center + vec2(0.0, 30.0),
        Align2::CENTER_CENTER,
        "Open a comic page to begin lettering",
        FontId::proportional(14.0),
        Color32::from_gray(180),
    );
    painter.text(
        center + vec2(0.0, 50.0),
        Align2::CENTER_CENTER,
        "File → Open Page...",
        FontId::proportional(12.0),
        Color32::from_gray(130),
    );
}

/// Pointer-down/move/up dispatch over the gesture state machine.
#[allow(clippy::too_many_arguments)]
fn handle_pointer(
    ui: &egui::Ui,
    state: &mut CanvasState,
    ctx: &CanvasContext<'_>,
    response: &egui::Response,
    image_rect: Rect,
    natural: (u32, u32),
    scale: f32,
    actions: &mut Vec<CanvasAction>,
) {
    let (pressed, released, button_down, pointer_pos, modifiers) = ui.input(|i| {
        (
            i.pointer.primary_pressed(),
            i.pointer.primary_released(),
            i.pointer.primary_down(),
            i.pointer.interact_pos(),
            i.modifiers,
        )
    });

    // Pointer-down: dispatch by current mode and hit test, in priority order
    if pressed && response.hovered() {
        if let Some(pos) = pointer_pos {
            pointer_down(state, ctx, pos, image_rect, natural, scale, &modifiers, actions);
        }
    }

    // Pointer-move while a button is held
    if button_down {
        if let Some(pos) = pointer_pos {
            pointer_move(state, pos, image_rect, natural, actions);
        }
    } else if let Gesture::Idle = state.gesture {
        // Idle hover: handle/cursor feedback for the sole-selected bubble
        update_hover(state, ctx, pointer_pos, image_rect, natural, scale);
    }

    // Pointer-up commits; losing the button without a release event is
    // treated identically so a drag can never outlive its input
    if released || (!button_down && state.gesture != Gesture::Idle) {
        pointer_up(state, ctx, pointer_pos, image_rect, natural, scale, actions);
    }
}

#[allow(clippy::too_many_arguments)]
fn pointer_down(
    state: &mut CanvasState,
    ctx: &CanvasContext<'_>,
    pos: Pos2,
    image_rect: Rect,
    natural: (u32, u32),
    scale: f32,
    modifiers: &egui::Modifiers,
    actions: &mut Vec<CanvasAction>,
) {
    // Picker acts on release only
    if ctx.mode == Mode::Picker {
        return;
    }
    let Some(nat) = screen_to_natural(pos, image_rect, natural) else {
        return;
    };
    let (nx, ny) = natural_to_norm(nat, natural);

    if ctx.mode != Mode::Crop {
        // 1. Resize handle of the sole-selected bubble
        if ctx.selection.len() == 1 {
            let selected = ctx.bubbles.iter().find(|b| b.id == ctx.selection[0]);
            if let Some(bubble) = selected {
                if let Some(handle) = handle_at(&bubble.bounds, natural, nat, scale) {
                    actions.push(CanvasAction::RecordHistory);
                    state.gesture = Gesture::ResizingHandle {
                        id: bubble.id,
                        handle,
                        initial: bubble.bounds,
                    };
                    return;
                }
            }
        }

        // 2. Bubble body, topmost first
        if let Some(bubble) = hit_test_bubbles(ctx.bubbles, nx, ny) {
            actions.push(CanvasAction::RecordHistory);
            let already_selected = ctx.selection.contains(&bubble.id);
            if is_multi_select_modifier(modifiers) {
                let mut selection: Vec<u64> = ctx.selection.to_vec();
                if already_selected {
                    selection.retain(|id| *id != bubble.id);
                } else {
                    selection.push(bubble.id);
                }
                actions.push(CanvasAction::SelectBubbles(selection));
            } else {
                if !(already_selected && ctx.selection.len() == 1) {
                    actions.push(CanvasAction::SelectBubbles(vec![bubble.id]));
                }
                state.gesture = Gesture::DraggingBubble {
                    id: bubble.id,
                    grab: (nx, ny),
                    initial: bubble.bounds,
                };
            }
            return;
        }
    }

    // 3. Rubber-band a new region
    if ctx.mode == Mode::Draw || ctx.mode == Mode::Crop {
        state.gesture = Gesture::DrawingRegion {
            start: nat,
            current: nat,
        };
        actions.push(CanvasAction::SelectBubbles(Vec::new()));
        return;
    }

    // 4. Pan
    if ctx.mode == Mode::View {
        state.gesture = Gesture::Panning { last: pos };
        if !ctx.selection.is_empty() && !is_multi_select_modifier(modifiers) {
            actions.push(CanvasAction::SelectBubbles(Vec::new()));
        }
    }
}

fn pointer_move(
    state: &mut CanvasState,
    pos: Pos2,
    image_rect: Rect,
    natural: (u32, u32),
    actions: &mut Vec<CanvasAction>,
) {
    match &mut state.gesture {
        Gesture::Panning { last } => {
            // Drag-to-pan: the content follows the pointer
            let delta = pos - *last;
            state.view.scroll -= delta;
            *last = pos;
        }
        Gesture::DrawingRegion { current, .. } => {
            if let Some(nat) = screen_to_natural(pos, image_rect, natural) {
                *current = nat;
            }
        }
        Gesture::DraggingBubble { id, grab, initial } => {
            if let Some(nat) = screen_to_natural(pos, image_rect, natural) {
                let (nx, ny) = natural_to_norm(nat, natural);
                let bounds = initial.translated(nx - grab.0, ny - grab.1);
                actions.push(CanvasAction::UpdateBubbleBox { id: *id, bounds });
            }
        }
        Gesture::ResizingHandle { id, handle, initial } => {
            if let Some(nat) = screen_to_natural(pos, image_rect, natural) {
                let (nx, ny) = natural_to_norm(nat, natural);
                let bounds = initial.resized(*handle, nx, ny);
                actions.push(CanvasAction::UpdateBubbleBox { id: *id, bounds });
            }
        }
        Gesture::Idle => {}
    }
}

fn update_hover(
    state: &mut CanvasState,
    ctx: &CanvasContext<'_>,
    pointer_pos: Option<Pos2>,
    image_rect: Rect,
    natural: (u32, u32),
    scale: f32,
) {
    state.hover_handle = None;
    state.hovering_selected = false;
    if ctx.selection.len() != 1 {
        return;
    }
    let Some(pos) = pointer_pos else { return };
    let Some(nat) = screen_to_natural(pos, image_rect, natural) else {
        return;
    };
    let Some(bubble) = ctx.bubbles.iter().find(|b| b.id == ctx.selection[0]) else {
        return;
    };
    state.hover_handle = handle_at(&bubble.bounds, natural, nat, scale);
    let (nx, ny) = natural_to_norm(nat, natural);
    state.hovering_selected = bubble.bounds.contains(nx, ny);
}

#[allow(clippy::too_many_arguments)]
fn pointer_up(
    state: &mut CanvasState,
    ctx: &CanvasContext<'_>,
    pointer_pos: Option<Pos2>,
    image_rect: Rect,
    natural: (u32, u32),
    scale: f32,
    actions: &mut Vec<CanvasAction>,
) {
    let gesture = std::mem::replace(&mut state.gesture, Gesture::Idle);

    if let Gesture::DrawingRegion { start, current } = gesture {
        let region = Rect::from_two_pos(start, current);
        // Ignore accidental clicks: the region must be a real rectangle
        if region.width() * scale > MIN_REGION_DEVICE_PX
            && region.height() * scale > MIN_REGION_DEVICE_PX
        {
            let bounds = norm_box_from_natural(start, current, natural);
            if ctx.mode == Mode::Crop {
                actions.push(CanvasAction::SetCropBox(bounds));
            } else if let Some(image) = ctx.image {
                let color = dominant_color(
                    &image.pixels,
                    region.min.x,
                    region.min.y,
                    region.width(),
                    region.height(),
                    ctx.current_shape,
                );
                actions.push(CanvasAction::AddBubble {
                    bounds,
                    shape: ctx.current_shape,
                    sampled_color: Some(color),
                });
            }
        }
        return;
    }

    if ctx.mode == Mode::Picker {
        let (Some(pos), Some(image)) = (pointer_pos, ctx.image) else {
            return;
        };
        if !image_rect.contains(pos) {
            return;
        }
        if let Some(nat) = screen_to_natural(pos, image_rect, natural) {
            let (nx, ny) = natural_to_norm(nat, natural);
            let hex = sample_composited(image, ctx.bubbles, nx, ny, nat);
            actions.push(CanvasAction::ColorPicked(hex));
        }
    }
}

/// Paint the frame: image, bubbles, selection affordances, overlays.
#[allow(clippy::too_many_arguments)]
fn draw_scene(
    ui: &egui::Ui,
    state: &CanvasState,
    ctx: &CanvasContext<'_>,
    painter: &egui::Painter,
    image_rect: Rect,
    natural: (u32, u32),
    scale: f32,
    texture: &egui::TextureHandle,
) {
    painter.image(
        texture.id(),
        image_rect,
        Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
        Color32::WHITE,
    );

    let pulse = selection_pulse(ui, !ctx.selection.is_empty() && !ctx.preview_mode);

    for bubble in ctx.bubbles {
        draw_bubble(state, ctx, painter, bubble, image_rect, natural, scale, pulse);
    }

    if ctx.mode == Mode::Crop {
        draw_crop_mask(state, ctx, painter, image_rect, natural);
    } else if !ctx.preview_mode {
        if let Gesture::DrawingRegion { start, current } = state.gesture {
            draw_region_preview(ctx, painter, start, current, image_rect, natural);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_bubble(
    state: &CanvasState,
    ctx: &CanvasContext<'_>,
    painter: &egui::Painter,
    bubble: &Bubble,
    image_rect: Rect,
    natural: (u32, u32),
    scale: f32,
    pulse: f32,
) {
    let nat_rect = norm_box_to_natural_rect(&bubble.bounds, natural);
    let rect = Rect::from_min_max(
        natural_to_screen(nat_rect.min, image_rect, natural),
        natural_to_screen(nat_rect.max, image_rect, natural),
    );

    let fill = if bubble.has_text() {
        hex_to_color(&bubble.background_color, bubble.opacity)
    } else {
        // Unfilled region: translucent white so the original art shows through
        Color32::from_rgba_unmultiplied(255, 255, 255, 77)
    };

    match bubble.shape {
        BubbleShape::Ellipse => {
            painter.add(Shape::convex_polygon(
                ellipse_points(rect, 64),
                fill,
                Stroke::NONE,
            ));
        }
        BubbleShape::Rectangle => {
            painter.rect_filled(rect, egui::Rounding::same(4.0), fill);
        }
    }

    if !ctx.preview_mode && ctx.mode != Mode::Crop {
        let is_selected = ctx.selection.contains(&bubble.id);
        if is_selected {
            draw_selection_outline(state, painter, bubble, rect, scale, pulse);
            if ctx.selection.len() == 1 {
                draw_handles(state, painter, rect, pulse);
            }
        } else if !bubble.has_text() {
            // Mark unfilled regions so they are easy to find
            let stroke = Stroke::new(2.0, Color32::from_rgba_unmultiplied(255, 255, 255, 204));
            dashed_outline(painter, bubble.shape, rect, stroke, 5.0, 5.0);
        }
    }

    if bubble.has_text() {
        draw_bubble_text(ctx, painter, bubble, &nat_rect, rect, scale);
    }
}

fn draw_selection_outline(
    state: &CanvasState,
    painter: &egui::Painter,
    bubble: &Bubble,
    rect: Rect,
    scale: f32,
    pulse: f32,
) {
    let dragging_this = matches!(state.gesture, Gesture::DraggingBubble { id, .. } if id == bubble.id);
    let base_width = 2.0 / scale.max(0.01) + 2.0;
    let width = base_width + pulse * 1.5;

    if dragging_this {
        let stroke = Stroke::new(width, DRAG_COLOR.gamma_multiply(0.9));
        dashed_outline(painter, bubble.shape, rect, stroke, 8.0, 6.0);
    } else {
        let alpha = 0.7 + pulse * 0.3;
        let stroke = Stroke::new(width, SELECTION_COLOR.gamma_multiply(alpha));
        solid_outline(painter, bubble.shape, rect, stroke);
    }
}

fn draw_handles(state: &CanvasState, painter: &egui::Painter, rect: Rect, pulse: f32) {
    let grabbed = match state.gesture {
        Gesture::ResizingHandle { handle, .. } => Some(handle),
        _ => state.hover_handle,
    };
    let resizing = matches!(state.gesture, Gesture::ResizingHandle { .. });
    let corners = [
        (Handle::Nw, rect.left_top()),
        (Handle::Ne, rect.right_top()),
        (Handle::Sw, rect.left_bottom()),
        (Handle::Se, rect.right_bottom()),
    ];
    for (handle, corner) in corners {
        let active = grabbed == Some(handle);
        let (fill, stroke_color) = if resizing && !active {
            // Dim the other handles while one is grabbed
            (
                Color32::from_rgba_unmultiplied(255, 255, 255, 77),
                Color32::from_rgba_unmultiplied(100, 100, 100, 77),
            )
        } else if active {
            (HANDLE_ACTIVE_COLOR, HANDLE_ACTIVE_COLOR)
        } else {
            (
                Color32::WHITE,
                SELECTION_COLOR.gamma_multiply(0.7 + pulse * 0.3),
            )
        };
        let size = if active { HANDLE_SIZE * 1.2 } else { HANDLE_SIZE };
        let handle_rect = Rect::from_center_size(corner, Vec2::splat(size));
        painter.rect_filled(handle_rect, egui::Rounding::ZERO, fill);
        painter.rect_stroke(handle_rect, egui::Rounding::ZERO, Stroke::new(1.0, stroke_color));
    }
}

fn draw_bubble_text(
    ctx: &CanvasContext<'_>,
    painter: &egui::Painter,
    bubble: &Bubble,
    nat_rect: &Rect,
    rect: Rect,
    scale: f32,
) {
    // Layout happens in natural pixels; drawing scales to the screen
    let layout = layout_text(
        ctx.measure,
        &bubble.translated_text,
        nat_rect.width(),
        nat_rect.height(),
        bubble.shape,
        bubble.font_size,
        bubble.line_height_or_default(),
    );
    if layout.lines.is_empty() {
        return;
    }
    let color = hex_to_color(&bubble.text_color, 1.0);
    let font_id = FontId::new(layout.font_size * scale, ctx.font_family.clone());
    let line_height = layout.line_height * scale;
    let center = rect.center();
    let block_top = center.y - layout.block_height() * scale / 2.0;
    for (index, line) in layout.lines.iter().enumerate() {
        let y = block_top + index as f32 * line_height + line_height / 2.0;
        painter.text(pos2(center.x, y), Align2::CENTER_CENTER, line, font_id.clone(), color);
    }
}

/// Dim everything outside the crop rectangle with four complementary
/// fills and a dashed border.
fn draw_crop_mask(
    state: &CanvasState,
    ctx: &CanvasContext<'_>,
    painter: &egui::Painter,
    image_rect: Rect,
    natural: (u32, u32),
) {
    let dim = Color32::from_rgba_unmultiplied(0, 0, 0, 128);

    let crop_rect = match state.gesture {
        Gesture::DrawingRegion { start, current } => {
            let region = Rect::from_two_pos(start, current);
            Some(Rect::from_min_max(
                natural_to_screen(region.min, image_rect, natural),
                natural_to_screen(region.max, image_rect, natural),
            ))
        }
        _ => ctx.crop_box.map(|bounds| {
            let nat_rect = norm_box_to_natural_rect(&bounds, natural);
            Rect::from_min_max(
                natural_to_screen(nat_rect.min, image_rect, natural),
                natural_to_screen(nat_rect.max, image_rect, natural),
            )
        }),
    };

    match crop_rect {
        Some(crop) if crop.width() > 0.0 && crop.height() > 0.0 => {
            let full = image_rect;
            painter.rect_filled(
                Rect::from_min_max(full.min, pos2(full.max.x, crop.min.y)),
                egui::Rounding::ZERO,
                dim,
            );
            painter.rect_filled(
                Rect::from_min_max(pos2(full.min.x, crop.max.y), full.max),
                egui::Rounding::ZERO,
                dim,
            );
            painter.rect_filled(
                Rect::from_min_max(pos2(full.min.x, crop.min.y), pos2(crop.min.x, crop.max.y)),
                egui::Rounding::ZERO,
                dim,
            );
            painter.rect_filled(
                Rect::from_min_max(pos2(crop.max.x, crop.min.y), pos2(full.max.x, crop.max.y)),
                egui::Rounding::ZERO,
                dim,
            );
            let stroke = Stroke::new(2.0, Color32::WHITE);
            dashed_outline(painter, BubbleShape::Rectangle, crop, stroke, 6.0, 6.0);
        }
        _ => {
            painter.rect_filled(image_rect, egui::Rounding::ZERO, dim);
        }
    }
}

/// Translucent live preview of the region being drawn.
fn draw_region_preview(
    ctx: &CanvasContext<'_>,
    painter: &egui::Painter,
    start: Pos2,
    current: Pos2,
    image_rect: Rect,
    natural: (u32, u32),
) {
    let region = Rect::from_two_pos(start, current);
    let rect = Rect::from_min_max(
        natural_to_screen(region.min, image_rect, natural),
        natural_to_screen(region.max, image_rect, natural),
    );
    let fill = SELECTION_COLOR.gamma_multiply(0.2);
    let stroke = Stroke::new(2.0, SELECTION_COLOR);
    match ctx.current_shape {
        BubbleShape::Ellipse => {
            painter.add(Shape::convex_polygon(ellipse_points(rect, 64), fill, Stroke::NONE));
        }
        BubbleShape::Rectangle => {
            painter.rect_filled(rect, egui::Rounding::ZERO, fill);
        }
    }
    dashed_outline(painter, ctx.current_shape, rect, stroke, 6.0, 6.0);
}

fn solid_outline(painter: &egui::Painter, shape: BubbleShape, rect: Rect, stroke: Stroke) {
    match shape {
        BubbleShape::Ellipse => {
            let mut points = ellipse_points(rect, 64);
            if let Some(first) = points.first().copied() {
                points.push(first);
            }
            painter.add(Shape::line(points, stroke));
        }
        BubbleShape::Rectangle => {
            painter.rect_stroke(rect, egui::Rounding::same(4.0), stroke);
        }
    }
}

fn dashed_outline(
    painter: &egui::Painter,
    shape: BubbleShape,
    rect: Rect,
    stroke: Stroke,
    dash: f32,
    gap: f32,
) {
    let mut points = match shape {
        BubbleShape::Ellipse => ellipse_points(rect, 64),
        BubbleShape::Rectangle => vec![
            rect.left_top(),
            rect.right_top(),
            rect.right_bottom(),
            rect.left_bottom(),
        ],
    };
    if let Some(first) = points.first().copied() {
        points.push(first);
    }
    painter.extend(Shape::dashed_line(&points, stroke, dash, gap));
}

fn update_cursor(ui: &egui::Ui, state: &CanvasState, ctx: &CanvasContext<'_>) {
    use egui::CursorIcon;
    let icon = match ctx.mode {
        _ if ctx.preview_mode => CursorIcon::Default,
        Mode::Picker | Mode::Crop => CursorIcon::Crosshair,
        _ => {
            let resizing_handle = match state.gesture {
                Gesture::ResizingHandle { handle, .. } => Some(handle),
                _ => state.hover_handle,
            };
            if let Some(handle) = resizing_handle {
                match handle {
                    Handle::Nw | Handle::Se => CursorIcon::ResizeNwSe,
                    Handle::Ne | Handle::Sw => CursorIcon::ResizeNeSw,
                }
            } else if matches!(state.gesture, Gesture::DraggingBubble { .. }) {
                CursorIcon::Grabbing
            } else if state.hovering_selected {
                CursorIcon::Move
            } else {
                match ctx.mode {
                    Mode::Draw => CursorIcon::Crosshair,
                    Mode::View => {
                        if matches!(state.gesture, Gesture::Panning { .. }) {
                            CursorIcon::Grabbing
                        } else {
                            CursorIcon::Grab
                        }
                    }
                    _ => CursorIcon::Default,
                }
            }
        }
    };
    ui.ctx().set_cursor_icon(icon);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bubble_at(id: u64, xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Bubble {
        Bubble::new(id, NormBox::new(xmin, ymin, xmax, ymax), BubbleShape::Ellipse)
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let bubbles = vec![
            bubble_at(1, 0.0, 0.0, 500.0, 500.0),
            bubble_at(2, 100.0, 100.0, 400.0, 400.0),
        ];
        // Inside both: the later-drawn bubble wins
        assert_eq!(hit_test_bubbles(&bubbles, 200.0, 200.0).unwrap().id, 2);
        // Inside only the first
        assert_eq!(hit_test_bubbles(&bubbles, 50.0, 50.0).unwrap().id, 1);
        // Outside both
        assert!(hit_test_bubbles(&bubbles, 900.0, 900.0).is_none());
    }

    #[test]
    fn test_handle_hit_radius_scales_with_display() {
        let bounds = NormBox::new(0.0, 0.0, 500.0, 500.0);
        let natural = (1000, 1000);
        // Box corners at natural (0,0) and (500,500)

        // At scale 1, a point 12 natural px from the corner is within the
        // 15 px radius
        assert_eq!(
            handle_at(&bounds, natural, pos2(12.0, 12.0), 1.0),
            Some(Handle::Nw)
        );
        // At scale 2 the natural-space radius halves, so the same point misses
        assert_eq!(handle_at(&bounds, natural, pos2(12.0, 12.0), 2.0), None);
        // Zoomed out, the radius grows
        assert_eq!(
            handle_at(&bounds, natural, pos2(525.0, 525.0), 0.5),
            Some(Handle::Se)
        );
    }

    #[test]
    fn test_handle_corner_identity() {
        let bounds = NormBox::new(100.0, 100.0, 300.0, 300.0);
        let natural = (1000, 1000);
        assert_eq!(handle_at(&bounds, natural, pos2(100.0, 100.0), 1.0), Some(Handle::Nw));
        assert_eq!(handle_at(&bounds, natural, pos2(300.0, 100.0), 1.0), Some(Handle::Ne));
        assert_eq!(handle_at(&bounds, natural, pos2(100.0, 300.0), 1.0), Some(Handle::Sw));
        assert_eq!(handle_at(&bounds, natural, pos2(300.0, 300.0), 1.0), Some(Handle::Se));
        assert_eq!(handle_at(&bounds, natural, pos2(200.0, 200.0), 1.0), None);
    }

    #[test]
    fn test_ellipse_points_stay_inside_rect() {
        let rect = Rect::from_min_max(pos2(10.0, 20.0), pos2(110.0, 80.0));
        for p in ellipse_points(rect, 64) {
            assert!(p.x >= rect.min.x - 0.01 && p.x <= rect.max.x + 0.01);
            assert!(p.y >= rect.min.y - 0.01 && p.y <= rect.max.y + 0.01);
        }
    }
}
