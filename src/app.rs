// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! This module contains the main application structure that implements
//! the egui::App trait, managing the overall application state and
//! coordinating between different UI components and the data model.

use crate::io::media::LoadedImage;
use crate::io::{export, serialization};
use crate::models::bubble::{Bubble, BubbleShape, BubbleType, NormBox, MIN_SPAN, NORM_SCALE};
use crate::models::history::{History, Snapshot};
use crate::models::page::PageData;
use crate::ui::canvas::{self, CanvasAction, CanvasContext, CanvasState};
use crate::ui::properties::{self, PropertiesAction};
use crate::ui::toolbar::{self, ToolbarAction};
use crate::util::color::contrast_color;
use crate::util::font::Measurer;
use crate::util::geometry::{norm_box_to_natural_rect, MAX_ZOOM, MIN_ZOOM};
use crate::util::text::{is_all_uppercase, toggle_case};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;

/// Normalized offset applied to duplicated bubbles.
const DUPLICATE_OFFSET: f32 = 15.0;

/// Current top-level interaction intent. Exactly one is active at a time
/// and it is orthogonal to the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    View,
    Draw,
    Picker,
    Crop,
}

/// Result of background page loading operation.
struct LoadedPageData {
    image: LoadedImage,
    page: PageData,
}

/// Main application state.
pub struct ColtApp {
    /// Current interaction mode
    mode: Mode,

    /// Shape used for newly drawn bubbles
    current_shape: BubbleShape,

    /// Preview mode hides all editing affordances
    preview_mode: bool,

    /// Default fill for new bubbles when sampling yields nothing
    current_fill_color: String,

    /// Current page document (if a page is loaded)
    page: Option<PageData>,

    /// Decoded base image shared with history snapshots
    image: Option<Arc<LoadedImage>>,

    /// Loaded page texture for display
    image_texture: Option<egui::TextureHandle>,

    /// Ordered set of selected bubble ids
    selection: Vec<u64>,

    /// Pending crop region
    crop_box: Option<NormBox>,

    /// Counter for generating bubble ids
    next_bubble_id: u64,

    /// History for undo/redo
    history: History,

    /// Canvas view transform and gesture state
    canvas: CanvasState,

    /// Text measurement (loaded font face, or estimation)
    measure: Measurer,

    /// egui font family used for on-canvas lettering
    font_family: egui::FontFamily,

    /// Receiver for background page loading
    page_loader: Option<Receiver<Result<LoadedPageData, String>>>,

    /// Loading state message
    loading_message: Option<String>,
}

impl Default for ColtApp {
    fn default() -> Self {
        Self::new()
    }
}

impl ColtApp {
    /// Create a new COLT application instance.
    pub fn new() -> Self {
        Self {
            mode: Mode::View,
            current_shape: BubbleShape::Ellipse,
            preview_mode: false,
            current_fill_color: "#ffffff".to_string(),
            page: None,
            image: None,
            image_texture: None,
            selection: Vec::new(),
            crop_box: None,
            next_bubble_id: 1,
            history: History::new(),
            canvas: CanvasState::new(),
            measure: Measurer::discover(),
            font_family: egui::FontFamily::Proportional,
            page_loader: None,
            loading_message: None,
        }
    }

    /// Register the lettering font with egui so on-canvas text uses the
    /// same face the layout engine measures with.
    pub fn install_fonts(&mut self, ctx: &egui::Context) {
        let Some(metrics) = self.measure.font() else {
            return;
        };
        let mut fonts = egui::FontDefinitions::default();
        fonts.font_data.insert(
            "lettering".to_owned(),
            egui::FontData::from_owned(metrics.data().to_vec()),
        );
        // Keep the default proportional fonts as glyph fallbacks
        let mut family = vec!["lettering".to_owned()];
        if let Some(proportional) = fonts.families.get(&egui::FontFamily::Proportional) {
            family.extend(proportional.iter().cloned());
        }
        let name: egui::FontFamily = egui::FontFamily::Name("lettering".into());
        fonts.families.insert(name.clone(), family);
        ctx.set_fonts(fonts);
        self.font_family = name;
    }

    fn bubbles(&self) -> &[Bubble] {
        self.page.as_ref().map(|p| p.bubbles.as_slice()).unwrap_or(&[])
    }

    /// Deep-copied capture of the current editable state.
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            bubbles: self.bubbles().to_vec(),
            image: self.image.clone(),
            selection: self.selection.clone(),
        }
    }

    /// Save the current state before making a change.
    fn record_history(&mut self) {
        self.history.record(self.snapshot());
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot, ctx: &egui::Context) {
        if let Some(ref mut page) = self.page {
            page.bubbles = snapshot.bubbles;
        }
        self.selection = snapshot.selection;
        if let Some(image) = snapshot.image {
            let replaced = match &self.image {
                Some(current) => !Arc::ptr_eq(current, &image),
                None => true,
            };
            if replaced {
                self.set_image(image, ctx);
            }
        }
        self.canvas.cancel_gesture();
    }

    fn undo(&mut self, ctx: &egui::Context) {
        if let Some(previous) = self.history.undo(self.snapshot()) {
            self.apply_snapshot(previous, ctx);
            log::info!("Undo");
        }
    }

    fn redo(&mut self, ctx: &egui::Context) {
        if let Some(next) = self.history.redo(self.snapshot()) {
            self.apply_snapshot(next, ctx);
            log::info!("Redo");
        }
    }

    /// Install a new base image: texture, shared pixels, page dimensions.
    fn set_image(&mut self, image: Arc<LoadedImage>, ctx: &egui::Context) {
        let size = [image.width as usize, image.height as usize];
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, image.rgba_bytes());
        let texture = ctx.load_texture("page_image", color_image, egui::TextureOptions::LINEAR);
        self.image_texture = Some(texture);
        if let Some(ref mut page) = self.page {
            page.width = image.width;
            page.height = image.height;
        }
        self.image = Some(image);
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_bubble_id;
        self.next_bubble_id += 1;
        id
    }

    /// Delete every selected bubble.
    fn delete_selected(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        self.record_history();
        let selection = std::mem::take(&mut self.selection);
        if let Some(ref mut page) = self.page {
            page.bubbles.retain(|b| !selection.contains(&b.id));
            log::info!("Deleted {} bubbles, total: {}", selection.len(), page.bubbles.len());
        }
    }

    /// Duplicate a bubble with a small offset and select the copy.
    fn duplicate_bubble(&mut self, id: u64) {
        self.record_history();
        let new_id = self.next_id();
        if let Some(ref mut page) = self.page {
            if let Some(source) = page.bubbles.iter().find(|b| b.id == id).cloned() {
                let mut copy = source;
                copy.id = new_id;
                copy.bounds = copy.bounds.translated(DUPLICATE_OFFSET, DUPLICATE_OFFSET);
                page.bubbles.push(copy);
                self.selection = vec![new_id];
                log::info!("Duplicated bubble {id} as {new_id}");
            }
        }
    }

    /// Toggle the selection (or all bubbles) between all caps and
    /// sentence case.
    fn toggle_case_batch(&mut self) {
        if self.page.is_none() {
            return;
        }
        self.record_history();
        let selection = self.selection.clone();
        let Some(ref mut page) = self.page else { return };
        let targets: Vec<u64> = if selection.is_empty() {
            page.bubbles.iter().map(|b| b.id).collect()
        } else {
            selection
        };
        let relevant: Vec<&Bubble> = page
            .bubbles
            .iter()
            .filter(|b| targets.contains(&b.id) && b.has_text())
            .collect();
        let all_upper =
            !relevant.is_empty() && relevant.iter().all(|b| is_all_uppercase(&b.translated_text));
        for bubble in page.bubbles.iter_mut() {
            if targets.contains(&bubble.id) && bubble.has_text() {
                bubble.translated_text = toggle_case(&bubble.translated_text, all_upper);
            }
        }
    }

    /// Set bubble type over the selection; captions become rectangles,
    /// dialogue becomes ellipses.
    fn set_type_for_selection(&mut self, kind: BubbleType) {
        self.record_history();
        let selection = self.selection.clone();
        if let Some(ref mut page) = self.page {
            for bubble in page.bubbles.iter_mut() {
                if selection.contains(&bubble.id) {
                    bubble.kind = kind;
                    bubble.shape = match kind {
                        BubbleType::Caption => BubbleShape::Rectangle,
                        BubbleType::Dialogue => BubbleShape::Ellipse,
                    };
                }
            }
        }
    }

    /// Apply the pending crop: crop the image and remap every bubble into
    /// the new coordinate frame.
    fn apply_crop(&mut self, ctx: &egui::Context) {
        let (Some(crop), Some(image)) = (self.crop_box, self.image.clone()) else {
            return;
        };
        let natural = image.size();
        let rect = norm_box_to_natural_rect(&crop, natural);
        let x = rect.min.x.max(0.0) as u32;
        let y = rect.min.y.max(0.0) as u32;
        let w = (rect.width() as u32).min(image.width.saturating_sub(x));
        let h = (rect.height() as u32).min(image.height.saturating_sub(y));
        if w == 0 || h == 0 {
            return;
        }

        self.record_history();

        let cropped = image::imageops::crop_imm(&image.pixels, x, y, w, h).to_image();
        if let Some(ref mut page) = self.page {
            let old = natural;
            page.bubbles.retain_mut(|bubble| {
                let nat = norm_box_to_natural_rect(&bubble.bounds, old);
                let mut remapped = NormBox::new(
                    (nat.min.x - x as f32) / w as f32 * NORM_SCALE,
                    (nat.min.y - y as f32) / h as f32 * NORM_SCALE,
                    (nat.max.x - x as f32) / w as f32 * NORM_SCALE,
                    (nat.max.y - y as f32) / h as f32 * NORM_SCALE,
                );
                remapped.xmin = remapped.xmin.clamp(0.0, NORM_SCALE);
                remapped.ymin = remapped.ymin.clamp(0.0, NORM_SCALE);
                remapped.xmax = remapped.xmax.clamp(0.0, NORM_SCALE);
                remapped.ymax = remapped.ymax.clamp(0.0, NORM_SCALE);
                if remapped.width() < MIN_SPAN || remapped.height() < MIN_SPAN {
                    return false;
                }
                bubble.bounds = remapped;
                true
            });
        }
        self.selection.clear();
        self.set_image(Arc::new(LoadedImage::new(cropped)), ctx);
        self.crop_box = None;
        self.mode = Mode::View;
        self.canvas.view.reset();
        log::info!("Applied crop to {w}x{h}");
    }

    /// Replace the bubble list with imported detection results, sampling
    /// fill and text colors for each.
    fn apply_detections(&mut self, records: Vec<serialization::DetectionRecord>) {
        let Some(image) = self.image.clone() else { return };
        self.record_history();
        let mut bubbles: Vec<Bubble> = Vec::with_capacity(records.len());
        for record in records {
            let id = self.next_id();
            bubbles.push(record.into_bubble(id));
        }
        crate::util::color::detect_bubble_colors(&image.pixels, &mut bubbles);
        let count = bubbles.len();
        if let Some(ref mut page) = self.page {
            page.bubbles = bubbles;
        }
        self.selection.clear();
        log::info!("Imported {count} detected bubbles");
    }

    fn handle_canvas_action(&mut self, action: CanvasAction) {
        match action {
            CanvasAction::SelectBubbles(ids) => {
                // The selection must stay a subset of existing ids
                let bubbles = self.bubbles();
                let ids: Vec<u64> = ids
                    .into_iter()
                    .filter(|id| bubbles.iter().any(|b| b.id == *id))
                    .collect();
                self.selection = ids;
            }
            CanvasAction::RecordHistory => self.record_history(),
            CanvasAction::UpdateBubbleBox { id, bounds } => {
                if let Some(ref mut page) = self.page {
                    if let Some(bubble) = page.bubble_mut(id) {
                        // Resize/drag deltas are pre-clamped; reject anything
                        // that still fails the ordering invariant
                        if bounds.is_valid() {
                            bubble.bounds = bounds;
                        }
                    }
                }
            }
            CanvasAction::AddBubble {
                bounds,
                shape,
                sampled_color,
            } => {
                self.record_history();
                let id = self.next_id();
                let color = sampled_color.unwrap_or_else(|| self.current_fill_color.clone());
                let mut bubble = Bubble::new(id, bounds, shape);
                bubble.text_color = contrast_color(&color).to_string();
                bubble.background_color = color;
                if let Some(ref mut page) = self.page {
                    page.bubbles.push(bubble);
                    self.selection = vec![id];
                    log::info!("Added bubble {id}, total: {}", page.bubbles.len());
                }
            }
            CanvasAction::ColorPicked(color) => {
                if self.selection.is_empty() {
                    // No selection: the pick becomes the default fill
                    log::info!("Picked color {color}");
                    self.current_fill_color = color;
                    self.mode = Mode::Draw;
                } else {
                    self.record_history();
                    let text_color = contrast_color(&color).to_string();
                    let selection = self.selection.clone();
                    if let Some(ref mut page) = self.page {
                        for bubble in page.bubbles.iter_mut() {
                            if selection.contains(&bubble.id) {
                                bubble.background_color = color.clone();
                                bubble.text_color = text_color.clone();
                            }
                        }
                    }
                    log::info!("Applied picked color {color} to {} bubbles", selection.len());
                }
            }
            CanvasAction::SetCropBox(bounds) => {
                self.crop_box = Some(bounds);
            }
        }
    }

    fn handle_properties_action(&mut self, action: PropertiesAction) {
        match action {
            PropertiesAction::SelectBubbles(ids) => self.selection = ids,
            PropertiesAction::UpdateText { id, text } => {
                if let Some(bubble) = self.page.as_mut().and_then(|p| p.bubble_mut(id)) {
                    bubble.translated_text = text;
                }
            }
            PropertiesAction::SetFontSize { id, size } => {
                if let Some(bubble) = self.page.as_mut().and_then(|p| p.bubble_mut(id)) {
                    bubble.font_size = size;
                }
            }
            PropertiesAction::SetColor { id, color } => {
                if let Some(bubble) = self.page.as_mut().and_then(|p| p.bubble_mut(id)) {
                    bubble.text_color = contrast_color(&color).to_string();
                    bubble.background_color = color;
                }
            }
            PropertiesAction::SetOpacity { id, opacity } => {
                if let Some(bubble) = self.page.as_mut().and_then(|p| p.bubble_mut(id)) {
                    bubble.opacity = opacity;
                }
            }
            PropertiesAction::SetLineHeight { id, line_height } => {
                if let Some(bubble) = self.page.as_mut().and_then(|p| p.bubble_mut(id)) {
                    bubble.line_height = Some(line_height);
                }
            }
            PropertiesAction::SetShape { id, shape } => {
                if let Some(bubble) = self.page.as_mut().and_then(|p| p.bubble_mut(id)) {
                    bubble.shape = shape;
                }
            }
            PropertiesAction::SetTypeForSelection(kind) => self.set_type_for_selection(kind),
            PropertiesAction::BatchFontSize(size) => {
                let selection = self.selection.clone();
                if let Some(ref mut page) = self.page {
                    for bubble in page.bubbles.iter_mut() {
                        if selection.is_empty() || selection.contains(&bubble.id) {
                            bubble.font_size = Some(size);
                        }
                    }
                }
            }
            PropertiesAction::ToggleCase => self.toggle_case_batch(),
            PropertiesAction::Duplicate(id) => self.duplicate_bubble(id),
            PropertiesAction::Delete(id) => {
                self.record_history();
                if let Some(ref mut page) = self.page {
                    page.bubbles.retain(|b| b.id != id);
                    self.selection.retain(|sid| *sid != id);
                    log::info!("Deleted bubble {id}, total: {}", page.bubbles.len());
                }
            }
        }
    }

    /// Export the page document to a file, by extension.
    fn export_page(&self, path: std::path::PathBuf) {
        if let Some(ref page) = self.page {
            let extension = path.extension().and_then(|s| s.to_str());
            let result = match extension {
                Some("yaml") | Some("yml") => serialization::export_yaml(page, &path),
                Some("json") => serialization::export_json(page, &path),
                _ => {
                    log::error!("Unsupported file extension: {:?}", extension);
                    return;
                }
            };

            match result {
                Ok(_) => log::info!("Exported page document to {}", path.display()),
                Err(e) => log::error!("Failed to export page document: {}", e),
            }
        }
    }

    /// Composite the page at natural resolution and save it.
    fn export_image(&self, path: std::path::PathBuf) {
        let Some(image) = &self.image else { return };
        let result = export::compose_page(
            &image.pixels,
            self.bubbles(),
            &self.measure,
            self.measure.font(),
        )
        .and_then(|composited| export::save_image(&composited, &path));
        match result {
            Ok(_) => log::info!("Exported composited page to {}", path.display()),
            Err(e) => log::error!("Failed to export composited page: {}", e),
        }
    }

    /// Import a page document and load the referenced image (asynchronously).
    fn import_page(&mut self, path: std::path::PathBuf) {
        let (sender, receiver) = channel();
        self.page_loader = Some(receiver);
        self.loading_message = Some("Loading page document and image...".to_string());

        // Spawn background thread for loading
        std::thread::spawn(move || {
            let result = (|| -> Result<LoadedPageData, String> {
                let extension = path.extension().and_then(|s| s.to_str());
                let page = match extension {
                    Some("yaml") | Some("yml") => serialization::import_yaml(&path)
                        .map_err(|e| format!("Failed to import YAML: {}", e))?,
                    Some("json") => serialization::import_json(&path)
                        .map_err(|e| format!("Failed to import JSON: {}", e))?,
                    _ => return Err(format!("Unsupported file extension: {:?}", extension)),
                };

                log::info!("Imported {} bubbles from {}", page.bubbles.len(), path.display());

                let image_path = std::path::PathBuf::from(&page.media_file);
                if !image_path.exists() {
                    return Err(format!("Referenced image not found: {}", image_path.display()));
                }

                let image = crate::io::media::load_image(&image_path)
                    .map_err(|e| format!("Failed to load image: {}", e))?;

                log::info!("Loaded page image: {}", image_path.display());

                Ok(LoadedPageData { image, page })
            })();

            let _ = sender.send(result);
        });
    }

    /// Load a page image and create a fresh document (asynchronously).
    pub fn load_page_file(&mut self, path: std::path::PathBuf) {
        let (sender, receiver) = channel();
        self.page_loader = Some(receiver);
        self.loading_message = Some("Loading page...".to_string());

        let path_string = path.to_string_lossy().to_string();

        // Spawn background thread for loading
        std::thread::spawn(move || {
            let result = (|| -> Result<LoadedPageData, String> {
                let image = crate::io::media::load_image(&path)
                    .map_err(|e| format!("Failed to load image: {}", e))?;

                log::info!("Loaded page: {} ({}x{})", path.display(), image.width, image.height);

                let page = PageData::new(path_string, image.width, image.height);

                Ok(LoadedPageData { image, page })
            })();

            let _ = sender.send(result);
        });
    }

    /// Apply a finished background load to the app state.
    fn finish_page_load(&mut self, loaded: LoadedPageData, ctx: &egui::Context) {
        self.page = Some(loaded.page);
        self.set_image(Arc::new(loaded.image), ctx);
        self.next_bubble_id = self
            .bubbles()
            .iter()
            .map(|b| b.id + 1)
            .max()
            .unwrap_or(1);
        self.selection.clear();
        self.history.clear();
        self.crop_box = None;
        self.mode = Mode::View;
        self.preview_mode = false;
        self.canvas = CanvasState::new();
        log::info!("Page loaded successfully");
    }

    fn handle_keyboard(&mut self, ctx: &egui::Context) {
        // Only process if no text field is focused (to avoid deleting
        // bubbles while editing their text)
        if ctx.wants_keyboard_input() {
            return;
        }

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.canvas.cancel_gesture();
            self.selection.clear();
            self.mode = Mode::View;
        }

        if ctx.input(|i| i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace)) {
            self.delete_selected();
        }

        // Undo (Ctrl+Z)
        if ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::Z) && !i.modifiers.shift) {
            self.undo(ctx);
        }

        // Redo (Ctrl+Shift+Z or Ctrl+Y)
        if ctx.input(|i| {
            (i.modifiers.command && i.modifiers.shift && i.key_pressed(egui::Key::Z))
                || (i.modifiers.command && i.key_pressed(egui::Key::Y))
        }) {
            self.redo(ctx);
        }
    }

    fn menu_bar(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Open Page...").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Images", &["jpg", "jpeg", "png", "bmp", "webp"])
                        .pick_file()
                    {
                        self.load_page_file(path);
                    }
                    ui.close_menu();
                }
                if ui.button("Import Page Document...").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Page documents", &["yaml", "yml", "json"])
                        .pick_file()
                    {
                        self.import_page(path);
                    }
                    ui.close_menu();
                }
                let has_image = self.image.is_some();
                if ui
                    .add_enabled(has_image, egui::Button::new("Import Detections..."))
                    .clicked()
                {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Detections", &["json"])
                        .pick_file()
                    {
                        match serialization::import_detections(&path) {
                            Ok(records) => self.apply_detections(records),
                            Err(e) => log::error!("Failed to import detections: {}", e),
                        }
                    }
                    ui.close_menu();
                }
                ui.separator();
                ui.menu_button("Export Page Document", |ui| {
                    if ui.button("Export as YAML...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("YAML", &["yaml", "yml"])
                            .set_file_name("page.yaml")
                            .save_file()
                        {
                            self.export_page(path);
                        }
                        ui.close_menu();
                    }
                    if ui.button("Export as JSON...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("JSON", &["json"])
                            .set_file_name("page.json")
                            .save_file()
                        {
                            self.export_page(path);
                        }
                        ui.close_menu();
                    }
                });
                if ui
                    .add_enabled(has_image, egui::Button::new("Export Lettered Image..."))
                    .clicked()
                {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Images", &["png", "jpg", "jpeg"])
                        .set_file_name("page_lettered.png")
                        .save_file()
                    {
                        self.export_image(path);
                    }
                    ui.close_menu();
                }
                ui.separator();
                if ui.button("Quit").clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });

            ui.menu_button("Edit", |ui| {
                // Undo
                let can_undo = self.history.can_undo();
                if ui
                    .add_enabled(can_undo, egui::Button::new("Undo (Ctrl+Z)"))
                    .clicked()
                {
                    self.undo(ctx);
                    ui.close_menu();
                }

                // Redo
                let can_redo = self.history.can_redo();
                if ui
                    .add_enabled(can_redo, egui::Button::new("Redo (Ctrl+Shift+Z)"))
                    .clicked()
                {
                    self.redo(ctx);
                    ui.close_menu();
                }

                ui.separator();

                let has_selection = !self.selection.is_empty();
                if ui
                    .add_enabled(has_selection, egui::Button::new("Delete Selected"))
                    .clicked()
                {
                    self.delete_selected();
                    ui.close_menu();
                }
                if ui
                    .add_enabled(
                        self.selection.len() == 1,
                        egui::Button::new("Duplicate Selected"),
                    )
                    .clicked()
                {
                    if let Some(id) = self.selection.first().copied() {
                        self.duplicate_bubble(id);
                    }
                    ui.close_menu();
                }
            });

            ui.menu_button("View", |ui| {
                if ui.button("Zoom In").clicked() {
                    let zoom = (self.canvas.view.zoom_level + 0.1).min(MAX_ZOOM);
                    self.canvas.view.set_zoom(zoom);
                    ui.close_menu();
                }
                if ui.button("Zoom Out").clicked() {
                    let zoom = (self.canvas.view.zoom_level - 0.1).max(MIN_ZOOM);
                    self.canvas.view.set_zoom(zoom);
                    ui.close_menu();
                }
                if ui.button("Reset Zoom").clicked() {
                    self.canvas.view.reset();
                    ui.close_menu();
                }
            });
        });
    }
}

impl eframe::App for ColtApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Check for completed page loading
        if let Some(ref receiver) = self.page_loader {
            if let Ok(result) = receiver.try_recv() {
                self.page_loader = None;
                self.loading_message = None;

                match result {
                    Ok(loaded) => self.finish_page_load(loaded, ctx),
                    Err(e) => log::error!("Failed to load page: {}", e),
                }
            }
        }

        // Request repaint if still loading (to update spinner)
        if self.loading_message.is_some() {
            ctx.request_repaint();
        }

        // Top menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            self.menu_bar(ctx, ui);
        });

        // Toolbar
        let mode_before = self.mode;
        let preview_before = self.preview_mode;
        let toolbar_action = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| {
                toolbar::show(
                    ui,
                    &mut self.mode,
                    &mut self.current_shape,
                    &mut self.preview_mode,
                    &mut self.canvas.view.zoom_level,
                    self.crop_box.is_some(),
                )
            })
            .inner;
        match toolbar_action {
            ToolbarAction::ApplyCrop => self.apply_crop(ctx),
            ToolbarAction::ClearCrop => self.crop_box = None,
            ToolbarAction::None => {}
        }

        // Properties panel (right side)
        let properties_actions = egui::SidePanel::right("properties")
            .default_width(280.0)
            .show(ctx, |ui| properties::show(ui, self.bubbles(), &self.selection))
            .inner;
        for action in properties_actions {
            self.handle_properties_action(action);
        }

        self.handle_keyboard(ctx);

        // Main canvas (center)
        let canvas_actions = egui::CentralPanel::default()
            .show(ctx, |ui| {
                // Show loading overlay if loading
                if let Some(ref message) = self.loading_message {
                    ui.centered_and_justified(|ui| {
                        ui.vertical_centered(|ui| {
                            ui.add_space(20.0);
                            ui.spinner();
                            ui.add_space(10.0);
                            ui.label(
                                egui::RichText::new(message)
                                    .size(16.0)
                                    .color(egui::Color32::from_gray(200)),
                            );
                        });
                    });
                    Vec::new()
                } else {
                    let bubbles: &[Bubble] = self
                        .page
                        .as_ref()
                        .map(|p| p.bubbles.as_slice())
                        .unwrap_or(&[]);
                    let canvas_ctx = CanvasContext {
                        image: self.image.as_ref(),
                        texture: self.image_texture.as_ref(),
                        bubbles,
                        selection: &self.selection,
                        mode: self.mode,
                        current_shape: self.current_shape,
                        preview_mode: self.preview_mode,
                        crop_box: self.crop_box,
                        measure: &self.measure,
                        font_family: self.font_family.clone(),
                    };
                    canvas::show(ui, &mut self.canvas, &canvas_ctx)
                }
            })
            .inner;
        for action in canvas_actions {
            self.handle_canvas_action(action);
        }

        // A mode or preview switch abandons any in-flight gesture
        if self.mode != mode_before || self.preview_mode != preview_before {
            self.canvas.cancel_gesture();
        }
    }
}
