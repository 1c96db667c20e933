// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! COLT - Comic Overlay Lettering Tool
//!
//! A cross-platform desktop application for overlaying, positioning and
//! lettering translated text bubbles on comic pages.

mod app;
mod io;
mod models;
mod ui;
mod util;

use anyhow::Result;
use app::ColtApp;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    // Configure egui options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("COLT - Comic Overlay Lettering Tool"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "COLT",
        options,
        Box::new(|cc| {
            let mut app = ColtApp::new();
            app.install_fonts(&cc.egui_ctx);
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
