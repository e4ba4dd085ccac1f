// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! SCOREMARK desktop viewer.
//!
//! Opens a scanned score, composites every committed annotation layer over
//! it and lets the user draw and commit a layer of their own.

mod app;
mod ui;

use anyhow::Result;
use app::ScoremarkApp;
use clap::Parser;
use scoremark::config::{Cli, Settings};

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let settings = Settings::resolve(&cli)?;
    log::info!(
        "Annotating as author {} with a {}x{} viewport",
        settings.author,
        settings.viewport_budget.width,
        settings.viewport_budget.height
    );
    let app = ScoremarkApp::new(settings, cli.image)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("SCOREMARK - Score Annotation"),
        ..Default::default()
    };

    eframe::run_native("SCOREMARK", options, Box::new(move |_cc| Ok(Box::new(app))))
        .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
