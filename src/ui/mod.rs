// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! UI components for the SCOREMARK viewer.

pub mod canvas;
pub mod properties;
pub mod toolbar;

use scoremark::models::color::Color;

pub fn to_color32(color: Color) -> egui::Color32 {
    let [r, g, b, a] = color.to_array();
    egui::Color32::from_rgba_unmultiplied(r, g, b, a)
}
