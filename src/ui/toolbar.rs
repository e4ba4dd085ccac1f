// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Toolbar and tool selection UI.
//!
//! Tool buttons, the stroke color and width pickers, and the session
//! actions (undo, redo, clear, commit).

use scoremark::engine::session::StrokeRange;
use scoremark::models::color::Color;
use scoremark::models::layer::ToolKind;

/// Tool and style the next edit session starts with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolState {
    pub tool: ToolKind,
    pub color: Color,
    pub stroke_width: f64,
}

/// Result of toolbar interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToolbarAction {
    None,
    ToolChanged,
    StyleChanged,
    Undo,
    Redo,
    Clear,
    Commit,
}

/// Display the toolbar.
pub fn show(
    ui: &mut egui::Ui,
    state: &mut ToolState,
    stroke_range: StrokeRange,
    can_undo: bool,
    can_redo: bool,
    can_commit: bool,
) -> ToolbarAction {
    let mut action = ToolbarAction::None;

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        ui.label("Tools:");
        ui.separator();

        for tool in ToolKind::ALL {
            if ui.selectable_label(state.tool == tool, tool.label()).clicked() && state.tool != tool {
                state.tool = tool;
                action = ToolbarAction::ToolChanged;
            }
        }

        ui.separator();

        let [r, g, b, _] = state.color.to_array();
        let mut rgb = [r, g, b];
        if ui.color_edit_button_srgb(&mut rgb).changed() {
            state.color = Color::rgb(rgb[0], rgb[1], rgb[2]);
            action = ToolbarAction::StyleChanged;
        }

        let slider = egui::Slider::new(&mut state.stroke_width, stroke_range.min..=stroke_range.max)
            .text("Stroke")
            .step_by(1.0);
        if ui.add(slider).changed() {
            action = ToolbarAction::StyleChanged;
        }

        ui.separator();

        if ui.add_enabled(can_undo, egui::Button::new("Undo")).clicked() {
            action = ToolbarAction::Undo;
        }
        if ui.add_enabled(can_redo, egui::Button::new("Redo")).clicked() {
            action = ToolbarAction::Redo;
        }
        if ui.add_enabled(can_commit, egui::Button::new("Clear")).clicked() {
            action = ToolbarAction::Clear;
        }
        if ui.add_enabled(can_commit, egui::Button::new("Commit")).clicked() {
            action = ToolbarAction::Commit;
        }

        ui.separator();

        let tool_text = match state.tool {
            ToolKind::Select => "Drag objects to move them, drag handles to resize",
            ToolKind::FreehandPath => "Drag to draw",
            ToolKind::Line | ToolKind::Rectangle => "Click to place, drag to position",
            ToolKind::TextBox => "Click to place, edit the text in the side panel",
        };
        ui.label(egui::RichText::new(tool_text).italics().weak());
    });

    action
}
