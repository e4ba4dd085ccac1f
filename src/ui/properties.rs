// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Document and layer panel.
//!
//! Lists the committed layers of the open document with their review
//! flags, and edits the text of a selected text box.

use scoremark::models::document::Document;
use scoremark::models::layer::{AnnotationLayer, AuthorId, LayerId};

use super::to_color32;

/// Result of panel interaction.
pub enum PropertiesAction {
    None,
    SetText(String),
    SetReview {
        layer_id: LayerId,
        accepted: bool,
        reviewed: bool,
    },
    DeleteLayer(LayerId),
    SetAnnotatable(bool),
}

/// Display the panel.
///
/// `selected_text` is the content of the selected text box, if any.
pub fn show(
    ui: &mut egui::Ui,
    document: Option<&Document>,
    layers: &[AnnotationLayer],
    me: AuthorId,
    selected_text: Option<&str>,
) -> PropertiesAction {
    let mut action = PropertiesAction::None;

    ui.heading("Document");
    ui.separator();

    let Some(document) = document else {
        ui.label(egui::RichText::new("No score loaded").weak());
        return action;
    };
    let is_owner = document.owner == me;

    egui::Grid::new("document_info").num_columns(2).show(ui, |ui| {
        ui.label("Title");
        ui.label(document.title.as_str());
        ui.end_row();
        ui.label("Size");
        ui.label(format!(
            "{} × {}",
            document.natural_size.width, document.natural_size.height
        ));
        ui.end_row();
    });

    let mut annotatable = document.annotatable;
    if ui
        .add_enabled(is_owner, egui::Checkbox::new(&mut annotatable, "Accept annotations"))
        .changed()
    {
        action = PropertiesAction::SetAnnotatable(annotatable);
    }

    if let Some(text) = selected_text {
        ui.add_space(8.0);
        ui.heading("Text");
        ui.separator();
        let mut buffer = text.to_owned();
        if ui.text_edit_multiline(&mut buffer).changed() {
            action = PropertiesAction::SetText(buffer);
        }
    }

    ui.add_space(8.0);
    ui.heading(format!("Layers ({})", layers.len()));
    ui.separator();

    egui::ScrollArea::vertical().show(ui, |ui| {
        // Newest on top, matching paint order.
        for layer in layers.iter().rev() {
            ui.push_id(layer.id.0, |ui| {
                ui.horizontal(|ui| {
                    ui.colored_label(to_color32(layer.color), "■");
                    ui.label(format!("#{} by {}", layer.id, layer.author_id));
                    ui.label(egui::RichText::new(layer.tool_kind.label()).weak());
                });
                ui.label(
                    egui::RichText::new(layer.created_at.format("%Y-%m-%d %H:%M:%S").to_string())
                        .small()
                        .weak(),
                );
                ui.horizontal(|ui| {
                    let (mut accepted, mut reviewed) = (layer.accepted, layer.reviewed);
                    let accept = ui.add_enabled(is_owner, egui::Checkbox::new(&mut accepted, "Accepted"));
                    let review = ui.add_enabled(is_owner, egui::Checkbox::new(&mut reviewed, "Reviewed"));
                    if accept.changed() || review.changed() {
                        action = PropertiesAction::SetReview {
                            layer_id: layer.id,
                            accepted,
                            reviewed,
                        };
                    }
                    let can_delete = is_owner || layer.author_id == me;
                    if ui.add_enabled(can_delete, egui::Button::new("🗑")).clicked() {
                        action = PropertiesAction::DeleteLayer(layer.id);
                    }
                });
                ui.separator();
            });
        }
    });

    action
}
