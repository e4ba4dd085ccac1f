// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Drawing canvas for the score and its annotation layers.
//!
//! The render surface is fitted into the available area and centered.
//! Committed layers are painted first, then the edit session on top.
//! Pointer positions are converted to surface coordinates before they
//! reach the session.

use scoremark::engine::compositor::RenderSurface;
use scoremark::engine::session::EditSession;
use scoremark::models::scene::{Point, SceneObject, Shape};
use scoremark::util::geometry::{screen_to_surface, surface_to_screen};

use super::to_color32;

/// Result of canvas interaction, in surface coordinates.
pub enum CanvasAction {
    None,
    PointerDown(Point),
    PointerDrag(Point),
    PointerUp(Point),
    /// Press and release without movement.
    Click(Point),
}

/// Display the canvas and translate pointer input.
pub fn show(
    ui: &mut egui::Ui,
    surface: Option<&RenderSurface>,
    session: Option<&EditSession>,
    texture: Option<&egui::TextureHandle>,
    loading: bool,
) -> CanvasAction {
    let mut action = CanvasAction::None;
    ui.style_mut().visuals.extreme_bg_color = egui::Color32::from_gray(40);

    let available_size = ui.available_size();

    egui::Frame::canvas(ui.style()).show(ui, |ui| {
        ui.set_min_size(available_size);

        let Some(surface) = surface else {
            placeholder(ui, loading);
            return;
        };

        let size = surface.size();
        let available = ui.available_size();
        let zoom = (f64::from(available.x) / size.width).min(f64::from(available.y) / size.height);
        let display = egui::vec2((size.width * zoom) as f32, (size.height * zoom) as f32);
        let offset = (available - display) / 2.0;
        let image_rect = egui::Rect::from_min_size(ui.min_rect().min + offset, display);
        let origin = Point::new(f64::from(image_rect.min.x), f64::from(image_rect.min.y));

        match texture {
            Some(texture) => ui.painter().image(
                texture.id(),
                image_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            ),
            None => ui.painter().rect_filled(image_rect, 0.0, egui::Color32::WHITE),
        };

        let response = ui.allocate_rect(image_rect, egui::Sense::click_and_drag());
        let to_surface = |pos: egui::Pos2| screen_to_surface(f64::from(pos.x), f64::from(pos.y), origin, zoom);

        if response.drag_started() {
            if let Some(pos) = ui.input(|i| i.pointer.press_origin()) {
                action = CanvasAction::PointerDown(to_surface(pos));
            }
        } else if response.drag_stopped() {
            if let Some(pos) = response.interact_pointer_pos().or_else(|| ui.input(|i| i.pointer.latest_pos())) {
                action = CanvasAction::PointerUp(to_surface(pos));
            }
        } else if response.dragged() {
            if let Some(pos) = response.interact_pointer_pos() {
                action = CanvasAction::PointerDrag(to_surface(pos));
            }
        } else if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                action = CanvasAction::Click(to_surface(pos));
            }
        }

        let painter = ui.painter_at(image_rect);
        for object in surface.objects() {
            draw_object(&painter, object, origin, zoom);
        }
        if let Some(session) = session {
            for (index, object) in session.graph().objects().iter().enumerate() {
                draw_object(&painter, object, origin, zoom);
                if session.selection() == Some(index) {
                    draw_selection(&painter, object, origin, zoom);
                }
            }
        }
    });

    ui.separator();
    ui.horizontal(|ui| match surface {
        Some(surface) => {
            ui.label(format!("Scale: {:.0}%", surface.scale() * 100.0));
            ui.separator();
            ui.label(format!("Layers: {}", surface.rendered_layers().len()));
            if !surface.skipped_layers().is_empty() {
                ui.separator();
                ui.colored_label(
                    egui::Color32::YELLOW,
                    format!("{} unreadable layers skipped", surface.skipped_layers().len()),
                );
            }
            if let Some(session) = session {
                ui.separator();
                ui.label(format!("Session: {:?}, {} objects", session.state(), session.graph().len()));
            }
        }
        None => {
            ui.label("No score loaded");
        }
    });

    action
}

fn placeholder(ui: &mut egui::Ui, loading: bool) {
    ui.centered_and_justified(|ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(20.0);
            if loading {
                ui.spinner();
                ui.add_space(10.0);
                ui.label(egui::RichText::new("Loading score...").size(16.0).color(egui::Color32::from_gray(200)));
                return;
            }
            ui.heading(egui::RichText::new("SCOREMARK").size(32.0).color(egui::Color32::from_gray(200)));
            ui.add_space(20.0);
            ui.label(egui::RichText::new("Open a score image to begin annotating").color(egui::Color32::from_gray(180)));
            ui.add_space(10.0);
            ui.label(
                egui::RichText::new("File → Open Score...")
                    .weak()
                    .color(egui::Color32::from_gray(130)),
            );
        });
    });
}

fn to_screen(point: &Point, origin: Point, zoom: f64) -> egui::Pos2 {
    let (x, y) = surface_to_screen(point, origin, zoom);
    egui::pos2(x as f32, y as f32)
}

/// Paint one scene object.
fn draw_object(painter: &egui::Painter, object: &SceneObject, origin: Point, zoom: f64) {
    let stroke = egui::Stroke::new((object.style.stroke_width * zoom) as f32, to_color32(object.style.stroke));
    let fill = to_color32(object.style.fill);

    match &object.shape {
        Shape::FreehandPath { points } => {
            let screen: Vec<egui::Pos2> = points.iter().map(|p| to_screen(p, origin, zoom)).collect();
            if let [only] = screen.as_slice() {
                painter.circle_filled(*only, stroke.width / 2.0, stroke.color);
            } else {
                painter.add(egui::Shape::line(screen, stroke));
            }
        }
        Shape::Line { from, to } => {
            painter.line_segment([to_screen(from, origin, zoom), to_screen(to, origin, zoom)], stroke);
        }
        Shape::Rectangle { origin: corner, width, height } => {
            let rect = egui::Rect::from_min_size(
                to_screen(corner, origin, zoom),
                egui::vec2((width * zoom) as f32, (height * zoom) as f32),
            );
            painter.rect(rect, 0.0, fill, stroke);
        }
        Shape::TextBox {
            origin: corner,
            font_size,
            content,
            ..
        } => {
            painter.text(
                to_screen(corner, origin, zoom),
                egui::Align2::LEFT_TOP,
                content,
                egui::FontId::proportional((font_size * zoom) as f32),
                fill,
            );
        }
    }
}

/// Outline the bounds of the selected object.
fn draw_selection(painter: &egui::Painter, object: &SceneObject, origin: Point, zoom: f64) {
    let bounds = object.bounds();
    let rect = egui::Rect::from_min_max(to_screen(&bounds.min, origin, zoom), to_screen(&bounds.max, origin, zoom));
    painter.rect_stroke(rect.expand(3.0), 0.0, egui::Stroke::new(1.0, egui::Color32::LIGHT_BLUE));
}
