// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! The app owns the layer store, the open document view and the current
//! edit session. Canvas, toolbar and panel report actions; this module
//! applies them to the session and the store.

use crate::ui::{canvas, properties, toolbar};
use scoremark::config::Settings;
use scoremark::engine::session::{EditSession, SessionState};
use scoremark::engine::view::DocumentView;
use scoremark::error::{ScoreError, ScoreResult};
use scoremark::io::media::{self, LoadedImage};
use scoremark::io::store::{FileStore, LayerStore, MemoryStore};
use scoremark::models::document::{Document, ImageRef};
use scoremark::models::layer::{AnnotationLayer, AuthorId, DocumentId, LayerId};
use scoremark::models::scene::{SceneObject, Shape};
use scoremark::util::geometry::Size;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};

/// Where layers are kept: in memory for a scratch session, or in a file.
enum Backend {
    Memory(MemoryStore),
    File(FileStore),
}

impl Backend {
    fn open(settings: &Settings) -> ScoreResult<Self> {
        let backend = match &settings.store_path {
            Some(path) => Backend::File(FileStore::open(path.clone())?),
            None => Backend::Memory(MemoryStore::new()),
        };
        match &backend {
            Backend::Memory(store) => store.register_author(settings.author),
            Backend::File(store) => store.register_author(settings.author)?,
        }
        Ok(backend)
    }

    fn layers(&self) -> &dyn LayerStore {
        match self {
            Backend::Memory(store) => store,
            Backend::File(store) => store,
        }
    }

    fn memory(&self) -> &MemoryStore {
        match self {
            Backend::Memory(store) => store,
            Backend::File(store) => store.memory(),
        }
    }

    /// The document for `image`, created on first open.
    fn document_for(&self, image: ImageRef, natural_size: Size, owner: AuthorId) -> ScoreResult<Document> {
        if let Some(document) = self.memory().documents().into_iter().find(|d| d.image == image) {
            return Ok(document);
        }
        match self {
            Backend::Memory(store) => store.create_document(owner, image, natural_size, true),
            Backend::File(store) => store.create_document(owner, image, natural_size, true),
        }
    }

    fn set_review_status(&self, layer_id: LayerId, caller: AuthorId, accepted: bool, reviewed: bool) -> ScoreResult<()> {
        match self {
            Backend::Memory(store) => store.set_review_status(layer_id, caller, accepted, reviewed),
            Backend::File(store) => store.set_review_status(layer_id, caller, accepted, reviewed),
        }
    }

    fn set_annotatable(&self, document_id: DocumentId, caller: AuthorId, annotatable: bool) -> ScoreResult<()> {
        match self {
            Backend::Memory(store) => store.set_annotatable(document_id, caller, annotatable),
            Backend::File(store) => store.set_annotatable(document_id, caller, annotatable),
        }
    }
}

/// Result of background image loading operation.
struct LoadedImageData {
    path: PathBuf,
    image: LoadedImage,
}

/// Main application state.
pub struct ScoremarkApp {
    settings: Settings,
    store: Backend,

    /// Open document and its composited surface
    view: Option<DocumentView>,

    /// Uncommitted marks of this annotator
    session: Option<EditSession>,

    /// Committed layers of the open document, oldest first
    layers: Vec<AnnotationLayer>,

    tool: toolbar::ToolState,

    /// Score texture for display
    texture: Option<egui::TextureHandle>,

    /// Receiver for background image loading
    image_loader: Option<Receiver<Result<LoadedImageData, String>>>,

    /// Last error shown in the status bar
    status: Option<String>,
}

impl ScoremarkApp {
    /// Create the application, optionally loading `image` right away.
    pub fn new(settings: Settings, image: Option<PathBuf>) -> ScoreResult<Self> {
        let store = Backend::open(&settings)?;
        let tool = toolbar::ToolState {
            tool: Default::default(),
            color: settings.default_color,
            stroke_width: settings.stroke_range().clamp(settings.default_stroke_width),
        };
        let mut app = Self {
            settings,
            store,
            view: None,
            session: None,
            layers: Vec::new(),
            tool,
            texture: None,
            image_loader: None,
            status: None,
        };
        if let Some(path) = image {
            app.load_image_file(path);
        }
        Ok(app)
    }

    fn report(&mut self, what: &str, err: ScoreError) {
        match err {
            ScoreError::EmptySession | ScoreError::AnnotationsDisabled => log::warn!("{}: {}", what, err),
            _ => log::error!("{}: {}", what, err),
        }
        self.status = Some(format!("{what}: {err}"));
    }

    /// Load a score image (asynchronously).
    pub fn load_image_file(&mut self, path: PathBuf) {
        let (sender, receiver) = channel();
        self.image_loader = Some(receiver);
        self.status = None;

        std::thread::spawn(move || {
            let result = media::load_image(&path)
                .map(|image| {
                    log::info!("Loaded image: {} ({}x{})", path.display(), image.width, image.height);
                    LoadedImageData { path, image }
                })
                .map_err(|e| format!("{e:#}"));
            let _ = sender.send(result);
        });
    }

    fn on_image_loaded(&mut self, ctx: &egui::Context, loaded: LoadedImageData) {
        let size = [loaded.image.width as usize, loaded.image.height as usize];
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, &loaded.image.pixels);
        self.texture = Some(ctx.load_texture("score", color_image, egui::TextureOptions::LINEAR));

        let image = ImageRef::new(loaded.path.to_string_lossy());
        let opened = self
            .store
            .document_for(image, loaded.image.natural_size(), self.settings.author)
            .and_then(|document| {
                DocumentView::open_in_background(self.store.layers(), document.id, self.settings.viewport_budget)
            });

        if let Some(session) = self.session.take() {
            session.abandon();
        }
        match opened {
            Ok(view) => {
                log::info!("Opened document {} ({})", view.document().id, view.document().title);
                self.view = Some(view);
                self.refresh_layers();
            }
            Err(e) => {
                self.view = None;
                self.report("Failed to open score", e);
            }
        }
    }

    fn refresh_layers(&mut self) {
        let Some(view) = &self.view else {
            self.layers.clear();
            return;
        };
        match self.store.layers().fetch_layers(view.document().id) {
            Ok(layers) => self.layers = layers,
            Err(e) => self.report("Failed to list layers", e),
        }
    }

    /// Start a session on the current surface if there is none, or the last one was committed.
    fn ensure_session(&mut self) {
        let Some(view) = &self.view else {
            return;
        };
        let current = |s: &EditSession| s.document_id() == view.document().id && s.state() != SessionState::Committed;
        if self.session.as_ref().is_some_and(current) {
            return;
        }
        let started = view
            .begin_edit_session_with(self.settings.author, self.settings.stroke_range())
            .and_then(|mut session| {
                session.select_tool(self.tool.tool, self.tool.color, self.tool.stroke_width)?;
                Ok(session)
            });
        match started {
            Ok(session) => self.session = Some(session),
            Err(ScoreError::NotFound(_)) => {}
            Err(e) => self.report("Failed to start edit session", e),
        }
    }

    fn recomposite(&mut self) {
        let Some(view) = self.view.as_mut() else {
            return;
        };
        if let Err(e) = view.recomposite_in_background(self.store.layers()) {
            self.report("Failed to refresh", e);
        }
        self.refresh_layers();
    }

    fn with_session(&mut self, what: &str, edit: impl FnOnce(&mut EditSession) -> ScoreResult<()>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if let Err(e) = edit(session) {
            self.report(what, e);
        }
    }

    fn commit(&mut self) {
        let (Some(view), Some(session)) = (self.view.as_mut(), self.session.as_mut()) else {
            return;
        };
        match view.commit(session, self.store.layers()) {
            Ok(layer_id) => {
                log::info!("Committed layer {}", layer_id);
                self.status = None;
                self.refresh_layers();
                self.ensure_session();
            }
            Err(e) => self.report("Commit failed", e),
        }
    }

    fn selected_text(&self) -> Option<&str> {
        match self.session.as_ref()?.selected()? {
            SceneObject {
                shape: Shape::TextBox { content, .. },
                ..
            } => Some(content.as_str()),
            _ => None,
        }
    }

    fn handle_toolbar(&mut self, action: toolbar::ToolbarAction) {
        let toolbar::ToolState { tool, color, stroke_width } = self.tool;
        match action {
            toolbar::ToolbarAction::None => {}
            toolbar::ToolbarAction::ToolChanged => {
                self.with_session("Failed to select tool", |s| s.select_tool(tool, color, stroke_width));
            }
            toolbar::ToolbarAction::StyleChanged => {
                self.with_session("Failed to change style", |s| s.set_style(color, stroke_width));
            }
            toolbar::ToolbarAction::Undo => self.with_session("Undo failed", |s| s.undo().map(|_| ())),
            toolbar::ToolbarAction::Redo => self.with_session("Redo failed", |s| s.redo().map(|_| ())),
            toolbar::ToolbarAction::Clear => {
                self.with_session("Clear failed", |s| {
                    s.clear()?;
                    s.select_tool(tool, color, stroke_width)
                });
            }
            toolbar::ToolbarAction::Commit => self.commit(),
        }
    }

    fn handle_properties(&mut self, action: properties::PropertiesAction) {
        let author = self.settings.author;
        match action {
            properties::PropertiesAction::None => {}
            properties::PropertiesAction::SetText(text) => {
                self.with_session("Failed to edit text", |s| s.set_text(text).map(|_| ()));
            }
            properties::PropertiesAction::SetReview {
                layer_id,
                accepted,
                reviewed,
            } => match self.store.set_review_status(layer_id, author, accepted, reviewed) {
                Ok(()) => self.refresh_layers(),
                Err(e) => self.report("Failed to update review status", e),
            },
            properties::PropertiesAction::DeleteLayer(layer_id) => {
                match self.store.layers().delete_layer(layer_id) {
                    Ok(()) => {
                        log::info!("Deleted layer {}", layer_id);
                        self.recomposite();
                    }
                    Err(e) => self.report("Failed to delete layer", e),
                }
            }
            properties::PropertiesAction::SetAnnotatable(annotatable) => {
                let Some(document_id) = self.view.as_ref().map(|v| v.document().id) else {
                    return;
                };
                match self.store.set_annotatable(document_id, author, annotatable) {
                    Ok(()) => self.recomposite(),
                    Err(e) => self.report("Failed to change document", e),
                }
            }
        }
    }

    fn handle_canvas(&mut self, action: canvas::CanvasAction) {
        match action {
            canvas::CanvasAction::None => {}
            canvas::CanvasAction::PointerDown(p) => self.with_session("Pointer down", |s| s.pointer_down(p)),
            canvas::CanvasAction::PointerDrag(p) => self.with_session("Pointer drag", |s| s.pointer_drag(p)),
            canvas::CanvasAction::PointerUp(p) => self.with_session("Pointer up", |s| s.pointer_up(p)),
            canvas::CanvasAction::Click(p) => self.with_session("Click", |s| {
                s.pointer_down(p)?;
                s.pointer_up(p)
            }),
        }
    }

    fn handle_keyboard(&mut self, ctx: &egui::Context) {
        // Text fields own the keyboard while focused.
        if ctx.wants_keyboard_input() {
            return;
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace)) {
            self.with_session("Delete failed", |s| s.delete_selected().map(|_| ()));
        }
        if ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::Z) && !i.modifiers.shift) {
            self.with_session("Undo failed", |s| s.undo().map(|_| ()));
        }
        if ctx.input(|i| {
            (i.modifiers.command && i.modifiers.shift && i.key_pressed(egui::Key::Z))
                || (i.modifiers.command && i.key_pressed(egui::Key::Y))
        }) {
            self.with_session("Redo failed", |s| s.redo().map(|_| ()));
        }
        if ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::Enter)) {
            self.commit();
        }
    }

    fn export_store(&mut self, path: PathBuf) {
        match scoremark::io::serialization::export(&self.store.memory().snapshot(), &path) {
            Ok(()) => log::info!("Exported layers to {}", path.display()),
            Err(e) => self.report("Failed to export layers", e),
        }
    }
}

impl eframe::App for ScoremarkApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Check for completed image loading
        if let Some(ref receiver) = self.image_loader {
            if let Ok(result) = receiver.try_recv() {
                self.image_loader = None;
                match result {
                    Ok(loaded) => self.on_image_loaded(ctx, loaded),
                    Err(e) => {
                        log::error!("Failed to load image: {}", e);
                        self.status = Some(e);
                    }
                }
            }
        }

        // Install finished composites
        if let Some(view) = self.view.as_mut() {
            let polled = view.poll();
            let pending = view.compositor().is_pending();
            match polled {
                Ok(true) => self.refresh_layers(),
                Ok(false) => {}
                Err(e) => self.report("Composite failed", e),
            }
            if pending {
                ctx.request_repaint();
            }
        }
        self.ensure_session();

        if self.image_loader.is_some() {
            ctx.request_repaint();
        }

        // Top menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open Score...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("Images", media::IMAGE_EXTENSIONS)
                            .pick_file()
                        {
                            self.load_image_file(path);
                        }
                        ui.close_menu();
                    }
                    if ui.button("Export Layers...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("Layer store", &["yaml", "yml", "json"])
                            .set_file_name("layers.yaml")
                            .save_file()
                        {
                            self.export_store(path);
                        }
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.menu_button("Edit", |ui| {
                    let (can_undo, can_redo) = self
                        .session
                        .as_ref()
                        .map_or((false, false), |s| (s.can_undo(), s.can_redo()));
                    if ui.add_enabled(can_undo, egui::Button::new("Undo (Ctrl+Z)")).clicked() {
                        self.with_session("Undo failed", |s| s.undo().map(|_| ()));
                        ui.close_menu();
                    }
                    if ui.add_enabled(can_redo, egui::Button::new("Redo (Ctrl+Shift+Z)")).clicked() {
                        self.with_session("Redo failed", |s| s.redo().map(|_| ()));
                        ui.close_menu();
                    }
                    ui.separator();
                    let has_selection = self.session.as_ref().is_some_and(|s| s.selection().is_some());
                    if ui.add_enabled(has_selection, egui::Button::new("Delete Selected")).clicked() {
                        self.with_session("Delete failed", |s| s.delete_selected().map(|_| ()));
                        ui.close_menu();
                    }
                    if ui.button("Refresh Layers").clicked() {
                        self.recomposite();
                        ui.close_menu();
                    }
                });
            });
        });

        // Toolbar
        let (can_undo, can_redo, can_commit) = self
            .session
            .as_ref()
            .map_or((false, false, false), |s| (s.can_undo(), s.can_redo(), !s.graph().is_empty()));
        let stroke_range = self.settings.stroke_range();
        let toolbar_action = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| {
                toolbar::show(ui, &mut self.tool, stroke_range, can_undo, can_redo, can_commit)
            })
            .inner;
        self.handle_toolbar(toolbar_action);

        // Layer panel (right side)
        let properties_action = egui::SidePanel::right("properties")
            .default_width(260.0)
            .show(ctx, |ui| {
                properties::show(
                    ui,
                    self.view.as_ref().map(DocumentView::document),
                    &self.layers,
                    self.settings.author,
                    self.selected_text(),
                )
            })
            .inner;
        self.handle_properties(properties_action);

        if let Some(status) = &self.status {
            egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
                ui.colored_label(egui::Color32::LIGHT_RED, status.as_str());
            });
        }

        self.handle_keyboard(ctx);

        // Main canvas (center)
        let loading = self.image_loader.is_some() || self.view.as_ref().is_some_and(|v| v.surface().is_none());
        let canvas_action = egui::CentralPanel::default()
            .show(ctx, |ui| {
                canvas::show(
                    ui,
                    self.view.as_ref().and_then(DocumentView::surface),
                    self.session.as_ref(),
                    self.texture.as_ref(),
                    loading,
                )
            })
            .inner;
        self.handle_canvas(canvas_action);
    }
}
