// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Edit sessions.
//!
//! An edit session is the single mutable layer on top of a render surface.
//! It owns its own scene graph (starting empty), tracks the active tool and
//! style, turns pointer gestures into object edits, and on commit hands its
//! serialized graph to the layer store as a brand new layer.
//!
//! ```text
//! Idle --select_tool--> ToolSelected --pointer--> Drawing --commit--> Committed
//!   ^                        |  ^                    |
//!   +-------- clear ---------+  +---- select_tool ---+
//! ```

use crate::engine::compositor::RenderSurface;
use crate::engine::history::History;
use crate::error::{ScoreError, ScoreResult};
use crate::models::color::Color;
use crate::models::graph::SceneGraph;
use crate::models::layer::{AuthorId, DocumentId, LayerId, NewLayer, ToolKind};
use crate::models::scene::{Handle, ObjectKind, Point, SceneObject, Shape};
use crate::io::store::LayerStore;

/// Pointer reach, in surface units, when picking objects and handles.
pub const HIT_TOLERANCE: f64 = 4.0;

/// Placeholder content of a freshly placed text box.
pub const TEXT_PLACEHOLDER: &str = "Type here...";

pub const DEFAULT_LINE: (Point, Point) = (Point::new(50.0, 50.0), Point::new(200.0, 50.0));
pub const DEFAULT_RECT_ORIGIN: Point = Point::new(100.0, 100.0);
pub const DEFAULT_RECT_SIZE: (f64, f64) = (100.0, 60.0);
pub const DEFAULT_TEXT_ORIGIN: Point = Point::new(100.0, 100.0);
pub const DEFAULT_TEXT_WIDTH: f64 = 150.0;
pub const DEFAULT_FONT_SIZE: f64 = 16.0;

/// Lifecycle of an edit session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No tool active, nothing drawn.
    Idle,
    ToolSelected,
    Drawing,
    /// Terminal; a new session is needed for further edits.
    Committed,
}

/// Allowed stroke widths, inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeRange {
    pub min: f64,
    pub max: f64,
}

impl Default for StrokeRange {
    fn default() -> Self {
        Self { min: 1.0, max: 10.0 }
    }
}

impl StrokeRange {
    pub fn clamp(self, width: f64) -> f64 {
        if width.is_finite() {
            width.clamp(self.min, self.max)
        } else {
            self.min
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Gesture {
    Freehand { index: usize },
    Drag { index: usize, handle: Handle, last: Point },
}

/// The live, single-owner scene graph bound to one render surface.
#[derive(Debug)]
pub struct EditSession {
    document_id: DocumentId,
    author: AuthorId,
    surface_generation: u64,
    graph: SceneGraph,
    state: SessionState,
    tool: Option<ToolKind>,
    color: Color,
    stroke_width: f64,
    stroke_range: StrokeRange,
    selection: Option<usize>,
    gesture: Option<Gesture>,
    history: History<SceneGraph>,
}

impl EditSession {
    /// Start an empty session on top of `surface`.
    ///
    /// The session's coordinate space is the surface size.
    pub fn new(surface: &RenderSurface, author: AuthorId) -> Self {
        let stroke_range = StrokeRange::default();
        Self {
            document_id: surface.document_id(),
            author,
            surface_generation: surface.generation(),
            graph: SceneGraph::new(surface.size()),
            state: SessionState::Idle,
            tool: None,
            color: Color::RED,
            stroke_width: 2.0,
            stroke_range,
            selection: None,
            gesture: None,
            history: History::default(),
        }
    }

    /// Use a different stroke range (e.g. from settings).
    pub fn with_stroke_range(mut self, range: StrokeRange) -> Self {
        self.stroke_range = range;
        self.stroke_width = range.clamp(self.stroke_width);
        self
    }

    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    pub fn author(&self) -> AuthorId {
        self.author
    }

    /// Generation of the render surface this session was opened on.
    pub fn surface_generation(&self) -> u64 {
        self.surface_generation
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn tool(&self) -> Option<ToolKind> {
        self.tool
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn stroke_width(&self) -> f64 {
        self.stroke_width
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn selection(&self) -> Option<usize> {
        self.selection
    }

    pub fn selected(&self) -> Option<&SceneObject> {
        self.selection.and_then(|i| self.graph.get(i))
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn ensure_open(&self) -> ScoreResult<()> {
        if self.state == SessionState::Committed {
            return Err(ScoreError::SessionClosed);
        }
        Ok(())
    }

    fn check_point(point: Point) -> ScoreResult<()> {
        if point.is_finite() {
            Ok(())
        } else {
            Err(ScoreError::invalid_geometry(format!(
                "pointer position ({}, {}) is not finite",
                point.x, point.y
            )))
        }
    }

    fn snapshot(&mut self) {
        self.history.push(self.graph.clone());
    }

    /// Activate a tool with the given style.
    pub fn select_tool(&mut self, tool: ToolKind, color: Color, stroke_width: f64) -> ScoreResult<()> {
        self.ensure_open()?;
        self.tool = Some(tool);
        self.color = color;
        self.stroke_width = self.stroke_range.clamp(stroke_width);
        self.gesture = None;
        if tool != ToolKind::Select {
            self.selection = None;
        }
        self.state = SessionState::ToolSelected;
        log::info!("Selected tool {:?} ({}, {}px)", tool, color, self.stroke_width);
        Ok(())
    }

    /// Change the active style without switching tools.
    pub fn set_style(&mut self, color: Color, stroke_width: f64) -> ScoreResult<()> {
        self.ensure_open()?;
        self.color = color;
        self.stroke_width = self.stroke_range.clamp(stroke_width);
        Ok(())
    }

    fn place_default(&self, kind: ObjectKind) -> ScoreResult<SceneObject> {
        match kind {
            ObjectKind::FreehandPath => SceneObject::freehand(Vec::new(), self.color, self.stroke_width),
            ObjectKind::Line => {
                SceneObject::line(DEFAULT_LINE.0, DEFAULT_LINE.1, self.color, self.stroke_width)
            }
            ObjectKind::Rectangle => SceneObject::rectangle(
                DEFAULT_RECT_ORIGIN,
                DEFAULT_RECT_SIZE.0,
                DEFAULT_RECT_SIZE.1,
                self.color,
                self.stroke_width,
            ),
            ObjectKind::TextBox => SceneObject::text_box(
                DEFAULT_TEXT_ORIGIN,
                DEFAULT_TEXT_WIDTH,
                DEFAULT_FONT_SIZE,
                TEXT_PLACEHOLDER,
                self.color,
            ),
        }
    }

    /// Pointer pressed on the surface at `point` (surface coordinates).
    pub fn pointer_down(&mut self, point: Point) -> ScoreResult<()> {
        self.ensure_open()?;
        Self::check_point(point)?;
        let Some(tool) = self.tool else {
            return Ok(());
        };

        match tool.draws() {
            Some(ObjectKind::FreehandPath) => {
                self.snapshot();
                let mut path = self.place_default(ObjectKind::FreehandPath)?;
                path.push_point(point);
                let index = self.graph.push(path);
                self.selection = None;
                self.gesture = Some(Gesture::Freehand { index });
                self.state = SessionState::Drawing;
            }
            Some(kind) => {
                let object = self.place_default(kind)?;
                self.snapshot();
                let index = self.graph.push(object);
                self.selection = Some(index);
                self.gesture = Some(Gesture::Drag {
                    index,
                    handle: Handle::Body,
                    last: point,
                });
                self.state = SessionState::Drawing;
                log::info!("Placed {:?}, total objects: {}", kind, self.graph.len());
            }
            None => {
                let grabbed = self
                    .graph
                    .objects()
                    .iter()
                    .enumerate()
                    .rev()
                    .find_map(|(i, obj)| obj.handle_at(point, HIT_TOLERANCE).map(|h| (i, h)));
                match grabbed {
                    Some((index, handle)) => {
                        self.snapshot();
                        self.selection = Some(index);
                        self.gesture = Some(Gesture::Drag {
                            index,
                            handle,
                            last: point,
                        });
                    }
                    None => {
                        self.selection = None;
                        self.gesture = None;
                    }
                }
            }
        }
        Ok(())
    }

    /// Pointer moved while pressed.
    ///
    /// A move that would leave non-finite geometry is rejected and the
    /// object keeps its previous position.
    pub fn pointer_drag(&mut self, point: Point) -> ScoreResult<()> {
        self.ensure_open()?;
        Self::check_point(point)?;
        match self.gesture {
            Some(Gesture::Freehand { index }) => {
                if let Some(path) = self.graph.get_mut(index) {
                    path.push_point(point);
                }
            }
            Some(Gesture::Drag { index, handle, last }) => {
                if let Some(obj) = self.graph.get_mut(index) {
                    let mut moved = obj.clone();
                    moved.drag_handle(handle, point.x - last.x, point.y - last.y);
                    moved.shape.validate()?;
                    *obj = moved;
                }
                self.gesture = Some(Gesture::Drag { index, handle, last: point });
            }
            None => {}
        }
        Ok(())
    }

    /// Pointer released; ends the current gesture.
    pub fn pointer_up(&mut self, point: Point) -> ScoreResult<()> {
        let moved = self.pointer_drag(point);
        if let Some(Gesture::Freehand { index }) = self.gesture {
            if let Some(Shape::FreehandPath { points }) = self.graph.get(index).map(|o| &o.shape) {
                log::info!("Finished freehand path with {} points", points.len());
            }
        }
        self.gesture = None;
        moved
    }

    /// Replace the content of the selected text box.
    ///
    /// Returns `false` if the selection is not a text box.
    pub fn set_text(&mut self, text: impl Into<String>) -> ScoreResult<bool> {
        self.ensure_open()?;
        let Some(index) = self.selection else {
            return Ok(false);
        };
        if self.graph.get(index).map(SceneObject::kind) != Some(ObjectKind::TextBox) {
            return Ok(false);
        }
        self.snapshot();
        if let Some(SceneObject {
            shape: Shape::TextBox { content, .. },
            ..
        }) = self.graph.get_mut(index)
        {
            *content = text.into();
        }
        Ok(true)
    }

    /// Remove the selected object. Returns `false` if nothing was selected.
    pub fn delete_selected(&mut self) -> ScoreResult<bool> {
        self.ensure_open()?;
        let Some(index) = self.selection.take() else {
            return Ok(false);
        };
        if index >= self.graph.len() {
            return Ok(false);
        }
        self.snapshot();
        self.graph.remove(index);
        self.gesture = None;
        log::info!("Deleted object, total objects: {}", self.graph.len());
        Ok(true)
    }

    pub fn undo(&mut self) -> ScoreResult<bool> {
        self.ensure_open()?;
        let canvas = self.graph.canvas_size();
        let current = std::mem::replace(&mut self.graph, SceneGraph::new(canvas));
        let (graph, changed) = match self.history.undo(current) {
            Ok(previous) => (previous, true),
            Err(current) => (current, false),
        };
        self.graph = graph;
        if changed {
            self.selection = None;
            self.gesture = None;
        }
        Ok(changed)
    }

    pub fn redo(&mut self) -> ScoreResult<bool> {
        self.ensure_open()?;
        let canvas = self.graph.canvas_size();
        let current = std::mem::replace(&mut self.graph, SceneGraph::new(canvas));
        let (graph, changed) = match self.history.redo(current) {
            Ok(next) => (next, true),
            Err(current) => (current, false),
        };
        self.graph = graph;
        if changed {
            self.selection = None;
            self.gesture = None;
        }
        Ok(changed)
    }

    /// Discard everything drawn in this session and return to `Idle`.
    pub fn clear(&mut self) -> ScoreResult<()> {
        self.ensure_open()?;
        self.graph.clear();
        self.history.clear();
        self.selection = None;
        self.gesture = None;
        self.tool = None;
        self.state = SessionState::Idle;
        Ok(())
    }

    /// Persist this session's graph as a new layer.
    ///
    /// Nothing is serialized unless the document still accepts annotations
    /// and at least one object was drawn. On success the session is closed.
    pub fn commit<S: LayerStore + ?Sized>(&mut self, store: &S) -> ScoreResult<LayerId> {
        self.ensure_open()?;
        if !store.get_document(self.document_id)?.annotatable {
            return Err(ScoreError::AnnotationsDisabled);
        }
        if self.graph.is_empty() {
            return Err(ScoreError::EmptySession);
        }

        let layer_id = store.save_layer(NewLayer {
            document_id: self.document_id,
            author_id: self.author,
            color: self.color,
            tool_kind: self.tool.unwrap_or_default(),
            scene_graph_document: self.graph.to_value()?,
        })?;

        log::info!(
            "Committed {} objects as layer {} on document {}",
            self.graph.len(),
            layer_id,
            self.document_id
        );
        self.graph.clear();
        self.history.clear();
        self.selection = None;
        self.gesture = None;
        self.state = SessionState::Committed;
        Ok(layer_id)
    }

    /// Throw the session away without persisting anything.
    pub fn abandon(mut self) {
        if self.state != SessionState::Committed && !self.graph.is_empty() {
            log::debug!("Discarding {} uncommitted objects", self.graph.len());
        }
        self.graph.clear();
        self.history.clear();
    }
}
