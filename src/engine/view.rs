// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Open documents.
//!
//! A [`DocumentView`] ties a document to a compositor: opening it fetches
//! the current layers and composites them, edit sessions are started on
//! its surface, and committing a session recomposites with the new layer.

use crate::engine::compositor::{CompositeRequest, Compositor, RenderSurface};
use crate::engine::session::{EditSession, StrokeRange};
use crate::error::{ScoreError, ScoreResult};
use crate::io::store::LayerStore;
use crate::models::document::Document;
use crate::models::layer::{AuthorId, DocumentId, LayerId};
use crate::util::geometry::Size;

/// A document opened for viewing and annotation.
pub struct DocumentView {
    document: Document,
    budget: Size,
    compositor: Compositor,
}

impl DocumentView {
    fn request<S: LayerStore + ?Sized>(&self, store: &S) -> ScoreResult<CompositeRequest> {
        Ok(CompositeRequest {
            document_id: self.document.id,
            background: self.document.image.clone(),
            natural_size: self.document.natural_size,
            budget: self.budget,
            layers: store.fetch_layers(self.document.id)?,
        })
    }

    fn load<S: LayerStore + ?Sized>(store: &S, document_id: DocumentId, budget: Size) -> ScoreResult<Self> {
        Ok(Self {
            document: store.get_document(document_id)?,
            budget: budget.validate("viewport budget")?,
            compositor: Compositor::new(),
        })
    }

    /// Open a document and composite its current layers on this thread.
    pub fn open<S: LayerStore + ?Sized>(store: &S, document_id: DocumentId, budget: Size) -> ScoreResult<Self> {
        let mut view = Self::load(store, document_id, budget)?;
        view.recomposite(store)?;
        Ok(view)
    }

    /// Open a document and composite its layers on a worker thread.
    ///
    /// Call [`DocumentView::poll`] until a surface is available.
    pub fn open_in_background<S: LayerStore + ?Sized>(
        store: &S,
        document_id: DocumentId,
        budget: Size,
    ) -> ScoreResult<Self> {
        let mut view = Self::load(store, document_id, budget)?;
        view.recomposite_in_background(store)?;
        Ok(view)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn budget(&self) -> Size {
        self.budget
    }

    pub fn surface(&self) -> Option<&RenderSurface> {
        self.compositor.surface()
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// Refetch document metadata and layers, then composite synchronously.
    pub fn recomposite<S: LayerStore + ?Sized>(&mut self, store: &S) -> ScoreResult<&RenderSurface> {
        self.document = store.get_document(self.document.id)?;
        let request = self.request(store)?;
        self.compositor.composite(request)
    }

    /// Refetch and composite on a worker thread, superseding any composite in flight.
    pub fn recomposite_in_background<S: LayerStore + ?Sized>(&mut self, store: &S) -> ScoreResult<u64> {
        self.document = store.get_document(self.document.id)?;
        let request = self.request(store)?;
        Ok(self.compositor.composite_in_background(request))
    }

    /// Change the viewport budget. The next composite uses it.
    pub fn set_budget(&mut self, budget: Size) -> ScoreResult<()> {
        self.budget = budget.validate("viewport budget")?;
        Ok(())
    }

    /// Install a finished background composite. Returns `true` if the surface changed.
    pub fn poll(&mut self) -> ScoreResult<bool> {
        self.compositor.poll()
    }

    /// Block until the latest background composite is installed.
    pub fn wait(&mut self) -> ScoreResult<bool> {
        self.compositor.wait()
    }

    /// Start an edit session on the current surface.
    pub fn begin_edit_session(&self, author: AuthorId) -> ScoreResult<EditSession> {
        let surface = self
            .surface()
            .ok_or_else(|| ScoreError::not_found(format!("no surface for document {}", self.document.id)))?;
        Ok(EditSession::new(surface, author))
    }

    /// Start an edit session with a custom stroke width range.
    pub fn begin_edit_session_with(&self, author: AuthorId, stroke_range: StrokeRange) -> ScoreResult<EditSession> {
        Ok(self.begin_edit_session(author)?.with_stroke_range(stroke_range))
    }

    /// Commit `session` and recomposite so the new layer shows up.
    ///
    /// Once the layer is saved its id is returned even if the recomposite
    /// fails; the previous surface stays installed until the next one.
    pub fn commit<S: LayerStore + ?Sized>(
        &mut self,
        session: &mut EditSession,
        store: &S,
    ) -> ScoreResult<LayerId> {
        if session.document_id() != self.document.id {
            return Err(ScoreError::WrongDocument {
                session: session.document_id(),
                view: self.document.id,
            });
        }
        let layer_id = session.commit(store)?;
        if let Err(err) = self.recomposite(store) {
            log::warn!("Layer {} saved but recomposite failed: {}", layer_id, err);
        }
        Ok(layer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::store::MemoryStore;
    use crate::models::color::Color;
    use crate::models::document::ImageRef;
    use crate::engine::session::SessionState;
    use crate::models::layer::{AnnotationLayer, NewLayer, ToolKind};
    use crate::models::scene::Point;
    use std::cell::Cell;

    const AUTHOR: AuthorId = AuthorId(5);

    fn store() -> (MemoryStore, DocumentId) {
        let store = MemoryStore::new();
        store.register_author(AUTHOR);
        let doc = store
            .create_document(AUTHOR, ImageRef::new("score.png"), Size::new(1600.0, 1200.0), true)
            .unwrap();
        (store, doc.id)
    }

    #[test]
    fn test_open_unknown_document() {
        let store = MemoryStore::new();
        assert!(matches!(
            DocumentView::open(&store, DocumentId(3), Size::new(800.0, 600.0)),
            Err(ScoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_commit_recomposites_with_new_layer() {
        let (store, doc) = store();
        let mut view = DocumentView::open(&store, doc, Size::new(800.0, 600.0)).unwrap();
        assert!(view.surface().unwrap().objects().is_empty());

        let mut session = view.begin_edit_session(AUTHOR).unwrap();
        session.select_tool(ToolKind::Rectangle, Color::RED, 2.0).unwrap();
        session.pointer_down(Point::new(0.0, 0.0)).unwrap();
        session.pointer_up(Point::new(0.0, 0.0)).unwrap();
        let id = view.commit(&mut session, &store).unwrap();

        let surface = view.surface().unwrap();
        assert_eq!(surface.rendered_layers(), &[id]);
        assert!(!surface.objects()[0].interactive);
    }

    #[test]
    fn test_layers_from_other_sessions_show_after_recomposite() {
        let (store, doc) = store();
        let mut mine = DocumentView::open(&store, doc, Size::new(800.0, 600.0)).unwrap();
        let theirs = DocumentView::open(&store, doc, Size::new(800.0, 600.0)).unwrap();

        let mut a = mine.begin_edit_session(AUTHOR).unwrap();
        let mut b = theirs.begin_edit_session(AUTHOR).unwrap();
        for s in [&mut a, &mut b] {
            s.select_tool(ToolKind::Line, Color::RED, 2.0).unwrap();
            s.pointer_down(Point::new(0.0, 0.0)).unwrap();
        }
        a.commit(&store).unwrap();
        b.commit(&store).unwrap();

        // Neither view sees the other's marks until it recomposites.
        assert!(mine.surface().unwrap().objects().is_empty());
        mine.recomposite(&store).unwrap();
        assert_eq!(mine.surface().unwrap().rendered_layers().len(), 2);
    }

    /// Delegates to a memory store but can be told to fail reads.
    struct FlakyStore {
        inner: MemoryStore,
        fail_fetch: Cell<bool>,
    }

    impl LayerStore for FlakyStore {
        fn get_document(&self, document_id: DocumentId) -> ScoreResult<Document> {
            self.inner.get_document(document_id)
        }

        fn fetch_layers(&self, document_id: DocumentId) -> ScoreResult<Vec<AnnotationLayer>> {
            if self.fail_fetch.get() {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "offline").into());
            }
            self.inner.fetch_layers(document_id)
        }

        fn save_layer(&self, layer: NewLayer) -> ScoreResult<LayerId> {
            self.inner.save_layer(layer)
        }

        fn delete_layer(&self, layer_id: LayerId) -> ScoreResult<()> {
            self.inner.delete_layer(layer_id)
        }
    }

    #[test]
    fn test_commit_keeps_layer_id_when_recomposite_fails() {
        let (inner, doc) = store();
        let store = FlakyStore {
            inner,
            fail_fetch: Cell::new(false),
        };
        let mut view = DocumentView::open(&store, doc, Size::new(800.0, 600.0)).unwrap();
        let mut session = view.begin_edit_session(AUTHOR).unwrap();
        session.select_tool(ToolKind::Line, Color::RED, 2.0).unwrap();
        session.pointer_down(Point::new(0.0, 0.0)).unwrap();

        store.fail_fetch.set(true);
        let id = view.commit(&mut session, &store).unwrap();
        assert_eq!(session.state(), SessionState::Committed);
        assert!(view.surface().unwrap().rendered_layers().is_empty());

        store.fail_fetch.set(false);
        let layers = store.fetch_layers(doc).unwrap();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].id, id);
        assert_eq!(view.recomposite(&store).unwrap().rendered_layers(), &[id]);
    }

    #[test]
    fn test_commit_rejects_session_from_other_document() {
        let (store, doc) = store();
        let other = store
            .create_document(AUTHOR, ImageRef::new("other.png"), Size::new(800.0, 600.0), true)
            .unwrap();
        let mut view = DocumentView::open(&store, doc, Size::new(800.0, 600.0)).unwrap();
        let foreign = DocumentView::open(&store, other.id, Size::new(800.0, 600.0)).unwrap();

        let mut session = foreign.begin_edit_session(AUTHOR).unwrap();
        session.select_tool(ToolKind::Line, Color::RED, 2.0).unwrap();
        session.pointer_down(Point::new(0.0, 0.0)).unwrap();

        assert!(matches!(
            view.commit(&mut session, &store),
            Err(ScoreError::WrongDocument { session: s, view: v }) if s == other.id && v == doc
        ));
        assert_eq!(session.state(), SessionState::Drawing);
        assert!(store.fetch_layers(other.id).unwrap().is_empty());
    }

    #[test]
    fn test_background_open() {
        let (store, doc) = store();
        let mut view = DocumentView::open_in_background(&store, doc, Size::new(400.0, 400.0)).unwrap();
        view.wait().unwrap();
        let surface = view.surface().unwrap();
        assert_eq!(surface.scale(), 0.25);
        assert_eq!(surface.size(), Size::new(400.0, 300.0));
    }
}
