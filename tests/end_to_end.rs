// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

use scoremark::engine::session::SessionState;
use scoremark::io::store::{FileStore, LayerStore, MemoryStore};
use scoremark::models::color::Color;
use scoremark::models::document::ImageRef;
use scoremark::models::layer::{AuthorId, NewLayer, ToolKind};
use scoremark::models::scene::{Point, Shape};
use scoremark::util::geometry::Size;
use scoremark::{DocumentView, ScoreError};

const OWNER: AuthorId = AuthorId(1);
const BUDGET: Size = Size::new(800.0, 600.0);

#[test]
fn test_rectangle_survives_commit_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("layers.yaml");

    let document_id = {
        let store = FileStore::open(&path).unwrap();
        store.register_author(OWNER).unwrap();
        let document = store
            .create_document(OWNER, ImageRef::new("scores/sonata.png"), Size::new(1600.0, 1200.0), true)
            .unwrap();

        let mut view = DocumentView::open(&store, document.id, BUDGET).unwrap();
        let surface = view.surface().unwrap();
        assert_eq!(surface.scale(), 0.5);
        assert_eq!(surface.size(), BUDGET);

        let mut session = view.begin_edit_session(OWNER).unwrap();
        session.select_tool(ToolKind::Rectangle, Color::rgb(0, 0, 255), 3.0).unwrap();
        session.pointer_down(Point::new(150.0, 130.0)).unwrap();
        session.pointer_up(Point::new(150.0, 130.0)).unwrap();
        view.commit(&mut session, &store).unwrap();
        assert_eq!(session.state(), SessionState::Committed);

        let layers = store.fetch_layers(document.id).unwrap();
        assert_eq!(layers.len(), 1);
        let doc = &layers[0].scene_graph_document;
        assert_eq!(doc["canvasWidth"], 800.0);
        assert_eq!(doc["canvasHeight"], 600.0);
        assert_eq!(doc["objects"].as_array().unwrap().len(), 1);
        assert_eq!(doc["objects"][0]["type"], "rect");
        document.id
    };

    let store = FileStore::open(&path).unwrap();
    let view = DocumentView::open(&store, document_id, BUDGET).unwrap();
    let surface = view.surface().unwrap();
    assert_eq!(surface.objects().len(), 1);

    let rect = &surface.objects()[0];
    assert!(!rect.interactive);
    assert!(rect.locked);
    assert_eq!(rect.style.stroke, Color::rgb(0, 0, 255));
    assert_eq!(
        rect.shape,
        Shape::Rectangle {
            origin: Point::new(100.0, 100.0),
            width: 100.0,
            height: 60.0,
        }
    );
}

#[test]
fn test_malformed_layer_is_skipped() {
    let store = MemoryStore::new();
    store.register_author(OWNER);
    let document = store
        .create_document(OWNER, ImageRef::new("score.png"), Size::new(800.0, 600.0), true)
        .unwrap();

    let mut view = DocumentView::open(&store, document.id, BUDGET).unwrap();
    for _ in 0..2 {
        let mut session = view.begin_edit_session(OWNER).unwrap();
        session.select_tool(ToolKind::Line, Color::RED, 2.0).unwrap();
        session.pointer_down(Point::new(0.0, 0.0)).unwrap();
        view.commit(&mut session, &store).unwrap();
    }
    let broken = store
        .save_layer(NewLayer {
            document_id: document.id,
            author_id: OWNER,
            color: Color::RED,
            tool_kind: ToolKind::Line,
            scene_graph_document: serde_json::json!({ "objects": "not a list" }),
        })
        .unwrap();

    let surface = view.recomposite(&store).unwrap();
    assert_eq!(surface.rendered_layers().len(), 2);
    assert_eq!(surface.objects().len(), 2);
    assert_eq!(surface.skipped_layers().len(), 1);
    assert_eq!(surface.skipped_layers()[0].layer_id, broken);
}

#[test]
fn test_commit_gating_leaves_store_unchanged() {
    let store = MemoryStore::new();
    store.register_author(OWNER);
    let document = store
        .create_document(OWNER, ImageRef::new("score.png"), Size::new(800.0, 600.0), true)
        .unwrap();
    let mut view = DocumentView::open(&store, document.id, BUDGET).unwrap();

    let mut empty = view.begin_edit_session(OWNER).unwrap();
    empty.select_tool(ToolKind::FreehandPath, Color::RED, 2.0).unwrap();
    assert!(matches!(view.commit(&mut empty, &store), Err(ScoreError::EmptySession)));
    assert_eq!(empty.state(), SessionState::ToolSelected);

    let mut drawn = view.begin_edit_session(OWNER).unwrap();
    drawn.select_tool(ToolKind::FreehandPath, Color::RED, 2.0).unwrap();
    drawn.pointer_down(Point::new(10.0, 10.0)).unwrap();
    drawn.pointer_drag(Point::new(20.0, 15.0)).unwrap();
    drawn.pointer_up(Point::new(30.0, 25.0)).unwrap();

    store.set_annotatable(document.id, OWNER, false).unwrap();
    assert!(matches!(view.commit(&mut drawn, &store), Err(ScoreError::AnnotationsDisabled)));
    assert_eq!(drawn.state(), SessionState::Drawing);
    assert_eq!(drawn.graph().len(), 1);
    assert!(store.fetch_layers(document.id).unwrap().is_empty());

    // Re-enabling lets the same session commit.
    store.set_annotatable(document.id, OWNER, true).unwrap();
    view.commit(&mut drawn, &store).unwrap();
    assert_eq!(store.fetch_layers(document.id).unwrap().len(), 1);
}

#[test]
fn test_compositing_is_idempotent() {
    let store = MemoryStore::new();
    store.register_author(OWNER);
    let document = store
        .create_document(OWNER, ImageRef::new("score.png"), Size::new(2000.0, 1000.0), true)
        .unwrap();
    let mut view = DocumentView::open(&store, document.id, BUDGET).unwrap();

    let mut session = view.begin_edit_session(OWNER).unwrap();
    session.select_tool(ToolKind::TextBox, Color::BLACK, 2.0).unwrap();
    session.pointer_down(Point::new(0.0, 0.0)).unwrap();
    session.set_text("dolce").unwrap();
    view.commit(&mut session, &store).unwrap();

    let first = view.surface().unwrap().objects().to_vec();
    let second = view.recomposite(&store).unwrap().objects().to_vec();
    assert_eq!(first, second);
    assert_eq!(view.surface().unwrap().size(), Size::new(800.0, 400.0));
}
