// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Layer compositing.
//!
//! The compositor turns a background image and an ordered set of persisted
//! layers into one [`RenderSurface`]: the background is scaled to fit the
//! viewport budget, every layer is replayed oldest first with its color
//! applied, and every replayed object is locked. A layer whose document
//! cannot be read is skipped; it never blocks the rest of the render.
//!
//! Composites can run on a worker thread. Each request gets a generation
//! number, and a result that is not from the latest generation is dropped
//! instead of being installed.

use crate::error::{ScoreError, ScoreResult};
use crate::models::document::ImageRef;
use crate::models::graph::SceneGraph;
use crate::models::layer::{AnnotationLayer, DocumentId, LayerId};
use crate::models::scene::{Point, SceneObject};
use crate::util::geometry::{fit_scale, Size};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Inputs for one composite.
#[derive(Debug, Clone)]
pub struct CompositeRequest {
    pub document_id: DocumentId,
    pub background: ImageRef,
    /// Unscaled pixel size of the background.
    pub natural_size: Size,
    /// Largest surface the viewport can show.
    pub budget: Size,
    /// Layers in paint order, oldest first.
    pub layers: Vec<AnnotationLayer>,
}

/// A layer that was left out of a composite.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedLayer {
    pub layer_id: LayerId,
    pub reason: String,
}

/// Cooperative cancellation flag shared with a worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Claim on a render surface. Released when dropped, on every path.
#[derive(Debug)]
struct SurfaceLease {
    live: Arc<AtomicUsize>,
    generation: u64,
}

impl SurfaceLease {
    fn acquire(live: &Arc<AtomicUsize>, generation: u64) -> Self {
        let now = live.fetch_add(1, Ordering::AcqRel) + 1;
        log::debug!("Acquired render surface #{} ({} live)", generation, now);
        Self {
            live: Arc::clone(live),
            generation,
        }
    }
}

impl Drop for SurfaceLease {
    fn drop(&mut self) {
        let now = self.live.fetch_sub(1, Ordering::AcqRel) - 1;
        log::debug!("Released render surface #{} ({} live)", self.generation, now);
    }
}

/// The composited, read-only scene: scaled background plus locked layer objects.
#[derive(Debug)]
pub struct RenderSurface {
    document_id: DocumentId,
    background: ImageRef,
    natural_size: Size,
    scale: f64,
    size: Size,
    objects: Vec<SceneObject>,
    rendered: Vec<LayerId>,
    skipped: Vec<SkippedLayer>,
    _lease: SurfaceLease,
}

impl RenderSurface {
    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    pub fn background(&self) -> &ImageRef {
        &self.background
    }

    pub fn natural_size(&self) -> Size {
        self.natural_size
    }

    /// Factor applied to the background, never above 1.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Surface extent; also the coordinate space of every layer on it.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Replayed objects in paint order.
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    /// Layers that made it onto the surface, in paint order.
    pub fn rendered_layers(&self) -> &[LayerId] {
        &self.rendered
    }

    pub fn skipped_layers(&self) -> &[SkippedLayer] {
        &self.skipped
    }

    pub fn generation(&self) -> u64 {
        self._lease.generation
    }

    /// Topmost hit among unlocked objects. Replayed layers are locked, so
    /// this only finds something if a caller unlocked an object.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> Option<usize> {
        self.objects
            .iter()
            .rposition(|obj| obj.hit_test(point, tolerance))
    }
}

/// Replay one layer's document with the layer color applied and every object locked.
pub fn replay_layer(layer: &AnnotationLayer, surface_size: Size) -> ScoreResult<Vec<SceneObject>> {
    let graph = SceneGraph::from_value(&layer.scene_graph_document)?;
    if graph.canvas_size() != surface_size {
        // Replayed unscaled; geometry keeps the coordinates it was saved with.
        log::debug!(
            "Layer {} was saved at {}x{}, surface is {}x{}",
            layer.id,
            graph.canvas_size().width,
            graph.canvas_size().height,
            surface_size.width,
            surface_size.height
        );
    }
    Ok(graph
        .into_objects()
        .into_iter()
        .map(|mut obj| {
            obj.apply_layer_color(layer.color);
            obj.lock();
            obj
        })
        .collect())
}

/// Build a surface. Returns `Ok(None)` if `cancel` fired before completion.
fn build_surface(
    request: CompositeRequest,
    live: &Arc<AtomicUsize>,
    generation: u64,
    cancel: &CancelToken,
) -> ScoreResult<Option<RenderSurface>> {
    let scale = fit_scale(request.natural_size, request.budget)?;
    let size = request.natural_size.scaled(scale);
    let lease = SurfaceLease::acquire(live, generation);

    let mut objects = Vec::new();
    let mut rendered = Vec::with_capacity(request.layers.len());
    let mut skipped = Vec::new();

    for layer in &request.layers {
        if cancel.is_cancelled() {
            log::debug!("Composite #{} cancelled", generation);
            return Ok(None);
        }
        match replay_layer(layer, size) {
            Ok(layer_objects) => {
                objects.extend(layer_objects);
                rendered.push(layer.id);
            }
            Err(err) => {
                log::warn!("Skipping annotation layer {}: {}", layer.id, err);
                skipped.push(SkippedLayer {
                    layer_id: layer.id,
                    reason: err.to_string(),
                });
            }
        }
    }

    if cancel.is_cancelled() {
        return Ok(None);
    }

    Ok(Some(RenderSurface {
        document_id: request.document_id,
        background: request.background,
        natural_size: request.natural_size,
        scale,
        size,
        objects,
        rendered,
        skipped,
        _lease: lease,
    }))
}

struct PendingComposite {
    generation: u64,
    cancel: CancelToken,
    receiver: Receiver<ScoreResult<Option<RenderSurface>>>,
    worker: JoinHandle<()>,
}

/// Owns the current render surface and any composite in flight.
pub struct Compositor {
    live: Arc<AtomicUsize>,
    generation: u64,
    current: Option<RenderSurface>,
    pending: Option<PendingComposite>,
    retired: Vec<JoinHandle<()>>,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compositor {
    pub fn new() -> Self {
        Self {
            live: Arc::new(AtomicUsize::new(0)),
            generation: 0,
            current: None,
            pending: None,
            retired: Vec::new(),
        }
    }

    /// The installed surface, if any.
    pub fn surface(&self) -> Option<&RenderSurface> {
        self.current.as_ref()
    }

    /// Generation of the most recent request.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of surfaces currently alive, installed or in flight.
    pub fn live_surfaces(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn next_generation(&mut self) -> u64 {
        if let Some(pending) = self.pending.take() {
            log::debug!("Superseding composite #{}", pending.generation);
            pending.cancel.cancel();
            self.retired.push(pending.worker);
        }
        self.retired.retain(|worker| !worker.is_finished());
        self.generation += 1;
        self.generation
    }

    fn install(&mut self, surface: RenderSurface) -> &RenderSurface {
        log::info!(
            "Composited {} layers ({} skipped) at scale {:.3}",
            surface.rendered.len(),
            surface.skipped.len(),
            surface.scale
        );
        // Replacing the old surface drops it, which releases its lease.
        self.current.insert(surface)
    }

    /// Composite on the calling thread and install the result.
    ///
    /// Any composite still in flight is cancelled.
    pub fn composite(&mut self, request: CompositeRequest) -> ScoreResult<&RenderSurface> {
        let generation = self.next_generation();
        let surface = build_surface(request, &self.live, generation, &CancelToken::new())?
            .ok_or(ScoreError::CompositeAborted(generation))?;
        Ok(self.install(surface))
    }

    /// Start compositing on a worker thread. Returns the request's generation.
    ///
    /// Any composite still in flight is cancelled and its result discarded.
    pub fn composite_in_background(&mut self, request: CompositeRequest) -> u64 {
        let generation = self.next_generation();
        let cancel = CancelToken::new();
        let (sender, receiver) = channel();

        let live = Arc::clone(&self.live);
        let worker_cancel = cancel.clone();
        let worker = std::thread::spawn(move || {
            let result = build_surface(request, &live, generation, &worker_cancel);
            // The receiver is gone if this composite was superseded.
            let _ = sender.send(result);
        });

        self.pending = Some(PendingComposite {
            generation,
            cancel,
            receiver,
            worker,
        });
        generation
    }

    fn accept(
        &mut self,
        generation: u64,
        result: ScoreResult<Option<RenderSurface>>,
    ) -> ScoreResult<bool> {
        match result? {
            Some(surface) if generation == self.generation => {
                self.install(surface);
                Ok(true)
            }
            Some(_) => {
                log::debug!("Discarding stale composite #{}", generation);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    /// Install a finished background composite, if one is ready.
    ///
    /// Returns `Ok(true)` when a new surface was installed.
    pub fn poll(&mut self) -> ScoreResult<bool> {
        let Some(pending) = self.pending.as_ref() else {
            return Ok(false);
        };
        let generation = pending.generation;
        match pending.receiver.try_recv() {
            Ok(result) => {
                self.pending = None;
                self.accept(generation, result)
            }
            Err(TryRecvError::Empty) => Ok(false),
            Err(TryRecvError::Disconnected) => {
                self.pending = None;
                Err(ScoreError::CompositeAborted(generation))
            }
        }
    }

    /// Block until the pending composite (if any) finishes, and install it.
    ///
    /// Superseded workers are joined too, so every stale surface has been
    /// released when this returns.
    pub fn wait(&mut self) -> ScoreResult<bool> {
        let outcome = match self.pending.take() {
            Some(pending) => {
                let result = pending.receiver.recv();
                let _ = pending.worker.join();
                match result {
                    Ok(result) => self.accept(pending.generation, result),
                    Err(_) => Err(ScoreError::CompositeAborted(pending.generation)),
                }
            }
            None => Ok(false),
        };
        for worker in self.retired.drain(..) {
            let _ = worker.join();
        }
        outcome
    }

    /// Drop the installed surface and cancel anything in flight.
    pub fn reset(&mut self) {
        self.next_generation();
        self.current = None;
    }
}

impl Drop for Compositor {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::color::Color;
    use crate::models::layer::{AuthorId, ToolKind};
    use crate::models::scene::ObjectKind;
    use serde_json::json;

    fn layer(id: u64, color: Color, document: serde_json::Value) -> AnnotationLayer {
        AnnotationLayer {
            id: LayerId(id),
            document_id: DocumentId(1),
            author_id: AuthorId(1),
            color,
            tool_kind: ToolKind::Rectangle,
            scene_graph_document: document,
            created_at: chrono::Utc::now(),
            accepted: false,
            reviewed: false,
        }
    }

    fn rect_document() -> serde_json::Value {
        json!({
            "canvasWidth": 800.0, "canvasHeight": 600.0,
            "objects": [
                { "type": "rect", "left": 100, "top": 100, "width": 100, "height": 60,
                  "stroke": "#000000", "strokeWidth": 2, "fill": "#00ff00" },
                { "type": "textbox", "left": 10, "top": 10, "width": 150, "fontSize": 16,
                  "text": "rit.", "stroke": "#000000", "strokeWidth": 0, "fill": "#000000" }
            ]
        })
    }

    fn request(layers: Vec<AnnotationLayer>) -> CompositeRequest {
        CompositeRequest {
            document_id: DocumentId(1),
            background: ImageRef::new("score.png"),
            natural_size: Size::new(1600.0, 1200.0),
            budget: Size::new(800.0, 600.0),
            layers,
        }
    }

    #[test]
    fn test_background_scaled_to_budget() {
        let mut compositor = Compositor::new();
        let surface = compositor.composite(request(Vec::new())).unwrap();
        assert_eq!(surface.scale(), 0.5);
        assert_eq!(surface.size(), Size::new(800.0, 600.0));
        assert!(surface.objects().is_empty());
    }

    #[test]
    fn test_replayed_objects_are_recolored_and_locked() {
        let blue = Color::rgb(0, 0, 255);
        let mut compositor = Compositor::new();
        let surface = compositor
            .composite(request(vec![layer(1, blue, rect_document())]))
            .unwrap();

        let objects = surface.objects();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].kind(), ObjectKind::Rectangle);
        assert_eq!(objects[0].style.stroke, blue);
        assert_eq!(objects[0].style.fill, Color::TRANSPARENT);
        assert_eq!(objects[1].style.fill, blue);
        assert!(objects.iter().all(|o| !o.interactive && o.locked));
        assert_eq!(surface.hit_test(Point::new(150.0, 130.0), 2.0), None);
    }

    #[test]
    fn test_layers_paint_in_order() {
        let mut compositor = Compositor::new();
        let surface = compositor
            .composite(request(vec![
                layer(1, Color::RED, rect_document()),
                layer(2, Color::BLACK, rect_document()),
            ]))
            .unwrap();
        assert_eq!(surface.rendered_layers(), &[LayerId(1), LayerId(2)]);
        assert_eq!(surface.objects()[0].style.stroke, Color::RED);
        assert_eq!(surface.objects()[3].style.stroke, Color::BLACK);
    }

    #[test]
    fn test_malformed_layer_is_skipped() {
        let broken = json!({ "canvasWidth": 800, "canvasHeight": 600,
                             "objects": [{ "type": "hexagon" }] });
        let mut compositor = Compositor::new();
        let surface = compositor
            .composite(request(vec![
                layer(1, Color::RED, rect_document()),
                layer(2, Color::RED, broken),
                layer(3, Color::RED, json!("not a document")),
                layer(4, Color::RED, rect_document()),
            ]))
            .unwrap();

        assert_eq!(surface.rendered_layers(), &[LayerId(1), LayerId(4)]);
        assert_eq!(surface.objects().len(), 4);
        let skipped: Vec<LayerId> = surface.skipped_layers().iter().map(|s| s.layer_id).collect();
        assert_eq!(skipped, vec![LayerId(2), LayerId(3)]);
    }

    #[test]
    fn test_compositing_is_idempotent() {
        let layers = vec![layer(1, Color::RED, rect_document()), layer(2, Color::BLACK, rect_document())];
        let mut compositor = Compositor::new();
        let first = compositor.composite(request(layers.clone())).unwrap().objects().to_vec();
        let second = compositor.composite(request(layers)).unwrap().objects().to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn test_saved_size_mismatch_is_not_rescaled() {
        let small = json!({
            "canvasWidth": 400.0, "canvasHeight": 300.0,
            "objects": [{ "type": "line", "x1": 10, "y1": 10, "x2": 390, "y2": 10,
                          "stroke": "#ff0000", "strokeWidth": 2, "fill": "transparent" }]
        });
        let objects = replay_layer(&layer(1, Color::RED, small), Size::new(800.0, 600.0)).unwrap();
        assert_eq!(
            objects[0].shape,
            crate::models::scene::Shape::Line { from: Point::new(10.0, 10.0), to: Point::new(390.0, 10.0) }
        );
    }

    #[test]
    fn test_invalid_background_fails() {
        let mut compositor = Compositor::new();
        let mut req = request(Vec::new());
        req.natural_size = Size::new(0.0, 0.0);
        assert!(matches!(compositor.composite(req), Err(ScoreError::InvalidGeometry(_))));
        assert_eq!(compositor.live_surfaces(), 0);
    }

    #[test]
    fn test_replacing_surface_releases_the_old_one() {
        let mut compositor = Compositor::new();
        compositor.composite(request(Vec::new())).unwrap();
        compositor.composite(request(Vec::new())).unwrap();
        assert_eq!(compositor.live_surfaces(), 1);
        compositor.reset();
        assert_eq!(compositor.live_surfaces(), 0);
        assert!(compositor.surface().is_none());
    }

    #[test]
    fn test_background_composite_installs_latest_only() {
        let mut compositor = Compositor::new();
        let stale = compositor.composite_in_background(request(vec![layer(1, Color::RED, rect_document())]));
        let fresh = compositor.composite_in_background(request(vec![
            layer(1, Color::RED, rect_document()),
            layer(2, Color::RED, rect_document()),
        ]));
        assert!(fresh > stale);

        assert!(compositor.wait().unwrap());
        let surface = compositor.surface().unwrap();
        assert_eq!(surface.generation(), fresh);
        assert_eq!(surface.rendered_layers(), &[LayerId(1), LayerId(2)]);
        assert_eq!(compositor.live_surfaces(), 1);
    }

    #[test]
    fn test_cancelled_build_releases_surface() {
        let live = Arc::new(AtomicUsize::new(0));
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = build_surface(
            request(vec![layer(1, Color::RED, rect_document())]),
            &live,
            1,
            &cancel,
        )
        .unwrap();
        assert!(result.is_none());
        assert_eq!(live.load(Ordering::Acquire), 0);
    }

    fn orphaned(compositor: &mut Compositor) -> u64 {
        let generation = compositor.next_generation();
        let (sender, receiver) = channel();
        drop(sender);
        compositor.pending = Some(PendingComposite {
            generation,
            cancel: CancelToken::new(),
            receiver,
            worker: std::thread::spawn(|| {}),
        });
        generation
    }

    #[test]
    fn test_worker_exit_is_reported() {
        let mut compositor = Compositor::new();
        let generation = orphaned(&mut compositor);
        assert!(matches!(
            compositor.poll(),
            Err(ScoreError::CompositeAborted(g)) if g == generation
        ));
        assert!(!compositor.is_pending());

        let generation = orphaned(&mut compositor);
        assert!(matches!(
            compositor.wait(),
            Err(ScoreError::CompositeAborted(g)) if g == generation
        ));
        assert!(compositor.surface().is_none());
    }

    #[test]
    fn test_poll_without_pending_is_noop() {
        let mut compositor = Compositor::new();
        assert!(!compositor.poll().unwrap());
        assert!(!compositor.wait().unwrap());
    }
}
