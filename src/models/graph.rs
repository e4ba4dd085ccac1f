// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Scene graph and its persisted document format.
//!
//! A scene graph is an ordered list of [`SceneObject`]s (paint order, later
//! on top) plus the extent of the coordinate space they live in. The
//! persisted form is a JSON document:
//!
//! ```json
//! {
//!   "canvasWidth": 800, "canvasHeight": 600,
//!   "objects": [
//!     { "type": "path", "points": [[1, 2], [3, 4]], "stroke": "#ff0000", "strokeWidth": 2, "fill": "transparent" },
//!     { "type": "line", "x1": 50, "y1": 50, "x2": 200, "y2": 50, "stroke": "#ff0000", "strokeWidth": 2, "fill": "transparent" },
//!     { "type": "rect", "left": 100, "top": 100, "width": 100, "height": 60, "stroke": "#ff0000", "strokeWidth": 2, "fill": "transparent" },
//!     { "type": "textbox", "left": 100, "top": 100, "width": 150, "fontSize": 16, "text": "Type here...", "stroke": "#ff0000", "strokeWidth": 0, "fill": "#ff0000" }
//!   ]
//! }
//! ```
//!
//! Interaction flags are render-session state and are not persisted.

use crate::error::{ScoreError, ScoreResult};
use crate::models::color::Color;
use crate::models::scene::{Point, SceneObject, Shape, Style};
use crate::util::geometry::Size;
use serde::{Deserialize, Serialize};

/// Serialized form of a [`SceneGraph`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDocument {
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub objects: Vec<WireObject>,
}

/// One serialized object, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireObject {
    Path {
        points: Vec<[f64; 2]>,
        stroke: Color,
        #[serde(rename = "strokeWidth")]
        stroke_width: f64,
        fill: Color,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        stroke: Color,
        #[serde(rename = "strokeWidth")]
        stroke_width: f64,
        fill: Color,
    },
    Rect {
        left: f64,
        top: f64,
        width: f64,
        height: f64,
        stroke: Color,
        #[serde(rename = "strokeWidth")]
        stroke_width: f64,
        fill: Color,
    },
    Textbox {
        left: f64,
        top: f64,
        width: f64,
        #[serde(rename = "fontSize")]
        font_size: f64,
        text: String,
        stroke: Color,
        #[serde(rename = "strokeWidth")]
        stroke_width: f64,
        fill: Color,
    },
}

impl From<&SceneObject> for WireObject {
    fn from(obj: &SceneObject) -> Self {
        let Style { stroke, stroke_width, fill } = obj.style;
        match &obj.shape {
            Shape::FreehandPath { points } => WireObject::Path {
                points: points.iter().map(|p| [p.x, p.y]).collect(),
                stroke,
                stroke_width,
                fill,
            },
            Shape::Line { from, to } => WireObject::Line {
                x1: from.x,
                y1: from.y,
                x2: to.x,
                y2: to.y,
                stroke,
                stroke_width,
                fill,
            },
            Shape::Rectangle { origin, width, height } => WireObject::Rect {
                left: origin.x,
                top: origin.y,
                width: *width,
                height: *height,
                stroke,
                stroke_width,
                fill,
            },
            Shape::TextBox { origin, width, font_size, content } => WireObject::Textbox {
                left: origin.x,
                top: origin.y,
                width: *width,
                font_size: *font_size,
                text: content.clone(),
                stroke,
                stroke_width,
                fill,
            },
        }
    }
}

impl TryFrom<WireObject> for SceneObject {
    type Error = ScoreError;

    fn try_from(wire: WireObject) -> Result<Self, Self::Error> {
        let (shape, style) = match wire {
            WireObject::Path { points, stroke, stroke_width, fill } => (
                Shape::FreehandPath {
                    points: points.into_iter().map(|[x, y]| Point::new(x, y)).collect(),
                },
                Style { stroke, stroke_width, fill },
            ),
            WireObject::Line { x1, y1, x2, y2, stroke, stroke_width, fill } => (
                Shape::Line {
                    from: Point::new(x1, y1),
                    to: Point::new(x2, y2),
                },
                Style { stroke, stroke_width, fill },
            ),
            WireObject::Rect { left, top, width, height, stroke, stroke_width, fill } => (
                Shape::Rectangle {
                    origin: Point::new(left, top),
                    width,
                    height,
                },
                Style { stroke, stroke_width, fill },
            ),
            WireObject::Textbox { left, top, width, font_size, text, stroke, stroke_width, fill } => (
                Shape::TextBox {
                    origin: Point::new(left, top),
                    width,
                    font_size,
                    content: text,
                },
                Style { stroke, stroke_width, fill },
            ),
        };
        SceneObject::new(shape, style).map_err(|e| ScoreError::malformed(e.to_string()))
    }
}

/// Ordered collection of scene objects over a fixed coordinate space.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneGraph {
    canvas: Size,
    objects: Vec<SceneObject>,
}

impl SceneGraph {
    /// Create an empty graph whose coordinate space is `canvas`.
    pub fn new(canvas: Size) -> Self {
        Self {
            canvas,
            objects: Vec::new(),
        }
    }

    pub fn canvas_size(&self) -> Size {
        self.canvas
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn get(&self, index: usize) -> Option<&SceneObject> {
        self.objects.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut SceneObject> {
        self.objects.get_mut(index)
    }

    /// Append on top of everything else. Returns the new object's index.
    pub fn push(&mut self, object: SceneObject) -> usize {
        self.objects.push(object);
        self.objects.len() - 1
    }

    pub fn remove(&mut self, index: usize) -> Option<SceneObject> {
        (index < self.objects.len()).then(|| self.objects.remove(index))
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn into_objects(self) -> Vec<SceneObject> {
        self.objects
    }

    /// Index of the topmost object under `point`.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> Option<usize> {
        self.objects
            .iter()
            .rposition(|obj| obj.hit_test(point, tolerance))
    }

    /// Produce the persisted form, preserving object order.
    pub fn to_document(&self) -> SceneDocument {
        SceneDocument {
            canvas_width: self.canvas.width,
            canvas_height: self.canvas.height,
            objects: self.objects.iter().map(WireObject::from).collect(),
        }
    }

    /// Rebuild a graph from its persisted form.
    ///
    /// Reconstructed objects start out interactive; playback locks them.
    pub fn from_document(doc: SceneDocument) -> ScoreResult<Self> {
        let canvas = Size::new(doc.canvas_width, doc.canvas_height)
            .validate("canvas size")
            .map_err(|e| ScoreError::malformed(e.to_string()))?;
        let objects = doc
            .objects
            .into_iter()
            .enumerate()
            .map(|(i, wire)| {
                SceneObject::try_from(wire)
                    .map_err(|e| ScoreError::malformed(format!("object {i}: {e}")))
            })
            .collect::<ScoreResult<Vec<_>>>()?;
        Ok(Self { canvas, objects })
    }

    /// Serialize into the JSON value stored on an annotation layer.
    ///
    /// Fails with `InvalidGeometry` if any object has non-finite geometry,
    /// which JSON cannot represent.
    pub fn to_value(&self) -> ScoreResult<serde_json::Value> {
        for (i, obj) in self.objects.iter().enumerate() {
            obj.shape.validate()?;
            if !obj.style.stroke_width.is_finite() {
                return Err(ScoreError::invalid_geometry(format!("object {i}: stroke width is not finite")));
            }
        }
        Ok(serde_json::to_value(self.to_document())?)
    }

    /// Parse the JSON value stored on an annotation layer.
    pub fn from_value(value: &serde_json::Value) -> ScoreResult<Self> {
        let doc = SceneDocument::deserialize(value).map_err(|e| ScoreError::malformed(e.to_string()))?;
        Self::from_document(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn sample_graph() -> SceneGraph {
        let mut graph = SceneGraph::new(Size::new(800.0, 600.0));
        graph.push(
            SceneObject::freehand(
                vec![Point::new(1.0, 2.0), Point::new(3.5, 4.25)],
                Color::RED,
                2.0,
            )
            .unwrap(),
        );
        graph.push(
            SceneObject::line(Point::new(50.0, 50.0), Point::new(200.0, 50.0), Color::BLACK, 3.0)
                .unwrap(),
        );
        graph.push(
            SceneObject::rectangle(Point::new(100.0, 100.0), 100.0, 60.0, Color::RED, 2.0).unwrap(),
        );
        graph.push(
            SceneObject::text_box(Point::new(100.0, 100.0), 150.0, 16.0, "Allegro", Color::RED)
                .unwrap(),
        );
        graph
    }

    #[test]
    fn test_document_roundtrip_preserves_order_and_style() {
        let graph = sample_graph();
        let value = graph.to_value().unwrap();
        let back = SceneGraph::from_value(&value).unwrap();
        assert_eq!(back, graph);
    }

    #[test]
    fn test_wire_layout() {
        let value = sample_graph().to_value().unwrap();
        assert_eq!(value["canvasWidth"], json!(800.0));
        assert_eq!(value["canvasHeight"], json!(600.0));
        assert_eq!(value["objects"][0]["type"], json!("path"));
        assert_eq!(value["objects"][0]["points"][1], json!([3.5, 4.25]));
        assert_eq!(value["objects"][1]["type"], json!("line"));
        assert_eq!(value["objects"][1]["x2"], json!(200.0));
        assert_eq!(value["objects"][2]["type"], json!("rect"));
        assert_eq!(value["objects"][2]["fill"], json!("transparent"));
        assert_eq!(value["objects"][3]["type"], json!("textbox"));
        assert_eq!(value["objects"][3]["fontSize"], json!(16.0));
        assert_eq!(value["objects"][3]["text"], json!("Allegro"));
        assert!(value["objects"][3].get("interactive").is_none());
    }

    #[test]
    fn test_reads_integer_coordinates() {
        let value = json!({
            "canvasWidth": 800,
            "canvasHeight": 600,
            "objects": [
                { "type": "rect", "left": 0, "top": 0, "width": 10, "height": 5,
                  "stroke": "#00ff00", "strokeWidth": 1, "fill": "transparent" }
            ]
        });
        let graph = SceneGraph::from_value(&value).unwrap();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.objects()[0].style.stroke, Color::rgb(0, 255, 0));
    }

    #[test]
    fn test_unknown_kind_is_malformed() {
        let value = json!({
            "canvasWidth": 800, "canvasHeight": 600,
            "objects": [{ "type": "circle", "radius": 4 }]
        });
        assert!(matches!(
            SceneGraph::from_value(&value),
            Err(ScoreError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_missing_or_non_numeric_geometry_is_malformed() {
        let missing = json!({
            "canvasWidth": 800, "canvasHeight": 600,
            "objects": [{ "type": "line", "x1": 0, "y1": 0, "x2": 5,
                          "stroke": "#ff0000", "strokeWidth": 1, "fill": "transparent" }]
        });
        assert!(matches!(
            SceneGraph::from_value(&missing),
            Err(ScoreError::MalformedDocument(_))
        ));

        let non_numeric = json!({
            "canvasWidth": 800, "canvasHeight": 600,
            "objects": [{ "type": "line", "x1": "0", "y1": 0, "x2": 5, "y2": 5,
                          "stroke": "#ff0000", "strokeWidth": 1, "fill": "transparent" }]
        });
        assert!(matches!(
            SceneGraph::from_value(&non_numeric),
            Err(ScoreError::MalformedDocument(_))
        ));

        let no_canvas = json!({ "objects": [] });
        assert!(matches!(
            SceneGraph::from_value(&no_canvas),
            Err(ScoreError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_negative_extent_is_malformed() {
        let value = json!({
            "canvasWidth": 800, "canvasHeight": 600,
            "objects": [{ "type": "rect", "left": 0, "top": 0, "width": -1, "height": 5,
                          "stroke": "#ff0000", "strokeWidth": 1, "fill": "transparent" }]
        });
        assert!(matches!(
            SceneGraph::from_value(&value),
            Err(ScoreError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let graph = sample_graph();
        // Rectangle (index 2) and text box (index 3) overlap at (110, 110).
        assert_eq!(graph.hit_test(Point::new(110.0, 110.0), 1.0), Some(3));
        assert_eq!(graph.hit_test(Point::new(700.0, 500.0), 1.0), None);
    }

    fn coord() -> impl Strategy<Value = f64> {
        -2000.0f64..2000.0
    }

    fn extent() -> impl Strategy<Value = f64> {
        0.0f64..2000.0
    }

    fn color() -> impl Strategy<Value = Color> {
        (any::<u8>(), any::<u8>(), any::<u8>(), any::<u8>())
            .prop_map(|(r, g, b, a)| Color::rgba(r, g, b, a))
    }

    fn point() -> impl Strategy<Value = Point> {
        (coord(), coord()).prop_map(|(x, y)| Point::new(x, y))
    }

    fn object() -> impl Strategy<Value = SceneObject> {
        let style = (color(), 0.0f64..20.0, color())
            .prop_map(|(stroke, stroke_width, fill)| Style { stroke, stroke_width, fill });
        let shape = prop_oneof![
            prop::collection::vec(point(), 0..16).prop_map(|points| Shape::FreehandPath { points }),
            (point(), point()).prop_map(|(from, to)| Shape::Line { from, to }),
            (point(), extent(), extent())
                .prop_map(|(origin, width, height)| Shape::Rectangle { origin, width, height }),
            (point(), extent(), 1.0f64..96.0, ".{0,24}").prop_map(|(origin, width, font_size, content)| {
                Shape::TextBox { origin, width, font_size, content }
            }),
        ];
        (shape, style).prop_map(|(shape, style)| SceneObject::new(shape, style).unwrap())
    }

    #[test]
    fn test_non_finite_geometry_is_not_serialized() {
        let mut graph = SceneGraph::new(Size::new(800.0, 600.0));
        let index = graph.push(SceneObject::rectangle(Point::new(10.0, 10.0), 50.0, 20.0, Color::RED, 2.0).unwrap());
        if let Some(SceneObject {
            shape: Shape::Rectangle { origin, .. },
            ..
        }) = graph.get_mut(index)
        {
            origin.x = f64::INFINITY;
        }
        assert!(matches!(graph.to_value(), Err(ScoreError::InvalidGeometry(_))));
    }

    proptest! {
        #[test]
        fn document_roundtrip_is_structural_identity(
            width in 1.0f64..4000.0,
            height in 1.0f64..4000.0,
            objects in prop::collection::vec(object(), 0..12),
        ) {
            let mut graph = SceneGraph::new(Size::new(width, height));
            for obj in objects {
                graph.push(obj);
            }

            let text = serde_json::to_string(&graph.to_value().unwrap()).unwrap();
            let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
            let back = SceneGraph::from_value(&parsed).unwrap();

            prop_assert_eq!(back, graph);
        }
    }
}
