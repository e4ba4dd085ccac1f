// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Scene object data structures.
//!
//! This module defines the vector primitives that make up an annotation
//! layer: freehand paths, lines, rectangles and text boxes. All geometry
//! is expressed in the owning scene graph's surface coordinates.

use crate::error::{ScoreError, ScoreResult};
use crate::models::color::Color;
use crate::util::geometry::{distance_to_segment, Bounds};
use serde::{Deserialize, Serialize};

/// Line height used to estimate a text box's extent, as a multiple of font size.
pub const TEXT_LINE_HEIGHT: f64 = 1.16;

/// A 2D point in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Kind of scene object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    FreehandPath,
    Line,
    Rectangle,
    TextBox,
}

/// Kind-specific geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    FreehandPath {
        points: Vec<Point>,
    },
    Line {
        from: Point,
        to: Point,
    },
    Rectangle {
        origin: Point,
        width: f64,
        height: f64,
    },
    TextBox {
        origin: Point,
        width: f64,
        font_size: f64,
        content: String,
    },
}

impl Shape {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Shape::FreehandPath { .. } => ObjectKind::FreehandPath,
            Shape::Line { .. } => ObjectKind::Line,
            Shape::Rectangle { .. } => ObjectKind::Rectangle,
            Shape::TextBox { .. } => ObjectKind::TextBox,
        }
    }

    /// Check that every coordinate is finite and every extent non-negative.
    pub fn validate(&self) -> ScoreResult<()> {
        let extent = |name: &str, v: f64| {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(ScoreError::invalid_geometry(format!("{name} must be finite and >= 0, got {v}")))
            }
        };
        let point = |p: &Point| {
            if p.is_finite() {
                Ok(())
            } else {
                Err(ScoreError::invalid_geometry(format!("non-finite point ({}, {})", p.x, p.y)))
            }
        };

        match self {
            Shape::FreehandPath { points } => points.iter().try_for_each(point),
            Shape::Line { from, to } => {
                point(from)?;
                point(to)
            }
            Shape::Rectangle { origin, width, height } => {
                point(origin)?;
                extent("width", *width)?;
                extent("height", *height)
            }
            Shape::TextBox { origin, width, font_size, .. } => {
                point(origin)?;
                extent("width", *width)?;
                extent("font size", *font_size)
            }
        }
    }
}

/// Stroke and fill attributes shared by every kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub stroke: Color,
    pub stroke_width: f64,
    pub fill: Color,
}

impl Style {
    /// Outline style: colored stroke, transparent fill.
    pub fn outline(color: Color, stroke_width: f64) -> Self {
        Self {
            stroke: color,
            stroke_width,
            fill: Color::TRANSPARENT,
        }
    }

    /// Filled style used for text: stroke and fill share the color.
    pub fn filled(color: Color, stroke_width: f64) -> Self {
        Self {
            stroke: color,
            stroke_width,
            fill: color,
        }
    }
}

/// Part of an object grabbed by a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    /// The whole object.
    Body,
    /// Bottom-right corner of a rectangle or text box.
    Corner,
    /// First endpoint of a line.
    Start,
    /// Second endpoint of a line.
    End,
}

/// A vector object on a scene graph.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub shape: Shape,
    pub style: Style,
    /// Selectable and editable.
    pub interactive: bool,
    /// Excluded from hit-testing.
    pub locked: bool,
}

impl SceneObject {
    /// Create an object, validating its geometry.
    pub fn new(shape: Shape, style: Style) -> ScoreResult<Self> {
        shape.validate()?;
        if !(style.stroke_width.is_finite() && style.stroke_width >= 0.0) {
            return Err(ScoreError::invalid_geometry(format!(
                "stroke width must be finite and >= 0, got {}",
                style.stroke_width
            )));
        }
        Ok(Self {
            shape,
            style,
            interactive: true,
            locked: false,
        })
    }

    pub fn freehand(points: Vec<Point>, color: Color, stroke_width: f64) -> ScoreResult<Self> {
        Self::new(Shape::FreehandPath { points }, Style::outline(color, stroke_width))
    }

    pub fn line(from: Point, to: Point, color: Color, stroke_width: f64) -> ScoreResult<Self> {
        Self::new(Shape::Line { from, to }, Style::outline(color, stroke_width))
    }

    pub fn rectangle(
        origin: Point,
        width: f64,
        height: f64,
        color: Color,
        stroke_width: f64,
    ) -> ScoreResult<Self> {
        Self::new(
            Shape::Rectangle { origin, width, height },
            Style::outline(color, stroke_width),
        )
    }

    pub fn text_box(
        origin: Point,
        width: f64,
        font_size: f64,
        content: impl Into<String>,
        color: Color,
    ) -> ScoreResult<Self> {
        Self::new(
            Shape::TextBox {
                origin,
                width,
                font_size,
                content: content.into(),
            },
            Style::filled(color, 0.0),
        )
    }

    pub fn kind(&self) -> ObjectKind {
        self.shape.kind()
    }

    /// Axis-aligned extent of the geometry, ignoring stroke width.
    pub fn bounds(&self) -> Bounds {
        match &self.shape {
            Shape::FreehandPath { points } => Bounds::enclosing(points).unwrap_or(Bounds {
                min: Point::new(0.0, 0.0),
                max: Point::new(0.0, 0.0),
            }),
            Shape::Line { from, to } => Bounds::from_corners(*from, *to),
            Shape::Rectangle { origin, width, height } => {
                Bounds::from_corners(*origin, origin.offset(*width, *height))
            }
            Shape::TextBox { origin, width, font_size, content } => {
                let lines = content.lines().count().max(1) as f64;
                Bounds::from_corners(
                    *origin,
                    origin.offset(*width, lines * font_size * TEXT_LINE_HEIGHT),
                )
            }
        }
    }

    /// Whether `point` touches this object within `tolerance`.
    ///
    /// Locked objects never hit.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        if self.locked {
            return false;
        }
        let reach = tolerance + self.style.stroke_width / 2.0;
        match &self.shape {
            Shape::FreehandPath { points } => match points.as_slice() {
                [] => false,
                [only] => only.distance_to(&point) <= reach,
                _ => points
                    .windows(2)
                    .any(|w| distance_to_segment(point, w[0], w[1]) <= reach),
            },
            Shape::Line { from, to } => distance_to_segment(point, *from, *to) <= reach,
            Shape::Rectangle { .. } | Shape::TextBox { .. } => {
                self.bounds().inflate(reach).contains(point)
            }
        }
    }

    /// Which handle of this object sits under `point`, if any.
    pub fn handle_at(&self, point: Point, tolerance: f64) -> Option<Handle> {
        if self.locked {
            return None;
        }
        match &self.shape {
            Shape::Line { from, to } => {
                if from.distance_to(&point) <= tolerance {
                    return Some(Handle::Start);
                }
                if to.distance_to(&point) <= tolerance {
                    return Some(Handle::End);
                }
            }
            Shape::Rectangle { .. } | Shape::TextBox { .. } => {
                if self.bounds().max.distance_to(&point) <= tolerance {
                    return Some(Handle::Corner);
                }
            }
            Shape::FreehandPath { .. } => {}
        }
        self.hit_test(point, tolerance).then_some(Handle::Body)
    }

    /// Move every coordinate by `(dx, dy)`.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        match &mut self.shape {
            Shape::FreehandPath { points } => {
                for p in points.iter_mut() {
                    *p = p.offset(dx, dy);
                }
            }
            Shape::Line { from, to } => {
                *from = from.offset(dx, dy);
                *to = to.offset(dx, dy);
            }
            Shape::Rectangle { origin, .. } | Shape::TextBox { origin, .. } => {
                *origin = origin.offset(dx, dy);
            }
        }
    }

    /// Drag `handle` by `(dx, dy)`. Extents never go below zero.
    pub fn drag_handle(&mut self, handle: Handle, dx: f64, dy: f64) {
        if handle == Handle::Body {
            self.translate(dx, dy);
            return;
        }
        match (handle, &mut self.shape) {
            (Handle::Start, Shape::Line { from, .. }) => *from = from.offset(dx, dy),
            (Handle::End, Shape::Line { to, .. }) => *to = to.offset(dx, dy),
            (Handle::Corner, Shape::Rectangle { width, height, .. }) => {
                *width = (*width + dx).max(0.0);
                *height = (*height + dy).max(0.0);
            }
            (Handle::Corner, Shape::TextBox { width, .. }) => {
                *width = (*width + dx).max(0.0);
            }
            _ => {}
        }
    }

    /// Extend a freehand path. Returns `false` for other kinds.
    pub fn push_point(&mut self, point: Point) -> bool {
        match &mut self.shape {
            Shape::FreehandPath { points } if point.is_finite() => {
                points.push(point);
                true
            }
            _ => false,
        }
    }

    /// Recolor with a layer's color.
    ///
    /// Every kind takes the stroke. Text boxes also take the fill;
    /// rectangles and paths keep a transparent fill.
    pub fn apply_layer_color(&mut self, color: Color) {
        self.style.stroke = color;
        match self.shape.kind() {
            ObjectKind::TextBox => self.style.fill = color,
            ObjectKind::Rectangle | ObjectKind::FreehandPath => self.style.fill = Color::TRANSPARENT,
            ObjectKind::Line => {}
        }
    }

    /// Freeze the object for read-only playback.
    pub fn lock(&mut self) {
        self.interactive = false;
        self.locked = true;
    }
}
