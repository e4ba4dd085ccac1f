// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! This module provides the scale-to-fit rule used when laying down the
//! background image, coordinate mapping between the render surface and
//! on-screen pixels, and the small amount of math needed for hit-testing.

use crate::error::{ScoreError, ScoreResult};
use crate::models::scene::Point;
use serde::{Deserialize, Serialize};

/// A width/height pair in pixels (or surface units).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Reject sizes that cannot back a render surface.
    pub fn validate(self, what: &str) -> ScoreResult<Self> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if ok(self.width) && ok(self.height) {
            Ok(self)
        } else {
            Err(ScoreError::invalid_geometry(format!(
                "{what} must be positive and finite, got {}x{}",
                self.width, self.height
            )))
        }
    }

    pub fn scaled(self, scale: f64) -> Self {
        Self::new(self.width * scale, self.height * scale)
    }
}

/// Axis-aligned bounds in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Smallest bounds enclosing every point, or `None` for an empty slice.
    pub fn enclosing(points: &[Point]) -> Option<Self> {
        let first = *points.first()?;
        Some(points.iter().skip(1).fold(
            Self { min: first, max: first },
            |acc, p| Self::from_corners(
                Point::new(acc.min.x.min(p.x), acc.min.y.min(p.y)),
                Point::new(acc.max.x.max(p.x), acc.max.y.max(p.y)),
            ),
        ))
    }

    pub fn inflate(self, by: f64) -> Self {
        Self {
            min: Point::new(self.min.x - by, self.min.y - by),
            max: Point::new(self.max.x + by, self.max.y + by),
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }
}

/// Scale factor that fits `natural` inside `budget` without ever upscaling.
///
/// `scale = min(1, budget.width / natural.width, budget.height / natural.height)`.
pub fn fit_scale(natural: Size, budget: Size) -> ScoreResult<f64> {
    let natural = natural.validate("image size")?;
    let budget = budget.validate("viewport budget")?;
    Ok(1.0_f64
        .min(budget.width / natural.width)
        .min(budget.height / natural.height))
}

/// Convert an on-screen position into surface coordinates.
///
/// `origin` is where the surface's top-left corner is drawn and
/// `zoom` is the number of screen pixels per surface unit.
pub fn screen_to_surface(screen_x: f64, screen_y: f64, origin: Point, zoom: f64) -> Point {
    Point {
        x: (screen_x - origin.x) / zoom,
        y: (screen_y - origin.y) / zoom,
    }
}

/// Convert surface coordinates into an on-screen position.
pub fn surface_to_screen(point: &Point, origin: Point, zoom: f64) -> (f64, f64) {
    (origin.x + point.x * zoom, origin.y + point.y * zoom)
}

/// Shortest distance from `p` to the segment `a`-`b`.
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance_to(&a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance_to(&Point::new(a.x + t * dx, a.y + t * dy))
}
