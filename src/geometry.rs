//! Page-relative geometry shared by the model, the engine and the renderer.
//!
//! Positions are stored in PDF orientation: x grows to the right from the
//! left edge, y grows upward from the bottom edge, both in [0, 1]. The
//! renderer works in a top-left-origin surface, so every conversion to
//! absolute units goes through [`NormalizedPosition::to_render_point`].

use serde::{Deserialize, Serialize};

/// Page-relative coordinate plus 0-based page index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPosition {
    pub x: f64,
    pub y: f64,
    pub page: usize,
}

impl NormalizedPosition {
    /// Build a position, clamping coordinates into [0, 1].
    pub fn new(x: f64, y: f64, page: usize) -> Self {
        Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
            page,
        }
    }

    /// Convert a tap on a top-left-origin view of `size` into a position.
    pub fn from_view_point(point: RenderPoint, size: PageSize, page: usize) -> Self {
        if size.width <= 0.0 || size.height <= 0.0 {
            return Self::new(0.0, 0.0, page);
        }
        Self::new(point.x / size.width, 1.0 - point.y / size.height, page)
    }

    /// Absolute point in a top-left-origin surface of `size`.
    pub fn to_render_point(&self, size: PageSize) -> RenderPoint {
        RenderPoint {
            x: self.x * size.width,
            y: (1.0 - self.y) * size.height,
        }
    }

    /// Euclidean distance in normalized units, ignoring pages.
    pub fn distance_to(&self, other: &NormalizedPosition) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Relative box of an ink drawing. (x, y) is the bottom-left corner in
/// PDF orientation, width and height are page fractions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawingBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DrawingBounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        let x = clamp_unit(x);
        let y = clamp_unit(y);
        Self {
            x,
            y,
            width: width.clamp(0.0, 1.0 - x),
            height: height.clamp(0.0, 1.0 - y),
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }

    /// Absolute rectangle in a top-left-origin surface of `size`.
    pub fn to_render_rect(&self, size: PageSize) -> RenderRect {
        RenderRect {
            x: self.x * size.width,
            y: (1.0 - (self.y + self.height)) * size.height,
            width: self.width * size.width,
            height: self.height * size.height,
        }
    }
}

/// Page size in PDF units (points).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Absolute point in a top-left-origin surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPoint {
    pub x: f64,
    pub y: f64,
}

/// Absolute rectangle in a top-left-origin surface; (x, y) is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl RenderRect {
    /// Rectangle of `width` x `height` centered on `center`.
    pub fn centered_at(center: RenderPoint, width: f64, height: f64) -> Self {
        Self {
            x: center.x - width / 2.0,
            y: center.y - height / 2.0,
            width,
            height,
        }
    }

    pub fn center(&self) -> RenderPoint {
        RenderPoint {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
