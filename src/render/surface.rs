//! Recording drawing surface in top-left-origin page units.
//!
//! The renderer only appends [`DrawOp`]s; a PDF backend replays them into a
//! content stream. Badge frames are recorded alongside so layout can be
//! inspected without parsing PDF output.

use crate::geometry::{PageSize, RenderPoint, RenderRect};
use crate::models::{QuestionStatus, StampColor};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    pub const fn gray(level: f64) -> Self {
        Self::new(level, level, level)
    }

    pub const WHITE: Rgb = Rgb::gray(1.0);
    pub const INK: Rgb = Rgb::gray(0.15);
    pub const SHADOW: Rgb = Rgb::gray(0.78);
    pub const DIVIDER: Rgb = Rgb::gray(0.75);
    pub const GREEN: Rgb = Rgb::new(0.20, 0.65, 0.32);
    pub const YELLOW: Rgb = Rgb::new(0.95, 0.65, 0.10);
    pub const RED: Rgb = Rgb::new(0.85, 0.20, 0.20);
    pub const PENDING: Rgb = Rgb::gray(0.60);
    pub const ACCENT: Rgb = Rgb::new(0.20, 0.40, 0.80);
}

impl From<StampColor> for Rgb {
    fn from(color: StampColor) -> Self {
        match color {
            StampColor::Green => Rgb::GREEN,
            StampColor::Yellow => Rgb::YELLOW,
            StampColor::Red => Rgb::RED,
        }
    }
}

impl From<QuestionStatus> for Rgb {
    fn from(status: QuestionStatus) -> Self {
        match status {
            QuestionStatus::Pending => Rgb::PENDING,
            QuestionStatus::Wrong => Rgb::RED,
            QuestionStatus::Partial => Rgb::YELLOW,
            QuestionStatus::Correct => Rgb::GREEN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFace {
    Regular,
    Bold,
}

/// Decoded bitmap split into color and alpha planes.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
    pub alpha: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    RoundedRect {
        rect: RenderRect,
        radius: f64,
        fill: Option<Rgb>,
        stroke: Option<(Rgb, f64)>,
    },
    Circle {
        center: RenderPoint,
        radius: f64,
        fill: Rgb,
    },
    Line {
        from: RenderPoint,
        to: RenderPoint,
        color: Rgb,
        width: f64,
    },
    Polyline {
        points: Vec<RenderPoint>,
        color: Rgb,
        width: f64,
    },
    /// `origin` is the left end of the text baseline.
    Text {
        origin: RenderPoint,
        text: String,
        size: f64,
        font: FontFace,
        color: Rgb,
    },
    Image {
        rect: RenderRect,
        image: RasterImage,
    },
}

/// What a recorded frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Section,
    Question,
    Total,
    Stamp,
    Note,
    Drawing,
}

#[derive(Debug, Clone)]
pub struct Surface {
    size: PageSize,
    ops: Vec<DrawOp>,
    frames: Vec<(FrameKind, RenderRect)>,
}

impl Surface {
    pub fn new(size: PageSize) -> Self {
        Self {
            size,
            ops: Vec::new(),
            frames: Vec::new(),
        }
    }

    pub fn size(&self) -> PageSize {
        self.size
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn push(&mut self, op: DrawOp) {
        self.ops.push(op);
    }

    pub fn record_frame(&mut self, kind: FrameKind, rect: RenderRect) {
        self.frames.push((kind, rect));
    }

    /// Frames in drawing order.
    pub fn frames(&self) -> &[(FrameKind, RenderRect)] {
        &self.frames
    }

    pub fn frames_of(&self, kind: FrameKind) -> Vec<RenderRect> {
        self.frames
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, r)| *r)
            .collect()
    }

    pub fn fill_rounded_rect(&mut self, rect: RenderRect, radius: f64, fill: Rgb, stroke: Option<(Rgb, f64)>) {
        self.push(DrawOp::RoundedRect {
            rect,
            radius,
            fill: Some(fill),
            stroke,
        });
    }

    pub fn text(&mut self, origin: RenderPoint, text: &str, size: f64, font: FontFace, color: Rgb) {
        if text.is_empty() {
            return;
        }
        self.push(DrawOp::Text {
            origin,
            text: text.to_string(),
            size,
            font,
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_and_stamp_colors_agree() {
        assert_eq!(Rgb::from(QuestionStatus::Correct), Rgb::from(StampColor::Green));
        assert_eq!(Rgb::from(QuestionStatus::Partial), Rgb::from(StampColor::Yellow));
        assert_eq!(Rgb::from(QuestionStatus::Wrong), Rgb::from(StampColor::Red));
    }

    #[test]
    fn empty_text_is_not_recorded() {
        let mut surface = Surface::new(PageSize::new(100.0, 100.0));
        surface.text(RenderPoint { x: 0.0, y: 0.0 }, "", 10.0, FontFace::Bold, Rgb::INK);
        assert!(surface.is_empty());
    }

    #[test]
    fn frames_filter_by_kind() {
        let mut surface = Surface::new(PageSize::new(100.0, 100.0));
        let rect = RenderRect { x: 1.0, y: 2.0, width: 3.0, height: 4.0 };
        surface.record_frame(FrameKind::Total, rect);
        surface.record_frame(FrameKind::Note, rect);
        assert_eq!(surface.frames_of(FrameKind::Total), vec![rect]);
        assert_eq!(surface.frames().len(), 2);
    }
}
