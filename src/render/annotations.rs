//! Free-form annotations: stamps, text notes and ink drawings.

use super::ink::{self, InkPayload};
use super::metrics::{text_width, wrap_text};
use super::surface::{DrawOp, FontFace, FrameKind, Rgb, Surface};
use crate::geometry::{DrawingBounds, NormalizedPosition, RenderPoint, RenderRect};
use crate::models::{Annotation, AnnotationContent, StampColor};

pub const NOTE_FONT_SIZE: f64 = 9.0;
pub const NOTE_WRAP_WIDTH: f64 = 180.0;
const NOTE_PADDING: f64 = 5.0;
const NOTE_LINE_HEIGHT: f64 = NOTE_FONT_SIZE * 1.25;
const NOTE_FILL: Rgb = Rgb::new(1.0, 0.97, 0.75);
const NOTE_BORDER: Rgb = Rgb::new(0.85, 0.78, 0.45);
const STAMP_FONT_SIZE: f64 = 10.0;
const STAMP_PADDING_X: f64 = 8.0;
const STAMP_PADDING_Y: f64 = 4.0;

/// Draw one annotation. Returns false when nothing could be drawn.
pub fn draw_annotation(surface: &mut Surface, annotation: &Annotation) -> bool {
    match &annotation.content {
        AnnotationContent::Text { text } => {
            draw_text_note(surface, text, &annotation.position);
            true
        }
        AnnotationContent::Stamp { text, color, .. } => {
            draw_stamp(surface, text, *color, &annotation.position);
            true
        }
        AnnotationContent::Drawing { data, bounds } => draw_ink(surface, data, bounds),
    }
}

/// Centered pill filled with the stamp color.
pub fn draw_stamp(surface: &mut Surface, label: &str, color: StampColor, position: &NormalizedPosition) -> RenderRect {
    let text_w = text_width(label, STAMP_FONT_SIZE, FontFace::Bold);
    let center = position.to_render_point(surface.size());
    let frame = RenderRect::centered_at(
        center,
        text_w + 2.0 * STAMP_PADDING_X,
        STAMP_FONT_SIZE + 2.0 * STAMP_PADDING_Y,
    );
    surface.fill_rounded_rect(frame, frame.height / 2.0, Rgb::from(color), None);
    surface.text(
        RenderPoint {
            x: center.x - text_w / 2.0,
            y: center.y + STAMP_FONT_SIZE * 0.35,
        },
        label,
        STAMP_FONT_SIZE,
        FontFace::Bold,
        Rgb::WHITE,
    );
    surface.record_frame(FrameKind::Stamp, frame);
    frame
}

/// Sticky note whose top-left corner sits at the position.
pub fn draw_text_note(surface: &mut Surface, text: &str, position: &NormalizedPosition) -> RenderRect {
    let lines = wrap_text(text, NOTE_WRAP_WIDTH, NOTE_FONT_SIZE, FontFace::Regular);
    let widest = lines
        .iter()
        .map(|l| text_width(l, NOTE_FONT_SIZE, FontFace::Regular))
        .fold(0.0_f64, f64::max);

    let origin = position.to_render_point(surface.size());
    let frame = RenderRect {
        x: origin.x,
        y: origin.y,
        width: widest + 2.0 * NOTE_PADDING,
        height: NOTE_LINE_HEIGHT * lines.len() as f64 + 2.0 * NOTE_PADDING,
    };
    surface.fill_rounded_rect(frame, 3.0, NOTE_FILL, Some((NOTE_BORDER, 0.5)));

    for (i, line) in lines.iter().enumerate() {
        let baseline = frame.y + NOTE_PADDING + NOTE_LINE_HEIGHT * i as f64 + NOTE_FONT_SIZE;
        surface.text(
            RenderPoint { x: frame.x + NOTE_PADDING, y: baseline },
            line,
            NOTE_FONT_SIZE,
            FontFace::Regular,
            Rgb::INK,
        );
    }
    surface.record_frame(FrameKind::Note, frame);
    frame
}

/// Ink scaled into its bounds. Undecodable payloads are skipped.
pub fn draw_ink(surface: &mut Surface, data: &[u8], bounds: &DrawingBounds) -> bool {
    let rect = bounds.to_render_rect(surface.size());
    match ink::decode(data) {
        Ok(InkPayload::Bitmap(image)) => {
            surface.push(DrawOp::Image { rect, image });
        }
        Ok(InkPayload::Strokes(strokes)) => {
            for stroke in strokes.iter().filter(|s| !s.points.is_empty()) {
                let points = stroke
                    .points
                    .iter()
                    .map(|[x, y]| RenderPoint {
                        x: rect.x + x * rect.width,
                        y: rect.y + y * rect.height,
                    })
                    .collect();
                surface.push(DrawOp::Polyline {
                    points,
                    color: stroke.rgb(),
                    width: stroke.width,
                });
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, bytes = data.len(), "Skipping undrawable ink");
            return false;
        }
    }
    surface.record_frame(FrameKind::Drawing, rect);
    true
}
