//! Score badges: deterministic layout from measured text.
//!
//! Every badge is a rounded box sized to its text plus fixed padding, with a
//! drop shadow, a colored border and centered content, centered on the
//! stored position.

use chrono::{DateTime, Utc};

use super::format_points;
use super::metrics::text_width;
use super::surface::{DrawOp, FontFace, FrameKind, Rgb, Surface};
use crate::geometry::{NormalizedPosition, RenderPoint, RenderRect};
use crate::models::{CopyFeedback, Question, Section};

pub const BADGE_FONT_SIZE: f64 = 10.0;
pub const PADDING_X: f64 = 6.0;
pub const PADDING_Y: f64 = 4.0;
pub const CORNER_RADIUS: f64 = 5.0;
pub const SHADOW_OFFSET: f64 = 1.5;
pub const BORDER_WIDTH: f64 = 1.0;
pub const DOT_DIAMETER: f64 = 6.0;
pub const DOT_GAP: f64 = 4.0;
pub const STAMP_LABEL_SIZE: f64 = 7.0;
pub const STAMP_LABEL_GAP: f64 = 2.0;
const TOTAL_CELL_HEIGHT: f64 = 24.0;
const DIVIDER_INSET: f64 = 4.0;

/// Baseline y that vertically centers text of `size` on `center_y`.
fn baseline_for(center_y: f64, size: f64) -> f64 {
    center_y + size * 0.35
}

/// Shadow, body and border for one badge box.
fn draw_box(surface: &mut Surface, frame: RenderRect, fill: Rgb, border: Rgb) {
    surface.fill_rounded_rect(
        frame.offset(SHADOW_OFFSET, SHADOW_OFFSET),
        CORNER_RADIUS,
        Rgb::SHADOW,
        None,
    );
    surface.fill_rounded_rect(frame, CORNER_RADIUS, fill, Some((border, BORDER_WIDTH)));
}

pub fn section_label(section: &Section) -> String {
    format!(
        "{}: {}/{}",
        section.short_name,
        format_points(section.subtotal()),
        format_points(section.max_subtotal())
    )
}

pub fn question_label(question: &Question) -> String {
    let points = question
        .points
        .map(format_points)
        .unwrap_or_else(|| "-".into());
    format!(
        "{} {}/{}",
        question.short_name,
        points,
        format_points(question.max_points)
    )
}

/// Section subtotal badge.
pub fn draw_section_badge(surface: &mut Surface, section: &Section, position: &NormalizedPosition) -> RenderRect {
    let label = section_label(section);
    let text_w = text_width(&label, BADGE_FONT_SIZE, FontFace::Bold);
    let center = position.to_render_point(surface.size());
    let frame = RenderRect::centered_at(
        center,
        text_w + 2.0 * PADDING_X,
        BADGE_FONT_SIZE + 2.0 * PADDING_Y,
    );

    let border = if section.is_fully_graded() { Rgb::GREEN } else { Rgb::ACCENT };
    draw_box(surface, frame, Rgb::new(0.93, 0.95, 1.0), border);
    surface.text(
        RenderPoint {
            x: center.x - text_w / 2.0,
            y: baseline_for(center.y, BADGE_FONT_SIZE),
        },
        &label,
        BADGE_FONT_SIZE,
        FontFace::Bold,
        Rgb::INK,
    );
    surface.record_frame(FrameKind::Section, frame);
    frame
}

/// Question score badge with a status/stamp dot and optional stamp label.
pub fn draw_question_badge(surface: &mut Surface, question: &Question, position: &NormalizedPosition) -> RenderRect {
    let label = question_label(question);
    let text_w = text_width(&label, BADGE_FONT_SIZE, FontFace::Bold);
    let content_w = DOT_DIAMETER + DOT_GAP + text_w;
    let center = position.to_render_point(surface.size());
    let frame = RenderRect::centered_at(
        center,
        content_w + 2.0 * PADDING_X,
        BADGE_FONT_SIZE + 2.0 * PADDING_Y,
    );

    let status_color = Rgb::from(question.status);
    let dot_color = question.stamp_color.map(Rgb::from).unwrap_or(status_color);
    draw_box(surface, frame, Rgb::WHITE, status_color);
    surface.push(DrawOp::Circle {
        center: RenderPoint {
            x: frame.x + PADDING_X + DOT_DIAMETER / 2.0,
            y: center.y,
        },
        radius: DOT_DIAMETER / 2.0,
        fill: dot_color,
    });
    surface.text(
        RenderPoint {
            x: frame.x + PADDING_X + DOT_DIAMETER + DOT_GAP,
            y: baseline_for(center.y, BADGE_FONT_SIZE),
        },
        &label,
        BADGE_FONT_SIZE,
        FontFace::Bold,
        Rgb::INK,
    );

    if let Some(stamp) = question.stamp_text.as_deref() {
        let stamp_w = text_width(stamp, STAMP_LABEL_SIZE, FontFace::Regular);
        surface.text(
            RenderPoint {
                x: center.x - stamp_w / 2.0,
                y: frame.max_y() + STAMP_LABEL_GAP + STAMP_LABEL_SIZE,
            },
            stamp,
            STAMP_LABEL_SIZE,
            FontFace::Regular,
            dot_color,
        );
    }

    surface.record_frame(FrameKind::Question, frame);
    frame
}

/// The four total-badge segments: label, score, percentage, date.
pub fn total_segments(copy: &CopyFeedback) -> [String; 4] {
    [
        "Total".to_string(),
        format!("{}/{}", format_points(copy.total()), format_points(copy.max_total())),
        format!("{:.1}%", copy.percentage()),
        format_date(copy.updated_at),
    ]
}

pub fn format_date(at: DateTime<Utc>) -> String {
    at.format("%d/%m/%Y").to_string()
}

fn percentage_color(percentage: f64) -> Rgb {
    if percentage >= 75.0 {
        Rgb::GREEN
    } else if percentage >= 50.0 {
        Rgb::YELLOW
    } else {
        Rgb::RED
    }
}

/// Total badge: four equal cells sized to the widest segment, separated by
/// vertical dividers. The percentage sits in a colored pill.
pub fn draw_total_badge(surface: &mut Surface, copy: &CopyFeedback, position: &NormalizedPosition) -> RenderRect {
    let segments = total_segments(copy);
    let fonts = [FontFace::Regular, FontFace::Bold, FontFace::Bold, FontFace::Regular];
    let widths: Vec<f64> = segments
        .iter()
        .zip(fonts)
        .map(|(text, font)| text_width(text, BADGE_FONT_SIZE, font))
        .collect();
    let widest = widths.iter().copied().fold(0.0_f64, f64::max);
    let cell_w = widest + 2.0 * PADDING_X;

    let center = position.to_render_point(surface.size());
    let frame = RenderRect::centered_at(center, cell_w * segments.len() as f64, TOTAL_CELL_HEIGHT);
    draw_box(surface, frame, Rgb::WHITE, Rgb::INK);

    let baseline = baseline_for(center.y, BADGE_FONT_SIZE);
    for (i, ((text, font), width)) in segments.iter().zip(fonts).zip(&widths).enumerate() {
        let cell_x = frame.x + cell_w * i as f64;
        let cell_center = cell_x + cell_w / 2.0;
        let mut color = Rgb::INK;

        if i == 2 {
            let pill = RenderRect::centered_at(
                RenderPoint { x: cell_center, y: center.y },
                width + PADDING_X,
                BADGE_FONT_SIZE + PADDING_Y,
            );
            surface.fill_rounded_rect(pill, pill.height / 2.0, percentage_color(copy.percentage()), None);
            color = Rgb::WHITE;
        }
        if i > 0 {
            surface.push(DrawOp::Line {
                from: RenderPoint { x: cell_x, y: frame.y + DIVIDER_INSET },
                to: RenderPoint { x: cell_x, y: frame.max_y() - DIVIDER_INSET },
                color: Rgb::DIVIDER,
                width: 0.75,
            });
        }
        surface.text(
            RenderPoint { x: cell_center - width / 2.0, y: baseline },
            text,
            BADGE_FONT_SIZE,
            font,
            color,
        );
    }

    surface.record_frame(FrameKind::Total, frame);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PageSize;
    use crate::models::{QuestionStatus, StampColor, StampDefinition};

    fn surface() -> Surface {
        Surface::new(PageSize::new(600.0, 800.0))
    }

    #[test]
    fn total_badge_centered_on_position() {
        let mut copy = CopyFeedback::new("a.pdf");
        let mut section = Section::new("S1", None);
        section.questions.push(Question::new("Q1", None, 2.0));
        copy.sections.push(section);

        let mut s = surface();
        let frame = draw_total_badge(&mut s, &copy, &NormalizedPosition::new(0.8, 0.1, 0));
        let center = frame.center();
        assert!((center.x - 480.0).abs() < 1e-9);
        assert!((center.y - 720.0).abs() < 1e-9);
        assert_eq!(s.frames_of(FrameKind::Total), vec![frame]);
    }

    #[test]
    fn total_cells_are_uniform_width() {
        let copy = CopyFeedback::new("a.pdf");
        let mut s = surface();
        let frame = draw_total_badge(&mut s, &copy, &NormalizedPosition::new(0.5, 0.5, 0));

        let segments = total_segments(&copy);
        let widest = segments
            .iter()
            .map(|t| text_width(t, BADGE_FONT_SIZE, FontFace::Bold))
            .fold(0.0_f64, f64::max);
        assert!(frame.width <= 4.0 * (widest + 2.0 * PADDING_X) + 1e-9);

        let dividers = s.ops().iter().filter(|op| matches!(op, DrawOp::Line { .. })).count();
        assert_eq!(dividers, 3);
    }

    #[test]
    fn total_segments_format() {
        let mut copy = CopyFeedback::new("a.pdf");
        let mut section = Section::new("S", None);
        let mut q = Question::new("Q", None, 3.0);
        q.set_points(Some(2.0));
        section.questions.push(q);
        copy.sections.push(section);

        let segments = total_segments(&copy);
        assert_eq!(segments[0], "Total");
        assert_eq!(segments[1], "2/3");
        assert_eq!(segments[2], "66.7%");
        assert_eq!(segments[3], copy.updated_at.format("%d/%m/%Y").to_string());
    }

    #[test]
    fn question_badge_fits_text() {
        let mut q = Question::new("Question", Some("Q1"), 2.0);
        q.set_status(QuestionStatus::Partial);
        let mut s = surface();
        let frame = draw_question_badge(&mut s, &q, &NormalizedPosition::new(0.5, 0.5, 0));

        let text_w = text_width("Q1 1/2", BADGE_FONT_SIZE, FontFace::Bold);
        assert!((frame.width - (text_w + DOT_DIAMETER + DOT_GAP + 2.0 * PADDING_X)).abs() < 1e-9);
        assert_eq!(frame.height, BADGE_FONT_SIZE + 2.0 * PADDING_Y);
        assert!(s.ops().iter().any(|op| matches!(op, DrawOp::Circle { fill, .. } if *fill == Rgb::YELLOW)));
    }

    #[test]
    fn stamped_question_gets_label_line() {
        let mut q = Question::new("Q", None, 4.0);
        q.apply_stamp(&StampDefinition {
            id: "x".into(),
            label: "Nice".into(),
            color: StampColor::Green,
            coefficient: 1.0,
        });
        let mut s = surface();
        let frame = draw_question_badge(&mut s, &q, &NormalizedPosition::new(0.5, 0.5, 0));
        let label = s.ops().iter().find_map(|op| match op {
            DrawOp::Text { text, origin, .. } if text == "Nice" => Some(*origin),
            _ => None,
        });
        assert!(label.unwrap().y > frame.max_y());
    }

    #[test]
    fn ungraded_question_shows_dash() {
        let q = Question::new("Alpha", None, 1.5);
        assert_eq!(question_label(&q), "ALP -/1.5");
    }

    #[test]
    fn section_badge_label() {
        let mut section = Section::new("Geometry", None);
        let mut q = Question::new("Q", None, 2.0);
        q.set_points(Some(0.5));
        section.questions.push(q);
        assert_eq!(section_label(&section), "G: 0.5/2");
        let mut s = surface();
        draw_section_badge(&mut s, &section, &NormalizedPosition::new(0.1, 0.9, 0));
        assert_eq!(s.frames_of(FrameKind::Section).len(), 1);
    }
}
