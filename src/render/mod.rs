//! Overlay rendering for graded copies.
//!
//! Rendering never touches a PDF. Each page gets a [`Surface`] of recorded
//! drawing operations in the fixed layering order: section badges, question
//! badges, the total badge, then annotations.

pub mod annotations;
pub mod badge;
pub mod ink;
pub mod metrics;
pub mod surface;

pub use surface::{DrawOp, FontFace, FrameKind, RasterImage, Rgb, Surface};

use crate::geometry::PageSize;
use crate::models::CopyFeedback;

/// Points as shown on badges: integers without decimals, otherwise up to
/// two decimals with trailing zeros dropped.
pub fn format_points(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        return format!("{:.0}", value.round());
    }
    let text = format!("{value:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Overlay for one page of `copy`.
pub fn render_page(copy: &CopyFeedback, page: usize, size: PageSize) -> Surface {
    let mut surface = Surface::new(size);

    for section in &copy.sections {
        if let Some(pos) = section.position.filter(|p| p.page == page) {
            badge::draw_section_badge(&mut surface, section, &pos);
        }
    }
    for (_, question) in copy.questions() {
        if let Some(pos) = question.position.filter(|p| p.page == page) {
            badge::draw_question_badge(&mut surface, question, &pos);
        }
    }
    if let Some(pos) = copy.total_position.filter(|p| p.page == page) {
        badge::draw_total_badge(&mut surface, copy, &pos);
    }
    for annotation in copy.annotations.iter().filter(|a| a.page() == page) {
        annotations::draw_annotation(&mut surface, annotation);
    }

    surface
}
