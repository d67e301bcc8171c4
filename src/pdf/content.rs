//! Content-stream encoding of a recorded [`Surface`].
//!
//! Surface coordinates have their origin at the top-left of the visible
//! page box; PDF user space has it at the bottom-left of the MediaBox. Every
//! point goes through [`Transform`] exactly once. Rotated pages also get a
//! `cm` prefix mapping the displayed page onto user space.

use std::io::Write;

use super::PageBox;
use crate::geometry::{RenderPoint, RenderRect};
use crate::render::metrics::to_win_ansi;
use crate::render::{DrawOp, FontFace, RasterImage, Rgb, Surface};

/// Resource names used for the overlay fonts.
pub const FONT_REGULAR: &str = "CmF1";
pub const FONT_BOLD: &str = "CmF2";

/// Bezier control distance for quarter circles.
const KAPPA: f64 = 0.552_284_75;

#[derive(Debug, Clone, Copy)]
struct Transform {
    origin_x: f64,
    top: f64,
}

impl Transform {
    fn new(page: PageBox) -> Self {
        if page.rotation == 0 {
            Self {
                origin_x: page.x,
                top: page.y + page.height,
            }
        } else {
            // Drawn in displayed coordinates; `rotation_matrix` places them.
            Self {
                origin_x: 0.0,
                top: page.size().height,
            }
        }
    }

    fn x(&self, x: f64) -> f64 {
        self.origin_x + x
    }

    fn y(&self, y: f64) -> f64 {
        self.top - y
    }
}

/// `cm` operator taking displayed bottom-left coordinates to user space on
/// a page shown with a clockwise `rotation`.
fn rotation_matrix(page: PageBox) -> Option<String> {
    let (x0, y0) = (page.x, page.y);
    let (x1, y1) = (page.x + page.width, page.y + page.height);
    let m = match page.rotation {
        90 => [0.0, 1.0, -1.0, 0.0, x1, y0],
        180 => [-1.0, 0.0, 0.0, -1.0, x1, y1],
        270 => [0.0, -1.0, 1.0, 0.0, x0, y1],
        _ => return None,
    };
    Some(format!(
        "{} {} {} {} {} {} cm",
        num(m[0]),
        num(m[1]),
        num(m[2]),
        num(m[3]),
        num(m[4]),
        num(m[5])
    ))
}

/// Format a coordinate with at most three decimals.
fn num(value: f64) -> String {
    if !value.is_finite() {
        return "0".into();
    }
    let text = format!("{value:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" || text.is_empty() {
        "0".into()
    } else {
        text.to_string()
    }
}

fn font_name(font: FontFace) -> &'static str {
    match font {
        FontFace::Regular => FONT_REGULAR,
        FontFace::Bold => FONT_BOLD,
    }
}

/// Escape WinAnsi bytes for a PDF literal string.
fn literal(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 2);
    out.push(b'(');
    for byte in to_win_ansi(text) {
        if matches!(byte, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(byte);
    }
    out.push(b')');
    out
}

struct Writer<'a> {
    buf: Vec<u8>,
    t: Transform,
    name_image: &'a mut dyn FnMut(&RasterImage) -> String,
}

impl Writer<'_> {
    fn line(&mut self, text: &str) {
        self.buf.extend_from_slice(text.as_bytes());
        self.buf.push(b'\n');
    }

    fn fill_color(&mut self, c: Rgb) {
        self.line(&format!("{} {} {} rg", num(c.r), num(c.g), num(c.b)));
    }

    fn stroke_color(&mut self, c: Rgb) {
        self.line(&format!("{} {} {} RG", num(c.r), num(c.g), num(c.b)));
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.line(&format!("{} {} m", num(x), num(y)));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.line(&format!("{} {} l", num(x), num(y)));
    }

    fn curve_to(&mut self, c1: (f64, f64), c2: (f64, f64), end: (f64, f64)) {
        self.line(&format!(
            "{} {} {} {} {} {} c",
            num(c1.0),
            num(c1.1),
            num(c2.0),
            num(c2.1),
            num(end.0),
            num(end.1)
        ));
    }

    fn rounded_rect_path(&mut self, rect: RenderRect, radius: f64) {
        let llx = self.t.x(rect.x);
        let urx = self.t.x(rect.max_x());
        let lly = self.t.y(rect.max_y());
        let ury = self.t.y(rect.y);
        let r = radius.max(0.0).min(rect.width / 2.0).min(rect.height / 2.0);
        let k = r * KAPPA;

        self.move_to(llx + r, lly);
        self.line_to(urx - r, lly);
        self.curve_to((urx - r + k, lly), (urx, lly + r - k), (urx, lly + r));
        self.line_to(urx, ury - r);
        self.curve_to((urx, ury - r + k), (urx - r + k, ury), (urx - r, ury));
        self.line_to(llx + r, ury);
        self.curve_to((llx + r - k, ury), (llx, ury - r + k), (llx, ury - r));
        self.line_to(llx, lly + r);
        self.curve_to((llx, lly + r - k), (llx + r - k, lly), (llx + r, lly));
        self.line("h");
    }

    fn circle_path(&mut self, center: RenderPoint, radius: f64) {
        let cx = self.t.x(center.x);
        let cy = self.t.y(center.y);
        let k = radius * KAPPA;

        self.move_to(cx + radius, cy);
        self.curve_to((cx + radius, cy + k), (cx + k, cy + radius), (cx, cy + radius));
        self.curve_to((cx - k, cy + radius), (cx - radius, cy + k), (cx - radius, cy));
        self.curve_to((cx - radius, cy - k), (cx - k, cy - radius), (cx, cy - radius));
        self.curve_to((cx + k, cy - radius), (cx + radius, cy - k), (cx + radius, cy));
        self.line("h");
    }

    fn op(&mut self, op: &DrawOp) {
        self.line("q");
        match op {
            DrawOp::RoundedRect { rect, radius, fill, stroke } => {
                if let Some(c) = fill {
                    self.fill_color(*c);
                }
                if let Some((c, width)) = stroke {
                    self.stroke_color(*c);
                    self.line(&format!("{} w", num(*width)));
                }
                self.rounded_rect_path(*rect, *radius);
                let paint = match (fill.is_some(), stroke.is_some()) {
                    (true, true) => "B",
                    (true, false) => "f",
                    (false, true) => "S",
                    (false, false) => "n",
                };
                self.line(paint);
            }
            DrawOp::Circle { center, radius, fill } => {
                self.fill_color(*fill);
                self.circle_path(*center, *radius);
                self.line("f");
            }
            DrawOp::Line { from, to, color, width } => {
                self.stroke_color(*color);
                self.line(&format!("{} w", num(*width)));
                self.move_to(self.t.x(from.x), self.t.y(from.y));
                self.line_to(self.t.x(to.x), self.t.y(to.y));
                self.line("S");
            }
            DrawOp::Polyline { points, color, width } => {
                if let Some(first) = points.first() {
                    self.stroke_color(*color);
                    self.line(&format!("{} w 1 J 1 j", num(*width)));
                    self.move_to(self.t.x(first.x), self.t.y(first.y));
                    // A lone point still leaves a round dot.
                    let rest = if points.len() == 1 { &points[..] } else { &points[1..] };
                    for p in rest {
                        self.line_to(self.t.x(p.x), self.t.y(p.y));
                    }
                    self.line("S");
                }
            }
            DrawOp::Text { origin, text, size, font, color } => {
                self.fill_color(*color);
                self.line("BT");
                self.line(&format!("/{} {} Tf", font_name(*font), num(*size)));
                self.line(&format!("{} {} Td", num(self.t.x(origin.x)), num(self.t.y(origin.y))));
                let mut show = literal(text);
                show.extend_from_slice(b" Tj");
                self.buf.extend_from_slice(&show);
                self.buf.push(b'\n');
                self.line("ET");
            }
            DrawOp::Image { rect, image } => {
                let name = (self.name_image)(image);
                let _ = writeln!(
                    self.buf,
                    "{} 0 0 {} {} {} cm",
                    num(rect.width),
                    num(rect.height),
                    num(self.t.x(rect.x)),
                    num(self.t.y(rect.max_y()))
                );
                self.line(&format!("/{name} Do"));
            }
        }
        self.line("Q");
    }
}

/// Encode `surface` as content-stream bytes for a page with box `page`.
/// `name_image` registers each bitmap and returns its XObject resource name.
pub fn encode(surface: &Surface, page: PageBox, name_image: &mut dyn FnMut(&RasterImage) -> String) -> Vec<u8> {
    let mut writer = Writer {
        buf: Vec::new(),
        t: Transform::new(page),
        name_image,
    };
    let matrix = rotation_matrix(page);
    if let Some(matrix) = &matrix {
        writer.line("q");
        writer.line(matrix);
    }
    for op in surface.ops() {
        writer.op(op);
    }
    if matrix.is_some() {
        writer.line("Q");
    }
    writer.buf
}

/// Whether any op draws text, so fonts must be present in resources.
pub fn uses_text(surface: &Surface) -> bool {
    surface.ops().iter().any(|op| matches!(op, DrawOp::Text { .. }))
}
