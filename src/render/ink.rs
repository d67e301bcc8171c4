//! Ink payloads carried by drawing annotations.
//!
//! Two encodings are accepted: a PNG bitmap, or a JSON stroke document
//! `{"strokes":[{"points":[[x,y],...],"width":w,"color":[r,g,b]}]}` whose
//! points are fractions of the drawing box with y growing downward.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::surface::{RasterImage, Rgb};

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const DEFAULT_STROKE_WIDTH: f64 = 2.0;

#[derive(Error, Debug)]
pub enum InkError {
    #[error("Unrecognised ink payload")]
    Unrecognised,

    #[error("Bitmap decode failed: {0}")]
    Bitmap(String),

    #[error("Stroke document invalid: {0}")]
    Strokes(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InkStroke {
    pub points: Vec<[f64; 2]>,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_color")]
    pub color: [f64; 3],
}

fn default_width() -> f64 {
    DEFAULT_STROKE_WIDTH
}

fn default_color() -> [f64; 3] {
    [Rgb::INK.r, Rgb::INK.g, Rgb::INK.b]
}

impl InkStroke {
    pub fn rgb(&self) -> Rgb {
        let [r, g, b] = self.color;
        Rgb::new(r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), b.clamp(0.0, 1.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StrokeDocument {
    strokes: Vec<InkStroke>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InkPayload {
    Strokes(Vec<InkStroke>),
    Bitmap(RasterImage),
}

pub fn is_png(data: &[u8]) -> bool {
    data.starts_with(&PNG_MAGIC)
}

/// Decode drawing bytes into something drawable.
pub fn decode(data: &[u8]) -> Result<InkPayload, InkError> {
    if is_png(data) {
        return decode_bitmap(data).map(InkPayload::Bitmap);
    }
    match data.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') => {
            let doc: StrokeDocument = serde_json::from_slice(data)?;
            Ok(InkPayload::Strokes(doc.strokes))
        }
        _ => Err(InkError::Unrecognised),
    }
}

fn decode_bitmap(data: &[u8]) -> Result<RasterImage, InkError> {
    let img = image::load_from_memory(data).map_err(|e| InkError::Bitmap(e.to_string()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let pixels = (width as usize) * (height as usize);
    let mut rgb = Vec::with_capacity(pixels * 3);
    let mut alpha = Vec::with_capacity(pixels);
    for px in rgba.pixels() {
        rgb.extend_from_slice(&px.0[..3]);
        alpha.push(px.0[3]);
    }
    Ok(RasterImage { width, height, rgb, alpha })
}

/// Serialize strokes into the JSON ink form.
pub fn encode_strokes(strokes: &[InkStroke]) -> Result<Vec<u8>, InkError> {
    let doc = StrokeDocument { strokes: strokes.to_vec() };
    Ok(serde_json::to_vec(&doc)?)
}
