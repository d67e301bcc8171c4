//! PDF capability used by export and page splitting.
//!
//! The engine only needs to open a document, read page boxes, lay an
//! overlay over existing page content and serialize the result. [`PdfSource`]
//! is that seam; [`LopdfSource`] is the bundled implementation.

pub mod content;
pub mod lopdf_backend;
pub mod split;

pub use lopdf_backend::LopdfSource;
pub use split::split_pages;

use thiserror::Error;

use crate::geometry::PageSize;
use crate::render::Surface;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("PDF parsing failed: {0}")]
    Parse(String),

    #[error("Encrypted PDFs are not supported")]
    Encrypted,

    #[error("Page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },

    #[error("Page structure invalid: {0}")]
    Structure(String),

    #[error("Pages per copy must be at least 1")]
    InvalidChunkSize,

    #[error("PDF serialization failed: {0}")]
    Write(String),
}

/// Visible page box in PDF user space. (x, y) is the lower-left corner of
/// the unrotated box; `rotation` is the clockwise display rotation in
/// degrees (0, 90, 180 or 270).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: u16,
}

impl PageBox {
    /// Size as the page is displayed, after rotation.
    pub fn size(&self) -> PageSize {
        if self.is_quarter_turned() {
            PageSize::new(self.height, self.width)
        } else {
            PageSize::new(self.width, self.height)
        }
    }

    pub fn is_quarter_turned(&self) -> bool {
        matches!(self.rotation, 90 | 270)
    }
}

/// Opens PDF bytes for overlay drawing.
pub trait PdfSource: Send + Sync {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PdfCanvas>, PdfError>;
}

/// An opened document whose pages can receive overlays.
pub trait PdfCanvas: Send {
    fn page_count(&self) -> usize;

    fn page_bounds(&self, page: usize) -> Option<PageBox>;

    /// Draw `overlay` above the existing content of `page`. The original
    /// page content is left untouched.
    fn draw_overlay(&mut self, page: usize, overlay: &Surface) -> Result<(), PdfError>;

    fn finish(self: Box<Self>) -> Result<Vec<u8>, PdfError>;
}
