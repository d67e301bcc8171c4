//! Export pipeline: graded PDFs, grade tables, rubric templates, archives.
//!
//! Every export reads an owned [`CopyFeedback`](crate::models::CopyFeedback)
//! snapshot and writes through the [`FileStore`](crate::storage::FileStore),
//! so an abandoned export never leaves a half-written file behind.

pub mod archive;
pub mod grades;
pub mod pdf;
pub mod template;
pub mod worker;

pub use archive::{archive_entry_names, export_archive, sanitize_file_name};
pub use grades::{grade_records, grades_csv, grades_json, GradeFormat, GradeRecord};
pub use pdf::{export_pdf, graded_output_path, render_graded_pdf};
pub use template::{decode_template, encode_template, read_template, write_template};
pub use worker::{CancelToken, ExportWorker};

use std::path::PathBuf;

use thiserror::Error;

use crate::error::ErrorKind;
use crate::pdf::PdfError;
use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Source file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Source PDF unreadable: {0}")]
    InvalidSource(String),

    #[error("Could not save export: {0}")]
    SaveFailed(String),

    #[error("Invalid rubric template: {0}")]
    InvalidTemplate(String),

    #[error("Nothing to export")]
    NothingToExport,

    #[error("Export cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl ExportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExportError::FileNotFound(_) => ErrorKind::NotFound,
            ExportError::InvalidSource(_)
            | ExportError::InvalidTemplate(_)
            | ExportError::NothingToExport
            | ExportError::Json(_) => ErrorKind::InvalidFormat,
            ExportError::SaveFailed(_) | ExportError::Io(_) | ExportError::Archive(_) => ErrorKind::IoFailure,
            ExportError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Map a failed source read.
    pub(crate) fn from_read(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(path) => ExportError::FileNotFound(path),
            other => ExportError::InvalidSource(other.to_string()),
        }
    }

    /// Map a failed output write.
    pub(crate) fn from_write(err: StoreError) -> Self {
        ExportError::SaveFailed(err.to_string())
    }
}

impl From<PdfError> for ExportError {
    fn from(e: PdfError) -> Self {
        match e {
            PdfError::Write(msg) => ExportError::SaveFailed(msg),
            other => ExportError::InvalidSource(other.to_string()),
        }
    }
}
