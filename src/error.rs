//! Error taxonomy shared by the fallible surfaces (storage, export, templates).
//!
//! Mutations that reference unknown IDs never produce an error value; they
//! are no-ops logged at debug level.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Source PDF or referenced file missing. The user can re-select it.
    NotFound,
    /// Corrupt PDF or malformed JSON. Surfaced, not retried.
    InvalidFormat,
    /// Write failure. The user may repeat the same call.
    IoFailure,
    /// The caller abandoned the operation.
    Cancelled,
}

impl ErrorKind {
    /// Whether repeating the same call can succeed without user changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::IoFailure | ErrorKind::Cancelled)
    }
}
