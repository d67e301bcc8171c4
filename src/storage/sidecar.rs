//! Sidecar codec: `exam.pdf` is graded in `exam.json` next to it.
//!
//! Output is pretty-printed with keys sorted at every level, so
//! `encode(decode(encode(copy))) == encode(copy)` byte for byte.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{FileStore, StoreError};
use crate::config::SIDECAR_EXTENSION;
use crate::models::{CopyFeedback, StampCatalog, StampDefinition};

/// Sidecar path for a PDF: same base name, sidecar extension.
pub fn sidecar_path(pdf_path: &Path) -> PathBuf {
    pdf_path.with_extension(SIDECAR_EXTENSION)
}

/// Serialize with sorted keys and pretty printing.
pub fn encode_sorted<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    let tree = sort_keys(serde_json::to_value(value)?);
    Ok(serde_json::to_vec_pretty(&tree)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8], what: &str) -> Result<T, StoreError> {
    serde_json::from_slice(bytes)
        .map_err(|e| StoreError::InvalidFormat(format!("{what}: {e}")))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, child) in entries {
                sorted.insert(key, sort_keys(child));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

pub fn encode_copy(copy: &CopyFeedback) -> Result<Vec<u8>, StoreError> {
    encode_sorted(copy)
}

pub fn decode_copy(bytes: &[u8]) -> Result<CopyFeedback, StoreError> {
    decode(bytes, "grading sidecar")
}

/// Load the sidecar for `pdf_path`. `Ok(None)` when there is none yet.
pub fn load_copy(store: &dyn FileStore, pdf_path: &Path) -> Result<Option<CopyFeedback>, StoreError> {
    let path = sidecar_path(pdf_path);
    if !store.exists(&path) {
        return Ok(None);
    }
    let mut copy = decode_copy(&store.read(&path)?)?;
    // The sidecar travels with the PDF; trust the location it was found at.
    copy.pdf_path = pdf_path.to_path_buf();
    Ok(Some(copy))
}

pub fn save_copy(store: &dyn FileStore, copy: &CopyFeedback) -> Result<(), StoreError> {
    let path = sidecar_path(&copy.pdf_path);
    store.write(&path, &encode_copy(copy)?)?;
    tracing::debug!(copy_id = %copy.id, path = %path.display(), "Sidecar saved");
    Ok(())
}

/// Load a stored stamp catalog; defaults when no file exists yet.
pub fn load_catalog(store: &dyn FileStore, path: &Path) -> Result<StampCatalog, StoreError> {
    if !store.exists(path) {
        return Ok(StampCatalog::with_defaults());
    }
    let stamps: Vec<StampDefinition> = decode(&store.read(path)?, "stamp catalog")?;
    Ok(StampCatalog::from_stored(stamps))
}

pub fn save_catalog(store: &dyn FileStore, path: &Path, catalog: &StampCatalog) -> Result<(), StoreError> {
    store.write(path, &encode_sorted(&catalog.all())?)
}
