//! Rubric template files.
//!
//! A template file carries structure only: names, short names and max
//! points. Importing it always yields a fresh, ungraded section tree.

use std::path::Path;

use super::ExportError;
use crate::models::RubricTemplate;
use crate::storage::{encode_sorted, FileStore};

pub fn encode_template(template: &RubricTemplate) -> Result<Vec<u8>, ExportError> {
    encode_sorted(template).map_err(|e| ExportError::SaveFailed(e.to_string()))
}

/// Parse and validate a template file.
pub fn decode_template(bytes: &[u8]) -> Result<RubricTemplate, ExportError> {
    let mut template: RubricTemplate =
        serde_json::from_slice(bytes).map_err(|e| ExportError::InvalidTemplate(e.to_string()))?;
    validate(&template)?;
    // Stored totals are advisory; recompute from the questions.
    template.refresh_max_total();
    Ok(template)
}

fn validate(template: &RubricTemplate) -> Result<(), ExportError> {
    for section in &template.sections {
        if section.name.trim().is_empty() {
            return Err(ExportError::InvalidTemplate("section without a name".into()));
        }
        for question in &section.questions {
            if question.name.trim().is_empty() {
                return Err(ExportError::InvalidTemplate(format!(
                    "question without a name in section '{}'",
                    section.name
                )));
            }
            if !question.max_points.is_finite() || question.max_points <= 0.0 {
                return Err(ExportError::InvalidTemplate(format!(
                    "question '{}' has non-positive max points",
                    question.name
                )));
            }
        }
    }
    Ok(())
}

pub fn write_template(store: &dyn FileStore, path: &Path, template: &RubricTemplate) -> Result<(), ExportError> {
    let bytes = encode_template(template)?;
    store.write(path, &bytes).map_err(ExportError::from_write)?;
    tracing::info!(
        template = %template.name,
        questions = template.question_count(),
        path = %path.display(),
        "Rubric template exported"
    );
    Ok(())
}

pub fn read_template(store: &dyn FileStore, path: &Path) -> Result<RubricTemplate, ExportError> {
    let bytes = store.read(path).map_err(|e| match ExportError::from_read(e) {
        ExportError::InvalidSource(msg) => ExportError::InvalidTemplate(msg),
        other => other,
    })?;
    let template = decode_template(&bytes)?;
    tracing::info!(template = %template.name, path = %path.display(), "Rubric template imported");
    Ok(template)
}
