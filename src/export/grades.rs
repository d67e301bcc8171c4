//! Grade reports: one JSON record or CSV row per copy.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ExportError;
use crate::models::{iso8601, CopyFeedback, Question, QuestionStatus, Section};
use crate::storage::{encode_sorted, FileStore};

const FIXED_COLUMNS: [&str; 6] = [
    "Student Name",
    "Student ID",
    "Total",
    "Max Total",
    "Percentage",
    "Fully Graded",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradeFormat {
    Json,
    Csv,
}

impl GradeFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            GradeFormat::Json => "json",
            GradeFormat::Csv => "csv",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub name: String,
    pub short_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,
    pub max_points: f64,
    pub status: QuestionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRecord {
    pub name: String,
    pub short_name: String,
    pub subtotal: f64,
    pub max_subtotal: f64,
    pub questions: Vec<QuestionRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRecord {
    pub student_name: String,
    #[serde(rename = "studentID", default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    pub document_id: Uuid,
    pub total: f64,
    pub max_total: f64,
    pub percentage: f64,
    pub is_fully_graded: bool,
    pub sections: Vec<SectionRecord>,
    #[serde(with = "iso8601")]
    pub graded_at: DateTime<Utc>,
}

fn question_record(q: &Question) -> QuestionRecord {
    QuestionRecord {
        name: q.name.clone(),
        short_name: q.short_name.clone(),
        points: q.points,
        max_points: q.max_points,
        status: q.status,
        stamp: q.stamp_text.clone(),
    }
}

fn section_record(s: &Section) -> SectionRecord {
    SectionRecord {
        name: s.name.clone(),
        short_name: s.short_name.clone(),
        subtotal: s.subtotal(),
        max_subtotal: s.max_subtotal(),
        questions: s.questions.iter().map(question_record).collect(),
    }
}

pub fn grade_record(copy: &CopyFeedback) -> GradeRecord {
    GradeRecord {
        student_name: copy.display_name(),
        student_id: copy.student_id.clone(),
        document_id: copy.id,
        total: copy.total(),
        max_total: copy.max_total(),
        percentage: copy.percentage(),
        is_fully_graded: copy.is_fully_graded(),
        sections: copy.sections.iter().map(section_record).collect(),
        graded_at: copy.updated_at,
    }
}

pub fn grade_records(copies: &[CopyFeedback]) -> Vec<GradeRecord> {
    copies.iter().map(grade_record).collect()
}

pub fn grades_json(copies: &[CopyFeedback]) -> Result<Vec<u8>, ExportError> {
    encode_sorted(&grade_records(copies)).map_err(|e| ExportError::SaveFailed(e.to_string()))
}

/// Quote a CSV field when it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_line(fields: &[String]) -> String {
    let mut line = fields.iter().map(|f| csv_field(f)).collect::<Vec<_>>().join(",");
    line.push('\n');
    line
}

/// Question columns, taken from the first copy that has any question.
fn question_columns(copies: &[CopyFeedback]) -> Vec<String> {
    copies
        .iter()
        .find(|c| c.questions().next().is_some())
        .map(|c| {
            c.questions()
                .map(|(s, q)| format!("{}-{}", s.short_name, q.short_name))
                .collect()
        })
        .unwrap_or_default()
}

/// CSV table. Question cells are filled in rubric order and padded with
/// blanks (or cut) to the header width.
pub fn grades_csv(copies: &[CopyFeedback]) -> String {
    let columns = question_columns(copies);
    let mut header: Vec<String> = FIXED_COLUMNS.iter().map(|c| c.to_string()).collect();
    header.extend(columns.iter().cloned());

    let mut out = csv_line(&header);
    for copy in copies {
        let mut row = vec![
            copy.display_name(),
            copy.student_id.clone().unwrap_or_default(),
            format!("{:.2}", copy.total()),
            format!("{:.2}", copy.max_total()),
            format!("{:.1}", copy.percentage()),
            if copy.is_fully_graded() { "Yes" } else { "No" }.to_string(),
        ];
        let mut cells: Vec<String> = copy
            .questions()
            .map(|(_, q)| q.points.map(|p| format!("{p:.2}")).unwrap_or_default())
            .take(columns.len())
            .collect();
        cells.resize(columns.len(), String::new());
        row.extend(cells);
        out.push_str(&csv_line(&row));
    }
    out
}

/// Write the grade table to `dest`.
pub fn write_grades(
    copies: &[CopyFeedback],
    format: GradeFormat,
    store: &dyn FileStore,
    dest: &Path,
) -> Result<PathBuf, ExportError> {
    if copies.is_empty() {
        return Err(ExportError::NothingToExport);
    }
    let bytes = match format {
        GradeFormat::Json => grades_json(copies)?,
        GradeFormat::Csv => grades_csv(copies).into_bytes(),
    };
    store.write(dest, &bytes).map_err(ExportError::from_write)?;
    tracing::info!(copies = copies.len(), format = format.extension(), dest = %dest.display(), "Grades exported");
    Ok(dest.to_path_buf())
}
