//! `CopyFeedback`: one graded student copy (a PDF plus its rubric, marks
//! and badge positions). Derived totals are computed, never stored.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::annotation::Annotation;
use super::rubric::{sum_points, Question, Section};
use super::{iso8601, now};
use crate::geometry::NormalizedPosition;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyFeedback {
    pub id: Uuid,
    pub pdf_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(default, rename = "studentID", skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_position: Option<NormalizedPosition>,
    #[serde(with = "iso8601")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "iso8601")]
    pub updated_at: DateTime<Utc>,
}

impl CopyFeedback {
    pub fn new(pdf_path: impl Into<PathBuf>) -> Self {
        let at = now();
        Self {
            id: Uuid::new_v4(),
            pdf_path: pdf_path.into(),
            student_name: None,
            student_id: None,
            sections: Vec::new(),
            annotations: Vec::new(),
            total_position: None,
            created_at: at,
            updated_at: at,
        }
    }

    pub fn total(&self) -> f64 {
        sum_points(self.sections.iter().map(Section::subtotal))
    }

    pub fn max_total(&self) -> f64 {
        sum_points(self.sections.iter().map(Section::max_subtotal))
    }

    /// Percentage of max total; exactly 0 when there is nothing to score.
    pub fn percentage(&self) -> f64 {
        let max = self.max_total();
        if max == 0.0 {
            0.0
        } else {
            self.total() / max * 100.0
        }
    }

    pub fn is_fully_graded(&self) -> bool {
        self.sections.iter().all(Section::is_fully_graded)
    }

    pub fn has_rubric(&self) -> bool {
        !self.sections.is_empty()
    }

    /// Student name, or the PDF file stem when no name was entered.
    pub fn display_name(&self) -> String {
        match self.student_name.as_deref() {
            Some(name) => name.to_string(),
            None => file_stem(&self.pdf_path),
        }
    }

    /// Refresh `updated_at`. Every mutation calls this.
    pub fn touch(&mut self) {
        self.updated_at = now();
    }

    pub fn section(&self, id: Uuid) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn section_mut(&mut self, id: Uuid) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.id == id)
    }

    /// Find a question in any section.
    pub fn question(&self, id: Uuid) -> Option<&Question> {
        self.sections.iter().find_map(|s| s.question(id))
    }

    pub fn question_mut(&mut self, id: Uuid) -> Option<&mut Question> {
        self.sections.iter_mut().find_map(|s| s.question_mut(id))
    }

    /// Section containing a question.
    pub fn section_of(&self, question_id: Uuid) -> Option<&Section> {
        self.sections.iter().find(|s| s.question(question_id).is_some())
    }

    pub fn annotation(&self, id: Uuid) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    pub fn annotation_mut(&mut self, id: Uuid) -> Option<&mut Annotation> {
        self.annotations.iter_mut().find(|a| a.id == id)
    }

    /// All questions in rubric order.
    pub fn questions(&self) -> impl Iterator<Item = (&Section, &Question)> {
        self.sections
            .iter()
            .flat_map(|s| s.questions.iter().map(move |q| (s, q)))
    }
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "copy".into())
}
