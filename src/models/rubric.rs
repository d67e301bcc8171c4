//! Rubric tree: sections holding ordered questions, with scoring rules.
//!
//! Status and stamp attribution are mutually derived, last writer wins:
//! applying a status drops the stamp, applying a stamp sets the status.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{QuestionStatus, StampColor};
use super::stamp::StampDefinition;
use crate::geometry::NormalizedPosition;

pub const DEFAULT_MAX_POINTS: f64 = 1.0;

/// Short label derived from a question name: first 3 characters, uppercased.
pub fn question_short_name(name: &str) -> String {
    name.trim().chars().take(3).collect::<String>().to_uppercase()
}

/// Short label derived from a section name: first character, uppercased.
pub fn section_short_name(name: &str) -> String {
    name.trim().chars().take(1).collect::<String>().to_uppercase()
}

/// Sum of `values`, `0.0` (not `-0.0`) when empty.
pub fn sum_points(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(0.0, |acc, v| acc + v)
}

fn valid_max_points(value: f64) -> Option<f64> {
    (value.is_finite() && value > 0.0).then_some(value)
}

fn status_for_points(points: Option<f64>, max_points: f64) -> QuestionStatus {
    match points {
        None => QuestionStatus::Pending,
        Some(p) if p <= 0.0 => QuestionStatus::Wrong,
        Some(p) if p >= max_points => QuestionStatus::Correct,
        Some(_) => QuestionStatus::Partial,
    }
}

fn pick_short_name(given: Option<&str>, derived: impl FnOnce() -> String) -> String {
    match given.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => derived(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub name: String,
    pub short_name: String,
    pub max_points: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,
    #[serde(default)]
    pub status: QuestionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<NormalizedPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stamp_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stamp_color: Option<StampColor>,
}

impl Question {
    /// New ungraded question. Invalid `max_points` falls back to 1.
    pub fn new(name: &str, short_name: Option<&str>, max_points: f64) -> Self {
        let name = name.trim().to_string();
        Self {
            id: Uuid::new_v4(),
            short_name: pick_short_name(short_name, || question_short_name(&name)),
            name,
            max_points: valid_max_points(max_points).unwrap_or(DEFAULT_MAX_POINTS),
            points: None,
            status: QuestionStatus::Pending,
            position: None,
            stamp_text: None,
            stamp_color: None,
        }
    }

    pub fn is_graded(&self) -> bool {
        self.points.is_some()
    }

    pub fn has_stamp(&self) -> bool {
        self.stamp_text.is_some()
    }

    /// Set points directly. The caller clamps to [0, max_points].
    /// Status follows the value and any stamp attribution is dropped.
    pub fn set_points(&mut self, points: Option<f64>) {
        self.points = points;
        self.status = status_for_points(points, self.max_points);
        self.clear_stamp();
    }

    /// Set status; points are recomputed and any stamp attribution is dropped.
    pub fn set_status(&mut self, status: QuestionStatus) {
        self.status = status;
        self.points = status.points_for(self.max_points);
        self.clear_stamp();
    }

    /// Grade with a stamp: points = max_points x coefficient, status by threshold,
    /// label and color recorded as a snapshot.
    pub fn apply_stamp(&mut self, stamp: &StampDefinition) {
        self.points = Some(self.max_points * stamp.coefficient);
        self.status = QuestionStatus::from_coefficient(stamp.coefficient);
        self.stamp_text = Some(stamp.label.clone());
        self.stamp_color = Some(stamp.color);
    }

    /// Remove stamp attribution only; points and status stay.
    pub fn clear_stamp(&mut self) {
        self.stamp_text = None;
        self.stamp_color = None;
    }

    /// Structural edit. A new maximum re-derives the grade: stamped points
    /// keep their coefficient, status-derived points follow the status, and
    /// manually entered points are capped.
    pub fn update(&mut self, name: &str, short_name: Option<&str>, max_points: f64) {
        let name = name.trim();
        if !name.is_empty() {
            self.name = name.to_string();
        }
        self.short_name = pick_short_name(short_name, || question_short_name(&self.name));
        if let Some(max) = valid_max_points(max_points) {
            let old_max = self.max_points;
            self.max_points = max;
            self.rescale(old_max);
        }
    }

    fn rescale(&mut self, old_max: f64) {
        let Some(points) = self.points else {
            return;
        };
        let max = self.max_points;
        if self.has_stamp() {
            let coefficient = if old_max > 0.0 { points / old_max } else { 0.0 };
            self.points = Some(max * coefficient);
        } else if self.status.points_for(old_max) == Some(points) {
            self.points = self.status.points_for(max);
        } else {
            let capped = points.min(max);
            self.points = Some(capped);
            self.status = status_for_points(Some(capped), max);
        }
    }

    /// Copy of this question with a fresh ID, carrying over only what `carry` allows.
    pub fn clone_with(&self, carry: CarryOver) -> Self {
        let mut question = Question {
            id: Uuid::new_v4(),
            name: self.name.clone(),
            short_name: self.short_name.clone(),
            max_points: self.max_points,
            points: None,
            status: QuestionStatus::Pending,
            position: None,
            stamp_text: None,
            stamp_color: None,
        };
        if carry.positions {
            question.position = self.position;
        }
        if carry.grades {
            question.points = self.points;
            question.status = self.status;
            question.stamp_text = self.stamp_text.clone();
            question.stamp_color = self.stamp_color;
        }
        question
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: Uuid,
    pub name: String,
    pub short_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<NormalizedPosition>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Section {
    pub fn new(name: &str, short_name: Option<&str>) -> Self {
        let name = name.trim().to_string();
        Self {
            id: Uuid::new_v4(),
            short_name: pick_short_name(short_name, || section_short_name(&name)),
            name,
            position: None,
            questions: Vec::new(),
        }
    }

    /// Sum of graded questions' points; ungraded questions are ignored.
    pub fn subtotal(&self) -> f64 {
        sum_points(self.questions.iter().filter_map(|q| q.points))
    }

    pub fn max_subtotal(&self) -> f64 {
        sum_points(self.questions.iter().map(|q| q.max_points))
    }

    pub fn is_fully_graded(&self) -> bool {
        self.questions.iter().all(Question::is_graded)
    }

    pub fn question(&self, id: Uuid) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn question_mut(&mut self, id: Uuid) -> Option<&mut Question> {
        self.questions.iter_mut().find(|q| q.id == id)
    }

    pub fn update(&mut self, name: &str, short_name: Option<&str>) {
        let name = name.trim();
        if !name.is_empty() {
            self.name = name.to_string();
        }
        self.short_name = pick_short_name(short_name, || section_short_name(&self.name));
    }

    /// Copy of this section and its questions with fresh IDs.
    pub fn clone_with(&self, carry: CarryOver) -> Self {
        Section {
            id: Uuid::new_v4(),
            name: self.name.clone(),
            short_name: self.short_name.clone(),
            position: if carry.positions { self.position } else { None },
            questions: self.questions.iter().map(|q| q.clone_with(carry)).collect(),
        }
    }
}

/// Which fields a structural clone carries over. Names, short names and
/// max points always travel; IDs are always fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarryOver {
    pub positions: bool,
    pub grades: bool,
}

impl CarryOver {
    /// Rubric propagation across a batch: structure plus badge positions.
    pub const STRUCTURE_WITH_POSITIONS: CarryOver = CarryOver {
        positions: true,
        grades: false,
    };

    /// Template transport: structure only.
    pub const STRUCTURE_ONLY: CarryOver = CarryOver {
        positions: false,
        grades: false,
    };
}

/// Clone a whole section list under one policy.
pub fn clone_sections(sections: &[Section], carry: CarryOver) -> Vec<Section> {
    sections.iter().map(|s| s.clone_with(carry)).collect()
}
