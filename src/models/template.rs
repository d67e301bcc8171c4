//! Rubric templates: transport form of a section tree.
//!
//! Only names, short names and max points travel. Converting back always
//! produces fresh IDs and ungraded, unpositioned questions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::rubric::{sum_points, Question, Section};
use super::{iso8601, now};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateQuestion {
    pub name: String,
    pub short_name: String,
    pub max_points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSection {
    pub name: String,
    pub short_name: String,
    #[serde(default)]
    pub questions: Vec<TemplateQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricTemplate {
    pub name: String,
    #[serde(with = "iso8601")]
    pub created_at: DateTime<Utc>,
    pub sections: Vec<TemplateSection>,
    pub max_total: f64,
}

impl RubricTemplate {
    pub fn from_sections(name: &str, sections: &[Section]) -> Self {
        let sections: Vec<TemplateSection> = sections
            .iter()
            .map(|s| TemplateSection {
                name: s.name.clone(),
                short_name: s.short_name.clone(),
                questions: s
                    .questions
                    .iter()
                    .map(|q| TemplateQuestion {
                        name: q.name.clone(),
                        short_name: q.short_name.clone(),
                        max_points: q.max_points,
                    })
                    .collect(),
            })
            .collect();
        let max_total = max_total_of(&sections);
        Self {
            name: name.trim().to_string(),
            created_at: now(),
            sections,
            max_total,
        }
    }

    /// Fresh section tree built from this template.
    pub fn to_sections(&self) -> Vec<Section> {
        self.sections
            .iter()
            .map(|ts| {
                let mut section = Section::new(&ts.name, Some(&ts.short_name));
                section.questions = ts
                    .questions
                    .iter()
                    .map(|tq| Question::new(&tq.name, Some(&tq.short_name), tq.max_points))
                    .collect();
                section
            })
            .collect()
    }

    /// Recompute `max_total` from the questions.
    pub fn refresh_max_total(&mut self) {
        self.max_total = max_total_of(&self.sections);
    }

    pub fn question_count(&self) -> usize {
        self.sections.iter().map(|s| s.questions.len()).sum()
    }
}

fn max_total_of(sections: &[TemplateSection]) -> f64 {
    sum_points(sections.iter().flat_map(|s| s.questions.iter()).map(|q| q.max_points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::NormalizedPosition;
    use crate::models::QuestionStatus;

    fn graded_sections() -> Vec<Section> {
        let mut section = Section::new("Algebra", None);
        section.position = Some(NormalizedPosition::new(0.1, 0.1, 0));
        let mut q = Question::new("Linear equations", Some("LIN"), 3.0);
        q.set_status(QuestionStatus::Correct);
        q.position = Some(NormalizedPosition::new(0.5, 0.5, 0));
        section.questions.push(q);
        section.questions.push(Question::new("Quadratics", None, 2.0));
        vec![section]
    }

    #[test]
    fn template_keeps_structure_only() {
        let sections = graded_sections();
        let template = RubricTemplate::from_sections("Midterm", &sections);
        assert_eq!(template.max_total, 5.0);
        assert_eq!(template.question_count(), 2);

        let value = serde_json::to_value(&template).unwrap();
        let q = &value["sections"][0]["questions"][0];
        assert_eq!(q["name"], "Linear equations");
        assert_eq!(q["shortName"], "LIN");
        assert_eq!(q["maxPoints"], 3.0);
        assert!(q.get("points").is_none());
        assert!(q.get("position").is_none());
    }

    #[test]
    fn to_sections_generates_fresh_ungraded_tree() {
        let sections = graded_sections();
        let rebuilt = RubricTemplate::from_sections("Midterm", &sections).to_sections();
        assert_eq!(rebuilt.len(), 1);
        assert_ne!(rebuilt[0].id, sections[0].id);
        assert!(rebuilt[0].position.is_none());
        assert_eq!(rebuilt[0].short_name, "A");
        let q = &rebuilt[0].questions[0];
        assert_ne!(q.id, sections[0].questions[0].id);
        assert_eq!(q.short_name, "LIN");
        assert_eq!(q.max_points, 3.0);
        assert_eq!(q.points, None);
        assert_eq!(q.status, QuestionStatus::Pending);
        assert!(q.position.is_none());
    }
}
