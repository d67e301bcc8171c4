//! Rubric editing and scoring on the selected copy.

use uuid::Uuid;

use super::{ChangeKind, GradingEngine};
use crate::models::{Question, QuestionStatus, Section, DEFAULT_MAX_POINTS};

impl GradingEngine {
    pub fn add_section(&mut self, name: &str, short_name: Option<&str>) -> Option<Uuid> {
        let section = Section::new(name, short_name);
        let id = section.id;
        self.mutate_selected(ChangeKind::Rubric, |copy| {
            copy.sections.push(section);
            Some(id)
        })
    }

    pub fn update_section(&mut self, section_id: Uuid, name: &str, short_name: Option<&str>) {
        self.mutate_selected(ChangeKind::Rubric, |copy| {
            copy.section_mut(section_id)?.update(name, short_name);
            Some(())
        });
    }

    pub fn delete_section(&mut self, section_id: Uuid) {
        self.mutate_selected(ChangeKind::Rubric, |copy| {
            let index = copy.sections.iter().position(|s| s.id == section_id)?;
            copy.sections.remove(index);
            Some(())
        });
        self.drop_stale_positioning();
    }

    /// Append a question. Without a name it becomes "Question N"; without
    /// a valid maximum it is worth one point.
    pub fn add_question(&mut self, section_id: Uuid, name: Option<&str>, max_points: Option<f64>) -> Option<Uuid> {
        self.mutate_selected(ChangeKind::Rubric, |copy| {
            let section = copy.section_mut(section_id)?;
            let name = match name.map(str::trim) {
                Some(n) if !n.is_empty() => n.to_string(),
                _ => format!("Question {}", section.questions.len() + 1),
            };
            let question = Question::new(&name, None, max_points.unwrap_or(DEFAULT_MAX_POINTS));
            let id = question.id;
            section.questions.push(question);
            Some(id)
        })
    }

    pub fn update_question(&mut self, question_id: Uuid, name: &str, short_name: Option<&str>, max_points: f64) {
        self.mutate_selected(ChangeKind::Rubric, |copy| {
            copy.question_mut(question_id)?.update(name, short_name, max_points);
            Some(())
        });
    }

    /// Remove a question from whichever section holds it.
    pub fn delete_question(&mut self, question_id: Uuid) {
        self.mutate_selected(ChangeKind::Rubric, |copy| {
            let section = copy
                .sections
                .iter_mut()
                .find(|s| s.questions.iter().any(|q| q.id == question_id))?;
            section.questions.retain(|q| q.id != question_id);
            Some(())
        });
        self.drop_stale_positioning();
    }

    /// Callers clamp `points` to [0, max_points].
    pub fn set_points(&mut self, question_id: Uuid, points: Option<f64>) {
        self.mutate_selected(ChangeKind::Scoring, |copy| {
            copy.question_mut(question_id)?.set_points(points);
            Some(())
        });
    }

    pub fn set_status(&mut self, question_id: Uuid, status: QuestionStatus) {
        self.mutate_selected(ChangeKind::Scoring, |copy| {
            copy.question_mut(question_id)?.set_status(status);
            Some(())
        });
    }

    /// Grade a question with a catalog stamp.
    pub fn set_stamp(&mut self, question_id: Uuid, stamp_id: &str) {
        let Some(stamp) = self.catalog.get(stamp_id).cloned() else {
            tracing::debug!(stamp_id, "Unknown stamp ignored");
            return;
        };
        self.mutate_selected(ChangeKind::Scoring, |copy| {
            copy.question_mut(question_id)?.apply_stamp(&stamp);
            Some(())
        });
    }

    pub fn clear_stamp(&mut self, question_id: Uuid) {
        self.mutate_selected(ChangeKind::Scoring, |copy| {
            copy.question_mut(question_id)?.clear_stamp();
            Some(())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::engine_with_copy;
    use crate::engine::PositionTarget;
    use crate::geometry::NormalizedPosition;
    use crate::models::StampColor;

    #[test]
    fn scenario_total_and_percentage() {
        let (mut engine, _, _) = engine_with_copy();
        let s1 = engine.add_section("S1", None).unwrap();
        let q1 = engine.add_question(s1, Some("Q1"), Some(2.0)).unwrap();
        let q2 = engine.add_question(s1, Some("Q2"), Some(4.0)).unwrap();
        let half = engine.add_stamp("Half", StampColor::Yellow, 0.5);

        engine.set_status(q1, QuestionStatus::Correct);
        engine.set_stamp(q2, &half);

        let copy = engine.selected_copy().unwrap();
        assert_eq!(copy.total(), 4.0);
        assert_eq!(copy.max_total(), 6.0);
        assert!((copy.percentage() - 66.666).abs() < 0.01);
        let q2 = copy.question(q2).unwrap();
        assert_eq!(q2.status, QuestionStatus::Partial);
        assert_eq!(q2.stamp_text.as_deref(), Some("Half"));
    }

    #[test]
    fn status_change_clears_stamp_and_clear_stamp_keeps_points() {
        let (mut engine, _, _) = engine_with_copy();
        let s = engine.add_section("S", None).unwrap();
        let q = engine.add_question(s, None, Some(4.0)).unwrap();

        engine.set_stamp(q, "default-good");
        engine.clear_stamp(q);
        let question = engine.selected_copy().unwrap().question(q).unwrap();
        assert_eq!(question.points, Some(3.0));
        assert!(!question.has_stamp());

        engine.set_stamp(q, "default-good");
        engine.set_status(q, QuestionStatus::Wrong);
        let question = engine.selected_copy().unwrap().question(q).unwrap();
        assert_eq!(question.points, Some(0.0));
        assert!(!question.has_stamp());
    }

    #[test]
    fn raising_max_points_regrades() {
        let (mut engine, _, _) = engine_with_copy();
        let s = engine.add_section("S", None).unwrap();
        let correct = engine.add_question(s, Some("Q1"), Some(2.0)).unwrap();
        let stamped = engine.add_question(s, Some("Q2"), Some(2.0)).unwrap();
        let half = engine.add_stamp("Half", StampColor::Yellow, 0.5);
        engine.set_status(correct, QuestionStatus::Correct);
        engine.set_stamp(stamped, &half);

        engine.update_question(correct, "Q1", None, 4.0);
        engine.update_question(stamped, "Q2", None, 4.0);

        let copy = engine.selected_copy().unwrap();
        let q1 = copy.question(correct).unwrap();
        assert_eq!((q1.points, q1.status), (Some(4.0), QuestionStatus::Correct));
        let q2 = copy.question(stamped).unwrap();
        assert_eq!((q2.points, q2.status), (Some(2.0), QuestionStatus::Partial));
        assert_eq!(copy.total(), 6.0);
    }

    #[test]
    fn default_question_naming() {
        let (mut engine, _, _) = engine_with_copy();
        let s = engine.add_section("Algebra", None).unwrap();
        engine.add_question(s, None, None);
        let q = engine.add_question(s, Some("  "), Some(-3.0)).unwrap();
        let question = engine.selected_copy().unwrap().question(q).unwrap();
        assert_eq!(question.name, "Question 2");
        assert_eq!(question.max_points, 1.0);
    }

    #[test]
    fn delete_question_searches_all_sections() {
        let (mut engine, _, _) = engine_with_copy();
        let a = engine.add_section("A", None).unwrap();
        let b = engine.add_section("B", None).unwrap();
        engine.add_question(a, None, None);
        let target = engine.add_question(b, None, None).unwrap();

        engine.delete_question(target);
        let copy = engine.selected_copy().unwrap();
        assert!(copy.question(target).is_none());
        assert_eq!(copy.section(a).unwrap().questions.len(), 1);
    }

    #[test]
    fn unknown_ids_are_silent_noops() {
        let (mut engine, _, _) = engine_with_copy();
        let version = engine.version();
        let updated_at = engine.selected_copy().unwrap().updated_at;

        engine.set_points(Uuid::new_v4(), Some(1.0));
        engine.delete_section(Uuid::new_v4());
        engine.update_question(Uuid::new_v4(), "x", None, 2.0);
        engine.set_stamp(Uuid::new_v4(), "default-good");
        assert!(engine.add_question(Uuid::new_v4(), None, None).is_none());

        assert_eq!(engine.version(), version);
        assert_eq!(engine.selected_copy().unwrap().updated_at, updated_at);
    }

    #[test]
    fn deleting_positioned_section_leaves_positioning() {
        let (mut engine, _, _) = engine_with_copy();
        let s = engine.add_section("S", None).unwrap();
        engine.toggle_positioning(PositionTarget::Section(s));
        engine.delete_section(s);
        assert!(!engine.positioning().is_active());
        assert!(engine.commit_position(NormalizedPosition::new(0.5, 0.5, 0)).is_none());
    }
}
