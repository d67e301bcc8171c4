//! Rubric propagation across the batch and template transport.

use uuid::Uuid;

use super::{ChangeKind, GradingEngine};
use crate::models::{clone_sections, CarryOver, RubricTemplate};

impl GradingEngine {
    /// Copy the selected copy's rubric structure and badge positions into
    /// every other copy that has no sections yet. Grades never travel.
    /// Returns the IDs of the copies that received the rubric.
    pub fn apply_current_rubric_to_all(&mut self) -> Vec<Uuid> {
        let Some(source) = self.selected_copy() else {
            tracing::debug!("Apply to all without a selected copy ignored");
            return Vec::new();
        };
        if !source.has_rubric() {
            tracing::debug!(copy_id = %source.id, "Selected copy has no rubric to apply");
            return Vec::new();
        }
        let source_id = source.id;
        let sections = source.sections.clone();
        let total_position = source.total_position;

        let targets: Vec<Uuid> = self
            .copies
            .iter()
            .filter(|c| c.id != source_id && !c.has_rubric())
            .map(|c| c.id)
            .collect();

        let mut applied = Vec::with_capacity(targets.len());
        for id in targets {
            let done = self.mutate_copy(id, ChangeKind::Rubric, |copy| {
                copy.sections = clone_sections(&sections, CarryOver::STRUCTURE_WITH_POSITIONS);
                copy.total_position = total_position;
                Some(())
            });
            if done.is_some() {
                applied.push(id);
            }
        }
        tracing::info!(source = %source_id, applied = applied.len(), "Rubric applied to batch");
        applied
    }

    /// Template of the selected copy's rubric.
    pub fn current_template(&self, name: &str) -> Option<RubricTemplate> {
        let copy = self.selected_copy()?;
        Some(RubricTemplate::from_sections(name, &copy.sections))
    }

    /// Seed `copy_id` from `template`. Copies that already have a rubric
    /// are left untouched.
    pub fn apply_template(&mut self, copy_id: Uuid, template: &RubricTemplate) -> bool {
        let applied = self.mutate_copy(copy_id, ChangeKind::Rubric, |copy| {
            if copy.has_rubric() {
                return None;
            }
            copy.sections = template.to_sections();
            Some(())
        });
        if applied.is_some() {
            tracing::info!(copy_id = %copy_id, template = %template.name, "Template applied");
        }
        applied.is_some()
    }
}
