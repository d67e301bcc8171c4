//! Annotation editing, tool state and tap handling.
//!
//! At most one text annotation is edited inline at a time. Finishing an
//! inline edit drops the annotation when its trimmed text is empty.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ChangeKind, GradingEngine, PositionTarget};
use crate::geometry::{DrawingBounds, NormalizedPosition};
use crate::models::{Annotation, AnnotationContent};

/// Tap tolerance for point-like annotations, in normalized page units.
pub const HIT_RADIUS: f64 = 0.03;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "tool", content = "stampId", rename_all = "camelCase")]
pub enum AnnotationTool {
    #[default]
    Select,
    Text,
    Stamp(String),
    Draw,
    Eraser,
}

/// What a tap on the page did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    Positioned(PositionTarget),
    Created(Uuid),
    Erased(Uuid),
    Selected(Option<Uuid>),
    Ignored,
}

fn hits(annotation: &Annotation, position: &NormalizedPosition) -> bool {
    if annotation.page() != position.page {
        return false;
    }
    match &annotation.content {
        AnnotationContent::Drawing { bounds, .. } => bounds.contains(position.x, position.y),
        AnnotationContent::Text { .. } | AnnotationContent::Stamp { .. } => {
            annotation.position.distance_to(position) <= HIT_RADIUS
        }
    }
}

impl GradingEngine {
    pub fn tool(&self) -> &AnnotationTool {
        &self.tool
    }

    pub fn set_tool(&mut self, tool: AnnotationTool) {
        if self.tool == tool {
            return;
        }
        self.finish_inline_editing();
        self.tool = tool;
        self.emit(self.selected, ChangeKind::Tool);
    }

    pub fn selected_annotation(&self) -> Option<Uuid> {
        self.selected_annotation
    }

    pub fn select_annotation(&mut self, id: Option<Uuid>) {
        let exists = match id {
            Some(id) => self.selected_copy().is_some_and(|c| c.annotation(id).is_some()),
            None => true,
        };
        if !exists || self.selected_annotation == id {
            return;
        }
        self.selected_annotation = id;
        self.emit(self.selected, ChangeKind::Selection);
    }

    pub fn inline_editing(&self) -> Option<Uuid> {
        self.inline_editing
    }

    /// Topmost annotation of the selected copy under `position`.
    pub fn hit_test(&self, position: &NormalizedPosition) -> Option<Uuid> {
        self.selected_copy()?
            .annotations
            .iter()
            .rev()
            .find(|a| hits(a, position))
            .map(|a| a.id)
    }

    pub fn add_annotation(&mut self, content: AnnotationContent, position: NormalizedPosition) -> Option<Uuid> {
        let annotation = Annotation::new(content, position);
        let id = annotation.id;
        self.mutate_selected(ChangeKind::Annotations, |copy| {
            copy.annotations.push(annotation);
            Some(id)
        })
    }

    /// Place ink. The annotation is anchored at the bounds' corner.
    pub fn add_drawing(&mut self, data: Vec<u8>, bounds: DrawingBounds, page: usize) -> Option<Uuid> {
        let annotation = Annotation::drawing(data, bounds, page);
        let id = annotation.id;
        self.mutate_selected(ChangeKind::Annotations, |copy| {
            copy.annotations.push(annotation);
            Some(id)
        })
    }

    /// Replace the text of a text annotation. Other kinds are left alone.
    pub fn update_text_annotation(&mut self, id: Uuid, new_text: &str) {
        self.mutate_selected(ChangeKind::Annotations, |copy| {
            match &mut copy.annotation_mut(id)?.content {
                AnnotationContent::Text { text } => {
                    *text = new_text.to_string();
                    Some(())
                }
                _ => None,
            }
        });
    }

    /// Move a text or stamp annotation. Drawings stay where they were placed.
    pub fn move_annotation(&mut self, id: Uuid, position: NormalizedPosition) {
        self.mutate_selected(ChangeKind::Annotations, |copy| {
            let annotation = copy.annotation_mut(id)?;
            if annotation.is_drawing() {
                tracing::debug!(annotation_id = %id, "Drawing annotations are not movable");
                return None;
            }
            annotation.position = position;
            Some(())
        });
    }

    pub fn remove_annotation(&mut self, id: Uuid) {
        let removed = self.mutate_selected(ChangeKind::Annotations, |copy| {
            let index = copy.annotations.iter().position(|a| a.id == id)?;
            copy.annotations.remove(index);
            Some(())
        });
        if removed.is_some() {
            if self.selected_annotation == Some(id) {
                self.selected_annotation = None;
            }
            if self.inline_editing == Some(id) {
                self.inline_editing = None;
            }
        }
    }

    /// Start an inline text note at `position`, finishing any note being edited.
    /// The empty note is kept in memory only until it receives text.
    pub fn begin_text_annotation(&mut self, position: NormalizedPosition) -> Option<Uuid> {
        self.finish_inline_editing();
        let copy_id = self.selected?;
        let annotation = Annotation::text("", position);
        let id = annotation.id;
        let copy = self.copies.iter_mut().find(|c| c.id == copy_id)?;
        copy.annotations.push(annotation);
        self.inline_editing = Some(id);
        self.selected_annotation = Some(id);
        self.emit(Some(copy_id), ChangeKind::Annotations);
        Some(id)
    }

    /// Commit the inline note. A note with only whitespace is removed.
    pub fn finish_inline_editing(&mut self) {
        let Some(id) = self.inline_editing.take() else {
            return;
        };
        let blank = self
            .selected_copy()
            .and_then(|c| c.annotation(id))
            .map(Annotation::is_blank_text);
        match blank {
            Some(true) => {
                tracing::debug!(annotation_id = %id, "Empty inline note discarded");
                self.remove_annotation(id);
            }
            Some(false) => {
                self.mutate_selected(ChangeKind::Annotations, |copy| copy.annotation(id).map(|_| ()));
            }
            None => {}
        }
    }

    /// Route a tap on the page: positioning first, then the active tool.
    pub fn handle_tap(&mut self, position: NormalizedPosition) -> TapOutcome {
        if let Some(target) = self.commit_position(position) {
            return TapOutcome::Positioned(target);
        }
        if self.selected.is_none() {
            return TapOutcome::Ignored;
        }

        match self.tool.clone() {
            AnnotationTool::Select => {
                self.finish_inline_editing();
                let hit = self.hit_test(&position);
                self.select_annotation(hit);
                TapOutcome::Selected(hit)
            }
            AnnotationTool::Text => match self.begin_text_annotation(position) {
                Some(id) => TapOutcome::Created(id),
                None => TapOutcome::Ignored,
            },
            AnnotationTool::Stamp(stamp_id) => {
                let Some(stamp) = self.catalog.get(&stamp_id).cloned() else {
                    tracing::debug!(stamp_id = %stamp_id, "Stamp tool with unknown stamp");
                    return TapOutcome::Ignored;
                };
                let annotation = Annotation::stamp(&stamp, position);
                let id = annotation.id;
                self.mutate_selected(ChangeKind::Annotations, |copy| {
                    copy.annotations.push(annotation);
                    Some(())
                });
                TapOutcome::Created(id)
            }
            AnnotationTool::Eraser => match self.hit_test(&position) {
                Some(id) => {
                    self.remove_annotation(id);
                    TapOutcome::Erased(id)
                }
                None => TapOutcome::Ignored,
            },
            // Ink arrives through `add_drawing` once a stroke ends.
            AnnotationTool::Draw => TapOutcome::Ignored,
        }
    }
}
