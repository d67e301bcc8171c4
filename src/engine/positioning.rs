//! Badge positioning: an explicit idle/positioning state machine.
//!
//! Entering positioning targets one element. The next accepted tap is
//! stored as that element's position and the machine returns to idle.

use serde::Serialize;
use uuid::Uuid;

use super::{ChangeKind, GradingEngine};
use crate::geometry::NormalizedPosition;

/// Element whose badge can be pinned to a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum PositionTarget {
    Total,
    Section(Uuid),
    Question(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "target", rename_all = "camelCase")]
pub enum PositioningState {
    #[default]
    Idle,
    Positioning(PositionTarget),
}

impl PositioningState {
    /// Enter positioning for `target`, or leave it when `target` is already active.
    pub fn toggled(self, target: PositionTarget) -> Self {
        match self {
            PositioningState::Positioning(active) if active == target => PositioningState::Idle,
            _ => PositioningState::Positioning(target),
        }
    }

    pub fn target(&self) -> Option<PositionTarget> {
        match self {
            PositioningState::Idle => None,
            PositioningState::Positioning(target) => Some(*target),
        }
    }

    pub fn is_active(&self) -> bool {
        self.target().is_some()
    }
}

impl GradingEngine {
    pub fn positioning(&self) -> PositioningState {
        self.positioning
    }

    pub fn toggle_positioning(&mut self, target: PositionTarget) {
        self.positioning = self.positioning.toggled(target);
        tracing::debug!(state = ?self.positioning, "Positioning toggled");
        self.emit(self.selected, ChangeKind::Tool);
    }

    pub(crate) fn cancel_positioning(&mut self) {
        if self.positioning.is_active() {
            self.positioning = PositioningState::Idle;
            self.emit(self.selected, ChangeKind::Tool);
        }
    }

    /// Store `position` for the active target and return to idle.
    /// Returns the target that was placed, if positioning was active.
    pub fn commit_position(&mut self, position: NormalizedPosition) -> Option<PositionTarget> {
        let target = self.positioning.target()?;
        self.positioning = PositioningState::Idle;
        self.set_position(target, Some(position));
        Some(target)
    }

    pub fn set_total_position(&mut self, position: NormalizedPosition) {
        self.set_position(PositionTarget::Total, Some(position));
    }

    pub fn set_section_position(&mut self, section_id: Uuid, position: NormalizedPosition) {
        self.set_position(PositionTarget::Section(section_id), Some(position));
    }

    pub fn set_question_position(&mut self, question_id: Uuid, position: NormalizedPosition) {
        self.set_position(PositionTarget::Question(question_id), Some(position));
    }

    /// Remove a badge position. Positioning mode is left as it is.
    pub fn clear_position(&mut self, target: PositionTarget) {
        self.set_position(target, None);
    }

    fn set_position(&mut self, target: PositionTarget, position: Option<NormalizedPosition>) {
        self.mutate_selected(ChangeKind::Positions, |copy| match target {
            PositionTarget::Total => {
                copy.total_position = position;
                Some(())
            }
            PositionTarget::Section(id) => {
                copy.section_mut(id)?.position = position;
                Some(())
            }
            PositionTarget::Question(id) => {
                copy.question_mut(id)?.position = position;
                Some(())
            }
        });
    }

    /// Leave positioning if its target is an element that no longer exists.
    pub(crate) fn drop_stale_positioning(&mut self) {
        let stale = match self.positioning.target() {
            Some(PositionTarget::Section(id)) => self.selected_copy().map_or(true, |c| c.section(id).is_none()),
            Some(PositionTarget::Question(id)) => self.selected_copy().map_or(true, |c| c.question(id).is_none()),
            _ => false,
        };
        if stale {
            self.cancel_positioning();
        }
    }
}
