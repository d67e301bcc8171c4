//! Change notifications emitted after every engine mutation.

use serde::Serialize;
use uuid::Uuid;

/// Capacity of the broadcast channel. Slow subscribers skip ahead and can
/// re-read state through the engine accessors.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Collection,
    Selection,
    Rubric,
    Scoring,
    Annotations,
    Positions,
    Student,
    Catalog,
    Tool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineEvent {
    /// Engine version after the change.
    pub version: u64,
    /// Copy the change applies to; `None` for session-wide changes.
    pub copy_id: Option<Uuid>,
    pub change: ChangeKind,
}
