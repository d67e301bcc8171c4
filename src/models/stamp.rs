//! Reusable grading stamps.
//!
//! The catalog is owned by the grading engine and shared by every copy it
//! manages. Placed stamps keep a snapshot of label and color, so editing the
//! catalog never rewrites stamps already on a page.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::StampColor;

/// ID prefix reserved for built-in stamps. These are never deletable.
pub const DEFAULT_STAMP_PREFIX: &str = "default-";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StampDefinition {
    pub id: String,
    pub label: String,
    pub color: StampColor,
    /// Fraction of a question's max points this stamp awards, in [0, 1].
    pub coefficient: f64,
}

impl StampDefinition {
    pub fn is_default(&self) -> bool {
        self.id.starts_with(DEFAULT_STAMP_PREFIX)
    }
}

fn builtin(id: &str, label: &str, color: StampColor, coefficient: f64) -> StampDefinition {
    StampDefinition {
        id: id.into(),
        label: label.into(),
        color,
        coefficient,
    }
}

/// The five built-in stamps, in display order.
pub fn default_stamps() -> Vec<StampDefinition> {
    vec![
        builtin("default-excellent", "Excellent", StampColor::Green, 1.0),
        builtin("default-good", "Good", StampColor::Green, 0.75),
        builtin("default-partial", "Partial", StampColor::Yellow, 0.5),
        builtin("default-insufficient", "Insufficient", StampColor::Red, 0.25),
        builtin("default-wrong", "Wrong", StampColor::Red, 0.0),
    ]
}

/// Mutable, engine-scoped collection of stamp definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampCatalog {
    stamps: Vec<StampDefinition>,
}

impl Default for StampCatalog {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl StampCatalog {
    /// Catalog seeded with the built-in stamps.
    pub fn with_defaults() -> Self {
        Self {
            stamps: default_stamps(),
        }
    }

    /// Rebuild a catalog from stored definitions. Built-in stamps missing
    /// from `stamps` are re-added in front; duplicate IDs keep the first.
    pub fn from_stored(stamps: Vec<StampDefinition>) -> Self {
        let mut merged: Vec<StampDefinition> = Vec::with_capacity(stamps.len() + 5);
        for builtin in default_stamps() {
            if !stamps.iter().any(|s| s.id == builtin.id) {
                merged.push(builtin);
            }
        }
        for mut stamp in stamps {
            if merged.iter().any(|s| s.id == stamp.id) {
                continue;
            }
            stamp.coefficient = clamp_coefficient(stamp.coefficient);
            merged.push(stamp);
        }
        Self { stamps: merged }
    }

    pub fn all(&self) -> &[StampDefinition] {
        &self.stamps
    }

    pub fn get(&self, id: &str) -> Option<&StampDefinition> {
        self.stamps.iter().find(|s| s.id == id)
    }

    /// Add a custom stamp and return its ID.
    pub fn add(&mut self, label: &str, color: StampColor, coefficient: f64) -> String {
        let id = Uuid::new_v4().to_string();
        self.stamps.push(StampDefinition {
            id: id.clone(),
            label: label.trim().to_string(),
            color,
            coefficient: clamp_coefficient(coefficient),
        });
        id
    }

    /// Edit a stamp in place. Returns false when the ID is unknown.
    pub fn update(&mut self, id: &str, label: &str, color: StampColor, coefficient: f64) -> bool {
        match self.stamps.iter_mut().find(|s| s.id == id) {
            Some(stamp) => {
                stamp.label = label.trim().to_string();
                stamp.color = color;
                stamp.coefficient = clamp_coefficient(coefficient);
                true
            }
            None => false,
        }
    }

    /// Remove a custom stamp. Built-in stamps are refused.
    pub fn remove(&mut self, id: &str) -> bool {
        if id.starts_with(DEFAULT_STAMP_PREFIX) {
            return false;
        }
        let before = self.stamps.len();
        self.stamps.retain(|s| s.id != id);
        self.stamps.len() != before
    }
}

fn clamp_coefficient(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
