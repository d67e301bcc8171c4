use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::base64_bytes;
use super::enums::StampColor;
use super::stamp::StampDefinition;
use crate::geometry::{DrawingBounds, NormalizedPosition};

/// Free-form mark placed on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: Uuid,
    pub position: NormalizedPosition,
    pub content: AnnotationContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AnnotationContent {
    Text {
        text: String,
    },
    /// Label and color are copied from the catalog when placed.
    #[serde(rename_all = "camelCase")]
    Stamp {
        definition_id: String,
        text: String,
        color: StampColor,
    },
    /// Opaque ink payload plus its relative box on the page.
    Drawing {
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
        bounds: DrawingBounds,
    },
}

impl Annotation {
    pub fn new(content: AnnotationContent, position: NormalizedPosition) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            content,
        }
    }

    pub fn text(text: &str, position: NormalizedPosition) -> Self {
        Self::new(AnnotationContent::Text { text: text.to_string() }, position)
    }

    /// Stamp annotation snapshotting the definition's label and color.
    pub fn stamp(definition: &StampDefinition, position: NormalizedPosition) -> Self {
        Self::new(
            AnnotationContent::Stamp {
                definition_id: definition.id.clone(),
                text: definition.label.clone(),
                color: definition.color,
            },
            position,
        )
    }

    /// Ink annotation anchored at the bottom-left corner of its bounds.
    pub fn drawing(data: Vec<u8>, bounds: DrawingBounds, page: usize) -> Self {
        Self::new(
            AnnotationContent::Drawing { data, bounds },
            NormalizedPosition::new(bounds.x, bounds.y, page),
        )
    }

    pub fn page(&self) -> usize {
        self.position.page
    }

    /// Text note with nothing but whitespace.
    pub fn is_blank_text(&self) -> bool {
        matches!(&self.content, AnnotationContent::Text { text } if text.trim().is_empty())
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.content, AnnotationContent::Drawing { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self.content {
            AnnotationContent::Text { .. } => "text",
            AnnotationContent::Stamp { .. } => "stamp",
            AnnotationContent::Drawing { .. } => "drawing",
        }
    }
}
