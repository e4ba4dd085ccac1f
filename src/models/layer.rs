// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Persisted annotation layers and the identifiers around them.

use crate::models::color::Color;
use crate::models::scene::ObjectKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifies a document (a background image plus its layers).
    DocumentId
);
id_type!(
    /// Identifies one persisted annotation layer.
    LayerId
);
id_type!(
    /// Identifies the user who authored a layer.
    AuthorId
);

/// Drawing tool. Recorded on each layer as the tool last used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Select,
    #[default]
    #[serde(rename = "freehand")]
    FreehandPath,
    Line,
    Rectangle,
    #[serde(rename = "textbox")]
    TextBox,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::Select,
        ToolKind::FreehandPath,
        ToolKind::Line,
        ToolKind::Rectangle,
        ToolKind::TextBox,
    ];

    /// The kind of object this tool draws, or `None` for `Select`.
    pub fn draws(self) -> Option<ObjectKind> {
        match self {
            ToolKind::Select => None,
            ToolKind::FreehandPath => Some(ObjectKind::FreehandPath),
            ToolKind::Line => Some(ObjectKind::Line),
            ToolKind::Rectangle => Some(ObjectKind::Rectangle),
            ToolKind::TextBox => Some(ObjectKind::TextBox),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ToolKind::Select => "Select",
            ToolKind::FreehandPath => "Pencil",
            ToolKind::Line => "Line",
            ToolKind::Rectangle => "Rectangle",
            ToolKind::TextBox => "Text",
        }
    }
}

/// One immutable annotation contribution, as stored.
///
/// Only the review flags may change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationLayer {
    pub id: LayerId,
    pub document_id: DocumentId,
    pub author_id: AuthorId,
    /// Overrides per-object colors when the layer is replayed.
    pub color: Color,
    pub tool_kind: ToolKind,
    /// The serialized scene graph, kept as raw JSON so that a corrupt
    /// document only fails when it is replayed.
    pub scene_graph_document: serde_json::Value,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub accepted: bool,
    #[serde(default)]
    pub reviewed: bool,
}

/// Everything needed to persist a new layer.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLayer {
    pub document_id: DocumentId,
    pub author_id: AuthorId,
    pub color: Color,
    pub tool_kind: ToolKind,
    pub scene_graph_document: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_kind_wire_names() {
        let names: Vec<String> = ToolKind::ALL
            .iter()
            .map(|t| serde_json::to_string(t).unwrap())
            .collect();
        assert_eq!(
            names,
            vec!["\"select\"", "\"freehand\"", "\"line\"", "\"rectangle\"", "\"textbox\""]
        );
    }

    #[test]
    fn test_only_select_does_not_draw() {
        assert_eq!(ToolKind::Select.draws(), None);
        assert_eq!(ToolKind::Rectangle.draws(), Some(ObjectKind::Rectangle));
        assert_eq!(ToolKind::ALL.iter().filter(|t| t.draws().is_some()).count(), 4);
    }

    #[test]
    fn test_review_flags_default_off() {
        let json = serde_json::json!({
            "id": 7,
            "documentId": 1,
            "authorId": 3,
            "color": "#ff0000",
            "toolKind": "line",
            "sceneGraphDocument": { "canvasWidth": 10, "canvasHeight": 10, "objects": [] },
            "createdAt": "2025-03-01T10:00:00Z"
        });
        let layer: AnnotationLayer = serde_json::from_value(json).unwrap();
        assert_eq!(layer.id, LayerId(7));
        assert_eq!(layer.tool_kind, ToolKind::Line);
        assert!(!layer.accepted);
        assert!(!layer.reviewed);
    }
}
