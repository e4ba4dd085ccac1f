// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Store snapshot serialization and deserialization.
//!
//! This module handles exporting and importing the full contents of a
//! layer store (documents and their layers) in YAML and JSON formats.

use crate::error::{ScoreError, ScoreResult};
use crate::io::store::StoreSnapshot;
use std::path::Path;

/// On-disk format, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    pub fn from_path(path: &Path) -> ScoreResult<Self> {
        let extension = path.extension().and_then(|s| s.to_str());
        match extension {
            Some("yaml") | Some("yml") => Ok(Format::Yaml),
            Some("json") => Ok(Format::Json),
            _ => Err(ScoreError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Export a store snapshot to YAML format.
pub fn export_yaml(data: &StoreSnapshot, path: &Path) -> ScoreResult<()> {
    let yaml = serde_yaml::to_string(data)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Export a store snapshot to JSON format.
pub fn export_json(data: &StoreSnapshot, path: &Path) -> ScoreResult<()> {
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Import a store snapshot from YAML format.
pub fn import_yaml(path: &Path) -> ScoreResult<StoreSnapshot> {
    let yaml = std::fs::read_to_string(path)?;
    let data = serde_yaml::from_str(&yaml)?;
    Ok(data)
}

/// Import a store snapshot from JSON format.
pub fn import_json(path: &Path) -> ScoreResult<StoreSnapshot> {
    let json = std::fs::read_to_string(path)?;
    let data = serde_json::from_str(&json)?;
    Ok(data)
}

/// Export in the format implied by the extension of `path`.
pub fn export(data: &StoreSnapshot, path: &Path) -> ScoreResult<()> {
    match Format::from_path(path)? {
        Format::Yaml => export_yaml(data, path),
        Format::Json => export_json(data, path),
    }
}

/// Import in the format implied by the extension of `path`.
pub fn import(path: &Path) -> ScoreResult<StoreSnapshot> {
    match Format::from_path(path)? {
        Format::Yaml => import_yaml(path),
        Format::Json => import_json(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::store::{LayerStore, MemoryStore};
    use crate::models::color::Color;
    use crate::models::document::ImageRef;
    use crate::models::layer::{AuthorId, NewLayer, ToolKind};
    use crate::util::geometry::Size;

    fn populated() -> StoreSnapshot {
        let store = MemoryStore::new();
        store.register_author(AuthorId(1));
        let doc = store
            .create_document(AuthorId(1), ImageRef::new("score.png"), Size::new(1600.0, 1200.0), true)
            .unwrap();
        store
            .save_layer(NewLayer {
                document_id: doc.id,
                author_id: AuthorId(1),
                color: Color::RED,
                tool_kind: ToolKind::Rectangle,
                scene_graph_document: serde_json::json!({
                    "canvasWidth": 800.0, "canvasHeight": 600.0, "objects": []
                }),
            })
            .unwrap();
        store.snapshot()
    }

    #[test]
    fn test_yaml_and_json_preserve_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = populated();

        for name in ["store.yaml", "store.json"] {
            let path = dir.path().join(name);
            export(&snapshot, &path).unwrap();
            let back = import(&path).unwrap();
            assert_eq!(back, snapshot, "{name}");
        }
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.txt");
        assert!(matches!(export(&populated(), &path), Err(ScoreError::UnsupportedFormat(_))));
        assert!(matches!(Format::from_path(Path::new("x")), Err(ScoreError::UnsupportedFormat(_))));
    }
}
