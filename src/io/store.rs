// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Layer store adapter.
//!
//! The engine only talks to persistence through [`LayerStore`]. Two
//! implementations are provided: [`MemoryStore`], which keeps everything
//! in process, and [`FileStore`], which writes a YAML or JSON snapshot
//! after every mutation.

use crate::error::{ScoreError, ScoreResult};
use crate::io::serialization;
use crate::models::document::{Document, ImageRef};
use crate::models::layer::{AnnotationLayer, AuthorId, DocumentId, LayerId, NewLayer};
use crate::util::geometry::Size;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Boundary consumed by the compositor and edit sessions.
pub trait LayerStore {
    /// Document metadata; `NotFound` if it does not exist.
    fn get_document(&self, document_id: DocumentId) -> ScoreResult<Document>;

    /// Layers of a document, oldest first; `NotFound` if the document does not exist.
    fn fetch_layers(&self, document_id: DocumentId) -> ScoreResult<Vec<AnnotationLayer>>;

    /// Persist a new layer.
    ///
    /// Fails with `Forbidden` if the author may not annotate, `NotFound`
    /// for an unknown document and `AnnotationsDisabled` if the document
    /// does not accept annotations.
    fn save_layer(&self, layer: NewLayer) -> ScoreResult<LayerId>;

    /// Remove a layer. Deleting an unknown id succeeds.
    fn delete_layer(&self, layer_id: LayerId) -> ScoreResult<()>;
}

/// Everything a store holds, in a serializable form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub next_document_id: u64,
    pub next_layer_id: u64,
    /// Authors allowed to annotate.
    pub authors: BTreeSet<AuthorId>,
    pub documents: Vec<Document>,
    pub layers: Vec<AnnotationLayer>,
}

impl StoreSnapshot {
    fn document(&self, document_id: DocumentId) -> ScoreResult<&Document> {
        self.documents
            .iter()
            .find(|d| d.id == document_id)
            .ok_or_else(|| ScoreError::not_found(format!("document {document_id}")))
    }

    fn create_document(
        &mut self,
        owner: AuthorId,
        image: ImageRef,
        natural_size: Size,
        annotatable: bool,
    ) -> ScoreResult<Document> {
        if !self.authors.contains(&owner) {
            return Err(ScoreError::forbidden(format!("author {owner} is not registered")));
        }
        let natural_size = natural_size.validate("image size")?;
        self.next_document_id += 1;
        let mut document = Document::new(DocumentId(self.next_document_id), owner, image, natural_size);
        document.annotatable = annotatable;
        self.documents.push(document.clone());
        Ok(document)
    }

    fn fetch_layers(&self, document_id: DocumentId) -> ScoreResult<Vec<AnnotationLayer>> {
        self.document(document_id)?;
        let mut layers: Vec<AnnotationLayer> = self
            .layers
            .iter()
            .filter(|l| l.document_id == document_id)
            .cloned()
            .collect();
        layers.sort_by_key(|l| (l.created_at, l.id));
        Ok(layers)
    }

    fn save_layer(&mut self, layer: NewLayer) -> ScoreResult<LayerId> {
        if !self.authors.contains(&layer.author_id) {
            return Err(ScoreError::forbidden(format!(
                "author {} may not annotate",
                layer.author_id
            )));
        }
        if !self.document(layer.document_id)?.annotatable {
            return Err(ScoreError::AnnotationsDisabled);
        }

        // Keep creation times monotonic so listing order matches commit order.
        let now = chrono::Utc::now();
        let created_at = self
            .layers
            .iter()
            .map(|l| l.created_at)
            .max()
            .map_or(now, |latest| latest.max(now));

        self.next_layer_id += 1;
        let id = LayerId(self.next_layer_id);
        self.layers.push(AnnotationLayer {
            id,
            document_id: layer.document_id,
            author_id: layer.author_id,
            color: layer.color,
            tool_kind: layer.tool_kind,
            scene_graph_document: layer.scene_graph_document,
            created_at,
            accepted: false,
            reviewed: false,
        });
        Ok(id)
    }

    fn delete_layer(&mut self, layer_id: LayerId) {
        self.layers.retain(|l| l.id != layer_id);
    }

    fn delete_document(&mut self, document_id: DocumentId, caller: AuthorId) -> ScoreResult<()> {
        let owner = self.document(document_id)?.owner;
        if owner != caller {
            return Err(ScoreError::forbidden(format!(
                "only the owner may delete document {document_id}"
            )));
        }
        self.documents.retain(|d| d.id != document_id);
        self.layers.retain(|l| l.document_id != document_id);
        Ok(())
    }

    fn set_annotatable(&mut self, document_id: DocumentId, caller: AuthorId, annotatable: bool) -> ScoreResult<()> {
        let document = self
            .documents
            .iter_mut()
            .find(|d| d.id == document_id)
            .ok_or_else(|| ScoreError::not_found(format!("document {document_id}")))?;
        if document.owner != caller {
            return Err(ScoreError::forbidden(format!(
                "only the owner may change document {document_id}"
            )));
        }
        document.annotatable = annotatable;
        Ok(())
    }

    fn set_review_status(
        &mut self,
        layer_id: LayerId,
        caller: AuthorId,
        accepted: bool,
        reviewed: bool,
    ) -> ScoreResult<()> {
        let document_id = self
            .layers
            .iter()
            .find(|l| l.id == layer_id)
            .map(|l| l.document_id)
            .ok_or_else(|| ScoreError::not_found(format!("layer {layer_id}")))?;
        if self.document(document_id)?.owner != caller {
            return Err(ScoreError::forbidden(format!(
                "only the document owner may review layer {layer_id}"
            )));
        }
        if let Some(layer) = self.layers.iter_mut().find(|l| l.id == layer_id) {
            layer.accepted = accepted;
            layer.reviewed = reviewed;
        }
        Ok(())
    }
}

/// In-process layer store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreSnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
        }
    }

    // Mutations validate before writing, so a poisoned snapshot is still consistent.
    fn state(&self) -> MutexGuard<'_, StoreSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.state().clone()
    }

    /// Allow `author` to create documents and annotate.
    pub fn register_author(&self, author: AuthorId) {
        self.state().authors.insert(author);
    }

    pub fn create_document(
        &self,
        owner: AuthorId,
        image: ImageRef,
        natural_size: Size,
        annotatable: bool,
    ) -> ScoreResult<Document> {
        self.state().create_document(owner, image, natural_size, annotatable)
    }

    pub fn documents(&self) -> Vec<Document> {
        self.state().documents.clone()
    }

    /// Delete a document together with all of its layers.
    pub fn delete_document(&self, document_id: DocumentId, caller: AuthorId) -> ScoreResult<()> {
        self.state().delete_document(document_id, caller)
    }

    pub fn set_annotatable(&self, document_id: DocumentId, caller: AuthorId, annotatable: bool) -> ScoreResult<()> {
        self.state().set_annotatable(document_id, caller, annotatable)
    }

    /// Update the accepted/reviewed flags of a layer. Owner only.
    pub fn set_review_status(
        &self,
        layer_id: LayerId,
        caller: AuthorId,
        accepted: bool,
        reviewed: bool,
    ) -> ScoreResult<()> {
        self.state().set_review_status(layer_id, caller, accepted, reviewed)
    }
}

impl LayerStore for MemoryStore {
    fn get_document(&self, document_id: DocumentId) -> ScoreResult<Document> {
        self.state().document(document_id).cloned()
    }

    fn fetch_layers(&self, document_id: DocumentId) -> ScoreResult<Vec<AnnotationLayer>> {
        self.state().fetch_layers(document_id)
    }

    fn save_layer(&self, layer: NewLayer) -> ScoreResult<LayerId> {
        let id = self.state().save_layer(layer)?;
        log::info!("Saved annotation layer {}", id);
        Ok(id)
    }

    fn delete_layer(&self, layer_id: LayerId) -> ScoreResult<()> {
        self.state().delete_layer(layer_id);
        Ok(())
    }
}

/// Layer store persisted to a single YAML or JSON file.
///
/// Each mutation is applied to a staged copy of the snapshot, written to a
/// sibling temp file and renamed over the store file. The in-memory state
/// only changes once the rename succeeds, and the lock is held throughout
/// so the file always reflects the latest mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    format: serialization::Format,
    inner: MemoryStore,
}

impl FileStore {
    /// Open `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> ScoreResult<Self> {
        let path = path.into();
        let format = serialization::Format::from_path(&path)?;
        let snapshot = if path.exists() {
            let snapshot = serialization::import(&path)?;
            log::info!(
                "Loaded {} documents and {} layers from {}",
                snapshot.documents.len(),
                snapshot.layers.len(),
                path.display()
            );
            snapshot
        } else {
            StoreSnapshot::default()
        };
        Ok(Self {
            path,
            format,
            inner: MemoryStore::from_snapshot(snapshot),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.inner
    }

    fn staging_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path.with_file_name(format!(".{name}.partial"))
    }

    fn persist(&self, snapshot: &StoreSnapshot) -> ScoreResult<()> {
        let staging = self.staging_path();
        let written = match self.format {
            serialization::Format::Yaml => serialization::export_yaml(snapshot, &staging),
            serialization::Format::Json => serialization::export_json(snapshot, &staging),
        }
        .and_then(|()| std::fs::rename(&staging, &self.path).map_err(ScoreError::from));

        if let Err(err) = &written {
            log::warn!("Failed to write {}: {}", self.path.display(), err);
            let _ = std::fs::remove_file(&staging);
        }
        written
    }

    /// Apply `op` and persist the result, or leave the store untouched.
    fn write<T>(&self, op: impl FnOnce(&mut StoreSnapshot) -> ScoreResult<T>) -> ScoreResult<T> {
        let mut state = self.inner.state();
        let mut staged = state.clone();
        let out = op(&mut staged)?;
        self.persist(&staged)?;
        *state = staged;
        Ok(out)
    }

    pub fn register_author(&self, author: AuthorId) -> ScoreResult<()> {
        self.write(|s| {
            s.authors.insert(author);
            Ok(())
        })
    }

    pub fn create_document(
        &self,
        owner: AuthorId,
        image: ImageRef,
        natural_size: Size,
        annotatable: bool,
    ) -> ScoreResult<Document> {
        self.write(|s| s.create_document(owner, image, natural_size, annotatable))
    }

    pub fn delete_document(&self, document_id: DocumentId, caller: AuthorId) -> ScoreResult<()> {
        self.write(|s| s.delete_document(document_id, caller))
    }

    pub fn set_annotatable(&self, document_id: DocumentId, caller: AuthorId, annotatable: bool) -> ScoreResult<()> {
        self.write(|s| s.set_annotatable(document_id, caller, annotatable))
    }

    pub fn set_review_status(
        &self,
        layer_id: LayerId,
        caller: AuthorId,
        accepted: bool,
        reviewed: bool,
    ) -> ScoreResult<()> {
        self.write(|s| s.set_review_status(layer_id, caller, accepted, reviewed))
    }
}

impl LayerStore for FileStore {
    fn get_document(&self, document_id: DocumentId) -> ScoreResult<Document> {
        self.inner.get_document(document_id)
    }

    fn fetch_layers(&self, document_id: DocumentId) -> ScoreResult<Vec<AnnotationLayer>> {
        self.inner.fetch_layers(document_id)
    }

    fn save_layer(&self, layer: NewLayer) -> ScoreResult<LayerId> {
        let id = self.write(|s| s.save_layer(layer))?;
        log::info!("Saved annotation layer {} to {}", id, self.path.display());
        Ok(id)
    }

    fn delete_layer(&self, layer_id: LayerId) -> ScoreResult<()> {
        self.write(|s| {
            s.delete_layer(layer_id);
            Ok(())
        })
    }
}
