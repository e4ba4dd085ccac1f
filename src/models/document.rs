// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotatable documents.
//!
//! A document is a background image plus the capability flag that decides
//! whether new layers may be committed against it. Its layers live in the
//! layer store and are deleted together with it.

use super::layer::{AuthorId, DocumentId};
use crate::util::geometry::Size;
use serde::{Deserialize, Serialize};

/// Already-resolved handle to a background raster (a path or URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

impl ImageRef {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Document metadata as kept by the layer store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    pub owner: AuthorId,
    pub title: String,
    pub image: ImageRef,
    /// Pixel dimensions of the unscaled background image.
    pub natural_size: Size,
    /// When false, existing layers still render but no new one may be committed.
    pub annotatable: bool,
}

impl Document {
    /// Create a new annotatable document with the given image and dimensions.
    pub fn new(id: DocumentId, owner: AuthorId, image: ImageRef, natural_size: Size) -> Self {
        let title = std::path::Path::new(image.as_str())
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| image.as_str().to_string());
        Self {
            id,
            owner,
            title,
            image,
            natural_size,
            annotatable: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_from_image_name() {
        let doc = Document::new(
            DocumentId(1),
            AuthorId(1),
            ImageRef::new("/scores/nocturne-op9.png"),
            Size::new(1600.0, 1200.0),
        );
        assert_eq!(doc.title, "nocturne-op9");
        assert!(doc.annotatable);
    }
}
