// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! SCOREMARK - layered annotation of scanned music scores
//!
//! Each annotator draws on a private edit session over a scaled render of
//! the score. Committing turns the session into an immutable layer; the
//! compositor replays every committed layer, oldest first, onto a fresh
//! surface whenever a document is opened.

pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod models;
pub mod util;

pub use engine::compositor::{CompositeRequest, Compositor, RenderSurface};
pub use engine::session::{EditSession, SessionState};
pub use engine::view::DocumentView;
pub use error::{ScoreError, ScoreResult};
pub use io::store::{FileStore, LayerStore, MemoryStore};
pub use models::layer::{AnnotationLayer, AuthorId, DocumentId, LayerId, ToolKind};
