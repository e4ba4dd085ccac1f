// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Error types for the annotation engine.
//!
//! Only `MalformedDocument` is ever recovered inside the engine (a bad
//! layer is skipped during compositing). Everything else is surfaced to
//! the caller as-is.

use crate::models::layer::DocumentId;

pub type ScoreResult<T> = Result<T, ScoreError>;

#[derive(thiserror::Error, Debug)]
pub enum ScoreError {
    #[error("malformed scene graph document: {0}")]
    MalformedDocument(String),

    #[error("nothing has been drawn in this session")]
    EmptySession,

    #[error("this document does not accept annotations")]
    AnnotationsDisabled,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("edit session already committed")]
    SessionClosed,

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("session belongs to document {session}, not {view}")]
    WrongDocument { session: DocumentId, view: DocumentId },

    #[error("composite #{0} did not complete")]
    CompositeAborted(u64),

    #[error("unsupported store format: {0}")]
    UnsupportedFormat(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScoreError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedDocument(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }
}

impl From<serde_json::Error> for ScoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

impl From<serde_yaml::Error> for ScoreError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serde(err.to_string())
    }
}
