// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Data models for documents, annotation layers and scene graphs.

pub mod color;
pub mod document;
pub mod graph;
pub mod layer;
pub mod scene;
