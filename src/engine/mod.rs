// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Compositing and editing.
//!
//! The compositor replays committed layers onto a render surface; edit
//! sessions draw on a private scene graph over that surface and commit
//! it as a new layer.

pub mod compositor;
pub mod history;
pub mod session;
pub mod view;
