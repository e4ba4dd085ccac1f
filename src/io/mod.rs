// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O: score images, the layer store and store snapshot files.

pub mod media;
pub mod serialization;
pub mod store;
