// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O operations for media, page documents and composited exports.

pub mod export;
pub mod media;
pub mod serialization;
