//! This module contains the readers that run MMC commands over an open
//! device handle.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// Chunked READ CD into a single audio buffer.
pub mod read_audio;
/// Single READ TOC.
pub mod read_toc;
/// Chunk-at-a-time audio reader with per-chunk retry.
pub mod stream;
