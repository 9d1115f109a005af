//! This module resolves devices, owns the device session, and guards the
//! disc against remounts.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// Keeps the OS from mounting the target disc.
pub mod guard;
/// Walks the device tree from a block-device name to its command client.
pub mod resolve;
/// The single exclusive device session and its handle.
pub mod session;
