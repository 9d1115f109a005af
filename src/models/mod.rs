//! Decoding of what the device hands back after a command: sense data,
//! completion status, and the combined outcome.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// Command outcome and its classification into success or [`ScsiError`].
///
/// [`ScsiError`]: crate::error::ScsiError
pub mod outcome;
/// Platform return codes.
pub mod return_code;
/// Sense buffer handling and fixed-format sense parsing.
pub mod sense_data;
/// Task completion status and the legacy status byte mapping.
pub mod status;
