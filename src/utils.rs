// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::ops::Range;

use crate::{control_block::common::CDDA_SECTOR_SIZE, error::CdError};

/// One READ CD command's share of a larger audio read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Zero-based position of the chunk in the plan.
    pub index: usize,
    pub lba: u32,
    pub sectors: u32,
    /// Byte offset of the chunk in the destination buffer.
    pub offset: usize,
}

impl Chunk {
    /// Destination bytes this chunk fills.
    pub fn byte_range(&self) -> Range<usize> {
        self.offset..self.offset + self.sectors as usize * CDDA_SECTOR_SIZE as usize
    }
}

/// Split `sectors` sectors starting at `lba` into consecutive chunks of at
/// most `max_per_command` sectors. Only the last chunk may be shorter.
///
/// The caller guarantees `lba + sectors - 1` fits in `u32` and
/// `max_per_command > 0`.
pub fn plan_chunks(lba: u32, sectors: u32, max_per_command: u32) -> impl Iterator<Item = Chunk> {
    let step = max_per_command.max(1);
    (0..sectors.div_ceil(step)).map(move |index| {
        let done = index * step;
        Chunk {
            index: index as usize,
            lba: lba + done,
            sectors: step.min(sectors - done),
            offset: done as usize * CDDA_SECTOR_SIZE as usize,
        }
    })
}

/// Allocate a zeroed buffer of `len` bytes, reporting allocation failure
/// instead of aborting.
pub fn try_alloc_zeroed(len: usize) -> Result<Vec<u8>, CdError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| CdError::OutOfMemory { bytes: len })?;
    buf.resize(len, 0);
    Ok(buf)
}
