// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! READ TOC/PMA/ATIP — 10-byte CDB written into a 16-byte buffer.
//!
//! CDB layout (MMC-6 § 6.33):
//!   [0]      = 0x43
//!   [1]      = MSF (bit 1); 0 requests LBA addressing
//!   [2]      = FORMAT (low 4 bits); 0x00 = formatted TOC
//!   [3..=5]  = reserved
//!   [6]      = TRACK/SESSION NUMBER
//!   [7..=8]  = ALLOCATION LENGTH (big-endian)
//!   [9]      = CONTROL

use crate::{
    control_block::common::{
        Command, DataDirection, MAX_CDB_LEN, READ_TOC, TOC_ALLOCATION_LEN,
    },
    error::ScsiOp,
};

pub const READ_TOC_CDB_LEN: usize = 10;

/// READ TOC response formats.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TocFormat {
    Toc = 0x00,
    SessionInfo = 0x01,
    FullToc = 0x02,
    Pma = 0x03,
    Atip = 0x04,
    CdText = 0x05,
}

/// Fill a READ TOC/PMA/ATIP CDB into `cdb[0..10]`.
#[inline]
pub fn fill_read_toc(
    cdb: &mut [u8; MAX_CDB_LEN],
    msf: bool,
    format: TocFormat,
    track: u8,
    allocation_len: u16,
    control: u8,
) {
    cdb.fill(0);
    cdb[0] = READ_TOC;
    cdb[1] = if msf { 0x02 } else { 0x00 };
    cdb[2] = (format as u8) & 0x0F;
    cdb[6] = track;
    cdb[7..9].copy_from_slice(&allocation_len.to_be_bytes());
    cdb[9] = control;
}

/// READ TOC for the first session: LBA addressing, formatted TOC, 2048-byte
/// allocation, data from the device.
pub fn build_read_toc() -> Command {
    let mut cdb = [0u8; MAX_CDB_LEN];
    fill_read_toc(&mut cdb, false, TocFormat::Toc, 0, TOC_ALLOCATION_LEN, 0);
    Command::new(
        cdb,
        READ_TOC_CDB_LEN,
        DataDirection::FromDevice,
        u32::from(TOC_ALLOCATION_LEN),
        ScsiOp::ReadToc,
    )
}
