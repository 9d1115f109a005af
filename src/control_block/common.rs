// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::fmt;

use crate::error::ScsiOp;

/// READ TOC/PMA/ATIP (MMC-6 § 6.33).
pub const READ_TOC: u8 = 0x43;
/// READ CD (MMC-6 § 6.19).
pub const READ_CD: u8 = 0xBE;

/// Bytes per raw CD-DA sector.
pub const CDDA_SECTOR_SIZE: u32 = 2352;
/// Allocation for a READ TOC response.
pub const TOC_ALLOCATION_LEN: u16 = 2048;
/// Upper bound on sectors per READ CD command (27 * 2352 = 63,504 bytes).
pub const MAX_SECTORS_PER_COMMAND: u32 = 27;

/// Longest CDB the pass-through layer accepts.
pub const MAX_CDB_LEN: usize = 16;

/// Transfer direction of a command's data phase.
///
/// Values match the pass-through layer's encoding (0 = none, 1 = to device,
/// 2 = from device).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataDirection {
    None = 0,
    ToDevice = 1,
    FromDevice = 2,
}

/// One command ready for the pass-through layer: the CDB bytes plus the
/// data-phase description.
///
/// Built per call and never retained.
#[derive(Clone, PartialEq, Eq)]
pub struct Command {
    cdb: [u8; MAX_CDB_LEN],
    cdb_len: usize,
    /// Direction of the data phase.
    pub direction: DataDirection,
    /// Expected data-phase size in bytes.
    pub transfer_len: u32,
    pub op: ScsiOp,
    /// Starting LBA for addressed commands.
    pub lba: Option<u32>,
    /// Sector count for addressed commands.
    pub sectors: Option<u32>,
}

impl Command {
    pub(crate) fn new(
        cdb: [u8; MAX_CDB_LEN],
        cdb_len: usize,
        direction: DataDirection,
        transfer_len: u32,
        op: ScsiOp,
    ) -> Self {
        Self {
            cdb,
            cdb_len: cdb_len.min(MAX_CDB_LEN),
            direction,
            transfer_len,
            op,
            lba: None,
            sectors: None,
        }
    }

    pub(crate) fn addressed(mut self, lba: u32, sectors: u32) -> Self {
        self.lba = Some(lba);
        self.sectors = Some(sectors);
        self
    }

    /// The CDB as sent to the device (10 or 12 bytes for the MMC reads).
    #[inline]
    pub fn cdb(&self) -> &[u8] {
        &self.cdb[..self.cdb_len]
    }

    #[inline]
    pub fn opcode(&self) -> u8 {
        self.cdb[0]
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("op", &self.op)
            .field("cdb", &format_args!("{:02x?}", self.cdb()))
            .field("direction", &self.direction)
            .field("transfer_len", &self.transfer_len)
            .field("lba", &self.lba)
            .field("sectors", &self.sectors)
            .finish()
    }
}
