// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! READ CD — 12-byte CDB written into a 16-byte buffer.
//!
//! CDB layout (MMC-6 § 6.19):
//!   [0]      = 0xBE
//!   [1]      = EXPECTED SECTOR TYPE (bits 4:2), DAP (bit 1)
//!   [2..=5]  = STARTING LBA (big-endian)
//!   [6..=8]  = TRANSFER LENGTH in sectors (big-endian, 24-bit)
//!   [9]      = SYNC | HEADER CODES | USER DATA | EDC/ECC | C2 ERROR
//!   [10]     = SUB-CHANNEL DATA SELECTION (bits 2:0)
//!   [11]     = CONTROL

use crate::{
    control_block::common::{
        CDDA_SECTOR_SIZE, Command, DataDirection, MAX_CDB_LEN,
        MAX_SECTORS_PER_COMMAND, READ_CD,
    },
    error::{CdError, ScsiOp},
};

pub const READ_CD_CDB_LEN: usize = 12;

bitflags::bitflags! {
    /// Byte 9 of the READ CD CDB: which parts of each sector to return.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct ReadCdFields: u8 {
        const SYNC       = 0b1000_0000;
        const SUBHEADER  = 0b0100_0000;
        const HEADER     = 0b0010_0000;
        /// User data only; for CD-DA that is the full 2352-byte sector.
        const USER_DATA  = 0b0001_0000;
        const EDC_ECC    = 0b0000_1000;
        /// C2 error codes (bits 2:1).
        const C2_MASK    = 0b0000_0110;
    }
}

/// Expected sector type (byte 1, bits 4:2).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorType {
    Any = 0,
    Cdda = 1,
    Mode1 = 2,
    Mode2Formless = 3,
    Mode2Form1 = 4,
    Mode2Form2 = 5,
}

/// Fill a READ CD CDB into `cdb[0..12]`.
///
/// `blocks` is truncated to the 24-bit TRANSFER LENGTH field.
#[inline]
pub fn fill_read_cd(
    cdb: &mut [u8; MAX_CDB_LEN],
    sector_type: SectorType,
    lba: u32,
    blocks: u32,
    fields: ReadCdFields,
    subchannel: u8,
    control: u8,
) {
    cdb.fill(0);
    cdb[0] = READ_CD;
    cdb[1] = ((sector_type as u8) & 0x07) << 2;
    cdb[2..6].copy_from_slice(&lba.to_be_bytes());
    cdb[6..9].copy_from_slice(&blocks.to_be_bytes()[1..]);
    cdb[9] = fields.bits();
    cdb[10] = subchannel & 0x07;
    cdb[11] = control;
}

/// READ CD of `sectors` raw 2352-byte sectors starting at `lba`.
///
/// `sectors` must lie in `1..=27`; larger reads are split by the audio
/// reader.
pub fn build_read_cd(lba: u32, sectors: u32) -> Result<Command, CdError> {
    if !(1..=MAX_SECTORS_PER_COMMAND).contains(&sectors) {
        return Err(CdError::InvalidTransferLength {
            sectors,
            max: MAX_SECTORS_PER_COMMAND,
        });
    }

    let mut cdb = [0u8; MAX_CDB_LEN];
    fill_read_cd(
        &mut cdb,
        SectorType::Any,
        lba,
        sectors,
        ReadCdFields::USER_DATA,
        0,
        0,
    );
    Ok(Command::new(
        cdb,
        READ_CD_CDB_LEN,
        DataDirection::FromDevice,
        sectors * CDDA_SECTOR_SIZE,
        ScsiOp::ReadCd,
    )
    .addressed(lba, sectors))
}
