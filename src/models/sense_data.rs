// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::fmt;

use anyhow::{Result, anyhow};
use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout,
    byteorder::{BigEndian, U32},
};

/// Size of the sense buffer the pass-through layer fills on completion.
pub const SENSE_BUFFER_LEN: usize = 18;

/// Sense key, ASC and ASCQ live in the first 14 bytes of fixed-format sense.
pub const SENSE_KEY_FIELDS_LEN: usize = 14;

const _: () = assert!(SENSE_BUFFER_LEN >= SENSE_KEY_FIELDS_LEN);

/// Fixed-size sense buffer handed back with every command completion.
///
/// An all-zero buffer means the device reported no sense data.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct SenseBuffer([u8; SENSE_BUFFER_LEN]);

/// The three fields an error report needs from sense data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenseKeyFields {
    pub sense_key: u8,
    pub asc: u8,
    pub ascq: u8,
}

impl SenseBuffer {
    pub const fn empty() -> Self {
        Self([0; SENSE_BUFFER_LEN])
    }

    /// Copy up to [`SENSE_BUFFER_LEN`] bytes; the remainder stays zero.
    pub fn from_bytes(raw: &[u8]) -> Self {
        let mut buf = [0u8; SENSE_BUFFER_LEN];
        let n = raw.len().min(SENSE_BUFFER_LEN);
        buf[..n].copy_from_slice(&raw[..n]);
        Self(buf)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; SENSE_BUFFER_LEN] {
        &self.0
    }

    /// True when any byte of the buffer is non-zero.
    #[inline]
    pub fn is_present(&self) -> bool {
        self.0.iter().any(|&b| b != 0)
    }

    /// Sense key (byte 2 low nibble), ASC (byte 12) and ASCQ (byte 13).
    pub fn key_fields(&self) -> Option<SenseKeyFields> {
        if !self.is_present() {
            return None;
        }
        Some(SenseKeyFields {
            sense_key: self.0[2] & 0x0F,
            asc: self.0[12],
            ascq: self.0[13],
        })
    }
}

impl fmt::Debug for SenseBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SenseBuffer({:02x?})", self.0)
    }
}

/// Raw head of fixed-format sense data (SPC-4 § 4.5.3), bytes 0..18.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Debug)]
pub struct FixedSenseRaw {
    pub response_code: u8,
    pub obsolete: u8,
    pub flags_key: u8,
    pub information: U32<BigEndian>,
    pub additional_len: u8,
    pub cmd_specific: U32<BigEndian>,
    pub asc: u8,
    pub ascq: u8,
    pub fruc: u8,
    pub sense_key_specific: [u8; 3],
}

/// SPC-4 sense keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenseKey {
    NoSense,
    RecoveredError,
    NotReady,
    MediumError,
    HardwareError,
    IllegalRequest,
    UnitAttention,
    DataProtect,
    BlankCheck,
    VendorSpecific,
    CopyAborted,
    AbortedCommand,
    VolumeOverflow,
    Miscompare,
    Reserved(u8),
}

impl From<u8> for SenseKey {
    fn from(v: u8) -> Self {
        match v & 0x0F {
            0x0 => SenseKey::NoSense,
            0x1 => SenseKey::RecoveredError,
            0x2 => SenseKey::NotReady,
            0x3 => SenseKey::MediumError,
            0x4 => SenseKey::HardwareError,
            0x5 => SenseKey::IllegalRequest,
            0x6 => SenseKey::UnitAttention,
            0x7 => SenseKey::DataProtect,
            0x8 => SenseKey::BlankCheck,
            0x9 => SenseKey::VendorSpecific,
            0xA => SenseKey::CopyAborted,
            0xB => SenseKey::AbortedCommand,
            0xD => SenseKey::VolumeOverflow,
            0xE => SenseKey::Miscompare,
            other => SenseKey::Reserved(other),
        }
    }
}

/// Decoded fixed-format sense data.
#[derive(Default, PartialEq)]
pub struct SenseData {
    pub valid: bool,        // bit7 of byte0
    pub response_code: u8,  // low-7 bits of byte0
    pub sense_key: u8,      // low-4 bits of byte2
    pub ili: bool,          // bit5 of byte2
    pub eom: bool,          // bit6 of byte2
    pub filemark: bool,     // bit7 of byte2
    pub information: u32,   // bytes 3-6
    pub additional_len: u8, // byte7
    pub cmd_specific: u32,  // bytes 8-11
    pub asc: u8,
    pub ascq: u8,
}

impl SenseData {
    /// Parse *fixed-format* sense data; the buffer must hold at least 18
    /// bytes.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let (raw, _rest) = FixedSenseRaw::ref_from_prefix(buf).map_err(|_| {
            anyhow!(
                "sense buffer too small: {} < {SENSE_BUFFER_LEN}",
                buf.len()
            )
        })?;

        Ok(Self {
            valid: raw.response_code & 0x80 != 0,
            response_code: raw.response_code & 0x7F,
            sense_key: raw.flags_key & 0x0F,
            ili: raw.flags_key & 0x20 != 0,
            eom: raw.flags_key & 0x40 != 0,
            filemark: raw.flags_key & 0x80 != 0,
            information: raw.information.get(),
            additional_len: raw.additional_len,
            cmd_specific: raw.cmd_specific.get(),
            asc: raw.asc,
            ascq: raw.ascq,
        })
    }

    pub fn key(&self) -> SenseKey {
        SenseKey::from(self.sense_key)
    }
}

impl fmt::Debug for SenseData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenseData")
            .field("valid", &self.valid)
            .field(
                "response_code",
                &format_args!("{:#04x}", self.response_code),
            )
            .field("sense_key", &self.key())
            .field("filemark", &self.filemark)
            .field("eom", &self.eom)
            .field("ili", &self.ili)
            .field("information", &self.information)
            .field("asc", &format_args!("{:#04x}", self.asc))
            .field("ascq", &format_args!("{:#04x}", self.ascq))
            .field("description", &asc_ascq_to_str(self.asc, self.ascq))
            .finish()
    }
}

/// Description of an ASC/ASCQ pair as reported by CD/DVD drives.
///
/// Unknown pairs map to `"UNSPECIFIED / vendor specific"`.
#[inline]
pub fn asc_ascq_to_str(asc: u8, ascq: u8) -> &'static str {
    mmc_table(asc, ascq).unwrap_or("UNSPECIFIED / vendor specific")
}

fn mmc_table(asc: u8, ascq: u8) -> Option<&'static str> {
    Some(match (asc, ascq) {
        (0x00, 0x00) => "No additional sense information",
        (0x04, 0x01) => "Logical unit is in process of becoming ready",
        (0x04, 0x02) => "Logical unit not ready, initializing command required",
        (0x06, 0x00) => "No reference position found",
        (0x11, 0x00) => "Unrecovered read error",
        (0x11, 0x05) => "L-EC uncorrectable error",
        (0x11, 0x06) => "CIRC unrecovered error",
        (0x15, 0x00) => "Random positioning error",
        (0x20, 0x00) => "Invalid command operation code",
        (0x21, 0x00) => "Logical block address out of range",
        (0x24, 0x00) => "Invalid field in CDB",
        (0x28, 0x00) => "Not ready to ready change, medium may have changed",
        (0x29, 0x00) => "Power on, reset, or bus device reset occurred",
        (0x30, 0x02) => "Cannot read medium – incompatible format",
        (0x3A, 0x00) => "Medium not present",
        (0x3A, 0x01) => "Medium not present – tray closed",
        (0x3A, 0x02) => "Medium not present – tray open",
        (0x57, 0x00) => "Unable to recover table-of-contents",
        (0x64, 0x00) => "Illegal mode for this track",
        _ => return None,
    })
}
