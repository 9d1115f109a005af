// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;

use thiserror::Error;

use crate::models::sense_data::asc_ascq_to_str;

/// Which MMC command a [`ScsiError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScsiOp {
    ReadToc,
    ReadCd,
}

impl fmt::Display for ScsiOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScsiOp::ReadToc => "READ TOC",
            ScsiOp::ReadCd => "READ CD",
        })
    }
}

/// Failure report for one executed command.
///
/// The first eight fields keep a stable shape so hosts can forward them
/// across an FFI or IPC boundary unchanged. `op`, `lba` and `sectors`
/// describe the command (or audio chunk) that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScsiError {
    pub has_scsi_error: bool,
    /// Execution-layer return code (0 when the transport itself succeeded).
    pub exec_error: u32,
    /// Raw task completion status reported by the platform.
    pub task_status: u32,
    /// Legacy one-byte SCSI status derived from `task_status`.
    pub scsi_status: u8,
    pub has_sense: bool,
    pub sense_key: u8,
    pub additional_sense_code: u8,
    pub additional_sense_code_qualifier: u8,

    pub op: ScsiOp,
    pub lba: Option<u32>,
    pub sectors: Option<u32>,
}

impl ScsiError {
    /// Human-readable ASC/ASCQ text, when sense data was present.
    pub fn sense_description(&self) -> Option<&'static str> {
        self.has_sense.then(|| {
            asc_ascq_to_str(
                self.additional_sense_code,
                self.additional_sense_code_qualifier,
            )
        })
    }
}

impl fmt::Display for ScsiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SCSI {} failed (exec=0x{:08x}, task_status=0x{:02x}, status=0x{:02x}",
            self.op, self.exec_error, self.task_status, self.scsi_status
        )?;
        if let Some(lba) = self.lba {
            write!(f, ", lba={lba}")?;
        }
        if let Some(sectors) = self.sectors {
            write!(f, ", sectors={sectors}")?;
        }
        if let Some(desc) = self.sense_description() {
            write!(
                f,
                ", sense_key=0x{:x}, asc=0x{:02x}, ascq=0x{:02x}: {desc}",
                self.sense_key,
                self.additional_sense_code,
                self.additional_sense_code_qualifier
            )?;
        }
        write!(f, ")")
    }
}

impl std::error::Error for ScsiError {}

/// Every failure the core reports to its caller.
#[derive(Debug, Error)]
pub enum CdError {
    // ── resolution ──────────────────────────────────────────────────────
    #[error("no optical media found for device {device}")]
    DeviceNotFound { device: String },
    #[error("no MMC command client above the media node of {device}")]
    NoCommandClient { device: String },
    #[error("creating the command plugin for {device} failed: 0x{code:08x}")]
    PluginInterface { device: String, code: u32 },
    #[error("{interface} interface unavailable for {device}: 0x{code:08x}")]
    InterfaceQuery {
        device: String,
        interface: &'static str,
        code: u32,
    },

    // ── acquisition ─────────────────────────────────────────────────────
    #[error("exclusive access to {device} is held by another client")]
    ExclusiveAccessBusy { device: String },
    #[error("obtaining exclusive access to {device} failed: 0x{code:08x}")]
    ExclusiveAccess { device: String, code: u32 },

    // ── session preconditions ───────────────────────────────────────────
    #[error("a session for {active} is already open (requested {requested})")]
    SessionActive { active: String, requested: String },
    #[error("no device session is open")]
    NotOpen,

    // ── input ───────────────────────────────────────────────────────────
    #[error("audio read of zero sectors requested")]
    ZeroSectors,
    #[error("{sectors} sectors of {sector_size} bytes do not fit a 32-bit byte count")]
    TransferTooLarge { sectors: u32, sector_size: u32 },
    #[error("LBA range {lba} + {sectors} sectors overflows 32 bits")]
    LbaOverflow { lba: u32, sectors: u32 },
    #[error("READ CD transfer length {sectors} outside 1..={max}")]
    InvalidTransferLength { sectors: u32, max: u32 },

    // ── command execution ───────────────────────────────────────────────
    #[error(transparent)]
    Scsi(#[from] ScsiError),

    #[error("could not allocate {bytes} bytes for the transfer buffer")]
    OutOfMemory { bytes: usize },
}

impl CdError {
    /// Input errors are raised before any device interaction.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CdError::ZeroSectors
                | CdError::TransferTooLarge { .. }
                | CdError::LbaOverflow { .. }
                | CdError::InvalidTransferLength { .. }
        )
    }

    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            CdError::DeviceNotFound { .. }
                | CdError::NoCommandClient { .. }
                | CdError::PluginInterface { .. }
                | CdError::InterfaceQuery { .. }
        )
    }

    pub fn is_acquisition_error(&self) -> bool {
        matches!(
            self,
            CdError::ExclusiveAccessBusy { .. } | CdError::ExclusiveAccess { .. }
        )
    }

    /// The command-level failure, if this is one.
    pub fn scsi(&self) -> Option<&ScsiError> {
        match self {
            CdError::Scsi(e) => Some(e),
            _ => None,
        }
    }
}
