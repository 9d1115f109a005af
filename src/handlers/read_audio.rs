// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use bytes::Bytes;
use tracing::{debug, error};

use crate::{
    control_block::{
        common::{CDDA_SECTOR_SIZE, MAX_SECTORS_PER_COMMAND},
        read_cd::build_read_cd,
    },
    error::CdError,
    platform::ScsiExecutor,
    utils::{plan_chunks, try_alloc_zeroed},
};

/// Check an audio request before touching the device and return its total
/// byte length.
///
/// Rejects zero sectors, byte counts that do not fit 32 bits, and ranges
/// whose last LBA would overflow.
pub fn validate_request(lba: u32, sectors: u32) -> Result<usize, CdError> {
    if sectors == 0 {
        return Err(CdError::ZeroSectors);
    }

    let total = u64::from(sectors) * u64::from(CDDA_SECTOR_SIZE);
    if total > u64::from(u32::MAX) {
        return Err(CdError::TransferTooLarge {
            sectors,
            sector_size: CDDA_SECTOR_SIZE,
        });
    }

    if lba.checked_add(sectors - 1).is_none() {
        return Err(CdError::LbaOverflow { lba, sectors });
    }

    Ok(total as usize)
}

/// Read `sectors` raw CD-DA sectors starting at `lba`.
///
/// Returns exactly `sectors * 2352` bytes or an error; see
/// [`read_audio_with`].
pub fn read_audio<E: ScsiExecutor + ?Sized>(
    exec: &mut E,
    lba: u32,
    sectors: u32,
) -> Result<Bytes, CdError> {
    read_audio_with(exec, lba, sectors, MAX_SECTORS_PER_COMMAND)
}

/// Read audio in sequential READ CD commands of at most `max_per_command`
/// sectors, each filling its own slice of one destination buffer.
///
/// The first failing chunk aborts the read; later chunks are never issued
/// and the buffer is dropped.
pub fn read_audio_with<E: ScsiExecutor + ?Sized>(
    exec: &mut E,
    lba: u32,
    sectors: u32,
    max_per_command: u32,
) -> Result<Bytes, CdError> {
    let total = validate_request(lba, sectors)?;
    if !(1..=MAX_SECTORS_PER_COMMAND).contains(&max_per_command) {
        return Err(CdError::InvalidTransferLength {
            sectors: max_per_command,
            max: MAX_SECTORS_PER_COMMAND,
        });
    }

    let mut buf = try_alloc_zeroed(total)?;

    for chunk in plan_chunks(lba, sectors, max_per_command) {
        let command = build_read_cd(chunk.lba, chunk.sectors)?;
        let outcome = exec.execute(&command, &mut buf[chunk.byte_range()]);
        outcome
            .classify(command.op, command.lba, command.sectors)
            .inspect_err(|e| error!(chunk = chunk.index, %e, "audio chunk failed"))?;
    }

    debug!(lba, sectors, bytes = total, "audio read");
    Ok(Bytes::from(buf))
}
