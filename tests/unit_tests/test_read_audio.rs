// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use cdda_reader_rs::{
    control_block::common::READ_CD,
    error::{CdError, ScsiOp},
    handlers::read_audio::{read_audio, read_audio_with, validate_request},
    models::{outcome::ScsiOutcome, return_code::KernReturn},
    platform::sim::expected_audio,
};

use crate::unit_tests::common::{DISK, sim_session};

#[test]
fn test_chunks_cover_request_in_order() -> Result<()> {
    for (lba, sectors) in [(0u32, 1u32), (150, 27), (1000, 28), (33, 54), (7, 100)] {
        let (sim, mut session) = sim_session();
        let audio = read_audio(session.open(DISK)?, lba, sectors)?;

        assert_eq!(audio.len(), sectors as usize * 2352);
        assert_eq!(&audio[..], &expected_audio(lba, sectors)[..]);

        let commands = sim.commands();
        assert_eq!(commands.len(), sectors.div_ceil(27) as usize);

        let mut next = lba;
        for (i, cmd) in commands.iter().enumerate() {
            assert_eq!(cmd.opcode(), READ_CD);
            assert_eq!(cmd.lba, Some(next), "chunk {i} of {sectors}");
            let expected = if i + 1 == commands.len() {
                match sectors % 27 {
                    0 => 27,
                    rest => rest,
                }
            } else {
                27
            };
            assert_eq!(cmd.sectors, Some(expected));
            next += expected;
        }
        assert_eq!(next, lba + sectors);
    }
    Ok(())
}

#[test]
fn test_zero_sectors_is_input_error() -> Result<()> {
    let (sim, mut session) = sim_session();
    let err = read_audio(session.open(DISK)?, 0, 0).expect_err("zero sectors");

    assert!(matches!(err, CdError::ZeroSectors));
    assert!(err.is_input_error());
    assert!(sim.commands().is_empty());
    Ok(())
}

#[test]
fn test_oversized_request_is_input_error() -> Result<()> {
    let (sim, mut session) = sim_session();
    let err = read_audio(session.open(DISK)?, 0, u32::MAX).expect_err("too large");
    assert!(matches!(err, CdError::TransferTooLarge { .. }));

    // The first count whose byte length exceeds 32 bits.
    let limit = u32::MAX / 2352;
    assert!(validate_request(0, limit).is_ok());
    assert!(matches!(
        validate_request(0, limit + 1),
        Err(CdError::TransferTooLarge { .. })
    ));
    assert!(sim.commands().is_empty());
    Ok(())
}

#[test]
fn test_lba_overflow_is_input_error() {
    assert!(validate_request(u32::MAX, 1).is_ok());
    assert!(matches!(
        validate_request(u32::MAX, 2),
        Err(CdError::LbaOverflow { .. })
    ));
}

#[test]
fn test_failing_chunk_aborts_read() -> Result<()> {
    let (sim, mut session) = sim_session();
    sim.script_outcome(3, ScsiOutcome::exec_failure(KernReturn::NOT_RESPONDING));

    let err = read_audio(session.open(DISK)?, 100, 5 * 27).expect_err("chunk 3 fails");
    let scsi = err.scsi().expect("command error");
    assert!(scsi.has_scsi_error);
    assert_eq!(scsi.op, ScsiOp::ReadCd);
    assert_eq!(scsi.lba, Some(100 + 2 * 27));
    assert_eq!(scsi.sectors, Some(27));

    assert_eq!(sim.commands().len(), 3, "chunks 4 and 5 must not be issued");
    Ok(())
}

#[test]
fn test_smaller_command_size() -> Result<()> {
    let (sim, mut session) = sim_session();
    let audio = read_audio_with(session.open(DISK)?, 0, 10, 4)?;

    assert_eq!(&audio[..], &expected_audio(0, 10)[..]);
    let sizes: Vec<_> = sim.commands().iter().map(|c| c.sectors).collect();
    assert_eq!(sizes, vec![Some(4), Some(4), Some(2)]);

    let err = read_audio_with(session.open(DISK)?, 0, 10, 28).expect_err("28 per command");
    assert!(matches!(err, CdError::InvalidTransferLength { .. }));
    Ok(())
}

#[test]
fn test_session_read_audio_closes_after_failure() -> Result<()> {
    let (sim, mut session) = sim_session();
    sim.script_outcome(1, ScsiOutcome::exec_failure(KernReturn::ERROR));

    assert!(session.read_audio(DISK, 0, 30).is_err());
    assert!(!session.is_open());
    assert!(!sim.exclusive_held());
    assert_eq!(sim.live_interfaces(), 0);
    Ok(())
}
