// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use cdda_reader_rs::{
    error::ScsiOp,
    models::{
        outcome::ScsiOutcome,
        return_code::KernReturn,
        sense_data::{SenseBuffer, SenseData, SenseKey},
        status::TaskStatus,
    },
};

use crate::unit_tests::common::load_fixture;

#[test]
fn test_zero_sense_is_not_present() {
    let outcome = ScsiOutcome::check_condition(&[0u8; 18]);
    let err = outcome
        .classify(ScsiOp::ReadToc, None, None)
        .expect_err("CHECK CONDITION must fail");

    assert!(err.has_scsi_error);
    assert!(!err.has_sense);
    assert_eq!(err.sense_key, 0);
    assert_eq!(err.scsi_status, 0x02);
    assert_eq!(err.task_status, TaskStatus::CheckCondition.raw());
    assert_eq!(err.sense_description(), None);
}

#[test]
fn test_sense_fields_decoded() -> Result<()> {
    let raw = load_fixture("tests/unit_tests/fixtures/sense_lba_out_of_range.hex")?;
    let err = ScsiOutcome::check_condition(&raw)
        .classify(ScsiOp::ReadCd, Some(400_000), Some(27))
        .expect_err("CHECK CONDITION must fail");

    assert!(err.has_sense);
    assert_eq!(err.sense_key, 0x05);
    assert_eq!(err.additional_sense_code, 0x21);
    assert_eq!(err.additional_sense_code_qualifier, 0x00);
    assert_eq!(
        err.sense_description(),
        Some("Logical block address out of range")
    );
    assert_eq!((err.lba, err.sectors), (Some(400_000), Some(27)));

    let text = err.to_string();
    assert!(text.contains("READ CD"), "{text}");
    assert!(text.contains("lba=400000"), "{text}");
    Ok(())
}

#[test]
fn test_short_sense_is_zero_padded() {
    // Only bytes 0..14 present: key and ASC/ASCQ are still readable.
    let sense = SenseBuffer::from_bytes(&[
        0x70, 0, 0x02, 0, 0, 0, 0, 6, 0, 0, 0, 0, 0x3A, 0x01,
    ]);
    let fields = sense.key_fields().expect("sense must be present");
    assert_eq!((fields.sense_key, fields.asc, fields.ascq), (0x02, 0x3A, 0x01));
}

#[test]
fn test_sense_data_parse() -> Result<()> {
    let raw = load_fixture("tests/unit_tests/fixtures/sense_lba_out_of_range.hex")?;
    let sense = SenseData::parse(&raw)?;

    assert_eq!(sense.response_code, 0x70);
    assert_eq!(sense.key(), SenseKey::IllegalRequest);
    assert_eq!(sense.additional_len, 0x0A);
    assert_eq!((sense.asc, sense.ascq), (0x21, 0x00));
    assert!(SenseData::parse(&raw[..10]).is_err());
    Ok(())
}

#[test]
fn test_exec_failure_reports_exec_code() {
    let err = ScsiOutcome::exec_failure(KernReturn::NOT_RESPONDING)
        .classify(ScsiOp::ReadCd, Some(0), Some(1))
        .expect_err("exec failure must fail");

    assert_eq!(err.exec_error, 0xE000_02ED);
    assert_eq!(err.scsi_status, 0xFF);
    assert!(!err.has_sense);
}

#[test]
fn test_legacy_status_table() {
    let table = [
        (TaskStatus::Good, 0x00),
        (TaskStatus::CheckCondition, 0x02),
        (TaskStatus::Busy, 0x08),
        (TaskStatus::ReservationConflict, 0x18),
        (TaskStatus::TaskSetFull, 0x28),
        (TaskStatus::AcaActive, 0x30),
        (TaskStatus::TaskAborted, 0x40),
        (TaskStatus::DeliveryFailure, 0xFF),
        (TaskStatus::Other(0x99), 0xFF),
    ];
    for (status, byte) in table {
        assert_eq!(status.scsi_status(), byte, "{status:?}");
    }
}

#[test]
fn test_non_good_status_with_successful_exec_fails() {
    let outcome = ScsiOutcome {
        exec: KernReturn::SUCCESS,
        status: TaskStatus::Busy,
        sense: SenseBuffer::empty(),
    };
    let err = outcome
        .classify(ScsiOp::ReadToc, None, None)
        .expect_err("BUSY must fail");
    assert_eq!(err.scsi_status, 0x08);
    assert_eq!(err.exec_error, 0);
}
