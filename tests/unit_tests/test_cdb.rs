// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use cdda_reader_rs::{
    control_block::{
        common::{CDDA_SECTOR_SIZE, DataDirection, READ_CD, READ_TOC},
        read_cd::{ReadCdFields, build_read_cd},
        read_toc::build_read_toc,
    },
    error::{CdError, ScsiOp},
};
use hex_literal::hex;

use crate::unit_tests::common::load_fixture;

#[test]
fn test_read_toc_cdb() -> Result<()> {
    let expected = load_fixture("tests/unit_tests/fixtures/read_toc_cdb.hex")?;
    let cmd = build_read_toc();

    assert_eq!(cmd.cdb(), &expected[..], "READ TOC CDB mismatch");
    assert_eq!(cmd.opcode(), READ_TOC);
    assert_eq!(cmd.direction, DataDirection::FromDevice);
    assert_eq!(cmd.transfer_len, 2048);
    assert_eq!(cmd.op, ScsiOp::ReadToc);
    assert_eq!(cmd.lba, None);
    Ok(())
}

#[test]
fn test_read_cd_cdb() -> Result<()> {
    let expected = load_fixture("tests/unit_tests/fixtures/read_cd_cdb.hex")?;
    let cmd = build_read_cd(0x1234, 27)?;

    assert_eq!(cmd.cdb(), &expected[..], "READ CD CDB mismatch");
    assert_eq!(cmd.opcode(), READ_CD);
    assert_eq!(cmd.cdb()[9], ReadCdFields::USER_DATA.bits());
    assert_eq!(cmd.direction, DataDirection::FromDevice);
    assert_eq!(cmd.transfer_len, 27 * CDDA_SECTOR_SIZE);
    assert_eq!((cmd.lba, cmd.sectors), (Some(0x1234), Some(27)));
    Ok(())
}

#[test]
fn test_read_cd_address_is_big_endian() -> Result<()> {
    let cmd = build_read_cd(0xA1B2_C3D4, 1)?;
    assert_eq!(&cmd.cdb()[2..9], &hex!("a1b2c3d4 000001"));
    Ok(())
}

#[test]
fn test_read_cd_rejects_out_of_range_lengths() {
    for sectors in [0u32, 28, 1 << 24] {
        let err = build_read_cd(0, sectors).expect_err("length must be rejected");
        assert!(
            matches!(err, CdError::InvalidTransferLength { max: 27, .. }),
            "unexpected error for {sectors}: {err:?}"
        );
        assert!(err.is_input_error());
    }
}
