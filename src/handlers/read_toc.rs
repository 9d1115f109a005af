// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use bytes::Bytes;
use tracing::{debug, error};

use crate::{
    control_block::{common::TOC_ALLOCATION_LEN, read_toc::build_read_toc},
    error::CdError,
    platform::ScsiExecutor,
    utils::try_alloc_zeroed,
};

/// Issue one READ TOC (format 0, from track 0) and return the whole
/// allocation-length buffer.
///
/// On any failure the buffer is dropped; nothing partial is returned.
pub fn read_toc<E: ScsiExecutor + ?Sized>(exec: &mut E) -> Result<Bytes, CdError> {
    let command = build_read_toc();
    let mut buf = try_alloc_zeroed(TOC_ALLOCATION_LEN as usize)?;

    let outcome = exec.execute(&command, &mut buf);
    outcome
        .classify(command.op, None, None)
        .inspect_err(|e| error!(%e, "READ TOC failed"))?;

    debug!(len = buf.len(), "TOC read");
    Ok(Bytes::from(buf))
}
