// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{
    error::{ScsiError, ScsiOp},
    models::{return_code::KernReturn, sense_data::SenseBuffer, status::TaskStatus},
};

/// Everything the pass-through layer reports for one executed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScsiOutcome {
    /// Result of submitting and running the task.
    pub exec: KernReturn,
    /// Completion status of the task itself.
    pub status: TaskStatus,
    pub sense: SenseBuffer,
}

impl ScsiOutcome {
    pub fn good() -> Self {
        Self {
            exec: KernReturn::SUCCESS,
            status: TaskStatus::Good,
            sense: SenseBuffer::empty(),
        }
    }

    /// A task that completed with CHECK CONDITION and the given sense bytes.
    pub fn check_condition(sense: &[u8]) -> Self {
        Self {
            exec: KernReturn::SUCCESS,
            status: TaskStatus::CheckCondition,
            sense: SenseBuffer::from_bytes(sense),
        }
    }

    /// A task the execution layer could not run at all.
    pub fn exec_failure(code: KernReturn) -> Self {
        Self {
            exec: code,
            status: TaskStatus::NoStatus,
            sense: SenseBuffer::empty(),
        }
    }

    #[inline]
    pub fn is_good(&self) -> bool {
        self.exec.is_success() && self.status.is_good()
    }

    /// Success iff execution succeeded and the task status is GOOD; any
    /// other combination becomes a [`ScsiError`] with best-effort sense
    /// decoding.
    ///
    /// Retry decisions are not made here.
    pub fn classify(
        &self,
        op: ScsiOp,
        lba: Option<u32>,
        sectors: Option<u32>,
    ) -> Result<(), ScsiError> {
        if self.is_good() {
            return Ok(());
        }
        Err(self.to_error(op, lba, sectors))
    }

    fn to_error(&self, op: ScsiOp, lba: Option<u32>, sectors: Option<u32>) -> ScsiError {
        let mut err = ScsiError {
            has_scsi_error: true,
            exec_error: self.exec.raw(),
            task_status: self.status.raw(),
            scsi_status: self.status.scsi_status(),
            has_sense: self.sense.is_present(),
            sense_key: 0,
            additional_sense_code: 0,
            additional_sense_code_qualifier: 0,
            op,
            lba,
            sectors,
        };
        if let Some(fields) = self.sense.key_fields() {
            err.sense_key = fields.sense_key;
            err.additional_sense_code = fields.asc;
            err.additional_sense_code_qualifier = fields.ascq;
        }
        err
    }
}
