// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::fmt;

/// Task completion status as reported by the pass-through layer.
///
/// The numeric values follow the platform's task status enumeration: the
/// SAM status codes share their wire value, the service-delivery failures
/// sit above them, and `NoStatus` marks a task that never completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Good,
    CheckCondition,
    ConditionMet,
    Busy,
    Intermediate,
    IntermediateConditionMet,
    ReservationConflict,
    TaskSetFull,
    AcaActive,
    TaskAborted,
    TaskTimeoutOccurred,
    ProtocolTimeoutOccurred,
    DeviceNotResponding,
    DeviceNotPresent,
    DeliveryFailure,
    NoStatus,
    Other(u32),
}

impl TaskStatus {
    pub const fn raw(self) -> u32 {
        match self {
            TaskStatus::Good => 0x00,
            TaskStatus::CheckCondition => 0x02,
            TaskStatus::ConditionMet => 0x04,
            TaskStatus::Busy => 0x08,
            TaskStatus::Intermediate => 0x10,
            TaskStatus::IntermediateConditionMet => 0x14,
            TaskStatus::ReservationConflict => 0x18,
            TaskStatus::TaskSetFull => 0x28,
            TaskStatus::AcaActive => 0x30,
            TaskStatus::TaskAborted => 0x40,
            TaskStatus::TaskTimeoutOccurred => 0x01,
            TaskStatus::ProtocolTimeoutOccurred => 0x03,
            TaskStatus::DeviceNotResponding => 0x05,
            TaskStatus::DeviceNotPresent => 0x06,
            TaskStatus::DeliveryFailure => 0x07,
            TaskStatus::NoStatus => 0xFF,
            TaskStatus::Other(v) => v,
        }
    }

    /// Legacy one-byte SCSI status for this completion.
    ///
    /// Statuses without a SAM counterpart collapse to `0xFF`.
    pub const fn scsi_status(self) -> u8 {
        match self {
            TaskStatus::Good => ScsiStatus::Good.as_byte(),
            TaskStatus::CheckCondition => ScsiStatus::CheckCondition.as_byte(),
            TaskStatus::Busy => ScsiStatus::Busy.as_byte(),
            TaskStatus::ReservationConflict => ScsiStatus::ReservationConflict.as_byte(),
            TaskStatus::TaskSetFull => ScsiStatus::TaskSetFull.as_byte(),
            TaskStatus::AcaActive => ScsiStatus::AcaActive.as_byte(),
            TaskStatus::TaskAborted => ScsiStatus::TaskAborted.as_byte(),
            _ => ScsiStatus::UNKNOWN,
        }
    }

    #[inline]
    pub fn is_good(self) -> bool {
        self == TaskStatus::Good
    }
}

impl From<u32> for TaskStatus {
    fn from(v: u32) -> Self {
        match v {
            0x00 => TaskStatus::Good,
            0x01 => TaskStatus::TaskTimeoutOccurred,
            0x02 => TaskStatus::CheckCondition,
            0x03 => TaskStatus::ProtocolTimeoutOccurred,
            0x04 => TaskStatus::ConditionMet,
            0x05 => TaskStatus::DeviceNotResponding,
            0x06 => TaskStatus::DeviceNotPresent,
            0x07 => TaskStatus::DeliveryFailure,
            0x08 => TaskStatus::Busy,
            0x10 => TaskStatus::Intermediate,
            0x14 => TaskStatus::IntermediateConditionMet,
            0x18 => TaskStatus::ReservationConflict,
            0x28 => TaskStatus::TaskSetFull,
            0x30 => TaskStatus::AcaActive,
            0x40 => TaskStatus::TaskAborted,
            0xFF => TaskStatus::NoStatus,
            other => TaskStatus::Other(other),
        }
    }
}

impl From<TaskStatus> for u32 {
    fn from(s: TaskStatus) -> Self {
        s.raw()
    }
}

/// SAM status byte (SAM-5 § 5.3).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScsiStatus {
    Good = 0x00,
    CheckCondition = 0x02,
    Busy = 0x08,
    ReservationConflict = 0x18,
    TaskSetFull = 0x28,
    AcaActive = 0x30,
    TaskAborted = 0x40,
}

impl ScsiStatus {
    /// Status byte reported for completions without a SAM equivalent.
    pub const UNKNOWN: u8 = 0xFF;

    #[inline]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}(0x{:02x})", self.raw())
    }
}
