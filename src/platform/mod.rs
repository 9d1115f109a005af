// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Seams to the operating-system services the core drives: the device
//! directory, the command plugin chain down to the SCSI task device, and
//! mount arbitration.
//!
//! Each acquired interface releases itself on `Drop`; exclusive access is
//! the one resource released explicitly, and the session wraps it in its
//! own guard.

use std::fmt;

use tokio::sync::oneshot;

use crate::{
    cfg::enums::UnmountOption,
    control_block::common::Command,
    models::{outcome::ScsiOutcome, return_code::KernReturn},
};

/// In-memory implementation of every capability.
pub mod sim;

/// Runs one command against the device and reports how it completed.
///
/// `data` is exactly the region the data phase reads into or writes from.
pub trait ScsiExecutor {
    fn execute(&mut self, command: &Command, data: &mut [u8]) -> ScsiOutcome;
}

/// The task-device interface: the only place commands can be issued, and
/// only while exclusive access is held.
pub trait TaskDevice: ScsiExecutor {
    fn obtain_exclusive_access(&mut self) -> KernReturn;
    fn release_exclusive_access(&mut self);
}

/// The MMC command interface queried from a command plugin.
pub trait MmcInterface {
    type Device: TaskDevice;

    fn task_device(&mut self) -> Option<Self::Device>;
}

/// The plugin interface created for a service that vends the MMC client.
pub trait CommandPlugin {
    type Mmc: MmcInterface;

    fn query_mmc(&mut self) -> Result<Self::Mmc, KernReturn>;
}

/// Hierarchical view of the platform's device services.
pub trait DeviceDirectory {
    /// Reference to one service node; cheap to clone.
    type Node: Clone + fmt::Debug;
    type Plugin: CommandPlugin;

    /// Services whose block-device name matches `device_name`.
    fn matching_services(&self, device_name: &str) -> Vec<Self::Node>;

    /// Whether the node is (or conforms to) optical media.
    fn is_optical_media(&self, node: &Self::Node) -> bool;

    /// First parent of `node`, `None` at the root.
    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Whether the node lists the SCSI/MMC command client among its plugin
    /// types.
    fn advertises_command_client(&self, node: &Self::Node) -> bool;

    fn create_plugin(&self, node: &Self::Node) -> Result<Self::Plugin, KernReturn>;
}

pub type PluginOf<D> = <D as DeviceDirectory>::Plugin;
pub type MmcOf<D> = <PluginOf<D> as CommandPlugin>::Mmc;
pub type TaskDeviceOf<D> = <MmcOf<D> as MmcInterface>::Device;

/// Answer of a mount-approval callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approval {
    Allow,
    Deny { reason: &'static str },
}

/// Mount-approval callback; receives the resolved block-device name of the
/// disk about to be mounted.
pub type MountApprovalFn = Box<dyn Fn(&str) -> Approval + Send + Sync>;

/// Registration handle for a mount-approval callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(pub u64);

/// Completion of an unmount request; `Err` carries the dissent status.
pub type UnmountResult = Result<(), KernReturn>;

/// Mount arbitration service.
pub trait MountArbiter {
    type Session: ArbitrationSession;

    /// Open a monitoring session; `None` when the service is unavailable.
    fn create_session(&self) -> Option<Self::Session>;
}

/// A live monitoring session. Dropping it stops event delivery and releases
/// the session.
pub trait ArbitrationSession {
    fn register_mount_approval(&mut self, approval: MountApprovalFn) -> CallbackId;

    fn unregister(&mut self, id: CallbackId);

    /// Request an unmount of `device_path`; completion is delivered through
    /// `done`. Fails when no disk object exists for the path.
    fn unmount(
        &mut self,
        device_path: &str,
        option: UnmountOption,
        done: oneshot::Sender<UnmountResult>,
    ) -> Result<(), KernReturn>;
}
