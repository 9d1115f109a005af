// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::{
    cfg::config::{ReaderConfig, SessionConfig},
    client::resolve::{DeviceIdentity, resolve},
    control_block::common::Command,
    error::CdError,
    handlers::{read_audio::read_audio_with, read_toc::read_toc},
    models::{outcome::ScsiOutcome, return_code::KernReturn},
    platform::{
        CommandPlugin, DeviceDirectory, MmcInterface, MmcOf, PluginOf, ScsiExecutor,
        TaskDevice, TaskDeviceOf,
    },
};

/// A task device whose exclusive-access lock is held for as long as this
/// value lives.
pub struct ExclusiveDevice<T: TaskDevice> {
    inner: T,
}

impl<T: TaskDevice> ExclusiveDevice<T> {
    /// Take the lock; on failure the device is dropped and the code returned.
    pub fn obtain(mut inner: T) -> Result<Self, KernReturn> {
        inner.obtain_exclusive_access().into_result()?;
        Ok(Self { inner })
    }
}

impl<T: TaskDevice> Drop for ExclusiveDevice<T> {
    fn drop(&mut self) {
        self.inner.release_exclusive_access();
    }
}

/// An open, exclusively claimed command interface to one drive.
///
/// Fields drop in declaration order: exclusive access is released first,
/// then the MMC interface, then the plugin.
pub struct DeviceHandle<D: DeviceDirectory> {
    device: ExclusiveDevice<TaskDeviceOf<D>>,
    _mmc: MmcOf<D>,
    _plugin: PluginOf<D>,
    device_name: String,
    serial: u64,
}

impl<D: DeviceDirectory> DeviceHandle<D> {
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Distinguishes successive opens within one session.
    pub fn serial(&self) -> u64 {
        self.serial
    }
}

impl<D: DeviceDirectory> ScsiExecutor for DeviceHandle<D> {
    fn execute(&mut self, command: &Command, data: &mut [u8]) -> ScsiOutcome {
        self.device.inner.execute(command, data)
    }
}

/// Owner of the single device handle and the cached device identity.
///
/// Opening is idempotent for the same device; asking for a different device
/// while one is open is rejected. The kernel lock makes a second session on
/// the same drive fail with [`CdError::ExclusiveAccessBusy`].
pub struct DeviceSession<D: DeviceDirectory> {
    directory: D,
    bounds: SessionConfig,
    reader: ReaderConfig,
    identity: Option<DeviceIdentity<D::Node>>,
    handle: Option<DeviceHandle<D>>,
    opens: u64,
}

fn bare_name(device_name: &str) -> &str {
    device_name.strip_prefix("/dev/").unwrap_or(device_name)
}

impl<D: DeviceDirectory> DeviceSession<D> {
    pub fn new(directory: D) -> Self {
        Self::with_config(directory, SessionConfig::default(), ReaderConfig::default())
    }

    pub fn with_config(directory: D, bounds: SessionConfig, reader: ReaderConfig) -> Self {
        Self {
            directory,
            bounds,
            reader,
            identity: None,
            handle: None,
            opens: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    pub fn cached_identity(&self) -> Option<&DeviceIdentity<D::Node>> {
        self.identity.as_ref()
    }

    /// Resolve `device_name` and cache the identity for later opens.
    pub fn resolve(&mut self, device_name: &str) -> Result<&DeviceIdentity<D::Node>, CdError> {
        let identity = resolve(&self.directory, bare_name(device_name), &self.bounds)?;
        Ok(self.identity.insert(identity))
    }

    /// The open handle.
    pub fn handle(&mut self) -> Result<&mut DeviceHandle<D>, CdError> {
        self.handle.as_mut().ok_or(CdError::NotOpen)
    }

    /// Open `device_name`, or return the handle already open for it.
    pub fn open(&mut self, device_name: &str) -> Result<&mut DeviceHandle<D>, CdError> {
        let device_name = bare_name(device_name);

        if let Some(active) = &self.handle {
            if active.device_name != device_name {
                return Err(CdError::SessionActive {
                    active: active.device_name.clone(),
                    requested: device_name.to_string(),
                });
            }
            debug!(device = device_name, "device already open");
        } else {
            let mut handle = self.acquire_with_retry(device_name)?;
            self.opens += 1;
            handle.serial = self.opens;
            info!(device = device_name, serial = handle.serial, "device session open");
            self.handle = Some(handle);
        }

        self.handle()
    }

    /// Release exclusive access and every interface, and forget the cached
    /// identity. Nothing happens when no handle is open.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            info!(device = handle.device_name, "device session closed");
        }
        self.identity = None;
    }

    /// READ TOC through the open handle, or through one opened for this
    /// call and closed afterwards.
    pub fn read_toc(&mut self, device_name: &str) -> Result<Bytes, CdError> {
        self.with_handle(device_name, read_toc)
    }

    /// Audio read through the open handle, or through one opened for this
    /// call and closed afterwards. Commands carry at most
    /// `reader.max_sectors_per_command` sectors each.
    pub fn read_audio(
        &mut self,
        device_name: &str,
        lba: u32,
        sectors: u32,
    ) -> Result<Bytes, CdError> {
        let max_per_command = self.reader.max_sectors_per_command;
        self.with_handle(device_name, |h| read_audio_with(h, lba, sectors, max_per_command))
    }

    fn with_handle<T>(
        &mut self,
        device_name: &str,
        f: impl FnOnce(&mut DeviceHandle<D>) -> Result<T, CdError>,
    ) -> Result<T, CdError> {
        let transient = !self.is_open();
        let result = f(self.open(device_name)?);
        if transient {
            self.close();
        }
        result
    }

    /// Open with the cached identity when there is one. A plugin failure on
    /// a cached identity means the service went stale: drop it, resolve
    /// again, and try exactly once more.
    fn acquire_with_retry(&mut self, device_name: &str) -> Result<DeviceHandle<D>, CdError> {
        let cached = self
            .identity
            .as_ref()
            .filter(|id| id.device_name == device_name)
            .map(|id| id.service.clone());
        let used_cache = cached.is_some();

        let service = match cached {
            Some(service) => service,
            None => self.resolve(device_name)?.service.clone(),
        };

        match self.acquire(device_name, &service) {
            Err(CdError::PluginInterface { code, .. }) if used_cache => {
                warn!(
                    device = device_name,
                    code = %KernReturn(code),
                    "plugin creation failed on cached identity, resolving again"
                );
                self.identity = None;
                let service = self.resolve(device_name)?.service.clone();
                self.acquire(device_name, &service)
            },
            other => other,
        }
    }

    fn acquire(&self, device_name: &str, service: &D::Node) -> Result<DeviceHandle<D>, CdError> {
        let device = || device_name.to_string();

        let mut plugin = self.directory.create_plugin(service).map_err(|code| {
            CdError::PluginInterface {
                device: device(),
                code: code.raw(),
            }
        })?;

        let mut mmc = plugin.query_mmc().map_err(|code| CdError::InterfaceQuery {
            device: device(),
            interface: "MMC",
            code: code.raw(),
        })?;

        let task_device = mmc.task_device().ok_or_else(|| CdError::InterfaceQuery {
            device: device(),
            interface: "SCSI task device",
            code: KernReturn::UNSUPPORTED.raw(),
        })?;

        let exclusive = ExclusiveDevice::obtain(task_device).map_err(|code| {
            if code == KernReturn::BUSY {
                CdError::ExclusiveAccessBusy { device: device() }
            } else {
                CdError::ExclusiveAccess {
                    device: device(),
                    code: code.raw(),
                }
            }
        })?;

        Ok(DeviceHandle {
            device: exclusive,
            _mmc: mmc,
            _plugin: plugin,
            device_name: device(),
            serial: 0,
        })
    }
}

impl<D: DeviceDirectory> Drop for DeviceSession<D> {
    fn drop(&mut self) {
        self.close();
    }
}
