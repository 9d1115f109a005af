// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::{
    cfg::enums::UnmountOption, control_block::common::MAX_SECTORS_PER_COMMAND,
};

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// The drive to take over.
    #[serde(rename = "Device")]
    pub device: DeviceConfig,
    /// Bounds for resolving the device name to its command client.
    #[serde(rename = "Session", default)]
    pub session: SessionConfig,
    /// Mount guard behaviour.
    #[serde(rename = "Guard", default)]
    pub guard: GuardConfig,
    /// Audio read chunking and retry policy.
    #[serde(rename = "Reader", default)]
    pub reader: ReaderConfig,
}

/// Identity of the drive.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DeviceConfig {
    #[serde(rename = "Name")]
    /// Block-device name, e.g. `disk4`. A leading `/dev/` is accepted and
    /// stripped.
    pub name: String,
}

/// Search bounds used while walking the device tree.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    #[serde(rename = "MediaSearchDepth")]
    /// Parent links followed from a matched service to optical media.
    pub media_search_depth: usize,
    #[serde(rename = "ClientSearchDepth")]
    /// Parent links followed from the media to the MMC command client.
    pub client_search_depth: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            media_search_depth: 10,
            client_search_depth: 32,
        }
    }
}

/// Mount guard settings. The initial unmount is not forced unless
/// `UnmountOption: Force` is set.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct GuardConfig {
    #[serde(rename = "Enabled")]
    /// When false, [`MountGuard::start`](crate::client::guard::MountGuard::start)
    /// installs nothing.
    pub enabled: bool,
    #[serde(rename = "UnmountTimeout", with = "serde_secs")]
    /// Upper bound on the wait for the initial unmount.
    pub unmount_timeout: Duration,
    #[serde(rename = "UnmountOption")]
    pub unmount_option: UnmountOption,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            unmount_timeout: Duration::from_secs(30),
            unmount_option: UnmountOption::Default,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ReaderConfig {
    #[serde(rename = "MaxSectorsPerCommand")]
    /// Sectors per READ CD command (1..=27).
    pub max_sectors_per_command: u32,
    #[serde(rename = "Retry")]
    /// Retry policy of the streaming reader.
    pub retry: RetryConfig,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_sectors_per_command: MAX_SECTORS_PER_COMMAND,
            retry: RetryConfig::default(),
        }
    }
}

/// Per-chunk retry policy for streamed audio reads.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    #[serde(rename = "MaxAttempts")]
    /// Attempts per chunk, the first one included.
    pub max_attempts: u8,
    #[serde(rename = "InitialBackoffMs", with = "serde_millis")]
    pub initial_backoff: Duration,
    #[serde(rename = "MaxBackoffMs", with = "serde_millis")]
    pub max_backoff: Duration,
    #[serde(rename = "ReduceChunkOnRetry")]
    /// Halve the chunk after each failed attempt.
    pub reduce_chunk_on_retry: bool,
    #[serde(rename = "MinSectorsPerRead")]
    /// Floor for the halved chunk.
    pub min_sectors_per_read: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(300),
            reduce_chunk_on_retry: true,
            min_sectors_per_read: 1,
        }
    }
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let s = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml(&s)
    }

    pub fn from_yaml(s: &str) -> Result<Self> {
        let mut cfg: Config =
            serde_yaml::from_str(s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants and normalizes derived fields.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        if let Some(stripped) = self.device.name.strip_prefix("/dev/") {
            self.device.name = stripped.to_string();
        }
        ensure!(!self.device.name.is_empty(), "Device.Name must not be empty");
        ensure!(
            !self.device.name.contains('/'),
            "Device.Name must be a bare block-device name, got {:?}",
            self.device.name
        );

        ensure!(
            self.session.media_search_depth >= 1,
            "MediaSearchDepth must be >= 1"
        );
        ensure!(
            self.session.client_search_depth >= 1,
            "ClientSearchDepth must be >= 1"
        );

        let max = self.reader.max_sectors_per_command;
        ensure!(
            (1..=MAX_SECTORS_PER_COMMAND).contains(&max),
            "MaxSectorsPerCommand must be in 1..={MAX_SECTORS_PER_COMMAND}, got {max}"
        );

        let retry = &mut self.reader.retry;
        ensure!(retry.max_attempts >= 1, "MaxAttempts must be >= 1");
        ensure!(
            retry.min_sectors_per_read >= 1,
            "MinSectorsPerRead must be >= 1"
        );
        // The floor can never exceed what a single command may carry.
        retry.min_sectors_per_read = retry.min_sectors_per_read.min(max);
        if retry.max_backoff < retry.initial_backoff {
            retry.max_backoff = retry.initial_backoff;
        }

        Ok(())
    }
}

/// Serde helpers for representing `Duration` as a number of seconds.
mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

/// Same, in milliseconds.
mod serde_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
