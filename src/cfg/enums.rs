// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;

use serde::{Deserialize, Serialize};

/// Options for the one unmount request the mount guard issues.
///
/// `Force` unmounts even when files are open on the volume; `Whole`
/// unmounts every volume on the disk, not just the named one.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmountOption {
    #[default]
    #[serde(rename = "Default", alias = "default", alias = "DEFAULT")]
    Default,
    #[serde(rename = "Force", alias = "force", alias = "FORCE")]
    Force,
    #[serde(rename = "Whole", alias = "whole", alias = "WHOLE")]
    Whole,
}

impl fmt::Display for UnmountOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnmountOption::Default => "Default",
            UnmountOption::Force => "Force",
            UnmountOption::Whole => "Whole",
        })
    }
}

/// Where log records go.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    Stderr,
    File,
}

/// How often the log file rolls over.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RotationFrequency {
    Minutely,
    Hourly,
    Daily,
    #[default]
    Never,
}
