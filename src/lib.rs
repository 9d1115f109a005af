//! This crate gives an application exclusive SCSI/MMC access to an optical
//! drive so it can read the Table of Contents and raw CD-DA sectors.
// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// Handles configuration, config-path resolution, and logging.
pub mod cfg;
/// Device resolution, the exclusive device session, and the mount guard.
pub mod client;
/// Builders for the MMC command descriptor blocks (READ TOC, READ CD).
pub mod control_block;
/// Error model shared by every layer.
pub mod error;
/// TOC and audio readers built on top of an open device handle.
pub mod handlers;
/// Sense data, task status, and command outcome decoding.
pub mod models;
/// Capability traits for the OS services the core drives, plus an in-memory
/// implementation.
pub mod platform;
/// Provides utility functions used throughout the crate.
pub mod utils;
