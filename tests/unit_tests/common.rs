// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::fs;

use anyhow::Result;
use cdda_reader_rs::{client::session::DeviceSession, platform::sim::SimPlatform};
use hex::FromHex;

pub const DISK: &str = "disk4";

pub fn load_fixture(path: &str) -> Result<Vec<u8>> {
    let s = fs::read_to_string(path)?;
    let cleaned = s.trim().replace(|c: char| c.is_whitespace(), "");
    Ok(Vec::from_hex(&cleaned)?)
}

/// A simulated drive with a disc and a session that has not opened it yet.
pub fn sim_session() -> (SimPlatform, DeviceSession<SimPlatform>) {
    let sim = SimPlatform::cd_drive(DISK);
    let session = DeviceSession::new(sim.clone());
    (sim, session)
}
