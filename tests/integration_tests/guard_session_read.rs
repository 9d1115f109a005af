// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Context, Result};
use cdda_reader_rs::{
    cfg::{enums::UnmountOption, logger::init_logger},
    client::session::DeviceSession,
    handlers::{read_audio::read_audio, read_toc::read_toc, stream::AudioStream},
    platform::{
        Approval,
        sim::{DEFAULT_TOC, expected_audio},
    },
};
use serial_test::serial;

use crate::integration_tests::common::{load_config, sim_stack, test_path};

/// guard -> open -> READ TOC -> audio (buffer + stream) -> close -> unguard
#[tokio::test]
#[serial]
async fn guard_open_read_close() -> Result<()> {
    let _ = init_logger(&test_path());

    let cfg = load_config()?;
    let name = cfg.device.name.clone();
    let (sim, mut guard, mut session) = sim_stack(&cfg);

    // --- guard ---
    assert!(cfg.guard.enabled);
    guard.start(&name).await;
    assert!(guard.is_active());
    assert!(!sim.is_mounted(&name));
    assert_eq!(sim.unmount_requests(), vec![(name.clone(), UnmountOption::Force)]);

    // --- session ---
    let handle = session.open(&name).context("open failed")?;

    let toc = read_toc(&mut *handle).context("READ TOC failed")?;
    assert_eq!(&toc[..DEFAULT_TOC.len()], &DEFAULT_TOC[..]);

    let audio = read_audio(&mut *handle, 150, 75).context("audio read failed")?;
    assert_eq!(audio.len(), 75 * 2352);
    assert_eq!(&audio[..], &expected_audio(150, 75)[..]);

    let mut stream = AudioStream::new(&mut *handle, 225, 40, &cfg.reader)?;
    let mut streamed = Vec::new();
    while let Some(chunk) = stream.next_chunk()? {
        streamed.extend_from_slice(&chunk);
    }
    assert_eq!(streamed, expected_audio(225, 40));

    // A remount attempt while we hold the drive is refused.
    assert!(matches!(sim.request_mount(&name), Approval::Deny { .. }));

    // --- teardown ---
    session.close();
    guard.stop();

    assert!(!sim.exclusive_held());
    assert_eq!(sim.live_interfaces(), 0);
    assert_eq!(sim.registered_callbacks(), 0);
    assert_eq!(sim.live_sessions(), 0);
    assert_eq!(sim.request_mount(&name), Approval::Allow);
    Ok(())
}

/// A second process-level session on the same drive is rejected while the
/// first one holds it, and succeeds once it is released.
#[tokio::test]
#[serial]
async fn second_session_waits_for_release() -> Result<()> {
    let _ = init_logger(&test_path());

    let cfg = load_config()?;
    let name = cfg.device.name.clone();
    let (sim, mut guard, mut session) = sim_stack(&cfg);

    guard.start(&name).await;
    session.open(&name)?;

    let mut intruder = DeviceSession::new(sim.clone());
    let err = intruder.read_toc(&name).expect_err("drive is held");
    assert!(err.is_acquisition_error());

    session.close();
    let toc = intruder.read_toc(&name)?;
    assert_eq!(toc.len(), 2048);
    assert!(!intruder.is_open());

    guard.stop();
    assert_eq!(sim.live_interfaces(), 0);
    Ok(())
}
