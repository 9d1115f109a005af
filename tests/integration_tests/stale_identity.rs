// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use cdda_reader_rs::{
    cfg::logger::init_logger, error::CdError, models::return_code::KernReturn,
};
use serial_test::serial;

use crate::integration_tests::common::{load_config, sim_stack, test_path};

/// The drive's service is revoked between two reads: the cached identity
/// fails once, is resolved again, and the read goes through.
#[tokio::test]
#[serial]
async fn reread_after_service_churn() -> Result<()> {
    let _ = init_logger(&test_path());

    let cfg = load_config()?;
    let name = cfg.device.name.clone();
    let (sim, mut guard, mut session) = sim_stack(&cfg);

    guard.start(&name).await;

    session.resolve(&name)?;
    session.open(&name)?;
    session.read_audio(&name, 0, 27)?;
    assert_eq!(sim.resolutions(), 1);

    // Close drops the cached identity; cache it again, then revoke the
    // service once.
    session.close();
    session.resolve(&name)?;
    sim.fail_plugin_creation(1, KernReturn::NOT_RESPONDING);

    let audio = session.read_audio(&name, 27, 27)?;
    assert_eq!(audio.len(), 27 * 2352);
    assert_eq!(sim.resolutions(), 3);

    // Two failures in a row are terminal.
    session.resolve(&name)?;
    sim.fail_plugin_creation(2, KernReturn::NOT_RESPONDING);
    let err = session.read_audio(&name, 0, 1).expect_err("service gone");
    assert!(matches!(err, CdError::PluginInterface { .. }));
    assert_eq!(sim.resolutions(), 5);

    guard.stop();
    assert_eq!(sim.live_interfaces(), 0);
    assert!(!sim.exclusive_held());
    Ok(())
}
