// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use cdda_reader_rs::{
    cfg::{config::GuardConfig, enums::UnmountOption},
    client::guard::MountGuard,
    models::return_code::KernReturn,
    platform::{
        Approval,
        sim::{SimPlatform, UnmountBehavior},
    },
};

use crate::unit_tests::common::DISK;

#[tokio::test]
async fn test_start_then_stop_leaves_no_interceptor() {
    let sim = SimPlatform::cd_drive(DISK);
    let mut guard = MountGuard::new(sim.clone());

    guard.start(DISK).await;
    assert!(guard.is_active());
    assert_eq!(sim.registered_callbacks(), 1);
    guard.stop();

    assert!(!guard.is_active());
    assert_eq!(sim.registered_callbacks(), 0);
    assert_eq!(sim.live_sessions(), 0);
    assert_eq!(sim.request_mount(DISK), Approval::Allow);
    assert!(sim.is_mounted(DISK));
}

#[tokio::test]
async fn test_active_guard_vetoes_only_target() {
    let sim = SimPlatform::cd_drive(DISK);
    let mut guard = MountGuard::new(sim.clone());

    guard.start("/dev/disk4").await;
    assert_eq!(guard.target(), Some(DISK));
    assert!(!sim.is_mounted(DISK), "initial unmount must have completed");
    assert_eq!(
        sim.unmount_requests(),
        vec![(DISK.to_string(), UnmountOption::Default)]
    );

    assert!(matches!(sim.request_mount(DISK), Approval::Deny { .. }));
    assert!(!sim.is_mounted(DISK));
    assert_eq!(sim.request_mount("disk5"), Approval::Allow);
}

#[tokio::test]
async fn test_stop_without_start_is_noop() {
    let sim = SimPlatform::cd_drive(DISK);
    let mut guard = MountGuard::new(sim.clone());

    guard.stop();
    guard.stop();
    assert!(!guard.is_active());
    assert_eq!(sim.live_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unmount_timeout_is_not_fatal() {
    let sim = SimPlatform::cd_drive(DISK);
    sim.set_unmount_behavior(UnmountBehavior::Never);
    let mut guard = MountGuard::new(sim.clone());

    let started = tokio::time::Instant::now();
    guard.start(DISK).await;

    assert!(started.elapsed() >= Duration::from_secs(30));
    assert!(guard.is_active());
    assert!(matches!(sim.request_mount(DISK), Approval::Deny { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_waits_for_slow_unmount() {
    let sim = SimPlatform::cd_drive(DISK);
    sim.set_unmount_behavior(UnmountBehavior::Delay(Duration::from_secs(5)));
    let mut guard = MountGuard::new(sim.clone());

    let started = tokio::time::Instant::now();
    guard.start(DISK).await;

    let waited = started.elapsed();
    assert!(waited >= Duration::from_secs(5) && waited < Duration::from_secs(30));
    assert!(!sim.is_mounted(DISK));
}

#[tokio::test]
async fn test_dissent_and_unknown_device_still_guard() {
    let sim = SimPlatform::cd_drive(DISK);
    sim.set_unmount_behavior(UnmountBehavior::Dissent(KernReturn::BUSY));
    let mut guard = MountGuard::new(sim.clone());

    guard.start(DISK).await;
    assert!(guard.is_active());
    assert!(sim.is_mounted(DISK));

    guard.start("disk9").await;
    assert_eq!(guard.target(), Some("disk9"));
    assert_eq!(sim.registered_callbacks(), 1, "restart replaces the interceptor");
    assert_eq!(sim.live_sessions(), 1);
}

#[tokio::test]
async fn test_unavailable_arbitration_installs_nothing() {
    let sim = SimPlatform::cd_drive(DISK);
    sim.make_arbitration_unavailable();
    let mut guard = MountGuard::new(sim.clone());

    guard.start(DISK).await;
    assert!(!guard.is_active());
    assert!(sim.unmount_requests().is_empty());
}

#[tokio::test]
async fn test_configured_option_and_drop() {
    let sim = SimPlatform::cd_drive(DISK);
    let config = GuardConfig {
        unmount_option: UnmountOption::Whole,
        ..GuardConfig::default()
    };

    {
        let mut guard = MountGuard::with_config(sim.clone(), config);
        guard.start(DISK).await;
        assert_eq!(sim.unmount_requests()[0].1, UnmountOption::Whole);
    }

    assert_eq!(sim.registered_callbacks(), 0);
    assert_eq!(sim.live_sessions(), 0);
}

#[tokio::test]
async fn test_disabled_guard_installs_nothing() {
    let sim = SimPlatform::cd_drive(DISK);
    let config = GuardConfig {
        enabled: false,
        ..GuardConfig::default()
    };
    let mut guard = MountGuard::with_config(sim.clone(), config);

    guard.start(DISK).await;
    assert!(!guard.is_active());
    assert_eq!(sim.registered_callbacks(), 0);
    assert_eq!(sim.live_sessions(), 0);
    assert!(sim.unmount_requests().is_empty());
    assert!(sim.is_mounted(DISK));
}
