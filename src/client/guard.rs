// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use tokio::{sync::oneshot, time::timeout};
use tracing::{debug, info, warn};

use crate::{
    cfg::config::GuardConfig,
    platform::{Approval, ArbitrationSession, CallbackId, MountArbiter},
};

struct GuardState<S: ArbitrationSession> {
    target: Arc<str>,
    callback: CallbackId,
    session: S,
}

/// Keeps the OS from mounting one disc while the core owns the drive.
///
/// While active, every mount request for the target device is denied.
/// Dropping the guard stops it.
pub struct MountGuard<A: MountArbiter> {
    arbiter: A,
    config: GuardConfig,
    state: Option<GuardState<A::Session>>,
}

impl<A: MountArbiter> MountGuard<A> {
    pub fn new(arbiter: A) -> Self {
        Self::with_config(arbiter, GuardConfig::default())
    }

    pub fn with_config(arbiter: A, config: GuardConfig) -> Self {
        Self {
            arbiter,
            config,
            state: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// Device currently guarded.
    pub fn target(&self) -> Option<&str> {
        self.state.as_ref().map(|s| &*s.target)
    }

    /// Install the mount veto for `device_name` and unmount it once.
    ///
    /// Waits for the unmount for at most `config.unmount_timeout`. Neither a
    /// timeout nor a dissent is an error: exclusive access decides whether
    /// the drive is really free. If no arbitration session can be created,
    /// or the guard is disabled in its config, the guard stays inactive.
    pub async fn start(&mut self, device_name: &str) {
        self.stop();

        let target: Arc<str> =
            Arc::from(device_name.strip_prefix("/dev/").unwrap_or(device_name));

        if !self.config.enabled {
            debug!(device = %target, "mount guard disabled, not installed");
            return;
        }

        let Some(mut session) = self.arbiter.create_session() else {
            warn!(device = %target, "mount arbitration unavailable, guard not installed");
            return;
        };

        let denied = Arc::clone(&target);
        let callback = session.register_mount_approval(Box::new(move |bsd_name: &str| {
            if bsd_name == &*denied {
                Approval::Deny {
                    reason: "device is held for raw audio extraction",
                }
            } else {
                Approval::Allow
            }
        }));
        info!(device = %target, "mount guard installed");

        let (tx, rx) = oneshot::channel();
        let path = format!("/dev/{target}");
        match session.unmount(&path, self.config.unmount_option, tx) {
            Ok(()) => match timeout(self.config.unmount_timeout, rx).await {
                Ok(Ok(Ok(()))) => debug!(device = %target, "unmount completed"),
                Ok(Ok(Err(code))) => {
                    warn!(device = %target, %code, "unmount dissented")
                },
                Ok(Err(_)) => {
                    warn!(device = %target, "unmount completion dropped")
                },
                Err(_) => warn!(
                    device = %target,
                    timeout = ?self.config.unmount_timeout,
                    "unmount did not complete in time, continuing"
                ),
            },
            Err(code) => warn!(device = %target, %code, "unmount request rejected"),
        }

        self.state = Some(GuardState {
            target,
            callback,
            session,
        });
    }

    /// Remove the mount veto and release the arbitration session. A no-op
    /// when the guard is not active.
    pub fn stop(&mut self) {
        if let Some(mut state) = self.state.take() {
            state.session.unregister(state.callback);
            info!(device = %state.target, "mount guard removed");
        }
    }
}

impl<A: MountArbiter> Drop for MountGuard<A> {
    fn drop(&mut self) {
        self.stop();
    }
}
