// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! An in-memory optical drive: a small service tree, a command plugin chain
//! with a kernel-style exclusive-access lock, a disc that answers READ TOC
//! and READ CD, and a mount arbitration service.
//!
//! Every knob that makes a real drive misbehave (stale services, busy
//! locks, failing sectors, slow unmounts) can be scripted, and every
//! resource the core acquires is counted so leaks are observable.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::sync::oneshot;
use tracing::debug;

use crate::{
    cfg::enums::UnmountOption,
    control_block::common::{CDDA_SECTOR_SIZE, Command},
    error::ScsiOp,
    models::{outcome::ScsiOutcome, return_code::KernReturn},
    platform::{
        Approval, ArbitrationSession, CallbackId, CommandPlugin, DeviceDirectory,
        MmcInterface, MountApprovalFn, MountArbiter, ScsiExecutor, TaskDevice,
        UnmountResult,
    },
};

/// Index of a node in the simulated service tree.
pub type SimNode = usize;

/// How the simulated arbitration service answers an unmount request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnmountBehavior {
    /// Complete immediately.
    #[default]
    Complete,
    /// Complete immediately with a dissent.
    Dissent(KernReturn),
    /// Complete after the given delay (needs a running tokio runtime).
    Delay(Duration),
    /// Never complete.
    Never,
}

#[derive(Debug, Clone)]
struct NodeInfo {
    class: String,
    bsd_name: Option<String>,
    parent: Option<SimNode>,
    optical: bool,
    command_client: bool,
}

struct Registration {
    id: CallbackId,
    session: u64,
    approval: MountApprovalFn,
}

#[derive(Default)]
struct SimState {
    nodes: Vec<NodeInfo>,
    resolutions: usize,

    plugin_failures: u32,
    plugin_failure_code: KernReturn,
    mmc_failure: Option<KernReturn>,
    task_device_missing: bool,

    exclusive_override: Option<KernReturn>,
    exclusive_held: bool,
    exclusive_acquisitions: usize,
    exclusive_releases: usize,

    live_plugins: usize,
    live_mmc: usize,
    live_devices: usize,

    toc: Vec<u8>,
    scripted: HashMap<usize, ScsiOutcome>,
    commands: Vec<Command>,

    arbitration_unavailable: bool,
    next_id: u64,
    live_sessions: usize,
    registrations: Vec<Registration>,
    unmount_behavior: UnmountBehavior,
    unmount_requests: Vec<(String, UnmountOption)>,
    pending_unmounts: Vec<oneshot::Sender<UnmountResult>>,
    mounted: HashSet<String>,
}

impl SimState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn knows_disk(&self, bsd_name: &str) -> bool {
        self.nodes
            .iter()
            .any(|n| n.bsd_name.as_deref() == Some(bsd_name))
    }
}

/// Shared handle to the simulated platform; clones observe the same state.
#[derive(Clone, Default)]
pub struct SimPlatform {
    state: Arc<Mutex<SimState>>,
}

fn lock(state: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A single-session audio disc TOC: track 1 at LBA 0, lead-out at 12000.
pub const DEFAULT_TOC: [u8; 20] = [
    0x00, 0x12, 0x01, 0x01, // data length, first track, last track
    0x00, 0x10, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, // track 1
    0x00, 0x10, 0xAA, 0x00, 0x00, 0x00, 0x2E, 0xE0, // lead-out
];

/// Deterministic content of a simulated audio sector: the LBA in the first
/// four bytes (big-endian), `lba % 251` in every other byte.
pub fn fill_sector(lba: u32, out: &mut [u8]) {
    out.fill((lba % 251) as u8);
    let n = out.len().min(4);
    out[..n].copy_from_slice(&lba.to_be_bytes()[..n]);
}

/// Bytes the simulated disc returns for `sectors` sectors from `lba`.
pub fn expected_audio(lba: u32, sectors: u32) -> Vec<u8> {
    let mut out = vec![0u8; sectors as usize * CDDA_SECTOR_SIZE as usize];
    for (i, sector) in out.chunks_mut(CDDA_SECTOR_SIZE as usize).enumerate() {
        fill_sector(lba.wrapping_add(i as u32), sector);
    }
    out
}

impl SimPlatform {
    /// An empty platform with no services.
    pub fn new() -> Self {
        Self::default()
    }

    /// A drive with an audio disc mounted as `bsd_name`, laid out the way
    /// an ATAPI/USB optical drive shows up:
    ///
    /// `root → peripheral(MMC client) → services → driver → CD media → partition`
    pub fn cd_drive(bsd_name: &str) -> Self {
        let sim = Self::new();
        let root = sim.add_node("IOResources", None, None, false, false);
        let peripheral =
            sim.add_node("IOSCSIPeripheralDeviceType05", None, Some(root), false, true);
        let services = sim.add_node("IODVDServices", None, Some(peripheral), false, false);
        let driver =
            sim.add_node("IOCDBlockStorageDriver", None, Some(services), false, false);
        let media = sim.add_node("IOCDMedia", Some(bsd_name), Some(driver), true, false);
        sim.add_node(
            "IOMedia",
            Some(&format!("{bsd_name}s1")),
            Some(media),
            false,
            false,
        );

        {
            let mut st = lock(&sim.state);
            st.toc = DEFAULT_TOC.to_vec();
            st.mounted.insert(bsd_name.to_string());
        }
        sim
    }

    pub fn add_node(
        &self,
        class: &str,
        bsd_name: Option<&str>,
        parent: Option<SimNode>,
        optical: bool,
        command_client: bool,
    ) -> SimNode {
        let mut st = lock(&self.state);
        st.nodes.push(NodeInfo {
            class: class.to_string(),
            bsd_name: bsd_name.map(str::to_string),
            parent,
            optical,
            command_client,
        });
        st.nodes.len() - 1
    }

    /// Class name of a node, for diagnostics.
    pub fn class_of(&self, node: SimNode) -> Option<String> {
        lock(&self.state).nodes.get(node).map(|n| n.class.clone())
    }

    // ── scripting ───────────────────────────────────────────────────────

    pub fn set_toc(&self, toc: &[u8]) {
        lock(&self.state).toc = toc.to_vec();
    }

    /// The next `times` plugin creations fail with `code`.
    pub fn fail_plugin_creation(&self, times: u32, code: KernReturn) {
        let mut st = lock(&self.state);
        st.plugin_failures = times;
        st.plugin_failure_code = code;
    }

    pub fn fail_mmc_query(&self, code: KernReturn) {
        lock(&self.state).mmc_failure = Some(code);
    }

    pub fn remove_task_device(&self) {
        lock(&self.state).task_device_missing = true;
    }

    /// Every exclusive-access request returns `code`.
    pub fn force_exclusive_result(&self, code: KernReturn) {
        lock(&self.state).exclusive_override = Some(code);
    }

    /// Another client takes (or gives up) the exclusive-access lock.
    pub fn set_held_elsewhere(&self, held: bool) {
        lock(&self.state).exclusive_held = held;
    }

    /// The `index`-th executed command (1-based, counted over the life of
    /// the platform) completes with `outcome` and transfers no data.
    pub fn script_outcome(&self, index: usize, outcome: ScsiOutcome) {
        lock(&self.state).scripted.insert(index, outcome);
    }

    pub fn set_unmount_behavior(&self, behavior: UnmountBehavior) {
        lock(&self.state).unmount_behavior = behavior;
    }

    pub fn make_arbitration_unavailable(&self) {
        lock(&self.state).arbitration_unavailable = true;
    }

    // ── observation ─────────────────────────────────────────────────────

    /// How many times a device name was looked up.
    pub fn resolutions(&self) -> usize {
        lock(&self.state).resolutions
    }

    pub fn commands(&self) -> Vec<Command> {
        lock(&self.state).commands.clone()
    }

    pub fn exclusive_acquisitions(&self) -> usize {
        lock(&self.state).exclusive_acquisitions
    }

    pub fn exclusive_releases(&self) -> usize {
        lock(&self.state).exclusive_releases
    }

    pub fn exclusive_held(&self) -> bool {
        lock(&self.state).exclusive_held
    }

    /// Plugin, MMC and task-device interfaces not yet released.
    pub fn live_interfaces(&self) -> usize {
        let st = lock(&self.state);
        st.live_plugins + st.live_mmc + st.live_devices
    }

    pub fn registered_callbacks(&self) -> usize {
        lock(&self.state).registrations.len()
    }

    pub fn live_sessions(&self) -> usize {
        lock(&self.state).live_sessions
    }

    pub fn unmount_requests(&self) -> Vec<(String, UnmountOption)> {
        lock(&self.state).unmount_requests.clone()
    }

    pub fn is_mounted(&self, bsd_name: &str) -> bool {
        lock(&self.state).mounted.contains(bsd_name)
    }

    /// Ask the arbitration service to mount `bsd_name`; registered approval
    /// callbacks may veto it.
    pub fn request_mount(&self, bsd_name: &str) -> Approval {
        let mut st = lock(&self.state);
        for reg in &st.registrations {
            if let deny @ Approval::Deny { .. } = (reg.approval)(bsd_name) {
                debug!(bsd_name, "mount vetoed");
                return deny;
            }
        }
        st.mounted.insert(bsd_name.to_string());
        Approval::Allow
    }
}

impl DeviceDirectory for SimPlatform {
    type Node = SimNode;
    type Plugin = SimPlugin;

    fn matching_services(&self, device_name: &str) -> Vec<SimNode> {
        let mut st = lock(&self.state);
        st.resolutions += 1;
        st.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.bsd_name.as_deref() == Some(device_name))
            .map(|(i, _)| i)
            .collect()
    }

    fn is_optical_media(&self, node: &SimNode) -> bool {
        lock(&self.state).nodes.get(*node).is_some_and(|n| n.optical)
    }

    fn parent(&self, node: &SimNode) -> Option<SimNode> {
        lock(&self.state).nodes.get(*node).and_then(|n| n.parent)
    }

    fn advertises_command_client(&self, node: &SimNode) -> bool {
        lock(&self.state)
            .nodes
            .get(*node)
            .is_some_and(|n| n.command_client)
    }

    fn create_plugin(&self, node: &SimNode) -> Result<SimPlugin, KernReturn> {
        let mut st = lock(&self.state);
        if st.plugin_failures > 0 {
            st.plugin_failures -= 1;
            return Err(st.plugin_failure_code);
        }
        if !st.nodes.get(*node).is_some_and(|n| n.command_client) {
            return Err(KernReturn::UNSUPPORTED);
        }
        st.live_plugins += 1;
        Ok(SimPlugin {
            state: Arc::clone(&self.state),
        })
    }
}

pub struct SimPlugin {
    state: Arc<Mutex<SimState>>,
}

impl CommandPlugin for SimPlugin {
    type Mmc = SimMmc;

    fn query_mmc(&mut self) -> Result<SimMmc, KernReturn> {
        let mut st = lock(&self.state);
        if let Some(code) = st.mmc_failure {
            return Err(code);
        }
        st.live_mmc += 1;
        Ok(SimMmc {
            state: Arc::clone(&self.state),
        })
    }
}

impl Drop for SimPlugin {
    fn drop(&mut self) {
        lock(&self.state).live_plugins -= 1;
    }
}

pub struct SimMmc {
    state: Arc<Mutex<SimState>>,
}

impl MmcInterface for SimMmc {
    type Device = SimTaskDevice;

    fn task_device(&mut self) -> Option<SimTaskDevice> {
        let mut st = lock(&self.state);
        if st.task_device_missing {
            return None;
        }
        st.live_devices += 1;
        Some(SimTaskDevice {
            state: Arc::clone(&self.state),
            exclusive: false,
        })
    }
}

impl Drop for SimMmc {
    fn drop(&mut self) {
        lock(&self.state).live_mmc -= 1;
    }
}

pub struct SimTaskDevice {
    state: Arc<Mutex<SimState>>,
    exclusive: bool,
}

impl TaskDevice for SimTaskDevice {
    fn obtain_exclusive_access(&mut self) -> KernReturn {
        let mut st = lock(&self.state);
        if let Some(code) = st.exclusive_override {
            return code;
        }
        if st.exclusive_held {
            return KernReturn::BUSY;
        }
        st.exclusive_held = true;
        st.exclusive_acquisitions += 1;
        self.exclusive = true;
        KernReturn::SUCCESS
    }

    fn release_exclusive_access(&mut self) {
        if !self.exclusive {
            return;
        }
        let mut st = lock(&self.state);
        st.exclusive_held = false;
        st.exclusive_releases += 1;
        self.exclusive = false;
    }
}

impl ScsiExecutor for SimTaskDevice {
    fn execute(&mut self, command: &Command, data: &mut [u8]) -> ScsiOutcome {
        if !self.exclusive {
            return ScsiOutcome::exec_failure(KernReturn::EXCLUSIVE_ACCESS);
        }

        let mut st = lock(&self.state);
        st.commands.push(command.clone());
        let index = st.commands.len();
        if let Some(outcome) = st.scripted.get(&index) {
            return *outcome;
        }
        if data.len() != command.transfer_len as usize {
            return ScsiOutcome::exec_failure(KernReturn::ERROR);
        }

        match command.op {
            ScsiOp::ReadToc => {
                data.fill(0);
                let n = st.toc.len().min(data.len());
                data[..n].copy_from_slice(&st.toc[..n]);
            },
            ScsiOp::ReadCd => {
                let lba = command.lba.unwrap_or_default();
                for (i, sector) in data.chunks_mut(CDDA_SECTOR_SIZE as usize).enumerate() {
                    fill_sector(lba.wrapping_add(i as u32), sector);
                }
            },
        }
        ScsiOutcome::good()
    }
}

impl Drop for SimTaskDevice {
    fn drop(&mut self) {
        lock(&self.state).live_devices -= 1;
    }
}

impl MountArbiter for SimPlatform {
    type Session = SimSession;

    fn create_session(&self) -> Option<SimSession> {
        let mut st = lock(&self.state);
        if st.arbitration_unavailable {
            return None;
        }
        st.live_sessions += 1;
        let id = st.next_id();
        Some(SimSession {
            state: Arc::clone(&self.state),
            id,
        })
    }
}

pub struct SimSession {
    state: Arc<Mutex<SimState>>,
    id: u64,
}

impl ArbitrationSession for SimSession {
    fn register_mount_approval(&mut self, approval: MountApprovalFn) -> CallbackId {
        let mut st = lock(&self.state);
        let id = CallbackId(st.next_id());
        st.registrations.push(Registration {
            id,
            session: self.id,
            approval,
        });
        id
    }

    fn unregister(&mut self, id: CallbackId) {
        lock(&self.state).registrations.retain(|r| r.id != id);
    }

    fn unmount(
        &mut self,
        device_path: &str,
        option: UnmountOption,
        done: oneshot::Sender<UnmountResult>,
    ) -> Result<(), KernReturn> {
        let name = device_path
            .strip_prefix("/dev/")
            .unwrap_or(device_path)
            .to_string();

        let mut st = lock(&self.state);
        st.unmount_requests.push((name.clone(), option));
        if !st.knows_disk(&name) {
            return Err(KernReturn::NO_DEVICE);
        }

        match st.unmount_behavior {
            UnmountBehavior::Complete => {
                st.mounted.remove(&name);
                let _ = done.send(Ok(()));
            },
            UnmountBehavior::Dissent(code) => {
                let _ = done.send(Err(code));
            },
            UnmountBehavior::Delay(delay) => {
                let state = Arc::clone(&self.state);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    lock(&state).mounted.remove(&name);
                    let _ = done.send(Ok(()));
                });
            },
            UnmountBehavior::Never => st.pending_unmounts.push(done),
        }
        Ok(())
    }
}

impl Drop for SimSession {
    fn drop(&mut self) {
        let mut st = lock(&self.state);
        let id = self.id;
        st.registrations.retain(|r| r.session != id);
        st.live_sessions -= 1;
    }
}
