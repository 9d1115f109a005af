// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use tracing::debug;

use crate::{cfg::config::SessionConfig, error::CdError, platform::DeviceDirectory};

/// The service that vends the MMC command client for a block device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity<N> {
    pub device_name: String,
    pub service: N,
}

/// Resolve `device_name` to the service carrying its MMC command client.
///
/// The matched service is checked for optical media first; otherwise its
/// ancestors are searched up to `media_search_depth` links. From the media
/// node the walk continues up to `client_search_depth` links looking for a
/// node that advertises the command client.
pub fn resolve<D: DeviceDirectory>(
    directory: &D,
    device_name: &str,
    bounds: &SessionConfig,
) -> Result<DeviceIdentity<D::Node>, CdError> {
    let media = find_media(directory, device_name, bounds.media_search_depth).ok_or_else(
        || CdError::DeviceNotFound {
            device: device_name.to_string(),
        },
    )?;

    let service = ascend_to_command_client(directory, media, bounds.client_search_depth)
        .ok_or_else(|| CdError::NoCommandClient {
            device: device_name.to_string(),
        })?;

    debug!(device = device_name, ?service, "resolved command client");
    Ok(DeviceIdentity {
        device_name: device_name.to_string(),
        service,
    })
}

fn find_media<D: DeviceDirectory>(
    directory: &D,
    device_name: &str,
    max_depth: usize,
) -> Option<D::Node> {
    let matches = directory.matching_services(device_name);
    debug!(device = device_name, count = matches.len(), "matched services");

    for matched in matches {
        if directory.is_optical_media(&matched) {
            return Some(matched);
        }

        let mut node = directory.parent(&matched);
        for depth in 1..=max_depth {
            let Some(current) = node else { break };
            if directory.is_optical_media(&current) {
                debug!(depth, node = ?current, "optical media above matched service");
                return Some(current);
            }
            node = directory.parent(&current);
        }
    }
    None
}

fn ascend_to_command_client<D: DeviceDirectory>(
    directory: &D,
    media: D::Node,
    max_depth: usize,
) -> Option<D::Node> {
    let mut node = Some(media);
    for depth in 0..max_depth {
        let current = node?;
        if directory.advertises_command_client(&current) {
            return Some(current);
        }
        debug!(depth, node = ?current, "no command client");
        node = directory.parent(&current);
    }
    None
}
