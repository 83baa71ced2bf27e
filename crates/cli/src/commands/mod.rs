// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod daemon;
pub mod failed;
pub mod init;
pub mod list;
pub mod record;
pub mod status;

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{find_work_dir, Config};
use crate::error::Result;
use crate::sync::{ConnectivityProvider, ManualConnectivity, SyncService};

/// Opens the service for the current directory with the given connectivity.
pub fn open_service(
    connectivity: Arc<dyn ConnectivityProvider>,
) -> Result<(SyncService, Config, PathBuf)> {
    let work_dir = find_work_dir()?;
    let config = Config::load(&work_dir)?;
    let service = SyncService::open(&work_dir, &config, connectivity)?;
    Ok((service, config, work_dir))
}

/// Opens the service for commands that only touch local state.
///
/// Connectivity is pinned offline so writes are queued and left for
/// `outbox sync` or a running daemon.
pub fn open_local() -> Result<SyncService> {
    let (service, _, _) = open_service(Arc::new(ManualConnectivity::new(false)))?;
    Ok(service)
}

/// Returns the payload argument, reading stdin when it is `-`.
pub fn read_payload(arg: String) -> Result<String> {
    if arg == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        Ok(arg)
    }
}
