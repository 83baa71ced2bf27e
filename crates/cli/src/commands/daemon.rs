// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Foreground sync loop.
//!
//! Probes the remote in the background, runs the scheduler, and stops
//! cleanly on Ctrl-C.

use std::sync::Arc;

use tracing::info;

use super::status::probe_for;
use crate::config::{find_work_dir, Config};
use crate::error::{Error, Result};
use crate::sync::{on_change, SyncService};

pub fn run() -> Result<()> {
    let work_dir = find_work_dir()?;
    let config = Config::load(&work_dir)?;
    setup_logging();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let probe = Arc::new(probe_for(&config)?);
        let service = SyncService::open(&work_dir, &config, probe.clone())?;

        info!(
            remote = %config.remote.url,
            user = %config.user_id,
            pending = service.status()?.pending,
            "starting sync daemon"
        );

        let watcher = on_change(probe.as_ref(), |online| {
            if online {
                info!("remote reachable");
            } else {
                info!("remote unreachable");
            }
        });
        // Establish the initial state before the scheduler looks at it
        probe.probe_once().await;
        probe.start();
        service.start()?;

        tokio::signal::ctrl_c().await?;
        info!("shutting down");

        service.stop().await;
        probe.stop();
        watcher.abort();
        service.remote().disconnect().await;
        info!(pending = service.status()?.pending, "sync daemon stopped");
        Ok::<(), Error>(())
    })
}

/// Logs to stderr, filtered by `RUST_LOG` (default: info).
fn setup_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
