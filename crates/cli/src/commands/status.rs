// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Commands that talk to the remote: `status` and `sync`.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::runtime::Runtime;

use crate::cli::OutputFormat;
use crate::config::{find_work_dir, Config};
use crate::error::{Error, Result};
use crate::sync::{DrainOutcome, DrainReport, ProbeConnectivity, SyncService, SyncStatus};

#[derive(Serialize)]
struct StatusJson<'a> {
    remote: &'a str,
    #[serde(flatten)]
    status: &'a SyncStatus,
}

#[derive(Serialize)]
struct SyncJson<'a> {
    skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a DrainReport>,
    status: &'a SyncStatus,
}

/// Builds a probe for the configured remote.
pub(crate) fn probe_for(config: &Config) -> Result<ProbeConnectivity> {
    let remote = &config.remote;
    ProbeConnectivity::for_url(
        &remote.url,
        Duration::from_secs(remote.probe_interval_secs.max(1)),
        Duration::from_secs(remote.connect_timeout_secs),
    )
    .ok_or_else(|| Error::Config(format!("invalid remote URL '{}'", remote.url)))
}

/// Opens the service after one reachability probe of the remote.
fn open_probed(rt: &Runtime) -> Result<(SyncService, Config)> {
    let work_dir = find_work_dir()?;
    let config = Config::load(&work_dir)?;
    let probe = Arc::new(probe_for(&config)?);
    rt.block_on(probe.probe_once());
    let service = SyncService::open(&work_dir, &config, probe)?;
    Ok((service, config))
}

pub fn status(output: OutputFormat) -> Result<()> {
    let rt = Runtime::new()?;
    let (service, config) = open_probed(&rt)?;
    let status = service.status()?;
    print!("{}", render_status(&config.remote.url, &status, output)?);
    Ok(())
}

pub fn sync(output: OutputFormat) -> Result<()> {
    let rt = Runtime::new()?;
    let (service, _) = open_probed(&rt)?;
    let outcome = rt.block_on(async {
        let outcome = service.force_sync().await;
        service.remote().disconnect().await;
        outcome
    })?;
    let status = service.status()?;
    print!("{}", render_sync(&outcome, &status, output)?);
    Ok(())
}

pub(crate) fn render_status(
    remote: &str,
    status: &SyncStatus,
    output: OutputFormat,
) -> Result<String> {
    match output {
        OutputFormat::Text => {
            let reachability = if status.online { "online" } else { "offline" };
            let mut out = format!("Remote: {} ({})\n", remote, reachability);
            out.push_str(&format!("Pending: {}\n", status.pending));
            out.push_str(&format!("Failed: {}\n", status.failed));
            if let Some(at) = status.last_sync {
                out.push_str(&format!(
                    "Last sync: {}\n",
                    at.format("%Y-%m-%d %H:%M:%S UTC")
                ));
            }
            if status.failed > 0 {
                out.push_str("\nRun 'outbox failed' to inspect failed operations.\n");
            }
            Ok(out)
        }
        OutputFormat::Json => Ok(format!(
            "{}\n",
            serde_json::to_string_pretty(&StatusJson { remote, status })?
        )),
    }
}

pub(crate) fn render_sync(
    outcome: &DrainOutcome,
    status: &SyncStatus,
    output: OutputFormat,
) -> Result<String> {
    if output == OutputFormat::Json {
        let json = SyncJson {
            skipped: outcome.report().is_none(),
            report: outcome.report(),
            status,
        };
        return Ok(format!("{}\n", serde_json::to_string_pretty(&json)?));
    }

    let Some(report) = outcome.report() else {
        return Ok("Sync already in progress, try again later.\n".to_string());
    };
    let mut out = String::new();
    if !status.online && report.attempted == 0 {
        out.push_str("Remote unreachable, nothing sent.\n");
    } else if report.attempted == 0 && report.deferred == 0 {
        out.push_str("Nothing to sync.\n");
    } else {
        out.push_str(&format!(
            "Sent {}: {} synced, {} will retry, {} failed\n",
            report.attempted, report.synced, report.retried, report.dropped
        ));
    }
    if status.pending > 0 {
        out.push_str(&format!("Pending: {}\n", status.pending));
    }
    if report.dropped > 0 {
        out.push_str("Run 'outbox failed' to inspect failed operations.\n");
    }
    Ok(out)
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
