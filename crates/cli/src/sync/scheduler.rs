// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Background task deciding when to drain.
//!
//! - Drains once at start if online
//! - Drains on every offline to online transition
//! - Drains every `interval` while online; the timer is paused while offline

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::remote::Remote;
use super::service::SyncService;

/// Handle to a running scheduler task.
pub(crate) struct Scheduler {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Scheduler {
    /// Cancels the task and waits for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "scheduler task ended abnormally");
        }
    }
}

pub(crate) fn spawn<R: Remote>(handle: &Handle, service: SyncService<R>) -> Scheduler {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let task = handle.spawn(run(service, token));
    Scheduler { cancel, task }
}

async fn run<R: Remote>(service: SyncService<R>, cancel: CancellationToken) {
    let period = service.config().interval;
    let mut rx = service.connectivity().subscribe();
    let mut online = *rx.borrow_and_update();
    let mut watching = true;

    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(online, ?period, "sync scheduler started");
    if online {
        drain(&service, "startup").await;
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = rx.changed(), if watching => {
                if changed.is_err() {
                    // Provider gone: keep the last known state
                    watching = false;
                    continue;
                }
                let now_online = *rx.borrow_and_update();
                if now_online == online {
                    continue;
                }
                online = now_online;
                if online {
                    info!("back online, syncing");
                    ticker.reset();
                    drain(&service, "reconnect").await;
                } else {
                    info!("offline, pausing periodic sync");
                }
            }
            _ = ticker.tick(), if online => {
                drain(&service, "interval").await;
            }
        }
    }
    info!("sync scheduler stopped");
}

async fn drain<R: Remote>(service: &SyncService<R>, trigger: &'static str) {
    match service.drain().await {
        Ok(outcome) => debug!(trigger, ?outcome, "drain"),
        Err(e) => warn!(trigger, error = %e, "drain failed"),
    }
}
