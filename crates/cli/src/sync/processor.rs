// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queue drain: one FIFO pass over a snapshot of the sync queue.
//!
//! Delivery is at-least-once. A record is marked synced before its queue
//! item is removed, so a crash between the remote write and the removal
//! replays the write on the next drain.
//!
//! Dropping an item follows the same order: the dead letter is written
//! before the queue item is removed. A crash in between leaves the item in
//! both places; it keeps being retried, and requeueing the failed log skips
//! letters whose item is still queued.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use outbox_core::{DeadLetterLog, DropReason, EntityKind, QueueItem, Store, SyncQueue};

use super::connectivity::ConnectivityProvider;
use super::handlers::{Handlers, RecordRef};
use super::remote::{Remote, RemoteError};
use super::service::SyncConfig;
use crate::error::Result;

/// What triggered a drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainMode {
    /// Local write, reconnect or timer. Items still backing off are skipped.
    Scheduled,
    /// Manual request. Every item is attempted regardless of backoff.
    Forced,
}

/// Per-pass counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Items sent to the remote.
    pub attempted: usize,
    /// Items the remote applied; removed from the queue.
    pub synced: usize,
    /// Items that failed and stay queued.
    pub retried: usize,
    /// Items moved to the failed log.
    pub dropped: usize,
    /// Items not attempted this pass (backing off, blocked behind an earlier
    /// failure for the same record, or offline).
    pub deferred: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Another drain was already running; nothing was done.
    Skipped,
    Completed(DrainReport),
}

impl DrainOutcome {
    pub fn report(&self) -> Option<&DrainReport> {
        match self {
            DrainOutcome::Skipped => None,
            DrainOutcome::Completed(report) => Some(report),
        }
    }
}

/// Holds the in-process single-flight flag; clears it on drop.
struct DrainGuard<'a>(&'a AtomicBool);

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| DrainGuard(flag))
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

enum Failure {
    Retried,
    Dropped,
}

/// Borrowed view of everything a drain touches.
pub(crate) struct Processor<'a, R: Remote> {
    pub store: &'a Mutex<Store>,
    pub queue: &'a SyncQueue,
    pub dead_letters: &'a DeadLetterLog,
    pub handlers: &'a Handlers,
    pub remote: &'a R,
    pub connectivity: &'a dyn ConnectivityProvider,
    pub config: &'a SyncConfig,
}

pub(crate) fn lock_store(store: &Mutex<Store>) -> MutexGuard<'_, Store> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<R: Remote> Processor<'_, R> {
    /// Runs one pass unless another drain (in this process or another) is
    /// already running.
    ///
    /// Remote failures are absorbed into the report; only local storage
    /// failures are returned as errors.
    pub async fn drain(&self, running: &AtomicBool, mode: DrainMode) -> Result<DrainOutcome> {
        let Some(_guard) = DrainGuard::acquire(running) else {
            debug!("drain already in progress, skipping");
            return Ok(DrainOutcome::Skipped);
        };
        let Some(_lock) = self.queue.try_lock_drain()? else {
            debug!("queue is being drained by another process, skipping");
            return Ok(DrainOutcome::Skipped);
        };

        let snapshot = self.queue.items()?;
        let now = Utc::now();
        let mut report = DrainReport::default();
        // Records with an earlier item that failed or was deferred this pass
        let mut blocked: HashSet<(EntityKind, String)> = HashSet::new();

        for (index, item) in snapshot.iter().enumerate() {
            if !self.connectivity.is_online() {
                info!(remaining = snapshot.len() - index, "offline, stopping drain");
                report.deferred += snapshot.len() - index;
                break;
            }

            let key = (item.kind(), item.record_id.clone());
            if blocked.contains(&key) {
                report.deferred += 1;
                continue;
            }
            if mode == DrainMode::Scheduled && !item.is_due(now) {
                blocked.insert(key);
                report.deferred += 1;
                continue;
            }

            report.attempted += 1;
            match self.handlers.dispatch(self.remote, item).await {
                Ok(record) => {
                    self.complete(item, &record)?;
                    report.synced += 1;
                }
                Err(error) => {
                    blocked.insert(key);
                    match self.fail(item.clone(), error)? {
                        Failure::Retried => report.retried += 1,
                        Failure::Dropped => report.dropped += 1,
                    }
                }
            }
        }

        if report != DrainReport::default() {
            info!(
                attempted = report.attempted,
                synced = report.synced,
                retried = report.retried,
                dropped = report.dropped,
                deferred = report.deferred,
                "drain finished"
            );
        }
        Ok(DrainOutcome::Completed(report))
    }

    fn complete(&self, item: &QueueItem, record: &RecordRef) -> Result<()> {
        // Under the queue lock a writer cannot slip a new item for the record
        // in between the check and the flag.
        self.queue.with_lock(|queue| {
            // A later operation on the same record is still unconfirmed
            if !queue.has_pending_for(record.kind, &record.id, &item.id)? {
                lock_store(self.store).mark_synced(record.kind, &record.id)?;
            }
            Ok(())
        })?;
        self.queue.remove(&item.id)?;
        debug!(item = %item.id, kind = %record.kind, record = %record.id, "synced");
        Ok(())
    }

    fn fail(&self, mut item: QueueItem, error: RemoteError) -> Result<Failure> {
        item.retry_count += 1;
        item.last_error = Some(error.to_string());

        let reject = self.config.dead_letter_rejections && error.is_permanent();
        if reject || item.retry_count >= self.config.max_retries {
            let reason = if reject {
                DropReason::Rejected {
                    message: error.to_string(),
                }
            } else {
                DropReason::RetriesExhausted {
                    attempts: item.retry_count,
                    last_error: item.last_error.clone(),
                }
            };
            warn!(
                item = %item.id,
                kind = %item.kind(),
                record = %item.record_id,
                action = %item.action,
                %reason,
                "dropping queue item"
            );
            let id = item.id.clone();
            self.dead_letters.append(item, reason)?;
            self.queue.remove(&id)?;
            return Ok(Failure::Dropped);
        }

        let delay = self
            .config
            .backoff
            .delay_with_jitter(item.retry_count, &mut rand::thread_rng());
        item.not_before = Some(retry_at(Utc::now(), delay));
        debug!(
            item = %item.id,
            attempt = item.retry_count,
            error = %error,
            ?delay,
            "will retry"
        );
        self.queue.update(&item)?;
        Ok(Failure::Retried)
    }
}

fn retry_at(now: DateTime<Utc>, delay: std::time::Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(now)
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;
