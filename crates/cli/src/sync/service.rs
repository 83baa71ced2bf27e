// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The sync service: the one object application code talks to.
//!
//! A [`SyncService`] is constructed once at startup and cloned wherever it
//! is needed. Writes go through [`SyncService::record`], which persists the
//! record, appends a queue item, and (when online) kicks off a background
//! drain. [`SyncService::start`] runs the scheduler that drains on reconnect
//! and periodically while online.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use outbox_core::id::record_id;
use outbox_core::{
    DeadLetter, DeadLetterLog, EntityData, EntityKind, QueueItem, Record, Store, SyncAction,
    SyncQueue,
};

use super::backoff::Backoff;
use super::connectivity::ConnectivityProvider;
use super::processor::{lock_store, DrainMode, DrainOutcome, Processor};
use super::remote::{Remote, WebSocketRemote};
use super::scheduler::{self, Scheduler};
use super::Handlers;
use crate::config::{get_failed_path, get_queue_path, get_store_path, Config};
use crate::error::{Error, Result};

/// Runtime settings for the service, usually derived from [`Config`].
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Owner of every remote row.
    pub user_id: String,
    /// Failed attempts before an item is dropped to the failed log.
    pub max_retries: u32,
    /// Periodic drain interval while online.
    pub interval: Duration,
    pub backoff: Backoff,
    /// Drop rejected items immediately instead of retrying them.
    pub dead_letter_rejections: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            user_id: "local".to_string(),
            max_retries: 3,
            interval: Duration::from_secs(300),
            backoff: Backoff::default(),
            dead_letter_rejections: false,
        }
    }
}

impl SyncConfig {
    pub fn from_config(config: &Config) -> Self {
        SyncConfig {
            user_id: config.user_id.clone(),
            max_retries: config.sync.max_retries.max(1),
            interval: Duration::from_secs(config.sync.interval_secs.max(1)),
            backoff: Backoff::new(
                Duration::from_millis(config.sync.backoff_base_ms),
                Duration::from_secs(config.sync.backoff_max_secs),
            ),
            dead_letter_rejections: config.sync.dead_letter_rejections,
        }
    }
}

/// A local write.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// New record; its id is generated.
    Create(EntityData),
    /// Replace the payload of an existing record.
    Update { id: String, data: EntityData },
    /// Remove an existing record.
    Delete { kind: EntityKind, id: String },
}

/// Snapshot for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    /// Items waiting in the queue.
    pub pending: usize,
    /// Items in the failed log.
    pub failed: usize,
    /// Completion time of the last forced sync in this process.
    pub last_sync: Option<DateTime<Utc>>,
    pub online: bool,
    /// A drain is currently running in this process.
    pub syncing: bool,
}

struct Inner<R: Remote> {
    store: Mutex<Store>,
    queue: SyncQueue,
    dead_letters: DeadLetterLog,
    handlers: Handlers,
    remote: R,
    connectivity: Arc<dyn ConnectivityProvider>,
    config: SyncConfig,
    syncing: AtomicBool,
    last_sync: Mutex<Option<DateTime<Utc>>>,
    scheduler: Mutex<Option<Scheduler>>,
}

/// Cloneable handle to the sync subsystem.
pub struct SyncService<R: Remote = WebSocketRemote> {
    inner: Arc<Inner<R>>,
}

impl<R: Remote> Clone for SyncService<R> {
    fn clone(&self) -> Self {
        SyncService {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl SyncService<WebSocketRemote> {
    /// Opens the store, queue and failed log under a `.outbox/` directory and
    /// connects them to the configured WebSocket remote.
    pub fn open(
        work_dir: &Path,
        config: &Config,
        connectivity: Arc<dyn ConnectivityProvider>,
    ) -> Result<Self> {
        let store = Store::open(&get_store_path(work_dir))?;
        let queue = SyncQueue::open(&get_queue_path(work_dir))?;
        let dead_letters = DeadLetterLog::open(&get_failed_path(work_dir))?;
        let remote = WebSocketRemote::new(
            config.remote.url.clone(),
            Duration::from_secs(config.remote.connect_timeout_secs),
            Duration::from_secs(config.remote.request_timeout_secs),
        );
        Ok(Self::new(
            store,
            queue,
            dead_letters,
            remote,
            connectivity,
            SyncConfig::from_config(config),
        ))
    }
}

impl<R: Remote> SyncService<R> {
    pub fn new(
        store: Store,
        queue: SyncQueue,
        dead_letters: DeadLetterLog,
        remote: R,
        connectivity: Arc<dyn ConnectivityProvider>,
        config: SyncConfig,
    ) -> Self {
        SyncService {
            inner: Arc::new(Inner {
                store: Mutex::new(store),
                queue,
                dead_letters,
                handlers: Handlers::new(config.user_id.clone()),
                remote,
                connectivity,
                config,
                syncing: AtomicBool::new(false),
                last_sync: Mutex::new(None),
                scheduler: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub fn connectivity(&self) -> &Arc<dyn ConnectivityProvider> {
        &self.inner.connectivity
    }

    pub fn remote(&self) -> &R {
        &self.inner.remote
    }

    /// Persists a local write and queues it for the remote. Returns the
    /// record id.
    ///
    /// The record is durable when this returns. If the queue append fails
    /// the store write is undone and the error returned, so a record never
    /// exists without a pending operation for it.
    pub fn record(&self, change: Change) -> Result<String> {
        let id = match change {
            Change::Create(data) => self.record_create(data)?,
            Change::Update { id, data } => self.record_update(id, data)?,
            Change::Delete { kind, id } => self.record_delete(kind, id)?,
        };
        self.trigger_drain();
        Ok(id)
    }

    // Each write holds the queue lock from the store change through the
    // enqueue, so a drain in another process never sees the record changed
    // without its queue item.

    fn record_create(&self, data: EntityData) -> Result<String> {
        data.validate()?;
        let kind = data.kind();
        let now = Utc::now();
        let seed = data.payload_json()?;

        let id = self.inner.queue.with_lock(|queue| {
            let store = lock_store(&self.inner.store);
            let id = record_id(kind, &seed, &now, |candidate| store.exists(kind, candidate))?;
            store.put(&Record::new(id.clone(), data.clone(), now))?;

            if let Err(e) = queue.enqueue(SyncAction::Create, &id, data) {
                if let Err(undo) = store.delete(kind, &id) {
                    warn!(%kind, %id, error = %undo, "failed to roll back create");
                }
                return Err(e);
            }
            Ok(id)
        })?;
        debug!(%kind, %id, "recorded create");
        Ok(id)
    }

    fn record_update(&self, id: String, data: EntityData) -> Result<String> {
        data.validate()?;
        let kind = data.kind();

        self.inner.queue.with_lock(|queue| {
            let store = lock_store(&self.inner.store);
            let previous = store.get(kind, &id)?.ok_or_else(|| not_found(kind, &id))?;
            store.put(&Record::new(id.clone(), data.clone(), Utc::now()))?;

            if let Err(e) = queue.enqueue(SyncAction::Update, &id, data) {
                if let Err(undo) = store.restore(&previous) {
                    warn!(%kind, %id, error = %undo, "failed to roll back update");
                }
                return Err(e);
            }
            Ok(())
        })?;
        debug!(%kind, %id, "recorded update");
        Ok(id)
    }

    fn record_delete(&self, kind: EntityKind, id: String) -> Result<String> {
        self.inner.queue.with_lock(|queue| {
            let store = lock_store(&self.inner.store);
            let previous = store.get(kind, &id)?.ok_or_else(|| not_found(kind, &id))?;
            store.delete(kind, &id)?;

            // The last known payload travels with the delete so handlers can
            // address rows keyed by payload fields.
            if let Err(e) = queue.enqueue(SyncAction::Delete, &id, previous.data.clone()) {
                if let Err(undo) = store.restore(&previous) {
                    warn!(%kind, %id, error = %undo, "failed to roll back delete");
                }
                return Err(e);
            }
            Ok(())
        })?;
        debug!(%kind, %id, "recorded delete");
        Ok(id)
    }

    /// Starts a background drain if online, idle and inside a tokio runtime.
    fn trigger_drain(&self) {
        if !self.inner.connectivity.is_online() || self.inner.syncing.load(Ordering::Acquire) {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let service = self.clone();
        handle.spawn(async move {
            if let Err(e) = service.drain().await {
                warn!(error = %e, "background drain failed");
            }
        });
    }

    fn processor(&self) -> Processor<'_, R> {
        Processor {
            store: &self.inner.store,
            queue: &self.inner.queue,
            dead_letters: &self.inner.dead_letters,
            handlers: &self.inner.handlers,
            remote: &self.inner.remote,
            connectivity: self.inner.connectivity.as_ref(),
            config: &self.inner.config,
        }
    }

    /// Drains the queue, skipping items that are still backing off.
    ///
    /// Returns [`DrainOutcome::Skipped`] if a drain is already running.
    pub async fn drain(&self) -> Result<DrainOutcome> {
        self.processor()
            .drain(&self.inner.syncing, DrainMode::Scheduled)
            .await
    }

    /// Drains the queue now, ignoring backoff, and records the sync time
    /// whatever the per-item outcomes.
    pub async fn force_sync(&self) -> Result<DrainOutcome> {
        let outcome = self
            .processor()
            .drain(&self.inner.syncing, DrainMode::Forced)
            .await;
        *self
            .inner
            .last_sync
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
        outcome
    }

    pub fn status(&self) -> Result<SyncStatus> {
        Ok(SyncStatus {
            pending: self.inner.queue.len()?,
            failed: self.inner.dead_letters.len()?,
            last_sync: *self
                .inner
                .last_sync
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
            online: self.inner.connectivity.is_online(),
            syncing: self.inner.syncing.load(Ordering::Acquire),
        })
    }

    pub fn records(&self, kind: EntityKind) -> Result<Vec<Record>> {
        Ok(lock_store(&self.inner.store).get_all(kind)?)
    }

    pub fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Record>> {
        Ok(lock_store(&self.inner.store).get(kind, id)?)
    }

    pub fn queue_items(&self) -> Result<Vec<QueueItem>> {
        Ok(self.inner.queue.items()?)
    }

    pub fn failed(&self) -> Result<Vec<DeadLetter>> {
        Ok(self.inner.dead_letters.read_all()?)
    }

    /// Moves every failed item back to the end of the queue with a fresh
    /// retry budget. Returns how many were requeued.
    ///
    /// A letter leaves the failed log only once its item is queued. Items
    /// still in the queue (a drop interrupted before the queue removal) are
    /// not queued twice.
    pub fn requeue_failed(&self) -> Result<usize> {
        let queue = &self.inner.queue;
        let mut requeued = 0;
        self.inner.dead_letters.take_each(|letter| {
            if queue.get(&letter.item.id)?.is_some() {
                debug!(item = %letter.item.id, "failed item is still queued");
                return Ok(());
            }
            let mut item = letter.item.clone();
            item.retry_count = 0;
            item.not_before = None;
            item.last_error = None;
            queue.push(&item)?;
            requeued += 1;
            Ok(())
        })?;
        if requeued > 0 {
            self.trigger_drain();
        }
        Ok(requeued)
    }

    /// Discards the failed log. Returns how many entries were removed.
    pub fn clear_failed(&self) -> Result<usize> {
        Ok(self.inner.dead_letters.clear()?)
    }

    /// Starts the scheduler. Must be called from within a tokio runtime.
    /// No-op if already running.
    pub fn start(&self) -> Result<()> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let mut slot = self
            .inner
            .scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(scheduler::spawn(&handle, self.clone()));
        }
        Ok(())
    }

    /// Stops the scheduler and waits for an in-flight drain to finish.
    pub async fn stop(&self) {
        let scheduler = self
            .inner
            .scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(scheduler) = scheduler {
            scheduler.shutdown().await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

fn not_found(kind: EntityKind, id: &str) -> outbox_core::Error {
    outbox_core::Error::RecordNotFound {
        kind: kind.to_string(),
        id: id.to_string(),
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
