// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent FIFO of operations waiting to be applied remotely.
//!
//! Uses JSONL format for durability - each item is written as a single line
//! and fsynced immediately. Items are removed or updated by id, so items
//! appended while a drain is running are never lost by that drain's
//! rewrites. Every mutation holds an exclusive lock on a sibling lock file.
//! [`SyncQueue::with_lock`] holds that lock across several steps, so a
//! caller can pair a queue change with a store change that no other process
//! observes half-done.

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::entity::{EntityData, EntityKind, SyncAction};
use crate::error::Result;
use crate::id::queue_item_id;
use crate::jsonl;

/// One pending remote operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Queue-local id, independent of the record id.
    pub id: String,
    /// Local record this operation was recorded for.
    pub record_id: String,
    pub action: SyncAction,
    /// Payload at the time of the operation (last known state for deletes).
    pub entity: EntityData,
    pub enqueued_at: DateTime<Utc>,
    /// Failed attempts so far.
    #[serde(default)]
    pub retry_count: u32,
    /// Earliest time a scheduled drain may attempt this item again.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl QueueItem {
    pub fn kind(&self) -> EntityKind {
        self.entity.kind()
    }

    /// True if the item's backoff window has elapsed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.not_before {
            Some(t) => t <= now,
            None => true,
        }
    }

    /// True if this item targets the given record.
    pub fn targets(&self, kind: EntityKind, record_id: &str) -> bool {
        self.kind() == kind && self.record_id == record_id
    }
}

/// Held while a drain is running; released on drop.
#[derive(Debug)]
pub struct DrainLock {
    _file: File,
}

/// The on-disk sync queue.
#[derive(Debug, Clone)]
pub struct SyncQueue {
    path: PathBuf,
    lock_path: PathBuf,
    drain_lock_path: PathBuf,
}

impl SyncQueue {
    /// Create or open a queue at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        OpenOptions::new().create(true).append(true).open(path)?;

        Ok(SyncQueue {
            path: path.to_path_buf(),
            lock_path: jsonl::sibling_path(path, ".lock"),
            drain_lock_path: jsonl::sibling_path(path, ".drain"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a new operation and returns the persisted item.
    pub fn enqueue(
        &self,
        action: SyncAction,
        record_id: &str,
        entity: EntityData,
    ) -> Result<QueueItem> {
        self.with_lock(|locked| locked.enqueue(action, record_id, entity))
    }

    /// Runs `f` while holding the queue's exclusive lock.
    ///
    /// Queue methods called on `self` inside `f` would wait on the same lock;
    /// use the [`LockedQueue`] passed to `f` instead.
    pub fn with_lock<T>(&self, f: impl FnOnce(&LockedQueue<'_>) -> Result<T>) -> Result<T> {
        jsonl::with_exclusive_lock(&self.lock_path, || f(&LockedQueue { queue: self }))
    }

    /// Appends an existing item as-is (used when requeueing dead letters).
    pub fn push(&self, item: &QueueItem) -> Result<()> {
        jsonl::with_exclusive_lock(&self.lock_path, || jsonl::append(&self.path, item))
    }

    /// Snapshot of all queued items in FIFO order.
    pub fn items(&self) -> Result<Vec<QueueItem>> {
        jsonl::with_exclusive_lock(&self.lock_path, || jsonl::read_all(&self.path))
    }

    /// Ids of all queued items in FIFO order.
    pub fn ids(&self) -> Result<Vec<String>> {
        Ok(self.items()?.into_iter().map(|i| i.id).collect())
    }

    pub fn get(&self, id: &str) -> Result<Option<QueueItem>> {
        Ok(self.items()?.into_iter().find(|i| i.id == id))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.items()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Removes the item with the given id. Returns false if it was not queued.
    pub fn remove(&self, id: &str) -> Result<bool> {
        self.rewrite(|items| {
            let before = items.len();
            items.retain(|i| i.id != id);
            items.len() != before
        })
    }

    /// Replaces the queued item with the same id, keeping its position.
    /// Returns false if it was not queued.
    pub fn update(&self, item: &QueueItem) -> Result<bool> {
        self.rewrite(|items| match items.iter_mut().find(|i| i.id == item.id) {
            Some(slot) => {
                *slot = item.clone();
                true
            }
            None => false,
        })
    }

    /// True if any item other than `except_id` targets the given record.
    pub fn has_pending_for(
        &self,
        kind: EntityKind,
        record_id: &str,
        except_id: &str,
    ) -> Result<bool> {
        self.with_lock(|locked| locked.has_pending_for(kind, record_id, except_id))
    }

    /// Tries to take the drain lock without blocking.
    ///
    /// Returns `None` if another drain (in this or another process) holds it.
    pub fn try_lock_drain(&self) -> Result<Option<DrainLock>> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.drain_lock_path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(DrainLock { _file: file })),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Applies `edit` to the full item list and persists it if `edit` reports
    /// a change.
    fn rewrite<F>(&self, edit: F) -> Result<bool>
    where
        F: FnOnce(&mut Vec<QueueItem>) -> bool,
    {
        jsonl::with_exclusive_lock(&self.lock_path, || {
            let mut items: Vec<QueueItem> = jsonl::read_all(&self.path)?;
            let changed = edit(&mut items);
            if changed {
                jsonl::write_all(&self.path, &items)?;
            }
            Ok(changed)
        })
    }
}

/// The queue while its lock is held by [`SyncQueue::with_lock`].
pub struct LockedQueue<'a> {
    queue: &'a SyncQueue,
}

impl LockedQueue<'_> {
    pub fn items(&self) -> Result<Vec<QueueItem>> {
        jsonl::read_all(&self.queue.path)
    }

    pub fn enqueue(
        &self,
        action: SyncAction,
        record_id: &str,
        entity: EntityData,
    ) -> Result<QueueItem> {
        let existing = self.items()?;
        let now = Utc::now();
        let seed = format!("{}:{}:{}", entity.kind(), record_id, action);
        let id = queue_item_id(&seed, &now, |candidate| {
            Ok(existing.iter().any(|i| i.id == candidate))
        })?;

        let item = QueueItem {
            id,
            record_id: record_id.to_string(),
            action,
            entity,
            enqueued_at: now,
            retry_count: 0,
            not_before: None,
            last_error: None,
        };
        jsonl::append(&self.queue.path, &item)?;
        Ok(item)
    }

    /// True if any item other than `except_id` targets the given record.
    pub fn has_pending_for(
        &self,
        kind: EntityKind,
        record_id: &str,
        except_id: &str,
    ) -> Result<bool> {
        Ok(self
            .items()?
            .iter()
            .any(|i| i.id != except_id && i.targets(kind, record_id)))
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
