// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

#![allow(clippy::unwrap_used)]

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;
use tokio::sync::Semaphore;

use outbox_core::entity::{ChecklistProgress, Favorite, SavedSearch};
use outbox_core::protocol::RemoteRequest;
use outbox_core::{DeadLetterLog, EntityData, QueueItem, Store, SyncAction, SyncQueue};

use super::backoff::Backoff;
use super::connectivity::ManualConnectivity;
use super::remote::{Remote, RemoteError, RemoteResult};
use super::service::{SyncConfig, SyncService};

/// A failure rule: requests whose JSON contains `needle` fail with `error`.
struct Rule {
    needle: String,
    error: RemoteError,
    remaining: Option<u32>,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<RemoteRequest>,
    rules: Vec<Rule>,
}

/// In-memory remote that records every request and fails on demand.
///
/// Clones share state, so a test can keep one clone for inspection after
/// handing another to the service.
#[derive(Clone, Default)]
pub struct FakeRemote {
    state: Arc<Mutex<FakeState>>,
    gate: Option<Arc<Semaphore>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// A remote whose calls block until [`FakeRemote::release`] is called.
    pub fn gated() -> Self {
        FakeRemote {
            state: Arc::default(),
            gate: Some(Arc::new(Semaphore::new(0))),
        }
    }

    /// Lets `n` blocked calls through.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Every request whose JSON contains `needle` fails with `error`.
    pub fn fail_matching(&self, needle: &str, error: RemoteError) {
        self.state.lock().unwrap().rules.push(Rule {
            needle: needle.to_string(),
            error,
            remaining: None,
        });
    }

    /// The next `times` requests containing `needle` fail with `error`.
    pub fn fail_times(&self, needle: &str, times: u32, error: RemoteError) {
        self.state.lock().unwrap().rules.push(Rule {
            needle: needle.to_string(),
            error,
            remaining: Some(times),
        });
    }

    pub fn calls(&self) -> Vec<RemoteRequest> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    /// Values of the `id` column (row or filter) of every call, in order.
    pub fn called_ids(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|r| {
                let json = serde_json::to_value(r).unwrap();
                let id = json
                    .get("row")
                    .or_else(|| json.get("filter"))
                    .and_then(|m| m.get("id"))
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                id.to_string()
            })
            .collect()
    }

    fn outcome(&self, request: &RemoteRequest) -> RemoteResult<()> {
        let json = serde_json::to_string(request).unwrap();
        let mut state = self.state.lock().unwrap();
        state.calls.push(request.clone());
        for rule in state.rules.iter_mut() {
            if !json.contains(&rule.needle) {
                continue;
            }
            match rule.remaining {
                Some(0) => continue,
                Some(ref mut n) => *n -= 1,
                None => {}
            }
            return Err(rule.error.clone());
        }
        Ok(())
    }
}

impl Remote for FakeRemote {
    fn apply(
        &self,
        request: RemoteRequest,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<()>> + Send + '_>> {
        Box::pin(async move {
            let result = self.outcome(&request);
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            result
        })
    }
}

pub fn transport_error() -> RemoteError {
    RemoteError::Transport("connection reset".to_string())
}

/// Config with instant retries so tests don't depend on wall-clock time.
pub fn test_config() -> SyncConfig {
    SyncConfig {
        user_id: "tester".to_string(),
        backoff: Backoff::new(Duration::ZERO, Duration::ZERO),
        ..SyncConfig::default()
    }
}

/// A service over a temp directory with manually driven connectivity.
pub struct Harness {
    pub dir: TempDir,
    pub remote: FakeRemote,
    pub connectivity: Arc<ManualConnectivity>,
    pub service: SyncService<FakeRemote>,
}

impl Harness {
    pub fn new(online: bool) -> Self {
        Self::with_remote(FakeRemote::new(), online, test_config())
    }

    pub fn with_remote(remote: FakeRemote, online: bool, config: SyncConfig) -> Self {
        let dir = TempDir::new().unwrap();
        let store = Store::open(&dir.path().join("outbox.db")).unwrap();
        let queue = SyncQueue::open(&dir.path().join("queue.jsonl")).unwrap();
        let failed = DeadLetterLog::open(&dir.path().join("failed.jsonl")).unwrap();
        let connectivity = Arc::new(ManualConnectivity::new(online));
        let service = SyncService::new(
            store,
            queue,
            failed,
            remote.clone(),
            connectivity.clone(),
            config,
        );
        Harness {
            dir,
            remote,
            connectivity,
            service,
        }
    }

    pub fn queue(&self) -> SyncQueue {
        SyncQueue::open(&self.dir.path().join("queue.jsonl")).unwrap()
    }
}

pub fn favorite(item_id: &str) -> EntityData {
    EntityData::Favorite(Favorite {
        item_type: "campground".into(),
        item_id: item_id.into(),
        item_data: serde_json::json!({"name": item_id}),
    })
}

pub fn search(name: &str) -> EntityData {
    EntityData::Search(SavedSearch {
        name: name.into(),
        query: "lakes".into(),
        filters: Default::default(),
    })
}

pub fn checklist(checklist_id: &str, progress: u8) -> EntityData {
    EntityData::Checklist(ChecklistProgress {
        checklist_id: checklist_id.into(),
        items: vec![],
        progress,
    })
}

/// A queue item that was never persisted, for handler-level tests.
pub fn item(action: SyncAction, record_id: &str, entity: EntityData) -> QueueItem {
    QueueItem {
        id: format!("q-{record_id}"),
        record_id: record_id.to_string(),
        action,
        entity,
        enqueued_at: Utc::now(),
        retry_count: 0,
        not_before: None,
        last_error: None,
    }
}
