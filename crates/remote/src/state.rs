// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Server state management.
//!
//! Holds one in-memory table per entity kind. Every applied write is first
//! appended to a JSONL journal, which is replayed on startup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use outbox_core::jsonl;
use outbox_core::protocol::{RemoteOp, RemoteRequest, Row};
use outbox_core::{EntityKind, Result};

/// Result of applying one write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// The write can never succeed as sent.
    Rejected(String),
}

type Tables = BTreeMap<String, Vec<Row>>;

/// Shared server state containing the tables and their journal.
#[derive(Clone)]
pub struct ServerState {
    inner: Arc<ServerStateInner>,
}

struct ServerStateInner {
    /// Rows per table; journal appends happen under the same lock.
    tables: Mutex<Tables>,
    journal_path: PathBuf,
}

fn empty_tables() -> Tables {
    EntityKind::ALL
        .iter()
        .map(|kind| (kind.table().to_string(), Vec::new()))
        .collect()
}

fn matches(row: &Row, filter: &Row) -> bool {
    filter.iter().all(|(column, value)| row.get(column) == Some(value))
}

/// What applying a write would do to the current tables.
#[derive(Debug, PartialEq, Eq)]
enum Check {
    Apply,
    /// The exact row is already present; a client resent a write whose
    /// acknowledgement it never saw.
    AlreadyApplied,
    Reject(String),
}

/// Checks a write against the current tables without changing them.
fn check(tables: &Tables, request: &RemoteRequest) -> Check {
    let Some(rows) = tables.get(&request.table) else {
        return Check::Reject(format!("unknown table '{}'", request.table));
    };
    match &request.op {
        RemoteOp::Insert { row } => {
            let Some(id) = row.get("id") else {
                return Check::Reject("insert without an id column".to_string());
            };
            match rows.iter().find(|r| r.get("id") == Some(id)) {
                None => Check::Apply,
                Some(existing) if existing == row => Check::AlreadyApplied,
                Some(_) => {
                    Check::Reject(format!("duplicate id {} in '{}'", id, request.table))
                }
            }
        }
        RemoteOp::Upsert { row, on_conflict } => {
            if on_conflict.is_empty() {
                return Check::Reject("upsert without conflict columns".to_string());
            }
            match on_conflict.iter().find(|c| !row.contains_key(c.as_str())) {
                Some(c) => Check::Reject(format!("upsert row is missing conflict column '{}'", c)),
                None => Check::Apply,
            }
        }
        RemoteOp::Delete { filter } if filter.is_empty() => {
            Check::Reject("delete without a filter".to_string())
        }
        RemoteOp::Delete { .. } => Check::Apply,
    }
}

/// Applies a checked write.
fn apply_unchecked(tables: &mut Tables, request: &RemoteRequest) {
    let Some(rows) = tables.get_mut(&request.table) else {
        return;
    };
    match &request.op {
        RemoteOp::Insert { row } => rows.push(row.clone()),
        RemoteOp::Upsert { row, on_conflict } => {
            let key: Row = on_conflict
                .iter()
                .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
                .collect();
            match rows.iter_mut().find(|r| matches(r, &key)) {
                Some(existing) => *existing = row.clone(),
                None => rows.push(row.clone()),
            }
        }
        RemoteOp::Delete { filter } => rows.retain(|r| !matches(r, filter)),
    }
}

impl ServerState {
    /// Creates the state for the given data directory, replaying its journal.
    pub fn new(data_dir: &Path) -> Result<Self> {
        let journal_path = data_dir.join("journal.jsonl");
        let mut tables = empty_tables();

        let journal: Vec<RemoteRequest> = jsonl::read_all(&journal_path)?;
        for request in &journal {
            match check(&tables, request) {
                Check::Apply => apply_unchecked(&mut tables, request),
                Check::AlreadyApplied => {}
                Check::Reject(reason) => {
                    warn!(table = %request.table, %reason, "skipping journal entry")
                }
            }
        }

        Ok(ServerState {
            inner: Arc::new(ServerStateInner {
                tables: Mutex::new(tables),
                journal_path,
            }),
        })
    }

    /// Applies one write. Storage errors leave the tables unchanged.
    ///
    /// Resending an insert that is already present is acknowledged as
    /// applied without journaling it again.
    pub async fn apply(&self, request: &RemoteRequest) -> Result<Outcome> {
        let mut tables = self.inner.tables.lock().await;
        match check(&tables, request) {
            Check::Apply => {}
            Check::AlreadyApplied => {
                debug!(table = %request.table, "insert already applied");
                return Ok(Outcome::Applied);
            }
            Check::Reject(reason) => return Ok(Outcome::Rejected(reason)),
        }
        jsonl::append(&self.inner.journal_path, request)?;
        apply_unchecked(&mut tables, request);
        Ok(Outcome::Applied)
    }

    /// Snapshot of a table's rows, in insertion order.
    pub async fn rows(&self, table: &str) -> Vec<Row> {
        self.inner
            .tables
            .lock()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Total rows across all tables.
    pub async fn row_count(&self) -> usize {
        self.inner.tables.lock().await.values().map(Vec::len).sum()
    }
}
