// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline-first write forwarding to the remote persistence service.
//!
//! # Architecture
//!
//! ```text
//!  record() ──► Store (synced = false)
//!     │
//!     └──────► SyncQueue ──► Processor ──► Handlers ──► Remote
//!                  ▲              │                       │
//!                  │              ▼                       ▼
//!             Scheduler      DeadLetterLog          mark_synced
//!                  ▲
//!         ConnectivityProvider
//! ```
//!
//! # Features
//!
//! - Durable local records and a persisted FIFO queue
//! - Single-flight drains, within and across processes
//! - Bounded retries with exponential backoff and jitter
//! - Failed log for items that will not be retried
//! - Injectable remote and connectivity for testing

mod backoff;
mod connectivity;
mod handlers;
mod processor;
mod remote;
mod scheduler;
mod service;

pub use backoff::Backoff;
pub use connectivity::{
    on_change, probe_address, ConnectivityProvider, ManualConnectivity, ProbeConnectivity,
};
pub use handlers::{
    CalculationHandler, ChecklistHandler, EntityHandler, FavoriteHandler, Handlers, RecordRef,
    SearchHandler,
};
pub use processor::{DrainMode, DrainOutcome, DrainReport};
pub use remote::{Remote, RemoteError, RemoteResult, WebSocketRemote};
pub use service::{Change, SyncConfig, SyncService, SyncStatus};

#[cfg(test)]
pub(crate) mod test_helpers;



#[cfg(test)]
mod scheduler_tests;
