// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! outbox-core: Shared library for the outbox sync client and remote
//!
//! This crate provides the entity model, the durable record store, the
//! persistent sync queue and dead-letter log, and the wire protocol used by
//! both the outbox CLI and the outbox-remote server.

pub mod dead_letter;
pub mod entity;
pub mod error;
pub mod id;
pub mod jsonl;
pub mod protocol;
pub mod queue;
pub mod store;

pub use dead_letter::{DeadLetter, DeadLetterLog, DropReason};
pub use entity::{
    Calculation, ChecklistItem, ChecklistProgress, EntityData, EntityKind, Favorite, Record,
    SavedSearch, SyncAction,
};
pub use error::{Error, Result, StorageError};
pub use protocol::{ClientMessage, RemoteOp, RemoteRequest, Row, ServerMessage};
pub use queue::{DrainLock, LockedQueue, QueueItem, SyncQueue};
pub use store::Store;
