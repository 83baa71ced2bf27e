// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! outboxrs - offline-first local records with durable background sync.
//!
//! This crate provides the `outbox` CLI and the sync subsystem behind it.
//! Writes are recorded in a local SQLite store and appended to a persisted
//! FIFO queue; a processor forwards them to a remote persistence service
//! whenever it is reachable.
//!
//! # Main Components
//!
//! - [`SyncService`] - The service object applications record writes through
//! - [`Config`] - Per-directory configuration (user id, remote, sync tuning)
//! - [`sync`] - Connectivity, handlers, processor, scheduler and the remote
//! - [`Error`] - Error types for all operations
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use outboxrs::sync::{Change, ManualConnectivity, SyncService};
//! use outboxrs::{find_work_dir, Config};
//!
//! let work_dir = find_work_dir()?;
//! let config = Config::load(&work_dir)?;
//! let connectivity = Arc::new(ManualConnectivity::new(true));
//! let service = SyncService::open(&work_dir, &config, connectivity)?;
//! service.start()?;
//!
//! let id = service.record(Change::Create(data))?;
//! ```

mod cli;
mod commands;

pub mod config;
pub mod error;
pub mod sync;

pub use cli::{Cli, Command, OutputFormat};
pub use config::{find_work_dir, init_work_dir, Config};
pub use error::{Error, Result};
pub use sync::SyncService;

/// Execute a CLI command. This is the main entry point for library users
/// and provides a testable way to run commands without process execution.
pub fn run(command: Command) -> Result<()> {
    match command {
        Command::Init { user, remote, path } => commands::init::run(user, remote, path),
        Command::New { kind, json, output } => commands::record::new(kind, json, output),
        Command::Edit { kind, id, json } => commands::record::edit(kind, id, json),
        Command::Rm { kind, id } => commands::record::remove(kind, id),
        Command::List {
            kind,
            unsynced,
            output,
        } => commands::list::run(kind, unsynced, output),
        Command::Queue { output } => commands::list::queue(output),
        Command::Status { output } => commands::status::status(output),
        Command::Sync { output } => commands::status::sync(output),
        Command::Daemon => commands::daemon::run(),
        Command::Failed {
            requeue,
            clear,
            output,
        } => commands::failed::run(requeue, clear, output),
    }
}
