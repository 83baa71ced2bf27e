// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use clap::{Parser, Subcommand, ValueEnum};

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "outbox")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Offline-first local records with durable background sync")]
#[command(
    long_about = "Offline-first local records with durable background sync.\n\n\
    Writes land in a local database first and are forwarded to the remote \
    in order once it is reachable."
)]
#[command(after_help = "\
Get started:
  outbox init --user alice                       Initialize in the current directory
  outbox new favorite '{\"item_type\":\"campground\",\"item_id\":\"c-12\"}'
  outbox status                                  Show pending and failed counts
  outbox sync                                    Push pending writes now")]
pub struct Cli {
    /// Run as if outbox was started in <path>
    #[arg(short = 'C', long = "directory", global = true, value_name = "path")]
    pub directory: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize local storage in the current directory
    Init {
        /// User id that owns every remote row
        #[arg(long, short, value_parser = non_empty_string)]
        user: String,

        /// Remote WebSocket URL (default: ws://localhost:7890)
        #[arg(long, short)]
        remote: Option<String>,

        /// Directory to initialize (default: current directory)
        path: Option<String>,
    },

    /// Record a new entity
    #[command(after_help = "\
Kinds: calculation, checklist, favorite, search

Examples:
  outbox new search '{\"name\":\"Lakes\",\"query\":\"lake view\"}'
  outbox new checklist '{\"checklist_id\":\"departure\",\"progress\":40}'
  echo '{\"name\":\"Loop\"}' | outbox new calculation -")]
    New {
        /// Entity kind
        kind: String,

        /// JSON payload, or '-' to read it from stdin
        json: String,

        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Replace the payload of an existing record
    Edit {
        /// Entity kind
        kind: String,

        /// Record id
        id: String,

        /// JSON payload, or '-' to read it from stdin
        json: String,
    },

    /// Delete a record
    #[command(alias = "remove")]
    Rm {
        /// Entity kind
        kind: String,

        /// Record id
        id: String,
    },

    /// List local records
    #[command(alias = "ls")]
    List {
        /// Only show records of this kind
        kind: Option<String>,

        /// Only show records not yet confirmed by the remote
        #[arg(long)]
        unsynced: bool,

        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Show operations waiting to be sent, oldest first
    Queue {
        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Show sync status
    Status {
        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Send pending operations to the remote now
    Sync {
        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Keep syncing in the foreground until interrupted
    #[command(after_help = "\
Drains on start, whenever the remote becomes reachable again, and on the
configured interval while it stays reachable. Set RUST_LOG to adjust logging.")]
    #[command(alias = "run")]
    Daemon,

    /// Show or manage operations that were given up on
    Failed {
        /// Move every failed operation back to the queue
        #[arg(long, conflicts_with = "clear")]
        requeue: bool,

        /// Discard every failed operation
        #[arg(long)]
        clear: bool,

        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
