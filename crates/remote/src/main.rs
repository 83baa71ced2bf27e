// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! outbox-remote: reference WebSocket endpoint for outbox clients.
//!
//! Applies table writes sent by clients, answers each with `applied` or
//! `rejected`, and journals every applied write so the tables survive a
//! restart.

mod server;
mod state;

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// outbox-remote: table endpoint for outbox sync clients
#[derive(Parser, Debug)]
#[command(name = "outbox-remote")]
#[command(about = "WebSocket table endpoint for outbox sync clients")]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, default_value = "0.0.0.0:7890")]
    bind: SocketAddr,

    /// Directory for the write journal
    #[arg(short, long, default_value = ".")]
    data: PathBuf,

    /// Enable verbose logging (overrides RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

/// `debug` when verbose, else `RUST_LOG` (default: info).
fn log_filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(args.verbose))
        .try_init()
        .map_err(|e| e as Box<dyn std::error::Error>)?;

    info!("Starting outbox-remote server");
    info!("  Bind address: {}", args.bind);
    info!("  Data directory: {}", args.data.display());

    let state = state::ServerState::new(&args.data)?;
    info!("  Rows loaded: {}", state.row_count().await);

    server::run(args.bind, state).await?;

    Ok(())
}
