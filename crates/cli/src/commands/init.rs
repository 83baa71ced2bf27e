// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{init_work_dir, write_gitignore, Config};
use crate::error::Result;
use crate::sync::{ManualConnectivity, SyncService};

pub fn run(user: String, remote: Option<String>, path: Option<String>) -> Result<()> {
    let target_path = match path {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir()?,
    };

    let (work_dir, config) = init(&target_path, user, remote)?;

    println!("Initialized outbox at {}", work_dir.display());
    println!("User: {}", config.user_id);
    println!("Remote: {}", config.remote.url);
    Ok(())
}

/// Creates `.outbox/` with its config, store, queue and failed log.
pub(crate) fn init(
    target_path: &Path,
    user: String,
    remote: Option<String>,
) -> Result<(PathBuf, Config)> {
    let mut config = Config::new(user)?;
    if let Some(url) = remote {
        config.remote.url = url;
    }

    let work_dir = init_work_dir(target_path, &config)?;
    write_gitignore(&work_dir)?;

    // Opening creates the database and the queue files
    SyncService::open(&work_dir, &config, Arc::new(ManualConnectivity::new(false)))?;

    Ok((work_dir, config))
}

#[cfg(test)]
#[path = "init_tests.rs"]
mod tests;
