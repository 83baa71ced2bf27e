// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Project configuration management.
//!
//! Configuration is stored in `.outbox/config.toml` and includes:
//! - `user_id`: the user every remote row is written for
//! - `[remote]`: where the remote persistence service lives and how long to wait for it
//! - `[sync]`: retry budget, drain interval and backoff tuning

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const WORK_DIR_NAME: &str = ".outbox";
const CONFIG_FILE_NAME: &str = "config.toml";
const STORE_FILE_NAME: &str = "outbox.db";
const QUEUE_FILE_NAME: &str = "queue.jsonl";
const FAILED_FILE_NAME: &str = "failed.jsonl";
const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Project configuration stored in `.outbox/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Owner of every record written remotely.
    pub user_id: String,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub sync: SyncSettings,
}

/// Remote persistence service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// WebSocket URL (`ws://...` or `wss://...`).
    #[serde(default = "default_url")]
    pub url: String,
    /// Max time to wait for a connection in seconds (default: 5).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Max time to wait for the answer to one write in seconds (default: 10).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// How often `outbox run` checks whether the remote is reachable (default: 15).
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
}

/// Retry and scheduling knobs for the sync processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Failed attempts before an item is moved to the failed log (default: 3).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Periodic drain interval while online in seconds (default: 300).
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Delay before the first retry in milliseconds, doubled per attempt (default: 2000).
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Upper bound for the retry delay in seconds (default: 300).
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,
    /// Move items the remote rejects straight to the failed log instead of
    /// retrying them (default: false).
    #[serde(default)]
    pub dead_letter_rejections: bool,
}

fn default_url() -> String {
    "ws://localhost:7890".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_probe_interval_secs() -> u64 {
    15
}

fn default_max_retries() -> u32 {
    3
}

fn default_interval_secs() -> u64 {
    300
}

fn default_backoff_base_ms() -> u64 {
    2_000
}

fn default_backoff_max_secs() -> u64 {
    300
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            url: default_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            probe_interval_secs: default_probe_interval_secs(),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            max_retries: default_max_retries(),
            interval_secs: default_interval_secs(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_secs: default_backoff_max_secs(),
            dead_letter_rejections: false,
        }
    }
}

impl RemoteConfig {
    /// Validates that the URL is a WebSocket URL with a host.
    ///
    /// Returns an error message if the URL is invalid.
    pub fn validate_url(&self) -> Option<String> {
        let rest = self
            .url
            .strip_prefix("ws://")
            .or_else(|| self.url.strip_prefix("wss://"));
        match rest {
            Some(rest) if !rest.is_empty() && !rest.starts_with('/') => None,
            Some(_) => Some(format!("invalid remote URL '{}': missing host", self.url)),
            None => Some(format!(
                "invalid remote URL '{}': must be ws:// or wss://",
                self.url
            )),
        }
    }
}

impl Config {
    /// Creates a config for the given user with default remote and sync settings.
    pub fn new(user_id: String) -> Result<Self> {
        if user_id.trim().is_empty() || user_id.chars().any(char::is_whitespace) {
            return Err(Error::InvalidUserId(user_id));
        }
        Ok(Config {
            user_id,
            remote: RemoteConfig::default(),
            sync: SyncSettings::default(),
        })
    }

    /// Loads configuration from the given `.outbox/` directory.
    pub fn load(work_dir: &Path) -> Result<Self> {
        let config_path = work_dir.join(CONFIG_FILE_NAME);
        let content = fs::read_to_string(&config_path)
            .map_err(|e| Error::Config(format!("failed to read config: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        if let Some(msg) = config.remote.validate_url() {
            return Err(Error::Config(msg));
        }
        Ok(config)
    }

    /// Saves configuration to the given `.outbox/` directory.
    pub fn save(&self, work_dir: &Path) -> Result<()> {
        let config_path = work_dir.join(CONFIG_FILE_NAME);
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(&config_path, content)?;
        Ok(())
    }
}

/// Find the .outbox directory by walking up from the current directory
pub fn find_work_dir() -> Result<PathBuf> {
    let mut current = std::env::current_dir()?;
    loop {
        let work_dir = current.join(WORK_DIR_NAME);
        if work_dir.join(CONFIG_FILE_NAME).is_file() {
            return Ok(work_dir);
        }
        if !current.pop() {
            return Err(Error::NotInitialized);
        }
    }
}

pub fn get_store_path(work_dir: &Path) -> PathBuf {
    work_dir.join(STORE_FILE_NAME)
}

pub fn get_queue_path(work_dir: &Path) -> PathBuf {
    work_dir.join(QUEUE_FILE_NAME)
}

pub fn get_failed_path(work_dir: &Path) -> PathBuf {
    work_dir.join(FAILED_FILE_NAME)
}

/// Initialize a new .outbox directory at the given path
pub fn init_work_dir(path: &Path, config: &Config) -> Result<PathBuf> {
    let work_dir = path.join(WORK_DIR_NAME);

    if work_dir.join(CONFIG_FILE_NAME).exists() {
        return Err(Error::AlreadyInitialized(work_dir.display().to_string()));
    }
    if let Some(msg) = config.remote.validate_url() {
        return Err(Error::Config(msg));
    }

    fs::create_dir_all(&work_dir)?;
    config.save(&work_dir)?;

    Ok(work_dir)
}

/// Write a .gitignore file to the work directory.
///
/// Local state (database, queue, failed log, lock files) is never shared.
pub fn write_gitignore(work_dir: &Path) -> Result<()> {
    let gitignore_path = work_dir.join(GITIGNORE_FILE_NAME);
    let content = "# Local records and pending sync state\n\
                   outbox.db\n\
                   *.jsonl\n\
                   *.lock\n\
                   *.drain\n";
    fs::write(&gitignore_path, content)?;
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
