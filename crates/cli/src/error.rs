// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// All possible errors that can occur in the outboxrs library.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not initialized: run 'outbox init' first")]
    NotInitialized,

    #[error("already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("invalid user id: '{0}'\n  hint: user ids must be non-empty and contain no whitespace")]
    InvalidUserId(String),

    #[error("no tokio runtime available\n  hint: start() must be called from within an async context")]
    NoRuntime,

    #[error(transparent)]
    Core(#[from] outbox_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true when the local store or queue could not be used.
    pub fn is_storage_unavailable(&self) -> bool {
        match self {
            Error::Core(e) => e.is_storage_unavailable(),
            Error::Io(_) => true,
            _ => false,
        }
    }
}

/// A specialized Result type for outboxrs operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
