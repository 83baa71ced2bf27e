// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for outbox-core operations.

use thiserror::Error;

/// Underlying cause of a [`Error::StorageUnavailable`] failure.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("file: {0}")]
    Io(#[from] std::io::Error),
}

/// All possible errors that can occur in outbox-core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The local database or queue file could not be opened, read or written
    /// (missing permissions, full disk, locked file, ...).
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),

    #[error("{kind} record not found: {id}")]
    RecordNotFound { kind: String, id: String },

    #[error("invalid {kind} payload: {reason}")]
    InvalidPayload { kind: String, reason: String },

    #[error("invalid entity kind: '{0}'\n  hint: valid kinds are: calculation, checklist, favorite, search")]
    InvalidEntityKind(String),

    #[error("invalid action: '{0}'\n  hint: valid actions are: create, update, delete")]
    InvalidAction(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data: {0}")]
    CorruptedData(String),
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::StorageUnavailable(StorageError::Database(e))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::StorageUnavailable(StorageError::Io(e))
    }
}

impl Error {
    /// Returns true when the failure came from local storage rather than
    /// from the data being written.
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Error::StorageUnavailable(_))
    }
}

/// A specialized Result type for outbox-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
