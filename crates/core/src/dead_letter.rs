// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Log of queue items the processor gave up on.
//!
//! An item lands here when its retries are exhausted or, when configured,
//! when the remote rejects it outright. Entries can be inspected, cleared,
//! or taken back out to be requeued.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::jsonl;
use crate::queue::QueueItem;

/// Why an item was dropped from the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DropReason {
    RetriesExhausted {
        attempts: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last_error: Option<String>,
    },
    Rejected {
        message: String,
    },
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::RetriesExhausted {
                attempts,
                last_error: Some(e),
            } => write!(f, "gave up after {attempts} attempts: {e}"),
            DropReason::RetriesExhausted { attempts, .. } => {
                write!(f, "gave up after {attempts} attempts")
            }
            DropReason::Rejected { message } => write!(f, "rejected: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub item: QueueItem,
    #[serde(flatten)]
    pub reason: DropReason,
    pub dropped_at: DateTime<Utc>,
}

/// Append-only JSONL log of dead letters.
#[derive(Debug, Clone)]
pub struct DeadLetterLog {
    path: PathBuf,
    lock_path: PathBuf,
}

impl DeadLetterLog {
    pub fn open(path: &Path) -> Result<Self> {
        OpenOptions::new().create(true).append(true).open(path)?;
        Ok(DeadLetterLog {
            path: path.to_path_buf(),
            lock_path: jsonl::sibling_path(path, ".lock"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records a dropped item.
    pub fn append(&self, item: QueueItem, reason: DropReason) -> Result<DeadLetter> {
        let letter = DeadLetter {
            item,
            reason,
            dropped_at: Utc::now(),
        };
        jsonl::with_exclusive_lock(&self.lock_path, || jsonl::append(&self.path, &letter))?;
        Ok(letter)
    }

    pub fn read_all(&self) -> Result<Vec<DeadLetter>> {
        jsonl::with_exclusive_lock(&self.lock_path, || jsonl::read_all(&self.path))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read_all()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Discards every entry. Returns how many were removed.
    pub fn clear(&self) -> Result<usize> {
        Ok(self.take_all()?.len())
    }

    /// Hands every entry, oldest first, to `f` and removes the ones it
    /// accepted. Returns how many were removed.
    ///
    /// Stops at the first error; that entry and all later ones stay in the
    /// log.
    pub fn take_each<F>(&self, mut f: F) -> Result<usize>
    where
        F: FnMut(&DeadLetter) -> Result<()>,
    {
        jsonl::with_exclusive_lock(&self.lock_path, || {
            let letters: Vec<DeadLetter> = jsonl::read_all(&self.path)?;
            for (index, letter) in letters.iter().enumerate() {
                if let Err(e) = f(letter) {
                    if index > 0 {
                        jsonl::write_all(&self.path, &letters[index..])?;
                    }
                    return Err(e);
                }
            }
            if !letters.is_empty() {
                jsonl::write_all::<DeadLetter>(&self.path, &[])?;
            }
            Ok(letters.len())
        })
    }

    /// Removes and returns every entry, oldest first.
    pub fn take_all(&self) -> Result<Vec<DeadLetter>> {
        jsonl::with_exclusive_lock(&self.lock_path, || {
            let letters: Vec<DeadLetter> = jsonl::read_all(&self.path)?;
            if !letters.is_empty() {
                jsonl::write_all::<DeadLetter>(&self.path, &[])?;
            }
            Ok(letters)
        })
    }
}

#[cfg(test)]
#[path = "dead_letter_tests.rs"]
mod tests;
