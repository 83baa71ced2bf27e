// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Short content-derived ids for records and queue items.
//!
//! An id is `{prefix}-{8 hex}` where the hex is the start of
//! SHA-256(seed + nanosecond timestamp). Collisions with existing ids get a
//! `-2`, `-3`, ... suffix.

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::entity::EntityKind;
use crate::error::Result;

/// Prefix for queue item ids.
pub const QUEUE_ID_PREFIX: &str = "q";

/// Bytes of the digest kept in an id (two hex chars each).
const DIGEST_BYTES: usize = 4;

/// The id `seed` maps to at `at`, before collision handling.
pub fn base_id(prefix: &str, seed: &str, at: &DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(at.to_rfc3339_opts(SecondsFormat::Nanos, true).as_bytes());
    let digest = hasher.finalize();
    format!("{}-{}", prefix, hex::encode(&digest[..DIGEST_BYTES]))
}

/// A fresh id for a record of `kind`.
///
/// `exists` is asked about each candidate; its errors are returned as is.
pub fn record_id<F>(kind: EntityKind, seed: &str, at: &DateTime<Utc>, exists: F) -> Result<String>
where
    F: FnMut(&str) -> Result<bool>,
{
    first_free(base_id(kind.id_prefix(), seed, at), exists)
}

/// A fresh id for a queue item.
pub fn queue_item_id<F>(seed: &str, at: &DateTime<Utc>, exists: F) -> Result<String>
where
    F: FnMut(&str) -> Result<bool>,
{
    first_free(base_id(QUEUE_ID_PREFIX, seed, at), exists)
}

fn first_free<F>(base: String, mut exists: F) -> Result<String>
where
    F: FnMut(&str) -> Result<bool>,
{
    if !exists(&base)? {
        return Ok(base);
    }
    let mut suffix = 2u32;
    loop {
        let candidate = format!("{base}-{suffix}");
        if !exists(&candidate)? {
            return Ok(candidate);
        }
        suffix += 1;
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
