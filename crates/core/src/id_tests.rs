// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::error::{Error, StorageError};
use chrono::TimeZone;
use yare::parameterized;

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap()
}

#[parameterized(
    calculation = { EntityKind::Calculation, "calc-" },
    checklist = { EntityKind::Checklist, "check-" },
    favorite = { EntityKind::Favorite, "fav-" },
    search = { EntityKind::Search, "search-" },
)]
fn record_id_uses_kind_prefix(kind: EntityKind, prefix: &str) {
    let id = record_id(kind, "seed", &noon(), |_| Ok(false)).unwrap();
    assert!(id.starts_with(prefix), "{id}");
    assert_eq!(id.len(), prefix.len() + 8);
}

#[test]
fn base_id_is_deterministic() {
    assert_eq!(
        base_id("calc", "trip", &noon()),
        base_id("calc", "trip", &noon())
    );
}

#[test]
fn base_id_distinguishes_sub_second_timestamps() {
    let a = Utc.timestamp_opt(1_700_000_000, 1_000).unwrap();
    let b = Utc.timestamp_opt(1_700_000_000, 2_000).unwrap();
    assert_ne!(base_id("q", "same", &a), base_id("q", "same", &b));
}

#[test]
fn queue_item_id_without_collision_is_base() {
    let id = queue_item_id("Test", &noon(), |_| Ok(false)).unwrap();
    assert_eq!(id, base_id(QUEUE_ID_PREFIX, "Test", &noon()));
}

#[test]
fn collisions_get_increasing_suffix() {
    let base = base_id("check", "Test", &noon());
    let taken = [base.clone(), format!("{base}-2"), format!("{base}-3")];

    let id = record_id(EntityKind::Checklist, "Test", &noon(), |id| {
        Ok(taken.iter().any(|t| t == id))
    })
    .unwrap();

    assert_eq!(id, format!("{base}-4"));
}

#[test]
fn lookup_failure_is_returned() {
    let err = record_id(EntityKind::Favorite, "Test", &noon(), |_| {
        Err(Error::StorageUnavailable(StorageError::Io(
            std::io::Error::other("disk gone"),
        )))
    })
    .unwrap_err();
    assert!(err.is_storage_unavailable());
}
