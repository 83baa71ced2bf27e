// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use outbox_core::SyncAction;

use super::test_helpers::{favorite, Harness};
use super::Change;

/// Sleeps in small steps until `done` holds or `limit` of (paused) time passes.
async fn wait_until(limit: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if done() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    done()
}

#[tokio::test(start_paused = true)]
async fn reconnect_triggers_drain() {
    let h = Harness::new(false);
    h.service.record(Change::Create(favorite("a"))).unwrap();
    h.service.start().unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.remote.call_count(), 0);

    h.connectivity.set_online(true);

    let service = h.service.clone();
    assert!(
        wait_until(Duration::from_secs(5), || {
            service.status().unwrap().pending == 0
        })
        .await
    );
    assert_eq!(h.remote.call_count(), 1);
    h.service.stop().await;
}

#[tokio::test(start_paused = true)]
async fn drains_on_interval_while_online() {
    let h = Harness::new(true);
    let interval = h.service.config().interval;
    h.service.start().unwrap();
    // Let the startup drain run against the empty queue
    tokio::time::sleep(Duration::from_secs(1)).await;

    // Enqueue directly so no write-triggered drain runs
    h.queue()
        .enqueue(SyncAction::Create, "fav-direct", favorite("direct"))
        .unwrap();

    tokio::time::sleep(interval - Duration::from_secs(10)).await;
    assert_eq!(h.remote.call_count(), 0);

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(h.remote.call_count(), 1);
    assert_eq!(h.service.status().unwrap().pending, 0);
    h.service.stop().await;
}

#[tokio::test(start_paused = true)]
async fn startup_drain_when_already_online() {
    let h = Harness::new(true);
    h.queue()
        .enqueue(SyncAction::Create, "fav-direct", favorite("direct"))
        .unwrap();

    h.service.start().unwrap();
    let service = h.service.clone();
    assert!(
        wait_until(Duration::from_secs(5), || {
            service.status().unwrap().pending == 0
        })
        .await
    );
    h.service.stop().await;
}

#[tokio::test(start_paused = true)]
async fn no_drain_while_offline() {
    let h = Harness::new(false);
    h.service.record(Change::Create(favorite("a"))).unwrap();
    h.service.start().unwrap();

    tokio::time::sleep(h.service.config().interval * 3).await;

    assert_eq!(h.remote.call_count(), 0);
    assert_eq!(h.service.status().unwrap().pending, 1);
    h.service.stop().await;
}

#[tokio::test(start_paused = true)]
async fn going_offline_pauses_the_timer() {
    let h = Harness::new(true);
    let interval = h.service.config().interval;
    h.service.start().unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    h.connectivity.set_online(false);
    h.service.record(Change::Create(favorite("a"))).unwrap();
    tokio::time::sleep(interval * 2).await;
    assert_eq!(h.remote.call_count(), 0);

    h.connectivity.set_online(true);
    let service = h.service.clone();
    assert!(
        wait_until(Duration::from_secs(5), || {
            service.status().unwrap().pending == 0
        })
        .await
    );
    h.service.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stop_ends_scheduling() {
    let h = Harness::new(false);
    h.service.record(Change::Create(favorite("a"))).unwrap();

    h.service.start().unwrap();
    h.service.start().unwrap();
    assert!(h.service.is_running());

    h.service.stop().await;
    assert!(!h.service.is_running());

    h.connectivity.set_online(true);
    tokio::time::sleep(h.service.config().interval * 2).await;
    assert_eq!(h.remote.call_count(), 0);
    assert_eq!(h.service.status().unwrap().pending, 1);
}

#[test]
fn start_outside_runtime_fails() {
    let h = Harness::new(false);
    let err = h.service.start().unwrap_err();
    assert!(matches!(err, crate::error::Error::NoRuntime));
}
