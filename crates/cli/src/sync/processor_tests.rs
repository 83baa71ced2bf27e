// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the drain pass.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use crate::sync::service::Change;
use crate::sync::test_helpers::{
    checklist, favorite, search, test_config, transport_error, FakeRemote, Harness,
};
use crate::sync::Backoff;
use std::time::Duration;

fn completed(outcome: DrainOutcome) -> DrainReport {
    *outcome.report().expect("drain was skipped")
}

#[tokio::test]
async fn dispatches_in_fifo_order() {
    let h = Harness::new(false);
    let a = h.service.record(Change::Create(favorite("a"))).unwrap();
    let b = h.service.record(Change::Create(search("b"))).unwrap();
    let c = h.service.record(Change::Create(favorite("c"))).unwrap();

    h.connectivity.set_online(true);
    let report = completed(h.service.drain().await.unwrap());

    assert_eq!(report.synced, 3);
    assert_eq!(h.remote.called_ids(), vec![a, b, c]);
}

#[tokio::test]
async fn second_drain_during_first_is_skipped() {
    let remote = FakeRemote::gated();
    let h = Harness::with_remote(remote.clone(), false, test_config());
    h.service.record(Change::Create(favorite("a"))).unwrap();
    h.service.record(Change::Create(favorite("b"))).unwrap();
    h.connectivity.set_online(true);

    let first = {
        let service = h.service.clone();
        tokio::spawn(async move { service.drain().await })
    };
    while remote.call_count() == 0 {
        tokio::task::yield_now().await;
    }

    assert_eq!(h.service.drain().await.unwrap(), DrainOutcome::Skipped);
    assert!(h.service.status().unwrap().syncing);

    remote.release(2);
    let report = completed(first.await.unwrap().unwrap());
    assert_eq!(report.attempted, 2);
    assert_eq!(remote.call_count(), 2);
    assert!(!h.service.status().unwrap().syncing);
}

#[tokio::test]
async fn drain_lock_held_elsewhere_skips() {
    let h = Harness::new(false);
    h.service.record(Change::Create(favorite("a"))).unwrap();
    h.connectivity.set_online(true);

    let _held = h.queue().try_lock_drain().unwrap().unwrap();
    assert_eq!(h.service.drain().await.unwrap(), DrainOutcome::Skipped);
    assert_eq!(h.remote.call_count(), 0);
    // The in-process flag is released again
    assert!(!h.service.status().unwrap().syncing);
}

#[tokio::test]
async fn items_enqueued_mid_drain_wait_for_next_pass() {
    let remote = FakeRemote::gated();
    let h = Harness::with_remote(remote.clone(), false, test_config());
    h.service.record(Change::Create(favorite("a"))).unwrap();
    h.connectivity.set_online(true);

    let first = {
        let service = h.service.clone();
        tokio::spawn(async move { service.drain().await })
    };
    while remote.call_count() == 0 {
        tokio::task::yield_now().await;
    }
    // Enqueue directly so no background drain is triggered
    h.queue()
        .enqueue(outbox_core::SyncAction::Create, "late", favorite("late"))
        .unwrap();

    remote.release(1);
    let report = completed(first.await.unwrap().unwrap());
    assert_eq!(report.attempted, 1);

    let items = h.service.queue_items().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].record_id, "late");
}

#[tokio::test]
async fn later_items_for_failed_record_are_deferred() {
    let h = Harness::new(false);
    let id = h.service.record(Change::Create(checklist("departure", 10))).unwrap();
    h.service
        .record(Change::Update {
            id: id.clone(),
            data: checklist("departure", 60),
        })
        .unwrap();
    let other = h.service.record(Change::Create(favorite("x"))).unwrap();
    h.remote.fail_times(&id, 1, transport_error());

    h.connectivity.set_online(true);
    let report = completed(h.service.force_sync().await.unwrap());

    assert_eq!(report.attempted, 2);
    assert_eq!(report.retried, 1);
    assert_eq!(report.deferred, 1);
    assert_eq!(report.synced, 1);
    assert_eq!(h.remote.called_ids(), vec![id.clone(), other]);

    let items = h.service.queue_items().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].retry_count, 1);
    assert_eq!(items[1].retry_count, 0);
}

#[tokio::test]
async fn failure_in_the_middle_does_not_block_other_records() {
    let h = Harness::new(false);
    let first = h.service.record(Change::Create(favorite("a"))).unwrap();
    let second = h.service.record(Change::Create(search("b"))).unwrap();
    let third = h.service.record(Change::Create(checklist("c", 40))).unwrap();
    h.remote.fail_times(&second, 1, transport_error());

    h.connectivity.set_online(true);
    let report = completed(h.service.drain().await.unwrap());

    assert_eq!(report.attempted, 3);
    assert_eq!(report.synced, 2);
    assert_eq!(report.retried, 1);
    assert_eq!(h.remote.called_ids(), vec![first.clone(), second.clone(), third.clone()]);

    let items = h.service.queue_items().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].record_id, second);
    assert_eq!(items[0].retry_count, 1);

    let synced = |kind, id: &str| h.service.get(kind, id).unwrap().unwrap().synced;
    assert!(synced(EntityKind::Favorite, &first));
    assert!(!synced(EntityKind::Search, &second));
    assert!(synced(EntityKind::Checklist, &third));
}

#[tokio::test]
async fn record_marked_synced_only_after_its_last_item() {
    let remote = FakeRemote::gated();
    let h = Harness::with_remote(remote.clone(), false, test_config());
    let id = h.service.record(Change::Create(search("parks"))).unwrap();
    h.connectivity.set_online(true);

    let first = {
        let service = h.service.clone();
        tokio::spawn(async move { service.drain().await })
    };
    while remote.call_count() == 0 {
        tokio::task::yield_now().await;
    }
    // Mutate the record while its create is in flight
    h.queue()
        .enqueue(outbox_core::SyncAction::Update, &id, search("parks 2"))
        .unwrap();
    remote.release(1);
    first.await.unwrap().unwrap();

    let record = h.service.get(outbox_core::EntityKind::Search, &id).unwrap().unwrap();
    assert!(!record.synced);

    remote.release(1);
    h.service.drain().await.unwrap();
    let record = h.service.get(outbox_core::EntityKind::Search, &id).unwrap().unwrap();
    assert!(record.synced);
}

#[tokio::test]
async fn scheduled_drain_honors_backoff_but_forced_does_not() {
    let config = SyncConfig {
        backoff: Backoff::new(Duration::from_secs(60), Duration::from_secs(60)),
        ..test_config()
    };
    let h = Harness::with_remote(FakeRemote::new(), false, config);
    h.service.record(Change::Create(favorite("a"))).unwrap();
    h.remote.fail_times("campground", 1, transport_error());
    h.connectivity.set_online(true);

    let report = completed(h.service.drain().await.unwrap());
    assert_eq!(report.retried, 1);
    let item = &h.service.queue_items().unwrap()[0];
    assert!(item.not_before.unwrap() > Utc::now() + chrono::Duration::seconds(50));

    let report = completed(h.service.drain().await.unwrap());
    assert_eq!(report.attempted, 0);
    assert_eq!(report.deferred, 1);

    let report = completed(h.service.force_sync().await.unwrap());
    assert_eq!(report.synced, 1);
    assert_eq!(h.remote.call_count(), 2);
}

#[tokio::test]
async fn offline_stops_the_pass_without_consuming_retries() {
    let h = Harness::new(false);
    h.service.record(Change::Create(favorite("a"))).unwrap();
    h.service.record(Change::Create(favorite("b"))).unwrap();

    let report = completed(h.service.force_sync().await.unwrap());
    assert_eq!(report.attempted, 0);
    assert_eq!(report.deferred, 2);
    assert!(h
        .service
        .queue_items()
        .unwrap()
        .iter()
        .all(|i| i.retry_count == 0));
}

#[tokio::test]
async fn rejection_is_retried_by_default() {
    let h = Harness::new(false);
    h.service.record(Change::Create(favorite("closed-site"))).unwrap();
    h.remote
        .fail_matching("closed-site", RemoteError::Rejected("invalid row".into()));
    h.connectivity.set_online(true);

    let report = completed(h.service.force_sync().await.unwrap());
    assert_eq!(report.retried, 1);
    assert_eq!(h.service.status().unwrap().failed, 0);
}

#[tokio::test]
async fn rejection_dead_letters_immediately_when_configured() {
    let config = SyncConfig {
        dead_letter_rejections: true,
        ..test_config()
    };
    let h = Harness::with_remote(FakeRemote::new(), false, config);
    h.service.record(Change::Create(favorite("closed-site"))).unwrap();
    h.remote
        .fail_matching("closed-site", RemoteError::Rejected("invalid row".into()));
    h.connectivity.set_online(true);

    let report = completed(h.service.force_sync().await.unwrap());
    assert_eq!(report.dropped, 1);

    let failed = h.service.failed().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(
        failed[0].reason,
        DropReason::Rejected {
            message: "rejected by remote: invalid row".into()
        }
    );
    assert_eq!(failed[0].item.retry_count, 1);
}

#[tokio::test]
async fn transient_errors_never_dead_letter_early() {
    let config = SyncConfig {
        dead_letter_rejections: true,
        ..test_config()
    };
    let h = Harness::with_remote(FakeRemote::new(), false, config);
    h.service.record(Change::Create(favorite("a"))).unwrap();
    h.remote.fail_matching("campground", transport_error());
    h.connectivity.set_online(true);

    let report = completed(h.service.force_sync().await.unwrap());
    assert_eq!(report.retried, 1);
    assert_eq!(report.dropped, 0);
}

#[test]
fn retry_at_adds_delay() {
    let now = Utc::now();
    assert_eq!(
        retry_at(now, Duration::from_secs(5)),
        now + chrono::Duration::seconds(5)
    );
    assert_eq!(retry_at(now, Duration::MAX), now);
}
