// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

mod common;
use common::*;

#[test]
fn new_records_and_queues() {
    let temp = init_temp();
    let id = create(&temp, "favorite", &favorite_json("pine-flat"));
    assert!(id.starts_with("fav-"));

    outbox()
        .arg("list")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(id.as_str()))
        .stdout(predicate::str::contains("campground:pine-flat"));

    outbox()
        .arg("queue")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains(id.as_str()));
}

#[test]
fn new_reads_payload_from_stdin() {
    let temp = init_temp();
    outbox()
        .args(["new", "search", "-"])
        .write_stdin(r#"{"name":"Lakes","query":"lake view"}"#)
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Recorded search search-"));
}

#[test]
fn new_rejects_unknown_kind() {
    let temp = init_temp();
    outbox()
        .args(["new", "widget", "{}"])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("widget"));
}

#[test]
fn new_rejects_invalid_payload() {
    let temp = init_temp();
    outbox()
        .args(["new", "checklist", r#"{"checklist_id":"departure","progress":120}"#])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("progress"));

    outbox()
        .arg("queue")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Queue is empty"));
}

#[test]
fn edit_and_rm_queue_in_order() {
    let temp = init_temp();
    let id = create(&temp, "search", r#"{"name":"Lakes"}"#);

    outbox()
        .args(["edit", "search", &id, r#"{"name":"Rivers"}"#])
        .current_dir(temp.path())
        .assert()
        .success();
    outbox()
        .args(["rm", "search", &id])
        .current_dir(temp.path())
        .assert()
        .success();

    let output = outbox()
        .args(["queue", "-o", "json"])
        .current_dir(temp.path())
        .output()
        .unwrap();
    let items: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let actions: Vec<_> = items
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["action"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(actions, vec!["create", "update", "delete"]);

    outbox()
        .args(["list", "search"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No records"));
}

#[test]
fn edit_missing_record_fails() {
    let temp = init_temp();
    outbox()
        .args(["edit", "search", "search-nope", r#"{"name":"x"}"#])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "search record not found: search-nope",
        ));
}

#[test]
fn list_json() {
    let temp = init_temp();
    create(
        &temp,
        "calculation",
        r#"{"name":"Loop","inputs":{"miles":420}}"#,
    );

    let output = outbox()
        .args(["list", "-o", "json"])
        .current_dir(temp.path())
        .output()
        .unwrap();
    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(records[0]["kind"], "calculation");
    assert_eq!(records[0]["synced"], false);
    assert_eq!(records[0]["data"]["inputs"]["miles"], 420.0);
}
