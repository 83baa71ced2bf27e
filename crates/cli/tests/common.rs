// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// Remote that nothing listens on, so every command stays offline.
pub const UNREACHABLE_REMOTE: &str = "ws://127.0.0.1:9";

pub fn outbox() -> Command {
    cargo_bin_cmd!("outbox")
}

/// Helper to create an initialized temp directory pointing at an
/// unreachable remote.
pub fn init_temp() -> TempDir {
    let temp = TempDir::new().unwrap();
    outbox()
        .args(["init", "--user", "tester", "--remote", UNREACHABLE_REMOTE])
        .current_dir(temp.path())
        .assert()
        .success();
    temp
}

/// Helper to record an entity and return its id.
pub fn create(temp: &TempDir, kind: &str, json: &str) -> String {
    let output = outbox()
        .args(["new", kind, json, "-o", "json"])
        .current_dir(temp.path())
        .output()
        .unwrap();
    assert!(output.status.success(), "new failed: {:?}", output);

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    value["id"].as_str().unwrap().to_string()
}

pub fn favorite_json(item_id: &str) -> String {
    format!(r#"{{"item_type":"campground","item_id":"{item_id}"}}"#)
}
