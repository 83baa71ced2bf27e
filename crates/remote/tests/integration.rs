// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for the outbox-remote server binary.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Helper to spawn a server process and clean it up on drop.
struct ServerProcess {
    child: Child,
    port: u16,
}

impl ServerProcess {
    fn spawn(data: &Path, offset: u16) -> Self {
        // High ephemeral range, spread by pid to avoid parallel runs colliding
        let port = 49152 + (std::process::id() % 1000) as u16 * 2 + offset;

        let child = Command::new(env!("CARGO_BIN_EXE_outbox-remote"))
            .arg("--bind")
            .arg(format!("127.0.0.1:{}", port))
            .arg("--data")
            .arg(data)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn server process");

        ServerProcess { child, port }
    }

    fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    /// Connects, retrying while the process starts up.
    async fn connect(&self) -> WebSocketStream<MaybeTlsStream<TcpStream>> {
        for _ in 0..20 {
            if let Ok(Ok((stream, _))) =
                tokio::time::timeout(Duration::from_millis(500), connect_async(&self.ws_url()))
                    .await
            {
                return stream;
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        panic!("should connect to server within retries");
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

async fn exchange(
    ws: &mut WebSocketStream<MaybeTlsStream<TcpStream>>,
    msg: serde_json::Value,
) -> serde_json::Value {
    ws.send(Message::Text(msg.to_string().into()))
        .await
        .expect("send message");
    match tokio::time::timeout(Duration::from_secs(5), ws.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => serde_json::from_str(&text).unwrap(),
        other => panic!("Expected text reply, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_lifecycle() {
    let temp_dir = tempfile::tempdir().unwrap();
    let server = ServerProcess::spawn(temp_dir.path(), 0);
    let mut ws = server.connect().await;

    let reply = exchange(&mut ws, serde_json::json!({"type": "ping", "id": 12345})).await;
    assert_eq!(reply, serde_json::json!({"type": "pong", "id": 12345}));
}

#[tokio::test]
async fn test_applied_writes_survive_restart() {
    let temp_dir = tempfile::tempdir().unwrap();
    let insert = serde_json::json!({
        "type": "apply",
        "request_id": 1,
        "request": {"table": "favorites", "op": "insert", "row": {"id": "fav-1"}},
    });

    {
        let server = ServerProcess::spawn(temp_dir.path(), 1);
        let mut ws = server.connect().await;
        let reply = exchange(&mut ws, insert.clone()).await;
        assert_eq!(reply, serde_json::json!({"type": "applied", "request_id": 1}));
    }

    // After a restart the journal made the first insert stick: a resend is
    // acknowledged, a different row under the same id is not
    let server = ServerProcess::spawn(temp_dir.path(), 1);
    let mut ws = server.connect().await;
    let reply = exchange(&mut ws, insert).await;
    assert_eq!(reply, serde_json::json!({"type": "applied", "request_id": 1}));

    let conflicting = serde_json::json!({
        "type": "apply",
        "request_id": 2,
        "request": {"table": "favorites", "op": "insert", "row": {"id": "fav-1", "item_id": "b"}},
    });
    let reply = exchange(&mut ws, conflicting).await;
    assert_eq!(reply["type"], "rejected");
    assert_eq!(reply["request_id"], 2);
}
