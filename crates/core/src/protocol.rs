// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol messages between the sync client and the remote.
//!
//! The protocol is simple:
//! - Client sends one `Apply` per queued operation and waits for the answer
//! - Server replies `Applied` or `Rejected` carrying the same request id

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A JSON object: a row to write or a filter to match.
pub type Row = Map<String, Value>;

/// One write against a remote table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteRequest {
    pub table: String,
    #[serde(flatten)]
    pub op: RemoteOp,
}

/// The write operation a [`RemoteRequest`] performs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RemoteOp {
    /// Insert a new row. Fails if a row with the same `id` exists.
    Insert { row: Row },

    /// Insert or replace the row matching the conflict columns.
    Upsert {
        row: Row,
        /// Columns that identify an existing row.
        on_conflict: Vec<String>,
    },

    /// Delete every row matching all filter columns.
    Delete { filter: Row },
}

impl RemoteRequest {
    pub fn insert(table: impl Into<String>, row: Row) -> Self {
        RemoteRequest {
            table: table.into(),
            op: RemoteOp::Insert { row },
        }
    }

    pub fn upsert(table: impl Into<String>, row: Row, on_conflict: &[&str]) -> Self {
        RemoteRequest {
            table: table.into(),
            op: RemoteOp::Upsert {
                row,
                on_conflict: on_conflict.iter().map(|c| c.to_string()).collect(),
            },
        }
    }

    pub fn delete(table: impl Into<String>, filter: Row) -> Self {
        RemoteRequest {
            table: table.into(),
            op: RemoteOp::Delete { filter },
        }
    }

    /// Short name of the operation, for logging.
    pub fn op_name(&self) -> &'static str {
        match self.op {
            RemoteOp::Insert { .. } => "insert",
            RemoteOp::Upsert { .. } => "upsert",
            RemoteOp::Delete { .. } => "delete",
        }
    }
}

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Apply one write.
    ///
    /// The server answers with `Applied` or `Rejected` for the same id.
    Apply {
        request_id: u64,
        request: RemoteRequest,
    },

    /// Ping message for keepalive.
    Ping {
        /// Client-chosen ID echoed in Pong.
        id: u64,
    },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The write was applied and journaled.
    Applied { request_id: u64 },

    /// The write was refused and will never succeed as sent.
    Rejected { request_id: u64, reason: String },

    /// Pong response to client Ping.
    Pong {
        /// Echoed from the Ping message.
        id: u64,
    },

    /// Error not tied to a request (e.g. an unparseable message).
    Error {
        /// Human-readable error description.
        message: String,
    },
}

impl ClientMessage {
    /// Creates an Apply message.
    pub fn apply(request_id: u64, request: RemoteRequest) -> Self {
        ClientMessage::Apply {
            request_id,
            request,
        }
    }

    /// Creates a Ping message.
    pub fn ping(id: u64) -> Self {
        ClientMessage::Ping { id }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    pub fn applied(request_id: u64) -> Self {
        ServerMessage::Applied { request_id }
    }

    pub fn rejected(request_id: u64, reason: impl Into<String>) -> Self {
        ServerMessage::Rejected {
            request_id,
            reason: reason.into(),
        }
    }

    /// Creates a Pong message.
    pub fn pong(id: u64) -> Self {
        ServerMessage::Pong { id }
    }

    /// Creates an Error message.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// The request this message answers, if any.
    pub fn request_id(&self) -> Option<u64> {
        match self {
            ServerMessage::Applied { request_id } | ServerMessage::Rejected { request_id, .. } => {
                Some(*request_id)
            }
            ServerMessage::Pong { .. } | ServerMessage::Error { .. } => None,
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
