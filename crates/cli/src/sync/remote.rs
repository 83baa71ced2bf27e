// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client side of the remote persistence service.
//!
//! Provides a trait-based remote so that:
//! - Production code talks to the service over a WebSocket
//! - Tests substitute an in-memory fake

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use outbox_core::protocol::{ClientMessage, RemoteRequest, ServerMessage};

/// Why a remote write did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Network or server failure. Worth retrying.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote refused the write. Sending it again will not help.
    #[error("rejected by remote: {0}")]
    Rejected(String),

    /// No answer within the request timeout.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The queued payload could not be turned into a request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl RemoteError {
    /// True for failures that no amount of retrying will fix.
    pub fn is_permanent(&self) -> bool {
        matches!(self, RemoteError::Rejected(_) | RemoteError::InvalidRequest(_))
    }
}

/// Result type for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// A remote persistence service that applies one write at a time.
///
/// Implementations must be all-or-nothing per call: `Ok` means the write
/// was applied, any error means it was not (or its outcome is unknown).
pub trait Remote: Send + Sync + 'static {
    fn apply(
        &self,
        request: RemoteRequest,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<()>> + Send + '_>>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Internal WebSocket connection wrapper.
struct WebSocketConnection {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

/// [`Remote`] over a lazily opened WebSocket connection.
///
/// The connection is opened on first use and dropped after any transport
/// failure or timeout, so the next write reconnects.
pub struct WebSocketRemote {
    url: String,
    connect_timeout: Duration,
    request_timeout: Duration,
    next_request_id: AtomicU64,
    conn: Mutex<Option<WebSocketConnection>>,
}

impl WebSocketRemote {
    pub fn new(url: impl Into<String>, connect_timeout: Duration, request_timeout: Duration) -> Self {
        WebSocketRemote {
            url: url.into(),
            connect_timeout,
            request_timeout,
            next_request_id: AtomicU64::new(1),
            conn: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Closes the connection, if open.
    pub async fn disconnect(&self) {
        if let Some(mut conn) = self.conn.lock().await.take() {
            let _ = conn.sink.close().await;
        }
    }

    async fn connect(&self) -> RemoteResult<WebSocketConnection> {
        let connecting = tokio_tungstenite::connect_async(self.url.as_str());
        let (ws_stream, _) = tokio::time::timeout(self.connect_timeout, connecting)
            .await
            .map_err(|_| RemoteError::Timeout(self.connect_timeout))?
            .map_err(|e| RemoteError::Transport(format!("connection failed: {e}")))?;

        tracing::debug!(url = %self.url, "connected to remote");
        let (sink, stream) = ws_stream.split();
        Ok(WebSocketConnection { sink, stream })
    }
}

/// Sends one request and waits for the answer carrying its id.
async fn exchange(
    conn: &mut WebSocketConnection,
    request_id: u64,
    request: RemoteRequest,
) -> RemoteResult<()> {
    let json = ClientMessage::apply(request_id, request)
        .to_json()
        .map_err(|e| RemoteError::InvalidRequest(e.to_string()))?;

    conn.sink
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| RemoteError::Transport(format!("send failed: {e}")))?;

    loop {
        match conn.stream.next().await {
            Some(Ok(Message::Text(text))) => {
                let msg = ServerMessage::from_json(&text)
                    .map_err(|e| RemoteError::Transport(format!("bad response: {e}")))?;
                match msg {
                    ServerMessage::Applied { request_id: id } if id == request_id => return Ok(()),
                    ServerMessage::Rejected {
                        request_id: id,
                        reason,
                    } if id == request_id => return Err(RemoteError::Rejected(reason)),
                    ServerMessage::Error { message } => {
                        return Err(RemoteError::Transport(format!("server error: {message}")))
                    }
                    // Stale answers to earlier, timed-out requests
                    _ => continue,
                }
            }
            Some(Ok(Message::Close(_))) | None => {
                return Err(RemoteError::Transport("connection closed".to_string()))
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(RemoteError::Transport(format!("receive failed: {e}"))),
        }
    }
}

impl Remote for WebSocketRemote {
    fn apply(
        &self,
        request: RemoteRequest,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<()>> + Send + '_>> {
        Box::pin(async move {
            let mut guard = self.conn.lock().await;
            let mut conn = match guard.take() {
                Some(conn) => conn,
                None => self.connect().await?,
            };

            let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
            let table = request.table.clone();
            let op = request.op_name();
            let result = tokio::time::timeout(
                self.request_timeout,
                exchange(&mut conn, request_id, request),
            )
            .await
            .unwrap_or(Err(RemoteError::Timeout(self.request_timeout)));

            match &result {
                // The connection is still usable after an answer
                Ok(()) | Err(RemoteError::Rejected(_)) => *guard = Some(conn),
                Err(e) => tracing::debug!(%table, op, error = %e, "dropping remote connection"),
            }
            result
        })
    }
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
