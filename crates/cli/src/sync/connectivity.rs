// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Online/offline signal for the sync scheduler.
//!
//! The scheduler only depends on [`ConnectivityProvider`]. Hosts either drive
//! a [`ManualConnectivity`] from their own platform signal, or use
//! [`ProbeConnectivity`], which checks TCP reachability of the remote.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Source of the current online state and its transitions.
pub trait ConnectivityProvider: Send + Sync + 'static {
    fn is_online(&self) -> bool;

    /// Receiver that observes every transition. The current value is marked
    /// as seen.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Calls `callback` with the new state on every transition.
///
/// The returned task ends when the provider is dropped.
pub fn on_change<P, F>(provider: &P, mut callback: F) -> JoinHandle<()>
where
    P: ConnectivityProvider + ?Sized,
    F: FnMut(bool) + Send + 'static,
{
    let mut rx = provider.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let online = *rx.borrow_and_update();
            callback(online);
        }
    })
}

/// Connectivity set explicitly by the host (or a test).
#[derive(Debug)]
pub struct ManualConnectivity {
    tx: watch::Sender<bool>,
}

impl ManualConnectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(online);
        ManualConnectivity { tx }
    }

    /// Records a platform signal. Returns true if the state changed; repeated
    /// identical signals do not notify subscribers.
    pub fn set_online(&self, online: bool) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        })
    }
}

impl ConnectivityProvider for ManualConnectivity {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Connectivity derived from whether the remote's TCP port accepts
/// connections. Starts offline until the first probe.
#[derive(Debug)]
pub struct ProbeConnectivity {
    addr: String,
    interval: Duration,
    timeout: Duration,
    state: ManualConnectivity,
    task: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

/// Extracts `host:port` from a `ws://` or `wss://` URL.
pub fn probe_address(url: &str) -> Option<String> {
    let (rest, default_port) = if let Some(rest) = url.strip_prefix("ws://") {
        (rest, 80)
    } else if let Some(rest) = url.strip_prefix("wss://") {
        (rest, 443)
    } else {
        return None;
    };

    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if authority.is_empty() {
        return None;
    }

    let has_port = match authority.rfind(']') {
        // IPv6 literal: a port can only follow the closing bracket
        Some(end) => authority[end..].contains(':'),
        None => authority.contains(':'),
    };
    if has_port {
        Some(authority.to_string())
    } else {
        Some(format!("{authority}:{default_port}"))
    }
}

impl ProbeConnectivity {
    pub fn new(addr: impl Into<String>, interval: Duration, timeout: Duration) -> Self {
        ProbeConnectivity {
            addr: addr.into(),
            interval,
            timeout,
            state: ManualConnectivity::new(false),
            task: Mutex::new(None),
        }
    }

    /// Builds a probe for the host of a WebSocket URL.
    pub fn for_url(url: &str, interval: Duration, timeout: Duration) -> Option<Self> {
        probe_address(url).map(|addr| Self::new(addr, interval, timeout))
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Checks reachability once and publishes the result.
    pub async fn probe_once(&self) -> bool {
        let online = matches!(
            tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await,
            Ok(Ok(_))
        );
        if self.state.set_online(online) {
            tracing::debug!(addr = %self.addr, online, "connectivity changed");
        }
        online
    }

    /// Starts probing in the background. No-op if already running.
    pub fn start(self: &std::sync::Arc<Self>) {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let probe = std::sync::Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                probe.probe_once().await;
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(probe.interval) => {}
                }
            }
        });
        *task = Some((cancel, handle));
    }

    /// Stops background probing. The last observed state is kept.
    pub fn stop(&self) {
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some((cancel, _handle)) = task {
            cancel.cancel();
        }
    }
}

impl ConnectivityProvider for ProbeConnectivity {
    fn is_online(&self) -> bool {
        self.state.is_online()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}
