// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client: one long-lived full-duplex connection.
//!
//! Requests are matched to responses by id; notifications multiplex onto
//! a separate stream. Disconnection rejects every outstanding request.

use courier_daemon::protocol::{
    RpcError, RpcNotification, RpcRequest, RpcResponse, INVALID_OPERATION, INVALID_PARAMS,
    NOT_FOUND,
};
use courier_daemon::transport::{encode, FrameDecoder};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, oneshot};

// Timeout configuration (env vars in milliseconds)
fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Timeout for a single RPC request
pub fn timeout_request() -> Duration {
    parse_duration_ms("COURIER_TIMEOUT_REQUEST_MS").unwrap_or(Duration::from_secs(30))
}

/// Timeout for establishing the socket connection
pub fn timeout_connect() -> Duration {
    parse_duration_ms("COURIER_TIMEOUT_CONNECT_MS").unwrap_or(Duration::from_secs(5))
}

/// Polling interval while waiting for the daemon to come up
pub fn poll_interval() -> Duration {
    parse_duration_ms("COURIER_CONNECT_POLL_MS").unwrap_or(Duration::from_millis(50))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running")]
    DaemonNotRunning,

    #[error("Failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("Connection timeout")]
    ConnectTimeout,

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Not connected")]
    NotConnected,

    #[error("{}", .0.message)]
    Rpc(RpcError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Exit code category for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            ClientError::DaemonNotRunning | ClientError::DaemonStartFailed(_) => 2,
            ClientError::ConnectTimeout | ClientError::RequestTimeout => 3,
            ClientError::Rpc(e) if e.code == NOT_FOUND => 4,
            ClientError::Rpc(e) if e.code == INVALID_OPERATION || e.code == INVALID_PARAMS => 5,
            _ => 1,
        }
    }
}

struct ClientShared {
    pending: Mutex<HashMap<String, oneshot::Sender<RpcResponse>>>,
    connected: AtomicBool,
}

/// RPC client over the daemon's Unix socket.
pub struct DaemonClient {
    shared: Arc<ClientShared>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    notifications: Mutex<Option<mpsc::UnboundedReceiver<RpcNotification>>>,
    next_id: AtomicU64,
    request_timeout: Duration,
}

impl DaemonClient {
    /// Connect to an existing daemon with the default connect timeout.
    pub async fn connect(socket_path: &Path) -> Result<Self, ClientError> {
        Self::connect_with_timeout(socket_path, timeout_connect()).await
    }

    pub async fn connect_with_timeout(
        socket_path: &Path,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        if !socket_path.exists() {
            return Err(ClientError::DaemonNotRunning);
        }

        let stream = tokio::time::timeout(timeout, UnixStream::connect(socket_path))
            .await
            .map_err(|_| ClientError::ConnectTimeout)?
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotFound => {
                    ClientError::DaemonNotRunning
                }
                _ => ClientError::Io(e),
            })?;

        let (mut read_half, mut write_half) = stream.into_split();
        let shared = Arc::new(ClientShared {
            pending: Mutex::new(HashMap::new()),
            connected: AtomicBool::new(true),
        });

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        tokio::spawn(async move {
            while let Some(bytes) = outbound_rx.recv().await {
                if write_half.write_all(&bytes).await.is_err() {
                    break;
                }
            }
        });

        let (notify_tx, notify_rx) = mpsc::unbounded_channel::<RpcNotification>();
        let reader_shared = Arc::clone(&shared);
        tokio::spawn(async move {
            let mut decoder = FrameDecoder::new();
            let mut buf = [0u8; 8192];
            loop {
                match read_half.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        for frame in decoder.push(&buf[..n]) {
                            route_frame(&reader_shared, &notify_tx, frame);
                        }
                    }
                }
            }
            reader_shared.connected.store(false, Ordering::SeqCst);
            // Reject every outstanding request
            reader_shared.pending.lock().clear();
        });

        Ok(Self {
            shared,
            outbound: outbound_tx,
            notifications: Mutex::new(Some(notify_rx)),
            next_id: AtomicU64::new(1),
            request_timeout: timeout_request(),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// The multiplexed notification stream. Take once.
    pub fn notifications(&self) -> Option<mpsc::UnboundedReceiver<RpcNotification>> {
        self.notifications.lock().take()
    }

    /// Send a request and await its response.
    pub async fn request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }

        let id = format!("c-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().insert(id.clone(), tx);

        let request = RpcRequest {
            id: id.clone(),
            method: method.to_string(),
            params: if params.is_null() { None } else { Some(params) },
        };
        let bytes = encode(&request).map_err(|e| ClientError::Io(std::io::Error::other(e)))?;
        if self.outbound.send(bytes).is_err() {
            self.shared.pending.lock().remove(&id);
            return Err(ClientError::NotConnected);
        }

        let response = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(ClientError::NotConnected),
            Err(_) => {
                self.shared.pending.lock().remove(&id);
                return Err(ClientError::RequestTimeout);
            }
        };

        match (response.result, response.error) {
            (Some(result), _) => Ok(result),
            (None, Some(error)) => Err(ClientError::Rpc(error)),
            (None, None) => Ok(serde_json::Value::Null),
        }
    }
}

fn route_frame(
    shared: &ClientShared,
    notify_tx: &mpsc::UnboundedSender<RpcNotification>,
    frame: serde_json::Value,
) {
    if frame.get("id").is_some() {
        if let Ok(response) = serde_json::from_value::<RpcResponse>(frame) {
            if let Some(tx) = shared.pending.lock().remove(&response.id) {
                let _ = tx.send(response);
            }
        }
    } else if let Ok(notification) = serde_json::from_value::<RpcNotification>(frame) {
        let _ = notify_tx.send(notification);
    }
}

/// Default socket path used by the CLI, matching the daemon's resolution.
pub fn default_socket_path() -> PathBuf {
    courier_daemon::config::default_socket_path()
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
