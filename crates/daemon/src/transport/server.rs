// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unix socket server: accepts N concurrent long-lived client connections.
//!
//! Each connection gets a reader task (feeding frames to the installed
//! handler) and a writer task (serializing outbound writes in enqueue
//! order). `notify` and `send_response` are non-blocking enqueues.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::frame::{encode, FrameDecoder, FrameError};
use crate::protocol::{RpcNotification, RpcResponse};

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("server not listening")]
    NotListening,
}

/// Receives decoded frames and disconnect notices.
#[async_trait::async_trait]
pub trait FrameHandler: Send + Sync {
    async fn on_frame(&self, connection: Arc<Connection>, frame: serde_json::Value);
    async fn on_disconnect(&self, connection_id: &str);
}

/// Read-only connection bookkeeping.
#[derive(Debug, Clone)]
pub struct ConnectionMetadata {
    pub connected_at: DateTime<Utc>,
}

/// One live client connection.
pub struct Connection {
    id: String,
    metadata: ConnectionMetadata,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    closed: AtomicBool,
    // Level-triggered close signal: tasks observing it cannot miss a close
    // that lands between two polls.
    close_tx: watch::Sender<bool>,
}

impl Connection {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn metadata(&self) -> &ConnectionMetadata {
        &self.metadata
    }

    /// Enqueue a notification. Never blocks.
    pub fn notify(&self, notification: &RpcNotification) -> Result<(), TransportError> {
        self.send_frame(encode(notification)?)
    }

    /// Enqueue a response. Never blocks.
    pub fn send_response(&self, response: &RpcResponse) -> Result<(), TransportError> {
        self.send_frame(encode(response)?)
    }

    fn send_frame(&self, bytes: Vec<u8>) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed);
        }
        self.outbound
            .send(bytes)
            .map_err(|_| TransportError::ConnectionClosed)
    }

    /// Close the connection. Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.close_tx.send(true);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct ServerShared {
    connections: Mutex<HashMap<String, Arc<Connection>>>,
    shutdown: Notify,
    closed: AtomicBool,
}

/// The daemon-side transport server.
pub struct SocketServer {
    socket_path: PathBuf,
    shared: Arc<ServerShared>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl SocketServer {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            shared: Arc::new(ServerShared {
                connections: Mutex::new(HashMap::new()),
                shutdown: Notify::new(),
                closed: AtomicBool::new(false),
            }),
            accept_task: Mutex::new(None),
        }
    }

    pub fn socket_path(&self) -> &PathBuf {
        &self.socket_path
    }

    /// Bind the socket (removing any stale file) and start accepting.
    pub async fn listen(&self, handler: Arc<dyn FrameHandler>) -> Result<(), TransportError> {
        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        let listener = UnixListener::bind(&self.socket_path)
            .map_err(|e| TransportError::BindFailed(self.socket_path.clone(), e))?;

        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shared.shutdown.notified() => break,
                    result = listener.accept() => match result {
                        Ok((stream, _)) => {
                            if shared.closed.load(Ordering::SeqCst) {
                                continue;
                            }
                            spawn_connection(stream, Arc::clone(&shared), Arc::clone(&handler));
                        }
                        Err(e) => {
                            error!(error = %e, "fatal accept error, transport listener stopping");
                            break;
                        }
                    }
                }
            }
        });
        *self.accept_task.lock() = Some(task);

        Ok(())
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.shared.connections.lock().len()
    }

    pub fn get_connection(&self, id: &str) -> Option<Arc<Connection>> {
        self.shared.connections.lock().get(id).cloned()
    }

    /// Fan a notification out to every connection, swallowing per-connection
    /// write errors.
    pub fn broadcast(&self, notification: &RpcNotification) {
        let connections: Vec<Arc<Connection>> =
            self.shared.connections.lock().values().cloned().collect();
        for connection in connections {
            if let Err(e) = connection.notify(notification) {
                warn!(connection = connection.id(), error = %e, "broadcast write failed");
            }
        }
    }

    /// Stop accepting, close every connection, and unlink the socket file.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.shutdown.notify_waiters();
        if let Some(task) = self.accept_task.lock().take() {
            task.abort();
        }

        let connections: Vec<Arc<Connection>> =
            self.shared.connections.lock().drain().map(|(_, c)| c).collect();
        for connection in connections {
            connection.close();
        }

        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(path = %self.socket_path.display(), error = %e, "failed to unlink socket");
            }
        }
    }
}

fn spawn_connection(stream: UnixStream, shared: Arc<ServerShared>, handler: Arc<dyn FrameHandler>) {
    let id = format!("conn-{}", uuid::Uuid::new_v4());
    let (mut read_half, mut write_half) = stream.into_split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let (close_tx, close_rx) = watch::channel(false);

    let connection = Arc::new(Connection {
        id: id.clone(),
        metadata: ConnectionMetadata {
            connected_at: Utc::now(),
        },
        outbound: outbound_tx,
        closed: AtomicBool::new(false),
        close_tx,
    });

    shared
        .connections
        .lock()
        .insert(id.clone(), Arc::clone(&connection));
    debug!(connection = %id, "client connected");

    // Writer: serializes outbound frames in enqueue order.
    let mut writer_close = close_rx.clone();
    let writer_id = id.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = writer_close.changed() => {
                    if *writer_close.borrow() {
                        break;
                    }
                }
                maybe = outbound_rx.recv() => match maybe {
                    Some(bytes) => {
                        if let Err(e) = write_half.write_all(&bytes).await {
                            warn!(connection = %writer_id, error = %e, "write failed");
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
        let _ = write_half.shutdown().await;
    });

    // Reader: decodes frames and hands them to the handler.
    let mut reader_close = close_rx;
    tokio::spawn(async move {
        let mut decoder = FrameDecoder::new();
        let mut buf = [0u8; 8192];
        loop {
            tokio::select! {
                _ = reader_close.changed() => {
                    if *reader_close.borrow() {
                        break;
                    }
                }
                result = read_half.read(&mut buf) => match result {
                    Ok(0) => break,
                    Ok(n) => {
                        for frame in decoder.push(&buf[..n]) {
                            handler.on_frame(Arc::clone(&connection), frame).await;
                        }
                    }
                    Err(e) => {
                        debug!(connection = %id, error = %e, "read failed");
                        break;
                    }
                }
            }
        }

        connection.close();
        shared.connections.lock().remove(&id);
        handler.on_disconnect(&id).await;
        debug!(connection = %id, "client disconnected");
    });
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
