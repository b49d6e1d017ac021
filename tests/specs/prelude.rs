//! Shared fixtures for daemon specs.

#![allow(dead_code)]

use chrono::Utc;
use courier_core::fake::{FakeChannel, FakeCoordinator, FakeModelFactory};
use courier_core::{Author, Destination, EventOrigin, InboundEvent, MessageContent};
use courier_daemon::config::DaemonConfig;
use courier_daemon::daemon::{Daemon, DaemonDeps, StopRequest};
use courier_daemon::protocol::{RpcRequest, RpcResponse};
use courier_daemon::shutdown::ShutdownMode;
use courier_daemon::transport::{encode, FrameDecoder};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

pub struct Harness {
    pub daemon: Arc<Daemon>,
    pub coordinator: FakeCoordinator,
    pub channel: Arc<FakeChannel>,
    pub factory: Arc<FakeModelFactory>,
    pub dir: TempDir,
}

pub fn test_config(dir: &Path) -> DaemonConfig {
    DaemonConfig {
        data_dir: dir.to_path_buf(),
        socket_path: dir.join("daemon.sock"),
        guidance_dir: dir.join("guidance"),
        lock_path: dir.join("daemon.pid"),
        version_path: dir.join("daemon.version"),
        log_path: dir.join("courierd.log"),
        conversations_path: dir.join("conversations.json"),
        last_active_path: dir.join("last-active.json"),
        log_level: "info".to_string(),
        default_model: Some("acme/large".to_string()),
        pulse: None,
        destinations: Default::default(),
    }
}

impl Harness {
    pub async fn start() -> Self {
        let dir = TempDir::new().unwrap();
        Self::start_with(dir, |config| config).await
    }

    pub async fn start_with(
        dir: TempDir,
        customize: impl FnOnce(DaemonConfig) -> DaemonConfig,
    ) -> Self {
        let config = customize(test_config(dir.path()));
        let coordinator = FakeCoordinator::new();
        let channel = FakeChannel::new("tg1");
        let factory = Arc::new(FakeModelFactory::new());

        let channel_dyn: Arc<dyn courier_core::Channel> = channel.clone();
        let daemon = Daemon::new(DaemonDeps {
            config,
            coordinator: Arc::new(coordinator.clone()),
            channels: vec![channel_dyn],
            model_factory: Some(factory.clone()),
            adapter_factory: Some(factory.clone()),
            tools: None,
            app_config: None,
            onboarding: None,
            slash_commands: Vec::new(),
            log_fanout: None,
        });
        daemon.start().await.unwrap();

        Self {
            daemon,
            coordinator,
            channel,
            factory,
            dir,
        }
    }

    pub async fn stop(&self) {
        self.daemon
            .stop(StopRequest {
                mode: ShutdownMode::Graceful,
                timeout_ms: None,
            })
            .await
            .unwrap();
    }

    /// Shut down but keep the temp dir for a successor daemon.
    pub async fn stop_keep_dir(self) -> TempDir {
        self.stop().await;
        self.dir
    }

    pub async fn client(&self) -> SpecClient {
        SpecClient::connect(&self.daemon.config().socket_path).await
    }
}

/// Wait until `cond` holds, or panic after ~2 seconds.
pub async fn eventually(cond: impl Fn() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

pub fn text_event(channel: &str, user: &str, text: &str) -> InboundEvent {
    InboundEvent::MessageReceived {
        origin: EventOrigin::new(Destination::new(channel, user)),
        author: Author::new(user),
        timestamp: Utc::now(),
        content: MessageContent::Text {
            text: text.to_string(),
        },
        message_id: None,
    }
}

/// Minimal socket-level RPC client for the specs.
pub struct SpecClient {
    stream: UnixStream,
    decoder: FrameDecoder,
    pending: Vec<serde_json::Value>,
    next_id: u64,
}

impl SpecClient {
    pub async fn connect(socket_path: &Path) -> Self {
        let stream = UnixStream::connect(socket_path).await.unwrap();
        Self {
            stream,
            decoder: FrameDecoder::new(),
            pending: Vec::new(),
            next_id: 0,
        }
    }

    pub async fn request(&mut self, method: &str, params: serde_json::Value) -> RpcResponse {
        self.next_id += 1;
        let id = format!("spec-{}", self.next_id);
        let request = RpcRequest {
            id: id.clone(),
            method: method.to_string(),
            params: if params.is_null() { None } else { Some(params) },
        };
        self.stream
            .write_all(&encode(&request).unwrap())
            .await
            .unwrap();

        loop {
            let frame = self.next_frame().await;
            if frame.get("id").and_then(|v| v.as_str()) == Some(id.as_str()) {
                return serde_json::from_value(frame).unwrap();
            }
        }
    }

    pub async fn notification(&mut self, method: &str) -> serde_json::Value {
        loop {
            let frame = self.next_frame().await;
            if frame.get("method").and_then(|v| v.as_str()) == Some(method) {
                return frame["params"].clone();
            }
        }
    }

    async fn next_frame(&mut self) -> serde_json::Value {
        loop {
            if !self.pending.is_empty() {
                return self.pending.remove(0);
            }
            let mut buf = [0u8; 4096];
            let n = tokio::time::timeout(Duration::from_secs(2), self.stream.read(&mut buf))
                .await
                .expect("read timeout")
                .unwrap();
            assert!(n > 0, "server closed the connection");
            self.pending.extend(self.decoder.push(&buf[..n]));
        }
    }
}
