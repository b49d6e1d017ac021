//! Daemon boot, status, and RPC-driven shutdown.

use crate::prelude::*;
use courier_core::Channel;
use courier_daemon::daemon::DaemonState;
use serde_json::json;

#[tokio::test]
async fn boot_exposes_status_over_rpc() {
    let h = Harness::start().await;
    let mut client = h.client().await;

    let response = client.request("daemon.status", json!(null)).await;
    let status = response.result.unwrap();
    assert_eq!(status["status"], "running");
    assert_eq!(status["channelCount"], 1);
    assert_eq!(status["version"], courier_daemon::VERSION);

    let pong = client.request("daemon.ping", json!(null)).await;
    assert_eq!(pong.result.unwrap()["pong"], true);

    h.stop().await;
}

#[tokio::test]
async fn boot_connects_registered_channels() {
    let h = Harness::start().await;
    assert!(h.channel.is_connected());
    h.stop().await;
    assert!(!h.channel.is_connected());
}

#[tokio::test]
async fn rpc_shutdown_acks_before_stopping() {
    let h = Harness::start().await;
    let mut stop_rx = h.daemon.take_stop_requests().unwrap();
    let mut client = h.client().await;

    let response = client.request("daemon.shutdown", json!({"graceful": true})).await;
    assert_eq!(response.result.unwrap()["shuttingDown"], true);

    // The controller's run loop would now drive the stop; do it here.
    let request = stop_rx.recv().await.unwrap();
    h.daemon.stop(request).await.unwrap();
    assert_eq!(h.daemon.state(), DaemonState::Stopped);
    assert!(!h.daemon.config().socket_path.exists());
}

#[tokio::test]
async fn stopping_daemon_reports_stopped_state_files_removed() {
    let h = Harness::start().await;
    let lock = h.daemon.config().lock_path.clone();
    let version = h.daemon.config().version_path.clone();
    assert!(lock.exists());
    assert!(version.exists());

    h.stop().await;
    assert!(!lock.exists());
    assert!(!version.exists());
}
