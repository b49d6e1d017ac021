// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `courier daemon ...` and top-level daemon commands.

use serde_json::json;
use std::path::Path;

use crate::client::DaemonClient;
use crate::daemon_process::{connect_or_start, probe_socket};
use crate::output::format_elapsed_ms;

pub async fn start(socket_path: &Path) -> anyhow::Result<()> {
    if probe_socket(socket_path) {
        println!("daemon already running");
        return Ok(());
    }
    let client = connect_or_start(socket_path, None, None).await?;
    let status = client.request("daemon.status", json!(null)).await?;
    println!(
        "daemon started (version {})",
        status["version"].as_str().unwrap_or("?")
    );
    Ok(())
}

pub async fn stop(socket_path: &Path, hard: bool, timeout_ms: Option<u64>) -> anyhow::Result<()> {
    let client = DaemonClient::connect(socket_path).await?;
    let mut params = json!({"graceful": !hard});
    if let Some(timeout_ms) = timeout_ms {
        params["timeoutMs"] = json!(timeout_ms);
    }
    client.request("daemon.shutdown", params).await?;
    println!("daemon stopping");
    Ok(())
}

pub async fn status(socket_path: &Path) -> anyhow::Result<()> {
    let client = DaemonClient::connect(socket_path).await?;
    let status = client.request("daemon.status", json!(null)).await?;

    println!(
        "status:      {}",
        status["status"].as_str().unwrap_or("unknown")
    );
    println!(
        "uptime:      {}",
        format_elapsed_ms(status["uptimeMs"].as_u64().unwrap_or(0))
    );
    println!("agents:      {}", status["agentCount"]);
    println!("channels:    {}", status["channelCount"]);
    println!("connections: {}", status["connectionCount"]);
    println!(
        "version:     {}",
        status["version"].as_str().unwrap_or("?")
    );
    Ok(())
}

pub async fn ping(socket_path: &Path) -> anyhow::Result<()> {
    let client = DaemonClient::connect(socket_path).await?;
    let start = std::time::Instant::now();
    client.request("daemon.ping", json!(null)).await?;
    println!("pong ({} ms)", start.elapsed().as_millis());
    Ok(())
}

pub async fn reload(socket_path: &Path) -> anyhow::Result<()> {
    let client = DaemonClient::connect(socket_path).await?;
    client.request("daemon.reload", json!(null)).await?;
    println!("reload requested");
    Ok(())
}
