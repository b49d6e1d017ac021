// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `courier logs`: stream daemon log events over the logs subscription.

use anyhow::bail;
use serde_json::json;
use std::path::Path;

use crate::client::{ClientError, DaemonClient};

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub async fn follow(socket_path: &Path, level: Option<&str>) -> anyhow::Result<()> {
    if let Some(level) = level {
        if !LEVELS.contains(&level) {
            bail!("unknown log level: {level} (expected one of {})", LEVELS.join("|"));
        }
    }

    let client = DaemonClient::connect(socket_path).await?;
    let mut notifications = client.notifications().ok_or(ClientError::NotConnected)?;

    let params = match level {
        Some(level) => json!({"level": level}),
        None => json!(null),
    };
    client.request("subscribe.logs", params).await?;

    eprintln!("streaming daemon logs (ctrl-c to stop)");
    while let Some(notification) = notifications.recv().await {
        if notification.method != "subscription.logs" {
            continue;
        }
        let p = &notification.params;
        println!(
            "{} {:5} {} {}",
            p["timestamp"].as_str().unwrap_or(""),
            p["level"].as_str().unwrap_or("?").to_uppercase(),
            p["target"].as_str().unwrap_or(""),
            p["message"].as_str().unwrap_or(""),
        );
    }
    Ok(())
}
