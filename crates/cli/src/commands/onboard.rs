// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `courier onboard ...` commands.

use serde_json::json;
use std::path::Path;

use crate::client::DaemonClient;

pub async fn status(socket_path: &Path) -> anyhow::Result<()> {
    let client = DaemonClient::connect(socket_path).await?;
    let status = client.request("onboard.status", json!(null)).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&status).unwrap_or_default()
    );
    Ok(())
}

pub async fn execute(socket_path: &Path) -> anyhow::Result<()> {
    let client = DaemonClient::connect(socket_path).await?;
    let result = client.request("onboard.execute", json!(null)).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&result).unwrap_or_default()
    );
    Ok(())
}
