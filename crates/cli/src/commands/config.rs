// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `courier config ...` commands.

use serde_json::json;
use std::path::Path;

use crate::client::DaemonClient;

pub async fn get(socket_path: &Path) -> anyhow::Result<()> {
    let client = DaemonClient::connect(socket_path).await?;
    let config = client.request("config.get", json!(null)).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_default()
    );
    Ok(())
}

/// Returns whether the configuration validated cleanly.
pub async fn validate(socket_path: &Path) -> anyhow::Result<bool> {
    let client = DaemonClient::connect(socket_path).await?;
    let result = client.request("config.validate", json!(null)).await?;

    let valid = result["valid"].as_bool().unwrap_or(false);
    if valid {
        println!("configuration valid");
    } else {
        eprintln!("configuration invalid:");
        for issue in result["issues"].as_array().cloned().unwrap_or_default() {
            eprintln!("  - {}", issue.as_str().unwrap_or("?"));
        }
    }
    Ok(valid)
}
