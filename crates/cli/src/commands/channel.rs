// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `courier channel ...` commands.

use serde_json::json;
use std::path::Path;

use crate::client::DaemonClient;
use crate::output::render_table;

pub async fn list(socket_path: &Path) -> anyhow::Result<()> {
    let client = DaemonClient::connect(socket_path).await?;
    let result = client.request("channel.list", json!(null)).await?;

    let channels = result["channels"].as_array().cloned().unwrap_or_default();
    if channels.is_empty() {
        println!("no channels");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = channels
        .iter()
        .map(|channel| {
            vec![
                channel["id"].as_str().unwrap_or("?").to_string(),
                if channel["connected"].as_bool().unwrap_or(false) {
                    "connected".to_string()
                } else {
                    "disconnected".to_string()
                },
            ]
        })
        .collect();
    print!("{}", render_table(&["ID", "STATE"], &rows));
    Ok(())
}

pub async fn get(socket_path: &Path, id: &str) -> anyhow::Result<()> {
    let client = DaemonClient::connect(socket_path).await?;
    let channel = client.request("channel.get", json!({"id": id})).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&channel).unwrap_or_default()
    );
    Ok(())
}

pub async fn disconnect(socket_path: &Path, id: &str) -> anyhow::Result<()> {
    let client = DaemonClient::connect(socket_path).await?;
    client
        .request("channel.disconnect", json!({"id": id}))
        .await?;
    println!("disconnected {id}");
    Ok(())
}

pub async fn reconnect(socket_path: &Path, id: &str) -> anyhow::Result<()> {
    let client = DaemonClient::connect(socket_path).await?;
    client
        .request("channel.reconnect", json!({"id": id}))
        .await?;
    println!("reconnected {id}");
    Ok(())
}
