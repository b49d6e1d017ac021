// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `courier agent ...` commands.

use serde_json::json;
use std::path::Path;

use crate::client::{ClientError, DaemonClient};
use crate::output::render_table;

pub async fn list(socket_path: &Path) -> anyhow::Result<()> {
    let client = DaemonClient::connect(socket_path).await?;
    let result = client.request("agent.list", json!(null)).await?;

    let agents = result["agents"].as_array().cloned().unwrap_or_default();
    if agents.is_empty() {
        println!("no agents");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = agents
        .iter()
        .map(|agent| {
            vec![
                agent["id"].as_str().unwrap_or("?").to_string(),
                agent["status"].as_str().unwrap_or("?").to_string(),
                agent["tags"]
                    .as_array()
                    .map(|tags| {
                        tags.iter()
                            .filter_map(|t| t.as_str())
                            .collect::<Vec<_>>()
                            .join(",")
                    })
                    .unwrap_or_default(),
            ]
        })
        .collect();
    print!("{}", render_table(&["ID", "STATUS", "TAGS"], &rows));
    Ok(())
}

pub async fn get(socket_path: &Path, id: &str) -> anyhow::Result<()> {
    let client = DaemonClient::connect(socket_path).await?;
    let agent = client.request("agent.get", json!({"id": id})).await?;
    println!("{}", serde_json::to_string_pretty(&agent).unwrap_or_default());
    Ok(())
}

pub async fn spawn(
    socket_path: &Path,
    model: Option<&str>,
    input: Option<&str>,
    tags: &[String],
) -> anyhow::Result<()> {
    let client = DaemonClient::connect(socket_path).await?;
    let mut params = json!({"tags": tags});
    if let Some(model) = model {
        params["model"] = json!(model);
    }
    if let Some(input) = input {
        params["input"] = json!(input);
    }
    let result = client.request("agent.spawn", params).await?;
    println!("{}", result["id"].as_str().unwrap_or("?"));
    Ok(())
}

pub async fn send(socket_path: &Path, id: &str, message: &str) -> anyhow::Result<()> {
    let client = DaemonClient::connect(socket_path).await?;
    client
        .request("agent.send", json!({"id": id, "message": message}))
        .await?;
    println!("sent");
    Ok(())
}

pub async fn terminate(socket_path: &Path, id: &str) -> anyhow::Result<()> {
    let client = DaemonClient::connect(socket_path).await?;
    client.request("agent.terminate", json!({"id": id})).await?;
    println!("terminated {id}");
    Ok(())
}

pub async fn pause(socket_path: &Path, id: &str) -> anyhow::Result<()> {
    let client = DaemonClient::connect(socket_path).await?;
    client.request("agent.pause", json!({"id": id})).await?;
    println!("paused {id}");
    Ok(())
}

pub async fn resume(socket_path: &Path, id: &str) -> anyhow::Result<()> {
    let client = DaemonClient::connect(socket_path).await?;
    client.request("agent.resume", json!({"id": id})).await?;
    println!("resumed {id}");
    Ok(())
}

pub async fn snapshot(socket_path: &Path, id: &str) -> anyhow::Result<()> {
    let client = DaemonClient::connect(socket_path).await?;
    let checkpoint = client.request("agent.snapshot", json!({"id": id})).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&checkpoint).unwrap_or_default()
    );
    Ok(())
}

pub async fn checkpoints(socket_path: &Path) -> anyhow::Result<()> {
    let client = DaemonClient::connect(socket_path).await?;
    let result = client.request("agent.listCheckpoints", json!(null)).await?;

    let checkpoints = result["checkpoints"].as_array().cloned().unwrap_or_default();
    if checkpoints.is_empty() {
        println!("no checkpoints");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = checkpoints
        .iter()
        .map(|cp| {
            vec![
                cp["agentId"].as_str().unwrap_or("?").to_string(),
                cp["model"].as_str().unwrap_or("?").to_string(),
                cp["createdAt"].as_str().unwrap_or("?").to_string(),
            ]
        })
        .collect();
    print!("{}", render_table(&["AGENT", "MODEL", "CREATED"], &rows));
    Ok(())
}

pub async fn watch(socket_path: &Path, id: &str) -> anyhow::Result<()> {
    let client = DaemonClient::connect(socket_path).await?;
    let mut notifications = client
        .notifications()
        .ok_or(ClientError::NotConnected)?;
    client
        .request("subscribe.agent.output", json!({"id": id}))
        .await?;

    eprintln!("watching {id} (ctrl-c to stop)");
    while let Some(notification) = notifications.recv().await {
        if notification.method != "subscription.agent.output" {
            continue;
        }
        println!(
            "{}",
            serde_json::to_string(&notification.params["event"]).unwrap_or_default()
        );
    }
    Ok(())
}
