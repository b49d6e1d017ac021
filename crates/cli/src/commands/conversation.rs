// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `courier conversation ...` commands.

use serde_json::json;
use std::path::Path;

use crate::client::DaemonClient;
use crate::output::render_table;

pub async fn list(
    socket_path: &Path,
    channel_id: Option<&str>,
    bound: Option<bool>,
) -> anyhow::Result<()> {
    let client = DaemonClient::connect(socket_path).await?;
    let mut params = json!({});
    if let Some(channel_id) = channel_id {
        params["channelId"] = json!(channel_id);
    }
    if let Some(bound) = bound {
        params["hasAgent"] = json!(bound);
    }
    let result = client.request("conversation.list", params).await?;

    let conversations = result["conversations"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    if conversations.is_empty() {
        println!("no conversations");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = conversations
        .iter()
        .map(|binding| {
            vec![
                binding["destination"]["channelId"]
                    .as_str()
                    .unwrap_or("?")
                    .to_string(),
                binding["destination"]["ref"].as_str().unwrap_or("?").to_string(),
                binding["agentId"].as_str().unwrap_or("-").to_string(),
                binding["lastActivityAt"].as_str().unwrap_or("?").to_string(),
            ]
        })
        .collect();
    print!(
        "{}",
        render_table(&["CHANNEL", "REF", "AGENT", "LAST ACTIVITY"], &rows)
    );
    Ok(())
}

pub async fn get(socket_path: &Path, channel_id: &str, conversation_ref: &str) -> anyhow::Result<()> {
    let client = DaemonClient::connect(socket_path).await?;
    let binding = client
        .request(
            "conversation.get",
            json!({"channelId": channel_id, "ref": conversation_ref}),
        )
        .await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&binding).unwrap_or_default()
    );
    Ok(())
}

pub async fn unbind(
    socket_path: &Path,
    channel_id: &str,
    conversation_ref: &str,
) -> anyhow::Result<()> {
    let client = DaemonClient::connect(socket_path).await?;
    let result = client
        .request(
            "conversation.unbind",
            json!({"channelId": channel_id, "ref": conversation_ref}),
        )
        .await?;
    match result["agentId"].as_str() {
        Some(agent) => println!("unbound {channel_id}/{conversation_ref} from {agent}"),
        None => println!("{channel_id}/{conversation_ref} had no bound agent"),
    }
    Ok(())
}
