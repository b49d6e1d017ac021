// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conversation binding methods.

use courier_core::Destination;
use serde::Deserialize;
use serde_json::json;

use crate::conversations::ConversationFilter;
use crate::protocol::RpcError;
use crate::rpc::{parse_params, HandlerContext};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DestinationParams {
    channel_id: String,
    #[serde(rename = "ref")]
    conversation_ref: String,
}

impl DestinationParams {
    fn destination(&self) -> Destination {
        Destination::new(&self.channel_id, &self.conversation_ref)
    }
}

pub(crate) async fn list(
    ctx: &HandlerContext,
    params: serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    let filter: ConversationFilter = if params.is_null() {
        ConversationFilter::default()
    } else {
        parse_params(params)?
    };
    let conversations = ctx.conversations().list(&filter);
    let conversations =
        serde_json::to_value(conversations).map_err(|e| RpcError::internal(e.to_string()))?;
    Ok(json!({"conversations": conversations}))
}

pub(crate) async fn get(
    ctx: &HandlerContext,
    params: serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    let p: DestinationParams = parse_params(params)?;
    let destination = p.destination();
    let binding = ctx
        .conversations()
        .get_by_destination(&destination)
        .ok_or_else(|| RpcError::not_found(format!("no conversation for {destination}")))?;
    serde_json::to_value(binding).map_err(|e| RpcError::internal(e.to_string()))
}

pub(crate) async fn unbind(
    ctx: &HandlerContext,
    params: serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    let p: DestinationParams = parse_params(params)?;
    let destination = p.destination();
    let binding = ctx
        .conversations()
        .get_by_destination(&destination)
        .ok_or_else(|| RpcError::not_found(format!("no conversation for {destination}")))?;

    // The agent is not terminated: it stays in the coordinator and is
    // collected by coordinator policy.
    ctx.conversations().unbind(&destination);
    Ok(json!({
        "unbound": binding.agent_id.is_some(),
        "agentId": binding.agent_id,
    }))
}
