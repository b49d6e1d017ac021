// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Channel methods. `channel.connect` is deliberately absent: connecting
//! happens at boot, under the daemon controller's sequencing.

use courier_core::Channel;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::protocol::RpcError;
use crate::rpc::{parse_params, HandlerContext};

#[derive(Deserialize)]
struct IdParams {
    id: String,
}

fn channel_json(channel: &Arc<dyn Channel>) -> serde_json::Value {
    json!({
        "id": channel.id(),
        "connected": channel.is_connected(),
    })
}

fn lookup(ctx: &HandlerContext, id: &str) -> Result<Arc<dyn Channel>, RpcError> {
    ctx.channels()
        .get(id)
        .ok_or_else(|| RpcError::not_found(format!("channel not found: {id}")))
}

pub(crate) async fn list(ctx: &HandlerContext) -> Result<serde_json::Value, RpcError> {
    let channels: Vec<serde_json::Value> =
        ctx.channels().list().iter().map(channel_json).collect();
    Ok(json!({"channels": channels}))
}

pub(crate) async fn get(
    ctx: &HandlerContext,
    params: serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    let p: IdParams = parse_params(params)?;
    Ok(channel_json(&lookup(ctx, &p.id)?))
}

pub(crate) async fn disconnect(
    ctx: &HandlerContext,
    params: serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    let p: IdParams = parse_params(params)?;
    let channel = lookup(ctx, &p.id)?;
    channel
        .disconnect()
        .await
        .map_err(|e| RpcError::internal(e.to_string()))?;
    Ok(json!({"disconnected": true}))
}

pub(crate) async fn reconnect(
    ctx: &HandlerContext,
    params: serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    let p: IdParams = parse_params(params)?;
    let channel = lookup(ctx, &p.id)?;
    if channel.is_connected() {
        channel
            .disconnect()
            .await
            .map_err(|e| RpcError::internal(e.to_string()))?;
    }
    channel
        .connect()
        .await
        .map_err(|e| RpcError::internal(e.to_string()))?;
    Ok(json!({"connected": true}))
}
