// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscription methods.

use courier_core::AgentSessionId;
use serde::Deserialize;
use serde_json::json;

use crate::protocol::RpcError;
use crate::rpc::{parse_params, HandlerContext};
use crate::subscriptions::Topic;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub(crate) async fn agents(
    ctx: &HandlerContext,
    params: serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize, Default)]
    struct Params {
        #[serde(default)]
        filter: Option<serde_json::Value>,
    }
    let p: Params = if params.is_null() {
        Params::default()
    } else {
        parse_params(params)?
    };
    let id = ctx
        .subscriptions()
        .subscribe(ctx.connection.id(), Topic::Agents, p.filter);
    Ok(json!({"subscriptionId": id}))
}

pub(crate) async fn agent_output(
    ctx: &HandlerContext,
    params: serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize)]
    struct Params {
        id: String,
    }
    let p: Params = parse_params(params)?;

    // The stream is per-agent; refuse to subscribe to a session that does
    // not exist.
    if ctx.coordinator().get(&AgentSessionId::new(p.id.as_str())).is_none() {
        return Err(RpcError::not_found(format!("agent not found: {}", p.id)));
    }

    let id = ctx.subscriptions().subscribe(
        ctx.connection.id(),
        Topic::AgentOutput,
        Some(json!({"id": p.id})),
    );
    Ok(json!({"subscriptionId": id}))
}

pub(crate) async fn channels(ctx: &HandlerContext) -> Result<serde_json::Value, RpcError> {
    let id = ctx
        .subscriptions()
        .subscribe(ctx.connection.id(), Topic::Channels, None);
    Ok(json!({"subscriptionId": id}))
}

pub(crate) async fn logs(
    ctx: &HandlerContext,
    params: serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize, Default)]
    struct Params {
        #[serde(default)]
        level: Option<String>,
    }
    let p: Params = if params.is_null() {
        Params::default()
    } else {
        parse_params(params)?
    };

    if let Some(level) = &p.level {
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(RpcError::invalid_params(format!(
                "unknown log level: {level}"
            )));
        }
    }

    let filter = p.level.map(|level| json!({"level": level}));
    let id = ctx
        .subscriptions()
        .subscribe(ctx.connection.id(), Topic::Logs, filter);
    Ok(json!({"subscriptionId": id}))
}

pub(crate) async fn unsubscribe(
    ctx: &HandlerContext,
    params: serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Params {
        subscription_id: String,
    }
    let p: Params = parse_params(params)?;

    let subscription = ctx
        .subscriptions()
        .get(&p.subscription_id)
        .ok_or_else(|| {
            RpcError::not_found(format!("subscription not found: {}", p.subscription_id))
        })?;

    if subscription.connection_id != ctx.connection.id() {
        return Err(RpcError::invalid_operation(
            "subscription is owned by another connection",
        ));
    }

    ctx.subscriptions().unsubscribe(&p.subscription_id);
    Ok(json!({"unsubscribed": true}))
}
