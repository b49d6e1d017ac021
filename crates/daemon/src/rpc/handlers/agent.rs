// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent session methods.

use courier_core::{
    AgentConfig, AgentHandle, AgentInput, AgentSessionId, ContinueOptions,
    SpawnConfig,
};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use super::{coordinator_error, model_error};
use crate::protocol::RpcError;
use crate::rpc::{parse_params, HandlerContext};

#[derive(Deserialize)]
struct IdParams {
    id: String,
}

fn agent_json(handle: &Arc<dyn AgentHandle>) -> serde_json::Value {
    let config = handle.config();
    json!({
        "id": handle.id(),
        "status": handle.status(),
        "createdAt": handle.created_at(),
        "tags": config.tags,
        "metadata": config.metadata,
        "guidancePath": config.guidance_path,
    })
}

fn lookup(ctx: &HandlerContext, id: &str) -> Result<Arc<dyn AgentHandle>, RpcError> {
    ctx.coordinator()
        .get(&AgentSessionId::new(id))
        .ok_or_else(|| RpcError::not_found(format!("agent not found: {id}")))
}

pub(crate) async fn list(ctx: &HandlerContext) -> Result<serde_json::Value, RpcError> {
    let mut agents: Vec<serde_json::Value> =
        ctx.coordinator().list().iter().map(agent_json).collect();
    agents.sort_by_key(|a| a["createdAt"].as_str().map(String::from));
    Ok(json!({"agents": agents}))
}

pub(crate) async fn get(
    ctx: &HandlerContext,
    params: serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    let p: IdParams = parse_params(params)?;
    Ok(agent_json(&lookup(ctx, &p.id)?))
}

pub(crate) async fn spawn(
    ctx: &HandlerContext,
    params: serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Params {
        model: Option<String>,
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        metadata: serde_json::Map<String, serde_json::Value>,
        #[serde(default)]
        guidance_path: Option<PathBuf>,
        #[serde(default)]
        input: Option<String>,
    }
    let p: Params = parse_params(params)?;
    let factory = ctx.model_factory()?;

    let model = p
        .model
        .or_else(|| ctx.config().default_model.clone())
        .ok_or_else(|| RpcError::invalid_params("model required (provider/model-name)"))?;

    // Temporary session id for secret scoping; the coordinator assigns the
    // real one.
    let temp_id = AgentSessionId::new(uuid::Uuid::new_v4().to_string());
    let adapter = factory
        .create_adapter(&model, &temp_id)
        .await
        .map_err(model_error)?;

    let config = SpawnConfig {
        config: AgentConfig {
            tags: p.tags,
            metadata: p.metadata,
            guidance_path: p.guidance_path,
        },
        initial_input: p.input.map(AgentInput::new),
        tools: ctx.tools(),
    };

    let handle = ctx
        .coordinator()
        .spawn(adapter, config)
        .await
        .map_err(coordinator_error)?;
    handle.start().await.map_err(coordinator_error)?;

    Ok(json!({"id": handle.id()}))
}

pub(crate) async fn continue_session(
    ctx: &HandlerContext,
    params: serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize)]
    struct Params {
        id: String,
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        input: Option<String>,
    }
    let p: Params = parse_params(params)?;
    let factory = ctx.model_factory()?;

    let id = AgentSessionId::new(p.id.as_str());
    let checkpoint = ctx
        .coordinator()
        .load_checkpoint(&id)
        .await
        .map_err(coordinator_error)?
        .ok_or_else(|| RpcError::not_found(format!("no checkpoint for agent: {}", p.id)))?;

    // Checkpoint adapter config is reused unless overridden.
    let model = p.model.unwrap_or(checkpoint.adapter.model);
    let adapter = factory
        .create_adapter(&model, &id)
        .await
        .map_err(model_error)?;

    let handle = ctx
        .coordinator()
        .continue_session(
            &id,
            p.input.map(AgentInput::new),
            adapter,
            ContinueOptions { tools: ctx.tools() },
        )
        .await
        .map_err(coordinator_error)?;

    Ok(json!({"id": handle.id()}))
}

pub(crate) async fn terminate(
    ctx: &HandlerContext,
    params: serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    let p: IdParams = parse_params(params)?;
    lookup(ctx, &p.id)?
        .terminate()
        .await
        .map_err(coordinator_error)?;
    Ok(json!({"terminated": true}))
}

pub(crate) async fn pause(
    ctx: &HandlerContext,
    params: serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    let p: IdParams = parse_params(params)?;
    lookup(ctx, &p.id)?.pause().await.map_err(coordinator_error)?;
    Ok(json!({"paused": true}))
}

pub(crate) async fn resume(
    ctx: &HandlerContext,
    params: serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    let p: IdParams = parse_params(params)?;
    lookup(ctx, &p.id)?
        .resume()
        .await
        .map_err(coordinator_error)?;
    Ok(json!({"resumed": true}))
}

pub(crate) async fn send(
    ctx: &HandlerContext,
    params: serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize)]
    struct Params {
        id: String,
        message: String,
    }
    let p: Params = parse_params(params)?;
    lookup(ctx, &p.id)?
        .send(AgentInput::new(p.message))
        .await
        .map_err(coordinator_error)?;
    Ok(json!({"sent": true}))
}

pub(crate) async fn snapshot(
    ctx: &HandlerContext,
    params: serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    let p: IdParams = parse_params(params)?;
    let checkpoint = lookup(ctx, &p.id)?
        .snapshot()
        .await
        .map_err(coordinator_error)?;
    serde_json::to_value(checkpoint).map_err(|e| RpcError::internal(e.to_string()))
}

pub(crate) async fn list_checkpoints(ctx: &HandlerContext) -> Result<serde_json::Value, RpcError> {
    let checkpoints = ctx
        .coordinator()
        .list_checkpoints()
        .await
        .map_err(coordinator_error)?;
    let checkpoints =
        serde_json::to_value(checkpoints).map_err(|e| RpcError::internal(e.to_string()))?;
    Ok(json!({"checkpoints": checkpoints}))
}
