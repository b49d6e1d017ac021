// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle methods.

use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::daemon::StopRequest;
use crate::protocol::RpcError;
use crate::rpc::{parse_params, HandlerContext};
use crate::shutdown::ShutdownMode;

pub(crate) async fn status(ctx: &HandlerContext) -> Result<serde_json::Value, RpcError> {
    let status = if ctx.shutdown().is_shutting_down() {
        "stopping"
    } else {
        "running"
    };
    Ok(json!({
        "status": status,
        "uptimeMs": ctx.status().uptime_ms(),
        "agentCount": ctx.coordinator().list().len(),
        "channelCount": ctx.channels().count(),
        "connectionCount": ctx.server().connection_count(),
        "version": crate::VERSION,
    }))
}

pub(crate) async fn shutdown(
    ctx: &HandlerContext,
    params: serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize, Default)]
    #[serde(rename_all = "camelCase")]
    struct Params {
        graceful: Option<bool>,
        timeout_ms: Option<u64>,
    }
    let p: Params = if params.is_null() {
        Params::default()
    } else {
        parse_params(params)?
    };

    let mode = if p.graceful.unwrap_or(true) {
        ShutdownMode::Graceful
    } else {
        ShutdownMode::Hard
    };

    // Executed after the response is flushed so the client sees the ack.
    ctx.stop_after_response(StopRequest {
        mode,
        timeout_ms: p.timeout_ms,
    });
    Ok(json!({"shuttingDown": true}))
}

pub(crate) async fn ping() -> Result<serde_json::Value, RpcError> {
    Ok(json!({"pong": true}))
}

pub(crate) async fn reload() -> Result<serde_json::Value, RpcError> {
    // Stub: reload semantics are intentionally undefined.
    info!("daemon.reload requested (stub)");
    Ok(json!({"reloaded": []}))
}
