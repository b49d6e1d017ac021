// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config methods, backed by the optional app-config collaborator.

use serde_json::json;

use crate::protocol::RpcError;
use crate::rpc::HandlerContext;

pub(crate) async fn get(ctx: &HandlerContext) -> Result<serde_json::Value, RpcError> {
    let reader = ctx.app_config()?;
    Ok(reader.safe_subset())
}

pub(crate) async fn validate(ctx: &HandlerContext) -> Result<serde_json::Value, RpcError> {
    let reader = ctx.app_config()?;
    let issues = reader.validate();
    Ok(json!({
        "valid": issues.is_empty(),
        "issues": issues,
    }))
}
