// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Onboarding methods, delegating to the optional collaborator.

use crate::protocol::RpcError;
use crate::rpc::HandlerContext;

pub(crate) async fn status(ctx: &HandlerContext) -> Result<serde_json::Value, RpcError> {
    let onboarding = ctx.onboarding()?;
    onboarding
        .status()
        .await
        .map_err(|e| RpcError::internal(e.to_string()))
}

pub(crate) async fn execute(ctx: &HandlerContext) -> Result<serde_json::Value, RpcError> {
    let onboarding = ctx.onboarding()?;
    onboarding
        .execute()
        .await
        .map_err(|e| RpcError::internal(e.to_string()))
}
