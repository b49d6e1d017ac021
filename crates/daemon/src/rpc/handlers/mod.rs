// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC method handlers, grouped by area.

pub(crate) mod agent;
pub(crate) mod channel;
pub(crate) mod config;
pub(crate) mod conversation;
pub(crate) mod daemon;
pub(crate) mod onboard;
pub(crate) mod subscribe;

use crate::protocol::RpcError;
use courier_core::CoordinatorError;

/// Map coordinator failures onto wire errors.
pub(crate) fn coordinator_error(e: CoordinatorError) -> RpcError {
    match e {
        CoordinatorError::NotFound(what) => RpcError::not_found(format!("agent not found: {what}")),
        CoordinatorError::InvalidState(what) => RpcError::invalid_operation(what),
        other => RpcError::internal(other.to_string()),
    }
}

/// Map model lookup failures onto wire errors.
pub(crate) fn model_error(e: courier_core::ModelError) -> RpcError {
    match e {
        courier_core::ModelError::InvalidIdentifier(s) => {
            RpcError::invalid_params(format!("invalid model identifier: {s}"))
        }
        courier_core::ModelError::UnknownModel(s) => {
            RpcError::not_found(format!("unknown model: {s}"))
        }
        courier_core::ModelError::CreateFailed(s) => RpcError::internal(s),
    }
}
