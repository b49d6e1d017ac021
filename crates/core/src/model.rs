// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Model adapter lookup and tool registry interfaces.

use crate::agent::{AdapterIdentity, AgentSessionId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors from model lookup
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("invalid model identifier (expected provider/model-name): {0}")]
    InvalidIdentifier(String),
    #[error("unknown model: {0}")]
    UnknownModel(String),
    #[error("adapter creation failed: {0}")]
    CreateFailed(String),
}

/// Capability object that can drive one model. Opaque to the daemon;
/// consumed by the coordinator.
pub trait ModelAdapter: Send + Sync {
    fn identity(&self) -> AdapterIdentity;
}

/// Resolves `"provider/model-name"` identifiers into adapters.
///
/// The session id is passed so implementations can scope secrets to the
/// session if they wish.
#[async_trait]
pub trait ModelFactory: Send + Sync {
    async fn create_adapter(
        &self,
        model: &str,
        session_id: &AgentSessionId,
    ) -> Result<Arc<dyn ModelAdapter>, ModelError>;
}

/// Session-scoped adapter creation used by the router's restore path.
#[async_trait]
pub trait AdapterFactory: Send + Sync {
    async fn create(
        &self,
        session_id: &AgentSessionId,
    ) -> Result<Arc<dyn ModelAdapter>, ModelError>;
}

/// Adapter factory stub for deployments with no model integration wired in.
pub struct UnconfiguredAdapterFactory;

#[async_trait]
impl AdapterFactory for UnconfiguredAdapterFactory {
    async fn create(
        &self,
        _session_id: &AgentSessionId,
    ) -> Result<Arc<dyn ModelAdapter>, ModelError> {
        Err(ModelError::CreateFailed(
            "no adapter factory configured".to_string(),
        ))
    }
}

/// The set of tools exposed to an agent session. Opaque to the daemon;
/// handed through to the coordinator at spawn/continue time.
pub trait ToolRegistry: Send + Sync {
    fn names(&self) -> Vec<String>;

    fn is_empty(&self) -> bool {
        self.names().is_empty()
    }
}

/// A registry with no tools.
pub struct EmptyToolRegistry;

impl ToolRegistry for EmptyToolRegistry {
    fn names(&self) -> Vec<String> {
        Vec::new()
    }
}

/// A fixed list of tool names.
pub struct StaticToolRegistry(pub Vec<String>);

impl ToolRegistry for StaticToolRegistry {
    fn names(&self) -> Vec<String> {
        self.0.clone()
    }
}
