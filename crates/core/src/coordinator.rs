// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator interface: the external collaborator that owns agent sessions.
//!
//! The daemon never looks inside agent execution; it spawns, continues, and
//! observes sessions exclusively through these traits. Checkpoint storage is
//! the coordinator's business -- the daemon only asks for checkpoints when a
//! binding outlives the process.

use crate::agent::{
    AgentCheckpoint, AgentConfig, AgentInput, AgentSessionId, AgentStatus, CheckpointSummary,
    CoordinatorEvent, SpawnConfig,
};
use crate::model::{ModelAdapter, ToolRegistry};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors from coordinator operations
#[derive(Debug, Clone, Error)]
pub enum CoordinatorError {
    #[error("agent not found: {0}")]
    NotFound(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("continue failed: {0}")]
    ContinueFailed(String),
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("checkpoint error: {0}")]
    Checkpoint(String),
    #[error("invalid session state: {0}")]
    InvalidState(String),
    #[error("no coordinator configured")]
    NotConfigured,
}

/// Options for continuing a session from a checkpoint.
#[derive(Clone, Default)]
pub struct ContinueOptions {
    pub tools: Option<Arc<dyn ToolRegistry>>,
}

impl std::fmt::Debug for ContinueOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContinueOptions")
            .field("tools", &self.tools.as_ref().map(|t| t.names()))
            .finish()
    }
}

/// Shutdown request passed to the coordinator at daemon stop.
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorShutdown {
    pub graceful: bool,
    pub timeout: Duration,
}

/// Handle to one live agent session.
#[async_trait]
pub trait AgentHandle: Send + Sync {
    fn id(&self) -> &AgentSessionId;
    fn status(&self) -> AgentStatus;
    fn config(&self) -> AgentConfig;
    fn created_at(&self) -> DateTime<Utc>;

    /// Begin executing (delivers the initial input, if any).
    async fn start(&self) -> Result<(), CoordinatorError>;

    /// Deliver input to a running session. Order-preserving per session.
    async fn send(&self, input: AgentInput) -> Result<(), CoordinatorError>;

    async fn pause(&self) -> Result<(), CoordinatorError>;
    async fn resume(&self) -> Result<(), CoordinatorError>;
    async fn terminate(&self) -> Result<(), CoordinatorError>;

    /// Produce a checkpoint of the session's current state.
    async fn snapshot(&self) -> Result<AgentCheckpoint, CoordinatorError>;
}

/// The collaborator that owns agent sessions.
#[async_trait]
pub trait Coordinator: Send + Sync {
    async fn start(&self) -> Result<(), CoordinatorError>;

    /// Create a new session backed by `adapter`.
    async fn spawn(
        &self,
        adapter: Arc<dyn ModelAdapter>,
        config: SpawnConfig,
    ) -> Result<Arc<dyn AgentHandle>, CoordinatorError>;

    /// Resume a checkpointed session, optionally delivering `input` as the
    /// next turn. The checkpoint's adapter configuration is reused unless
    /// `adapter` overrides it.
    async fn continue_session(
        &self,
        id: &AgentSessionId,
        input: Option<AgentInput>,
        adapter: Arc<dyn ModelAdapter>,
        opts: ContinueOptions,
    ) -> Result<Arc<dyn AgentHandle>, CoordinatorError>;

    /// Look up a live session. `None` after restart until continued.
    fn get(&self, id: &AgentSessionId) -> Option<Arc<dyn AgentHandle>>;

    /// Adapter backing a live session, if any.
    fn get_adapter(&self, id: &AgentSessionId) -> Option<Arc<dyn ModelAdapter>>;

    fn list(&self) -> Vec<Arc<dyn AgentHandle>>;

    async fn list_checkpoints(&self) -> Result<Vec<CheckpointSummary>, CoordinatorError>;

    /// Load the persisted checkpoint for a session, if one exists.
    async fn load_checkpoint(
        &self,
        id: &AgentSessionId,
    ) -> Result<Option<AgentCheckpoint>, CoordinatorError>;

    /// Subscribe to the coordinator's event stream. Dropping the receiver
    /// unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent>;

    async fn shutdown(&self, opts: CoordinatorShutdown) -> Result<(), CoordinatorError>;
}

/// Coordinator stub for deployments where no orchestrator is wired in.
///
/// Every session operation fails with [`CoordinatorError::NotConfigured`];
/// queries return empty. The daemon remains a functional control plane.
pub struct UnconfiguredCoordinator {
    events: broadcast::Sender<CoordinatorEvent>,
}

impl UnconfiguredCoordinator {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self { events }
    }
}

impl Default for UnconfiguredCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Coordinator for UnconfiguredCoordinator {
    async fn start(&self) -> Result<(), CoordinatorError> {
        Ok(())
    }

    async fn spawn(
        &self,
        _adapter: Arc<dyn ModelAdapter>,
        _config: SpawnConfig,
    ) -> Result<Arc<dyn AgentHandle>, CoordinatorError> {
        Err(CoordinatorError::NotConfigured)
    }

    async fn continue_session(
        &self,
        _id: &AgentSessionId,
        _input: Option<AgentInput>,
        _adapter: Arc<dyn ModelAdapter>,
        _opts: ContinueOptions,
    ) -> Result<Arc<dyn AgentHandle>, CoordinatorError> {
        Err(CoordinatorError::NotConfigured)
    }

    fn get(&self, _id: &AgentSessionId) -> Option<Arc<dyn AgentHandle>> {
        None
    }

    fn get_adapter(&self, _id: &AgentSessionId) -> Option<Arc<dyn ModelAdapter>> {
        None
    }

    fn list(&self) -> Vec<Arc<dyn AgentHandle>> {
        Vec::new()
    }

    async fn list_checkpoints(&self) -> Result<Vec<CheckpointSummary>, CoordinatorError> {
        Ok(Vec::new())
    }

    async fn load_checkpoint(
        &self,
        _id: &AgentSessionId,
    ) -> Result<Option<AgentCheckpoint>, CoordinatorError> {
        Ok(None)
    }

    fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.events.subscribe()
    }

    async fn shutdown(&self, _opts: CoordinatorShutdown) -> Result<(), CoordinatorError> {
        Ok(())
    }
}
