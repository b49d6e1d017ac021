// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent session types shared between the daemon and the coordinator.

use crate::model::ToolRegistry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Identifier of an agent session, minted by the coordinator.
///
/// Opaque to the daemon: it only stores these in bindings and hands them
/// back on continue/send. Serializes as a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentSessionId(String);

impl AgentSessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentSessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One unit of input delivered to an agent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AgentInput {
    pub message: String,
    /// Optional structured context (origin, author, platform hints)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl AgentInput {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// Lifecycle status of an agent session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Starting,
    Running,
    Paused,
    Completed,
    Failed,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentStatus::Starting => "starting",
            AgentStatus::Running => "running",
            AgentStatus::Paused => "paused",
            AgentStatus::Completed => "completed",
            AgentStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Durable portion of an agent's configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance_path: Option<PathBuf>,
}

/// Everything needed to spawn a new agent session.
///
/// Not serializable: the tool registry is a live collaborator.
#[derive(Clone, Default)]
pub struct SpawnConfig {
    pub config: AgentConfig,
    /// Input delivered as the session's first turn
    pub initial_input: Option<AgentInput>,
    pub tools: Option<Arc<dyn ToolRegistry>>,
}

impl std::fmt::Debug for SpawnConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnConfig")
            .field("config", &self.config)
            .field("initial_input", &self.initial_input)
            .field("tools", &self.tools.as_ref().map(|t| t.names()))
            .finish()
    }
}

/// Identity and configuration of a model adapter, as persisted in checkpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterIdentity {
    /// `"provider/model-name"`
    pub model: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Final result reported when an agent turn completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Events emitted by a single agent session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    Status {
        status: AgentStatus,
    },
    Output {
        text: String,
        #[serde(rename = "final")]
        is_final: bool,
    },
    ToolStart {
        tool: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input: Option<serde_json::Value>,
    },
    ToolProgress {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        percent: Option<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    ToolEnd {
        tool: String,
    },
    Thought {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    Error {
        message: String,
        fatal: bool,
    },
    Done {
        result: AgentResult,
    },
    Suspended,
    MemoryUpdated,
}

/// Coordinator-level event stream: per-agent events plus session lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoordinatorEvent {
    AgentSpawned {
        id: AgentSessionId,
    },
    AgentEvent {
        id: AgentSessionId,
        event: AgentEvent,
    },
    AgentDone {
        id: AgentSessionId,
        result: AgentResult,
    },
}

impl CoordinatorEvent {
    /// Session this event belongs to.
    pub fn session_id(&self) -> &AgentSessionId {
        match self {
            CoordinatorEvent::AgentSpawned { id }
            | CoordinatorEvent::AgentEvent { id, .. }
            | CoordinatorEvent::AgentDone { id, .. } => id,
        }
    }
}

/// Persistent state sufficient to reconstruct an agent session after restart.
///
/// Owned and written by the coordinator; the daemon only reads identity and
/// adapter fields when resuming a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCheckpoint {
    pub agent_id: AgentSessionId,
    pub created_at: DateTime<Utc>,
    pub adapter: AdapterIdentity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance_path: Option<PathBuf>,
    /// Opaque message history
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
    /// Opaque tool-execution history
    #[serde(default)]
    pub tool_history: Vec<serde_json::Value>,
}

/// Listing entry for `agent.listCheckpoints`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointSummary {
    pub agent_id: AgentSessionId,
    pub created_at: DateTime<Utc>,
    pub model: String,
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
