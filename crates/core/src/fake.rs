// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake collaborators for deterministic testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::agent::{
    AdapterIdentity, AgentCheckpoint, AgentConfig, AgentInput, AgentSessionId, AgentStatus,
    CheckpointSummary, CoordinatorEvent, SpawnConfig,
};
use crate::channel::{Channel, ChannelError, SlashCommand};
use crate::coordinator::{
    AgentHandle, ContinueOptions, Coordinator, CoordinatorError, CoordinatorShutdown,
};
use crate::event::InboundEvent;
use crate::intent::OutboundIntent;
use crate::model::{AdapterFactory, ModelAdapter, ModelError, ModelFactory};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// A model adapter carrying only its identity.
#[derive(Debug, Clone)]
pub struct FakeAdapter {
    pub model: String,
}

impl FakeAdapter {
    pub fn new(model: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            model: model.into(),
        })
    }
}

impl ModelAdapter for FakeAdapter {
    fn identity(&self) -> AdapterIdentity {
        AdapterIdentity {
            model: self.model.clone(),
            config: serde_json::Value::Null,
        }
    }
}

/// Model factory that records every lookup.
#[derive(Clone, Default)]
pub struct FakeModelFactory {
    inner: Arc<Mutex<FactoryState>>,
}

#[derive(Default)]
struct FactoryState {
    calls: Vec<(String, AgentSessionId)>,
    error: Option<ModelError>,
}

impl FakeModelFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(String, AgentSessionId)> {
        self.inner.lock().calls.clone()
    }

    /// Set error to return on next create
    pub fn set_error(&self, error: ModelError) {
        self.inner.lock().error = Some(error);
    }
}

#[async_trait]
impl ModelFactory for FakeModelFactory {
    async fn create_adapter(
        &self,
        model: &str,
        session_id: &AgentSessionId,
    ) -> Result<Arc<dyn ModelAdapter>, ModelError> {
        let mut inner = self.inner.lock();
        inner.calls.push((model.to_string(), session_id.clone()));
        if let Some(error) = inner.error.take() {
            return Err(error);
        }
        Ok(FakeAdapter::new(model))
    }
}

#[async_trait]
impl AdapterFactory for FakeModelFactory {
    async fn create(
        &self,
        session_id: &AgentSessionId,
    ) -> Result<Arc<dyn ModelAdapter>, ModelError> {
        self.create_adapter("fake/default", session_id).await
    }
}

/// Handle to a fake session; records delivered inputs.
pub struct FakeAgentHandle {
    id: AgentSessionId,
    created_at: DateTime<Utc>,
    config: Mutex<AgentConfig>,
    status: Mutex<AgentStatus>,
    sent: Mutex<Vec<AgentInput>>,
    send_error: Mutex<Option<CoordinatorError>>,
}

impl FakeAgentHandle {
    pub fn new(id: AgentSessionId, status: AgentStatus) -> Arc<Self> {
        Arc::new(Self {
            id,
            created_at: Utc::now(),
            config: Mutex::new(AgentConfig::default()),
            status: Mutex::new(status),
            sent: Mutex::new(Vec::new()),
            send_error: Mutex::new(None),
        })
    }

    pub fn set_status(&self, status: AgentStatus) {
        *self.status.lock() = status;
    }

    pub fn set_config(&self, config: AgentConfig) {
        *self.config.lock() = config;
    }

    /// Set error to return on next send
    pub fn set_send_error(&self, error: CoordinatorError) {
        *self.send_error.lock() = Some(error);
    }

    /// Inputs delivered via `send`
    pub fn sent(&self) -> Vec<AgentInput> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl AgentHandle for FakeAgentHandle {
    fn id(&self) -> &AgentSessionId {
        &self.id
    }

    fn status(&self) -> AgentStatus {
        *self.status.lock()
    }

    fn config(&self) -> AgentConfig {
        self.config.lock().clone()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    async fn start(&self) -> Result<(), CoordinatorError> {
        *self.status.lock() = AgentStatus::Running;
        Ok(())
    }

    async fn send(&self, input: AgentInput) -> Result<(), CoordinatorError> {
        if let Some(error) = self.send_error.lock().take() {
            return Err(error);
        }
        self.sent.lock().push(input);
        Ok(())
    }

    async fn pause(&self) -> Result<(), CoordinatorError> {
        *self.status.lock() = AgentStatus::Paused;
        Ok(())
    }

    async fn resume(&self) -> Result<(), CoordinatorError> {
        *self.status.lock() = AgentStatus::Running;
        Ok(())
    }

    async fn terminate(&self) -> Result<(), CoordinatorError> {
        *self.status.lock() = AgentStatus::Completed;
        Ok(())
    }

    async fn snapshot(&self) -> Result<AgentCheckpoint, CoordinatorError> {
        Ok(AgentCheckpoint {
            agent_id: self.id.clone(),
            created_at: self.created_at,
            adapter: AdapterIdentity {
                model: "fake/default".to_string(),
                config: serde_json::Value::Null,
            },
            guidance_path: self.config.lock().guidance_path.clone(),
            messages: Vec::new(),
            tool_history: Vec::new(),
        })
    }
}

/// Recorded call to FakeCoordinator
#[derive(Debug, Clone)]
pub enum CoordinatorCall {
    Spawn {
        model: String,
        tags: Vec<String>,
        metadata: serde_json::Map<String, serde_json::Value>,
        initial_message: Option<String>,
        tool_names: Option<Vec<String>>,
    },
    Continue {
        id: AgentSessionId,
        message: Option<String>,
        model: String,
        tool_names: Option<Vec<String>>,
    },
    LoadCheckpoint {
        id: AgentSessionId,
    },
    Shutdown {
        graceful: bool,
    },
}

/// Fake coordinator for testing
///
/// Allows programmatic control over session state and records all calls.
#[derive(Clone)]
pub struct FakeCoordinator {
    inner: Arc<Mutex<FakeCoordinatorState>>,
    events: broadcast::Sender<CoordinatorEvent>,
    // Sessions get predictable ids: agent-1, agent-2, ...
    next_session: Arc<AtomicU64>,
}

struct FakeCoordinatorState {
    handles: HashMap<AgentSessionId, Arc<FakeAgentHandle>>,
    adapters: HashMap<AgentSessionId, Arc<dyn ModelAdapter>>,
    checkpoints: HashMap<AgentSessionId, AgentCheckpoint>,
    calls: Vec<CoordinatorCall>,
    spawn_error: Option<CoordinatorError>,
    continue_error: Option<CoordinatorError>,
}

impl Default for FakeCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeCoordinator {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(Mutex::new(FakeCoordinatorState {
                handles: HashMap::new(),
                adapters: HashMap::new(),
                checkpoints: HashMap::new(),
                calls: Vec::new(),
                spawn_error: None,
                continue_error: None,
            })),
            events,
            next_session: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<CoordinatorCall> {
        self.inner.lock().calls.clone()
    }

    /// Clear recorded calls
    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    /// Register a session with the given status, returning its handle.
    pub fn insert_handle(&self, id: &AgentSessionId, status: AgentStatus) -> Arc<FakeAgentHandle> {
        let handle = FakeAgentHandle::new(id.clone(), status);
        self.inner.lock().handles.insert(id.clone(), handle.clone());
        handle
    }

    /// Register an adapter for a session.
    pub fn insert_adapter(&self, id: &AgentSessionId, adapter: Arc<dyn ModelAdapter>) {
        self.inner.lock().adapters.insert(id.clone(), adapter);
    }

    /// Register a checkpoint for a session.
    pub fn insert_checkpoint(&self, checkpoint: AgentCheckpoint) {
        self.inner
            .lock()
            .checkpoints
            .insert(checkpoint.agent_id.clone(), checkpoint);
    }

    /// Set error to return on next spawn
    pub fn set_spawn_error(&self, error: CoordinatorError) {
        self.inner.lock().spawn_error = Some(error);
    }

    /// Set error to return on next continue
    pub fn set_continue_error(&self, error: CoordinatorError) {
        self.inner.lock().continue_error = Some(error);
    }

    /// Emit an event on the coordinator stream.
    pub fn emit(&self, event: CoordinatorEvent) {
        let _ = self.events.send(event);
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.inner.lock().handles.len()
    }
}

#[async_trait]
impl Coordinator for FakeCoordinator {
    async fn start(&self) -> Result<(), CoordinatorError> {
        Ok(())
    }

    async fn spawn(
        &self,
        adapter: Arc<dyn ModelAdapter>,
        config: SpawnConfig,
    ) -> Result<Arc<dyn AgentHandle>, CoordinatorError> {
        let id = AgentSessionId::new(format!(
            "agent-{}",
            self.next_session.fetch_add(1, Ordering::SeqCst)
        ));
        let handle = {
            let mut inner = self.inner.lock();
            inner.calls.push(CoordinatorCall::Spawn {
                model: adapter.identity().model,
                tags: config.config.tags.clone(),
                metadata: config.config.metadata.clone(),
                initial_message: config.initial_input.as_ref().map(|i| i.message.clone()),
                tool_names: config.tools.as_ref().map(|t| t.names()),
            });
            if let Some(error) = inner.spawn_error.take() {
                return Err(error);
            }
            let handle = FakeAgentHandle::new(id.clone(), AgentStatus::Running);
            handle.set_config(config.config.clone());
            inner.handles.insert(id.clone(), handle.clone());
            inner.adapters.insert(id.clone(), adapter);
            handle
        };
        let _ = self.events.send(CoordinatorEvent::AgentSpawned { id });
        Ok(handle)
    }

    async fn continue_session(
        &self,
        id: &AgentSessionId,
        input: Option<AgentInput>,
        adapter: Arc<dyn ModelAdapter>,
        opts: ContinueOptions,
    ) -> Result<Arc<dyn AgentHandle>, CoordinatorError> {
        let mut inner = self.inner.lock();
        inner.calls.push(CoordinatorCall::Continue {
            id: id.clone(),
            message: input.map(|i| i.message),
            model: adapter.identity().model,
            tool_names: opts.tools.as_ref().map(|t| t.names()),
        });
        if let Some(error) = inner.continue_error.take() {
            return Err(error);
        }
        let handle = FakeAgentHandle::new(id.clone(), AgentStatus::Running);
        inner.handles.insert(id.clone(), handle.clone());
        inner.adapters.insert(id.clone(), adapter);
        Ok(handle)
    }

    fn get(&self, id: &AgentSessionId) -> Option<Arc<dyn AgentHandle>> {
        self.inner
            .lock()
            .handles
            .get(id)
            .map(|h| h.clone() as Arc<dyn AgentHandle>)
    }

    fn get_adapter(&self, id: &AgentSessionId) -> Option<Arc<dyn ModelAdapter>> {
        self.inner.lock().adapters.get(id).cloned()
    }

    fn list(&self) -> Vec<Arc<dyn AgentHandle>> {
        self.inner
            .lock()
            .handles
            .values()
            .map(|h| h.clone() as Arc<dyn AgentHandle>)
            .collect()
    }

    async fn list_checkpoints(&self) -> Result<Vec<CheckpointSummary>, CoordinatorError> {
        Ok(self
            .inner
            .lock()
            .checkpoints
            .values()
            .map(|cp| CheckpointSummary {
                agent_id: cp.agent_id.clone(),
                created_at: cp.created_at,
                model: cp.adapter.model.clone(),
            })
            .collect())
    }

    async fn load_checkpoint(
        &self,
        id: &AgentSessionId,
    ) -> Result<Option<AgentCheckpoint>, CoordinatorError> {
        let mut inner = self.inner.lock();
        inner.calls.push(CoordinatorCall::LoadCheckpoint { id: id.clone() });
        Ok(inner.checkpoints.get(id).cloned())
    }

    fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.events.subscribe()
    }

    async fn shutdown(&self, opts: CoordinatorShutdown) -> Result<(), CoordinatorError> {
        self.inner.lock().calls.push(CoordinatorCall::Shutdown {
            graceful: opts.graceful,
        });
        Ok(())
    }
}

/// Fake channel: records processed intents, lets tests inject inbound events.
pub struct FakeChannel {
    id: String,
    connected: Mutex<bool>,
    inbound: broadcast::Sender<InboundEvent>,
    processed: Mutex<Vec<OutboundIntent>>,
    commands: Mutex<Vec<SlashCommand>>,
    connect_error: Mutex<Option<ChannelError>>,
    send_error: Mutex<Option<ChannelError>>,
}

impl FakeChannel {
    pub fn new(id: impl Into<String>) -> Arc<Self> {
        let (inbound, _) = broadcast::channel(256);
        Arc::new(Self {
            id: id.into(),
            connected: Mutex::new(false),
            inbound,
            processed: Mutex::new(Vec::new()),
            commands: Mutex::new(Vec::new()),
            connect_error: Mutex::new(None),
            send_error: Mutex::new(None),
        })
    }

    /// Inject an inbound event as if it arrived from the platform.
    pub fn emit_inbound(&self, event: InboundEvent) {
        let _ = self.inbound.send(event);
    }

    /// Intents delivered via `send`
    pub fn processed(&self) -> Vec<OutboundIntent> {
        self.processed.lock().clone()
    }

    pub fn registered_commands(&self) -> Vec<SlashCommand> {
        self.commands.lock().clone()
    }

    /// Set error to return on next connect
    pub fn set_connect_error(&self, error: ChannelError) {
        *self.connect_error.lock() = Some(error);
    }

    /// Set error to return on next send
    pub fn set_send_error(&self, error: ChannelError) {
        *self.send_error.lock() = Some(error);
    }
}

#[async_trait]
impl Channel for FakeChannel {
    fn id(&self) -> &str {
        &self.id
    }

    async fn connect(&self) -> Result<(), ChannelError> {
        if let Some(error) = self.connect_error.lock().take() {
            return Err(error);
        }
        *self.connected.lock() = true;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ChannelError> {
        *self.connected.lock() = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        *self.connected.lock()
    }

    fn subscribe(&self) -> broadcast::Receiver<InboundEvent> {
        self.inbound.subscribe()
    }

    async fn send(&self, intent: OutboundIntent) -> Result<(), ChannelError> {
        if let Some(error) = self.send_error.lock().take() {
            return Err(error);
        }
        self.processed.lock().push(intent);
        Ok(())
    }

    async fn register_commands(&self, commands: &[SlashCommand]) -> Result<(), ChannelError> {
        self.commands.lock().extend(commands.iter().cloned());
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
