// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message router: the central data-flow node.
//!
//! Inbound channel events become agent inputs (spawn / continue / send);
//! coordinator events become outbound intents handed back to the channel.
//! The router owns no persistent state, only the stream subscriptions it
//! tears down on stop. Callback errors are logged, never propagated.

use courier_core::{
    AdapterFactory, AgentConfig, AgentEvent, AgentInput, AgentSessionId, AgentStatus,
    ContinueOptions, Coordinator, CoordinatorError, CoordinatorEvent, Destination,
    EmptyToolRegistry, InboundEvent, MessageContent, ModelError, OutboundIntent, SpawnConfig,
    ToolRegistry,
};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::channels::ChannelRegistry;
use crate::conversations::ConversationManager;
use crate::last_active::LastActiveTracker;

/// Router errors (internal; surfaced only in logs)
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("adapter error: {0}")]
    Adapter(#[from] ModelError),
    #[error("coordinator error: {0}")]
    Coordinator(#[from] CoordinatorError),
}

/// Everything the router needs, injected top-down.
pub struct RouterDeps {
    pub coordinator: Arc<dyn Coordinator>,
    pub conversations: Arc<ConversationManager>,
    pub channels: Arc<ChannelRegistry>,
    pub last_active: Arc<LastActiveTracker>,
    pub adapter_factory: Arc<dyn AdapterFactory>,
    pub tools: Option<Arc<dyn ToolRegistry>>,
    /// Default guidance file for conversation agents
    pub guidance_path: Option<PathBuf>,
}

pub struct MessageRouter {
    deps: RouterDeps,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl MessageRouter {
    pub fn new(deps: RouterDeps) -> Arc<Self> {
        Arc::new(Self {
            deps,
            tasks: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        })
    }

    /// Subscribe to channel and coordinator streams. Idempotent with a warn.
    pub fn start(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("router already started");
            return;
        }

        let router = Arc::clone(self);
        let mut inbound = self.deps.channels.subscribe();
        let inbound_task = tokio::spawn(async move {
            loop {
                match inbound.recv().await {
                    Ok((channel_id, event)) => {
                        router.handle_inbound(event, &channel_id).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "router inbound stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let router = Arc::clone(self);
        let mut events = self.deps.coordinator.subscribe();
        let outbound_task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => router.handle_coordinator_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "router coordinator stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        self.tasks.lock().extend([inbound_task, outbound_task]);
        info!("router started");
    }

    /// Tear down stream subscriptions. Idempotent with a warn.
    pub fn stop(&self) {
        if !self.started.swap(false, Ordering::SeqCst) {
            warn!("router already stopped");
            return;
        }
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        info!("router stopped");
    }

    /// Route one inbound event. Errors are logged and swallowed.
    pub async fn handle_inbound(&self, event: InboundEvent, channel_id: &str) {
        let destination = event.origin().destination.clone();
        let Some(input) = agent_input_for(&event) else {
            debug!(destination = %destination, "inbound event produced no agent input");
            return;
        };

        // User-originated activity; pulse spawns never come through here.
        self.deps.last_active.update(&destination);

        let binding = self.deps.conversations.get_or_create(&destination);
        let Some(agent_id) = binding.agent_id else {
            self.spawn_and_bind(channel_id, &destination, input).await;
            return;
        };

        let Some(handle) = self.deps.coordinator.get(&agent_id) else {
            // Process restarted: the binding survived but the session did not.
            self.try_restore_from_checkpoint(&agent_id, input, &destination, channel_id)
                .await;
            return;
        };

        if handle.status() == AgentStatus::Completed {
            let Some(adapter) = self.deps.coordinator.get_adapter(&agent_id) else {
                error!(agent = %agent_id, "completed agent has no adapter, unbinding");
                self.deps.conversations.unbind(&destination);
                return;
            };
            let opts = ContinueOptions {
                tools: self.deps.tools.clone(),
            };
            if let Err(e) = self
                .deps
                .coordinator
                .continue_session(&agent_id, Some(input), adapter, opts)
                .await
            {
                // Next message spawns fresh.
                warn!(agent = %agent_id, error = %e, "continue failed, unbinding");
                self.deps.conversations.unbind(&destination);
            }
            return;
        }

        if let Err(e) = handle.send(input).await {
            error!(agent = %agent_id, error = %e, "send to running agent failed");
        }
    }

    /// Restore a session from its checkpoint, or fall back to a fresh spawn.
    async fn try_restore_from_checkpoint(
        &self,
        agent_id: &AgentSessionId,
        input: AgentInput,
        destination: &Destination,
        channel_id: &str,
    ) {
        let checkpoint = match self.deps.coordinator.load_checkpoint(agent_id).await {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                warn!(agent = %agent_id, error = %e, "checkpoint load failed");
                None
            }
        };

        if checkpoint.is_none() {
            debug!(agent = %agent_id, "no checkpoint, spawning fresh");
            self.deps.conversations.unbind(destination);
            self.spawn_and_bind(channel_id, destination, input).await;
            return;
        }

        let restore = async {
            let adapter = self.deps.adapter_factory.create(agent_id).await?;
            self.deps
                .coordinator
                .continue_session(
                    agent_id,
                    Some(input.clone()),
                    adapter,
                    ContinueOptions {
                        tools: self.deps.tools.clone(),
                    },
                )
                .await?;
            Ok::<(), RouterError>(())
        };

        if let Err(e) = restore.await {
            warn!(agent = %agent_id, error = %e, "restore from checkpoint failed, spawning fresh");
            self.deps.conversations.unbind(destination);
            self.spawn_and_bind(channel_id, destination, input).await;
        }
    }

    async fn spawn_and_bind(
        &self,
        channel_id: &str,
        destination: &Destination,
        input: AgentInput,
    ) {
        match self.spawn_agent(channel_id, Some(input)).await {
            Ok(agent_id) => {
                self.deps.conversations.bind(destination, &agent_id);
                info!(destination = %destination, agent = %agent_id, "agent spawned for conversation");
            }
            Err(e) => {
                error!(destination = %destination, error = %e, "agent spawn failed");
            }
        }
    }

    /// Spawn a conversation agent for a channel.
    ///
    /// Mints a temporary session id so the adapter factory can resolve
    /// session-scoped secrets before the coordinator assigns the real id.
    async fn spawn_agent(
        &self,
        channel_id: &str,
        input: Option<AgentInput>,
    ) -> Result<AgentSessionId, RouterError> {
        let temp_id = AgentSessionId::new(uuid::Uuid::new_v4().to_string());
        let adapter = self.deps.adapter_factory.create(&temp_id).await?;

        let mut metadata = serde_json::Map::new();
        metadata.insert(
            "channelId".to_string(),
            serde_json::Value::String(channel_id.to_string()),
        );

        let config = SpawnConfig {
            config: AgentConfig {
                tags: vec![format!("channel:{channel_id}")],
                metadata,
                guidance_path: self.deps.guidance_path.clone(),
            },
            initial_input: input,
            tools: Some(
                self.deps
                    .tools
                    .clone()
                    .unwrap_or_else(|| Arc::new(EmptyToolRegistry)),
            ),
        };

        let handle = self.deps.coordinator.spawn(adapter, config).await?;
        Ok(handle.id().clone())
    }

    /// Convert a coordinator event into an outbound intent, if any.
    pub async fn handle_coordinator_event(&self, event: CoordinatorEvent) {
        match event {
            CoordinatorEvent::AgentEvent { id, event } => {
                let Some(binding) = self.deps.conversations.get_by_agent(&id) else {
                    warn!(agent = %id, "agent event with no binding, dropping");
                    return;
                };
                let destination = binding.destination;
                let Some(intent) = intent_for(&event, destination.clone()) else {
                    return;
                };
                if let Err(e) = self
                    .deps
                    .channels
                    .process(&destination.channel_id, intent)
                    .await
                {
                    warn!(
                        agent = %id,
                        channel = %destination.channel_id,
                        error = %e,
                        "outbound intent delivery failed"
                    );
                }
            }
            // Binding is kept across turns for conversation continuity.
            CoordinatorEvent::AgentDone { .. } => {}
            // Bind happens on the spawn path.
            CoordinatorEvent::AgentSpawned { .. } => {}
        }
    }
}

/// Transform an inbound event into an agent input, if it carries one.
pub(crate) fn agent_input_for(event: &InboundEvent) -> Option<AgentInput> {
    let origin = event.origin();
    let author = event.author();
    let context = serde_json::json!({
        "channelId": origin.destination.channel_id,
        "ref": origin.destination.conversation_ref,
        "author": author.id,
    });

    let message = match event {
        InboundEvent::MessageReceived { content, .. } => message_text(content)?,
        InboundEvent::CommandReceived { command, args, .. } => match args {
            Some(args) => format!("/{command} {args}").trim().to_string(),
            None => format!("/{command}").trim().to_string(),
        },
        InboundEvent::CallbackReceived { data, .. } => data.clone(),
        InboundEvent::ConversationStarted { .. } => "/start".to_string(),
        InboundEvent::MessageEdited { .. }
        | InboundEvent::MessageDeleted { .. }
        | InboundEvent::ReactionAdded { .. }
        | InboundEvent::ReactionRemoved { .. }
        | InboundEvent::MemberJoined { .. }
        | InboundEvent::MemberLeft { .. } => return None,
    };

    Some(AgentInput::new(message).with_context(context))
}

fn message_text(content: &MessageContent) -> Option<String> {
    match content {
        MessageContent::Text { text } => Some(text.clone()),
        MessageContent::Media { caption, .. } => caption.clone(),
        MessageContent::Contact {
            first_name,
            last_name,
            phone,
        } => Some(match last_name {
            Some(last) => format!("Contact: {first_name} {last} ({phone})"),
            None => format!("Contact: {first_name} ({phone})"),
        }),
        MessageContent::Sticker { emoji } => emoji.clone(),
        MessageContent::Location { .. } | MessageContent::PollVote { .. } => None,
    }
}

fn direct_metadata() -> serde_json::Value {
    serde_json::json!({"conversationType": "direct"})
}

/// Agent event -> outbound intent mapping.
pub(crate) fn intent_for(event: &AgentEvent, destination: Destination) -> Option<OutboundIntent> {
    match event {
        AgentEvent::Status { status } => match status {
            AgentStatus::Running => Some(OutboundIntent::AgentThinking {
                destination,
                metadata: direct_metadata(),
            }),
            _ => None,
        },
        AgentEvent::Output { text, is_final } => {
            if *is_final {
                if text.is_empty() {
                    // The done event carries the full body.
                    None
                } else {
                    Some(OutboundIntent::AgentResponding {
                        destination,
                        text: text.clone(),
                        metadata: direct_metadata(),
                    })
                }
            } else {
                Some(OutboundIntent::AgentStreaming {
                    destination,
                    partial: text.clone(),
                    metadata: direct_metadata(),
                })
            }
        }
        AgentEvent::ToolStart { tool, input } => Some(OutboundIntent::AgentToolCall {
            destination,
            tool: tool.clone(),
            input: input.clone(),
            metadata: direct_metadata(),
        }),
        AgentEvent::ToolProgress { percent, message } => Some(OutboundIntent::AgentToolProgress {
            destination,
            percent: *percent,
            message: message.clone(),
            metadata: direct_metadata(),
        }),
        // Keep the typing indicator alive between tools and thoughts.
        AgentEvent::ToolEnd { .. } | AgentEvent::Thought { .. } => {
            Some(OutboundIntent::AgentThinking {
                destination,
                metadata: direct_metadata(),
            })
        }
        AgentEvent::Error { message, fatal } => Some(OutboundIntent::AgentError {
            destination,
            message: message.clone(),
            recoverable: !fatal,
            metadata: direct_metadata(),
        }),
        AgentEvent::Done { result } => match &result.output {
            Some(output) if !output.is_empty() => Some(OutboundIntent::AgentResponding {
                destination,
                text: output.clone(),
                metadata: direct_metadata(),
            }),
            _ => None,
        },
        AgentEvent::Suspended | AgentEvent::MemoryUpdated => None,
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
