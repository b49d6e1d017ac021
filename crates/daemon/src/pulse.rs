// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pulse job: scheduled, unprompted agent turns.
//!
//! Each firing spawns a tagged agent session, collects its final response
//! from the coordinator event stream (bounded by a hard timeout), and
//! either delivers it to the resolved destination or suppresses it on the
//! `<rest />` marker. The pulse never updates the last-active tracker.

use async_trait::async_trait;
use courier_core::{
    AgentConfig, AgentEvent, AgentInput, AgentSessionId, Coordinator,
    CoordinatorError, CoordinatorEvent, Destination, ModelError, ModelFactory, OutboundIntent,
    SpawnConfig, ToolRegistry,
};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::channels::ChannelRegistry;
use crate::config::{DestinationConfig, PulseConfig};
use crate::last_active::LastActiveTracker;
use crate::scheduler::ScheduledJob;

/// Upper bound on response collection per pulse firing.
pub const PULSE_RESPONSE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Name under which the pulse registers with the scheduler.
pub const PULSE_JOB_NAME: &str = "pulse";

/// Fixed initial input for every pulse turn.
const PULSE_PROMPT: &str =
    "Follow your PULSE guidance for this scheduled check-in. \
     If nothing needs attention, reply with <rest />.";

/// Pulse errors
#[derive(Debug, Error)]
pub enum PulseError {
    #[error("no model factory configured")]
    NoModelFactory,

    #[error("no pulse model configured")]
    NoModel,

    #[error("adapter error: {0}")]
    Adapter(#[from] ModelError),

    #[error("coordinator error: {0}")]
    Coordinator(#[from] CoordinatorError),
}

/// How the response destination was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseResolution {
    Silent,
    LastActive,
    Named,
}

/// Result of one pulse firing.
#[derive(Debug, Clone, PartialEq)]
pub struct PulseOutcome {
    pub resolution: PulseResolution,
    pub suppressed: bool,
    pub delivered: bool,
}

/// Collaborators the pulse needs.
pub struct PulseDeps {
    pub coordinator: Arc<dyn Coordinator>,
    pub channels: Arc<ChannelRegistry>,
    pub last_active: Arc<LastActiveTracker>,
    pub model_factory: Option<Arc<dyn ModelFactory>>,
    pub tools: Option<Arc<dyn ToolRegistry>>,
}

pub struct PulseJob {
    deps: PulseDeps,
    config: PulseConfig,
    destinations: HashMap<String, DestinationConfig>,
    default_model: Option<String>,
    response_timeout: Duration,
}

impl PulseJob {
    pub fn new(
        deps: PulseDeps,
        config: PulseConfig,
        destinations: HashMap<String, DestinationConfig>,
        default_model: Option<String>,
    ) -> Self {
        Self {
            deps,
            config,
            destinations,
            default_model,
            response_timeout: PULSE_RESPONSE_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Configured cron expression.
    pub fn schedule(&self) -> &str {
        &self.config.schedule
    }

    /// Resolve where the pulse response should go.
    fn resolve_destination(&self) -> (Option<Destination>, PulseResolution) {
        match self.config.response_to.as_deref() {
            None => (None, PulseResolution::Silent),
            Some("lastActive") => match self.deps.last_active.get() {
                Some(destination) => (Some(destination), PulseResolution::LastActive),
                None => (None, PulseResolution::Silent),
            },
            Some(name) => match self.destinations.get(name) {
                Some(config) => (Some(config.to_destination()), PulseResolution::Named),
                None => {
                    warn!(destination = name, "unknown pulse destination, staying silent");
                    (None, PulseResolution::Silent)
                }
            },
        }
    }

    /// Run one pulse turn.
    pub async fn run_once(&self) -> Result<PulseOutcome, PulseError> {
        let (destination, resolution) = self.resolve_destination();

        let factory = self
            .deps
            .model_factory
            .as_ref()
            .ok_or(PulseError::NoModelFactory)?;
        let model = self
            .config
            .model
            .as_deref()
            .or(self.default_model.as_deref())
            .ok_or(PulseError::NoModel)?;

        // Subscribe before spawning so no early output frame is missed.
        let events = self.deps.coordinator.subscribe();

        let temp_id = AgentSessionId::new(uuid::Uuid::new_v4().to_string());
        let adapter = factory.create_adapter(model, &temp_id).await?;

        let mut metadata = serde_json::Map::new();
        metadata.insert("isPulse".to_string(), serde_json::Value::Bool(true));
        metadata.insert(
            "hasResponseDestination".to_string(),
            serde_json::Value::Bool(destination.is_some()),
        );
        if let Some(prompt_path) = &self.config.prompt_path {
            metadata.insert(
                "pulsePromptPath".to_string(),
                serde_json::Value::String(prompt_path.display().to_string()),
            );
        }

        let spawn = SpawnConfig {
            config: AgentConfig {
                tags: vec!["pulse".to_string(), "scheduled".to_string()],
                metadata,
                guidance_path: self.config.prompt_path.clone(),
            },
            initial_input: Some(AgentInput::new(PULSE_PROMPT)),
            tools: self.deps.tools.clone(),
        };

        let handle = self.deps.coordinator.spawn(adapter, spawn).await?;
        handle.start().await?;
        let session_id = handle.id().clone();

        let response =
            collect_response(events, &session_id, self.response_timeout).await;

        let trimmed = response.as_deref().map(str::trim).unwrap_or("");
        let suppressed = is_rest_marker(trimmed);

        let mut delivered = false;
        if let Some(destination) = destination {
            if !trimmed.is_empty() && !suppressed {
                let intent = OutboundIntent::AgentResponding {
                    destination: destination.clone(),
                    text: trimmed.to_string(),
                    metadata: serde_json::json!({"isPulse": true}),
                };
                match self
                    .deps
                    .channels
                    .process(&destination.channel_id, intent)
                    .await
                {
                    Ok(()) => delivered = true,
                    Err(e) => {
                        warn!(
                            destination = %destination,
                            error = %e,
                            "pulse delivery failed"
                        );
                    }
                }
            }
        }

        Ok(PulseOutcome {
            resolution,
            suppressed,
            delivered,
        })
    }
}

#[async_trait]
impl ScheduledJob for PulseJob {
    fn name(&self) -> &str {
        PULSE_JOB_NAME
    }

    async fn execute(&self) -> Result<(), String> {
        let outcome = self.run_once().await.map_err(|e| e.to_string())?;
        info!(
            resolution = ?outcome.resolution,
            suppressed = outcome.suppressed,
            delivered = outcome.delivered,
            "pulse fired"
        );
        Ok(())
    }
}

/// Accumulate the spawned session's output until one of: `done`, a fatal
/// error, coordinator-level `agent_done`, or the timeout. The receiver is
/// dropped on return, which is the unsubscribe.
async fn collect_response(
    mut events: broadcast::Receiver<CoordinatorEvent>,
    session_id: &AgentSessionId,
    timeout: Duration,
) -> Option<String> {
    let mut buffer = String::new();
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => {
                warn!(session = %session_id, "pulse response collection timed out");
                return non_empty(buffer);
            }
            received = events.recv() => match received {
                Ok(CoordinatorEvent::AgentEvent { id, event }) if &id == session_id => match event {
                    AgentEvent::Output { text, .. } => buffer.push_str(&text),
                    AgentEvent::Done { .. } => return non_empty(buffer),
                    AgentEvent::Error { fatal: true, .. } => return None,
                    _ => {}
                },
                Ok(CoordinatorEvent::AgentDone { id, .. }) if &id == session_id => {
                    return non_empty(buffer);
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(session = %session_id, missed, "pulse event stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return non_empty(buffer),
            }
        }
    }
}

fn non_empty(buffer: String) -> Option<String> {
    if buffer.is_empty() {
        None
    } else {
        Some(buffer)
    }
}

/// Does the trimmed response ask for no user-visible output?
pub(crate) fn is_rest_marker(text: &str) -> bool {
    static REST: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<rest\s*/?>").ok());
    REST.as_ref().is_some_and(|re| re.is_match(text))
}

#[cfg(test)]
#[path = "pulse_tests.rs"]
mod tests;
