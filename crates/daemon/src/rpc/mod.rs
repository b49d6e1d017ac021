// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC server: request dispatch over the transport.
//!
//! Requests are dispatched by method name to handlers grouped by area.
//! Handler failures become wire errors with the JSON-RPC codes; handlers
//! requiring an absent optional collaborator fail with internal error and
//! a specific message. Closing a connection tears down its subscriptions.

mod handlers;

use courier_core::{
    AppConfigReader, Coordinator, ModelFactory, OnboardingService, ToolRegistry,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::channels::ChannelRegistry;
use crate::config::DaemonConfig;
use crate::conversations::ConversationManager;
use crate::daemon::{StatusShared, StopRequest};
use crate::protocol::{RpcError, RpcRequest, RpcResponse};
use crate::shutdown::ShutdownManager;
use crate::subscriptions::SubscriptionManager;
use crate::transport::{Connection, FrameHandler, SocketServer};

/// Shared collaborators for all handlers.
pub struct RpcDeps {
    pub coordinator: Arc<dyn Coordinator>,
    pub channels: Arc<ChannelRegistry>,
    pub conversations: Arc<ConversationManager>,
    pub subscriptions: Arc<SubscriptionManager>,
    pub shutdown: Arc<ShutdownManager>,
    pub config: Arc<DaemonConfig>,
    pub status: Arc<StatusShared>,
    pub server: Arc<SocketServer>,
    pub stop_requests: mpsc::UnboundedSender<StopRequest>,
    pub model_factory: Option<Arc<dyn ModelFactory>>,
    pub app_config: Option<Arc<dyn AppConfigReader>>,
    pub tools: Option<Arc<dyn ToolRegistry>>,
    pub onboarding: Option<Arc<dyn OnboardingService>>,
}

/// Per-request handler context: shared collaborators plus the originating
/// connection and a slot for work deferred until the response is written.
pub struct HandlerContext {
    deps: Arc<RpcDeps>,
    pub connection: Arc<Connection>,
    after_response: Mutex<Option<StopRequest>>,
}

impl HandlerContext {
    pub fn coordinator(&self) -> &Arc<dyn Coordinator> {
        &self.deps.coordinator
    }

    pub fn channels(&self) -> &Arc<ChannelRegistry> {
        &self.deps.channels
    }

    pub fn conversations(&self) -> &Arc<ConversationManager> {
        &self.deps.conversations
    }

    pub fn subscriptions(&self) -> &Arc<SubscriptionManager> {
        &self.deps.subscriptions
    }

    pub fn shutdown(&self) -> &Arc<ShutdownManager> {
        &self.deps.shutdown
    }

    pub fn config(&self) -> &Arc<DaemonConfig> {
        &self.deps.config
    }

    pub fn status(&self) -> &Arc<StatusShared> {
        &self.deps.status
    }

    pub fn server(&self) -> &Arc<SocketServer> {
        &self.deps.server
    }

    pub fn model_factory(&self) -> Result<&Arc<dyn ModelFactory>, RpcError> {
        self.deps
            .model_factory
            .as_ref()
            .ok_or_else(|| RpcError::internal("model factory not configured"))
    }

    pub fn app_config(&self) -> Result<&Arc<dyn AppConfigReader>, RpcError> {
        self.deps
            .app_config
            .as_ref()
            .ok_or_else(|| RpcError::internal("app config reader not configured"))
    }

    pub fn onboarding(&self) -> Result<&Arc<dyn OnboardingService>, RpcError> {
        self.deps
            .onboarding
            .as_ref()
            .ok_or_else(|| RpcError::internal("onboarding service not configured"))
    }

    pub fn tools(&self) -> Option<Arc<dyn ToolRegistry>> {
        self.deps.tools.clone()
    }

    /// Defer a stop request until after the response has been written, so
    /// the client observes the ack.
    pub fn stop_after_response(&self, request: StopRequest) {
        *self.after_response.lock() = Some(request);
    }
}

/// The RPC dispatcher, installed as the transport's frame handler.
pub struct RpcServer {
    deps: Arc<RpcDeps>,
}

impl RpcServer {
    pub fn new(deps: RpcDeps) -> Arc<Self> {
        Arc::new(Self {
            deps: Arc::new(deps),
        })
    }
}

#[async_trait::async_trait]
impl FrameHandler for RpcServer {
    async fn on_frame(&self, connection: Arc<Connection>, frame: serde_json::Value) {
        let request: RpcRequest = match serde_json::from_value(frame.clone()) {
            Ok(request) => request,
            Err(e) => {
                // Best-effort id so the client can correlate the failure
                let id = frame
                    .get("id")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let _ = connection
                    .send_response(&RpcResponse::error(id, RpcError::invalid_request(e.to_string())));
                return;
            }
        };

        let deps = Arc::clone(&self.deps);
        // Requests run concurrently; per-connection response order is the
        // client's concern via request ids.
        tokio::spawn(async move {
            let ctx = HandlerContext {
                deps,
                connection: Arc::clone(&connection),
                after_response: Mutex::new(None),
            };

            debug!(method = %request.method, id = %request.id, "rpc request");
            let params = request.params.unwrap_or(serde_json::Value::Null);
            let response = match dispatch(&ctx, &request.method, params).await {
                Ok(result) => RpcResponse::ok(request.id, result),
                Err(error) => RpcResponse::error(request.id, error),
            };

            if let Err(e) = connection.send_response(&response) {
                warn!(connection = connection.id(), error = %e, "response write failed");
            }

            let stop = ctx.after_response.lock().take();
            if let Some(stop) = stop {
                let _ = ctx.deps.stop_requests.send(stop);
            }
        });
    }

    async fn on_disconnect(&self, connection_id: &str) {
        let removed = self.deps.subscriptions.cleanup(connection_id);
        if removed > 0 {
            debug!(connection = connection_id, removed, "subscriptions cleaned up");
        }
    }
}

/// Route a request to its handler. The method catalogue is a closed set.
async fn dispatch(
    ctx: &HandlerContext,
    method: &str,
    params: serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    match method {
        "daemon.status" => handlers::daemon::status(ctx).await,
        "daemon.shutdown" => handlers::daemon::shutdown(ctx, params).await,
        "daemon.ping" => handlers::daemon::ping().await,
        "daemon.reload" => handlers::daemon::reload().await,

        "agent.list" => handlers::agent::list(ctx).await,
        "agent.get" => handlers::agent::get(ctx, params).await,
        "agent.spawn" => handlers::agent::spawn(ctx, params).await,
        "agent.continue" => handlers::agent::continue_session(ctx, params).await,
        "agent.terminate" => handlers::agent::terminate(ctx, params).await,
        "agent.pause" => handlers::agent::pause(ctx, params).await,
        "agent.resume" => handlers::agent::resume(ctx, params).await,
        "agent.send" => handlers::agent::send(ctx, params).await,
        "agent.snapshot" => handlers::agent::snapshot(ctx, params).await,
        "agent.listCheckpoints" => handlers::agent::list_checkpoints(ctx).await,

        // channel.connect is deliberately not part of the RPC surface
        "channel.list" => handlers::channel::list(ctx).await,
        "channel.get" => handlers::channel::get(ctx, params).await,
        "channel.disconnect" => handlers::channel::disconnect(ctx, params).await,
        "channel.reconnect" => handlers::channel::reconnect(ctx, params).await,

        "conversation.list" => handlers::conversation::list(ctx, params).await,
        "conversation.get" => handlers::conversation::get(ctx, params).await,
        "conversation.unbind" => handlers::conversation::unbind(ctx, params).await,

        "subscribe.agents" => handlers::subscribe::agents(ctx, params).await,
        "subscribe.agent.output" => handlers::subscribe::agent_output(ctx, params).await,
        "subscribe.channels" => handlers::subscribe::channels(ctx).await,
        "subscribe.logs" => handlers::subscribe::logs(ctx, params).await,
        "unsubscribe" => handlers::subscribe::unsubscribe(ctx, params).await,

        "config.get" => handlers::config::get(ctx).await,
        "config.validate" => handlers::config::validate(ctx).await,

        "onboard.status" => handlers::onboard::status(ctx).await,
        "onboard.execute" => handlers::onboard::execute(ctx).await,

        other => Err(RpcError::method_not_found(other)),
    }
}

/// Deserialize handler params, mapping failures to invalid-params errors.
pub(crate) fn parse_params<T: DeserializeOwned>(params: serde_json::Value) -> Result<T, RpcError> {
    serde_json::from_value(params).map_err(|e| RpcError::invalid_params(e.to_string()))
}

#[cfg(test)]
#[path = "rpc_tests.rs"]
mod tests;
