// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon controller: composes every subsystem, orders boot and shutdown.
//!
//! Boot: coordinator, conversations, router, last-active, scheduler,
//! shutdown-handler registration, RPC server, then channels. A failure in
//! any step before channel connection reverts to `stopped` and re-raises;
//! channel connect failures are warnings only.

use courier_core::{
    AdapterFactory, AppConfigReader, Channel, Coordinator, CoordinatorShutdown, ModelFactory,
    OnboardingService, SlashCommand, ToolRegistry, UnconfiguredAdapterFactory,
};
use courier_storage::{ConversationStore, LastActiveStore};
use fs2::FileExt;
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::File;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::channels::ChannelRegistry;
use crate::config::DaemonConfig;
use crate::conversations::ConversationManager;
use crate::last_active::LastActiveTracker;
use crate::logging::LogFanout;
use crate::pulse::{PulseDeps, PulseJob};
use crate::router::{MessageRouter, RouterDeps};
use crate::rpc::{RpcDeps, RpcServer};
use crate::scheduler::Scheduler;
use crate::shutdown::{ShutdownManager, ShutdownMode};
use crate::subscriptions::{SubscriptionManager, Topic};
use crate::transport::SocketServer;

/// Controller lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DaemonState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// A stop request, deferred from `daemon.shutdown` or a signal.
#[derive(Debug, Clone, Copy)]
pub struct StopRequest {
    pub mode: ShutdownMode,
    pub timeout_ms: Option<u64>,
}

/// Daemon errors
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("daemon is {0:?}, expected stopped")]
    NotStopped(DaemonState),

    #[error("daemon is {0:?}, expected running")]
    NotRunning(DaemonState),

    #[error("daemon already running (lock held)")]
    AlreadyRunning(#[source] std::io::Error),

    #[error("transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] crate::scheduler::SchedulerError),

    #[error("coordinator error: {0}")]
    Coordinator(#[from] courier_core::CoordinatorError),

    #[error("storage error: {0}")]
    Storage(#[from] courier_storage::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Live controller state shared with RPC handlers.
pub struct StatusShared {
    state: Mutex<DaemonState>,
    started_at: Mutex<Option<Instant>>,
}

impl StatusShared {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(DaemonState::Stopped),
            started_at: Mutex::new(None),
        })
    }

    pub fn state(&self) -> DaemonState {
        *self.state.lock()
    }

    pub fn uptime_ms(&self) -> u64 {
        self.started_at
            .lock()
            .map(|at| at.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Computed snapshot returned by [`Daemon::status`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonStatus {
    pub state: DaemonState,
    pub uptime_ms: u64,
    pub agent_count: usize,
    pub channel_count: usize,
    pub connection_count: usize,
}

/// Collaborators injected into the daemon.
pub struct DaemonDeps {
    pub config: DaemonConfig,
    pub coordinator: Arc<dyn Coordinator>,
    pub channels: Vec<Arc<dyn Channel>>,
    pub model_factory: Option<Arc<dyn ModelFactory>>,
    pub adapter_factory: Option<Arc<dyn AdapterFactory>>,
    pub tools: Option<Arc<dyn ToolRegistry>>,
    pub app_config: Option<Arc<dyn AppConfigReader>>,
    pub onboarding: Option<Arc<dyn OnboardingService>>,
    pub slash_commands: Vec<SlashCommand>,
    pub log_fanout: Option<Arc<LogFanout>>,
}

pub struct Daemon {
    config: Arc<DaemonConfig>,
    coordinator: Arc<dyn Coordinator>,
    channels: Arc<ChannelRegistry>,
    conversations: Arc<ConversationManager>,
    subscriptions: Arc<SubscriptionManager>,
    shutdown: Arc<ShutdownManager>,
    scheduler: Arc<Scheduler>,
    router: Arc<MessageRouter>,
    last_active: Arc<LastActiveTracker>,
    server: Arc<SocketServer>,
    rpc: Arc<RpcServer>,
    status: Arc<StatusShared>,
    slash_commands: Vec<SlashCommand>,
    pulse: Option<Arc<PulseJob>>,
    stop_rx: Mutex<Option<mpsc::UnboundedReceiver<StopRequest>>>,
    feed_tasks: Mutex<Vec<JoinHandle<()>>>,
    lock_file: Mutex<Option<File>>,
}

impl Daemon {
    pub fn new(deps: DaemonDeps) -> Arc<Self> {
        let config = Arc::new(deps.config);
        let server = Arc::new(SocketServer::new(config.socket_path.clone()));
        let sink: Arc<dyn crate::subscriptions::NotificationSink> = Arc::clone(&server) as Arc<dyn crate::subscriptions::NotificationSink>;
        let subscriptions = Arc::new(SubscriptionManager::new(sink));
        if let Some(fanout) = &deps.log_fanout {
            fanout.attach(Arc::clone(&subscriptions));
        }

        let conversations = Arc::new(ConversationManager::new(ConversationStore::new(
            config.conversations_path.clone(),
        )));
        let last_active = Arc::new(LastActiveTracker::new(LastActiveStore::new(
            config.last_active_path.clone(),
        )));
        let shutdown = Arc::new(ShutdownManager::new());
        let scheduler = Arc::new(Scheduler::new());

        let channels = Arc::new(ChannelRegistry::new());
        for channel in deps.channels {
            channels.register(channel);
        }

        let adapter_factory: Arc<dyn AdapterFactory> = deps
            .adapter_factory
            .unwrap_or_else(|| Arc::new(UnconfiguredAdapterFactory));

        let router = MessageRouter::new(RouterDeps {
            coordinator: Arc::clone(&deps.coordinator),
            conversations: Arc::clone(&conversations),
            channels: Arc::clone(&channels),
            last_active: Arc::clone(&last_active),
            adapter_factory,
            tools: deps.tools.clone(),
            guidance_path: Some(config.guidance_dir.clone()),
        });

        let pulse = config.pulse.clone().map(|pulse_config| {
            Arc::new(PulseJob::new(
                PulseDeps {
                    coordinator: Arc::clone(&deps.coordinator),
                    channels: Arc::clone(&channels),
                    last_active: Arc::clone(&last_active),
                    model_factory: deps.model_factory.clone(),
                    tools: deps.tools.clone(),
                },
                pulse_config,
                config.destinations.clone(),
                config.default_model.clone(),
            ))
        });

        let status = StatusShared::new();
        let (stop_tx, stop_rx) = mpsc::unbounded_channel();

        let rpc = RpcServer::new(RpcDeps {
            coordinator: Arc::clone(&deps.coordinator),
            channels: Arc::clone(&channels),
            conversations: Arc::clone(&conversations),
            subscriptions: Arc::clone(&subscriptions),
            shutdown: Arc::clone(&shutdown),
            config: Arc::clone(&config),
            status: Arc::clone(&status),
            server: Arc::clone(&server),
            stop_requests: stop_tx,
            model_factory: deps.model_factory,
            app_config: deps.app_config,
            tools: deps.tools,
            onboarding: deps.onboarding,
        });

        Arc::new(Self {
            config,
            coordinator: deps.coordinator,
            channels,
            conversations,
            subscriptions,
            shutdown,
            scheduler,
            router,
            last_active,
            server,
            rpc,
            status,
            slash_commands: deps.slash_commands,
            pulse,
            stop_rx: Mutex::new(Some(stop_rx)),
            feed_tasks: Mutex::new(Vec::new()),
            lock_file: Mutex::new(None),
        })
    }

    /// Stop requests produced by `daemon.shutdown`. Take once; the caller's
    /// run loop selects on it alongside signals.
    pub fn take_stop_requests(&self) -> Option<mpsc::UnboundedReceiver<StopRequest>> {
        self.stop_rx.lock().take()
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    pub fn state(&self) -> DaemonState {
        self.status.state()
    }

    /// Boot the daemon. Refused unless stopped.
    pub async fn start(self: &Arc<Self>) -> Result<(), DaemonError> {
        {
            let mut state = self.status.state.lock();
            if *state != DaemonState::Stopped {
                return Err(DaemonError::NotStopped(*state));
            }
            *state = DaemonState::Starting;
        }

        match self.start_inner().await {
            Ok(()) => {
                *self.status.state.lock() = DaemonState::Running;
                *self.status.started_at.lock() = Some(Instant::now());
                // Channel connect failures never abort boot.
                self.channels.connect_all(&self.slash_commands).await;
                info!(socket = %self.config.socket_path.display(), "daemon running");
                Ok(())
            }
            Err(e) => {
                *self.status.state.lock() = DaemonState::Stopped;
                // Lock contention means another daemon owns the runtime
                // files; leave them alone.
                if !matches!(e, DaemonError::AlreadyRunning(_)) {
                    self.cleanup_on_failure();
                }
                Err(e)
            }
        }
    }

    async fn start_inner(self: &Arc<Self>) -> Result<(), DaemonError> {
        std::fs::create_dir_all(&self.config.data_dir)?;
        self.acquire_lock()?;
        std::fs::write(&self.config.version_path, crate::VERSION)?;

        self.coordinator.start().await?;
        self.conversations.start();
        self.router.start();
        self.last_active.load();

        if let Some(pulse) = &self.pulse {
            let schedule = pulse.schedule().to_string();
            let job: Arc<dyn crate::scheduler::ScheduledJob> = Arc::clone(pulse) as Arc<dyn crate::scheduler::ScheduledJob>;
            self.scheduler.register(job, &schedule)?;
        }
        self.scheduler.start();

        self.register_shutdown_handlers();
        let handler: Arc<dyn crate::transport::FrameHandler> = Arc::clone(&self.rpc) as Arc<dyn crate::transport::FrameHandler>;
        self.server.listen(handler).await?;
        self.spawn_subscription_feeds();

        Ok(())
    }

    /// Exclusive PID lock so a second daemon refuses to start.
    fn acquire_lock(&self) -> Result<(), DaemonError> {
        use std::io::Write;

        let file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.config.lock_path)?;
        file.try_lock_exclusive()
            .map_err(DaemonError::AlreadyRunning)?;

        let mut file = file;
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        *self.lock_file.lock() = Some(file);
        Ok(())
    }

    fn register_shutdown_handlers(self: &Arc<Self>) {
        let server = Arc::clone(&self.server);
        self.shutdown.register("rpc-server", 0, move |_| {
            let server = Arc::clone(&server);
            async move {
                server.close();
                Ok(())
            }
        });

        let scheduler = Arc::clone(&self.scheduler);
        self.shutdown.register("scheduler", 5, move |_| {
            let scheduler = Arc::clone(&scheduler);
            async move {
                scheduler.stop();
                Ok(())
            }
        });

        let channels = Arc::clone(&self.channels);
        self.shutdown.register("channels", 10, move |_| {
            let channels = Arc::clone(&channels);
            async move {
                channels.disconnect_all().await;
                Ok(())
            }
        });

        let router = Arc::clone(&self.router);
        self.shutdown.register("message-router", 20, move |_| {
            let router = Arc::clone(&router);
            async move {
                router.stop();
                Ok(())
            }
        });

        let last_active = Arc::clone(&self.last_active);
        self.shutdown.register("last-active-tracker", 25, move |_| {
            let last_active = Arc::clone(&last_active);
            async move { last_active.save().map_err(|e| e.to_string()) }
        });

        let coordinator = Arc::clone(&self.coordinator);
        self.shutdown.register("coordinator", 30, move |mode| {
            let coordinator = Arc::clone(&coordinator);
            async move {
                let graceful = mode == ShutdownMode::Graceful;
                coordinator
                    .shutdown(CoordinatorShutdown {
                        graceful,
                        timeout: if graceful {
                            Duration::from_secs(30)
                        } else {
                            Duration::from_secs(5)
                        },
                    })
                    .await
                    .map_err(|e| e.to_string())
            }
        });

        let conversations = Arc::clone(&self.conversations);
        self.shutdown.register("conversation-manager", 40, move |_| {
            let conversations = Arc::clone(&conversations);
            async move { conversations.stop().map_err(|e| e.to_string()) }
        });
    }

    /// Forward coordinator and channel activity onto the subscription topics.
    fn spawn_subscription_feeds(&self) {
        let subscriptions = Arc::clone(&self.subscriptions);
        let mut events = self.coordinator.subscribe();
        let agents_task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => notify_agent_topics(&subscriptions, event),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "subscription feed lagged on coordinator events");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let subscriptions = Arc::clone(&self.subscriptions);
        let mut inbound = self.channels.subscribe();
        let channels_task = tokio::spawn(async move {
            loop {
                match inbound.recv().await {
                    Ok((channel_id, event)) => {
                        let payload = serde_json::json!({
                            "channelId": channel_id,
                            "event": event,
                        });
                        subscriptions.notify(Topic::Channels, &payload, None);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "subscription feed lagged on channel events");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        self.feed_tasks.lock().extend([agents_task, channels_task]);
    }

    /// Stop the daemon. Refused unless running, with one exception: a hard
    /// request is accepted while already stopping, so signal escalation can
    /// supersede a cancelled graceful pass.
    pub async fn stop(&self, request: StopRequest) -> Result<(), DaemonError> {
        {
            let mut state = self.status.state.lock();
            let escalating =
                *state == DaemonState::Stopping && request.mode == ShutdownMode::Hard;
            if *state != DaemonState::Running && !escalating {
                return Err(DaemonError::NotRunning(*state));
            }
            *state = DaemonState::Stopping;
        }

        self.shutdown
            .execute_with(
                request.mode,
                request.timeout_ms.map(Duration::from_millis),
            )
            .await;

        for task in self.feed_tasks.lock().drain(..) {
            task.abort();
        }
        self.release_runtime_files();

        *self.status.state.lock() = DaemonState::Stopped;
        *self.status.started_at.lock() = None;
        info!("daemon stopped");
        Ok(())
    }

    /// Live status snapshot.
    pub fn status(&self) -> DaemonStatus {
        DaemonStatus {
            state: self.status.state(),
            uptime_ms: self.status.uptime_ms(),
            agent_count: self.coordinator.list().len(),
            channel_count: self.channels.count(),
            connection_count: self.server.connection_count(),
        }
    }

    fn release_runtime_files(&self) {
        if self.config.version_path.exists() {
            let _ = std::fs::remove_file(&self.config.version_path);
        }
        if self.config.lock_path.exists() {
            let _ = std::fs::remove_file(&self.config.lock_path);
        }
        // Lock released when the file handle drops
        *self.lock_file.lock() = None;
    }

    fn cleanup_on_failure(&self) {
        self.server.close();
        self.router.stop();
        self.scheduler.stop();
        self.release_runtime_files();
        if self.config.socket_path.exists() {
            let _ = std::fs::remove_file(&self.config.socket_path);
        }
    }
}

fn notify_agent_topics(
    subscriptions: &SubscriptionManager,
    event: courier_core::CoordinatorEvent,
) {
    use courier_core::{AgentEvent, CoordinatorEvent};

    match event {
        CoordinatorEvent::AgentSpawned { id } => {
            subscriptions.notify(
                Topic::Agents,
                &serde_json::json!({"event": "spawned", "id": id}),
                None,
            );
        }
        CoordinatorEvent::AgentDone { id, result } => {
            subscriptions.notify(
                Topic::Agents,
                &serde_json::json!({"event": "done", "id": id, "result": result}),
                None,
            );
        }
        CoordinatorEvent::AgentEvent { id, event } => {
            if let AgentEvent::Status { status } = &event {
                subscriptions.notify(
                    Topic::Agents,
                    &serde_json::json!({"event": "status", "id": id, "status": status}),
                    None,
                );
            }
            let payload = serde_json::json!({"id": id, "event": event});
            let id_str = id.as_str().to_string();
            let matches_id = move |stored: Option<&serde_json::Value>| -> bool {
                stored.and_then(|f| f["id"].as_str()) == Some(id_str.as_str())
            };
            subscriptions.notify(Topic::AgentOutput, &payload, Some(&matches_id));
        }
    }
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
