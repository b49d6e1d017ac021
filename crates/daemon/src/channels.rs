// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Channel registry: the daemon's view of its messaging adapters.
//!
//! Fans each adapter's inbound stream into one tagged stream for the
//! router, and routes outbound intents to the owning adapter.

use courier_core::{Channel, ChannelError, InboundEvent, OutboundIntent, SlashCommand};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct ChannelRegistry {
    channels: Mutex<HashMap<String, Arc<dyn Channel>>>,
    inbound: broadcast::Sender<(String, InboundEvent)>,
    forwarders: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelRegistry {
    pub fn new() -> Self {
        let (inbound, _) = broadcast::channel(1024);
        Self {
            channels: Mutex::new(HashMap::new()),
            inbound,
            forwarders: Mutex::new(Vec::new()),
        }
    }

    /// Register an adapter and start forwarding its inbound events,
    /// tagged with the channel id.
    pub fn register(&self, channel: Arc<dyn Channel>) {
        let id = channel.id().to_string();
        let mut receiver = channel.subscribe();
        let sender = self.inbound.clone();
        let forward_id = id.clone();
        let task = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        let _ = sender.send((forward_id.clone(), event));
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(channel = %forward_id, missed, "inbound stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        self.forwarders.lock().push(task);
        self.channels.lock().insert(id, channel);
    }

    pub fn get(&self, channel_id: &str) -> Option<Arc<dyn Channel>> {
        self.channels.lock().get(channel_id).cloned()
    }

    pub fn list(&self) -> Vec<Arc<dyn Channel>> {
        let mut channels: Vec<Arc<dyn Channel>> =
            self.channels.lock().values().cloned().collect();
        channels.sort_by(|a, b| a.id().cmp(b.id()));
        channels
    }

    pub fn count(&self) -> usize {
        self.channels.lock().len()
    }

    /// Subscribe to all inbound events, tagged with their channel id.
    pub fn subscribe(&self) -> broadcast::Receiver<(String, InboundEvent)> {
        self.inbound.subscribe()
    }

    /// Deliver an outbound intent to a channel.
    pub async fn process(
        &self,
        channel_id: &str,
        intent: OutboundIntent,
    ) -> Result<(), ChannelError> {
        let channel = self
            .get(channel_id)
            .ok_or_else(|| ChannelError::NotFound(channel_id.to_string()))?;
        channel.send(intent).await
    }

    /// Connect every channel in sequence. A failure warns and moves on;
    /// command registration is best-effort.
    pub async fn connect_all(&self, commands: &[SlashCommand]) {
        for channel in self.list() {
            let id = channel.id().to_string();
            match channel.connect().await {
                Ok(()) => {
                    info!(channel = %id, "channel connected");
                    if !commands.is_empty() {
                        if let Err(e) = channel.register_commands(commands).await {
                            warn!(channel = %id, error = %e, "slash command registration failed");
                        }
                    }
                }
                Err(e) => {
                    warn!(channel = %id, error = %e, "channel connect failed, continuing");
                }
            }
        }
    }

    /// Disconnect every connected channel in parallel, best-effort.
    pub async fn disconnect_all(&self) {
        let channels = self.list();
        let mut set = tokio::task::JoinSet::new();
        for channel in channels {
            if !channel.is_connected() {
                continue;
            }
            set.spawn(async move {
                let id = channel.id().to_string();
                if let Err(e) = channel.disconnect().await {
                    warn!(channel = %id, error = %e, "channel disconnect failed");
                }
            });
        }
        while set.join_next().await.is_some() {}
    }
}

#[cfg(test)]
#[path = "channels_tests.rs"]
mod tests;
