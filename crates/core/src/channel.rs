// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Channel interface: external messaging adapters.

use crate::event::InboundEvent;
use crate::intent::OutboundIntent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors from channel operations
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    #[error("channel not found: {0}")]
    NotFound(String),
    #[error("channel not connected: {0}")]
    NotConnected(String),
    #[error("connect failed: {0}")]
    ConnectFailed(String),
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// A slash command registered with a channel at boot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashCommand {
    pub name: String,
    pub description: String,
}

/// An external messaging adapter.
///
/// Adapters own their platform connection and normalize traffic into
/// [`InboundEvent`]s / accept [`OutboundIntent`]s. Deliveries from the same
/// destination arrive in order by adapter contract.
#[async_trait]
pub trait Channel: Send + Sync {
    fn id(&self) -> &str;

    async fn connect(&self) -> Result<(), ChannelError>;
    async fn disconnect(&self) -> Result<(), ChannelError>;
    fn is_connected(&self) -> bool;

    /// Subscribe to the adapter's inbound event stream. Dropping the
    /// receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<InboundEvent>;

    /// Deliver an outbound intent to the platform.
    async fn send(&self, intent: OutboundIntent) -> Result<(), ChannelError>;

    /// Best-effort slash-command registration. Default: no-op.
    async fn register_commands(&self, commands: &[SlashCommand]) -> Result<(), ChannelError> {
        let _ = commands;
        Ok(())
    }
}
