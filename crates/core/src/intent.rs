// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound intents: platform-agnostic messages handed to channels.

use crate::destination::Destination;
use serde::{Deserialize, Serialize};

/// A platform-agnostic message the router hands to a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundIntent {
    /// Agent is working; channels typically render a typing indicator.
    AgentThinking {
        destination: Destination,
        #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
        metadata: serde_json::Value,
    },
    /// Partial output chunk from a streaming turn.
    AgentStreaming {
        destination: Destination,
        partial: String,
        #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
        metadata: serde_json::Value,
    },
    /// Final user-visible response body.
    AgentResponding {
        destination: Destination,
        text: String,
        #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
        metadata: serde_json::Value,
    },
    AgentToolCall {
        destination: Destination,
        tool: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
        metadata: serde_json::Value,
    },
    AgentToolProgress {
        destination: Destination,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        percent: Option<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
        metadata: serde_json::Value,
    },
    AgentError {
        destination: Destination,
        message: String,
        recoverable: bool,
        #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
        metadata: serde_json::Value,
    },
}

impl OutboundIntent {
    pub fn destination(&self) -> &Destination {
        match self {
            OutboundIntent::AgentThinking { destination, .. }
            | OutboundIntent::AgentStreaming { destination, .. }
            | OutboundIntent::AgentResponding { destination, .. }
            | OutboundIntent::AgentToolCall { destination, .. }
            | OutboundIntent::AgentToolProgress { destination, .. }
            | OutboundIntent::AgentError { destination, .. } => destination,
        }
    }
}

#[cfg(test)]
#[path = "intent_tests.rs"]
mod tests;
