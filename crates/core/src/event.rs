// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound channel events.
//!
//! Channels normalize platform payloads into this closed union before they
//! reach the router. Variants with no conversational payload (edits,
//! reactions, membership changes) still flow so subscribers can observe
//! them, but produce no agent input.

use crate::destination::Destination;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where an event came from: the destination plus per-event metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventOrigin {
    pub destination: Destination,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl EventOrigin {
    pub fn new(destination: Destination) -> Self {
        Self {
            destination,
            metadata: None,
        }
    }
}

/// The author of an inbound event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Author {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }
}

/// Message body variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text {
        text: String,
    },
    Media {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
    Contact {
        first_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last_name: Option<String>,
        phone: String,
    },
    Sticker {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        emoji: Option<String>,
    },
    Location {
        latitude: f64,
        longitude: f64,
    },
    PollVote {
        #[serde(default)]
        option_ids: Vec<u32>,
    },
}

/// Events emitted by channel adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    MessageReceived {
        origin: EventOrigin,
        author: Author,
        timestamp: DateTime<Utc>,
        content: MessageContent,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },
    CommandReceived {
        origin: EventOrigin,
        author: Author,
        timestamp: DateTime<Utc>,
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        args: Option<String>,
    },
    CallbackReceived {
        origin: EventOrigin,
        author: Author,
        timestamp: DateTime<Utc>,
        data: String,
    },
    ConversationStarted {
        origin: EventOrigin,
        author: Author,
        timestamp: DateTime<Utc>,
    },
    MessageEdited {
        origin: EventOrigin,
        author: Author,
        timestamp: DateTime<Utc>,
        message_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    MessageDeleted {
        origin: EventOrigin,
        author: Author,
        timestamp: DateTime<Utc>,
        message_id: String,
    },
    ReactionAdded {
        origin: EventOrigin,
        author: Author,
        timestamp: DateTime<Utc>,
        message_id: String,
        reaction: String,
    },
    ReactionRemoved {
        origin: EventOrigin,
        author: Author,
        timestamp: DateTime<Utc>,
        message_id: String,
        reaction: String,
    },
    MemberJoined {
        origin: EventOrigin,
        author: Author,
        timestamp: DateTime<Utc>,
    },
    MemberLeft {
        origin: EventOrigin,
        author: Author,
        timestamp: DateTime<Utc>,
    },
}

impl InboundEvent {
    pub fn origin(&self) -> &EventOrigin {
        match self {
            InboundEvent::MessageReceived { origin, .. }
            | InboundEvent::CommandReceived { origin, .. }
            | InboundEvent::CallbackReceived { origin, .. }
            | InboundEvent::ConversationStarted { origin, .. }
            | InboundEvent::MessageEdited { origin, .. }
            | InboundEvent::MessageDeleted { origin, .. }
            | InboundEvent::ReactionAdded { origin, .. }
            | InboundEvent::ReactionRemoved { origin, .. }
            | InboundEvent::MemberJoined { origin, .. }
            | InboundEvent::MemberLeft { origin, .. } => origin,
        }
    }

    pub fn author(&self) -> &Author {
        match self {
            InboundEvent::MessageReceived { author, .. }
            | InboundEvent::CommandReceived { author, .. }
            | InboundEvent::CallbackReceived { author, .. }
            | InboundEvent::ConversationStarted { author, .. }
            | InboundEvent::MessageEdited { author, .. }
            | InboundEvent::MessageDeleted { author, .. }
            | InboundEvent::ReactionAdded { author, .. }
            | InboundEvent::ReactionRemoved { author, .. }
            | InboundEvent::MemberJoined { author, .. }
            | InboundEvent::MemberLeft { author, .. } => author,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
