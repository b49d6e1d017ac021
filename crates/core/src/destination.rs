// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conversational endpoints: the `(channelId, ref)` pair.

use serde::{Deserialize, Serialize};

/// A conversational endpoint on one channel (e.g. a chat or a group).
///
/// The pair is the identity; per-event metadata travels separately in
/// [`crate::event::EventOrigin`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    /// Channel adapter identifier (opaque)
    pub channel_id: String,
    /// Channel-scoped conversation reference (opaque)
    #[serde(rename = "ref")]
    pub conversation_ref: String,
}

impl Destination {
    pub fn new(channel_id: impl Into<String>, conversation_ref: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            conversation_ref: conversation_ref.into(),
        }
    }

    /// Deterministic injective key for indexing.
    ///
    /// A bare `channel:ref` join would alias when a channel id itself
    /// contains a colon, so the channel id is length-prefixed: everything
    /// after the second colon is unambiguously the ref.
    pub fn key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.channel_id.len(),
            self.channel_id,
            self.conversation_ref
        )
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.channel_id, self.conversation_ref)
    }
}

#[cfg(test)]
#[path = "destination_tests.rs"]
mod tests;
