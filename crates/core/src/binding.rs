// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conversation bindings: one destination, at most one agent session.

use crate::agent::AgentSessionId;
use crate::destination::Destination;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row linking one channel destination to at most one agent session.
///
/// Rows are never deleted; unbinding nulls the agent so history queries
/// stay consistent across rebinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationBinding {
    pub destination: Destination,
    #[serde(default)]
    pub agent_id: Option<AgentSessionId>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl ConversationBinding {
    /// Fresh unbound row for a destination.
    pub fn unbound(destination: Destination, now: DateTime<Utc>) -> Self {
        Self {
            destination,
            agent_id: None,
            created_at: now,
            last_activity_at: now,
        }
    }

    pub fn has_agent(&self) -> bool {
        self.agent_id.is_some()
    }

    /// Index key, derived from the destination.
    pub fn key(&self) -> String {
        self.destination.key()
    }
}

#[cfg(test)]
#[path = "binding_tests.rs"]
mod tests;
