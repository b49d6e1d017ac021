// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conversation manager: destination -> agent binding with a reverse index.
//!
//! Invariants maintained by every mutator (both indices move together,
//! under one lock):
//! - every reverse-index entry points at a binding whose agent matches
//! - no destination key maps to more than one binding
//! - unbinding preserves the row

use chrono::Utc;
use courier_core::{AgentSessionId, ConversationBinding, Destination};
use courier_storage::{ConversationStore, StorageError};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, info};

/// Filter for `conversation.list`. Combined fields AND together.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationFilter {
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub has_agent: Option<bool>,
}

#[derive(Default)]
struct ConversationState {
    /// destination key -> binding, in creation order
    bindings: IndexMap<String, ConversationBinding>,
    /// agent id -> destination key
    by_agent: HashMap<AgentSessionId, String>,
}

/// In-memory conversation bindings, persisted across restarts.
pub struct ConversationManager {
    state: Mutex<ConversationState>,
    store: ConversationStore,
}

impl ConversationManager {
    pub fn new(store: ConversationStore) -> Self {
        Self {
            state: Mutex::new(ConversationState::default()),
            store,
        }
    }

    /// Load persisted bindings and rebuild the reverse index.
    pub fn start(&self) {
        let bindings = self.store.load();
        let count = bindings.len();
        self.restore(bindings);
        info!(bindings = count, "conversation manager started");
    }

    /// Persist bindings and clear in-memory state.
    pub fn stop(&self) -> Result<(), StorageError> {
        let snapshot = self.snapshot();
        self.store.save(&snapshot)?;
        let mut state = self.state.lock();
        state.bindings.clear();
        state.by_agent.clear();
        info!(bindings = snapshot.len(), "conversation manager stopped");
        Ok(())
    }

    /// Existing binding for a destination, or a fresh unbound row.
    pub fn get_or_create(&self, destination: &Destination) -> ConversationBinding {
        let mut state = self.state.lock();
        let key = destination.key();
        state
            .bindings
            .entry(key)
            .or_insert_with(|| ConversationBinding::unbound(destination.clone(), Utc::now()))
            .clone()
    }

    /// Bind a destination to an agent, replacing and unindexing any prior one.
    pub fn bind(&self, destination: &Destination, agent_id: &AgentSessionId) {
        let mut state = self.state.lock();
        let key = destination.key();
        let binding = state
            .bindings
            .entry(key.clone())
            .or_insert_with(|| ConversationBinding::unbound(destination.clone(), Utc::now()));

        let prior = binding.agent_id.replace(agent_id.clone());
        binding.last_activity_at = Utc::now();

        if let Some(prior) = prior {
            state.by_agent.remove(&prior);
        }
        // Rebinding the same agent elsewhere: move it, keep the index bijective
        if let Some(old_key) = state.by_agent.insert(agent_id.clone(), key) {
            if let Some(old_binding) = state.bindings.get_mut(&old_key) {
                if old_binding.agent_id.as_ref() == Some(agent_id) {
                    old_binding.agent_id = None;
                }
            }
        }
        debug!(destination = %destination, agent = %agent_id, "conversation bound");
    }

    /// Null the agent of a destination's binding, preserving the row.
    pub fn unbind(&self, destination: &Destination) {
        let mut state = self.state.lock();
        let key = destination.key();
        let Some(binding) = state.bindings.get_mut(&key) else {
            return;
        };
        if let Some(agent_id) = binding.agent_id.take() {
            binding.last_activity_at = Utc::now();
            state.by_agent.remove(&agent_id);
            debug!(destination = %destination, agent = %agent_id, "conversation unbound");
        }
    }

    pub fn get_by_destination(&self, destination: &Destination) -> Option<ConversationBinding> {
        self.state.lock().bindings.get(&destination.key()).cloned()
    }

    pub fn get_by_agent(&self, agent_id: &AgentSessionId) -> Option<ConversationBinding> {
        let state = self.state.lock();
        let key = state.by_agent.get(agent_id)?;
        state.bindings.get(key).cloned()
    }

    /// Bindings matching the filter, in creation order.
    pub fn list(&self, filter: &ConversationFilter) -> Vec<ConversationBinding> {
        self.state
            .lock()
            .bindings
            .values()
            .filter(|b| {
                filter
                    .channel_id
                    .as_ref()
                    .is_none_or(|ch| &b.destination.channel_id == ch)
                    && filter.has_agent.is_none_or(|ha| b.has_agent() == ha)
            })
            .cloned()
            .collect()
    }

    /// All bindings, for persistence.
    pub fn snapshot(&self) -> Vec<ConversationBinding> {
        self.state.lock().bindings.values().cloned().collect()
    }

    /// Replace state with the given bindings, rebuilding the reverse index.
    pub fn restore(&self, bindings: Vec<ConversationBinding>) {
        let mut state = self.state.lock();
        state.bindings.clear();
        state.by_agent.clear();
        for binding in bindings {
            let key = binding.key();
            if let Some(agent_id) = &binding.agent_id {
                state.by_agent.insert(agent_id.clone(), key.clone());
            }
            state.bindings.insert(key, binding);
        }
    }

    /// Total number of rows, bound or not.
    pub fn total_count(&self) -> usize {
        self.state.lock().bindings.len()
    }

    /// Number of rows currently bound to an agent.
    pub fn active_count(&self) -> usize {
        self.state.lock().by_agent.len()
    }
}

#[cfg(test)]
#[path = "conversations_tests.rs"]
mod tests;
