// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscription manager: live client subscriptions by id, connection, and topic.
//!
//! Topics are a closed set. Filter schemas are topic-specific and opaque
//! here; producers interpret stored filters at `notify` time via the
//! optional per-call predicate.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

use crate::protocol::RpcNotification;
use crate::transport::{SocketServer, TransportError};

/// The closed set of subscribable topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    #[serde(rename = "agents")]
    Agents,
    #[serde(rename = "agent.output")]
    AgentOutput,
    #[serde(rename = "channels")]
    Channels,
    #[serde(rename = "logs")]
    Logs,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Agents => "agents",
            Topic::AgentOutput => "agent.output",
            Topic::Channels => "channels",
            Topic::Logs => "logs",
        }
    }

    /// Notification method name for this topic.
    pub fn notification_method(&self) -> String {
        format!("subscription.{}", self.as_str())
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One live subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub connection_id: String,
    pub topic: Topic,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Delivers notifications to the owning connection.
pub trait NotificationSink: Send + Sync {
    fn send(
        &self,
        connection_id: &str,
        notification: &RpcNotification,
    ) -> Result<(), TransportError>;
}

impl NotificationSink for SocketServer {
    fn send(
        &self,
        connection_id: &str,
        notification: &RpcNotification,
    ) -> Result<(), TransportError> {
        match self.get_connection(connection_id) {
            Some(connection) => connection.notify(notification),
            None => Err(TransportError::ConnectionClosed),
        }
    }
}

#[derive(Default)]
struct SubscriptionState {
    by_id: HashMap<String, Subscription>,
    by_connection: HashMap<String, HashSet<String>>,
    by_topic: HashMap<Topic, HashSet<String>>,
    next_id: u64,
}

/// Tracks subscriptions and fans notifications out to their connections.
pub struct SubscriptionManager {
    state: Mutex<SubscriptionState>,
    sink: Arc<dyn NotificationSink>,
}

impl SubscriptionManager {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            state: Mutex::new(SubscriptionState::default()),
            sink,
        }
    }

    /// Insert a subscription into all three indices atomically.
    pub fn subscribe(
        &self,
        connection_id: &str,
        topic: Topic,
        filter: Option<serde_json::Value>,
    ) -> String {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = format!("sub-{}", state.next_id);

        let subscription = Subscription {
            id: id.clone(),
            connection_id: connection_id.to_string(),
            topic,
            filter,
            created_at: Utc::now(),
        };

        state.by_id.insert(id.clone(), subscription);
        state
            .by_connection
            .entry(connection_id.to_string())
            .or_default()
            .insert(id.clone());
        state.by_topic.entry(topic).or_default().insert(id.clone());

        id
    }

    /// Remove a subscription from all three indices. Returns whether it existed.
    pub fn unsubscribe(&self, subscription_id: &str) -> bool {
        let mut state = self.state.lock();
        let Some(subscription) = state.by_id.remove(subscription_id) else {
            return false;
        };

        if let Some(set) = state.by_connection.get_mut(&subscription.connection_id) {
            set.remove(subscription_id);
            if set.is_empty() {
                state.by_connection.remove(&subscription.connection_id);
            }
        }
        if let Some(set) = state.by_topic.get_mut(&subscription.topic) {
            set.remove(subscription_id);
            if set.is_empty() {
                state.by_topic.remove(&subscription.topic);
            }
        }

        true
    }

    pub fn get(&self, subscription_id: &str) -> Option<Subscription> {
        self.state.lock().by_id.get(subscription_id).cloned()
    }

    /// Subscription ids owned by a connection.
    pub fn get_subscriptions(&self, connection_id: &str) -> Vec<String> {
        self.state
            .lock()
            .by_connection
            .get(connection_id)
            .map(|set| {
                let mut ids: Vec<String> = set.iter().cloned().collect();
                ids.sort();
                ids
            })
            .unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.state.lock().by_id.len()
    }

    /// Notify every subscription on `topic` whose stored filter passes the
    /// per-call predicate. Per-connection send errors are warned and
    /// swallowed.
    pub fn notify(
        &self,
        topic: Topic,
        payload: &serde_json::Value,
        filter: Option<&dyn Fn(Option<&serde_json::Value>) -> bool>,
    ) {
        let targets: Vec<Subscription> = {
            let state = self.state.lock();
            let Some(ids) = state.by_topic.get(&topic) else {
                return;
            };
            ids.iter()
                .filter_map(|id| state.by_id.get(id).cloned())
                .collect()
        };

        let notification = RpcNotification::new(topic.notification_method(), payload.clone());
        for subscription in targets {
            if let Some(predicate) = filter {
                if !predicate(subscription.filter.as_ref()) {
                    continue;
                }
            }
            if let Err(e) = self.sink.send(&subscription.connection_id, &notification) {
                warn!(
                    subscription = %subscription.id,
                    connection = %subscription.connection_id,
                    error = %e,
                    "subscription notify failed"
                );
            }
        }
    }

    /// Drop every subscription owned by a connection.
    pub fn cleanup(&self, connection_id: &str) -> usize {
        let ids = self.get_subscriptions(connection_id);
        let count = ids.len();
        for id in ids {
            self.unsubscribe(&id);
        }
        count
    }
}

#[cfg(test)]
#[path = "subscriptions_tests.rs"]
mod tests;
