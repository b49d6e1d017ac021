// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Last-active tracker: the most recent user-originated destination.
//!
//! Updated by the router on user activity only; pulse output never touches
//! it. Serves the pulse job's `"lastActive"` routing.

use chrono::{DateTime, Utc};
use courier_core::Destination;
use courier_storage::{LastActiveState, LastActiveStore, StorageError};
use parking_lot::Mutex;
use tracing::debug;

pub struct LastActiveTracker {
    state: Mutex<Option<(Destination, DateTime<Utc>)>>,
    store: LastActiveStore,
}

impl LastActiveTracker {
    pub fn new(store: LastActiveStore) -> Self {
        Self {
            state: Mutex::new(None),
            store,
        }
    }

    /// Record a user-originated destination.
    pub fn update(&self, destination: &Destination) {
        *self.state.lock() = Some((destination.clone(), Utc::now()));
        debug!(destination = %destination, "last-active updated");
    }

    pub fn get(&self) -> Option<Destination> {
        self.state.lock().as_ref().map(|(d, _)| d.clone())
    }

    /// Load persisted state, if any.
    pub fn load(&self) {
        if let Some(state) = self.store.load() {
            if let Some(destination) = state.destination {
                *self.state.lock() = Some((destination, state.updated_at));
            }
        }
    }

    /// Persist current state. No-op when no destination has been seen.
    pub fn save(&self) -> Result<(), StorageError> {
        let Some((destination, updated_at)) = self.state.lock().clone() else {
            return Ok(());
        };
        self.store.save(&LastActiveState {
            destination: Some(destination),
            updated_at,
        })
    }
}

#[cfg(test)]
#[path = "last_active_tests.rs"]
mod tests;
