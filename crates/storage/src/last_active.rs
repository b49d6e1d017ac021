// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Last-active destination persistence.

use chrono::{DateTime, Utc};
use courier_core::Destination;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

use crate::atomic::{write_atomic, StorageError};

/// Persisted shape of the last user-originated destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastActiveState {
    pub destination: Option<Destination>,
    pub updated_at: DateTime<Utc>,
}

/// On-disk store for [`LastActiveState`].
pub struct LastActiveStore {
    path: PathBuf,
}

impl LastActiveStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load persisted state. Missing file is silent; malformed content warns.
    pub fn load(&self) -> Option<LastActiveState> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read last-active state");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "malformed last-active state, ignoring"
                );
                None
            }
        }
    }

    /// Persist state atomically, creating parent directories as needed.
    pub fn save(&self, state: &LastActiveState) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(state)?;
        write_atomic(&self.path, &json)
    }
}

#[cfg(test)]
#[path = "last_active_tests.rs"]
mod tests;
