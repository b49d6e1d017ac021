// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conversation binding persistence.
//!
//! Bindings are stored as a JSON array with ISO-8601 timestamps. Loading
//! tolerates a missing file (fresh install) silently and malformed content
//! with a warning -- the daemon starts with an empty set rather than
//! refusing to boot.

use courier_core::ConversationBinding;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

use crate::atomic::{write_atomic, StorageError};

/// On-disk store for conversation bindings.
pub struct ConversationStore {
    path: PathBuf,
}

impl ConversationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Load all persisted bindings.
    pub fn load(&self) -> Vec<ConversationBinding> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read conversation store");
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(bindings) => bindings,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "malformed conversation store, starting empty"
                );
                Vec::new()
            }
        }
    }

    /// Persist the binding set atomically.
    pub fn save(&self, bindings: &[ConversationBinding]) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(bindings)?;
        write_atomic(&self.path, &json)
    }
}

#[cfg(test)]
#[path = "conversations_tests.rs"]
mod tests;
