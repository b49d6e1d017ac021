// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon runtime configuration and platform path resolution.
//!
//! Full application-config management (secrets, onboarding) is an external
//! collaborator; the daemon reads only the subset it needs from
//! `courier.toml` in the data directory.

use courier_core::Destination;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to parse {0}: {1}")]
    Parse(PathBuf, toml::de::Error),
}

/// Pulse job settings from `courier.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PulseConfig {
    /// Cron expression (five-field)
    pub schedule: String,
    /// `"lastActive"`, a named destination, or absent for silent pulses
    #[serde(default)]
    pub response_to: Option<String>,
    /// Guidance file the pulse agent is pointed at
    #[serde(default)]
    pub prompt_path: Option<PathBuf>,
    /// Model identifier for pulse spawns, `"provider/model-name"`
    #[serde(default)]
    pub model: Option<String>,
}

/// A named destination from `courier.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationConfig {
    pub channel: String,
    #[serde(rename = "ref")]
    pub conversation_ref: String,
}

impl DestinationConfig {
    pub fn to_destination(&self) -> Destination {
        Destination::new(&self.channel, &self.conversation_ref)
    }
}

/// Subset of `courier.toml` the daemon consumes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileConfig {
    #[serde(default)]
    default_model: Option<String>,
    #[serde(default)]
    pulse: Option<PulseConfig>,
    #[serde(default)]
    destinations: HashMap<String, DestinationConfig>,
}

/// Command-line overrides applied on top of environment resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub socket: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub guidance_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Resolved daemon configuration.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Data directory (e.g. ~/.local/state/courier)
    pub data_dir: PathBuf,
    /// Path to the Unix socket
    pub socket_path: PathBuf,
    /// Guidance files directory
    pub guidance_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to version file
    pub version_path: PathBuf,
    /// Path to the daemon log file
    pub log_path: PathBuf,
    /// Path to persisted conversation bindings
    pub conversations_path: PathBuf,
    /// Path to persisted last-active state
    pub last_active_path: PathBuf,
    /// Log level filter (trace|debug|info|warn|error)
    pub log_level: String,
    /// Default model for conversation spawns
    pub default_model: Option<String>,
    /// Pulse job settings, if configured
    pub pulse: Option<PulseConfig>,
    /// Named pulse destinations
    pub destinations: HashMap<String, DestinationConfig>,
}

impl DaemonConfig {
    /// Resolve configuration from CLI flags, environment, and `courier.toml`.
    pub fn load(overrides: &CliOverrides) -> Result<Self, ConfigError> {
        let data_dir = match &overrides.data_dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()?,
        };

        let socket_path = match &overrides.socket {
            Some(path) => path.clone(),
            None => default_socket_path(),
        };

        let guidance_dir = overrides
            .guidance_dir
            .clone()
            .unwrap_or_else(|| data_dir.join("guidance"));

        let file = read_file_config(&data_dir.join("courier.toml"))?;

        Ok(Self {
            socket_path,
            guidance_dir,
            lock_path: data_dir.join("daemon.pid"),
            version_path: data_dir.join("daemon.version"),
            log_path: data_dir.join("courierd.log"),
            conversations_path: data_dir.join("conversations.json"),
            last_active_path: data_dir.join("last-active.json"),
            log_level: overrides
                .log_level
                .clone()
                .unwrap_or_else(|| "info".to_string()),
            default_model: file.default_model,
            pulse: file.pulse,
            destinations: file.destinations,
            data_dir,
        })
    }

    /// Subset of the configuration safe to expose over RPC.
    pub fn safe_subset(&self) -> serde_json::Value {
        serde_json::json!({
            "dataDir": self.data_dir,
            "socketPath": self.socket_path,
            "guidanceDir": self.guidance_dir,
            "logLevel": self.log_level,
            "defaultModel": self.default_model,
            "pulse": self.pulse,
            "destinations": self.destinations,
        })
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(FileConfig::default()),
        Err(e) => return Err(ConfigError::Read(path.to_path_buf(), e)),
    };
    toml::from_str(&raw).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
}

/// Default socket path: `$COURIER_SOCKET`, then `$XDG_RUNTIME_DIR`, then /tmp.
pub fn default_socket_path() -> PathBuf {
    if let Ok(path) = std::env::var("COURIER_SOCKET") {
        return PathBuf::from(path);
    }
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join("courier-daemon.sock");
    }
    PathBuf::from("/tmp/courier-daemon.sock")
}

/// Default data directory: `$COURIER_STATE_DIR` (test isolation), then
/// `$XDG_STATE_HOME/courier`, then `~/.local/state/courier`.
pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("COURIER_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("courier"));
    }
    dirs::home_dir()
        .map(|home| home.join(".local/state/courier"))
        .ok_or(ConfigError::NoStateDir)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
