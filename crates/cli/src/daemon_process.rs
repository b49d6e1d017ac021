// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Starting and probing the daemon process from the CLI.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Instant;

use crate::client::{poll_interval, timeout_connect, ClientError, DaemonClient};
use courier_daemon::logging::STARTUP_MARKER_PREFIX;

/// Locate the daemon binary: next to the CLI binary, else on PATH.
pub fn daemon_binary() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        let sibling = exe.with_file_name("courierd");
        if sibling.exists() {
            return sibling;
        }
    }
    PathBuf::from("courierd")
}

/// Spawn the daemon detached in the background.
pub fn start_daemon_background(
    socket_path: &Path,
    data_dir: Option<&Path>,
) -> std::io::Result<Child> {
    let mut command = Command::new(daemon_binary());
    command
        .arg("--socket")
        .arg(socket_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    if let Some(data_dir) = data_dir {
        command.arg("--data").arg(data_dir);
    }
    command.spawn()
}

/// Whether something is accepting connections at the socket path.
pub fn probe_socket(socket_path: &Path) -> bool {
    std::os::unix::net::UnixStream::connect(socket_path).is_ok()
}

/// Scan the daemon log for an error belonging to the latest startup attempt.
pub fn read_startup_error(log_path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(log_path).ok()?;
    let start = content.rfind(STARTUP_MARKER_PREFIX)?;
    content[start..]
        .lines()
        .find(|line| line.contains("ERROR Failed to start daemon:"))
        .and_then(|line| line.split("ERROR Failed to start daemon:").nth(1))
        .map(|message| message.trim().to_string())
}

/// Connect to the daemon, starting it in the background if needed.
pub async fn connect_or_start(
    socket_path: &Path,
    data_dir: Option<&Path>,
    log_path: Option<&Path>,
) -> Result<DaemonClient, ClientError> {
    if probe_socket(socket_path) {
        return DaemonClient::connect(socket_path).await;
    }

    // Stale socket file: remove so the daemon can rebind
    if socket_path.exists() {
        let _ = std::fs::remove_file(socket_path);
    }

    let mut child = start_daemon_background(socket_path, data_dir)
        .map_err(|e| ClientError::DaemonStartFailed(e.to_string()))?;

    let deadline = Instant::now() + timeout_connect();
    while Instant::now() < deadline {
        // Early exit means the startup failed; surface the logged error
        if let Ok(Some(status)) = child.try_wait() {
            let message = log_path
                .and_then(read_startup_error)
                .unwrap_or_else(|| format!("exited with {status}"));
            return Err(ClientError::DaemonStartFailed(message));
        }
        if probe_socket(socket_path) {
            return DaemonClient::connect(socket_path).await;
        }
        tokio::time::sleep(poll_interval()).await;
    }

    Err(ClientError::ConnectTimeout)
}

#[cfg(test)]
#[path = "daemon_process_tests.rs"]
mod tests;
