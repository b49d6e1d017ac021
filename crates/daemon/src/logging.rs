// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon logging: file appender with startup rotation, plus a tracing
//! layer that feeds the `logs` subscription topic.

use chrono::Utc;
use std::cell::Cell;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::field::{Field, Visit};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::config::DaemonConfig;
use crate::subscriptions::{SubscriptionManager, Topic};

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (courierd.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Startup marker prefix written to the log before anything else, so the
/// CLI can find where the current startup attempt begins.
pub const STARTUP_MARKER_PREFIX: &str = "--- courierd: starting (pid: ";

/// Bridge from the tracing pipeline to `subscription.logs`.
///
/// Created before the subscriber is installed; the subscription manager is
/// attached later, once the daemon has built it.
#[derive(Default)]
pub struct LogFanout {
    subscriptions: OnceLock<Arc<SubscriptionManager>>,
}

impl LogFanout {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn attach(&self, subscriptions: Arc<SubscriptionManager>) {
        let _ = self.subscriptions.set(subscriptions);
    }
}

fn level_rank(level: &str) -> u8 {
    match level {
        "trace" => 0,
        "debug" => 1,
        "info" => 2,
        "warn" => 3,
        "error" => 4,
        _ => 2,
    }
}

thread_local! {
    // Delivering a log notification can itself log (e.g. a dead
    // connection warning); the guard stops that from recursing.
    static IN_FANOUT: Cell<bool> = const { Cell::new(false) };
}

/// Tracing layer wrapping a [`LogFanout`].
pub struct LogFanoutLayer {
    fanout: Arc<LogFanout>,
}

impl LogFanoutLayer {
    pub fn new(fanout: Arc<LogFanout>) -> Self {
        Self { fanout }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }
}

impl<S: tracing::Subscriber> Layer<S> for LogFanoutLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let Some(subscriptions) = self.fanout.subscriptions.get() else {
            return;
        };
        if IN_FANOUT.with(|flag| flag.replace(true)) {
            return;
        }

        let level = event.metadata().level().as_str().to_lowercase();
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let payload = serde_json::json!({
            "level": level,
            "target": event.metadata().target(),
            "message": visitor.message.unwrap_or_default(),
            "timestamp": Utc::now(),
        });

        let event_rank = level_rank(&level);
        let min_level = move |stored: Option<&serde_json::Value>| -> bool {
            match stored.and_then(|f| f["level"].as_str()) {
                Some(min) => event_rank >= level_rank(min),
                None => true,
            }
        };
        subscriptions.notify(Topic::Logs, &payload, Some(&min_level));

        IN_FANOUT.with(|flag| flag.set(false));
    }
}

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `courierd.log` -> `.1` -> `.2` -> `.3`, deleting the oldest.
/// Best-effort: rotation failures never stop the daemon from starting.
pub fn rotate_log_if_needed(log_path: &Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(meta) => meta.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

/// Append the startup marker so the CLI can locate this attempt's output.
pub fn write_startup_marker(log_path: &Path) -> std::io::Result<()> {
    use std::io::Write;

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    writeln!(file, "{}{}) ---\n", STARTUP_MARKER_PREFIX, std::process::id())
}

/// Write a startup error synchronously so it is visible to the CLI even if
/// the process exits before the async appender flushes.
pub fn write_startup_error(log_path: &Path, error: &dyn std::fmt::Display) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {error}");
}

/// Install the tracing subscriber: env-filtered, non-blocking file writer,
/// plus the subscription fanout layer. Returns the appender guard.
pub fn setup_logging(
    config: &DaemonConfig,
    fanout: Arc<LogFanout>,
) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let dir = config
        .log_path
        .parent()
        .ok_or_else(|| std::io::Error::other("log path has no parent"))?;
    let name = config
        .log_path
        .file_name()
        .ok_or_else(|| std::io::Error::other("log path has no file name"))?;
    let file_appender = tracing_appender::rolling::never(dir, name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_env("COURIER_LOG")
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .with(LogFanoutLayer::new(fanout))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
