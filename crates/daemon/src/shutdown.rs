// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shutdown manager: priority-ordered, named shutdown handlers.
//!
//! Lower priorities run first. Handlers within one priority run in
//! parallel; the next priority starts only when the group has completed
//! (graceful) or its per-priority timeout has elapsed (hard).

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Shutdown execution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Await every handler to completion.
    Graceful,
    /// Race each priority group against a timeout.
    Hard,
}

impl std::fmt::Display for ShutdownMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownMode::Graceful => f.write_str("graceful"),
            ShutdownMode::Hard => f.write_str("hard"),
        }
    }
}

/// Default budget for one priority group under hard shutdown.
pub const DEFAULT_PRIORITY_TIMEOUT: Duration = Duration::from_secs(5);

type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), String>> + Send>>;
type HandlerFn = Arc<dyn Fn(ShutdownMode) -> HandlerFuture + Send + Sync>;

struct Registered {
    priority: i32,
    run: HandlerFn,
}

/// Registry and executor for shutdown handlers.
pub struct ShutdownManager {
    handlers: Mutex<HashMap<String, Registered>>,
    executing: AtomicBool,
    shutting_down: AtomicBool,
    priority_timeout: Duration,
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self::with_priority_timeout(DEFAULT_PRIORITY_TIMEOUT)
    }

    pub fn with_priority_timeout(priority_timeout: Duration) -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
            executing: AtomicBool::new(false),
            shutting_down: AtomicBool::new(false),
            priority_timeout,
        }
    }

    /// Register a handler. A same-named handler is replaced with a warning.
    pub fn register<F, Fut>(&self, name: &str, priority: i32, f: F)
    where
        F: Fn(ShutdownMode) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        let mut handlers = self.handlers.lock();
        if handlers.contains_key(name) {
            warn!(handler = name, "replacing shutdown handler");
        }
        handlers.insert(
            name.to_string(),
            Registered {
                priority,
                run: Arc::new(move |mode| Box::pin(f(mode))),
            },
        );
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.handlers.lock().remove(name).is_some()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Run all handlers, ascending by priority.
    ///
    /// A concurrent second invocation warns and returns without running
    /// anything. `is_shutting_down` flips true on entry and stays true.
    pub async fn execute(&self, mode: ShutdownMode) {
        self.execute_with(mode, None).await;
    }

    /// Like [`execute`](Self::execute), with a per-priority timeout override
    /// for hard mode.
    pub async fn execute_with(&self, mode: ShutdownMode, priority_timeout: Option<Duration>) {
        if self.executing.swap(true, Ordering::SeqCst) {
            warn!("shutdown already executing, ignoring request");
            return;
        }
        // Released on drop, so a cancelled graceful pass does not wedge the
        // slot against a later hard escalation.
        let _slot = ExecutionSlot {
            flag: &self.executing,
        };
        self.shutting_down.store(true, Ordering::SeqCst);
        info!(%mode, "shutdown starting");

        let groups: BTreeMap<i32, Vec<(String, HandlerFn)>> = {
            let handlers = self.handlers.lock();
            let mut groups: BTreeMap<i32, Vec<(String, HandlerFn)>> = BTreeMap::new();
            for (name, registered) in handlers.iter() {
                groups
                    .entry(registered.priority)
                    .or_default()
                    .push((name.clone(), Arc::clone(&registered.run)));
            }
            groups
        };

        let budget = priority_timeout.unwrap_or(self.priority_timeout);
        for (priority, group) in groups {
            self.run_group(mode, priority, group, budget).await;
        }

        info!(%mode, "shutdown complete");
    }

    async fn run_group(
        &self,
        mode: ShutdownMode,
        priority: i32,
        group: Vec<(String, HandlerFn)>,
        budget: Duration,
    ) {
        let mut set = JoinSet::new();
        for (name, run) in group {
            set.spawn(async move {
                let result = run(mode).await;
                (name, result)
            });
        }

        match mode {
            ShutdownMode::Graceful => {
                while let Some(joined) = set.join_next().await {
                    log_handler_result(priority, joined);
                }
            }
            ShutdownMode::Hard => {
                let drain = async {
                    while let Some(joined) = set.join_next().await {
                        log_handler_result(priority, joined);
                    }
                };
                if tokio::time::timeout(budget, drain).await.is_err() {
                    warn!(
                        priority,
                        timeout_ms = budget.as_millis() as u64,
                        "shutdown priority group timed out, proceeding"
                    );
                    set.abort_all();
                }
            }
        }
    }
}

struct ExecutionSlot<'a> {
    flag: &'a AtomicBool,
}

impl Drop for ExecutionSlot<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

fn log_handler_result(
    priority: i32,
    joined: Result<(String, Result<(), String>), tokio::task::JoinError>,
) {
    match joined {
        Ok((name, Ok(()))) => {
            info!(handler = %name, priority, "shutdown handler finished");
        }
        Ok((name, Err(e))) => {
            error!(handler = %name, priority, error = %e, "shutdown handler failed");
        }
        Err(e) => {
            error!(priority, error = %e, "shutdown handler panicked");
        }
    }
}

#[cfg(test)]
#[path = "shutdown_tests.rs"]
mod tests;
