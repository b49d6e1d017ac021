// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron-driven job runner.
//!
//! Jobs are registered by name with a cron expression. A failed tick is
//! logged and never tears down the scheduler.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cron::Schedule;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Scheduler errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("duplicate job: {0}")]
    DuplicateJob(String),

    #[error("invalid cron expression for {name}: {source}")]
    InvalidSchedule {
        name: String,
        #[source]
        source: cron::error::Error,
    },
}

/// A named job the scheduler ticks.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    fn name(&self) -> &str;
    async fn execute(&self) -> Result<(), String>;
}

struct Entry {
    job: Arc<dyn ScheduledJob>,
    schedule: Schedule,
    task: Option<JoinHandle<()>>,
}

/// Cron job registry and runner.
pub struct Scheduler {
    entries: Mutex<HashMap<String, Entry>>,
    running: AtomicBool,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            running: AtomicBool::new(false),
        }
    }

    /// Register a job. Duplicate names are rejected. If the scheduler is
    /// already running, the job starts ticking immediately.
    pub fn register(
        &self,
        job: Arc<dyn ScheduledJob>,
        schedule: &str,
    ) -> Result<(), SchedulerError> {
        let name = job.name().to_string();
        let schedule = parse_schedule(&name, schedule)?;

        let mut entries = self.entries.lock();
        if entries.contains_key(&name) {
            return Err(SchedulerError::DuplicateJob(name));
        }

        let task = if self.running.load(Ordering::SeqCst) {
            Some(spawn_ticker(Arc::clone(&job), schedule.clone()))
        } else {
            None
        };

        entries.insert(
            name.clone(),
            Entry {
                job,
                schedule,
                task,
            },
        );
        info!(job = %name, "job registered");
        Ok(())
    }

    /// Start ticking all registered jobs.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut entries = self.entries.lock();
        for (name, entry) in entries.iter_mut() {
            if entry.task.is_none() {
                entry.task = Some(spawn_ticker(Arc::clone(&entry.job), entry.schedule.clone()));
                debug!(job = %name, "job ticking");
            }
        }
        info!("scheduler started");
    }

    /// Stop all tick loops.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let mut entries = self.entries.lock();
        for entry in entries.values_mut() {
            if let Some(task) = entry.task.take() {
                task.abort();
            }
        }
        info!("scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Next scheduled instant for a job, if it is registered.
    pub fn next_run(&self, name: &str) -> Option<DateTime<Utc>> {
        self.entries
            .lock()
            .get(name)
            .and_then(|entry| entry.schedule.upcoming(Utc).next())
    }

    pub fn job_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Parse a cron expression, accepting the five-field form by prepending a
/// seconds column.
fn parse_schedule(name: &str, expression: &str) -> Result<Schedule, SchedulerError> {
    let normalized = if expression.split_whitespace().count() == 5 {
        format!("0 {expression}")
    } else {
        expression.to_string()
    };
    Schedule::from_str(&normalized).map_err(|source| SchedulerError::InvalidSchedule {
        name: name.to_string(),
        source,
    })
}

fn spawn_ticker(job: Arc<dyn ScheduledJob>, schedule: Schedule) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let Some(next) = schedule.upcoming(Utc).next() else {
                break;
            };
            let delay = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(delay).await;

            debug!(job = job.name(), "tick");
            if let Err(e) = job.execute().await {
                error!(job = job.name(), error = %e, "scheduled job failed");
            }
        }
    })
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
