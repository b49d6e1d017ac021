// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Courier daemon (courierd)
//!
//! Background process mediating chat channels, agent sessions, and local
//! RPC clients. Typically started by the `courier` CLI; not user-facing.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use courier_core::UnconfiguredCoordinator;
use courier_daemon::config::{CliOverrides, DaemonConfig};
use courier_daemon::daemon::{Daemon, DaemonDeps, StopRequest};
use courier_daemon::logging::{
    rotate_log_if_needed, setup_logging, write_startup_error, write_startup_marker, LogFanout,
};
use courier_daemon::shutdown::ShutdownMode;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

/// Window in which a second SIGINT escalates to a hard shutdown.
const SIGINT_ESCALATION_WINDOW: Duration = Duration::from_secs(3);

fn print_help() {
    println!("courierd {}", courier_daemon::VERSION);
    println!("Courier daemon - routes chat channels to agent sessions");
    println!();
    println!("USAGE:");
    println!("    courierd [OPTIONS]");
    println!();
    println!("The daemon is typically started by the `courier` CLI and should");
    println!("not be invoked directly. It listens on a Unix socket.");
    println!();
    println!("OPTIONS:");
    println!("    -s, --socket <path>      Socket path (default: platform runtime dir)");
    println!("    -l, --log-level <lvl>    trace|debug|info|warn|error (default: info)");
    println!("    -d, --data <path>        Data directory (default: platform state dir)");
    println!("    -g, --guidance <path>    Guidance directory (default: <data>/guidance)");
    println!("    -h, --help               Print help information");
    println!("    -V, --version            Print version information");
}

/// Outcome of argument parsing.
#[derive(Debug, PartialEq)]
enum ParsedArgs {
    Run(CliOverrides),
    Help,
    Version,
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<ParsedArgs, String> {
    let mut overrides = CliOverrides::default();
    let mut args = args;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(ParsedArgs::Help),
            "-V" | "--version" => return Ok(ParsedArgs::Version),
            "-s" | "--socket" => {
                let value = args.next().ok_or("--socket requires a path")?;
                overrides.socket = Some(PathBuf::from(value));
            }
            "-l" | "--log-level" => {
                let value = args.next().ok_or("--log-level requires a level")?;
                if !["trace", "debug", "info", "warn", "error"].contains(&value.as_str()) {
                    return Err(format!("unknown log level: {value}"));
                }
                overrides.log_level = Some(value);
            }
            "-d" | "--data" => {
                let value = args.next().ok_or("--data requires a path")?;
                overrides.data_dir = Some(PathBuf::from(value));
            }
            "-g" | "--guidance" => {
                let value = args.next().ok_or("--guidance requires a path")?;
                overrides.guidance_dir = Some(PathBuf::from(value));
            }
            other => return Err(format!("unexpected argument '{other}'")),
        }
    }

    Ok(ParsedArgs::Run(overrides))
}

#[tokio::main]
async fn main() {
    let overrides = match parse_args(std::env::args().skip(1)) {
        Ok(ParsedArgs::Run(overrides)) => overrides,
        Ok(ParsedArgs::Help) => {
            print_help();
            std::process::exit(0);
        }
        Ok(ParsedArgs::Version) => {
            println!("courierd {}", courier_daemon::VERSION);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("Usage: courierd [--socket <path>] [--log-level <lvl>] [--data <path>] [--guidance <path>]");
            std::process::exit(1);
        }
    };

    let config = match DaemonConfig::load(&overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    // Rotate before the appender opens the file, and leave a marker the
    // CLI can use to find this startup attempt.
    rotate_log_if_needed(&config.log_path);
    if let Err(e) = write_startup_marker(&config.log_path) {
        eprintln!("error: cannot write log file: {e}");
        std::process::exit(1);
    }

    let fanout = LogFanout::new();
    let _log_guard = match setup_logging(&config, Arc::clone(&fanout)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: logging setup failed: {e}");
            std::process::exit(1);
        }
    };

    info!(version = courier_daemon::VERSION, "starting courierd");

    // The shipped binary wires no orchestrator or channels; downstream
    // integrations construct `Daemon` with real collaborators through the
    // library API.
    let log_path = config.log_path.clone();
    let daemon = Daemon::new(DaemonDeps {
        config,
        coordinator: Arc::new(UnconfiguredCoordinator::new()),
        channels: Vec::new(),
        model_factory: None,
        adapter_factory: None,
        tools: None,
        app_config: None,
        onboarding: None,
        slash_commands: Vec::new(),
        log_fanout: Some(fanout),
    });

    if let Err(e) = daemon.start().await {
        write_startup_error(&log_path, &e);
        error!(error = %e, "failed to start daemon");
        eprintln!("courierd: failed to start: {e}");
        std::process::exit(1);
    }

    // Signal ready for a parent process waiting on startup
    println!("READY");

    let exit_code = run_signal_loop(&daemon).await;
    std::process::exit(exit_code);
}

/// Wait for a shutdown trigger: signals or `daemon.shutdown` over RPC.
async fn run_signal_loop(daemon: &Arc<Daemon>) -> i32 {
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "cannot install SIGINT handler");
            return 1;
        }
    };
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "cannot install SIGTERM handler");
            return 1;
        }
    };
    let mut sigusr1 = match signal(SignalKind::user_defined1()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "cannot install SIGUSR1 handler");
            return 1;
        }
    };

    let mut stop_rx = match daemon.take_stop_requests() {
        Some(rx) => rx,
        None => {
            error!("stop channel already taken");
            return 1;
        }
    };

    let (done_tx, mut done_rx) = tokio::sync::mpsc::channel::<()>(1);
    let mut stop_task: Option<tokio::task::JoinHandle<()>> = None;
    let mut last_sigint: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = sigint.recv() => {
                let now = Instant::now();
                if let Some(previous) = last_sigint {
                    if now.duration_since(previous) < SIGINT_ESCALATION_WINDOW {
                        warn!("second SIGINT, escalating to hard shutdown");
                        escalate_to_hard(daemon, stop_task.take()).await;
                        return 1;
                    }
                }
                last_sigint = Some(now);
                if stop_task.is_some() {
                    warn!("shutdown already in progress, ignoring SIGINT");
                    continue;
                }
                info!("received SIGINT, shutting down gracefully");
                stop_task = Some(spawn_stop(daemon, ShutdownMode::Graceful, None, done_tx.clone()));
            }

            _ = sigterm.recv() => {
                if stop_task.is_some() {
                    warn!("shutdown already in progress, ignoring SIGTERM");
                    continue;
                }
                info!("received SIGTERM, shutting down gracefully");
                stop_task = Some(spawn_stop(daemon, ShutdownMode::Graceful, None, done_tx.clone()));
            }

            _ = sigusr1.recv() => {
                // Reload stub: semantics intentionally undefined
                info!("received SIGUSR1, config reload requested (stub)");
            }

            request = stop_rx.recv() => {
                let Some(request) = request else { continue };
                if stop_task.is_some() {
                    warn!("shutdown already in progress, ignoring RPC stop request");
                    continue;
                }
                info!(mode = %request.mode, "shutdown requested via RPC");
                stop_task = Some(spawn_stop(daemon, request.mode, request.timeout_ms, done_tx.clone()));
            }

            _ = done_rx.recv() => {
                info!("daemon stopped");
                return 0;
            }
        }
    }
}

fn spawn_stop(
    daemon: &Arc<Daemon>,
    mode: ShutdownMode,
    timeout_ms: Option<u64>,
    done: tokio::sync::mpsc::Sender<()>,
) -> tokio::task::JoinHandle<()> {
    let daemon = Arc::clone(daemon);
    tokio::spawn(async move {
        if let Err(e) = daemon.stop(StopRequest { mode, timeout_ms }).await {
            error!(error = %e, "shutdown failed");
        }
        let _ = done.send(()).await;
    })
}

/// Cancel any in-flight graceful stop and run a bounded hard pass.
///
/// The hard pass races each shutdown-priority group against the per-priority
/// timeout, so escalation always terminates promptly even when a graceful
/// handler is stuck.
async fn escalate_to_hard(daemon: &Arc<Daemon>, stop_task: Option<tokio::task::JoinHandle<()>>) {
    if let Some(task) = stop_task {
        task.abort();
        // Await so the cancelled pass has released the shutdown manager
        // before the hard pass starts.
        let _ = task.await;
    }
    if let Err(e) = daemon
        .stop(StopRequest {
            mode: ShutdownMode::Hard,
            timeout_ms: None,
        })
        .await
    {
        // Graceful may have completed just before the second signal landed
        warn!(error = %e, "hard shutdown during escalation not executed");
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
