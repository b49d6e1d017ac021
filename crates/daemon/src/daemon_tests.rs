// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use courier_core::fake::{FakeChannel, FakeCoordinator};
use std::collections::HashMap;
use std::path::Path;
use tempfile::TempDir;

fn test_config(dir: &Path) -> DaemonConfig {
    DaemonConfig {
        data_dir: dir.to_path_buf(),
        socket_path: dir.join("daemon.sock"),
        guidance_dir: dir.join("guidance"),
        lock_path: dir.join("daemon.pid"),
        version_path: dir.join("daemon.version"),
        log_path: dir.join("courierd.log"),
        conversations_path: dir.join("conversations.json"),
        last_active_path: dir.join("last-active.json"),
        log_level: "info".to_string(),
        default_model: None,
        pulse: None,
        destinations: HashMap::new(),
    }
}

fn deps(config: DaemonConfig) -> DaemonDeps {
    DaemonDeps {
        config,
        coordinator: Arc::new(FakeCoordinator::new()),
        channels: Vec::new(),
        model_factory: None,
        adapter_factory: None,
        tools: None,
        app_config: None,
        onboarding: None,
        slash_commands: Vec::new(),
        log_fanout: None,
    }
}

#[tokio::test]
async fn start_and_stop_lifecycle() {
    let dir = TempDir::new().unwrap();
    let daemon = Daemon::new(deps(test_config(dir.path())));
    assert_eq!(daemon.state(), DaemonState::Stopped);

    daemon.start().await.unwrap();
    assert_eq!(daemon.state(), DaemonState::Running);
    assert!(daemon.config().socket_path.exists());
    assert!(daemon.config().lock_path.exists());
    assert_eq!(
        std::fs::read_to_string(&daemon.config().version_path).unwrap(),
        crate::VERSION
    );

    let status = daemon.status();
    assert_eq!(status.state, DaemonState::Running);
    assert_eq!(status.agent_count, 0);
    assert_eq!(status.channel_count, 0);

    daemon
        .stop(StopRequest {
            mode: ShutdownMode::Graceful,
            timeout_ms: None,
        })
        .await
        .unwrap();
    assert_eq!(daemon.state(), DaemonState::Stopped);
    assert!(!daemon.config().socket_path.exists());
    assert!(!daemon.config().lock_path.exists());
    assert!(!daemon.config().version_path.exists());
}

#[tokio::test]
async fn start_refused_when_running() {
    let dir = TempDir::new().unwrap();
    let daemon = Daemon::new(deps(test_config(dir.path())));
    daemon.start().await.unwrap();

    let err = daemon.start().await;
    assert!(matches!(err, Err(DaemonError::NotStopped(DaemonState::Running))));

    daemon
        .stop(StopRequest {
            mode: ShutdownMode::Graceful,
            timeout_ms: None,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn stop_refused_when_stopped() {
    let dir = TempDir::new().unwrap();
    let daemon = Daemon::new(deps(test_config(dir.path())));
    let err = daemon
        .stop(StopRequest {
            mode: ShutdownMode::Graceful,
            timeout_ms: None,
        })
        .await;
    assert!(matches!(err, Err(DaemonError::NotRunning(DaemonState::Stopped))));
}

#[tokio::test]
async fn boot_failure_reverts_to_stopped() {
    let dir = TempDir::new().unwrap();
    // Socket parent is a regular file: bind must fail
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"x").unwrap();

    let mut config = test_config(dir.path());
    config.socket_path = blocker.join("daemon.sock");

    let daemon = Daemon::new(deps(config));
    assert!(daemon.start().await.is_err());
    assert_eq!(daemon.state(), DaemonState::Stopped);
    assert!(!daemon.config().lock_path.exists(), "lock cleaned up");
}

#[tokio::test]
async fn second_daemon_fails_to_acquire_lock() {
    let dir = TempDir::new().unwrap();
    let first = Daemon::new(deps(test_config(dir.path())));
    first.start().await.unwrap();

    let mut second_config = test_config(dir.path());
    second_config.socket_path = dir.path().join("other.sock");
    let second = Daemon::new(deps(second_config));
    let err = second.start().await;
    assert!(matches!(err, Err(DaemonError::AlreadyRunning(_))));
    assert_eq!(second.state(), DaemonState::Stopped);

    first
        .stop(StopRequest {
            mode: ShutdownMode::Graceful,
            timeout_ms: None,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn channel_connect_failure_does_not_abort_boot() {
    let dir = TempDir::new().unwrap();
    let bad = FakeChannel::new("bad");
    bad.set_connect_error(courier_core::ChannelError::ConnectFailed(
        "auth".to_string(),
    ));
    let good = FakeChannel::new("good");

    let mut d = deps(test_config(dir.path()));
    let bad_dyn: Arc<dyn Channel> = bad.clone();
    let good_dyn: Arc<dyn Channel> = good.clone();
    d.channels = vec![bad_dyn, good_dyn];
    let daemon = Daemon::new(d);

    daemon.start().await.unwrap();
    assert_eq!(daemon.state(), DaemonState::Running);
    assert!(good.is_connected());
    assert!(!bad.is_connected());
    assert_eq!(daemon.status().channel_count, 2);

    daemon
        .stop(StopRequest {
            mode: ShutdownMode::Graceful,
            timeout_ms: None,
        })
        .await
        .unwrap();
    assert!(!good.is_connected(), "channels disconnected at shutdown");
}

#[tokio::test]
async fn restart_after_stop_is_allowed() {
    let dir = TempDir::new().unwrap();
    let daemon = Daemon::new(deps(test_config(dir.path())));

    daemon.start().await.unwrap();
    daemon
        .stop(StopRequest {
            mode: ShutdownMode::Graceful,
            timeout_ms: None,
        })
        .await
        .unwrap();

    // Fresh controller over the same data dir (files were released)
    let again = Daemon::new(deps(test_config(dir.path())));
    again.start().await.unwrap();
    assert_eq!(again.state(), DaemonState::Running);
    again
        .stop(StopRequest {
            mode: ShutdownMode::Graceful,
            timeout_ms: None,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn hard_stop_supersedes_cancelled_graceful() {
    let dir = TempDir::new().unwrap();
    let daemon = Daemon::new(deps(test_config(dir.path())));
    daemon.start().await.unwrap();

    // A collaborator whose graceful shutdown never returns
    daemon.shutdown.register("stalled-collaborator", 15, |_| async {
        tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        Ok(())
    });

    let graceful = {
        let daemon = Arc::clone(&daemon);
        tokio::spawn(async move {
            let _ = daemon
                .stop(StopRequest {
                    mode: ShutdownMode::Graceful,
                    timeout_ms: None,
                })
                .await;
        })
    };
    for _ in 0..200 {
        if daemon.state() == DaemonState::Stopping {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert_eq!(daemon.state(), DaemonState::Stopping);

    graceful.abort();
    let _ = graceful.await;
    daemon.shutdown.unregister("stalled-collaborator");

    // Escalation: a hard stop is accepted while stopping
    daemon
        .stop(StopRequest {
            mode: ShutdownMode::Hard,
            timeout_ms: None,
        })
        .await
        .unwrap();
    assert_eq!(daemon.state(), DaemonState::Stopped);

    // A graceful stop while stopped is still refused
    let err = daemon
        .stop(StopRequest {
            mode: ShutdownMode::Graceful,
            timeout_ms: None,
        })
        .await;
    assert!(matches!(err, Err(DaemonError::NotRunning(DaemonState::Stopped))));
}

#[tokio::test]
async fn pulse_config_registers_scheduler_job() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.pulse = Some(crate::config::PulseConfig {
        schedule: "*/5 * * * *".to_string(),
        response_to: None,
        prompt_path: None,
        model: Some("acme/large".to_string()),
    });

    let daemon = Daemon::new(deps(config));
    daemon.start().await.unwrap();
    assert_eq!(daemon.scheduler.job_names(), vec!["pulse"]);
    assert!(daemon.scheduler.next_run("pulse").is_some());

    daemon
        .stop(StopRequest {
            mode: ShutdownMode::Graceful,
            timeout_ms: None,
        })
        .await
        .unwrap();
    assert!(!daemon.scheduler.is_running());
}
