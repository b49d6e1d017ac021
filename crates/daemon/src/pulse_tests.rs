// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use courier_core::fake::{FakeChannel, FakeCoordinator, FakeModelFactory};
use courier_core::AgentResult;
use courier_storage::LastActiveStore;
use tempfile::TempDir;
use yare::parameterized;

struct Fixture {
    coordinator: FakeCoordinator,
    channel: Arc<FakeChannel>,
    last_active: Arc<LastActiveTracker>,
    job: PulseJob,
    _dir: TempDir,
}

fn fixture(response_to: Option<&str>) -> Fixture {
    let dir = TempDir::new().unwrap();
    let coordinator = FakeCoordinator::new();
    let channels = Arc::new(ChannelRegistry::new());
    let channel = FakeChannel::new("tg1");
    channels.register(channel.clone());
    let last_active = Arc::new(LastActiveTracker::new(LastActiveStore::new(
        dir.path().join("last-active.json"),
    )));

    let mut destinations = HashMap::new();
    destinations.insert(
        "ops".to_string(),
        DestinationConfig {
            channel: "tg1".to_string(),
            conversation_ref: "ops-room".to_string(),
        },
    );

    let job = PulseJob::new(
        PulseDeps {
            coordinator: Arc::new(coordinator.clone()),
            channels,
            last_active: Arc::clone(&last_active),
            model_factory: Some(Arc::new(FakeModelFactory::new())),
            tools: None,
        },
        PulseConfig {
            schedule: "* * * * *".to_string(),
            response_to: response_to.map(String::from),
            prompt_path: None,
            model: Some("acme/large".to_string()),
        },
        destinations,
        None,
    )
    .with_response_timeout(Duration::from_millis(500));

    Fixture {
        coordinator,
        channel,
        last_active,
        job,
        _dir: dir,
    }
}

/// Run the pulse while feeding the spawned session the given events.
async fn run_with_events(fx: &Fixture, events: Vec<AgentEvent>) -> PulseOutcome {
    let coordinator = fx.coordinator.clone();
    let feeder = tokio::spawn(async move {
        // FakeCoordinator ids are sequential; the pulse spawn is the first.
        let id = AgentSessionId::new("agent-1");
        for _ in 0..100 {
            if coordinator.session_count() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        for event in events {
            coordinator.emit(CoordinatorEvent::AgentEvent {
                id: id.clone(),
                event,
            });
        }
    });

    let outcome = fx.job.run_once().await.unwrap();
    feeder.await.unwrap();
    outcome
}

#[test]
fn rest_marker_variants() {
    assert!(is_rest_marker("<rest />"));
    assert!(is_rest_marker("<rest/>"));
    assert!(is_rest_marker("<rest  />"));
    assert!(is_rest_marker("<rest>"));
    assert!(!is_rest_marker("resting"));
    assert!(!is_rest_marker("all done"));
}

#[parameterized(
    absent = { None },
    unknown = { Some("nope") },
)]
#[test_macro(tokio::test)]
async fn resolver_is_silent(response_to: Option<&str>) {
    let fx = fixture(response_to);
    let (destination, resolution) = fx.job.resolve_destination();
    assert!(destination.is_none());
    assert_eq!(resolution, PulseResolution::Silent);
}

#[tokio::test]
async fn resolver_last_active_unset_is_silent() {
    let fx = fixture(Some("lastActive"));
    let (destination, resolution) = fx.job.resolve_destination();
    assert!(destination.is_none());
    assert_eq!(resolution, PulseResolution::Silent);
}

#[tokio::test]
async fn resolver_last_active_set() {
    let fx = fixture(Some("lastActive"));
    fx.last_active.update(&Destination::new("tg1", "u1"));
    let (destination, resolution) = fx.job.resolve_destination();
    assert_eq!(destination, Some(Destination::new("tg1", "u1")));
    assert_eq!(resolution, PulseResolution::LastActive);
}

#[tokio::test]
async fn resolver_named_destination() {
    let fx = fixture(Some("ops"));
    let (destination, resolution) = fx.job.resolve_destination();
    assert_eq!(destination, Some(Destination::new("tg1", "ops-room")));
    assert_eq!(resolution, PulseResolution::Named);
}

#[tokio::test(flavor = "multi_thread")]
async fn pulse_spawn_is_tagged_and_prompted() {
    let fx = fixture(Some("ops"));
    run_with_events(
        &fx,
        vec![AgentEvent::Done {
            result: AgentResult::default(),
        }],
    )
    .await;

    let spawn = fx
        .coordinator
        .calls()
        .into_iter()
        .find_map(|c| match c {
            courier_core::fake::CoordinatorCall::Spawn {
                tags,
                metadata,
                initial_message,
                ..
            } => Some((tags, metadata, initial_message)),
            _ => None,
        })
        .expect("spawn call");
    assert_eq!(spawn.0, vec!["pulse".to_string(), "scheduled".to_string()]);
    assert_eq!(spawn.1["isPulse"], true);
    assert_eq!(spawn.1["hasResponseDestination"], true);
    assert!(spawn.2.unwrap().contains("<rest />"));
}

#[tokio::test(flavor = "multi_thread")]
async fn rest_response_is_suppressed() {
    let fx = fixture(Some("lastActive"));
    fx.last_active.update(&Destination::new("tg1", "u1"));

    let outcome = run_with_events(
        &fx,
        vec![
            AgentEvent::Output {
                text: "<rest />".to_string(),
                is_final: true,
            },
            AgentEvent::Done {
                result: AgentResult::default(),
            },
        ],
    )
    .await;

    assert!(outcome.suppressed);
    assert!(!outcome.delivered);
    assert!(fx.channel.processed().is_empty(), "no outbound intent");
}

#[tokio::test(flavor = "multi_thread")]
async fn response_is_delivered_to_resolved_destination() {
    let fx = fixture(Some("ops"));
    let outcome = run_with_events(
        &fx,
        vec![
            AgentEvent::Output {
                text: "heads up: ".to_string(),
                is_final: false,
            },
            AgentEvent::Output {
                text: "disk almost full".to_string(),
                is_final: true,
            },
            AgentEvent::Done {
                result: AgentResult::default(),
            },
        ],
    )
    .await;

    assert!(!outcome.suppressed);
    assert!(outcome.delivered);
    assert_eq!(outcome.resolution, PulseResolution::Named);

    let processed = fx.channel.processed();
    assert_eq!(processed.len(), 1);
    assert!(matches!(
        &processed[0],
        OutboundIntent::AgentResponding { text, destination, .. }
            if text == "heads up: disk almost full"
                && destination.conversation_ref == "ops-room"
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn silent_resolution_never_emits() {
    let fx = fixture(None);
    let outcome = run_with_events(
        &fx,
        vec![
            AgentEvent::Output {
                text: "nobody will read this".to_string(),
                is_final: true,
            },
            AgentEvent::Done {
                result: AgentResult::default(),
            },
        ],
    )
    .await;

    assert_eq!(outcome.resolution, PulseResolution::Silent);
    assert!(!outcome.delivered);
    assert!(fx.channel.processed().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn fatal_error_resolves_empty() {
    let fx = fixture(Some("ops"));
    let outcome = run_with_events(
        &fx,
        vec![
            AgentEvent::Output {
                text: "partial".to_string(),
                is_final: false,
            },
            AgentEvent::Error {
                message: "model unavailable".to_string(),
                fatal: true,
            },
        ],
    )
    .await;

    assert!(!outcome.delivered);
    assert!(fx.channel.processed().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn timeout_resolves_with_buffered_output() {
    let fx = fixture(Some("ops"));
    // Only a non-final chunk, never done: the collector must time out and
    // deliver what it buffered.
    let outcome = run_with_events(
        &fx,
        vec![AgentEvent::Output {
            text: "partial findings".to_string(),
            is_final: false,
        }],
    )
    .await;

    assert!(outcome.delivered);
    let processed = fx.channel.processed();
    assert!(matches!(
        &processed[0],
        OutboundIntent::AgentResponding { text, .. } if text == "partial findings"
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn pulse_does_not_touch_last_active() {
    let fx = fixture(Some("ops"));
    fx.last_active.update(&Destination::new("tg1", "u1"));

    run_with_events(
        &fx,
        vec![
            AgentEvent::Output {
                text: "news".to_string(),
                is_final: true,
            },
            AgentEvent::Done {
                result: AgentResult::default(),
            },
        ],
    )
    .await;

    assert_eq!(
        fx.last_active.get(),
        Some(Destination::new("tg1", "u1")),
        "pulse output must not update last-active"
    );
}

#[tokio::test]
async fn missing_model_factory_errors() {
    let dir = TempDir::new().unwrap();
    let job = PulseJob::new(
        PulseDeps {
            coordinator: Arc::new(FakeCoordinator::new()),
            channels: Arc::new(ChannelRegistry::new()),
            last_active: Arc::new(LastActiveTracker::new(LastActiveStore::new(
                dir.path().join("last-active.json"),
            ))),
            model_factory: None,
            tools: None,
        },
        PulseConfig {
            schedule: "* * * * *".to_string(),
            response_to: None,
            prompt_path: None,
            model: Some("acme/large".to_string()),
        },
        HashMap::new(),
        None,
    );

    assert!(matches!(
        job.run_once().await,
        Err(PulseError::NoModelFactory)
    ));
}
