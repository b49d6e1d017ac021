//! Scheduler-driven pulse turns through the composed daemon.

use crate::prelude::*;
use courier_core::fake::CoordinatorCall;
use courier_core::{AgentEvent, AgentResult, AgentSessionId, CoordinatorEvent, OutboundIntent};
use courier_daemon::config::{DestinationConfig, PulseConfig};

fn with_pulse(mut config: courier_daemon::config::DaemonConfig) -> courier_daemon::config::DaemonConfig {
    config.pulse = Some(PulseConfig {
        // Six-field form with a seconds column: fires every second
        schedule: "* * * * * *".to_string(),
        response_to: Some("ops".to_string()),
        prompt_path: None,
        model: Some("acme/large".to_string()),
    });
    config.destinations.insert(
        "ops".to_string(),
        DestinationConfig {
            channel: "tg1".to_string(),
            conversation_ref: "ops-room".to_string(),
        },
    );
    config
}

#[tokio::test(flavor = "multi_thread")]
async fn pulse_fires_and_delivers_to_named_destination() {
    let dir = tempfile::TempDir::new().unwrap();
    let h = Harness::start_with(dir, with_pulse).await;

    // Wait for the scheduler to fire a pulse spawn
    eventually(|| {
        h.coordinator
            .calls()
            .iter()
            .any(|c| matches!(c, CoordinatorCall::Spawn { tags, .. } if tags.contains(&"pulse".to_string())))
    })
    .await;

    // Answer the pulse session
    h.coordinator.emit(CoordinatorEvent::AgentEvent {
        id: AgentSessionId::new("agent-1"),
        event: AgentEvent::Output {
            text: "all systems nominal".to_string(),
            is_final: true,
        },
    });
    h.coordinator.emit(CoordinatorEvent::AgentEvent {
        id: AgentSessionId::new("agent-1"),
        event: AgentEvent::Done {
            result: AgentResult::default(),
        },
    });

    eventually(|| {
        h.channel.processed().iter().any(|intent| {
            matches!(
                intent,
                OutboundIntent::AgentResponding { text, destination, .. }
                    if text == "all systems nominal" && destination.conversation_ref == "ops-room"
            )
        })
    })
    .await;

    h.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn rest_marker_suppresses_pulse_output() {
    let dir = tempfile::TempDir::new().unwrap();
    let h = Harness::start_with(dir, with_pulse).await;

    eventually(|| {
        h.coordinator
            .calls()
            .iter()
            .any(|c| matches!(c, CoordinatorCall::Spawn { tags, .. } if tags.contains(&"pulse".to_string())))
    })
    .await;

    h.coordinator.emit(CoordinatorEvent::AgentEvent {
        id: AgentSessionId::new("agent-1"),
        event: AgentEvent::Output {
            text: "<rest />".to_string(),
            is_final: true,
        },
    });
    h.coordinator.emit(CoordinatorEvent::AgentEvent {
        id: AgentSessionId::new("agent-1"),
        event: AgentEvent::Done {
            result: AgentResult::default(),
        },
    });

    // Give delivery a moment it must not use
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    assert!(
        h.channel.processed().is_empty(),
        "rest marker must suppress channel output"
    );

    h.stop().await;
}
