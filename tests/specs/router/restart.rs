//! Restart recovery: bindings persist, sessions resume from checkpoints.

use crate::prelude::*;
use chrono::Utc;
use courier_core::fake::CoordinatorCall;
use courier_core::{AdapterIdentity, AgentCheckpoint, AgentSessionId};

#[tokio::test]
async fn binding_survives_restart_and_resumes_from_checkpoint() {
    // First daemon: a conversation gets bound
    let h = Harness::start().await;
    h.channel.emit_inbound(text_event("tg1", "u1", "hello"));
    eventually(|| h.coordinator.session_count() > 0).await;
    let bound_id = AgentSessionId::new("agent-1");
    let dir = h.stop_keep_dir().await;

    assert!(dir.path().join("conversations.json").exists());

    // Second daemon over the same data dir. Its coordinator has no live
    // session for the persisted binding, but a checkpoint exists.
    let h = Harness::start_with(dir, |config| config).await;
    h.coordinator.insert_checkpoint(AgentCheckpoint {
        agent_id: bound_id.clone(),
        created_at: Utc::now(),
        adapter: AdapterIdentity {
            model: "acme/large".to_string(),
            config: serde_json::Value::Null,
        },
        guidance_path: None,
        messages: Vec::new(),
        tool_history: Vec::new(),
    });

    h.channel.emit_inbound(text_event("tg1", "u1", "resumed"));

    eventually(|| {
        h.coordinator
            .calls()
            .iter()
            .any(|c| matches!(c, CoordinatorCall::Continue { .. }))
    })
    .await;

    let continues: Vec<_> = h
        .coordinator
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            CoordinatorCall::Continue { id, message, .. } => Some((id, message)),
            _ => None,
        })
        .collect();
    assert_eq!(continues.len(), 1, "exactly one continue");
    assert_eq!(continues[0].0, bound_id);
    assert_eq!(continues[0].1.as_deref(), Some("resumed"));

    // The adapter factory was asked for the checkpointed session
    assert!(h.factory.calls().iter().any(|(_, id)| id == &bound_id));

    h.stop().await;
}

#[tokio::test]
async fn missing_checkpoint_spawns_fresh_after_restart() {
    let h = Harness::start().await;
    h.channel.emit_inbound(text_event("tg1", "u1", "hello"));
    eventually(|| h.coordinator.session_count() > 0).await;
    let dir = h.stop_keep_dir().await;

    // No checkpoint registered in the successor coordinator
    let h = Harness::start_with(dir, |config| config).await;
    h.channel.emit_inbound(text_event("tg1", "u1", "anyone there?"));

    eventually(|| {
        h.coordinator
            .calls()
            .iter()
            .any(|c| matches!(c, CoordinatorCall::Spawn { .. }))
    })
    .await;

    let calls = h.coordinator.calls();
    assert!(
        !calls
            .iter()
            .any(|c| matches!(c, CoordinatorCall::Continue { .. })),
        "no continue without a checkpoint"
    );
    let spawn_message = calls
        .iter()
        .find_map(|c| match c {
            CoordinatorCall::Spawn {
                initial_message, ..
            } => initial_message.clone(),
            _ => None,
        })
        .unwrap();
    assert_eq!(spawn_message, "anyone there?", "no message loss");

    h.stop().await;
}
