//! End-to-end routing scenarios: channel event in, agent activity out.

use crate::prelude::*;
use courier_core::fake::CoordinatorCall;
use courier_core::{
    AgentEvent, AgentResult, AgentSessionId, AgentStatus, CoordinatorEvent, Destination,
    OutboundIntent,
};
use serde_json::json;

#[tokio::test]
async fn fresh_message_spawns_and_binds() {
    let h = Harness::start().await;

    h.channel.emit_inbound(text_event("tg1", "u1", "hello"));

    eventually(|| {
        h.coordinator
            .calls()
            .iter()
            .any(|c| matches!(c, CoordinatorCall::Spawn { .. }))
    })
    .await;

    let spawn = h
        .coordinator
        .calls()
        .into_iter()
        .find_map(|c| match c {
            CoordinatorCall::Spawn {
                tags,
                metadata,
                initial_message,
                ..
            } => Some((tags, metadata, initial_message)),
            _ => None,
        })
        .unwrap();
    assert!(spawn.0.contains(&"channel:tg1".to_string()));
    assert_eq!(spawn.1["channelId"], "tg1");
    assert_eq!(spawn.2.as_deref(), Some("hello"));

    // Binding is visible over RPC
    let mut client = h.client().await;
    let response = client
        .request("conversation.get", json!({"channelId": "tg1", "ref": "u1"}))
        .await;
    let binding = response.result.unwrap();
    assert!(binding["agentId"].is_string());

    h.stop().await;
}

#[tokio::test]
async fn completed_agent_continues_with_next_message() {
    let h = Harness::start().await;

    // Bind through the inbound path; the fake assigns agent-1
    h.channel.emit_inbound(text_event("tg1", "u1", "first"));
    eventually(|| h.coordinator.session_count() > 0).await;
    let bound_id = AgentSessionId::new("agent-1");

    // The bound agent finished its last turn; its adapter is still around
    h.coordinator
        .insert_handle(&bound_id, AgentStatus::Completed);
    h.coordinator
        .insert_adapter(&bound_id, courier_core::fake::FakeAdapter::new("acme/large"));
    h.coordinator.clear_calls();

    h.channel.emit_inbound(text_event("tg1", "u1", "again"));

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
    assert_eq!(continues.len(), 1);
    assert_eq!(continues[0].0, bound_id);
    assert_eq!(continues[0].1.as_deref(), Some("again"));

    h.stop().await;
}

#[tokio::test]
async fn agent_output_flows_back_to_the_channel() {
    let h = Harness::start().await;
    h.channel.emit_inbound(text_event("tg1", "u1", "hello"));
    eventually(|| h.coordinator.session_count() > 0).await;

    h.coordinator.emit(CoordinatorEvent::AgentEvent {
        id: AgentSessionId::new("agent-1"),
        event: AgentEvent::Output {
            text: "hi there".to_string(),
            is_final: true,
        },
    });

    eventually(|| !h.channel.processed().is_empty()).await;
    let processed = h.channel.processed();
    assert!(matches!(
        &processed[0],
        OutboundIntent::AgentResponding { text, destination, .. }
            if text == "hi there" && destination == &Destination::new("tg1", "u1")
    ));

    h.stop().await;
}

#[tokio::test]
async fn done_without_output_emits_nothing() {
    let h = Harness::start().await;
    h.channel.emit_inbound(text_event("tg1", "u1", "hello"));
    eventually(|| h.coordinator.session_count() > 0).await;

    h.coordinator.emit(CoordinatorEvent::AgentEvent {
        id: AgentSessionId::new("agent-1"),
        event: AgentEvent::Done {
            result: AgentResult { output: None },
        },
    });
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(h.channel.processed().is_empty());

    h.stop().await;
}
