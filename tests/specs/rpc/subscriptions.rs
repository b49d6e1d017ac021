//! Subscription behavior over the live socket.

use crate::prelude::*;
use courier_core::{AgentEvent, AgentSessionId, CoordinatorEvent};
use serde_json::json;

#[tokio::test]
async fn agent_output_subscription_is_filtered_by_id() {
    let h = Harness::start().await;
    h.channel.emit_inbound(text_event("tg1", "u1", "hello"));
    eventually(|| h.coordinator.session_count() > 0).await;

    let mut client = h.client().await;
    let response = client
        .request("subscribe.agent.output", json!({"id": "agent-1"}))
        .await;
    assert!(response.result.is_some());

    // An event for a different session must not reach this subscriber
    h.coordinator.emit(CoordinatorEvent::AgentEvent {
        id: AgentSessionId::new("someone-else"),
        event: AgentEvent::Thought { text: None },
    });
    // The matching one must
    h.coordinator.emit(CoordinatorEvent::AgentEvent {
        id: AgentSessionId::new("agent-1"),
        event: AgentEvent::Output {
            text: "chunk".to_string(),
            is_final: false,
        },
    });

    let params = client.notification("subscription.agent.output").await;
    assert_eq!(params["id"], "agent-1");
    assert_eq!(params["event"]["text"], "chunk");

    h.stop().await;
}

#[tokio::test]
async fn agents_topic_announces_spawns() {
    let h = Harness::start().await;
    let mut client = h.client().await;
    client.request("subscribe.agents", json!(null)).await;

    h.channel.emit_inbound(text_event("tg1", "u1", "hello"));

    let params = client.notification("subscription.agents").await;
    assert_eq!(params["event"], "spawned");
    assert!(params["id"].is_string());

    h.stop().await;
}

#[tokio::test]
async fn channels_topic_mirrors_inbound_events() {
    let h = Harness::start().await;
    let mut client = h.client().await;
    client.request("subscribe.channels", json!(null)).await;

    h.channel.emit_inbound(text_event("tg1", "u1", "hello"));

    let params = client.notification("subscription.channels").await;
    assert_eq!(params["channelId"], "tg1");
    assert_eq!(params["event"]["type"], "message_received");

    h.stop().await;
}

#[tokio::test]
async fn closing_the_connection_reaps_subscriptions() {
    let h = Harness::start().await;

    {
        let mut client = h.client().await;
        client.request("subscribe.channels", json!(null)).await;
        client.request("subscribe.agents", json!(null)).await;
        // client drops here
    }

    // Cleanup runs when the server notices the disconnect. Observe it
    // through unsubscribe: while the subscription still exists it is
    // "owned by another connection"; once reaped it is not found.
    let mut client = h.client().await;
    let mut reaped = false;
    for _ in 0..100 {
        let response = client
            .request("unsubscribe", json!({"subscriptionId": "sub-1"}))
            .await;
        if response.error.map(|e| e.code) == Some(courier_daemon::protocol::NOT_FOUND) {
            reaped = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(reaped, "dropped connection's subscriptions were not reaped");

    h.stop().await;
}
