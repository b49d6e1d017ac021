// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn responding_intent_roundtrips() {
    let intent = OutboundIntent::AgentResponding {
        destination: Destination::new("tg1", "u1"),
        text: "done".to_string(),
        metadata: serde_json::json!({"conversationType": "direct"}),
    };
    let json = serde_json::to_value(&intent).unwrap();
    assert_eq!(json["type"], "agent_responding");
    assert_eq!(json["metadata"]["conversationType"], "direct");
    let back: OutboundIntent = serde_json::from_value(json).unwrap();
    assert_eq!(back, intent);
}

#[test]
fn null_metadata_is_omitted() {
    let intent = OutboundIntent::AgentThinking {
        destination: Destination::new("tg1", "u1"),
        metadata: serde_json::Value::Null,
    };
    let json = serde_json::to_value(&intent).unwrap();
    assert!(json.get("metadata").is_none());
}

#[test]
fn destination_accessor() {
    let dest = Destination::new("tg1", "u1");
    let intent = OutboundIntent::AgentError {
        destination: dest.clone(),
        message: "boom".to_string(),
        recoverable: true,
        metadata: serde_json::Value::Null,
    };
    assert_eq!(intent.destination(), &dest);
}
