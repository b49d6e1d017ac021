// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn unbound_row_has_no_agent() {
    let now = Utc::now();
    let binding = ConversationBinding::unbound(Destination::new("tg1", "u1"), now);
    assert!(!binding.has_agent());
    assert_eq!(binding.created_at, now);
    assert_eq!(binding.last_activity_at, now);
}

#[test]
fn serializes_iso_timestamps_and_camel_case() {
    let now = Utc::now();
    let mut binding = ConversationBinding::unbound(Destination::new("tg1", "u1"), now);
    binding.agent_id = Some(AgentSessionId::new("a1"));

    let json = serde_json::to_value(&binding).unwrap();
    assert_eq!(json["agentId"], "a1");
    assert_eq!(json["destination"]["channelId"], "tg1");
    // chrono serializes DateTime<Utc> as RFC 3339 / ISO 8601
    assert!(json["createdAt"].as_str().unwrap().contains('T'));

    let back: ConversationBinding = serde_json::from_value(json).unwrap();
    assert_eq!(back, binding);
}
