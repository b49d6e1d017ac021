// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn request_roundtrips() {
    let req = RpcRequest {
        id: "r1".to_string(),
        method: "daemon.ping".to_string(),
        params: None,
    };
    let json = serde_json::to_string(&req).unwrap();
    assert!(!json.contains("params"));
    let back: RpcRequest = serde_json::from_str(&json).unwrap();
    assert_eq!(back, req);
}

#[test]
fn success_response_omits_error() {
    let resp = RpcResponse::ok("r1", serde_json::json!({"pong": true}));
    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json["result"]["pong"], true);
    assert!(json.get("error").is_none());
}

#[test]
fn error_response_carries_code_and_message() {
    let resp = RpcResponse::error("r1", RpcError::method_not_found("nope.nope"));
    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json["error"]["code"], METHOD_NOT_FOUND);
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("nope.nope"));
    assert!(json.get("result").is_none());
}

#[test]
fn notification_shape() {
    let n = RpcNotification::new("subscription.logs", serde_json::json!({"level": "warn"}));
    let json = serde_json::to_value(&n).unwrap();
    assert_eq!(json["method"], "subscription.logs");
    assert_eq!(json["params"]["level"], "warn");
}
