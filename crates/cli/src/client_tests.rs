// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use courier_daemon::transport::{Connection, FrameHandler, SocketServer};
use serde_json::json;
use tempfile::TempDir;

/// Server stub implementing a few methods for client behavior tests.
struct StubHandler;

#[async_trait::async_trait]
impl FrameHandler for StubHandler {
    async fn on_frame(&self, connection: Arc<Connection>, frame: serde_json::Value) {
        let request: RpcRequest = match serde_json::from_value(frame) {
            Ok(request) => request,
            Err(_) => return,
        };
        match request.method.as_str() {
            "daemon.ping" => {
                let _ = connection
                    .send_response(&RpcResponse::ok(request.id, json!({"pong": true})));
            }
            "echo.params" => {
                let _ = connection.send_response(&RpcResponse::ok(
                    request.id,
                    request.params.unwrap_or(serde_json::Value::Null),
                ));
            }
            "slow.never" => {
                // Deliberately no response
            }
            "notify.me" => {
                let _ = connection.notify(&RpcNotification::new(
                    "subscription.logs",
                    json!({"line": 1}),
                ));
                let _ = connection.send_response(&RpcResponse::ok(request.id, json!({})));
            }
            other => {
                let _ = connection.send_response(&RpcResponse::error(
                    request.id,
                    RpcError::method_not_found(other),
                ));
            }
        }
    }

    async fn on_disconnect(&self, _connection_id: &str) {}
}

async fn server(dir: &TempDir) -> Arc<SocketServer> {
    let server = Arc::new(SocketServer::new(dir.path().join("test.sock")));
    let handler: Arc<dyn FrameHandler> = Arc::new(StubHandler);
    server.listen(handler).await.unwrap();
    server
}

#[tokio::test]
async fn request_response_roundtrip() {
    let dir = TempDir::new().unwrap();
    let server = server(&dir).await;

    let client = DaemonClient::connect(server.socket_path()).await.unwrap();
    let result = client.request("daemon.ping", json!(null)).await.unwrap();
    assert_eq!(result["pong"], true);

    let echoed = client
        .request("echo.params", json!({"a": [1, 2]}))
        .await
        .unwrap();
    assert_eq!(echoed, json!({"a": [1, 2]}));
}

#[tokio::test]
async fn missing_socket_is_daemon_not_running() {
    let dir = TempDir::new().unwrap();
    let err = DaemonClient::connect(&dir.path().join("absent.sock"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ClientError::DaemonNotRunning));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn stale_socket_file_is_daemon_not_running() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stale.sock");
    // A socket file nobody is listening on
    let listener = std::os::unix::net::UnixListener::bind(&path).unwrap();
    drop(listener);

    let err = DaemonClient::connect(&path).await.err().unwrap();
    assert!(matches!(err, ClientError::DaemonNotRunning));
}

#[tokio::test]
async fn rpc_errors_surface_with_exit_codes() {
    let dir = TempDir::new().unwrap();
    let server = server(&dir).await;
    let client = DaemonClient::connect(server.socket_path()).await.unwrap();

    let err = client.request("nope", json!(null)).await.err().unwrap();
    let ClientError::Rpc(rpc) = &err else {
        panic!("expected rpc error, got {err:?}");
    };
    assert_eq!(rpc.code, courier_daemon::protocol::METHOD_NOT_FOUND);
    assert_eq!(err.exit_code(), 1);

    assert_eq!(
        ClientError::Rpc(RpcError::not_found("agent")).exit_code(),
        4
    );
    assert_eq!(
        ClientError::Rpc(RpcError::invalid_operation("nope")).exit_code(),
        5
    );
    assert_eq!(ClientError::RequestTimeout.exit_code(), 3);
}

#[tokio::test]
async fn notifications_multiplex_alongside_requests() {
    let dir = TempDir::new().unwrap();
    let server = server(&dir).await;
    let client = DaemonClient::connect(server.socket_path()).await.unwrap();
    let mut notifications = client.notifications().unwrap();

    client.request("notify.me", json!(null)).await.unwrap();

    let notification =
        tokio::time::timeout(Duration::from_secs(1), notifications.recv())
            .await
            .unwrap()
            .unwrap();
    assert_eq!(notification.method, "subscription.logs");
    assert_eq!(notification.params["line"], 1);
}

#[tokio::test]
async fn disconnect_rejects_outstanding_requests() {
    let dir = TempDir::new().unwrap();
    let server = server(&dir).await;
    let client = Arc::new(DaemonClient::connect(server.socket_path()).await.unwrap());

    let pending = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.request("slow.never", json!(null)).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    server.close();

    let err = pending.await.unwrap().err().unwrap();
    assert!(matches!(err, ClientError::NotConnected));
}
