//! Proxy ↔ server ↔ dispatch bridge, end to end.

use crate::helpers::{
    EchoBackend, builtin_registry, echo_bridge_builder, start_connected, test_proxy_config,
};

use bridge_core::dispatch::DispatchBridge;
use bridge_core::error::{CallError, OperationError, TransportError};
use bridge_core::registry::operations::{GetApiV1BetaVersion, PostApiV1BetaWorkloadsByNameRestart};
use bridge_core::transport::RejectCode;
use bridge_core::{BridgeProxy, Invoke};

use std::time::Duration;

use models::{ByNameRequest, EmptyRequest, NamePath, Version};
use serde_json::{Value, json};

/// **VALUE**: Every registry name is exposed on both sides of the boundary.
///
/// **WHY THIS MATTERS**: UI code calls operations by name through the proxy. A name
/// present on only one side is a call that can never succeed, found at runtime by
/// whoever first clicks the button.
///
/// **BUG THIS CATCHES**: Would catch the proxy and the dispatch bridge enumerating
/// different registries, or the fallback backend skipping entries.
#[tokio::test]
async fn given_bridge_and_proxy_when_enumerated_then_same_names_as_registry() {
    // GIVEN: A bridge backed by a generic backend, and a proxy
    let bridge = echo_bridge_builder().build().expect("bridge");
    let proxy = BridgeProxy::new(builtin_registry(), test_proxy_config());

    // WHEN
    let registry = builtin_registry();
    let registry_names: Vec<&str> = registry.names().collect();

    // THEN
    assert_eq!(bridge.exposed(), registry_names);
    assert_eq!(proxy.exposed(), registry_names);
}

/// **VALUE**: The proxy forwards input and returns output without altering either.
///
/// **WHY THIS MATTERS**: Calling through the proxy must be indistinguishable from
/// calling the real operation. Field renames, dropped nulls or reordered arrays
/// would each surface as subtle UI bugs only in production.
///
/// **BUG THIS CATCHES**: Would catch lossy JSON handling anywhere on the path:
/// frame encoding, request_id correlation, or the dispatch wrapper.
#[tokio::test]
async fn given_echo_bridge_when_calling_every_operation_then_input_returned_unchanged() {
    // GIVEN: A bridge whose backend echoes input as output
    let (_handle, proxy) = start_connected(echo_bridge_builder().build().expect("bridge")).await;

    let input = json!({
        "path": { "name": "osv-2" },
        "query": { "all": true, "group": "défaut" },
        "body": {
            "camelCase": 1,
            "snake_case": [3, 2, 1],
            "nested": { "null": null, "float": 1.5, "emoji": "🚀" }
        }
    });

    // WHEN / THEN: Every operation echoes the same value back
    for name in builtin_registry().names() {
        let output = proxy
            .invoke(name, input.clone())
            .await
            .unwrap_or_else(|e| panic!("{name} failed: {e}"));
        assert_eq!(output, input, "{name} altered its input");
    }
}

/// **VALUE**: A domain error crosses the boundary with its exact status and payload.
///
/// **WHY THIS MATTERS**: The UI shows "Server not found" based on the 404 status.
/// If the bridge wraps or rewrites the failure, the caller can no longer tell a
/// missing workload from a broken bridge.
///
/// **BUG THIS CATCHES**: Would catch a handler failure converted into a transport
/// error, or a status code lost in serialization.
#[tokio::test]
async fn given_handler_returning_404_when_called_through_proxy_then_same_error_observed() {
    // GIVEN: Restart answers 404 "Server not found"
    let bridge = echo_bridge_builder()
        .handle::<PostApiV1BetaWorkloadsByNameRestart, _, _>(|_request: ByNameRequest| async {
            Err(OperationError::not_found())
        })
        .build()
        .expect("bridge");
    let (_handle, proxy) = start_connected(bridge).await;

    // WHEN
    let error = proxy
        .call::<PostApiV1BetaWorkloadsByNameRestart>(ByNameRequest::with_path(NamePath::new(
            "ghost",
        )))
        .await
        .unwrap_err();

    // THEN
    let operation_error = error.as_operation().expect("operation error");
    assert_eq!(operation_error, &OperationError::not_found());
    assert_eq!(
        serde_json::to_value(operation_error).expect("serializable"),
        json!({ "kind": "status", "status": 404, "error": "Server not found" })
    );
}

#[tokio::test]
async fn given_typed_handler_when_called_through_proxy_then_typed_response() {
    let bridge = echo_bridge_builder()
        .handle::<GetApiV1BetaVersion, _, _>(|_request: EmptyRequest| async {
            Ok(Version {
                version: "v0.3.2".to_string(),
            })
        })
        .build()
        .expect("bridge");
    let (_handle, proxy) = start_connected(bridge).await;

    let version = proxy
        .call::<GetApiV1BetaVersion>(EmptyRequest::default())
        .await
        .expect("version");

    assert_eq!(version.version, "v0.3.2");
}

/// **VALUE**: Calls before the boundary is ready fail immediately with NotReady.
///
/// **BUG THIS CATCHES**: Would catch a proxy that hangs, or returns a default value,
/// when the privileged process has not come up yet.
#[tokio::test]
async fn given_unconnected_proxy_when_called_then_not_ready() {
    // GIVEN
    let proxy = BridgeProxy::new(builtin_registry(), test_proxy_config());
    assert!(!proxy.is_ready().await);

    // WHEN
    let result = tokio::time::timeout(
        Duration::from_millis(500),
        proxy.invoke("getHealth", json!({})),
    )
    .await
    .expect("must not hang");

    // THEN
    assert!(matches!(
        result,
        Err(CallError::Transport(TransportError::NotReady { .. }))
    ));
}

#[tokio::test]
async fn given_unknown_name_when_called_through_proxy_then_rejected_locally() {
    let proxy = BridgeProxy::new(builtin_registry(), test_proxy_config());

    let result = proxy.invoke("getApiV1BetaNothing", Value::Null).await;

    assert!(matches!(
        result,
        Err(CallError::Transport(TransportError::Rejected {
            code: RejectCode::UnknownOperation,
            ..
        }))
    ));
}

/// **VALUE**: Replies are matched to calls by request_id, not by arrival order.
///
/// **WHY THIS MATTERS**: Several calls can be in flight on one connection. A slow
/// call must not receive the answer meant for a fast one.
///
/// **BUG THIS CATCHES**: Would catch FIFO reply matching, which hands each caller
/// whichever reply arrives next.
#[tokio::test]
async fn given_concurrent_calls_with_varying_latency_when_awaited_then_each_gets_own_reply() {
    // GIVEN: A handler whose latency depends on the input
    let bridge = DispatchBridge::builder(builtin_registry())
        .backend(EchoBackend)
        .handle_raw("getApiV1BetaWorkloadsByName", |input: Value| async move {
            let delay = input["query"]["delay_ms"].as_u64().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(input["path"]["name"].clone())
        })
        .build()
        .expect("bridge");
    let (_handle, proxy) = start_connected(bridge).await;

    // WHEN: Slow call issued first, fast ones after
    let calls = [("slow", 300), ("medium", 150), ("fast", 0)].map(|(name, delay)| {
        proxy.invoke(
            "getApiV1BetaWorkloadsByName",
            json!({ "path": { "name": name }, "query": { "delay_ms": delay } }),
        )
    });
    let [slow, medium, fast] = calls;
    let (slow, medium, fast) = tokio::join!(slow, medium, fast);

    // THEN
    assert_eq!(slow.expect("slow"), json!("slow"));
    assert_eq!(medium.expect("medium"), json!("medium"));
    assert_eq!(fast.expect("fast"), json!("fast"));
}

/// **VALUE**: Once the server goes away, calls fail promptly instead of hanging.
#[tokio::test]
async fn given_server_shut_down_when_called_then_fails_without_hanging() {
    // GIVEN: A connected proxy
    let (handle, proxy) = start_connected(echo_bridge_builder().build().expect("bridge")).await;
    assert!(proxy.invoke("getHealth", json!({})).await.is_ok());

    // WHEN: The server stops
    handle.shutdown().await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    // THEN: The call fails with a transport error
    let result = tokio::time::timeout(
        Duration::from_secs(3),
        proxy.invoke("getHealth", json!({})),
    )
    .await
    .expect("must not hang");

    match result {
        Err(CallError::Transport(
            TransportError::NotReady { .. } | TransportError::Delivery { .. },
        )) => {}
        other => panic!("Expected NotReady or Delivery, got {other:?}"),
    }
    assert!(!proxy.is_ready().await);
}

#[tokio::test]
async fn given_wrong_token_when_proxy_connects_then_handshake_error() {
    let (handle, _proxy) = start_connected(echo_bridge_builder().build().expect("bridge")).await;
    let proxy = BridgeProxy::new(builtin_registry(), test_proxy_config());

    let result = proxy.connect(&handle.url(), "wrong-token").await;

    assert!(matches!(result, Err(TransportError::Handshake { .. })));
    assert!(!proxy.is_ready().await);
}

#[tokio::test]
async fn given_disconnected_proxy_when_called_then_not_ready() {
    let (_handle, proxy) = start_connected(echo_bridge_builder().build().expect("bridge")).await;

    proxy.disconnect().await;
    let result = proxy.invoke("getHealth", json!({})).await;

    assert!(matches!(
        result,
        Err(CallError::Transport(TransportError::NotReady { .. }))
    ));
}

/// **VALUE**: The proxy waits for a server that starts after it.
///
/// **BUG THIS CATCHES**: Would catch `connect_with_retry` giving up on the first
/// refused connection, which breaks startup whenever the UI wins the race.
#[tokio::test]
async fn given_server_starting_late_when_connect_with_retry_then_connects() {
    // GIVEN: A free port with nothing listening yet
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .expect("free port")
        .port();
    let url = format!("ws://127.0.0.1:{port}");

    let server = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        let config = bridge_core::config::ServerConfig {
            port,
            ..Default::default()
        };
        bridge_core::start_bridge_server(
            &config,
            Some(crate::helpers::TEST_AUTH_TOKEN.to_string()),
            std::sync::Arc::new(echo_bridge_builder().build().expect("bridge")),
        )
        .await
        .expect("server")
    });

    // WHEN
    let proxy = BridgeProxy::new(builtin_registry(), test_proxy_config());
    let result = proxy
        .connect_with_retry(&url, crate::helpers::TEST_AUTH_TOKEN)
        .await;

    // THEN
    assert!(result.is_ok(), "{result:?}");
    assert!(proxy.is_ready().await);
    let _handle = server.await.expect("server task");
}
