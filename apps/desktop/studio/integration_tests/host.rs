//! End-to-end: proxy → studio host → HTTP backend (wiremock).

use studio::endpoint::BridgeEndpoint;
use studio::error::StudioError;
use studio::host::StudioHost;

use bridge_core::config::{BackendConfig, ProxyConfig, ServerConfig};
use bridge_core::error::{OperationError, TransportError};
use bridge_core::registry::OperationRegistry;
use bridge_core::registry::operations::{GetApiV1BetaVersion, PostApiV1BetaWorkloadsByNameRestart};
use bridge_core::{BridgeConfig, BridgeProxy, CallError, Invoke};

use common::HttpStatusCode;
use models::{ByNameRequest, EmptyRequest, NamePath, Version};

use std::net::{IpAddr, Ipv6Addr};
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn host_config(backend_url: &str) -> BridgeConfig {
    BridgeConfig {
        server: ServerConfig {
            port: 0,
            ..ServerConfig::default()
        },
        backend: BackendConfig {
            base_url: backend_url.to_string(),
            timeout_secs: 5,
        },
        ..BridgeConfig::default()
    }
}

async fn connect(endpoint: &BridgeEndpoint) -> BridgeProxy {
    let proxy = BridgeProxy::new(
        OperationRegistry::builtin().clone(),
        ProxyConfig {
            connect_max_elapsed_ms: 3_000,
            call_timeout_ms: 5_000,
        },
    );
    proxy
        .connect(&endpoint.url(), &endpoint.auth_token)
        .await
        .expect("Proxy should connect");
    proxy
}

/// **VALUE**: A typed call from the unprivileged side reaches the workload API and back.
///
/// **WHY THIS MATTERS**: This is the production path in one test: proxy, WebSocket
/// handshake, dispatch, HTTP forwarding and response decoding.
///
/// **BUG THIS CATCHES**: Would catch the host wiring a different registry than the
/// proxy, or the published endpoint not matching the bound port.
#[tokio::test]
async fn given_running_host_when_proxy_calls_version_then_backend_answer_returned() {
    // GIVEN
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1beta/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": "v0.9.1" })))
        .expect(1)
        .mount(&backend)
        .await;

    let host = StudioHost::start(&host_config(&backend.uri()))
        .await
        .expect("host starts");
    let proxy = connect(host.endpoint()).await;

    // WHEN
    let version = proxy
        .call::<GetApiV1BetaVersion>(EmptyRequest::default())
        .await
        .expect("version succeeds");

    // THEN
    assert_eq!(
        version,
        Version {
            version: "v0.9.1".to_string()
        }
    );

    proxy.disconnect().await;
    host.shutdown().await;
}

/// **VALUE**: A backend 404 reaches the caller as the same status and body.
///
/// **BUG THIS CATCHES**: Would catch any layer on the real path wrapping the
/// domain error into a transport failure or rewriting its payload.
#[tokio::test]
async fn given_backend_404_when_restarting_over_host_then_exact_operation_error() {
    // GIVEN
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1beta/workloads/ghost/restart"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Server not found"))
        .mount(&backend)
        .await;

    let host = StudioHost::start(&host_config(&backend.uri()))
        .await
        .expect("host starts");
    let proxy = connect(host.endpoint()).await;

    // WHEN
    let error = proxy
        .call::<PostApiV1BetaWorkloadsByNameRestart>(ByNameRequest::with_path(NamePath::new(
            "ghost",
        )))
        .await
        .expect_err("restart fails");

    // THEN
    assert_eq!(
        error.as_operation(),
        Some(&OperationError::status(
            HttpStatusCode::NOT_FOUND,
            "Server not found"
        ))
    );

    proxy.disconnect().await;
    host.shutdown().await;
}

#[tokio::test]
async fn given_published_endpoint_when_host_shuts_down_then_endpoint_retracted() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut host = StudioHost::start(&host_config("http://127.0.0.1:9"))
        .await
        .expect("host starts");

    host.publish_endpoint(dir.path()).expect("publish succeeds");
    let published = BridgeEndpoint::read(dir.path()).expect("endpoint readable");
    assert_eq!(&published, host.endpoint());

    host.shutdown().await;

    assert!(!BridgeEndpoint::file_path(dir.path()).exists());
}

/// **VALUE**: After the host stops, calls fail promptly instead of hanging.
#[tokio::test]
async fn given_stopped_host_when_calling_then_transport_failure() {
    let host = StudioHost::start(&host_config("http://127.0.0.1:9"))
        .await
        .expect("host starts");
    let proxy = connect(host.endpoint()).await;

    host.shutdown().await;
    for _ in 0..50 {
        if !proxy.is_ready().await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let result = proxy
        .call::<GetApiV1BetaVersion>(EmptyRequest::default())
        .await;

    match result {
        Err(CallError::Transport(
            TransportError::NotReady { .. }
            | TransportError::Delivery { .. }
            | TransportError::Timeout { .. },
        )) => {}
        other => panic!("Expected a transport failure, got {other:?}"),
    }
}

/// **VALUE**: A host bound to the IPv6 loopback publishes an endpoint the proxy can reach.
///
/// **BUG THIS CATCHES**: Would catch the endpoint being rebuilt from the port alone,
/// which points the proxy at `127.0.0.1` while the server listens on `::1`.
#[tokio::test]
async fn given_ipv6_loopback_host_when_connecting_to_endpoint_then_call_succeeds() {
    // GIVEN: Skip where the machine has no IPv6 loopback
    if std::net::TcpListener::bind((Ipv6Addr::LOCALHOST, 0)).is_err() {
        return;
    }
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1beta/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": "v0.9.2" })))
        .mount(&backend)
        .await;

    let mut config = host_config(&backend.uri());
    config.server.host = IpAddr::V6(Ipv6Addr::LOCALHOST);
    let host = StudioHost::start(&config).await.expect("host starts");

    // WHEN
    let proxy = connect(host.endpoint()).await;
    let version = proxy
        .call::<GetApiV1BetaVersion>(EmptyRequest::default())
        .await
        .expect("version succeeds");

    // THEN
    assert!(host.endpoint().url().starts_with("ws://[::1]:"));
    assert_eq!(version.version, "v0.9.2");

    proxy.disconnect().await;
    host.shutdown().await;
}

#[tokio::test]
async fn given_zero_call_timeout_when_starting_then_config_error() {
    let mut config = host_config("http://127.0.0.1:9");
    config.proxy.call_timeout_ms = 0;

    let result = StudioHost::start(&config).await;

    assert!(matches!(result, Err(StudioError::Config { .. })));
}

#[tokio::test]
async fn given_non_http_backend_url_when_starting_then_config_error() {
    let result = StudioHost::start(&host_config("ftp://127.0.0.1:21")).await;

    assert!(matches!(result, Err(StudioError::Config { .. })));
}
