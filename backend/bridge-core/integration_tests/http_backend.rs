//! HTTP backend against a mock workload API.

use bridge_core::dispatch::{Backend, DispatchBridge, HttpBackend};
use bridge_core::error::{CallError, OperationError};
use bridge_core::registry::operations::{
    GetApiV1BetaGroups, GetApiV1BetaWorkloads, PostApiV1BetaGroups,
    PostApiV1BetaWorkloadsByNameRestart,
};
use bridge_core::registry::{OperationDescriptor, OperationRegistry};
use bridge_core::Invoke;

use common::HttpStatusCode;

use std::time::Duration;

use models::{
    ByNameRequest, CreateGroupBody, CreateGroupRequest, EmptyRequest, ListWorkloadsRequest,
    NamePath, WorkloadListQuery,
};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http_backend(server: &MockServer) -> HttpBackend {
    HttpBackend::new(&server.uri(), Duration::from_secs(5)).expect("valid backend")
}

fn http_bridge(server: &MockServer) -> DispatchBridge {
    DispatchBridge::builder(OperationRegistry::builtin().clone())
        .backend(http_backend(server))
        .build()
        .expect("bridge")
}

/// **VALUE**: Path parameters land in the request path of the real API.
///
/// **WHY THIS MATTERS**: Restarting the wrong workload (or none) because `{name}`
/// was not substituted is an externally visible side effect.
///
/// **BUG THIS CATCHES**: Would catch the literal `{name}` being sent, or the
/// parameter being read from the wrong input section.
#[tokio::test]
async fn given_restart_call_when_executed_then_posts_to_workload_path() {
    // GIVEN: The API accepts a restart of "osv"
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1beta/workloads/osv/restart"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    // WHEN
    let result = http_bridge(&server)
        .call::<PostApiV1BetaWorkloadsByNameRestart>(ByNameRequest::with_path(NamePath::new(
            "osv",
        )))
        .await;

    // THEN: Empty 204 body decodes as ()
    assert!(result.is_ok(), "{result:?}");
}

#[tokio::test]
async fn given_list_workloads_with_query_when_executed_then_query_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1beta/workloads"))
        .and(query_param("all", "true"))
        .and(query_param("group", "research"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "workloads": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let request = ListWorkloadsRequest {
        query: WorkloadListQuery {
            all: Some(true),
            group: Some("research".to_string()),
        },
        ..Default::default()
    };
    let list = http_bridge(&server)
        .call::<GetApiV1BetaWorkloads>(request)
        .await
        .expect("workload list");

    assert!(list.workloads.is_empty());
}

#[tokio::test]
async fn given_create_group_when_executed_then_body_sent_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1beta/groups"))
        .and(body_json(json!({ "name": "my group" })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "name": "my group", "registered_clients": [] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let group = http_bridge(&server)
        .call::<PostApiV1BetaGroups>(CreateGroupRequest::with_body(CreateGroupBody {
            name: "my group".to_string(),
        }))
        .await
        .expect("created group");

    assert_eq!(group.name, "my group");
}

/// **VALUE**: A non-2xx answer keeps its status and body.
///
/// **BUG THIS CATCHES**: Would catch the body being dropped or the status being
/// collapsed into a generic failure before it reaches the caller.
#[tokio::test]
async fn given_404_text_body_when_executed_then_status_error_with_text() {
    // GIVEN: The API answers 404 with a plain text body
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1beta/workloads/ghost/restart"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Server not found"))
        .mount(&server)
        .await;

    // WHEN
    let error = http_bridge(&server)
        .call::<PostApiV1BetaWorkloadsByNameRestart>(ByNameRequest::with_path(NamePath::new(
            "ghost",
        )))
        .await
        .unwrap_err();

    // THEN
    assert_eq!(error.as_operation(), Some(&OperationError::not_found()));
}

#[tokio::test]
async fn given_500_json_body_when_executed_then_body_kept_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1beta/groups"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "error": "database locked" })),
        )
        .mount(&server)
        .await;

    let error = http_bridge(&server)
        .call::<GetApiV1BetaGroups>(EmptyRequest::default())
        .await
        .unwrap_err();

    match error {
        CallError::Operation(OperationError::Status { status, error }) => {
            assert_eq!(status, HttpStatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(error, json!({ "error": "database locked" }));
        }
        other => panic!("Expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn given_unreachable_api_when_executed_then_network_error() {
    // GIVEN: A port with nothing listening
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .expect("free port")
        .port();
    let backend = HttpBackend::new(&format!("http://127.0.0.1:{port}"), Duration::from_secs(2))
        .expect("backend");
    let descriptor = OperationDescriptor::of::<GetApiV1BetaGroups>();

    // WHEN
    let result = backend.execute(&descriptor, Value::Null).await;

    // THEN
    assert!(matches!(result, Err(OperationError::Network { .. })));
}
